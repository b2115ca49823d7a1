//! Column lookup by name rules. Everything here is a pure function over the
//! header row.

use crate::error::ReportError;
use crate::models::{SubjectConfig, SubjectSettings, Thresholds};

/// Returns the first candidate that exists verbatim among `columns`.
pub fn find_overall_rank_column<'a>(
    columns: &'a [String],
    candidates: &[String],
) -> Result<&'a str, ReportError> {
    candidates
        .iter()
        .find_map(|candidate| columns.iter().find(|c| *c == candidate))
        .map(String::as_str)
        .ok_or_else(|| ReportError::column_not_found(candidates))
}

/// First column, in header order, that mentions the subject and any rank marker.
pub fn find_rank_column<'a>(columns: &'a [String], subject: &str, markers: &[String]) -> Option<&'a str> {
    columns
        .iter()
        .find(|column| column.contains(subject) && markers.iter().any(|m| column.contains(m.as_str())))
        .map(String::as_str)
}

/// Resolves a configured subject, or `None` when its columns are absent.
pub fn resolve_subject(columns: &[String], settings: &SubjectSettings, markers: &[String]) -> Option<SubjectConfig> {
    let score_column = columns.iter().find(|c| **c == settings.name)?;
    let rank_column = find_rank_column(columns, &settings.name, markers)?;

    Some(SubjectConfig {
        name: settings.name.clone(),
        score_column: score_column.clone(),
        rank_column: rank_column.to_string(),
        thresholds: Thresholds::new(settings.thresholds.clone()),
    })
}

/// Resolves every subject in configured order, silently skipping absent ones.
pub fn resolve_subjects(columns: &[String], subjects: &[SubjectSettings], markers: &[String]) -> Vec<SubjectConfig> {
    subjects
        .iter()
        .filter_map(|settings| {
            let resolved = resolve_subject(columns, settings, markers);
            if resolved.is_none() {
                log::warn!("Subject '{}' has no score or rank column, skipping", settings.name);
            }
            resolved
        })
        .collect()
}
