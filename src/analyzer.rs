use crate::error::ReportError;
use crate::filter::filter_ranked_rows;
use crate::models::{Config, Dataset, Progress, Segment, StudentRecord, SubjectBands, SubjectConfig};
use crate::resolver::{find_overall_rank_column, resolve_subjects};

pub struct BandAnalyzer<'a> {
    pub config: &'a Config,
}

impl<'a> BandAnalyzer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Runs filter, resolution and partitioning for every configured subject.
    ///
    /// `on_progress` is called once per subject before it is processed.
    pub fn analyze_all_subjects<F>(&self, dataset: &Dataset, mut on_progress: F) -> Result<Vec<SubjectBands>, ReportError>
    where
        F: FnMut(Progress<'_>),
    {
        // Step 1: Locate the overall rank column and drop rows without a usable rank
        let overall_rank = find_overall_rank_column(&dataset.columns, &self.config.overall_rank_candidates)?;
        log::debug!("Overall rank column: {}", overall_rank);
        let ranked = filter_ranked_rows(dataset, overall_rank, &self.config.excluded_marker);
        if ranked.is_empty() {
            log::warn!("No rows have a numeric '{}'", overall_rank);
        }

        let name_index = ranked
            .column_index(&self.config.name_column)
            .ok_or_else(|| ReportError::column_not_found(std::slice::from_ref(&self.config.name_column)))?;

        // Step 2: Resolve subject columns, absent subjects are dropped
        let subjects = resolve_subjects(&ranked.columns, &self.config.subjects, &self.config.rank_markers);
        if subjects.is_empty() {
            let names: Vec<&str> = self.config.subjects.iter().map(|s| s.name.as_str()).collect();
            return Err(ReportError::NoValidSubjects {
                subjects: names.join(", "),
            });
        }

        // Step 3: Project, sort and partition each subject independently
        let total = subjects.len();
        let mut all_bands = Vec::with_capacity(total);
        for (i, subject) in subjects.iter().enumerate() {
            on_progress(Progress {
                subject: &subject.name,
                index: i + 1,
                total,
            });

            let records = project_records(&ranked, name_index, subject);
            log::debug!(
                "{}: {} ranked students, thresholds {:?}",
                subject.name,
                records.len(),
                subject.thresholds.as_slice()
            );

            all_bands.push(SubjectBands {
                subject: subject.name.clone(),
                segments: partition_bands(&records, subject.thresholds.as_slice()),
            });
        }

        Ok(all_bands)
    }
}

/// Builds a subject's records sorted by rank. Rows whose subject rank does not
/// coerce to a number are left out; ties keep their row order.
pub fn project_records(dataset: &Dataset, name_index: usize, subject: &SubjectConfig) -> Vec<StudentRecord> {
    let (Some(score_index), Some(rank_index)) = (
        dataset.column_index(&subject.score_column),
        dataset.column_index(&subject.rank_column),
    ) else {
        return Vec::new();
    };

    let mut records: Vec<StudentRecord> = dataset
        .rows
        .iter()
        .filter_map(|row| {
            let rank = dataset.value(row, rank_index).as_number()?;
            Some(StudentRecord {
                name: dataset.value(row, name_index).to_string(),
                score: dataset.value(row, score_index).clone(),
                rank,
            })
        })
        .collect();

    // sort_by is stable
    records.sort_by(|a, b| a.rank.total_cmp(&b.rank));
    records
}

/// Splits rank-sorted records into bands at each threshold.
///
/// A `Boundary` marker is emitted as soon as a record's rank passes the
/// threshold, carrying the number of records emitted before it. Thresholds
/// never passed are flushed at the end with the total count, and an `After`
/// marker follows when any record lies beyond the last threshold.
///
/// `records` must be sorted by rank and `thresholds` ascending.
pub fn partition_bands(records: &[StudentRecord], thresholds: &[u32]) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(records.len() + thresholds.len() + 1);
    let mut cursor = 0;

    for (emitted, record) in records.iter().enumerate() {
        while cursor < thresholds.len() && record.rank > f64::from(thresholds[cursor]) {
            segments.push(Segment::Boundary {
                threshold: thresholds[cursor],
                count: emitted,
            });
            cursor += 1;
        }
        segments.push(Segment::Record(record.clone()));
    }

    for &threshold in &thresholds[cursor..] {
        segments.push(Segment::Boundary {
            threshold,
            count: records.len(),
        });
    }

    if let Some(&last) = thresholds.last() {
        let after = records.iter().filter(|r| r.rank > f64::from(last)).count();
        if after > 0 {
            segments.push(Segment::After {
                threshold: last,
                count: after,
            });
        }
    }

    segments
}
