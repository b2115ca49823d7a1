use crate::error::ReportError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub name_column: String,
    // Tried in order, first exact match wins
    pub overall_rank_candidates: Vec<String>,
    pub rank_markers: Vec<String>,
    pub excluded_marker: String,
    pub rank_header_suffix: String,
    pub output_sheet_name: String,
    pub output_file_suffix: String,
    pub top_label: String,
    pub after_label: String,
    pub subjects: Vec<SubjectSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSettings {
    pub name: String,
    pub thresholds: Vec<u32>,
}

impl SubjectSettings {
    pub fn new(name: &str, thresholds: &[u32]) -> Self {
        Self {
            name: name.to_string(),
            thresholds: thresholds.to_vec(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let wide = [300, 400, 600, 700, 800, 900];
        let narrow = [100, 200, 300];
        Self {
            name_column: "姓名".to_string(),
            overall_rank_candidates: vec![
                "总分校方向名次".to_string(),
                "总分校次".to_string(),
                "总分排名".to_string(),
                "总分名次".to_string(),
                "总分 校次".to_string(),
            ],
            rank_markers: vec![
                "校次".to_string(),
                "排名".to_string(),
                "校方向名次".to_string(),
            ],
            excluded_marker: "不计排名".to_string(),
            rank_header_suffix: "校次".to_string(),
            output_sheet_name: "分层统计汇总".to_string(),
            output_file_suffix: "_分层统计表".to_string(),
            top_label: "前{threshold}名 共{count}人".to_string(),
            after_label: "{threshold}名以后 共{count}人".to_string(),
            subjects: vec![
                SubjectSettings::new("语文", &wide),
                SubjectSettings::new("数学", &wide),
                SubjectSettings::new("英语", &wide),
                SubjectSettings::new("物理", &[300, 400, 600, 700]),
                SubjectSettings::new("化学", &[300, 400, 600]),
                SubjectSettings::new("生物", &[300, 400, 500]),
                SubjectSettings::new("政治", &narrow),
                SubjectSettings::new("历史", &narrow),
                SubjectSettings::new("地理", &narrow),
            ],
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }

    /// Subject names must be non-empty and unique.
    pub fn validate(&self) -> Result<(), ReportError> {
        let mut seen = HashSet::new();
        for subject in &self.subjects {
            let name = subject.name.trim();
            if name.is_empty() {
                return Err(ReportError::InvalidConfig("subject name is empty".to_string()));
            }
            if !seen.insert(name) {
                return Err(ReportError::InvalidConfig(format!(
                    "subject '{}' is configured twice",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Adds a subject, or replaces the thresholds of an existing one.
    pub fn upsert_subject(&mut self, name: &str, thresholds: Thresholds) {
        let thresholds = thresholds.into_vec();
        match self.subjects.iter_mut().find(|s| s.name == name) {
            Some(existing) => existing.thresholds = thresholds,
            None => self.subjects.push(SubjectSettings {
                name: name.to_string(),
                thresholds,
            }),
        }
    }

    /// Keeps only the named subjects, in the order given.
    pub fn retain_subjects(&mut self, names: &[String]) {
        let mut selected = Vec::new();
        for name in names {
            if let Some(subject) = self.subjects.iter().find(|s| &s.name == name) {
                selected.push(subject.clone());
            }
        }
        self.subjects = selected;
    }
}

/// Band thresholds, always sorted ascending. Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Thresholds(Vec<u32>);

impl Thresholds {
    pub fn new(mut values: Vec<u32>) -> Self {
        values.sort_unstable();
        Self(values)
    }

    /// Parses user text such as `300, 400，600 700`.
    pub fn parse(text: &str) -> Result<Self, ReportError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::default());
        }
        let separators = Regex::new(r"[，,\s]+").expect("valid separator pattern");
        let mut values = Vec::new();
        for part in separators.split(text).filter(|p| !p.is_empty()) {
            if !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(ReportError::MalformedThresholdInput(text.to_string()));
            }
            let value = part
                .parse::<u32>()
                .map_err(|_| ReportError::MalformedThresholdInput(text.to_string()))?;
            values.push(value);
        }
        Ok(Self::new(values))
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.0
    }
}

/// Parses a `NAME=THRESHOLDS` command line override.
pub fn parse_subject_override(text: &str) -> Result<(String, Thresholds), ReportError> {
    let (name, thresholds) = text
        .split_once('=')
        .ok_or_else(|| ReportError::MalformedThresholdInput(text.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ReportError::MalformedThresholdInput(text.to_string()));
    }
    Ok((name.to_string(), Thresholds::parse(thresholds)?))
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Interprets raw text the way a CSV cell is read: blank is empty,
    /// anything parseable is a number.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Text(raw.to_string()),
        }
    }

    /// Numeric coercion; anything that is not a finite number is missing.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Number(_) | CellValue::Empty => None,
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// A worksheet read into memory: header names plus positional rows.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }

    /// Position of a column; duplicated names resolve to the first one.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value<'a>(&self, row: &'a [CellValue], column: usize) -> &'a CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        row.get(column).unwrap_or(EMPTY)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A subject whose score and rank columns were both found.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectConfig {
    pub name: String,
    pub score_column: String,
    pub rank_column: String,
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub name: String,
    pub score: CellValue,
    pub rank: f64,
}

impl StudentRecord {
    pub fn display_rank(&self) -> i64 {
        self.rank.trunc() as i64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Record(StudentRecord),
    /// "top N" marker; `count` is how many records were emitted before it.
    Boundary { threshold: u32, count: usize },
    /// Students ranked beyond the last threshold.
    After { threshold: u32, count: usize },
}

impl Segment {
    pub fn is_marker(&self) -> bool {
        !matches!(self, Segment::Record(_))
    }
}

#[derive(Debug, Clone)]
pub struct SubjectBands {
    pub subject: String,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    pub subject: &'a str,
    pub index: usize,
    pub total: usize,
}

pub fn render_label(template: &str, threshold: u32, count: usize) -> String {
    template
        .replace("{threshold}", &threshold.to_string())
        .replace("{count}", &count.to_string())
}
