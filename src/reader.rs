use crate::error::ReportError;
use crate::models::{CellValue, Dataset};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;

const WORKBOOK_EXTENSIONS: [&str; 6] = ["xlsx", "xlsm", "xlsb", "xlam", "xls", "ods"];

/// Loads the score sheet into a [`Dataset`]. The first row is the header.
#[derive(Default)]
pub struct DatasetReader;

impl DatasetReader {
    pub fn new() -> Self {
        Self
    }

    /// Sheet names of a workbook, in workbook order. CSV files have one
    /// unnamed sheet and report an empty list.
    pub fn sheet_names(&self, path: &Path) -> Result<Vec<String>, ReportError> {
        match InputKind::detect(path)? {
            InputKind::Csv => Ok(Vec::new()),
            InputKind::Workbook => Ok(open_workbook_auto(path)?.sheet_names()),
        }
    }

    pub fn read_file(&self, path: &Path, sheet: Option<&str>) -> Result<Dataset, ReportError> {
        match InputKind::detect(path)? {
            InputKind::Csv => self.read_csv(path),
            InputKind::Workbook => self.read_workbook(path, sheet),
        }
    }

    fn read_workbook(&self, path: &Path, sheet: Option<&str>) -> Result<Dataset, ReportError> {
        let mut workbook = open_workbook_auto(path)?;
        let sheet_names = workbook.sheet_names();

        let sheet_name = match sheet {
            Some(name) if sheet_names.iter().any(|s| s == name) => name.to_string(),
            Some(name) => return Err(ReportError::SheetNotFound(name.to_string())),
            None => sheet_names
                .first()
                .cloned()
                .ok_or_else(|| ReportError::SheetNotFound("<first sheet>".to_string()))?,
        };

        log::debug!("Reading sheet '{}' from {}", sheet_name, path.display());
        let range = workbook.worksheet_range(&sheet_name)?;
        dataset_from_range(&range).ok_or(ReportError::EmptySheet(sheet_name))
    }

    fn read_csv(&self, path: &Path) -> Result<Dataset, ReportError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_path(path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ReportError::EmptySheet(path.display().to_string()));
        }
        let columns = name_columns(headers);

        let mut rows: Vec<Vec<CellValue>> = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(CellValue::from_text).collect());
        }

        Ok(Dataset::new(columns, rows))
    }
}

enum InputKind {
    Workbook,
    Csv,
}

impl InputKind {
    fn detect(path: &Path) -> Result<Self, ReportError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if extension == "csv" {
            Ok(InputKind::Csv)
        } else if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
            Ok(InputKind::Workbook)
        } else {
            Err(ReportError::UnsupportedFormat(path.display().to_string()))
        }
    }
}

fn dataset_from_range(range: &Range<Data>) -> Option<Dataset> {
    let mut rows = range.rows();
    let header = rows.next()?;
    let columns = name_columns(header.iter().map(|cell| cell_value(cell).to_string()).collect());

    let body = rows
        .map(|row| row.iter().map(cell_value).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|v| !v.is_empty()))
        .collect();

    Some(Dataset::new(columns, body))
}

/// Blank headers become `Unnamed: <index>`.
fn name_columns(headers: Vec<String>) -> Vec<String> {
    headers
        .into_iter()
        .enumerate()
        .map(|(i, header)| {
            let header = header.trim();
            if header.is_empty() {
                format!("Unnamed: {}", i)
            } else {
                header.to_string()
            }
        })
        .collect()
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("grade-band-reader-{}-{}", std::process::id(), name))
    }

    #[test]
    fn reads_csv_with_blank_header_and_short_rows() {
        let path = temp_path("scores.csv");
        std::fs::write(&path, "姓名,语文,,总分校次\n张三,118,x,1\n李四, ,,不计排名\n王五,99\n").unwrap();

        let dataset = DatasetReader::new().read_file(&path, None).unwrap();
        assert_eq!(dataset.columns, vec!["姓名", "语文", "Unnamed: 2", "总分校次"]);
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.rows[0][1], CellValue::Number(118.0));
        assert_eq!(dataset.rows[1][1], CellValue::Empty);
        assert_eq!(dataset.rows[1][3], CellValue::Text("不计排名".to_string()));
        assert_eq!(dataset.value(&dataset.rows[2], 3), &CellValue::Empty);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn reads_named_sheet_from_xlsx() {
        let path = temp_path("scores.xlsx");
        let mut workbook = Workbook::new();
        workbook.add_worksheet().set_name("封面").unwrap();
        let sheet = workbook.add_worksheet();
        sheet.set_name("成绩").unwrap();
        sheet.write_string(0, 0, "姓名").unwrap();
        sheet.write_string(0, 1, "总分校次").unwrap();
        sheet.write_string(1, 0, "张三").unwrap();
        sheet.write_number(1, 1, 5.0).unwrap();
        workbook.save(&path).unwrap();

        let reader = DatasetReader::new();
        assert_eq!(reader.sheet_names(&path).unwrap(), vec!["封面", "成绩"]);

        let dataset = reader.read_file(&path, Some("成绩")).unwrap();
        assert_eq!(dataset.columns, vec!["姓名", "总分校次"]);
        assert_eq!(dataset.rows, vec![vec![CellValue::Text("张三".to_string()), CellValue::Number(5.0)]]);

        let missing = reader.read_file(&path, Some("期末")).unwrap_err();
        assert!(matches!(missing, ReportError::SheetNotFound(_)));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn rejects_unknown_extensions() {
        let err = DatasetReader::new().read_file(Path::new("scores.txt"), None).unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFormat(_)));
    }
}
