use crate::error::ReportError;
use crate::models::{render_label, CellValue, Config, Segment, SubjectBands};
use rust_xlsxwriter::{Format, Workbook};
use std::path::{Path, PathBuf};

/// Columns per subject block, including the blank separator.
pub const BLOCK_STRIDE: usize = 4;
pub const BLOCK_WIDTH: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportCell {
    pub value: CellValue,
    pub bold: bool,
}

impl ReportCell {
    fn plain(value: CellValue) -> Self {
        Self { value, bold: false }
    }

    fn text(text: String) -> Self {
        Self::plain(CellValue::Text(text))
    }

    fn empty() -> Self {
        Self::plain(CellValue::Empty)
    }
}

/// The combined output sheet, row-major and rectangular.
#[derive(Debug, Clone)]
pub struct ReportTable {
    pub sheet_name: String,
    pub width: usize,
    pub rows: Vec<Vec<ReportCell>>,
}

impl ReportTable {
    pub fn cell(&self, row: usize, column: usize) -> Option<&ReportCell> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

/// Lays subjects out side by side, one 3-column block each, left to right.
pub fn assemble_report(all_bands: &[SubjectBands], config: &Config) -> ReportTable {
    let width = if all_bands.is_empty() {
        0
    } else {
        (all_bands.len() - 1) * BLOCK_STRIDE + BLOCK_WIDTH
    };
    let height = all_bands
        .iter()
        .map(|bands| bands.segments.len() + 1)
        .max()
        .unwrap_or(0);

    let mut rows = vec![vec![ReportCell::empty(); width]; height];

    for (i, bands) in all_bands.iter().enumerate() {
        let start = i * BLOCK_STRIDE;
        let block = render_block(bands, config);
        for (row, cells) in block.into_iter().enumerate() {
            for (offset, cell) in cells.into_iter().enumerate() {
                rows[row][start + offset] = cell;
            }
        }
    }

    ReportTable {
        sheet_name: config.output_sheet_name.clone(),
        width,
        rows,
    }
}

fn render_block(bands: &SubjectBands, config: &Config) -> Vec<[ReportCell; BLOCK_WIDTH]> {
    let mut block = Vec::with_capacity(bands.segments.len() + 1);
    block.push([
        ReportCell::text(config.name_column.clone()),
        ReportCell::text(bands.subject.clone()),
        ReportCell::text(format!("{}{}", bands.subject, config.rank_header_suffix)),
    ]);

    for segment in &bands.segments {
        let row = match segment {
            Segment::Record(record) => [
                ReportCell::text(record.name.clone()),
                ReportCell::plain(record.score.clone()),
                ReportCell::plain(CellValue::Number(record.display_rank() as f64)),
            ],
            Segment::Boundary { threshold, count } => {
                marker_row(render_label(&config.top_label, *threshold, *count))
            }
            Segment::After { threshold, count } => {
                marker_row(render_label(&config.after_label, *threshold, *count))
            }
        };
        block.push(row);
    }
    block
}

fn marker_row(label: String) -> [ReportCell; BLOCK_WIDTH] {
    [
        ReportCell {
            value: CellValue::Text(label),
            bold: true,
        },
        ReportCell::empty(),
        ReportCell::empty(),
    ]
}

/// `<dir>/<stem><suffix>.xlsx` next to the input file.
pub fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    input.with_file_name(format!("{}{}.xlsx", stem, suffix))
}

/// Writes the table as a single-sheet workbook. The file is only created once
/// every cell has been laid out.
pub fn write_xlsx(table: &ReportTable, path: &Path) -> Result<(), ReportError> {
    log::debug!("Writing {} rows x {} columns to {}", table.height(), table.width, path.display());
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&table.sheet_name)?;

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row32 = row_idx as u32;
        for (col_idx, cell) in row.iter().enumerate() {
            let col16 = col_idx as u16;
            match (&cell.value, cell.bold) {
                (CellValue::Empty, _) => {}
                (CellValue::Text(s), true) => {
                    worksheet.write_string_with_format(row32, col16, s, &bold)?;
                }
                (CellValue::Text(s), false) => {
                    worksheet.write_string(row32, col16, s)?;
                }
                (CellValue::Number(n), true) => {
                    worksheet.write_number_with_format(row32, col16, *n, &bold)?;
                }
                (CellValue::Number(n), false) => {
                    worksheet.write_number(row32, col16, *n)?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// Plain CSV export of the same grid; bold styling is lost.
pub fn write_csv(table: &ReportTable, path: &Path) -> Result<(), ReportError> {
    use csv::Writer;

    let mut writer = Writer::from_path(path)?;
    for row in &table.rows {
        let record: Vec<String> = row.iter().map(|cell| cell.value.to_string()).collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudentRecord;
    use calamine::{open_workbook, Data, Reader, Xlsx};

    fn record(name: &str, score: f64, rank: f64) -> Segment {
        Segment::Record(StudentRecord {
            name: name.to_string(),
            score: CellValue::Number(score),
            rank,
        })
    }

    fn sample_bands() -> Vec<SubjectBands> {
        vec![
            SubjectBands {
                subject: "语文".to_string(),
                segments: vec![
                    record("甲", 120.0, 1.0),
                    Segment::Boundary { threshold: 1, count: 1 },
                    record("乙", 110.5, 2.0),
                    Segment::After { threshold: 1, count: 1 },
                ],
            },
            SubjectBands {
                subject: "数学".to_string(),
                segments: vec![Segment::Boundary { threshold: 100, count: 0 }],
            },
        ]
    }

    fn text(table: &ReportTable, row: usize, col: usize) -> String {
        table.cell(row, col).unwrap().value.to_string()
    }

    #[test]
    fn blocks_use_fixed_stride() {
        let table = assemble_report(&sample_bands(), &Config::default());
        assert_eq!(table.width, 7);
        assert_eq!(table.height(), 5);
        assert_eq!(text(&table, 0, 0), "姓名");
        assert_eq!(text(&table, 0, 1), "语文");
        assert_eq!(text(&table, 0, 2), "语文校次");
        assert_eq!(text(&table, 0, 3), "");
        assert_eq!(text(&table, 0, 4), "姓名");
        assert_eq!(text(&table, 0, 6), "数学校次");
    }

    #[test]
    fn markers_are_bold_and_single_column() {
        let table = assemble_report(&sample_bands(), &Config::default());
        let marker = table.cell(2, 0).unwrap();
        assert!(marker.bold);
        assert_eq!(marker.value, CellValue::Text("前1名 共1人".to_string()));
        assert!(table.cell(2, 1).unwrap().value.is_empty());
        assert!(table.cell(2, 2).unwrap().value.is_empty());
        assert_eq!(text(&table, 4, 0), "1名以后 共1人");
        assert!(table.cell(4, 0).unwrap().bold);
        assert_eq!(text(&table, 1, 4), "前100名 共0人");
    }

    #[test]
    fn records_fill_three_columns() {
        let table = assemble_report(&sample_bands(), &Config::default());
        assert_eq!(text(&table, 3, 0), "乙");
        assert_eq!(table.cell(3, 1).unwrap().value, CellValue::Number(110.5));
        assert_eq!(table.cell(3, 2).unwrap().value, CellValue::Number(2.0));
        assert!(!table.cell(3, 0).unwrap().bold);
    }

    #[test]
    fn shorter_blocks_leave_blanks() {
        let table = assemble_report(&sample_bands(), &Config::default());
        for row in 2..table.height() {
            for col in 4..7 {
                assert!(table.cell(row, col).unwrap().value.is_empty());
            }
        }
    }

    #[test]
    fn rank_is_truncated_for_display() {
        let bands = vec![SubjectBands {
            subject: "物理".to_string(),
            segments: vec![record("丙", 88.0, 7.9)],
        }];
        let table = assemble_report(&bands, &Config::default());
        assert_eq!(table.cell(1, 2).unwrap().value, CellValue::Number(7.0));
    }

    #[test]
    fn output_path_sits_beside_input() {
        let path = default_output_path(Path::new("/data/期中考试.xlsx"), "_分层统计表");
        assert_eq!(path, PathBuf::from("/data/期中考试_分层统计表.xlsx"));
    }

    #[test]
    fn xlsx_round_trips_through_calamine() {
        let config = Config::default();
        let table = assemble_report(&sample_bands(), &config);
        let path = std::env::temp_dir().join(format!("grade-band-report-{}.xlsx", std::process::id()));
        write_xlsx(&table, &path).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let range = workbook.worksheet_range(&config.output_sheet_name).unwrap();
        assert_eq!(range.get_value((0, 2)), Some(&Data::String("语文校次".to_string())));
        assert_eq!(range.get_value((2, 0)), Some(&Data::String("前1名 共1人".to_string())));
        assert_eq!(range.get_value((3, 1)), Some(&Data::Float(110.5)));
        assert_eq!(range.get_value((1, 4)), Some(&Data::String("前100名 共0人".to_string())));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn csv_export_writes_every_row() {
        let table = assemble_report(&sample_bands(), &Config::default());
        let path = std::env::temp_dir().join(format!("grade-band-report-{}.csv", std::process::id()));
        write_csv(&table, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), table.height());
        assert_eq!(lines[0], "姓名,语文,语文校次,,姓名,数学,数学校次");
        assert_eq!(lines[3], "乙,110.5,2,,,,");

        std::fs::remove_file(&path).ok();
    }
}
