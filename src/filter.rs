use crate::models::{CellValue, Dataset};

/// Keeps rows with a usable overall rank.
///
/// Rows whose rank cell mentions `excluded_marker` are dropped first; the rest
/// are coerced to numbers and rows that do not coerce are dropped too. The
/// rank cell of each surviving row is rewritten as a number.
pub fn filter_ranked_rows(dataset: &Dataset, rank_column: &str, excluded_marker: &str) -> Dataset {
    let Some(index) = dataset.column_index(rank_column) else {
        return Dataset::new(dataset.columns.clone(), Vec::new());
    };

    let mut excluded = 0usize;
    let mut unranked = 0usize;
    let mut rows = Vec::with_capacity(dataset.len());

    for row in &dataset.rows {
        let value = dataset.value(row, index);
        if !excluded_marker.is_empty() && value.to_string().contains(excluded_marker) {
            excluded += 1;
            continue;
        }
        match value.as_number() {
            Some(rank) => {
                let mut kept = row.clone();
                if kept.len() <= index {
                    kept.resize(index + 1, CellValue::Empty);
                }
                kept[index] = CellValue::Number(rank);
                rows.push(kept);
            }
            None => unranked += 1,
        }
    }

    if excluded > 0 || unranked > 0 {
        log::info!(
            "Dropped {} rows marked '{}' and {} rows without a numeric '{}'",
            excluded,
            excluded_marker,
            unranked,
            rank_column
        );
    }

    Dataset::new(dataset.columns.clone(), rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn dataset() -> Dataset {
        Dataset::new(
            vec!["姓名".to_string(), "总分校次".to_string()],
            vec![
                vec![text("张三"), CellValue::Number(3.0)],
                vec![text("李四"), text("不计排名")],
                vec![text("王五"), text("12")],
                vec![text("赵六"), CellValue::Empty],
                vec![text("钱七"), text("缺考")],
                vec![text("孙八")],
            ],
        )
    }

    #[test]
    fn drops_excluded_and_unranked_rows() {
        let filtered = filter_ranked_rows(&dataset(), "总分校次", "不计排名");
        let names: Vec<String> = filtered.rows.iter().map(|r| r[0].to_string()).collect();
        assert_eq!(names, vec!["张三", "王五"]);
    }

    #[test]
    fn coerces_kept_ranks_to_numbers() {
        let filtered = filter_ranked_rows(&dataset(), "总分校次", "不计排名");
        assert_eq!(filtered.rows[1][1], CellValue::Number(12.0));
    }

    #[test]
    fn marker_match_is_substring() {
        let data = Dataset::new(
            vec!["总分校次".to_string()],
            vec![vec![text("(不计排名)")], vec![CellValue::Number(1.0)]],
        );
        assert_eq!(filter_ranked_rows(&data, "总分校次", "不计排名").len(), 1);
    }

    #[test]
    fn missing_column_yields_no_rows() {
        let filtered = filter_ranked_rows(&dataset(), "总分排名", "不计排名");
        assert!(filtered.is_empty());
        assert_eq!(filtered.columns.len(), 2);
    }
}
