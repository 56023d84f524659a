use crate::error::{PipelineError, Result};
use crate::models::{Category, CellValue, MergedWorkbook, TabularDataset};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;
use tracing::{debug, warn};

/// 读取 Excel 文件的第一个工作表
///
/// 第一行作为表头，原样保留，其余为数据行。
pub fn read_dataset(file_path: &Path) -> Result<TabularDataset> {
    let mut workbook = open_workbook_auto(file_path).map_err(|e| source_read(file_path, e))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| source_read(file_path, "工作簿没有工作表 workbook has no sheets"))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| source_read(file_path, e))?;

    Ok(range_to_dataset(&range))
}

/// 读取合并后的工作簿
///
/// 只加载存在的 Outbound/Inbound/Inventory 工作表，缺少的不算错误。
pub fn read_merged_workbook(file_path: &Path) -> Result<MergedWorkbook> {
    let mut workbook = open_workbook_auto(file_path).map_err(|e| source_read(file_path, e))?;
    let sheet_names = workbook.sheet_names();
    debug!("工作表列表 Sheets: {:?}", sheet_names);

    let mut merged = MergedWorkbook::default();
    for category in Category::ALL {
        let name = category.sheet_name();
        if !sheet_names.iter().any(|s| s == name) {
            warn!("缺少工作表 Sheet missing: {}", name);
            continue;
        }
        let range = workbook
            .worksheet_range(name)
            .map_err(|e| source_read(file_path, e))?;
        merged.sheets.insert(category, range_to_dataset(&range));
    }

    Ok(merged)
}

fn range_to_dataset(range: &Range<Data>) -> TabularDataset {
    let mut rows = range.rows();

    let headers = match rows.next() {
        Some(header_row) => header_row.iter().map(header_text).collect(),
        None => return TabularDataset::default(),
    };

    let mut dataset = TabularDataset::new(headers);
    for row in rows {
        dataset.push_row(row.iter().map(to_cell).collect());
    }
    dataset
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// 单元格转换
fn to_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            if s.trim().is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => CellValue::Text(e.to_string()),
        Data::Empty => CellValue::Empty,
    }
}

fn source_read(path: &Path, e: impl std::fmt::Display) -> PipelineError {
    PipelineError::SourceRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}
