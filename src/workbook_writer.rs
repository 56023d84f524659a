use crate::error::{PipelineError, Result};
use crate::models::{Category, CellValue, MergedWorkbook, TabularDataset};
use rust_xlsxwriter::*;
use std::path::{Path, PathBuf};
use tracing::info;

/// 生成不重名的输出路径
///
/// `<folder><date>.xlsx` 已存在时依次尝试 `<folder><date>(1).xlsx`、`(2)` ...，从不覆盖。
pub fn resolve_output_path(output_dir: &Path, folder_name: &str, date_str: &str) -> PathBuf {
    let output_path = output_dir.join(format!("{}{}.xlsx", folder_name, date_str));
    if !output_path.exists() {
        return output_path;
    }

    let mut idx = 1;
    loop {
        let candidate = output_dir.join(format!("{}{}({}).xlsx", folder_name, date_str, idx));
        if !candidate.exists() {
            return candidate;
        }
        idx += 1;
    }
}

/// 写入合并工作簿：按 Outbound、Inbound、Inventory 顺序各一个工作表
///
/// 表头在第一行，没有索引列。
pub fn write_merged_workbook(merged: &MergedWorkbook, output_file: &Path) -> Result<()> {
    let write_err = |e: XlsxError| PipelineError::WorkbookWrite {
        path: output_file.to_path_buf(),
        message: e.to_string(),
    };

    let mut workbook = Workbook::new();
    let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    for category in Category::ALL {
        let Some(dataset) = merged.sheet(category) else {
            continue;
        };
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(category.sheet_name()).map_err(write_err)?;
        write_dataset(worksheet, dataset, &datetime_format).map_err(write_err)?;
        info!("写入 sheet: {} ({} 行 rows)", category, dataset.row_count());
    }

    // 保存文件
    workbook.save(output_file).map_err(write_err)?;

    Ok(())
}

fn write_dataset(
    worksheet: &mut Worksheet,
    dataset: &TabularDataset,
    datetime_format: &Format,
) -> std::result::Result<(), XlsxError> {
    // 表头
    for (col, header) in dataset.headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, header)?;
    }

    // 数据行从第2行开始
    for (idx, row) in dataset.rows.iter().enumerate() {
        let row_num = (idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                CellValue::Number(n) => {
                    worksheet.write_number(row_num, col, *n)?;
                }
                CellValue::Text(s) => {
                    worksheet.write_string(row_num, col, s)?;
                }
                CellValue::DateTime(serial) => {
                    worksheet.write_number_with_format(row_num, col, *serial, datetime_format)?;
                }
                CellValue::Empty => {}
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel_parser::read_merged_workbook;
    use tempfile::TempDir;

    fn sample(headers: &[&str], rows: Vec<Vec<CellValue>>) -> TabularDataset {
        let mut ds = TabularDataset::new(headers.iter().map(|s| s.to_string()).collect());
        for row in rows {
            ds.push_row(row);
        }
        ds
    }

    #[test]
    fn output_name_gets_incrementing_suffix() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();

        let first = resolve_output_path(dir, "DE", "2025-10-29");
        assert_eq!(first, dir.join("DE2025-10-29.xlsx"));
        std::fs::write(&first, b"").unwrap();

        let second = resolve_output_path(dir, "DE", "2025-10-29");
        assert_eq!(second, dir.join("DE2025-10-29(1).xlsx"));
        std::fs::write(&second, b"").unwrap();

        let third = resolve_output_path(dir, "DE", "2025-10-29");
        assert_eq!(third, dir.join("DE2025-10-29(2).xlsx"));
    }

    #[test]
    fn written_sheets_read_back_with_same_headers_and_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("FR2025-10-29.xlsx");

        let mut merged = MergedWorkbook::default();
        merged.sheets.insert(
            Category::Inventory,
            sample(
                &["商品条码", "库存量", " 长(mm) "],
                vec![
                    vec![CellValue::Text("A1".into()), CellValue::Number(3.0), CellValue::Number(1200.5)],
                    vec![CellValue::Text("A2".into()), CellValue::Empty, CellValue::Text("x".into())],
                ],
            ),
        );
        merged.sheets.insert(
            Category::Outbound,
            sample(&["订单号", "复核数量"], vec![vec![CellValue::Text("O-1".into()), CellValue::Number(7.0)]]),
        );
        merged.sheets.insert(Category::Inbound, sample(&["验收量"], vec![]));

        write_merged_workbook(&merged, &path).unwrap();

        let back = read_merged_workbook(&path).unwrap();
        let inv = back.sheet(Category::Inventory).unwrap();
        assert_eq!(inv.headers, vec!["商品条码", "库存量", " 长(mm) "]);
        assert_eq!(inv.rows, merged.sheet(Category::Inventory).unwrap().rows);
        let ob = back.sheet(Category::Outbound).unwrap();
        assert_eq!(ob.rows[0][1], CellValue::Number(7.0));
        let ib = back.sheet(Category::Inbound).unwrap();
        assert_eq!(ib.headers, vec!["验收量"]);
        assert_eq!(ib.row_count(), 0);
    }

    #[test]
    fn sheet_order_is_outbound_inbound_inventory() {
        use calamine::{open_workbook_auto, Reader};

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("NL2025-10-29.xlsx");
        let mut merged = MergedWorkbook::default();
        for category in [Category::Inventory, Category::Inbound, Category::Outbound] {
            merged.sheets.insert(category, sample(&["h"], vec![]));
        }
        write_merged_workbook(&merged, &path).unwrap();

        let workbook = open_workbook_auto(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Outbound", "Inbound", "Inventory"]);
    }
}
