//! 从合并工作簿中提取 KPI。
//!
//! 每个 KPI 先通过 [`ColumnResolver`] 定位列，再做去重计数或数值求和。
//! 找不到列或缺少工作表时该 KPI 为 `None`，不会中断整条记录。

use crate::column_resolver::ColumnResolver;
use crate::models::{Category, CellValue, ColumnKeywords, KpiRecord, MergedWorkbook, TabularDataset};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// mm³ → m³
const MM3_PER_M3: f64 = 1_000_000.0;

/// Outbound 导出的第一行数据是类似表头的附加行，统计时跳过
const OUTBOUND_SKIP_ROWS: usize = 1;

pub struct MetricExtractor<'a> {
    keywords: &'a ColumnKeywords,
}

impl<'a> MetricExtractor<'a> {
    pub fn new(keywords: &'a ColumnKeywords) -> Self {
        Self { keywords }
    }

    /// 提取一条 KPI 记录
    pub fn extract(&self, warehouse: &str, source_file: &str, workbook: &MergedWorkbook) -> KpiRecord {
        let mut record = KpiRecord {
            warehouse: warehouse.to_string(),
            source_file: source_file.to_string(),
            ..KpiRecord::default()
        };

        match workbook.sheet(Category::Inventory) {
            Some(ds) => self.inventory(ds, &mut record),
            None => warn!("[{}] 无 Inventory 工作表 → 库存 KPI 为空", warehouse),
        }
        match workbook.sheet(Category::Inbound) {
            Some(ds) => self.inbound(ds, &mut record),
            None => warn!("[{}] 无 Inbound 工作表 → 入库 KPI 为空", warehouse),
        }
        match workbook.sheet(Category::Outbound) {
            Some(ds) => self.outbound(ds, &mut record),
            None => warn!("[{}] 无 Outbound 工作表 → 出库 KPI 为空", warehouse),
        }

        record
    }

    fn inventory(&self, ds: &TabularDataset, record: &mut KpiRecord) {
        let headers = ds.trimmed_headers();
        debug!("Inventory 原始列名 ({} 列): {:?}", headers.len(), headers);
        let kw = self.keywords;

        let sku_col = ColumnResolver::new("inv_sku", &kw.inventory_sku).resolve_index(&headers);
        let qty_col = ColumnResolver::new("inv_qty", &kw.inventory_qty).resolve_index(&headers);
        let len_col = ColumnResolver::new("length", &kw.inventory_length).resolve_index(&headers);
        let wid_col = ColumnResolver::new("width", &kw.inventory_width).resolve_index(&headers);
        let hei_col = ColumnResolver::new("height", &kw.inventory_height).resolve_index(&headers);

        record.inv_sku = sku_col.map(|c| unique_count(ds, c, 0));
        record.inv_qty = qty_col.map(|c| numeric_sum(ds, c, 0));

        record.inv_total_volume_m3 = match (len_col, wid_col, hei_col, qty_col) {
            (Some(l), Some(w), Some(h), Some(q)) => Some(total_volume_m3(ds, l, w, h, q)),
            _ => {
                warn!("无法计算体积，缺少列 Missing dimension/quantity column → volume undefined");
                None
            }
        };

        info!(
            "Inventory: sku={:?} qty={:?} volume_m3={:?}",
            record.inv_sku, record.inv_qty, record.inv_total_volume_m3
        );
    }

    fn inbound(&self, ds: &TabularDataset, record: &mut KpiRecord) {
        let headers = ds.trimmed_headers();
        let kw = self.keywords;

        let order_col = ColumnResolver::new("ib_order", &kw.inbound_order).resolve_index(&headers);
        let sku_col = ColumnResolver::new("ib_sku", &kw.inbound_sku).resolve_index(&headers);
        let qty_col = ColumnResolver::new("ib_qty", &kw.inbound_qty).resolve_index(&headers);

        record.ib_order = order_col.map(|c| unique_count(ds, c, 0));
        record.ib_sku = sku_col.map(|c| unique_count(ds, c, 0));
        record.ib_qty = qty_col.map(|c| numeric_sum(ds, c, 0));

        info!(
            "Inbound: orders={:?} skus={:?} qty={:?}",
            record.ib_order, record.ib_sku, record.ib_qty
        );
    }

    fn outbound(&self, ds: &TabularDataset, record: &mut KpiRecord) {
        let headers = ds.trimmed_headers();
        let kw = self.keywords;

        let order_col = ColumnResolver::new("ob_order", &kw.outbound_order).resolve_index(&headers);
        let qty_col = ColumnResolver::new("ob_qty", &kw.outbound_qty).resolve_index(&headers);

        record.ob_order = order_col.map(|c| unique_count(ds, c, OUTBOUND_SKIP_ROWS));
        record.ob_qty = qty_col.map(|c| numeric_sum(ds, c, OUTBOUND_SKIP_ROWS));

        info!("Outbound: orders={:?} qty={:?}", record.ob_order, record.ob_qty);
    }
}

/// 非空值去重计数
fn unique_count(ds: &TabularDataset, col: usize, skip: usize) -> u64 {
    ds.column(col, skip)
        .filter_map(|cell| cell.distinct_key())
        .collect::<HashSet<_>>()
        .len() as u64
}

/// 数值求和，无法转换的单元格不参与
fn numeric_sum(ds: &TabularDataset, col: usize, skip: usize) -> f64 {
    ds.column(col, skip).filter_map(|cell| cell.as_number()).sum()
}

/// 每行 长×宽×高/1e6×数量 之和；任一值无法转换时该行按 0 计，负值行也按 0 计
fn total_volume_m3(ds: &TabularDataset, l: usize, w: usize, h: usize, q: usize) -> f64 {
    let value = |row: &[CellValue], col: usize| {
        row.get(col).and_then(|c| c.as_number()).unwrap_or(0.0)
    };

    ds.rows
        .iter()
        .map(|row| {
            let row = row.as_slice();
            let per_unit = value(row, l) * value(row, w) * value(row, h) / MM3_PER_M3;
            (per_unit * value(row, q)).max(0.0)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn num(n: f64) -> CellValue {
        CellValue::Number(n)
    }

    fn dataset(headers: &[&str], rows: Vec<Vec<CellValue>>) -> TabularDataset {
        let mut ds = TabularDataset::new(headers.iter().map(|s| s.to_string()).collect());
        for row in rows {
            ds.push_row(row);
        }
        ds
    }

    fn extract(workbook: &MergedWorkbook) -> KpiRecord {
        let keywords = ColumnKeywords::default();
        MetricExtractor::new(&keywords).extract("DE", "DE2025-10-29.xlsx", workbook)
    }

    #[test]
    fn inventory_counts_sums_and_volume() {
        let mut wb = MergedWorkbook::default();
        wb.sheets.insert(
            Category::Inventory,
            dataset(
                &[" 商品条码 ", "库存量", "长(mm)", "宽(mm)", "高(mm)"],
                vec![
                    vec![text("A"), num(2.0), num(100.0), num(100.0), num(100.0)],
                    vec![text("A"), text("3"), num(10.0), num(10.0), num(10.0)],
                    vec![text("B"), text("n/a"), num(100.0), text("?"), num(100.0)],
                    vec![CellValue::Empty, num(1.0), num(1.0), num(1.0), num(1.0)],
                ],
            ),
        );

        let record = extract(&wb);
        assert_eq!(record.inv_sku, Some(2));
        assert_eq!(record.inv_qty, Some(6.0));
        // 2×1 + 3×0.001 + 0 + 1×0.000001
        let volume = record.inv_total_volume_m3.unwrap();
        assert!((volume - 2.003001).abs() < 1e-9, "volume was {}", volume);
    }

    #[test]
    fn negative_rows_do_not_reduce_volume() {
        let mut wb = MergedWorkbook::default();
        wb.sheets.insert(
            Category::Inventory,
            dataset(
                &["商品条码", "库存量", "长(mm)", "宽(mm)", "高(mm)"],
                vec![
                    vec![text("A"), num(-3.0), num(100.0), num(100.0), num(100.0)],
                    vec![text("B"), num(2.0), num(-100.0), num(100.0), num(100.0)],
                    vec![text("C"), num(1.0), num(100.0), num(100.0), num(100.0)],
                ],
            ),
        );

        let record = extract(&wb);
        // 数量之和保留符号，体积只累计非负行
        assert_eq!(record.inv_qty, Some(0.0));
        assert_eq!(record.inv_total_volume_m3, Some(1.0));
    }

    #[test]
    fn volume_undefined_without_dimension_columns() {
        let mut wb = MergedWorkbook::default();
        wb.sheets.insert(
            Category::Inventory,
            dataset(&["JD SKU", "Inventory QTY."], vec![vec![text("S1"), num(4.0)]]),
        );

        let record = extract(&wb);
        assert_eq!(record.inv_sku, Some(1));
        assert_eq!(record.inv_qty, Some(4.0));
        assert_eq!(record.inv_total_volume_m3, None);
    }

    #[test]
    fn volume_undefined_without_quantity_column() {
        let mut wb = MergedWorkbook::default();
        wb.sheets.insert(
            Category::Inventory,
            dataset(&["Length", "Width", "Height"], vec![vec![num(1.0), num(1.0), num(1.0)]]),
        );

        let record = extract(&wb);
        assert_eq!(record.inv_qty, None);
        assert_eq!(record.inv_total_volume_m3, None);
    }

    #[test]
    fn resolved_column_without_numbers_sums_to_zero_not_undefined() {
        let mut wb = MergedWorkbook::default();
        wb.sheets.insert(
            Category::Inbound,
            dataset(&["验收量"], vec![vec![text("x")], vec![CellValue::Empty]]),
        );

        let record = extract(&wb);
        assert_eq!(record.ib_qty, Some(0.0));
        assert_eq!(record.ib_order, None);
        assert_eq!(record.ib_sku, None);
    }

    #[test]
    fn inbound_uses_all_rows() {
        let mut wb = MergedWorkbook::default();
        wb.sheets.insert(
            Category::Inbound,
            dataset(
                &["客户入库单号", "商品编码", "验收量"],
                vec![
                    vec![text("IB-1"), text("G1"), num(10.0)],
                    vec![text("IB-1"), text("G2"), num(5.0)],
                    vec![text("IB-2"), text("G2"), text("1")],
                ],
            ),
        );

        let record = extract(&wb);
        assert_eq!(record.ib_order, Some(2));
        assert_eq!(record.ib_sku, Some(2));
        assert_eq!(record.ib_qty, Some(16.0));
    }

    #[test]
    fn outbound_skips_first_data_row() {
        let mut wb = MergedWorkbook::default();
        wb.sheets.insert(
            Category::Outbound,
            dataset(
                &["订单号", "复核数量"],
                vec![
                    vec![text("Order No."), text("Rechecked QTY")],
                    vec![text("O-1"), num(2.0)],
                    vec![text("O-2"), num(3.0)],
                    vec![text("O-2"), num(1.0)],
                ],
            ),
        );

        let record = extract(&wb);
        assert_eq!(record.ob_order, Some(2));
        assert_eq!(record.ob_qty, Some(6.0));
    }

    #[test]
    fn outbound_with_only_artifact_row_counts_zero() {
        let mut wb = MergedWorkbook::default();
        wb.sheets.insert(
            Category::Outbound,
            dataset(&["JD Outbound NO.", "QTY"], vec![vec![text("O-1"), num(9.0)]]),
        );

        let record = extract(&wb);
        assert_eq!(record.ob_order, Some(0));
        assert_eq!(record.ob_qty, Some(0.0));
    }

    #[test]
    fn missing_sheets_leave_kpis_undefined() {
        let record = extract(&MergedWorkbook::default());
        assert_eq!(record.warehouse, "DE");
        assert_eq!(record.source_file, "DE2025-10-29.xlsx");
        assert_eq!(record.inv_sku, None);
        assert_eq!(record.inv_qty, None);
        assert_eq!(record.inv_total_volume_m3, None);
        assert_eq!(record.ib_order, None);
        assert_eq!(record.ob_qty, None);
    }
}
