use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// 文件类别（每个仓库每天需要的三类导出）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Outbound,
    Inbound,
    Inventory,
}

impl Category {
    /// 固定优先级顺序，同时也是合并工作簿的 sheet 顺序
    pub const ALL: [Category; 3] = [Category::Outbound, Category::Inbound, Category::Inventory];

    /// sheet 名称
    pub fn sheet_name(self) -> &'static str {
        match self {
            Category::Outbound => "Outbound",
            Category::Inbound => "Inbound",
            Category::Inventory => "Inventory",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

/// 已识别类别的源文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizedFile {
    pub category: Category,
    /// 绝对路径
    pub path: PathBuf,
    /// 源文件名
    pub file_name: String,
}

/// 单元格值
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    /// Excel 日期序列号
    DateTime(f64),
    Empty,
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// 数值转换：无法转换的返回 None（不当作 0）
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// 去重用的键；空单元格返回 None
    ///
    /// 数字与文本属于不同种类，数字 1 和文本 "1" 不相等。
    pub fn distinct_key(&self) -> Option<String> {
        match self {
            CellValue::Number(n) => Some(format!("n:{}", normalize_zero(*n))),
            CellValue::DateTime(n) => Some(format!("d:{}", normalize_zero(*n))),
            CellValue::Text(s) => Some(format!("t:{}", s)),
            CellValue::Empty => None,
        }
    }
}

fn normalize_zero(n: f64) -> f64 {
    if n == 0.0 {
        0.0
    } else {
        n
    }
}

/// 表格数据：有序的列，每列按行对齐
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularDataset {
    /// 原样保留的表头
    pub headers: Vec<String>,
    /// 数据行（不含表头），每行长度与表头相同
    pub rows: Vec<Vec<CellValue>>,
}

impl TabularDataset {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// 追加一行，长度不足补空，超出截断
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.headers.len(), CellValue::Empty);
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// 去除首尾空白后的表头，用于列匹配
    pub fn trimmed_headers(&self) -> Vec<String> {
        self.headers.iter().map(|h| h.trim().to_string()).collect()
    }

    /// 按列下标取整列，从 `skip` 行开始
    pub fn column(&self, index: usize, skip: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows
            .iter()
            .skip(skip)
            .map(move |row| row.get(index).unwrap_or(&CellValue::Empty))
    }
}

/// 合并后的工作簿，按类别索引
#[derive(Debug, Clone, Default)]
pub struct MergedWorkbook {
    pub sheets: HashMap<Category, TabularDataset>,
}

impl MergedWorkbook {
    pub fn sheet(&self, category: Category) -> Option<&TabularDataset> {
        self.sheets.get(&category)
    }
}

/// 单个仓库的 KPI 记录
///
/// `None` 表示无法计算（列缺失或 sheet 缺失），与计算结果为 0 区分开。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiRecord {
    #[serde(rename = "仓库 / Warehouse")]
    pub warehouse: String,
    #[serde(rename = "文件 / File")]
    pub source_file: String,
    #[serde(rename = "库存SKU数 / inv_sku_qty_cur")]
    pub inv_sku: Option<u64>,
    #[serde(rename = "库存总量 / inv_units_qty_cur")]
    pub inv_qty: Option<f64>,
    #[serde(rename = "入库订单数 / ib_order_qty_cur")]
    pub ib_order: Option<u64>,
    #[serde(rename = "入库SKU数 / ib_sku_qty_cur")]
    pub ib_sku: Option<u64>,
    #[serde(rename = "入库总量 / ib_units_qty_cur")]
    pub ib_qty: Option<f64>,
    #[serde(rename = "出库订单数 / ob_order_qty_cur")]
    pub ob_order: Option<u64>,
    #[serde(rename = "出库总量 / ob_units_qty_cur")]
    pub ob_qty: Option<f64>,
    #[serde(rename = "在库总体积(m³ CBM) / inv_total_volume_m3")]
    pub inv_total_volume_m3: Option<f64>,
}

/// 合并输出位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// 保存回原文件夹
    InPlace,
    /// 统一输出目录
    Unified,
}

/// 文件名关键词（按 Outbound、Inbound、Inventory 的优先级匹配）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryKeywords {
    pub outbound: String,
    pub inbound: String,
    pub inventory: String,
}

impl CategoryKeywords {
    pub fn keyword(&self, category: Category) -> &str {
        match category {
            Category::Outbound => &self.outbound,
            Category::Inbound => &self.inbound,
            Category::Inventory => &self.inventory,
        }
    }
}

impl Default for CategoryKeywords {
    fn default() -> Self {
        Self {
            outbound: "checkPackageNumber".to_string(),
            inbound: "acceptanceOfDataQuery".to_string(),
            inventory: "commodityInventoryInformationInquiry".to_string(),
        }
    }
}

/// 各 KPI 列的候选表头关键词，排在前面的优先
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnKeywords {
    pub inventory_sku: Vec<String>,
    pub inventory_qty: Vec<String>,
    pub inventory_length: Vec<String>,
    pub inventory_width: Vec<String>,
    pub inventory_height: Vec<String>,
    pub inbound_order: Vec<String>,
    pub inbound_sku: Vec<String>,
    pub inbound_qty: Vec<String>,
    pub outbound_order: Vec<String>,
    pub outbound_qty: Vec<String>,
}

fn keywords(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for ColumnKeywords {
    fn default() -> Self {
        Self {
            inventory_sku: keywords(&["JD SKU", "商品条码"]),
            inventory_qty: keywords(&["库存量", "Inventory QTY."]),
            inventory_length: keywords(&["长", "Length"]),
            inventory_width: keywords(&["宽", "Width"]),
            inventory_height: keywords(&["高", "Height"]),
            inbound_order: keywords(&["客户入库单号", "JD Inbound NO."]),
            inbound_sku: keywords(&["商品编码", "Goods NO."]),
            inbound_qty: keywords(&["验收量", "Receiving QTY."]),
            outbound_order: keywords(&["订单号", "JD Outbound NO.", "出库单号"]),
            outbound_qty: keywords(&["复核数量", "Rechecked QTY", "QTY"]),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 仓库子文件夹所在的父目录
    pub parent_dir: String,
    /// 输出模式
    pub output_mode: OutputMode,
    /// 统一输出目录（相对 parent_dir）
    pub unified_output_dir: String,
    /// 文件类别关键词
    pub category_keywords: CategoryKeywords,
    /// 跳过的文件夹
    pub folder_denylist: Vec<String>,
    /// 列匹配关键词
    pub column_keywords: ColumnKeywords,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            parent_dir: ".".to_string(),
            output_mode: OutputMode::InPlace,
            unified_output_dir: "merged_outputs".to_string(),
            category_keywords: CategoryKeywords::default(),
            folder_denylist: keywords(&["warelytic", "__pycache__", "merged_outputs"]),
            column_keywords: ColumnKeywords::default(),
        }
    }
}

impl AppConfig {
    pub fn parent_path(&self) -> PathBuf {
        PathBuf::from(&self.parent_dir)
    }

    pub fn unified_output_path(&self) -> PathBuf {
        self.parent_path().join(&self.unified_output_dir)
    }
}

/// 单次运行的参数（不持久化）
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// 目标日期
    pub target_date: NaiveDate,
    /// 是否删除非目标日期或无关键词的文件
    pub delete_others: bool,
}

impl RunOptions {
    /// `YYYY-MM-DD`
    pub fn date_str(&self) -> String {
        self.target_date.format("%Y-%m-%d").to_string()
    }
}

/// 合并阶段的结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub processed: usize,
    pub succeeded: usize,
    pub deleted: usize,
    pub delete_failures: usize,
    pub outputs: Vec<PathBuf>,
}

impl RunReport {
    pub fn failed_or_skipped(&self) -> usize {
        self.processed - self.succeeded
    }
}

/// 汇总阶段的结果
#[derive(Debug, Clone, Default)]
pub struct SummaryReport {
    pub records: Vec<KpiRecord>,
    pub failed: usize,
    /// 未写入时为 None（没有任何记录）
    pub output_path: Option<PathBuf>,
}
