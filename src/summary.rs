use crate::error::{PipelineError, Result};
use crate::file_classifier::list_candidate_folders;
use crate::models::{AppConfig, KpiRecord, OutputMode};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 汇总数据：每个仓库一行，保持处理顺序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryDataset {
    pub records: Vec<KpiRecord>,
}

impl SummaryDataset {
    pub fn new(records: Vec<KpiRecord>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 按仓库代码查找
    pub fn get(&self, warehouse: &str) -> Option<&KpiRecord> {
        self.records.iter().find(|r| r.warehouse == warehouse)
    }
}

/// 汇总文件路径 `<parent>/warehouse_summary_<date>.csv`
pub fn summary_path(parent_dir: &Path, date_str: &str) -> PathBuf {
    parent_dir.join(format!("warehouse_summary_{}.csv", date_str))
}

/// 写入汇总文件（整体替换，不追加）
///
/// UTF-8 带 BOM，逗号分隔；无法计算的 KPI 写为空字段。
pub fn write_summary(dataset: &SummaryDataset, path: &Path) -> Result<()> {
    let write_err = |e: &dyn std::fmt::Display| PipelineError::SummaryWrite {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut file = fs::File::create(path).map_err(|e| write_err(&e))?;
    file.write_all(UTF8_BOM).map_err(|e| write_err(&e))?;

    let mut writer = csv::Writer::from_writer(file);
    for record in &dataset.records {
        writer.serialize(record).map_err(|e| write_err(&e))?;
    }
    writer.flush().map_err(|e| write_err(&e))?;

    Ok(())
}

/// 读取汇总文件，供报告生成使用
pub fn load_summary(path: &Path) -> Result<SummaryDataset> {
    let read_err = |e: &dyn std::fmt::Display| PipelineError::SummaryRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let bytes = fs::read(path).map_err(|e| read_err(&e))?;
    let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes[..]);

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(content);
    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: KpiRecord = result.map_err(|e| read_err(&e))?;
        records.push(record);
    }

    Ok(SummaryDataset::new(records))
}

/// 已合并的工作簿
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedFile {
    pub warehouse: String,
    pub file_name: String,
    pub path: PathBuf,
}

/// 解析 `<code><date>.xlsx` 或 `<code><date>(N).xlsx`，返回 (code, N)
pub fn parse_merged_name(file_name: &str, date_str: &str) -> Option<(String, u32)> {
    let stem = file_name.strip_suffix(".xlsx")?;
    let pos = stem.rfind(date_str)?;
    let code = &stem[..pos];
    if code.is_empty() {
        return None;
    }

    let rest = &stem[pos + date_str.len()..];
    let suffix = if rest.is_empty() {
        0
    } else {
        rest.strip_prefix('(')?.strip_suffix(')')?.parse::<u32>().ok()?
    };

    Some((code.to_string(), suffix))
}

/// 查找目标日期的合并工作簿，每个仓库取编号最大（最近一次）的那个
pub fn find_merged_files(config: &AppConfig, date_str: &str) -> Result<Vec<MergedFile>> {
    let mut found: Vec<MergedFile> = Vec::new();

    match config.output_mode {
        OutputMode::InPlace => {
            for folder in list_candidate_folders(config)? {
                let folder_name = folder
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let latest = latest_by_code(&folder, date_str)
                    .remove(&folder_name)
                    .map(|(_, file)| file);
                found.extend(latest);
            }
        }
        OutputMode::Unified => {
            let dir = config.unified_output_path();
            found.extend(latest_by_code(&dir, date_str).into_values().map(|(_, file)| file));
        }
    }

    info!("发现 Found {} 个合并文件 merged workbooks", found.len());
    for file in &found {
        info!("  → {}/{}", file.warehouse, file.file_name);
    }
    Ok(found)
}

fn latest_by_code(dir: &Path, date_str: &str) -> BTreeMap<String, (u32, MergedFile)> {
    let mut latest: BTreeMap<String, (u32, MergedFile)> = BTreeMap::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("无法读取目录 Cannot read folder {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        let Some((code, suffix)) = parse_merged_name(&file_name, date_str) else {
            continue;
        };
        if latest.get(&code).is_some_and(|(best, _)| *best >= suffix) {
            continue;
        }
        let file = MergedFile {
            warehouse: code.clone(),
            file_name,
            path: entry.into_path(),
        };
        latest.insert(code, (suffix, file));
    }

    latest
}
