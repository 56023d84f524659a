pub mod column_resolver;
pub mod config;
pub mod error;
pub mod excel_parser;
pub mod file_classifier;
pub mod metric_extractor;
pub mod models;
pub mod summary;
pub mod target_date;
pub mod workbook_writer;

use error::{PipelineError, Result};
use excel_parser::{read_dataset, read_merged_workbook};
use file_classifier::{list_candidate_folders, FileClassifier};
use metric_extractor::MetricExtractor;
use models::{AppConfig, MergedWorkbook, OutputMode, RunOptions, RunReport, SummaryReport};
use std::fs;
use std::path::{Path, PathBuf};
use summary::{find_merged_files, summary_path, write_summary, SummaryDataset};
use tracing::{error, info, warn};
use workbook_writer::{resolve_output_path, write_merged_workbook};

/// 合并每个子文件夹中目标日期的三个导出文件
///
/// 文件夹之间互不影响：某个文件夹失败只记录日志并跳过。
/// 只有父目录不可读（或统一输出目录无法创建）时返回错误。
pub fn merge_exports(config: &AppConfig, options: &RunOptions) -> Result<RunReport> {
    let date_str = options.date_str();
    info!("开始执行 - 目标日期 Target date: {}", date_str);
    info!("父目录 Parent directory: {}", config.parent_dir);
    info!("输出模式 Output mode: {:?}", config.output_mode);
    info!("删除非匹配文件 Delete non-matching files: {}", options.delete_others);

    if config.output_mode == OutputMode::Unified {
        let output_dir = config.unified_output_path();
        fs::create_dir_all(&output_dir)?;
        info!("统一输出目录 Unified output directory: {}", output_dir.display());
    }

    let classifier = FileClassifier::new(&config.category_keywords, options);
    let mut report = RunReport::default();

    for folder in list_candidate_folders(config)? {
        info!("处理子文件夹 Processing subfolder: {}", folder.display());
        report.processed += 1;

        match merge_folder(config, &classifier, &folder, &date_str, &mut report) {
            Ok(output) => {
                info!("合并成功 Merge succeeded: {}", output.display());
                report.succeeded += 1;
                report.outputs.push(output);
            }
            Err(e @ PipelineError::MissingCategories(_)) => {
                warn!("{}，跳过此文件夹 Skip this folder", e);
            }
            Err(e) => {
                error!("{}，跳过此文件夹 Skip this folder", e);
            }
        }
    }

    info!("执行完成 Execution completed!");
    info!("处理子文件夹 Subfolders processed: {}", report.processed);
    info!("成功合并 Successfully merged: {}", report.succeeded);
    info!("失败或跳过 Failed or skipped: {}", report.failed_or_skipped());
    if options.delete_others {
        info!("已删除文件 Files deleted: {}", report.deleted);
        if report.delete_failures > 0 {
            warn!("删除失败 Delete failures: {}", report.delete_failures);
        }
    }

    Ok(report)
}

fn merge_folder(
    config: &AppConfig,
    classifier: &FileClassifier<'_>,
    folder: &Path,
    date_str: &str,
    report: &mut RunReport,
) -> Result<PathBuf> {
    let scan = classifier.scan_folder(folder)?;
    report.deleted += scan.deleted;
    report.delete_failures += scan.delete_failures;

    let missing = scan.missing();
    if !missing.is_empty() {
        return Err(PipelineError::MissingCategories(missing));
    }

    // 任一文件读取失败则整个文件夹放弃，不写部分结果
    let mut merged = MergedWorkbook::default();
    for (category, file) in &scan.files {
        info!("读取文件 Reading {}: {}", category, file.file_name);
        let dataset = read_dataset(&file.path)?;
        info!(
            "读取成功 Read success: {} 行 rows × {} 列 cols",
            dataset.row_count(),
            dataset.column_count()
        );
        merged.sheets.insert(*category, dataset);
    }

    let folder_name = folder
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let output_dir = match config.output_mode {
        OutputMode::InPlace => folder.to_path_buf(),
        OutputMode::Unified => config.unified_output_path(),
    };
    let output_path = resolve_output_path(&output_dir, &folder_name, date_str);

    info!("输出文件 Writing merged file: {}", output_path.display());
    write_merged_workbook(&merged, &output_path)?;

    Ok(output_path)
}

/// 读取目标日期的合并工作簿，提取 KPI 并写入汇总文件
///
/// 单个工作簿读取失败只跳过该仓库。没有任何记录时不写文件。
pub fn summarize_merged(config: &AppConfig, options: &RunOptions) -> Result<SummaryReport> {
    let date_str = options.date_str();
    info!("开始数据处理 - 日期 Date: {}", date_str);

    let merged_files = find_merged_files(config, &date_str)?;
    let extractor = MetricExtractor::new(&config.column_keywords);
    let mut report = SummaryReport::default();

    for file in &merged_files {
        info!("处理 Processing: {}/{}", file.warehouse, file.file_name);
        match read_merged_workbook(&file.path) {
            Ok(workbook) => {
                let record = extractor.extract(&file.warehouse, &file.file_name, &workbook);
                report.records.push(record);
            }
            Err(e) => {
                error!("处理失败 Processing failed: {}", e);
                report.failed += 1;
            }
        }
    }

    let dataset = SummaryDataset::new(report.records.clone());
    if dataset.is_empty() {
        warn!("未找到统合文件 No merged workbooks for {}, summary not written", date_str);
        return Ok(report);
    }

    let path = summary_path(&config.parent_path(), &date_str);
    write_summary(&dataset, &path)?;
    info!("已保存汇总文件 Summary saved: {}", path.display());
    report.output_path = Some(path);

    Ok(report)
}
