use crate::error::{PipelineError, Result};
use crate::models::{AppConfig, CategorizedFile, Category, CategoryKeywords, OutputMode, RunOptions};
use crate::summary::parse_merged_name;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// 单个文件名的判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileDecision {
    /// 匹配到类别
    Matched(Category),
    /// 删除（仅在删除模式下出现）
    Delete,
    /// 不含目标日期，保留不动
    SkipWrongDate,
    /// 含日期但无关键词，保留不动
    SkipNoKeyword,
    /// 本文件夹当天的合并结果，任何模式下都不删除
    KeepMerged,
}

/// 单个子文件夹的扫描结果
#[derive(Debug, Default)]
pub struct FolderScan {
    pub files: BTreeMap<Category, CategorizedFile>,
    pub excel_files: usize,
    pub deleted: usize,
    pub delete_failures: usize,
}

impl FolderScan {
    /// 缺少的类别
    pub fn missing(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| !self.files.contains_key(c))
            .collect()
    }
}

/// 按文件名关键词和日期给文件分类
#[derive(Debug, Clone)]
pub struct FileClassifier<'a> {
    keywords: &'a CategoryKeywords,
    date_str: String,
    delete_others: bool,
}

impl<'a> FileClassifier<'a> {
    pub fn new(keywords: &'a CategoryKeywords, options: &RunOptions) -> Self {
        Self {
            keywords,
            date_str: options.date_str(),
            delete_others: options.delete_others,
        }
    }

    /// 判定单个文件名（不触碰文件系统）
    ///
    /// 关键词按 Outbound、Inbound、Inventory 顺序匹配，第一个命中的为准。
    /// `folder_name` 用于识别本文件夹自己的 `<folder><date>[(N)].xlsx`。
    pub fn decide(&self, folder_name: &str, file_name: &str) -> FileDecision {
        if !file_name.contains(&self.date_str) {
            return if self.delete_others {
                FileDecision::Delete
            } else {
                FileDecision::SkipWrongDate
            };
        }

        for category in Category::ALL {
            let keyword = self.keywords.keyword(category);
            if !keyword.is_empty() && file_name.contains(keyword) {
                return FileDecision::Matched(category);
            }
        }

        if parse_merged_name(file_name, &self.date_str).is_some_and(|(code, _)| code == folder_name) {
            return FileDecision::KeepMerged;
        }

        if self.delete_others {
            FileDecision::Delete
        } else {
            FileDecision::SkipNoKeyword
        }
    }

    /// 扫描子文件夹内的 Excel 文件，绑定三类文件，按需删除其它文件
    ///
    /// 同一类别有多个候选时，按文件名排序后最后一个为准。
    pub fn scan_folder(&self, folder: &Path) -> Result<FolderScan> {
        let excel_files = list_excel_files(folder)?;
        info!(
            "发现 Found {} 个 Excel 文件: {:?}",
            excel_files.len(),
            excel_files
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy())
                .collect::<Vec<_>>()
        );

        let folder_name = folder
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut scan = FolderScan {
            excel_files: excel_files.len(),
            ..FolderScan::default()
        };

        for path in excel_files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            match self.decide(&folder_name, &file_name) {
                FileDecision::Matched(category) => {
                    info!("匹配 Match {} → {}", file_name, category);
                    let file = CategorizedFile {
                        category,
                        path: path.clone(),
                        file_name,
                    };
                    if let Some(previous) = scan.files.insert(category, file) {
                        warn!(
                            "重复匹配 Duplicate {}: {} 被替换为 replaced by {}",
                            category,
                            previous.file_name,
                            path.display()
                        );
                    }
                }
                FileDecision::Delete => remove_counted(&path, &file_name, &mut scan),
                FileDecision::SkipWrongDate => {
                    info!("跳过 Skip {}: 不含目标日期 missing target date {}", file_name, self.date_str);
                }
                FileDecision::SkipNoKeyword => {
                    info!("跳过 Skip {}: 无关键词 no keyword", file_name);
                }
                FileDecision::KeepMerged => {
                    info!("保留合并文件 Keep merged output: {}", file_name);
                }
            }
        }

        if self.delete_others {
            info!("已删除文件数 Files deleted: {}", scan.deleted);
        }

        Ok(scan)
    }
}

/// 删除文件并计数，失败只记录日志
fn remove_counted(path: &Path, file_name: &str, scan: &mut FolderScan) {
    info!("删除文件 Deleting file: {}", file_name);
    match fs::remove_file(path) {
        Ok(()) => scan.deleted += 1,
        Err(e) => {
            warn!("删除失败 Delete failed {}: {}", file_name, e);
            scan.delete_failures += 1;
        }
    }
}

/// 列出父目录下需要处理的子文件夹（按名称排序）
///
/// 跳过隐藏项、非目录和黑名单中的文件夹。父目录不可读时返回错误。
pub fn list_candidate_folders(config: &AppConfig) -> Result<Vec<PathBuf>> {
    let parent = config.parent_path();
    let mut folders = Vec::new();

    for entry in WalkDir::new(&parent)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(unreadable(&parent, e)),
            Err(e) => {
                warn!("无法读取 Cannot read entry: {}", e);
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || is_denylisted(config, &name) {
            continue;
        }
        if !entry.file_type().is_dir() {
            continue;
        }
        folders.push(entry.into_path());
    }

    Ok(folders)
}

fn is_denylisted(config: &AppConfig, name: &str) -> bool {
    config.folder_denylist.iter().any(|d| d == name)
        || (config.output_mode == OutputMode::Unified && name == config.unified_output_dir)
}

/// 列出文件夹内的 Excel 文件（不递归，跳过临时锁文件）
fn list_excel_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(unreadable(folder, e)),
            Err(e) => {
                warn!("无法读取 Cannot read entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if is_spreadsheet(path) {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// `.xlsx` / `.xls`，排除 `~$` 开头的锁文件
pub fn is_spreadsheet(path: &Path) -> bool {
    let Some(ext) = path.extension() else {
        return false;
    };
    let ext_str = ext.to_string_lossy().to_lowercase();
    if ext_str != "xls" && ext_str != "xlsx" {
        return false;
    }
    // 跳过临时文件
    !path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .starts_with("~$")
}

fn unreadable(path: &Path, e: walkdir::Error) -> PipelineError {
    let source = e
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "directory walk failed"));
    PipelineError::DirectoryUnreadable {
        path: path.to_path_buf(),
        source,
    }
}
