use crate::models::Category;
use std::path::PathBuf;
use thiserror::Error;

/// 批处理过程中的错误
///
/// 列缺失和单元格数值转换失败不在这里：它们是 `None`，不是错误。
#[derive(Error, Debug)]
pub enum PipelineError {
    /// 目录无法读取（文件夹级别，跳过该文件夹）
    #[error("无法读取目录 Cannot read folder {path}: {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 缺少必需的类别文件
    #[error("缺少文件 Missing files: {0:?}")]
    MissingCategories(Vec<Category>),

    /// 源表格读取失败
    #[error("读取失败 Read failed {path}: {message}")]
    SourceRead { path: PathBuf, message: String },

    /// 合并工作簿写入失败
    #[error("合并失败 Merge write failed {path}: {message}")]
    WorkbookWrite { path: PathBuf, message: String },

    /// 汇总文件写入失败
    #[error("汇总写入失败 Summary write failed {path}: {message}")]
    SummaryWrite { path: PathBuf, message: String },

    /// 汇总文件读取失败
    #[error("汇总读取失败 Summary read failed {path}: {message}")]
    SummaryRead { path: PathBuf, message: String },

    /// 日期格式错误
    #[error("日期格式错误 Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// 配置错误
    #[error("配置错误 Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
