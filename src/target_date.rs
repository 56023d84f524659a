use crate::error::{PipelineError, Result};
use chrono::{Duration, NaiveDate};

/// 校验并转换 `YYYY-MM-DD`
pub fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .map_err(|_| PipelineError::InvalidDate(date_str.to_string()))
}

/// 确定目标日期
///
/// 无参数 → 今天；`yesterday` → 今天减一天；否则使用位置参数或 `--date`。
/// 三者互斥由命令行层保证，这里按 yesterday、位置参数、`--date` 的顺序取第一个。
pub fn resolve_target_date(
    today: NaiveDate,
    yesterday: bool,
    positional: Option<&str>,
    explicit: Option<&str>,
) -> Result<NaiveDate> {
    if yesterday {
        return Ok(today - Duration::days(1));
    }
    if let Some(date) = positional {
        return parse_date(date);
    }
    if let Some(date) = explicit {
        return parse_date(date);
    }
    Ok(today)
}
