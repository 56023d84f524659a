use crate::error::{PipelineError, Result};
use crate::models::AppConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const CONFIG_FILE: &str = "config.json";

/// 获取配置文件路径
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("warelytic")
        .join(CONFIG_FILE)
}

/// 加载配置，文件不存在或无法解析时使用默认值
pub fn load_config(path: &Path) -> AppConfig {
    if path.exists() {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
                Ok(config) => return config,
                Err(e) => warn!("配置解析失败 Invalid config {}: {}", path.display(), e),
            },
            Err(e) => warn!("配置读取失败 Cannot read config {}: {}", path.display(), e),
        }
    }
    AppConfig::default()
}

/// 保存配置
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    // 创建配置目录
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| PipelineError::Config(format!("创建配置目录失败: {}", e)))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| PipelineError::Config(format!("序列化配置失败: {}", e)))?;

    fs::write(path, content).map_err(|e| PipelineError::Config(format!("保存配置失败: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutputMode;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("nope.json"));
        assert_eq!(config.parent_dir, ".");
        assert_eq!(config.output_mode, OutputMode::InPlace);
    }

    #[test]
    fn garbage_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "{not json").unwrap();
        assert_eq!(load_config(&path).unified_output_dir, "merged_outputs");
    }

    #[test]
    fn save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join(CONFIG_FILE);

        let mut config = AppConfig::default();
        config.parent_dir = "/srv/exports".to_string();
        config.output_mode = OutputMode::Unified;
        config.column_keywords.outbound_qty = vec!["QTY".to_string()];
        save_config(&config, &path).unwrap();

        let loaded = load_config(&path);
        assert_eq!(loaded.parent_dir, "/srv/exports");
        assert_eq!(loaded.output_mode, OutputMode::Unified);
        assert_eq!(loaded.column_keywords.outbound_qty, vec!["QTY".to_string()]);
        assert_eq!(loaded.column_keywords.inbound_qty, vec!["验收量", "Receiving QTY."]);
    }
}
