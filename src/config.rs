use crate::error::{AppError, AppResult, ConfigError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 默认配置文件名
const DEFAULT_CONFIG_FILE: &str = "review.toml";

/// 重试耗尽后对工作页的处理策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustedPolicy {
    /// 什么都不做，等待标签页被其他方式关闭
    #[default]
    Abandon,
    /// 强制关闭标签页并视为已移除
    ForceClose,
}

impl std::str::FromStr for ExhaustedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abandon" => Ok(Self::Abandon),
            "force_close" | "force-close" => Ok(Self::ForceClose),
            other => Err(format!("未知策略: {}", other)),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 找不到已打开的对局列表页时要打开的页面
    pub source_url: Option<String>,
    /// 分析完成后 URL 末尾 `?` 段的取值
    pub completion_marker: String,
    /// 评分元素的选择器
    pub rating_selector: String,
    /// 每个工作页最多探测次数
    pub max_probe_attempts: usize,
    /// 两次探测之间的间隔（毫秒）
    pub probe_interval_ms: u64,
    /// 等待全部工作页关闭时的轮询间隔（毫秒）
    pub join_poll_interval_ms: u64,
    /// 等待对局链接加载的最大重试次数
    pub link_wait_max_retries: usize,
    /// 等待对局链接加载的重试间隔（毫秒）
    pub link_wait_interval_ms: u64,
    /// 抓取完成到开始批处理之间的等待（毫秒）
    pub pre_batch_delay_ms: u64,
    /// 重试耗尽后的策略
    pub exhausted_policy: ExhaustedPolicy,
    /// 同时存在的工作页上限，不设置则不限制
    pub max_concurrent_workers: Option<usize>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 2001,
            source_url: None,
            completion_marker: "tab=review".to_string(),
            rating_selector: ".review-rating-component.review-rating-white span".to_string(),
            max_probe_attempts: 10,
            probe_interval_ms: 1000,
            join_poll_interval_ms: 2000,
            link_wait_max_retries: 10,
            link_wait_interval_ms: 500,
            pre_batch_delay_ms: 500,
            exhausted_policy: ExhaustedPolicy::Abandon,
            max_concurrent_workers: None,
            verbose_logging: false,
            output_log_file: "review_log.txt".to_string(),
        }
    }
}

impl Config {
    /// 加载配置：默认值 → TOML 文件 → 环境变量
    ///
    /// TOML 文件路径取自 `REVIEW_CONFIG`，未设置时尝试当前目录下的 `review.toml`。
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var("REVIEW_CONFIG") {
            Ok(path) => Self::from_toml_file(&path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_toml_file(DEFAULT_CONFIG_FILE)?
            }
            Err(_) => Self::default(),
        };

        let config = base.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件读取配置，缺省字段使用默认值
    pub fn from_toml_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            AppError::Config(ConfigError::TomlParseFailed { source, .. }) => {
                AppError::Config(ConfigError::TomlParseFailed {
                    path: path.display().to_string(),
                    source,
                })
            }
            other => other,
        })
    }

    /// 从 TOML 字符串解析配置
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|source| {
            AppError::Config(ConfigError::TomlParseFailed {
                path: String::new(),
                source,
            })
        })
    }

    /// 用环境变量覆盖已有配置
    pub fn with_env_overrides(self) -> AppResult<Self> {
        Ok(Self {
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT", "u16")?
                .unwrap_or(self.browser_debug_port),
            source_url: std::env::var("SOURCE_URL").ok().or(self.source_url),
            completion_marker: std::env::var("COMPLETION_MARKER")
                .unwrap_or(self.completion_marker),
            rating_selector: std::env::var("RATING_SELECTOR").unwrap_or(self.rating_selector),
            max_probe_attempts: env_parse("MAX_PROBE_ATTEMPTS", "usize")?
                .unwrap_or(self.max_probe_attempts),
            probe_interval_ms: env_parse("PROBE_INTERVAL_MS", "u64")?
                .unwrap_or(self.probe_interval_ms),
            join_poll_interval_ms: env_parse("JOIN_POLL_INTERVAL_MS", "u64")?
                .unwrap_or(self.join_poll_interval_ms),
            link_wait_max_retries: env_parse("LINK_WAIT_MAX_RETRIES", "usize")?
                .unwrap_or(self.link_wait_max_retries),
            link_wait_interval_ms: env_parse("LINK_WAIT_INTERVAL_MS", "u64")?
                .unwrap_or(self.link_wait_interval_ms),
            pre_batch_delay_ms: env_parse("PRE_BATCH_DELAY_MS", "u64")?
                .unwrap_or(self.pre_batch_delay_ms),
            exhausted_policy: env_parse("EXHAUSTED_POLICY", "abandon | force_close")?
                .unwrap_or(self.exhausted_policy),
            max_concurrent_workers: env_parse("MAX_CONCURRENT_WORKERS", "usize")?
                .or(self.max_concurrent_workers),
            verbose_logging: env_parse("VERBOSE_LOGGING", "bool")?
                .unwrap_or(self.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
        })
    }

    /// 检查配置值
    pub fn validate(&self) -> AppResult<()> {
        if self.completion_marker.trim().is_empty() {
            return Err(AppError::invalid_config("completion_marker", "不能为空"));
        }
        if self.rating_selector.trim().is_empty() {
            return Err(AppError::invalid_config("rating_selector", "不能为空"));
        }
        if self.max_probe_attempts == 0 {
            return Err(AppError::invalid_config("max_probe_attempts", "必须大于 0"));
        }
        if self.join_poll_interval_ms == 0 {
            return Err(AppError::invalid_config("join_poll_interval_ms", "必须大于 0"));
        }
        if self.max_concurrent_workers == Some(0) {
            return Err(AppError::invalid_config(
                "max_concurrent_workers",
                "必须大于 0，不限制请删除该项",
            ));
        }
        Ok(())
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn join_poll_interval(&self) -> Duration {
        Duration::from_millis(self.join_poll_interval_ms)
    }

    pub fn link_wait_interval(&self) -> Duration {
        Duration::from_millis(self.link_wait_interval_ms)
    }

    pub fn pre_batch_delay(&self) -> Duration {
        Duration::from_millis(self.pre_batch_delay_ms)
    }
}

/// 读取并解析环境变量，不存在时返回 `None`
fn env_parse<T: std::str::FromStr>(var_name: &str, expected_type: &str) -> AppResult<Option<T>> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse().map(Some).map_err(|_| {
            AppError::Config(ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            })
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_review_site() {
        let config = Config::default();
        assert_eq!(config.completion_marker, "tab=review");
        assert_eq!(config.max_probe_attempts, 10);
        assert_eq!(config.probe_interval(), Duration::from_secs(1));
        assert_eq!(config.join_poll_interval(), Duration::from_secs(2));
        assert_eq!(config.exhausted_policy, ExhaustedPolicy::Abandon);
        assert!(config.max_concurrent_workers.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            browser_debug_port = 9222
            exhausted_policy = "force_close"
            max_concurrent_workers = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.browser_debug_port, 9222);
        assert_eq!(config.exhausted_policy, ExhaustedPolicy::ForceClose);
        assert_eq!(config.max_concurrent_workers, Some(4));
        assert_eq!(config.probe_interval_ms, 1000);
        assert_eq!(config.completion_marker, "tab=review");
    }

    #[test]
    fn test_example_file_parses() {
        let config = Config::from_toml_str(include_str!("../review.example.toml")).unwrap();
        assert_eq!(config.browser_debug_port, 2001);
        assert_eq!(config.exhausted_policy, ExhaustedPolicy::Abandon);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = Config::from_toml_str("max_probe_attempts = \"many\"").unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::TomlParseFailed { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = Config {
            max_probe_attempts: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            max_concurrent_workers: Some(0),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            completion_marker: "  ".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_exhausted_policy_from_str() {
        assert_eq!("abandon".parse(), Ok(ExhaustedPolicy::Abandon));
        assert_eq!("Force-Close".parse(), Ok(ExhaustedPolicy::ForceClose));
        assert!("close".parse::<ExhaustedPolicy>().is_err());
    }
}
