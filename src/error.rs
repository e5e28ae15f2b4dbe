use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器连接 / 协议层错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),

    /// 创建工作页失败（整个批次中止）
    #[error("创建工作页失败 ({url}): {message}")]
    WorkerSpawn { url: String, message: String },

    /// 并发许可已关闭，无法再创建工作页
    #[error("并发许可已关闭: {0}")]
    AdmissionClosed(#[from] tokio::sync::AcquireError),

    /// 工作页已不存在
    #[error("工作页 {0} 已不存在")]
    WorkerGone(String),

    /// 页面脚本返回了无法识别的结果
    #[error("脚本结果无法解析: {0}")]
    Script(String),

    /// 抓取对局链接失败
    #[error("抓取对局链接失败: {0}")]
    Scrape(String),

    /// 等待对局链接超时
    #[error("等待选择器 \"{selector}\" 超时 (已重试 {retries} 次)")]
    ScrapeTimeout { selector: String, retries: usize },

    /// 当前页面不在支持的站点范围内
    #[error("不支持的页面: {0}")]
    UnsupportedSite(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 文件读写错误
    #[error("文件错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {message}")]
    ConnectionFailed { port: u16, message: String },

    /// 没有可用的来源页面
    #[error("未找到 chess.com 对局列表页面，且未配置 source_url")]
    SourcePageNotFound,

    /// CDP 调用失败
    #[error("CDP 调用失败: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },

    /// TOML 配置文件解析失败
    #[error("配置文件 {path} 解析失败: {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::Cdp(err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Script(err.to_string())
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建工作页创建失败错误
    pub fn worker_spawn_failed(url: impl Into<String>, source: impl std::fmt::Display) -> Self {
        AppError::WorkerSpawn {
            url: url.into(),
            message: source.to_string(),
        }
    }

    /// 创建非法配置错误
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        AppError::Config(ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
