//! 对局链接抓取 - 业务能力层
//!
//! 从用户打开的 chess.com 页面里找出所有"复盘"按钮的链接。
//! 个人主页直接查询即可；对局存档页是异步加载的（部分在 iframe 里），
//! 需要等链接出现后再读取。

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::JsExecutor;
use crate::models::{dedupe_targets, JobTarget};

/// 支持的来源页面前缀
pub const SOURCE_URL_PREFIXES: [&str; 3] = [
    "https://www.chess.com/member/",
    "https://www.chess.com/games/archive/",
    "https://www.chess.com/games/",
];

/// 个人主页上的复盘链接
const MEMBER_REVIEW_SELECTOR: &str = "a.archived-games-review";
/// 对局存档页上的复盘链接
const ARCHIVE_REVIEW_SELECTOR: &str = "a.archive-games-review";
/// 对局存档页里的对局列表 iframe
const ARCHIVE_IFRAME_SELECTOR: &str = r#"iframe[id="game-list-iframe"]"#;

/// 来源页面类型，取自 URL 的第一段路径
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSite {
    /// `https://www.chess.com/member/<name>`
    Member,
    /// `https://www.chess.com/games/...`
    Games,
}

impl SourceSite {
    pub fn from_url(url: &str) -> Option<Self> {
        match url.split('/').nth(3) {
            Some("member") => Some(SourceSite::Member),
            Some("games") => Some(SourceSite::Games),
            _ => None,
        }
    }
}

/// URL 是否是可以抓取对局链接的页面
pub fn is_source_page(url: &str) -> bool {
    SOURCE_URL_PREFIXES
        .iter()
        .any(|prefix| url.starts_with(prefix))
}

/// 查询选择器匹配的所有链接 href
fn links_script(selector: &str) -> String {
    format!(
        r#"
        (() => Array.from(document.querySelectorAll({}))
            .map(link => link.href))()
        "#,
        serde_json::Value::String(selector.to_string())
    )
}

/// 查询 iframe 文档中选择器匹配的所有链接 href，iframe 不存在时返回空数组
fn iframe_links_script(iframe_selector: &str, selector: &str) -> String {
    format!(
        r#"
        (() => {{
            const iframe = document.querySelector({});
            if (!iframe || !iframe.contentDocument) {{
                return [];
            }}
            return Array.from(iframe.contentDocument.querySelectorAll({}))
                .map(link => link.href);
        }})()
        "#,
        serde_json::Value::String(iframe_selector.to_string()),
        serde_json::Value::String(selector.to_string())
    )
}

/// 对局链接抓取器
pub struct LinkCollector {
    max_retries: usize,
    retry_interval: Duration,
}

impl LinkCollector {
    pub fn new(max_retries: usize, retry_interval: Duration) -> Self {
        Self {
            max_retries,
            retry_interval,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.link_wait_max_retries, config.link_wait_interval())
    }

    /// 根据来源页面类型抓取对局链接（已去重，保持页面顺序）
    pub async fn collect(&self, executor: &JsExecutor, page_url: &str) -> AppResult<Vec<JobTarget>> {
        let site = SourceSite::from_url(page_url)
            .ok_or_else(|| AppError::UnsupportedSite(page_url.to_string()))?;
        debug!("来源页面类型: {:?}", site);

        let links = match site {
            SourceSite::Member => self.collect_member(executor).await?,
            SourceSite::Games => self.collect_archive(executor).await?,
        };

        let targets = dedupe_targets(links);
        info!("✓ 提取到 {} 个待复盘的对局", targets.len());
        Ok(targets)
    }

    /// 个人主页：直接查询
    async fn collect_member(&self, executor: &JsExecutor) -> AppResult<Vec<String>> {
        executor
            .eval_as(links_script(MEMBER_REVIEW_SELECTOR))
            .await
            .map_err(|e| AppError::Scrape(e.to_string()))
    }

    /// 对局存档页：等主文档中的链接出现，再合并 iframe 中的链接
    async fn collect_archive(&self, executor: &JsExecutor) -> AppResult<Vec<String>> {
        let mut links = self
            .wait_for_links(ARCHIVE_REVIEW_SELECTOR, || {
                executor.eval_as::<Vec<String>>(links_script(ARCHIVE_REVIEW_SELECTOR))
            })
            .await?;

        let iframe_links: Vec<String> = match executor
            .eval_as(iframe_links_script(
                ARCHIVE_IFRAME_SELECTOR,
                ARCHIVE_REVIEW_SELECTOR,
            ))
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!("读取对局列表 iframe 失败，只使用主页面链接: {}", e);
                Vec::new()
            }
        };
        debug!(
            "主页面链接 {} 个, iframe 链接 {} 个",
            links.len(),
            iframe_links.len()
        );

        links.extend(iframe_links);
        Ok(links)
    }

    /// 反复读取直到拿到非空结果
    ///
    /// 首次读取之外最多重试 `max_retries` 次，仍为空则返回超时错误。
    pub async fn wait_for_links<F, Fut>(&self, selector: &str, mut read: F) -> AppResult<Vec<String>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<Vec<String>>>,
    {
        let mut retries = 0;
        loop {
            let links = read().await.map_err(|e| AppError::Scrape(e.to_string()))?;
            if !links.is_empty() {
                return Ok(links);
            }

            if retries >= self.max_retries {
                return Err(AppError::ScrapeTimeout {
                    selector: selector.to_string(),
                    retries,
                });
            }

            retries += 1;
            debug!(
                "选择器 {} 暂无结果 (重试 {}/{})",
                selector, retries, self.max_retries
            );
            sleep(self.retry_interval).await;
        }
    }
}
