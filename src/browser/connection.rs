use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{AppResult, BrowserError};
use crate::services::is_source_page;

/// 连接到浏览器并找到对局列表页面
///
/// 优先使用已经打开的 chess.com 个人主页 / 对局存档页；
/// 都没有时打开 `source_url`，未配置则报错。
pub async fn connect_to_browser_and_page(
    port: u16,
    source_url: Option<&str>,
) -> AppResult<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        BrowserError::ConnectionFailed {
            port,
            message: e.to_string(),
        }
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let pages = browser.pages().await.map_err(BrowserError::from)?;
    debug!("获取到 {} 个页面", pages.len());

    for p in pages.iter() {
        if let Ok(Some(url)) = p.url().await {
            debug!("检查页面: {}", url);
            if is_source_page(&url) {
                info!("✓ 找到对局列表页面: {}", url);
                return Ok((browser, p.clone()));
            }
        }
    }

    let Some(url) = source_url else {
        return Err(BrowserError::SourcePageNotFound.into());
    };

    debug!("未找到已打开的对局列表页面，创建新页面并导航到: {}", url);
    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建新页面失败: {}", e);
        BrowserError::from(e)
    })?;
    page.goto(url).await.map_err(|e| {
        error!("导航到 {} 失败: {}", url, e);
        BrowserError::from(e)
    })?;
    info!("已导航到: {}", url);

    Ok((browser, page))
}
