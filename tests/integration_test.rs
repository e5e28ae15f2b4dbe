use review_all_games::browser::connect_to_browser_and_page;
use review_all_games::config::Config;
use review_all_games::services::LinkCollector;
use review_all_games::utils::logging;
use review_all_games::{BatchCoordinator, ChromeHost, JobTarget, JsExecutor, WorkerHost};
use std::sync::Arc;

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_browser_connection() {
    logging::init(true);

    let config = Config::load().expect("加载配置失败");

    // 需要先用 --remote-debugging-port 启动浏览器并打开 chess.com 对局列表
    let result =
        connect_to_browser_and_page(config.browser_debug_port, config.source_url.as_deref()).await;

    assert!(result.is_ok(), "应该能够成功连接浏览器");
}

#[tokio::test]
#[ignore]
async fn test_collect_links_from_open_page() {
    logging::init(true);

    let config = Config::load().expect("加载配置失败");
    let (_browser, page) =
        connect_to_browser_and_page(config.browser_debug_port, config.source_url.as_deref())
            .await
            .expect("连接浏览器失败");
    let url = page.url().await.expect("读取 URL 失败").unwrap_or_default();

    let targets = LinkCollector::from_config(&config)
        .collect(&JsExecutor::new(page), &url)
        .await
        .expect("提取对局链接失败");

    println!("找到 {} 个待复盘的对局", targets.len());
}

#[tokio::test]
#[ignore]
async fn test_review_single_game() {
    logging::init(true);

    let config = Config::load().expect("加载配置失败");
    let (browser, page) =
        connect_to_browser_and_page(config.browser_debug_port, config.source_url.as_deref())
            .await
            .expect("连接浏览器失败");
    let url = page.url().await.expect("读取 URL 失败").unwrap_or_default();

    let targets = LinkCollector::from_config(&config)
        .collect(&JsExecutor::new(page), &url)
        .await
        .expect("提取对局链接失败");
    let first = targets.into_iter().take(1).collect::<Vec<_>>();

    let host = Arc::new(ChromeHost::new(browser).await.expect("订阅标签页事件失败"));
    let report = BatchCoordinator::from_config(host, &config)
        .run_batch(&first)
        .await
        .expect("复盘失败");

    assert_eq!(report.spawned, first.len());
}

#[tokio::test]
#[ignore]
async fn test_chrome_host_destroy_twice() {
    logging::init(true);

    let config = Config::load().expect("加载配置失败");
    let (browser, _page) =
        connect_to_browser_and_page(config.browser_debug_port, config.source_url.as_deref())
            .await
            .expect("连接浏览器失败");

    let host = ChromeHost::new(browser).await.expect("订阅标签页事件失败");
    let worker = host
        .spawn_worker(&JobTarget::from("about:blank"))
        .await
        .expect("创建标签页失败");
    assert_eq!(host.live_workers(), 1);

    host.destroy_worker(&worker.id).await.expect("关闭标签页失败");
    host.destroy_worker(&worker.id).await.expect("重复关闭应该是空操作");
    host.unobserve_removal(&worker.id);
    host.unobserve_removal(&worker.id);
    assert_eq!(host.live_workers(), 0);
}
