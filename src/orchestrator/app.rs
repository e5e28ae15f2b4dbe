//! 应用入口 - 编排层
//!
//! 1. **初始化**：写日志文件头、连接浏览器、找到对局列表页面、创建 `ChromeHost`
//! 2. **抓取**：从对局列表页面提取所有待复盘的对局链接
//! 3. **批处理**：交给 `BatchCoordinator`，等所有标签页关闭
//! 4. **统计**：输出并记录最终结果

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::browser;
use crate::config::Config;
use crate::infrastructure::{ChromeHost, JsExecutor};
use crate::models::JobTarget;
use crate::orchestrator::batch_coordinator::{BatchCoordinator, BatchReport};
use crate::services::LinkCollector;
use crate::utils::logging::{append_log_line, init_log_file, log_startup, truncate_text};

/// 应用主结构
pub struct App {
    config: Config,
    source: JsExecutor,
    source_url: String,
    host: Arc<ChromeHost>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file).context("无法创建日志文件")?;

        log_startup(&config);

        // 连接浏览器并找到对局列表页面
        let (browser, page) = browser::connect_to_browser_and_page(
            config.browser_debug_port,
            config.source_url.as_deref(),
        )
        .await?;

        let source_url = page
            .url()
            .await
            .context("无法读取对局列表页面的 URL")?
            .unwrap_or_default();

        let host = ChromeHost::new(browser)
            .await
            .context("无法订阅标签页事件")?;

        Ok(Self {
            config,
            source: JsExecutor::new(page),
            source_url,
            host: Arc::new(host),
        })
    }

    /// 运行一次"复盘全部对局"
    pub async fn run(&self) -> Result<BatchReport> {
        info!("♟️ 欢迎使用 chess.com 批量复盘");

        let targets = self.collect_targets().await?;
        if targets.is_empty() {
            warn!("⚠️ 当前页面没有待复盘的对局，程序结束");
            return Ok(BatchReport::default());
        }
        self.log_targets(&targets);

        // 给页面一点时间稳定下来再开标签页
        sleep(self.config.pre_batch_delay()).await;

        let coordinator = BatchCoordinator::from_config(self.host.clone(), &self.config);
        let report = coordinator.run_batch(&targets).await?;

        self.print_final_stats(&report)?;
        Ok(report)
    }

    /// 提取对局链接
    async fn collect_targets(&self) -> Result<Vec<JobTarget>> {
        info!("\n📁 正在提取对局链接: {}", self.source_url);
        let collector = LinkCollector::from_config(&self.config);
        let targets = collector
            .collect(&self.source, &self.source_url)
            .await
            .with_context(|| format!("无法从 {} 提取对局链接", self.source_url))?;
        Ok(targets)
    }

    // ========== 日志辅助方法 ==========

    fn log_targets(&self, targets: &[JobTarget]) {
        info!("✓ 找到 {} 个待复盘的对局", targets.len());
        if self.config.verbose_logging {
            for (i, target) in targets.iter().enumerate() {
                info!("  {}. {}", i + 1, truncate_text(target.as_str(), 100));
            }
        }
    }

    fn print_final_stats(&self, report: &BatchReport) -> Result<()> {
        info!("\n{}", "=".repeat(60));
        info!("📊 全部处理完成统计");
        info!(
            "完成时间: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        info!("{}", "=".repeat(60));
        info!("✅ 复盘成功: {}/{}", report.completed, report.spawned);
        info!("🗑️ 外部关闭: {}", report.removed);
        info!("⚠️ 强制关闭: {}", report.force_closed);
        if report.lost > 0 {
            info!("❌ 异常退出: {}", report.lost);
        }
        info!("{}", "=".repeat(60));

        append_log_line(
            &self.config.output_log_file,
            &format!(
                "复盘成功 {}/{}, 外部关闭 {}, 强制关闭 {}, 异常 {}",
                report.completed,
                report.spawned,
                report.removed,
                report.force_closed,
                report.lost
            ),
        )?;
        info!("\n日志已保存至: {}", self.config.output_log_file);
        Ok(())
    }
}
