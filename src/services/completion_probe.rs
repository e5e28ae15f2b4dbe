//! 完成探测 - 业务能力层
//!
//! 只负责"这个工作页的复盘出结果了吗"，不关心重试和生命周期

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::infrastructure::WorkerHost;
use crate::models::WorkerId;

/// 评分文本格式：ASCII 整数或小数，无符号、无千分位
fn rating_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("评分正则是常量"))
}

/// 判断评分元素的文本是否是一个合法的完成信号
///
/// 元素不存在（`None`）、去空白后为空、或不是纯数字时都返回 false。
pub fn is_completion_signal(rating_text: Option<&str>) -> bool {
    match rating_text.map(str::trim) {
        Some(text) if !text.is_empty() => rating_pattern().is_match(text),
        _ => false,
    }
}

/// 探测脚本的返回值
#[derive(Debug, Deserialize)]
struct ProbeReading {
    text: Option<String>,
}

/// 完成探测
///
/// 在工作页自己的上下文里读取评分元素的文本，再在这里给出判定。
#[derive(Debug, Clone)]
pub struct CompletionProbe {
    rating_selector: String,
}

impl CompletionProbe {
    pub fn new(rating_selector: impl Into<String>) -> Self {
        Self {
            rating_selector: rating_selector.into(),
        }
    }

    pub fn rating_selector(&self) -> &str {
        &self.rating_selector
    }

    /// 只读脚本：返回 `{ text: string | null }`
    pub fn script(&self) -> String {
        // 选择器经过 JSON 转义后再嵌入脚本
        let selector = serde_json::Value::String(self.rating_selector.clone()).to_string();
        format!(
            r#"
            (() => {{
                const el = document.querySelector({});
                return {{ text: el ? el.textContent : null }};
            }})()
            "#,
            selector
        )
    }

    /// 对一个工作页执行一次探测
    ///
    /// 脚本执行失败（页面正在跳转、上下文已销毁等）视为"还没完成"。
    pub async fn check(&self, host: &dyn WorkerHost, id: &WorkerId) -> bool {
        let value = match host.inspect(id, &self.script()).await {
            Ok(value) => value,
            Err(e) => {
                warn!("探测 {} 失败，按未完成处理: {}", id, e);
                return false;
            }
        };

        match serde_json::from_value::<ProbeReading>(value) {
            Ok(reading) => {
                let done = is_completion_signal(reading.text.as_deref());
                debug!("探测 {} 评分文本: {:?} -> {}", id, reading.text, done);
                done
            }
            Err(e) => {
                warn!("探测 {} 返回了无法识别的结果: {}", id, e);
                false
            }
        }
    }
}

impl Default for CompletionProbe {
    fn default() -> Self {
        Self::new(".review-rating-component.review-rating-white span")
    }
}
