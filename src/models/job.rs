//! 作业与工作页的标识类型

use std::collections::HashSet;
use std::fmt;

/// 一个待复盘对局的链接
///
/// 由链接抓取器产出，进入核心前已去重，创建后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobTarget(String);

impl JobTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobTarget {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for JobTarget {
    fn from(url: String) -> Self {
        Self(url)
    }
}

/// 工作页（浏览器标签页）的标识
///
/// 生产环境中是 CDP 的 target id，对编排层而言是不透明的。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 去掉重复链接，保留首次出现的顺序
pub fn dedupe_targets<I, S>(links: I) -> Vec<JobTarget>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    links
        .into_iter()
        .map(Into::<String>::into)
        .filter(|link| !link.trim().is_empty())
        .filter(|link| seen.insert(link.clone()))
        .map(JobTarget::from)
        .collect()
}
