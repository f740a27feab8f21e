//! 감사 로그 태그: 형식 지정과 진행 상황 복원
//!
//! 디스패처는 모든 마일스톤을 `[tag] <backend> <detail>` 형식으로 기록합니다.
//! [`scan_log`]는 이 줄들에서 백엔드별 마지막 태그를 찾아 대략적인 진행 상황을 복원합니다.
//! 메타데이터의 `task:<backend>` 구조화 상태가 있으면 그것이 우선입니다.

use std::collections::BTreeMap;
use std::fmt;

use pentaflow_core::types::LogEntry;
use serde::Serialize;

/// 로그 태그
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogTag {
    Start,
    Triggered,
    Done,
    Fail,
    Timeout,
    Crash,
    Saved,
    Summary,
}

impl LogTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Triggered => "triggered",
            Self::Done => "done",
            Self::Fail => "fail",
            Self::Timeout => "timeout",
            Self::Crash => "crash",
            Self::Saved => "saved",
            Self::Summary => "summary",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "start" => Self::Start,
            "triggered" => Self::Triggered,
            "done" => Self::Done,
            "fail" => Self::Fail,
            "timeout" => Self::Timeout,
            "crash" => Self::Crash,
            "saved" => Self::Saved,
            "summary" => Self::Summary,
            _ => return None,
        })
    }

    /// 진행 상황 판단에 쓰이는 태그인지 여부
    fn progress(self) -> Option<LoggedProgress> {
        match self {
            Self::Start | Self::Triggered => Some(LoggedProgress::Running),
            Self::Done => Some(LoggedProgress::Done),
            Self::Fail => Some(LoggedProgress::Failed),
            Self::Timeout => Some(LoggedProgress::TimedOut),
            Self::Crash => Some(LoggedProgress::Crashed),
            Self::Saved | Self::Summary => None,
        }
    }
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[tag] <backend> <detail>` 형식의 로그 줄을 만듭니다.
pub fn tagged(tag: LogTag, backend: &str, detail: impl fmt::Display) -> String {
    let detail = detail.to_string();
    if detail.is_empty() {
        format!("[{tag}] {backend}")
    } else {
        format!("[{tag}] {backend} {detail}")
    }
}

/// 요약 줄: `[summary] N succeeded, M failed`
pub fn summary(succeeded: usize, failed: usize) -> String {
    format!("[{}] {succeeded} succeeded, {failed} failed", LogTag::Summary)
}

/// 로그에서 복원한 진행 상황
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoggedProgress {
    Running,
    Done,
    Failed,
    TimedOut,
    Crashed,
}

impl fmt::Display for LoggedProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Crashed => "crashed",
        };
        f.write_str(s)
    }
}

/// 로그 줄에서 `(tag, backend)`를 추출합니다.
fn parse_line(message: &str) -> Option<(LogTag, &str)> {
    let rest = message.trim_start().strip_prefix('[')?;
    let (tag, rest) = rest.split_once(']')?;
    let tag = LogTag::parse(tag)?;
    let backend = rest.split_whitespace().next()?;
    Some((tag, backend))
}

/// 백엔드별 마지막 진행 태그를 반환합니다.
///
/// 같은 백엔드에 대해 여러 태그가 있으면 마지막 줄이 이깁니다.
/// TTL로 일부 줄이 사라졌거나 순서가 뒤섞였다면 결과가 부정확할 수 있습니다.
pub fn scan_log(entries: &[LogEntry]) -> BTreeMap<String, LoggedProgress> {
    let mut progress = BTreeMap::new();
    for entry in entries {
        let Some((tag, backend)) = parse_line(&entry.message) else {
            continue;
        };
        if let Some(state) = tag.progress() {
            progress.insert(backend.to_owned(), state);
        }
    }
    progress
}
