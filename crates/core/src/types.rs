//! 도메인 타입: 모듈 간 공유되는 기본 데이터 구조
//!
//! 대상 정보([`TargetInfo`]), 스캔 세션([`Session`]), 백엔드 작업 상태([`BackendTask`]),
//! 감사 로그([`LogEntry`]), 정규화된 탐지 결과([`Finding`])를 정의합니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── 대상 ────────────────────────────────────────────────────────────

/// 대상 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// IPv4/IPv6 리터럴
    Ip,
    /// 호스트 이름
    Fqdn,
    /// 호스트 이름으로 볼 수 없는 문자열
    Unknown,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip => write!(f, "ip"),
            Self::Fqdn => write!(f, "fqdn"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// 백엔드별 대상 주소 형식
///
/// 설정의 `addressing` 필드로 선언되며, 디스패처는 이 값으로만
/// 백엔드에 넘길 주소를 결정합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressingPolicy {
    /// 네트워크/포트 스캐너: ip 우선, 없으면 fqdn
    Network,
    /// DNS/TLS 인증서 스캐너: fqdn
    Host,
    /// 웹 애플리케이션 스캐너: url
    Web,
    /// 사용자가 입력한 원본 문자열
    #[default]
    Original,
}

/// 해석된 스캔 대상
///
/// `url`은 항상 채워져 있으며, `ip`/`fqdn`은 해석 결과에 따라 독립적으로 비어 있을 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    /// 사용자가 입력한 원본 문자열
    pub original: String,
    /// IP 주소 (리터럴 또는 정방향 DNS 결과)
    pub ip: Option<String>,
    /// 호스트 이름 (입력값, 역방향 DNS 결과, 또는 IP 리터럴)
    pub fqdn: Option<String>,
    /// 스킴 + 호스트 (+ 포트)
    pub url: String,
    /// 대상 분류
    pub kind: TargetKind,
}

impl TargetInfo {
    /// 주소 정책에 맞는 대상 문자열을 반환합니다.
    ///
    /// 선호하는 필드가 비어 있으면 다음 후보로 넘어가며,
    /// 최종적으로는 원본 문자열을 사용합니다.
    pub fn address_for(&self, policy: AddressingPolicy) -> &str {
        match policy {
            AddressingPolicy::Network => self
                .ip
                .as_deref()
                .or(self.fqdn.as_deref())
                .unwrap_or(&self.original),
            AddressingPolicy::Host => self.fqdn.as_deref().unwrap_or(&self.original),
            AddressingPolicy::Web => &self.url,
            AddressingPolicy::Original => &self.original,
        }
    }

    /// 로그/표시용 대표 호스트 (ip > fqdn > 원본)
    pub fn display_host(&self) -> &str {
        self.address_for(AddressingPolicy::Network)
    }
}

impl fmt::Display for TargetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.original, self.kind)
    }
}

// ─── 세션 ────────────────────────────────────────────────────────────

/// 세션 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    /// 종료 상태 여부
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// 메타데이터 저장용 문자열
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 하나의 대상에 대한 한 번의 오케스트레이션 실행
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// 세션 ID (불투명 문자열)
    pub id: String,
    /// 해석된 대상
    pub target: TargetInfo,
    /// 스캔 프로파일
    pub profile: String,
    /// 현재 상태
    pub status: SessionStatus,
    /// 생성 시각
    pub created_at: DateTime<Utc>,
    /// 종료 시각
    pub completed_at: Option<DateTime<Utc>>,
    /// 세션 실패 사유 (설정 단계 실패 시)
    pub failure_reason: Option<String>,
}

impl Session {
    /// `Queued` 상태의 새 세션을 생성합니다.
    pub fn new(id: impl Into<String>, target: TargetInfo, profile: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            target,
            profile: profile.into(),
            status: SessionStatus::Queued,
            created_at: Utc::now(),
            completed_at: None,
            failure_reason: None,
        }
    }

    pub fn mark_running(&mut self) {
        if self.status == SessionStatus::Queued {
            self.status = SessionStatus::Running;
        }
    }

    /// 모든 티어가 종료된 후 호출합니다. 이미 종료된 세션은 변경하지 않습니다.
    pub fn complete(&mut self) {
        if !self.status.is_terminal() {
            self.status = SessionStatus::Completed;
            self.completed_at = Some(Utc::now());
        }
    }

    /// 세션 설정 단계 실패를 기록합니다.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if !self.status.is_terminal() {
            self.status = SessionStatus::Failed;
            self.completed_at = Some(Utc::now());
            self.failure_reason = Some(reason.into());
        }
    }
}

// ─── 백엔드 작업 ─────────────────────────────────────────────────────

/// 백엔드 작업 상태
///
/// `Queued → Triggered → Polling → {Completed, Failed, TimedOut, Crashed}` 순서로만 진행하며,
/// 종료 상태에서는 다시 열리지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Triggered,
    Polling,
    Completed,
    Failed,
    TimedOut,
    Crashed,
}

impl TaskStatus {
    /// 종료 상태 여부
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::TimedOut | Self::Crashed
        )
    }

    /// 부분 데이터라도 확보한 종료 상태 (Completed, TimedOut)
    pub fn is_success(self) -> bool {
        matches!(self, Self::Completed | Self::TimedOut)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Triggered => 1,
            Self::Polling => 2,
            Self::Completed | Self::Failed | Self::TimedOut | Self::Crashed => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Triggered => "triggered",
            Self::Polling => "polling",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Crashed => "crashed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 허용되지 않는 상태 전이
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("task '{task}' cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub task: String,
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// 세션 내 백엔드 하나의 실행 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendTask {
    /// 백엔드 이름
    pub name: String,
    /// 우선순위 티어 (낮을수록 먼저 실행)
    pub priority_tier: u32,
    /// 현재 상태
    pub status: TaskStatus,
    /// 트리거 시각
    pub started_at: Option<DateTime<Utc>>,
    /// 종료 시각
    pub finished_at: Option<DateTime<Utc>>,
    /// 실패/크래시 메시지
    pub error_message: Option<String>,
}

impl BackendTask {
    pub fn new(name: impl Into<String>, priority_tier: u32) -> Self {
        Self {
            name: name.into(),
            priority_tier,
            status: TaskStatus::Queued,
            started_at: None,
            finished_at: None,
            error_message: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// 상태를 앞으로 전이합니다.
    ///
    /// 같은 단계나 이전 단계로의 전이, 종료 상태에서의 전이는 거부됩니다.
    /// 첫 전이 시 `started_at`, 종료 상태 진입 시 `finished_at`이 기록됩니다.
    pub fn transition(&mut self, next: TaskStatus) -> Result<(), InvalidTransition> {
        if self.status.is_terminal() || next.rank() <= self.status.rank() {
            return Err(InvalidTransition {
                task: self.name.clone(),
                from: self.status,
                to: next,
            });
        }

        let now = Utc::now();
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if next.is_terminal() {
            self.finished_at = Some(now);
        }
        self.status = next;
        Ok(())
    }

    /// 메시지와 함께 종료 상태로 전이합니다.
    pub fn finish(
        &mut self,
        terminal: TaskStatus,
        message: Option<String>,
    ) -> Result<(), InvalidTransition> {
        if !terminal.is_terminal() {
            return Err(InvalidTransition {
                task: self.name.clone(),
                from: self.status,
                to: terminal,
            });
        }
        self.transition(terminal)?;
        self.error_message = message;
        Ok(())
    }

    /// 시작부터 종료까지 걸린 시간 (초)
    pub fn elapsed_secs(&self) -> Option<f64> {
        let start = self.started_at?;
        let end = self.finished_at?;
        Some((end - start).num_milliseconds() as f64 / 1000.0)
    }
}

// ─── 감사 로그 ───────────────────────────────────────────────────────

/// 세션 감사 로그 한 줄
///
/// 사람이 읽기 위한 기록이며, 상태 판단의 근거가 아닙니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl LogEntry {
    /// 현재 시각으로 로그 항목을 생성합니다.
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.message
        )
    }
}

// ─── 탐지 결과 ───────────────────────────────────────────────────────

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Info < Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    /// 정보성
    #[default]
    Info,
    Low,
    Medium,
    High,
    /// 치명적
    Critical,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다. 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "info" | "informational" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" | "med" | "moderate" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// 정규화된 탐지 결과
///
/// 항상 정확히 하나의 백엔드에 귀속되며, 생성 후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// `<백엔드 접두사>-<순번>`
    pub id: String,
    pub source_backend: String,
    pub title: String,
    pub severity: Severity,
    pub description: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} ({})",
            self.severity, self.id, self.title, self.source_backend
        )
    }
}
