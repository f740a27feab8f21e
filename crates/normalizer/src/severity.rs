//! 심각도 매핑 표
//!
//! 각 파서는 자기 도구의 심각도 어휘를 명시적인 표로 5단계 [`Severity`]에 매핑합니다.
//! 표에 없는 값은 `Info`가 됩니다.

use pentaflow_core::types::Severity;

/// 도구별 심각도 어휘 → [`Severity`] 매핑 표
#[derive(Debug, Clone, Copy)]
pub struct SeverityTable(&'static [(&'static str, Severity)]);

impl SeverityTable {
    pub const fn new(entries: &'static [(&'static str, Severity)]) -> Self {
        Self(entries)
    }

    /// 대소문자와 앞뒤 공백을 무시하고 찾습니다. 없으면 `Info`.
    pub fn lookup(&self, raw: &str) -> Severity {
        self.get(raw).unwrap_or(Severity::Info)
    }

    /// 표에 있는 값만 반환합니다.
    pub fn get(&self, raw: &str) -> Option<Severity> {
        let raw = raw.trim();
        self.0
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(raw))
            .map(|(_, severity)| *severity)
    }
}

/// 공통 5단계 어휘 (nuclei, 봉투의 일반 finding)
pub const STANDARD: SeverityTable = SeverityTable::new(&[
    ("info", Severity::Info),
    ("informational", Severity::Info),
    ("low", Severity::Low),
    ("medium", Severity::Medium),
    ("moderate", Severity::Medium),
    ("high", Severity::High),
    ("critical", Severity::Critical),
]);

/// OWASP ZAP `riskdesc` 첫 단어
pub const ZAP: SeverityTable = SeverityTable::new(&[
    ("informational", Severity::Info),
    ("low", Severity::Low),
    ("medium", Severity::Medium),
    ("high", Severity::High),
]);

/// testssl.sh: 이 표에 있는 값만 finding 으로 보고합니다.
pub const TESTSSL: SeverityTable = SeverityTable::new(&[
    ("fatal", Severity::Critical),
    ("critical", Severity::Critical),
    ("high", Severity::High),
    ("medium", Severity::Medium),
    ("low", Severity::Low),
]);
