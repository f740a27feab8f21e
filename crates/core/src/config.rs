//! 설정 관리: pentaflow.toml 파싱 및 런타임 설정
//!
//! [`PentaflowConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`PENTAFLOW_STORE_REDIS_URL=redis://cache:6379` 형식)
//! 3. 설정 파일 (`pentaflow.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! `[[backends]]`를 하나라도 지정하면 기본 백엔드 카탈로그 전체를 대체합니다.
//! `[profiles]`도 마찬가지입니다.
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), pentaflow_core::error::PentaflowError> {
//! use pentaflow_core::config::PentaflowConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = PentaflowConfig::load("pentaflow.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = PentaflowConfig::parse("[dispatch]\npoll_interval_secs = 5")?;
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, PentaflowError};
use crate::types::AddressingPolicy;

/// Pentaflow 통합 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PentaflowConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 세션 저장소 설정
    #[serde(default)]
    pub store: StoreConfig,
    /// 디스패치 설정
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// 터널 설정
    #[serde(default)]
    pub tunnel: TunnelConfig,
    /// 프로파일 이름 → 백엔드 이름 목록
    #[serde(default = "default_profiles")]
    pub profiles: BTreeMap<String, Vec<String>>,
    /// 백엔드 카탈로그
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendConfig>,
}

impl Default for PentaflowConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            store: StoreConfig::default(),
            dispatch: DispatchConfig::default(),
            tunnel: TunnelConfig::default(),
            profiles: default_profiles(),
            backends: default_backends(),
        }
    }
}

impl PentaflowConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PentaflowError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 파일이 없으면 기본값에 환경변수 오버라이드만 적용합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, PentaflowError> {
        let path = path.as_ref();
        match Self::load(path).await {
            Err(PentaflowError::Config(ConfigError::FileNotFound { .. })) => {
                warn!(path = %path.display(), "config file not found, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, PentaflowError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PentaflowError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                PentaflowError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, PentaflowError> {
        toml::from_str(toml_str).map_err(|e| {
            PentaflowError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 유효 설정을 TOML 문자열로 직렬화합니다.
    pub fn to_toml(&self) -> Result<String, PentaflowError> {
        toml::to_string_pretty(self).map_err(|e| {
            PentaflowError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `PENTAFLOW_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "PENTAFLOW_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "PENTAFLOW_GENERAL_LOG_FORMAT");

        // Store
        override_string(&mut self.store.backend, "PENTAFLOW_STORE_BACKEND");
        override_string(&mut self.store.redis_url, "PENTAFLOW_STORE_REDIS_URL");
        override_u64(&mut self.store.ttl_secs, "PENTAFLOW_STORE_TTL_SECS");

        // Dispatch
        override_u64(
            &mut self.dispatch.poll_interval_secs,
            "PENTAFLOW_DISPATCH_POLL_INTERVAL_SECS",
        );
        override_u64(
            &mut self.dispatch.default_timeout_secs,
            "PENTAFLOW_DISPATCH_DEFAULT_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.dispatch.slow_timeout_secs,
            "PENTAFLOW_DISPATCH_SLOW_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.dispatch.request_timeout_secs,
            "PENTAFLOW_DISPATCH_REQUEST_TIMEOUT_SECS",
        );

        // Tunnel
        override_string(&mut self.tunnel.program, "PENTAFLOW_TUNNEL_PROGRAM");
        override_csv(&mut self.tunnel.args, "PENTAFLOW_TUNNEL_ARGS");
        override_u64(
            &mut self.tunnel.up_timeout_secs,
            "PENTAFLOW_TUNNEL_UP_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.tunnel.poll_interval_ms,
            "PENTAFLOW_TUNNEL_POLL_INTERVAL_MS",
        );
        override_string(&mut self.tunnel.artifact_dir, "PENTAFLOW_TUNNEL_ARTIFACT_DIR");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), PentaflowError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        // store
        let valid_stores = ["memory", "redis"];
        if !valid_stores.contains(&self.store.backend.as_str()) {
            return Err(invalid(
                "store.backend",
                format!("must be one of: {}", valid_stores.join(", ")),
            ));
        }
        if self.store.backend == "redis" && self.store.redis_url.is_empty() {
            return Err(invalid(
                "store.redis_url",
                "must not be empty when store.backend is redis".to_owned(),
            ));
        }
        ensure_positive("store.ttl_secs", self.store.ttl_secs)?;

        // dispatch
        ensure_positive("dispatch.poll_interval_secs", self.dispatch.poll_interval_secs)?;
        ensure_positive(
            "dispatch.default_timeout_secs",
            self.dispatch.default_timeout_secs,
        )?;
        ensure_positive("dispatch.slow_timeout_secs", self.dispatch.slow_timeout_secs)?;
        ensure_positive(
            "dispatch.request_timeout_secs",
            self.dispatch.request_timeout_secs,
        )?;

        // tunnel
        if self.tunnel.program.is_empty() {
            return Err(invalid(
                "tunnel.program",
                "must not be empty".to_owned(),
            ));
        }
        ensure_positive("tunnel.up_timeout_secs", self.tunnel.up_timeout_secs)?;
        ensure_positive("tunnel.poll_interval_ms", self.tunnel.poll_interval_ms)?;

        // backends
        let mut seen = HashSet::new();
        for backend in &self.backends {
            if backend.name.is_empty() {
                return Err(invalid("backends.name", "must not be empty".to_owned()));
            }
            if !seen.insert(backend.name.as_str()) {
                return Err(invalid(
                    "backends.name",
                    format!("duplicate backend '{}'", backend.name),
                ));
            }
            if backend.timeout_secs == Some(0) {
                return Err(invalid(
                    &format!("backends.{}.timeout_secs", backend.name),
                    "must be greater than 0".to_owned(),
                ));
            }
            let missing = match backend.style {
                BackendStyle::Http => backend.endpoint.is_none().then_some("endpoint"),
                BackendStyle::Process => backend.program.is_none().then_some("program"),
                BackendStyle::Container => backend.image.is_none().then_some("image"),
            };
            if let Some(field) = missing {
                return Err(invalid(
                    &format!("backends.{}.{field}", backend.name),
                    format!("required for style '{}'", backend.style),
                ));
            }
        }

        // profiles
        for (profile, names) in &self.profiles {
            if let Some(unknown) = names.iter().find(|n| !seen.contains(n.as_str())) {
                return Err(invalid(
                    &format!("profiles.{profile}"),
                    format!("unknown backend '{unknown}'"),
                ));
            }
        }

        Ok(())
    }

    /// 이름으로 백엔드 설정을 찾습니다.
    pub fn backend(&self, name: &str) -> Option<&BackendConfig> {
        self.backends.iter().find(|b| b.name == name)
    }

    /// 프로파일에 속한 백엔드 설정 목록. 알 수 없는 프로파일이면 `None`.
    pub fn profile_backends(&self, profile: &str) -> Option<Vec<&BackendConfig>> {
        let names = self.profiles.get(profile)?;
        Some(names.iter().filter_map(|n| self.backend(n)).collect())
    }
}

fn invalid(field: &str, reason: String) -> PentaflowError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

fn ensure_positive(field: &str, value: u64) -> Result<(), PentaflowError> {
    if value == 0 {
        return Err(invalid(field, "must be greater than 0".to_owned()));
    }
    Ok(())
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 세션 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// 저장소 종류 (memory, redis)
    pub backend: String,
    /// Redis 연결 문자열
    pub redis_url: String,
    /// 세션 데이터 보존 시간 (초)
    pub ttl_secs: u64,
}

impl StoreConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_owned(),
            redis_url: "redis://localhost:6379".to_owned(),
            ttl_secs: 3600,
        }
    }
}

/// 디스패치 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// 상태 폴링 간격 (초)
    pub poll_interval_secs: u64,
    /// 일반 백엔드 제한 시간 (초)
    pub default_timeout_secs: u64,
    /// `slow` 백엔드 제한 시간 (초)
    pub slow_timeout_secs: u64,
    /// 어댑터 개별 요청 제한 시간 (초)
    pub request_timeout_secs: u64,
}

impl DispatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3,
            default_timeout_secs: 300,
            slow_timeout_secs: 600,
            request_timeout_secs: 30,
        }
    }
}

/// 터널 설정
///
/// `args`의 `{config}`는 설정 파일 경로, `{iface}`는 세션별 인터페이스 이름으로 치환됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelConfig {
    /// 터널 프로그램
    pub program: String,
    /// 프로그램 인자 템플릿
    pub args: Vec<String>,
    /// 인터페이스 대기 제한 시간 (초)
    pub up_timeout_secs: u64,
    /// 인터페이스 확인 간격 (밀리초)
    pub poll_interval_ms: u64,
    /// 설정 파일 임시 디렉토리 (비어 있으면 시스템 임시 디렉토리)
    pub artifact_dir: String,
}

impl TunnelConfig {
    pub fn up_timeout(&self) -> Duration {
        Duration::from_secs(self.up_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            program: "openvpn".to_owned(),
            args: ["--config", "{config}", "--dev", "{iface}", "--dev-type", "tun"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            up_timeout_secs: 30,
            poll_interval_ms: 1000,
            artifact_dir: String::new(),
        }
    }
}

/// 백엔드 호출 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStyle {
    /// 원격 스캔 마이크로서비스 (`/scan`, `/status`, `/results`)
    #[default]
    Http,
    /// 로컬 외부 프로세스
    Process,
    /// 컨테이너 실행
    Container,
}

impl std::fmt::Display for BackendStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Process => write!(f, "process"),
            Self::Container => write!(f, "container"),
        }
    }
}

/// 백엔드 하나의 선언
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// 백엔드 이름 (결과 키, 정규화 파서 선택에 사용)
    pub name: String,
    /// 호출 방식
    #[serde(default)]
    pub style: BackendStyle,
    /// 우선순위 티어 (낮을수록 먼저)
    #[serde(default = "default_tier")]
    pub tier: u32,
    /// 느린 백엔드 여부 (`dispatch.slow_timeout_secs` 적용)
    #[serde(default)]
    pub slow: bool,
    /// 개별 제한 시간 (초), 지정 시 slow 여부보다 우선
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// 대상 주소 형식
    #[serde(default)]
    pub addressing: AddressingPolicy,
    /// 정규화 파서 키 (기본값: name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser: Option<String>,
    /// http: 서비스 기본 URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// process: 실행 파일
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    /// process/container: 인자 템플릿 (`{target}`, `{profile}` 치환)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// container: 이미지
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

fn default_tier() -> u32 {
    1
}

impl BackendConfig {
    /// 기본 카탈로그용 HTTP 마이크로서비스 백엔드
    pub fn http_service(name: &str, tier: u32, slow: bool, addressing: AddressingPolicy) -> Self {
        Self {
            name: name.to_owned(),
            style: BackendStyle::Http,
            tier,
            slow,
            timeout_secs: None,
            addressing,
            parser: None,
            endpoint: Some(format!("http://{name}-service:8000")),
            program: None,
            args: Vec::new(),
            image: None,
        }
    }

    /// 이 백엔드에 적용할 제한 시간
    pub fn timeout(&self, dispatch: &DispatchConfig) -> Duration {
        let secs = match (self.timeout_secs, self.slow) {
            (Some(secs), _) => secs,
            (None, true) => dispatch.slow_timeout_secs,
            (None, false) => dispatch.default_timeout_secs,
        };
        Duration::from_secs(secs)
    }

    /// 정규화 파서 키
    pub fn parser_key(&self) -> &str {
        self.parser.as_deref().unwrap_or(&self.name)
    }
}

/// 기본 프로파일
pub fn default_profiles() -> BTreeMap<String, Vec<String>> {
    let profile = |names: &[&str]| names.iter().map(|n| (*n).to_owned()).collect::<Vec<_>>();
    BTreeMap::from([
        (
            "white".to_owned(),
            profile(&[
                "nmap", "testssl", "dirsearch", "nikto", "whatweb", "arjun", "dalfox", "wafw00f",
                "dnsrecon", "nuclei",
            ]),
        ),
        (
            "gray".to_owned(),
            profile(&["nmap", "wpscan", "zap", "sslyze"]),
        ),
        ("black".to_owned(), profile(&["nmap", "nikto", "nuclei"])),
    ])
}

/// 기본 백엔드 카탈로그
///
/// 모든 백엔드는 `http://<name>-service:8000`의 HTTP 마이크로서비스이며,
/// 템플릿 엔진(nuclei)만 티어 2에서 마지막으로 실행됩니다.
pub fn default_backends() -> Vec<BackendConfig> {
    use AddressingPolicy::{Host, Network, Web};

    [
        ("nmap", 1, false, Network),
        ("nuclei", 2, true, Web),
        ("testssl", 1, true, Host),
        ("dirsearch", 1, false, Web),
        ("nikto", 1, true, Web),
        ("whatweb", 1, false, Web),
        ("arjun", 1, false, Web),
        ("dalfox", 1, true, Web),
        ("wafw00f", 1, false, Web),
        ("dnsrecon", 1, false, Host),
        ("wpscan", 1, true, Web),
        ("zap", 1, true, Web),
        ("sslyze", 1, false, Host),
    ]
    .into_iter()
    .map(|(name, tier, slow, addressing)| BackendConfig::http_service(name, tier, slow, addressing))
    .collect()
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = PentaflowConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.store.backend, "memory");
        assert_eq!(config.store.ttl_secs, 3600);
        assert_eq!(config.dispatch.poll_interval_secs, 3);
        assert_eq!(config.tunnel.program, "openvpn");
        assert_eq!(config.backends.len(), 13);
        assert_eq!(config.profiles.len(), 3);
    }

    #[test]
    fn default_config_passes_validation() {
        PentaflowConfig::default().validate().unwrap();
    }

    #[test]
    fn default_catalogue_runs_nuclei_last() {
        let config = PentaflowConfig::default();
        let nuclei = config.backend("nuclei").unwrap();
        assert_eq!(nuclei.tier, 2);
        assert!(nuclei.slow);
        assert!(
            config
                .backends
                .iter()
                .filter(|b| b.name != "nuclei")
                .all(|b| b.tier == 1)
        );
    }

    #[test]
    fn default_catalogue_addressing() {
        let config = PentaflowConfig::default();
        assert_eq!(
            config.backend("nmap").unwrap().addressing,
            AddressingPolicy::Network
        );
        assert_eq!(
            config.backend("sslyze").unwrap().addressing,
            AddressingPolicy::Host
        );
        assert_eq!(
            config.backend("zap").unwrap().addressing,
            AddressingPolicy::Web
        );
        assert_eq!(
            config.backend("nikto").unwrap().endpoint.as_deref(),
            Some("http://nikto-service:8000")
        );
    }

    #[test]
    fn timeout_prefers_override_then_slow_flag() {
        let dispatch = DispatchConfig::default();
        let config = PentaflowConfig::default();
        assert_eq!(
            config.backend("nmap").unwrap().timeout(&dispatch),
            Duration::from_secs(300)
        );
        assert_eq!(
            config.backend("nikto").unwrap().timeout(&dispatch),
            Duration::from_secs(600)
        );

        let mut custom = BackendConfig::http_service("x", 1, true, AddressingPolicy::Web);
        custom.timeout_secs = Some(3);
        assert_eq!(custom.timeout(&dispatch), Duration::from_secs(3));
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = PentaflowConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.backends.len(), 13);
    }

    #[test]
    fn explicit_backends_replace_catalogue() {
        let toml = r#"
[profiles]
local = ["echo"]

[[backends]]
name = "echo"
style = "process"
program = "/bin/echo"
args = ["{target}"]
addressing = "original"
timeout_secs = 10
"#;
        let config = PentaflowConfig::parse(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.backends.len(), 1);
        assert_eq!(config.backends[0].style, BackendStyle::Process);
        assert_eq!(config.profile_backends("local").unwrap().len(), 1);
        assert!(config.profile_backends("white").is_none());
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let err = PentaflowConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            PentaflowError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = PentaflowConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_unknown_store_backend() {
        let mut config = PentaflowConfig::default();
        config.store.backend = "postgres".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("store.backend"));
    }

    #[test]
    fn validate_rejects_zero_ttl() {
        let mut config = PentaflowConfig::default();
        config.store.ttl_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ttl_secs"));
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let mut config = PentaflowConfig::default();
        config.dispatch.poll_interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poll_interval_secs"));
    }

    #[test]
    fn validate_rejects_duplicate_backend() {
        let mut config = PentaflowConfig::default();
        config
            .backends
            .push(BackendConfig::http_service("nmap", 1, false, AddressingPolicy::Network));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate backend 'nmap'"));
    }

    #[test]
    fn validate_rejects_profile_with_unknown_backend() {
        let mut config = PentaflowConfig::default();
        config
            .profiles
            .insert("custom".to_owned(), vec!["masscan".to_owned()]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("masscan"));
    }

    #[test]
    fn validate_rejects_missing_style_field() {
        let mut config = PentaflowConfig::default();
        let mut backend = BackendConfig::http_service("trivy", 1, false, AddressingPolicy::Web);
        backend.style = BackendStyle::Container;
        config.backends.push(backend);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("backends.trivy.image"));
    }

    #[test]
    fn parser_key_defaults_to_name() {
        let mut backend = BackendConfig::http_service("nuclei", 2, true, AddressingPolicy::Web);
        assert_eq!(backend.parser_key(), "nuclei");
        backend.parser = Some("nuclei-jsonl".to_owned());
        assert_eq!(backend.parser_key(), "nuclei-jsonl");
    }

    #[test]
    fn env_override_u64_invalid_keeps_original() {
        let mut val = 3;
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_PENTAFLOW_U64_BAD", "three") };
        override_u64(&mut val, "TEST_PENTAFLOW_U64_BAD");
        assert_eq!(val, 3);
        unsafe { std::env::remove_var("TEST_PENTAFLOW_U64_BAD") };
    }

    #[test]
    fn env_override_csv() {
        let mut val = vec!["a".to_owned()];
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_PENTAFLOW_CSV", "--config, {config}") };
        override_csv(&mut val, "TEST_PENTAFLOW_CSV");
        assert_eq!(val, vec!["--config", "{config}"]);
        unsafe { std::env::remove_var("TEST_PENTAFLOW_CSV") };
    }

    #[test]
    fn config_serializes_to_toml_and_back() {
        let config = PentaflowConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = PentaflowConfig::parse(&text).unwrap();
        assert_eq!(parsed.backends, config.backends);
        assert_eq!(parsed.profiles, config.profiles);
    }
}
