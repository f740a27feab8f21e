//! 대상 해석: 원본 문자열을 [`TargetInfo`]로 분류/정규화
//!
//! 1. `http(s)://` 스킴과 경로/쿼리를 제거하고 스킴을 기억합니다 (기본 `http://`).
//! 2. 남은 호스트를 IP 리터럴 또는 이름으로 분류합니다.
//! 3. IP면 역방향 DNS, 이름이면 정방향 DNS를 시도합니다.
//!    조회 실패는 해당 필드를 비워 둘 뿐 에러가 아닙니다.
//!
//! DNS 조회는 [`DnsResolver`] 트레이트로 추상화되어 테스트에서 교체할 수 있습니다.

use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

use tracing::debug;

use crate::error::ResolveError;
use crate::types::{TargetInfo, TargetKind};

/// 기본 DNS 조회 제한 시간
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// DNS 조회 추상화
pub trait DnsResolver: Send + Sync {
    /// 정방향 조회. 실패 시 `None`.
    fn lookup_host(&self, host: &str) -> impl Future<Output = Option<IpAddr>> + Send;

    /// 역방향 조회. 실패 시 `None`.
    fn reverse_lookup(&self, ip: IpAddr) -> impl Future<Output = Option<String>> + Send;
}

/// 운영체제 리졸버를 사용하는 기본 구현
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDnsResolver;

impl DnsResolver for SystemDnsResolver {
    async fn lookup_host(&self, host: &str) -> Option<IpAddr> {
        let addrs: Vec<IpAddr> = tokio::net::lookup_host((host, 0))
            .await
            .ok()?
            .map(|addr| addr.ip())
            .collect();
        // IPv4 우선
        addrs
            .iter()
            .copied()
            .find(IpAddr::is_ipv4)
            .or_else(|| addrs.first().copied())
    }

    async fn reverse_lookup(&self, ip: IpAddr) -> Option<String> {
        let name = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&ip))
            .await
            .ok()?
            .ok()?;
        // 일부 libc 는 이름이 없으면 숫자 주소를 그대로 돌려준다
        if name.is_empty() || name == ip.to_string() {
            None
        } else {
            Some(name)
        }
    }
}

/// 스킴과 경로를 분리한 원본 대상
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTarget {
    /// `http://` 또는 `https://`
    pub scheme: &'static str,
    /// 대괄호가 제거된 호스트
    pub host: String,
    /// 명시된 포트
    pub port: Option<u16>,
}

/// 원본 문자열에서 스킴, 호스트, 포트를 분리합니다.
///
/// DNS 조회 없이 순수하게 문자열만 다룹니다.
pub fn split_target(raw: &str) -> Result<RawTarget, ResolveError> {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    let (scheme, rest) = if lower.starts_with("https://") {
        ("https://", &trimmed["https://".len()..])
    } else if lower.starts_with("http://") {
        ("http://", &trimmed["http://".len()..])
    } else {
        ("http://", trimmed)
    };

    let authority = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .trim();
    // userinfo 제거
    let authority = authority.rsplit('@').next().unwrap_or_default();
    if authority.is_empty() {
        return Err(ResolveError::EmptyTarget);
    }

    // 해석할 수 없는 포트는 에러가 아니라 authority 전체를 호스트로 둡니다 (Unknown 으로 분류됨).
    let (host, port) = match split_host_port(authority) {
        Ok(parts) => parts,
        Err(reason) => {
            debug!(raw = %trimmed, reason = %reason, "malformed authority, keeping it verbatim");
            (authority, None)
        }
    };
    if host.is_empty() {
        return Err(ResolveError::EmptyTarget);
    }

    Ok(RawTarget {
        scheme,
        host: host.to_owned(),
        port,
    })
}

fn split_host_port(authority: &str) -> Result<(&str, Option<u16>), String> {
    // [v6]:port
    if let Some(rest) = authority.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| "unterminated '[' in IPv6 literal".to_owned())?;
        let port = match tail.strip_prefix(':') {
            Some(p) => Some(parse_port(p)?),
            None if tail.is_empty() => None,
            None => return Err(format!("unexpected '{tail}' after IPv6 literal")),
        };
        return Ok((host, port));
    }

    // 콜론이 둘 이상이면 대괄호 없는 IPv6 리터럴
    if authority.matches(':').count() > 1 {
        return Ok((authority, None));
    }

    match authority.split_once(':') {
        Some((host, port)) => Ok((host, Some(parse_port(port)?))),
        None => Ok((authority, None)),
    }
}

fn parse_port(raw: &str) -> Result<u16, String> {
    raw.parse::<u16>()
        .map_err(|_| format!("invalid port '{raw}'"))
}

fn is_hostname(host: &str) -> bool {
    host.len() <= 253
        && host.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
                && !label.starts_with('-')
                && !label.ends_with('-')
        })
}

/// 대상 해석기
///
/// # 사용 예시
/// ```no_run
/// # async fn example() -> Result<(), pentaflow_core::error::ResolveError> {
/// use pentaflow_core::target::{SystemDnsResolver, TargetResolver};
///
/// let resolver = TargetResolver::new(SystemDnsResolver);
/// let info = resolver.resolve("https://example.com/login").await?;
/// assert_eq!(info.url, "https://example.com");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TargetResolver<R> {
    dns: R,
    lookup_timeout: Duration,
}

impl<R: DnsResolver> TargetResolver<R> {
    pub fn new(dns: R) -> Self {
        Self {
            dns,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// DNS 조회 제한 시간을 변경합니다.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// 원본 문자열을 해석합니다.
    ///
    /// 빈 대상만 에러입니다. 분류할 수 없는 대상은 `Unknown`, DNS 실패는 필드를 비워 둡니다.
    pub async fn resolve(&self, raw: &str) -> Result<TargetInfo, ResolveError> {
        let parsed = split_target(raw)?;
        let original = raw.trim().to_owned();

        let (kind, ip, fqdn) = if let Ok(addr) = parsed.host.parse::<IpAddr>() {
            let reverse = tokio::time::timeout(self.lookup_timeout, self.dns.reverse_lookup(addr))
                .await
                .ok()
                .flatten();
            debug!(raw = %original, reverse = ?reverse, "resolved ip literal");
            (
                TargetKind::Ip,
                Some(parsed.host.clone()),
                // 역방향 조회 실패 시 리터럴을 그대로 사용
                Some(reverse.unwrap_or_else(|| parsed.host.clone())),
            )
        } else if is_hostname(&parsed.host) {
            let forward = tokio::time::timeout(self.lookup_timeout, self.dns.lookup_host(&parsed.host))
                .await
                .ok()
                .flatten();
            debug!(raw = %original, forward = ?forward, "resolved host name");
            (
                TargetKind::Fqdn,
                forward.map(|addr| addr.to_string()),
                Some(parsed.host.clone()),
            )
        } else {
            debug!(raw = %original, "target is neither ip nor host name");
            (TargetKind::Unknown, None, None)
        };

        let host_for_url = fqdn.as_deref().unwrap_or(&parsed.host);
        let url = build_url(parsed.scheme, host_for_url, parsed.port);

        Ok(TargetInfo {
            original,
            ip,
            fqdn,
            url,
            kind,
        })
    }
}

fn build_url(scheme: &str, host: &str, port: Option<u16>) -> String {
    let host = if host.parse::<std::net::Ipv6Addr>().is_ok() {
        format!("[{host}]")
    } else {
        host.to_owned()
    };
    match port {
        Some(port) => format!("{scheme}{host}:{port}"),
        None => format!("{scheme}{host}"),
    }
}
