//! 스캔 세션 실행기
//!
//! 대상 해석 → 저장소 확인 → 백엔드 선택 → (선택) 터널 → 디스패치 → 터널 정리 순서로
//! 세션 하나를 끝까지 실행하고 [`SessionReport`]를 반환합니다.
//!
//! # 세션 상태
//! - 요청 자체가 잘못됨 (빈 대상, 해석 불가): `Err(ScanError)`
//! - 시작 불가 (저장소 불가, 알 수 없는 프로파일, 백엔드 설정 오류, 터널 실패):
//!   `Ok(report)`, `status = Failed`, 트리거된 백엔드 없음
//! - 그 외: 백엔드 결과와 무관하게 `status = Completed`

use std::sync::Arc;

use pentaflow_core::config::PentaflowConfig;
use pentaflow_core::metrics as m;
use pentaflow_core::target::{DnsResolver, SystemDnsResolver, TargetResolver};
use pentaflow_core::types::Session;
use pentaflow_session_store::{SessionStore, SessionStoreError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::descriptor::AdapterFactory;
use crate::engine::DispatchEngine;
use crate::error::ScanError;
use crate::report::SessionReport;
use crate::tunnel::{IpLinkProbe, LinkProbe, TunnelManager};

/// 세션 메타에 저장된 터널 설정 키
pub const TUNNEL_META_KEY: &str = "tunnel_config";

/// 스캔 요청
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// 원본 대상 문자열
    pub target: String,
    /// 프로파일 이름
    pub profile: String,
    /// 세션 id. 없으면 새로 생성
    pub session_id: Option<String>,
    /// base64 터널 설정. 없으면 세션 메타의 `tunnel_config`를 사용
    pub tunnel_config: Option<String>,
}

impl ScanRequest {
    pub fn new(target: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            profile: profile.into(),
            session_id: None,
            tunnel_config: None,
        }
    }

    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn with_tunnel_config(mut self, encoded: impl Into<String>) -> Self {
        self.tunnel_config = Some(encoded.into());
        self
    }
}

/// 세션 실행기
pub struct ScanRunner<S, R, P> {
    config: Arc<PentaflowConfig>,
    store: Arc<S>,
    resolver: TargetResolver<R>,
    tunnels: TunnelManager<P>,
    factory: AdapterFactory,
    engine: DispatchEngine<S>,
}

impl<S: SessionStore> ScanRunner<S, SystemDnsResolver, IpLinkProbe> {
    /// 시스템 DNS 와 `ip` 명령을 사용하는 실행기
    pub fn from_config(config: PentaflowConfig, store: Arc<S>) -> Result<Self, ScanError> {
        let factory = AdapterFactory::new(&config.dispatch)?;
        let tunnels = TunnelManager::new(config.tunnel.clone(), IpLinkProbe);
        Ok(Self::new(
            config,
            store,
            TargetResolver::new(SystemDnsResolver),
            tunnels,
            factory,
        ))
    }
}

impl<S, R, P> ScanRunner<S, R, P>
where
    S: SessionStore,
    R: DnsResolver,
    P: LinkProbe,
{
    pub fn new(
        config: PentaflowConfig,
        store: Arc<S>,
        resolver: TargetResolver<R>,
        tunnels: TunnelManager<P>,
        factory: AdapterFactory,
    ) -> Self {
        let engine = DispatchEngine::from_config(Arc::clone(&store), &config.dispatch);
        Self {
            config: Arc::new(config),
            store,
            resolver,
            tunnels,
            factory,
            engine,
        }
    }

    /// 기본 엔진 대신 사용할 엔진 (폴링 간격 조정 등)
    pub fn with_engine(mut self, engine: DispatchEngine<S>) -> Self {
        self.engine = engine;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &PentaflowConfig {
        &self.config
    }

    /// 세션 하나를 끝까지 실행합니다.
    ///
    /// 터널은 디스패치가 끝나면 항상 정리됩니다. 이 future 가 도중에 버려져도
    /// 터널 가드의 `Drop`이 프로세스와 설정 파일을 정리합니다.
    pub async fn run(&self, request: ScanRequest) -> Result<SessionReport, ScanError> {
        if request.target.trim().is_empty() {
            return Err(ScanError::InvalidRequest("target must not be empty".to_owned()));
        }
        if request.profile.trim().is_empty() {
            return Err(ScanError::InvalidRequest("profile must not be empty".to_owned()));
        }

        let session_id = request
            .session_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let target = self.resolver.resolve(request.target.trim()).await?;
        let mut session = Session::new(&session_id, target, request.profile.trim());

        metrics::counter!(m::SESSIONS_STARTED_TOTAL).increment(1);
        info!(
            session = %session.id,
            host = %session.target.display_host(),
            profile = %session.profile,
            "scan session starting"
        );

        if let Err(e) = self.store.ping().await {
            return Ok(self
                .abort(session, format!("session store unavailable: {e}"), false)
                .await);
        }
        if let Err(e) = self.write_start_meta(&session).await {
            return Ok(self
                .abort(session, format!("session store unavailable: {e}"), false)
                .await);
        }

        let descriptors = match self.factory.descriptors(&self.config, &session.profile) {
            Ok(descriptors) => descriptors,
            Err(e) => return Ok(self.abort(session, e.to_string(), true).await),
        };

        let tunnel_config = match request.tunnel_config {
            Some(encoded) => Some(encoded),
            None => self.stored_tunnel_config(&session.id).await,
        };
        let tunnel = match tunnel_config {
            Some(encoded) => match self.tunnels.acquire(&session.id, &encoded).await {
                Ok(guard) => Some(guard),
                Err(e) => {
                    let reason = format!("tunnel setup failed: {e}");
                    return Ok(self.abort(session, reason, true).await);
                }
            },
            None => None,
        };

        session.mark_running();
        self.meta(&session.id, "status", session.status.as_str()).await;

        let tasks = self
            .engine
            .run(&session.id, &session.target, &session.profile, descriptors)
            .await;

        if let Some(guard) = tunnel {
            guard.release().await;
        }

        session.complete();
        self.meta(&session.id, "status", session.status.as_str()).await;
        if let Some(at) = session.completed_at {
            self.meta(&session.id, "completed_at", &at.to_rfc3339()).await;
        }

        let report = SessionReport::new(session, tasks);
        metrics::counter!(m::SESSIONS_COMPLETED_TOTAL).increment(1);
        info!(
            session = %report.session.id,
            succeeded = report.tally.succeeded(),
            failed = report.tally.unsuccessful(),
            "scan session completed"
        );
        Ok(report)
    }

    /// 시작 단계에서 세션을 실패로 종료합니다. 백엔드는 하나도 트리거되지 않습니다.
    async fn abort(&self, mut session: Session, reason: String, store_ok: bool) -> SessionReport {
        warn!(session = %session.id, reason = %reason, "scan session failed to start");
        metrics::counter!(m::SESSIONS_FAILED_TOTAL).increment(1);
        session.fail(reason.as_str());

        if store_ok {
            self.meta(&session.id, "status", session.status.as_str()).await;
            self.meta(&session.id, "failure_reason", &reason).await;
            if let Some(at) = session.completed_at {
                self.meta(&session.id, "completed_at", &at.to_rfc3339()).await;
            }
            if let Err(e) = self
                .store
                .append_log(&session.id, &format!("session failed: {reason}"))
                .await
            {
                warn!(session = %session.id, error = %e, "failed to append audit log");
            }
        }
        SessionReport::new(session, Vec::new())
    }

    async fn write_start_meta(&self, session: &Session) -> Result<(), SessionStoreError> {
        let target = &session.target;
        let started_at = session.created_at.to_rfc3339();
        let mut fields = vec![
            ("target", target.original.as_str()),
            ("profile", session.profile.as_str()),
            ("status", session.status.as_str()),
            ("started_at", started_at.as_str()),
            ("url", target.url.as_str()),
        ];
        if let Some(ip) = target.ip.as_deref() {
            fields.push(("ip", ip));
        }
        if let Some(fqdn) = target.fqdn.as_deref() {
            fields.push(("fqdn", fqdn));
        }
        for (key, value) in fields {
            self.store.set_meta(&session.id, key, value).await?;
        }
        Ok(())
    }

    async fn stored_tunnel_config(&self, session_id: &str) -> Option<String> {
        match self.store.get_all_meta(session_id).await {
            Ok(mut meta) => meta.remove(TUNNEL_META_KEY).filter(|v| !v.trim().is_empty()),
            Err(e) => {
                warn!(session = %session_id, error = %e, "failed to read session meta");
                None
            }
        }
    }

    async fn meta(&self, session_id: &str, key: &str, value: &str) {
        if let Err(e) = self.store.set_meta(session_id, key, value).await {
            warn!(session = %session_id, key, error = %e, "failed to write session meta");
        }
    }
}
