//! 스캔 마이크로서비스 어댑터
//!
//! ```text
//! POST {endpoint}/scan          {"target": "...", "options": {"category": "..."}} → {"scan_id": "..."}
//! GET  {endpoint}/status/{id}   → {"status": "running" | "completed" | "failed", "message": "..."}
//! GET  {endpoint}/results/{id}  → 원본 결과 (보통 결과 봉투 JSON)
//! ```

use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BackendAdapter, PollStatus, ScanHandle, TriggerOptions};
use crate::error::AdapterError;

#[derive(Serialize)]
struct ScanRequest<'a> {
    target: &'a str,
    options: &'a TriggerOptions,
}

#[derive(Deserialize)]
struct ScanAccepted {
    scan_id: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct StatusReport {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP 스캔 서비스 어댑터
#[derive(Debug, Clone)]
pub struct HttpAdapter {
    client: Client,
    endpoint: String,
}

impl HttpAdapter {
    /// 요청별 제한 시간을 가진 클라이언트로 어댑터를 만듭니다.
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AdapterError::Request(format!("failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(client, endpoint))
    }

    /// 이미 만든 클라이언트를 공유합니다.
    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_owned();
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.endpoint)
    }
}

fn transport(e: reqwest::Error) -> AdapterError {
    AdapterError::Request(e.to_string())
}

fn rejected(status: StatusCode) -> AdapterError {
    AdapterError::Rejected(format!("HTTP {}", status.as_u16()))
}

impl BackendAdapter for HttpAdapter {
    async fn trigger(
        &self,
        target: &str,
        options: &TriggerOptions,
    ) -> Result<ScanHandle, AdapterError> {
        let response = self
            .client
            .post(self.url("scan"))
            .json(&ScanRequest { target, options })
            .send()
            .await
            .map_err(transport)?;
        if response.status() != StatusCode::OK {
            return Err(rejected(response.status()));
        }

        let accepted: ScanAccepted = response
            .json()
            .await
            .map_err(|e| AdapterError::Malformed(e.to_string()))?;
        // 서비스에 따라 scan_id 가 숫자일 수 있음
        match accepted.scan_id {
            Some(serde_json::Value::String(id)) if !id.is_empty() => Ok(ScanHandle(id)),
            Some(serde_json::Value::Number(n)) => Ok(ScanHandle(n.to_string())),
            _ => Err(AdapterError::Malformed("response has no scan_id".to_owned())),
        }
    }

    async fn poll(&self, handle: &ScanHandle) -> Result<PollStatus, AdapterError> {
        let response = self
            .client
            .get(self.url(&format!("status/{handle}")))
            .send()
            .await
            .map_err(transport)?;
        if response.status() != StatusCode::OK {
            debug!(endpoint = %self.endpoint, status = response.status().as_u16(), "status not ready");
            return Ok(PollStatus::Pending);
        }

        let report: StatusReport = response
            .json()
            .await
            .map_err(|e| AdapterError::Malformed(e.to_string()))?;
        Ok(match report.status.as_str() {
            "completed" => PollStatus::Done,
            "failed" => PollStatus::Failed(
                report
                    .message
                    .unwrap_or_else(|| "unknown error".to_owned()),
            ),
            _ => PollStatus::Pending,
        })
    }

    async fn fetch(&self, handle: &ScanHandle) -> Result<Bytes, AdapterError> {
        let response = self
            .client
            .get(self.url(&format!("results/{handle}")))
            .send()
            .await
            .map_err(transport)?;
        if response.status() != StatusCode::OK {
            return Err(rejected(response.status()));
        }
        response.bytes().await.map_err(transport)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::{Path, State};
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;

    #[derive(Clone, Default)]
    struct Service {
        polls: Arc<AtomicUsize>,
        last_request: Arc<tokio::sync::Mutex<Option<Value>>>,
    }

    async fn scan(State(svc): State<Service>, Json(body): Json<Value>) -> Json<Value> {
        *svc.last_request.lock().await = Some(body);
        Json(json!({"scan_id": "abc123", "status": "started"}))
    }

    async fn status(State(svc): State<Service>, Path(id): Path<String>) -> (AxumStatus, Json<Value>) {
        let n = svc.polls.fetch_add(1, Ordering::SeqCst);
        match (id.as_str(), n) {
            ("abc123", 0) => (AxumStatus::SERVICE_UNAVAILABLE, Json(json!({}))),
            ("abc123", 1) => (AxumStatus::OK, Json(json!({"status": "running"}))),
            ("abc123", _) => (AxumStatus::OK, Json(json!({"status": "completed"}))),
            _ => (
                AxumStatus::OK,
                Json(json!({"status": "failed", "message": "target unreachable"})),
            ),
        }
    }

    async fn results(Path(id): Path<String>) -> (AxumStatus, String) {
        if id == "abc123" {
            (AxumStatus::OK, r#"{"findings":[],"raw_output":"ok"}"#.to_owned())
        } else {
            (AxumStatus::NOT_FOUND, String::new())
        }
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn service() -> (Service, HttpAdapter) {
        let svc = Service::default();
        let router = Router::new()
            .route("/scan", post(scan))
            .route("/status/{id}", get(status))
            .route("/results/{id}", get(results))
            .with_state(svc.clone());
        let endpoint = serve(router).await;
        let adapter = HttpAdapter::new(format!("{endpoint}/"), Duration::from_secs(5)).unwrap();
        (svc, adapter)
    }

    #[tokio::test]
    async fn full_lifecycle_against_service() {
        let (svc, adapter) = service().await;

        let handle = BackendAdapter::trigger(&adapter, "10.0.0.5", &TriggerOptions::new("white"))
            .await
            .unwrap();
        assert_eq!(handle.as_str(), "abc123");
        assert_eq!(
            svc.last_request.lock().await.clone(),
            Some(json!({"target": "10.0.0.5", "options": {"category": "white"}}))
        );

        // 비 200 응답은 아직 준비되지 않은 것으로 취급
        assert_eq!(BackendAdapter::poll(&adapter, &handle).await.unwrap(), PollStatus::Pending);
        assert_eq!(BackendAdapter::poll(&adapter, &handle).await.unwrap(), PollStatus::Pending);
        assert_eq!(BackendAdapter::poll(&adapter, &handle).await.unwrap(), PollStatus::Done);

        let body = BackendAdapter::fetch(&adapter, &handle).await.unwrap();
        assert_eq!(&body[..], br#"{"findings":[],"raw_output":"ok"}"#);
    }

    #[tokio::test]
    async fn failed_status_carries_message() {
        let (_svc, adapter) = service().await;
        let status = BackendAdapter::poll(&adapter, &ScanHandle("other".to_owned()))
            .await
            .unwrap();
        assert_eq!(status, PollStatus::Failed("target unreachable".to_owned()));
    }

    #[tokio::test]
    async fn fetch_non_200_is_rejected() {
        let (_svc, adapter) = service().await;
        let err = BackendAdapter::fetch(&adapter, &ScanHandle("missing".to_owned()))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Rejected(ref m) if m == "HTTP 404"));
    }

    #[tokio::test]
    async fn trigger_non_200_is_rejected() {
        let router = Router::new().route(
            "/scan",
            post(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let adapter = HttpAdapter::new(serve(router).await, Duration::from_secs(5)).unwrap();
        let err = BackendAdapter::trigger(&adapter, "x", &TriggerOptions::new("white"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "rejected: HTTP 500");
    }

    #[tokio::test]
    async fn trigger_without_scan_id_is_malformed() {
        let router = Router::new().route("/scan", post(|| async { Json(json!({"ok": true})) }));
        let adapter = HttpAdapter::new(serve(router).await, Duration::from_secs(5)).unwrap();
        let err = BackendAdapter::trigger(&adapter, "x", &TriggerOptions::new("white"))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Malformed(_)));
    }

    #[tokio::test]
    async fn unreachable_service_is_transport_error() {
        let adapter = HttpAdapter::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = BackendAdapter::poll(&adapter, &ScanHandle("x".to_owned()))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Request(_)));
    }
}
