//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다. 익스포터는 설치하지 않으므로
//! 레코더가 없으면 모든 호출은 no-op 입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `pentaflow_`
//! - 모듈명: `session_`, `backend_`, `tunnel_`, `normalizer_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(pentaflow_core::metrics::SESSIONS_STARTED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 백엔드 이름 레이블 키
pub const LABEL_BACKEND: &str = "backend";

/// 백엔드 결과 레이블 키 (completed, failed, timed_out, crashed)
pub const LABEL_OUTCOME: &str = "outcome";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 호출 방식 레이블 키 (http, process, container)
pub const LABEL_STYLE: &str = "style";

// ─── 세션 메트릭 ───────────────────────────────────────────────────

/// 시작된 세션 수 (counter)
pub const SESSIONS_STARTED_TOTAL: &str = "pentaflow_sessions_started_total";

/// 완료된 세션 수 (counter)
pub const SESSIONS_COMPLETED_TOTAL: &str = "pentaflow_sessions_completed_total";

/// 설정 단계에서 실패한 세션 수 (counter)
pub const SESSIONS_FAILED_TOTAL: &str = "pentaflow_sessions_failed_total";

/// 진행 중인 백엔드 작업 수 (gauge)
pub const BACKENDS_IN_FLIGHT: &str = "pentaflow_backends_in_flight";

// ─── 백엔드 메트릭 ─────────────────────────────────────────────────

/// 백엔드 종료 결과 (counter, label: backend, outcome)
pub const BACKEND_OUTCOMES_TOTAL: &str = "pentaflow_backend_outcomes_total";

/// 백엔드 실행 시간 (histogram, 초, label: backend)
pub const BACKEND_DURATION_SECONDS: &str = "pentaflow_backend_duration_seconds";

/// 무시된 일시적 폴링 에러 수 (counter, label: backend)
pub const BACKEND_POLL_ERRORS_TOTAL: &str = "pentaflow_backend_poll_errors_total";

/// 저장된 원본 결과 바이트 수 (counter, label: backend)
pub const BACKEND_RESULT_BYTES_TOTAL: &str = "pentaflow_backend_result_bytes_total";

// ─── 터널 메트릭 ───────────────────────────────────────────────────

/// 터널 설정 시도 (counter, label: result)
pub const TUNNEL_SETUPS_TOTAL: &str = "pentaflow_tunnel_setups_total";

// ─── 정규화 메트릭 ─────────────────────────────────────────────────

/// 정규화된 finding 수 (counter, label: backend)
pub const NORMALIZER_FINDINGS_TOTAL: &str = "pentaflow_normalizer_findings_total";

/// 건너뛴 잘못된 레코드 수 (counter, label: backend)
pub const NORMALIZER_SKIPPED_RECORDS_TOTAL: &str = "pentaflow_normalizer_skipped_records_total";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 백엔드 실행 시간 히스토그램 버킷 (초)
///
/// 1s ~ 15m 범위, 느린 백엔드 제한 시간(600s)을 포함
pub const BACKEND_DURATION_BUCKETS: [f64; 9] =
    [1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 900.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 레코더를 설치하는 쪽에서 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(SESSIONS_STARTED_TOTAL, "Total number of scan sessions started");
    describe_counter!(
        SESSIONS_COMPLETED_TOTAL,
        "Total number of scan sessions whose tiers all drained"
    );
    describe_counter!(
        SESSIONS_FAILED_TOTAL,
        "Total number of scan sessions aborted during setup"
    );
    describe_gauge!(
        BACKENDS_IN_FLIGHT,
        "Number of backend tasks currently triggered or polling"
    );

    describe_counter!(
        BACKEND_OUTCOMES_TOTAL,
        "Terminal backend task outcomes by backend and outcome"
    );
    describe_histogram!(
        BACKEND_DURATION_SECONDS,
        "Time from trigger to terminal state per backend in seconds"
    );
    describe_counter!(
        BACKEND_POLL_ERRORS_TOTAL,
        "Transient poll errors swallowed while waiting for a backend"
    );
    describe_counter!(
        BACKEND_RESULT_BYTES_TOTAL,
        "Raw result bytes persisted per backend"
    );

    describe_counter!(TUNNEL_SETUPS_TOTAL, "Tunnel setup attempts by result");

    describe_counter!(
        NORMALIZER_FINDINGS_TOTAL,
        "Findings produced by the normalizer per backend"
    );
    describe_counter!(
        NORMALIZER_SKIPPED_RECORDS_TOTAL,
        "Malformed records skipped by the normalizer per backend"
    );
}
