//! 디스패치 엔진: 티어별 팬아웃, 폴링, 결과 회수
//!
//! 각 백엔드는 독립된 tokio 태스크(코디네이터)에서 `trigger → poll* → fetch`를 진행합니다.
//! 티어는 엄격한 장벽입니다. 현재 티어의 모든 작업이 종료 상태가 되기 전에는
//! 다음 티어의 어떤 백엔드도 트리거하지 않습니다.
//!
//! # 작업 결과
//! - 트리거 실패 → `Failed`
//! - 폴링 중 에러 → 무시하고 다음 주기에 재시도
//! - 백엔드가 실패 보고 → `Failed`, 결과 회수 없음
//! - 제한 시간 초과 → 결과를 한 번만 회수 시도한 뒤 `TimedOut`
//! - 코디네이터 패닉 → `Crashed`
//!
//! 백엔드 하나의 에러와 패닉은 그 작업의 상태로 흡수되며 다른 백엔드나 세션으로 전파되지 않습니다.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;
use pentaflow_core::config::DispatchConfig;
use pentaflow_core::metrics as m;
use pentaflow_core::types::{BackendTask, TargetInfo, TaskStatus};
use pentaflow_session_store::progress::{self, LogTag};
use pentaflow_session_store::{SessionStore, SessionStoreError, TASK_META_PREFIX};
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::adapter::{DynBackendAdapter, PollStatus, ScanHandle, TriggerOptions};
use crate::descriptor::BackendDescriptor;
use crate::report::OutcomeTally;

/// 티어 단위 디스패치 엔진
///
/// 세션 하나의 실행 상태는 [`run`](Self::run)의 반환값으로만 전달되며,
/// 엔진 자체는 세션 간에 상태를 공유하지 않습니다.
pub struct DispatchEngine<S> {
    store: Arc<S>,
    poll_interval: Duration,
    request_timeout: Duration,
}

impl<S> Clone for DispatchEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            poll_interval: self.poll_interval,
            request_timeout: self.request_timeout,
        }
    }
}

impl<S: SessionStore> DispatchEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::from_config(store, &DispatchConfig::default())
    }

    pub fn from_config(store: Arc<S>, config: &DispatchConfig) -> Self {
        Self {
            store,
            poll_interval: config.poll_interval(),
            request_timeout: config.request_timeout(),
        }
    }

    /// 폴링 간격을 변경합니다.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// 트리거/회수/정리 호출 하나에 허용하는 시간
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// 모든 백엔드를 티어 순서대로 실행하고 종료 상태의 작업 목록을 반환합니다.
    ///
    /// 반환 순서는 티어 오름차순, 같은 티어 안에서는 입력 순서입니다.
    /// 백엔드 결과와 무관하게 항상 모든 작업이 종료 상태로 반환됩니다.
    pub async fn run(
        &self,
        session_id: &str,
        target: &TargetInfo,
        profile: &str,
        backends: Vec<BackendDescriptor>,
    ) -> Vec<BackendTask> {
        let mut tiers: BTreeMap<u32, Vec<BackendDescriptor>> = BTreeMap::new();
        for descriptor in backends {
            tiers.entry(descriptor.tier).or_default().push(descriptor);
        }

        let options = TriggerOptions::new(profile);
        let mut tasks = Vec::new();

        for (tier, group) in tiers {
            info!(session = %session_id, tier, backends = group.len(), "dispatching tier");

            let mut launched = Vec::with_capacity(group.len());
            let mut handles = Vec::with_capacity(group.len());
            for descriptor in group {
                let slot = HandleSlot::default();
                launched.push(Launched {
                    name: descriptor.name.clone(),
                    adapter: Arc::clone(&descriptor.adapter),
                    slot: Arc::clone(&slot),
                });
                let coordinator = Coordinator {
                    store: Arc::clone(&self.store),
                    session_id: session_id.to_owned(),
                    address: target.address_for(descriptor.addressing).to_owned(),
                    options: options.clone(),
                    poll_interval: self.poll_interval,
                    request_timeout: self.request_timeout,
                    slot,
                    descriptor,
                };
                handles.push(tokio::spawn(coordinator.run()));
            }

            // 장벽: 이 티어의 모든 코디네이터가 끝나야 다음 티어로 넘어감
            for (launched, joined) in launched.into_iter().zip(join_all(handles).await) {
                let task = match joined {
                    Ok(task) => task,
                    Err(err) => self.crashed(session_id, launched, tier, err).await,
                };
                tasks.push(task);
            }
        }

        let tally = OutcomeTally::from_tasks(&tasks);
        append(
            &*self.store,
            session_id,
            progress::summary(tally.succeeded(), tally.unsuccessful()),
        )
        .await;
        info!(
            session = %session_id,
            succeeded = tally.succeeded(),
            failed = tally.unsuccessful(),
            "dispatch finished"
        );
        tasks
    }

    /// 패닉으로 끝난 코디네이터의 작업을 `Crashed`로 기록합니다.
    ///
    /// 트리거가 끝난 뒤 패닉했다면 남은 핸들을 여기서 정리합니다.
    async fn crashed(
        &self,
        session_id: &str,
        launched: Launched,
        tier: u32,
        err: JoinError,
    ) -> BackendTask {
        let Launched { name, adapter, slot } = launched;
        let message = panic_message(err);
        warn!(session = %session_id, backend = %name, error = %message, "backend coordinator crashed");

        let orphan = slot.lock().await.take();
        if let Some(handle) = orphan {
            if tokio::time::timeout(self.request_timeout, adapter.release(&handle))
                .await
                .is_err()
            {
                debug!(backend = %name, handle = %handle, "release did not finish in time");
            }
        }

        let mut task = BackendTask::new(name, tier);
        if let Err(e) = task.finish(TaskStatus::Crashed, Some(message.clone())) {
            warn!(error = %e, "crash transition rejected");
        }
        save_task(&*self.store, session_id, &task).await;
        append(
            &*self.store,
            session_id,
            progress::tagged(LogTag::Crash, &task.name, format!("crashed: {message}")),
        )
        .await;
        record_outcome(&task.name, TaskStatus::Crashed, None);
        task
    }
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with non-string payload".to_owned()),
        Err(err) => err.to_string(),
    }
}

// ─── 코디네이터 ──────────────────────────────────────────────────────

/// 코디네이터가 트리거 후 받은 핸들. 패닉 시 엔진이 대신 정리합니다.
type HandleSlot = Arc<Mutex<Option<ScanHandle>>>;

/// 실행 중인 코디네이터에 대해 엔진이 들고 있는 정보
struct Launched {
    name: String,
    adapter: Arc<dyn DynBackendAdapter>,
    slot: HandleSlot,
}

/// 폴링 루프의 결말
enum Outcome {
    Done,
    Failed(String),
    TimedOut,
}

/// 백엔드 하나를 끝까지 진행시키는 태스크
struct Coordinator<S> {
    store: Arc<S>,
    session_id: String,
    address: String,
    options: TriggerOptions,
    poll_interval: Duration,
    request_timeout: Duration,
    slot: HandleSlot,
    descriptor: BackendDescriptor,
}

impl<S: SessionStore> Coordinator<S> {
    async fn run(self) -> BackendTask {
        let _in_flight = InFlight::enter(self.descriptor.style.to_string());
        let started = Instant::now();
        let name = self.descriptor.name.clone();
        let mut task = BackendTask::new(&name, self.descriptor.tier);

        self.log(LogTag::Start, format!("on {}", self.address)).await;
        debug!(session = %self.session_id, backend = %name, address = %self.address, "triggering backend");

        let triggered = tokio::time::timeout(
            self.request_timeout,
            self.descriptor.adapter.trigger(&self.address, &self.options),
        )
        .await;
        let handle = match triggered {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                let message = format!("trigger failed: {e}");
                self.fail(&mut task, message, started).await;
                return task;
            }
            Err(_) => {
                let message = format!(
                    "trigger failed: no response within {}s",
                    self.request_timeout.as_secs()
                );
                self.fail(&mut task, message, started).await;
                return task;
            }
        };

        *self.slot.lock().await = Some(handle.clone());
        self.advance(&mut task, TaskStatus::Triggered);
        self.log(LogTag::Triggered, format!("handle={handle}")).await;
        self.advance(&mut task, TaskStatus::Polling);
        save_task(&*self.store, &self.session_id, &task).await;

        match self.wait(&handle, started).await {
            Outcome::Done => self.collect(&mut task, &handle, started).await,
            Outcome::Failed(message) => self.fail(&mut task, message, started).await,
            Outcome::TimedOut => self.salvage(&mut task, &handle, started).await,
        }

        if tokio::time::timeout(self.request_timeout, self.descriptor.adapter.release(&handle))
            .await
            .is_err()
        {
            debug!(backend = %name, handle = %handle, "release did not finish in time");
        }
        self.slot.lock().await.take();
        task
    }

    /// 종료 보고나 제한 시간까지 폴링합니다.
    async fn wait(&self, handle: &ScanHandle, started: Instant) -> Outcome {
        let deadline = started + self.descriptor.timeout;
        loop {
            tokio::time::sleep_until((Instant::now() + self.poll_interval).min(deadline)).await;
            if Instant::now() >= deadline {
                return Outcome::TimedOut;
            }

            match tokio::time::timeout_at(deadline, self.descriptor.adapter.poll(handle)).await {
                Err(_) => return Outcome::TimedOut,
                Ok(Ok(PollStatus::Pending)) => {}
                Ok(Ok(PollStatus::Done)) => return Outcome::Done,
                Ok(Ok(PollStatus::Failed(message))) => return Outcome::Failed(message),
                Ok(Err(e)) => {
                    debug!(
                        session = %self.session_id,
                        backend = %self.descriptor.name,
                        error = %e,
                        "poll error, retrying"
                    );
                    metrics::counter!(
                        m::BACKEND_POLL_ERRORS_TOTAL,
                        m::LABEL_BACKEND => self.descriptor.name.clone()
                    )
                    .increment(1);
                }
            }
        }
    }

    /// 완료된 백엔드의 결과를 회수하고 저장합니다.
    async fn collect(&self, task: &mut BackendTask, handle: &ScanHandle, started: Instant) {
        let fetched =
            tokio::time::timeout(self.request_timeout, self.descriptor.adapter.fetch(handle)).await;
        let data = match fetched {
            Ok(Ok(data)) => data,
            Ok(Err(e)) => {
                self.fail(task, format!("fetch failed: {e}"), started).await;
                return;
            }
            Err(_) => {
                let message = format!(
                    "fetch failed: no response within {}s",
                    self.request_timeout.as_secs()
                );
                self.fail(task, message, started).await;
                return;
            }
        };

        if let Err(e) = self.save_result(data).await {
            self.fail(task, format!("result store failed: {e}"), started).await;
            return;
        }

        self.finish(task, TaskStatus::Completed, None, started).await;
        self.log(
            LogTag::Done,
            format!("completed in {:.1}s", started.elapsed().as_secs_f64()),
        )
        .await;
    }

    /// 제한 시간이 지난 백엔드에서 부분 결과를 한 번 회수합니다.
    async fn salvage(&self, task: &mut BackendTask, handle: &ScanHandle, started: Instant) {
        let fetched =
            tokio::time::timeout(self.request_timeout, self.descriptor.adapter.fetch(handle)).await;
        match fetched {
            Ok(Ok(data)) if !data.is_empty() => {
                if let Err(e) = self.save_result(data).await {
                    warn!(
                        session = %self.session_id,
                        backend = %self.descriptor.name,
                        error = %e,
                        "failed to store partial result"
                    );
                }
            }
            Ok(Ok(_)) => debug!(backend = %self.descriptor.name, "no partial result"),
            Ok(Err(e)) => {
                debug!(backend = %self.descriptor.name, error = %e, "partial fetch failed")
            }
            Err(_) => debug!(backend = %self.descriptor.name, "partial fetch timed out"),
        }

        let secs = started.elapsed().as_secs_f64();
        self.finish(
            task,
            TaskStatus::TimedOut,
            Some(format!("timed out after {secs:.1}s")),
            started,
        )
        .await;
        self.log(LogTag::Timeout, format!("timed out after {secs:.1}s")).await;
    }

    async fn save_result(&self, data: Bytes) -> Result<(), SessionStoreError> {
        let size = data.len();
        self.store
            .put_result(&self.session_id, &self.descriptor.name, data)
            .await?;
        metrics::counter!(
            m::BACKEND_RESULT_BYTES_TOTAL,
            m::LABEL_BACKEND => self.descriptor.name.clone()
        )
        .increment(size as u64);
        self.log(LogTag::Saved, format!("results saved ({size} bytes)")).await;
        Ok(())
    }

    async fn fail(&self, task: &mut BackendTask, message: String, started: Instant) {
        let secs = started.elapsed().as_secs_f64();
        self.log(LogTag::Fail, format!("failed after {secs:.1}s: {message}")).await;
        self.finish(task, TaskStatus::Failed, Some(message), started).await;
    }

    async fn finish(
        &self,
        task: &mut BackendTask,
        status: TaskStatus,
        message: Option<String>,
        started: Instant,
    ) {
        if let Err(e) = task.finish(status, message) {
            warn!(error = %e, "terminal transition rejected");
        }
        save_task(&*self.store, &self.session_id, task).await;
        record_outcome(&task.name, status, Some(started.elapsed()));
        info!(
            session = %self.session_id,
            backend = %task.name,
            status = %status,
            "backend finished"
        );
    }

    fn advance(&self, task: &mut BackendTask, status: TaskStatus) {
        if let Err(e) = task.transition(status) {
            warn!(error = %e, "task transition rejected");
        }
    }

    async fn log(&self, tag: LogTag, detail: String) {
        append(
            &*self.store,
            &self.session_id,
            progress::tagged(tag, &self.descriptor.name, detail),
        )
        .await;
    }
}

// ─── 공통 기록 ───────────────────────────────────────────────────────

/// 감사 로그 기록. 저장소 에러는 작업 결과에 영향을 주지 않습니다.
async fn append<S: SessionStore>(store: &S, session_id: &str, line: String) {
    if let Err(e) = store.append_log(session_id, &line).await {
        warn!(session = %session_id, error = %e, "failed to append audit log");
    }
}

/// `task:<backend>` 메타에 구조화된 작업 상태를 기록합니다.
async fn save_task<S: SessionStore>(store: &S, session_id: &str, task: &BackendTask) {
    let json = match serde_json::to_string(task) {
        Ok(json) => json,
        Err(e) => {
            warn!(backend = %task.name, error = %e, "failed to serialize task state");
            return;
        }
    };
    let key = format!("{TASK_META_PREFIX}{}", task.name);
    if let Err(e) = store.set_meta(session_id, &key, &json).await {
        warn!(session = %session_id, backend = %task.name, error = %e, "failed to store task state");
    }
}

fn record_outcome(backend: &str, status: TaskStatus, elapsed: Option<Duration>) {
    metrics::counter!(
        m::BACKEND_OUTCOMES_TOTAL,
        m::LABEL_BACKEND => backend.to_owned(),
        m::LABEL_OUTCOME => status.as_str()
    )
    .increment(1);
    if let Some(elapsed) = elapsed {
        metrics::histogram!(m::BACKEND_DURATION_SECONDS, m::LABEL_BACKEND => backend.to_owned())
            .record(elapsed.as_secs_f64());
    }
}

/// 실행 중 백엔드 수 게이지. 패닉으로 풀려도 감소합니다.
struct InFlight {
    style: String,
}

impl InFlight {
    fn enter(style: String) -> Self {
        metrics::gauge!(m::BACKENDS_IN_FLIGHT, m::LABEL_STYLE => style.clone()).increment(1.0);
        Self { style }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        metrics::gauge!(m::BACKENDS_IN_FLIGHT, m::LABEL_STYLE => self.style.clone()).decrement(1.0);
    }
}
