//! 테스트용 스크립트 어댑터

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use tokio::sync::Mutex;

use super::{BackendAdapter, PollStatus, ScanHandle, TriggerOptions};
use crate::error::AdapterError;

/// 여러 어댑터가 공유하는 호출 기록 (`"trigger nmap"`, `"release nmap"` 등)
pub(crate) type Journal = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Script {
    /// `n`번 Pending 후 Done
    CompleteAfter(usize),
    /// `n`번 Pending 후 Failed
    FailAfter(usize, &'static str),
    /// 항상 Pending
    NeverFinish,
    /// 트리거 거부
    RejectTrigger(&'static str),
    /// `n`번 일시적 에러 후 Done
    FlakyThenComplete(usize),
    /// 폴링 중 패닉
    PanicOnPoll,
}

pub(crate) struct MockAdapter {
    name: String,
    script: Script,
    output: Option<&'static [u8]>,
    journal: Journal,
    pub polls: AtomicUsize,
    pub fetches: AtomicUsize,
    pub releases: AtomicUsize,
    pub targets: Mutex<Vec<(String, TriggerOptions)>>,
}

impl MockAdapter {
    pub fn new(name: &str, script: Script, journal: &Journal) -> Self {
        Self {
            name: name.to_owned(),
            script,
            output: None,
            journal: Arc::clone(journal),
            polls: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            targets: Mutex::new(Vec::new()),
        }
    }

    pub fn with_output(mut self, output: &'static [u8]) -> Self {
        self.output = Some(output);
        self
    }

    async fn record(&self, event: &str) {
        self.journal
            .lock()
            .await
            .push(format!("{event} {}", self.name));
    }
}

impl BackendAdapter for MockAdapter {
    async fn trigger(
        &self,
        target: &str,
        options: &TriggerOptions,
    ) -> Result<ScanHandle, AdapterError> {
        self.record("trigger").await;
        self.targets
            .lock()
            .await
            .push((target.to_owned(), options.clone()));
        match self.script {
            Script::RejectTrigger(reason) => Err(AdapterError::Rejected(reason.to_owned())),
            _ => Ok(ScanHandle(format!("{}-handle", self.name))),
        }
    }

    async fn poll(&self, _handle: &ScanHandle) -> Result<PollStatus, AdapterError> {
        let n = self.polls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::CompleteAfter(pending) if n >= pending => Ok(PollStatus::Done),
            Script::FailAfter(pending, msg) if n >= pending => {
                Ok(PollStatus::Failed(msg.to_owned()))
            }
            Script::FlakyThenComplete(errors) if n < errors => {
                Err(AdapterError::Request("connection reset".to_owned()))
            }
            Script::FlakyThenComplete(_) => Ok(PollStatus::Done),
            Script::PanicOnPoll => panic!("adapter bug in {}", self.name),
            _ => Ok(PollStatus::Pending),
        }
    }

    async fn fetch(&self, _handle: &ScanHandle) -> Result<Bytes, AdapterError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.record("fetch").await;
        self.output
            .map(Bytes::from_static)
            .ok_or_else(|| AdapterError::Rejected("HTTP 404".to_owned()))
    }

    async fn release(&self, _handle: &ScanHandle) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.record("release").await;
    }
}
