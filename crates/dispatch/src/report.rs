//! 세션 실행 결과 요약

use pentaflow_core::types::{BackendTask, Session, TaskStatus};
use serde::Serialize;

/// 종료 상태별 백엔드 수
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeTally {
    pub completed: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub crashed: usize,
}

impl OutcomeTally {
    pub fn from_tasks(tasks: &[BackendTask]) -> Self {
        tasks.iter().fold(Self::default(), |mut tally, task| {
            match task.status {
                TaskStatus::Completed => tally.completed += 1,
                TaskStatus::Failed => tally.failed += 1,
                TaskStatus::TimedOut => tally.timed_out += 1,
                TaskStatus::Crashed => tally.crashed += 1,
                TaskStatus::Queued | TaskStatus::Triggered | TaskStatus::Polling => {}
            }
            tally
        })
    }

    /// 데이터를 확보한 백엔드 수 (Completed + TimedOut)
    pub fn succeeded(&self) -> usize {
        self.completed + self.timed_out
    }

    /// Failed + Crashed
    pub fn unsuccessful(&self) -> usize {
        self.failed + self.crashed
    }

    pub fn total(&self) -> usize {
        self.succeeded() + self.unsuccessful()
    }
}

/// 한 세션의 최종 보고
///
/// 세션 상태와 백엔드별 결과는 독립적입니다. 모든 백엔드가 실패해도 세션은 `Completed`일 수 있습니다.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session: Session,
    pub tasks: Vec<BackendTask>,
    pub tally: OutcomeTally,
}

impl SessionReport {
    pub fn new(session: Session, tasks: Vec<BackendTask>) -> Self {
        let tally = OutcomeTally::from_tasks(&tasks);
        Self {
            session,
            tasks,
            tally,
        }
    }

    /// 이름으로 작업을 찾습니다.
    pub fn task(&self, name: &str) -> Option<&BackendTask> {
        self.tasks.iter().find(|t| t.name == name)
    }
}
