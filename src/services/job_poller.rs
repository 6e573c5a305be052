// Bounded polling of a submitted provider job

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::services::provider::{ImageProvider, TaskState, TaskStatus};

/// Result of watching a job for at most one budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed(String),
    Failed(String),
    /// Budget elapsed while the job was still running. Not an error.
    StillProcessing,
}

impl PollOutcome {
    /// Interpret a single status snapshot; `None` while the job is still running
    pub fn from_status(status: TaskStatus) -> Option<Self> {
        match status.state {
            TaskState::Success => Some(match status.result_urls.into_iter().next() {
                Some(url) => PollOutcome::Completed(url),
                None => PollOutcome::Failed("Provider reported success without a result".to_string()),
            }),
            TaskState::Fail => Some(PollOutcome::Failed(
                status
                    .error_message
                    .unwrap_or_else(|| "Generation failed".to_string()),
            )),
            TaskState::Waiting | TaskState::Queuing | TaskState::Generating | TaskState::Unknown => {
                None
            },
        }
    }
}

#[derive(Clone)]
pub struct JobPoller {
    provider: Arc<dyn ImageProvider>,
    interval: Duration,
}

impl JobPoller {
    pub fn new(provider: Arc<dyn ImageProvider>, interval: Duration) -> Self {
        Self { provider, interval }
    }

    /// Number of status queries that fit in `budget`, at least one
    pub fn attempts_for(&self, budget: Duration) -> u32 {
        let interval_ms = self.interval.as_millis().max(1);
        ((budget.as_millis() / interval_ms) as u32).max(1)
    }

    /// Query the job once without waiting
    pub async fn check_once(&self, task_id: &str) -> Option<PollOutcome> {
        match self.provider.status(task_id).await {
            Ok(status) => PollOutcome::from_status(status),
            Err(e) => {
                warn!("Status query for {} failed, treating as pending: {}", task_id, e);
                None
            },
        }
    }

    /// Wait on `task_id` until it finishes or `budget` runs out.
    ///
    /// Queries run on a fixed grid of `interval` ticks and a slow status call
    /// is cut off at the deadline, so the wait never outlasts the budget
    /// (or one interval, when the budget is shorter).
    #[instrument(skip(self))]
    pub async fn wait(&self, task_id: &str, budget: Duration) -> PollOutcome {
        let attempts = self.attempts_for(budget);
        let started = Instant::now();
        let deadline = started + budget.max(self.interval);

        for attempt in 1..=attempts {
            tokio::time::sleep_until(started + self.interval * attempt).await;

            match tokio::time::timeout_at(deadline, self.check_once(task_id)).await {
                Ok(Some(outcome)) => {
                    info!(
                        "Job {} finished after {} polls: {:?}",
                        task_id, attempt, outcome
                    );
                    return outcome;
                },
                Ok(None) => debug!("Job {} still running ({}/{})", task_id, attempt, attempts),
                Err(_) => {
                    warn!("Status query for {} outlived the poll budget", task_id);
                    break;
                },
            }
        }

        info!(
            "Job {} still running after {:?}, handing off to the client",
            task_id, budget
        );
        PollOutcome::StillProcessing
    }
}
