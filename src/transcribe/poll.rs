use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

/// One observation of a polled remote job.
pub enum PollStep<T> {
    /// The job has not reached a terminal status. Carries the raw status
    /// string if the service reported one.
    Pending(Option<String>),
    /// The job reached a successful terminal status.
    Terminal(T),
}

/// Bounded sleep-then-check retry policy for asynchronous remote jobs.
///
/// The policy owns the interval, the attempt ceiling, and the budget for
/// consecutive polls that report no status at all (a lost or orphaned job).
/// Terminal *failure* statuses are returned as errors by the check itself.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: usize,
    pub empty_status_budget: usize,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 300, // 10 minutes at the default interval
            empty_status_budget: 5,
        }
    }
}

impl PollPolicy {
    /// Drive `check` until it reports a terminal outcome or the policy is
    /// exhausted. `on_pending` runs after every pending poll with the attempt
    /// count (1-based) and the reported status, for progress reporting.
    pub async fn run<T, F, Fut, P>(&self, mut check: F, mut on_pending: P) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<PollStep<T>>>,
        P: FnMut(usize, Option<&str>),
    {
        let mut empty_statuses = 0usize;
        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(self.interval).await;
            match check().await? {
                PollStep::Terminal(value) => return Ok(value),
                PollStep::Pending(status) => {
                    if status.is_none() {
                        empty_statuses += 1;
                        if empty_statuses >= self.empty_status_budget {
                            return Err(Error::Timeout(format!(
                                "job reported no status for {empty_statuses} consecutive polls"
                            )));
                        }
                    } else {
                        empty_statuses = 0;
                    }
                    on_pending(attempt, status.as_deref());
                }
            }
        }
        Err(Error::Timeout(format!(
            "job still pending after {} polls",
            self.max_attempts
        )))
    }
}
