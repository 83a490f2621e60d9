//! Waiting for a submission to be graded.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use crate::api::Submission;
use crate::error::{DecanterError, Result, Step};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_DEADLINE: Duration = Duration::from_secs(120);

/// Repeats a submissions query until the newest entry carries scores.
#[derive(Debug, Clone, Copy)]
pub struct ResultPoller {
    interval: Duration,
    deadline: Duration,
}

impl Default for ResultPoller {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            deadline: DEFAULT_DEADLINE,
        }
    }
}

impl ResultPoller {
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run `query` every interval until the best-seen submission is graded.
    ///
    /// "Best" is the highest version across every fetch so far, not the last
    /// element of the latest fetch. Fetch errors count as "not ready yet";
    /// only the deadline ends the wait unsuccessfully.
    pub async fn poll_until_graded<F, Fut>(&self, mut query: F) -> Result<Submission>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<Submission>>>,
    {
        if self.interval.is_zero() {
            return Err(DecanterError::InvalidArgument(
                "poll interval must be non-zero".to_string(),
            ));
        }
        let started = Instant::now();
        let mut state = PollState {
            deadline: started + self.deadline,
            best: None,
        };
        let mut ticker = tokio::time::interval_at(started + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let expired = tokio::time::sleep_until(state.deadline);
        tokio::pin!(expired);

        loop {
            tokio::select! {
                biased;
                _ = &mut expired => {
                    return Err(DecanterError::timeout(Step::GradeWait, started.elapsed()));
                }
                _ = ticker.tick() => {}
            }

            match tokio::time::timeout_at(state.deadline, query()).await {
                Err(_) => return Err(DecanterError::timeout(Step::GradeWait, started.elapsed())),
                Ok(Err(e)) => tracing::warn!(error = %e, "polling failure, retrying"),
                Ok(Ok(fetched)) => {
                    if let Some(graded) = state.observe(fetched) {
                        return Ok(graded);
                    }
                    tracing::debug!(best_version = ?state.best_version(), "not graded yet");
                }
            }
        }
    }
}

/// Convenience wrapper over [`ResultPoller::poll_until_graded`].
pub async fn poll_until_graded<F, Fut>(
    query: F,
    interval: Duration,
    deadline: Duration,
) -> Result<Submission>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<Submission>>>,
{
    ResultPoller::new(interval, deadline)
        .poll_until_graded(query)
        .await
}

struct PollState {
    deadline: Instant,
    best: Option<Submission>,
}

impl PollState {
    fn best_version(&self) -> Option<u32> {
        self.best.as_ref().map(|s| s.version)
    }

    /// Fold a fetch into the best-seen entry; returns it once graded.
    ///
    /// A refetch of the best version replaces it, since that is how its
    /// scores arrive.
    fn observe(&mut self, fetched: Vec<Submission>) -> Option<Submission> {
        for submission in fetched {
            let newer = self
                .best
                .as_ref()
                .map_or(true, |best| submission.version >= best.version);
            if newer {
                self.best = Some(submission);
            }
        }
        self.best.as_ref().filter(|s| s.is_graded()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::api::Score;

    fn submission(version: u32, score: Option<f64>) -> Submission {
        let mut scores = BTreeMap::new();
        if let Some(points) = score {
            scores.insert("1".to_string(), Score::Points(points));
        }
        Submission {
            version,
            filename: format!("v{version}.zip"),
            submitted_at: None,
            scores,
        }
    }

    #[test]
    fn observe_keeps_highest_version_across_fetches() {
        let mut state = PollState {
            deadline: Instant::now(),
            best: None,
        };
        assert!(state.observe(vec![submission(1, None)]).is_none());
        assert!(state.observe(vec![submission(4, None)]).is_none());
        // Stale graded entry does not displace the newer ungraded one.
        assert!(state.observe(vec![submission(2, Some(50.0))]).is_none());
        assert_eq!(state.best_version(), Some(4));
        let graded = state.observe(vec![submission(4, Some(80.0))]).unwrap();
        assert_eq!(graded.version, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_rejected() {
        let result = ResultPoller::new(Duration::ZERO, Duration::from_secs(1))
            .poll_until_graded(|| async { Ok(Vec::new()) })
            .await;
        assert!(matches!(result, Err(DecanterError::InvalidArgument(_))));
    }
}
