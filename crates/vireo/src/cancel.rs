use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::errors::{AgentError, AgentResult};

/// Run-scoped cancellation and deadline supervisor. Checked at every
/// suspension point: before each model call and before each round of
/// tool dispatch. Work already in flight is drained, never interrupted.
#[derive(Debug, Clone)]
pub struct RunGuard {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RunGuard {
    pub fn new(token: CancellationToken, timeout: Option<Duration>) -> Self {
        RunGuard {
            token,
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    /// Err with the triggering condition once the run must stop.
    /// Cancellation takes precedence over an expired deadline.
    pub fn check(&self) -> AgentResult<()> {
        if self.token.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(AgentError::TimedOut);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_guard_passes() {
        let guard = RunGuard::new(CancellationToken::new(), None);
        assert!(guard.check().is_ok());
    }

    #[test]
    fn test_cancelled_token_trips() {
        let token = CancellationToken::new();
        let guard = RunGuard::new(token.clone(), None);
        token.cancel();
        assert_eq!(guard.check(), Err(AgentError::Cancelled));
    }

    #[tokio::test]
    async fn test_deadline_trips() {
        let guard = RunGuard::new(CancellationToken::new(), Some(Duration::from_millis(5)));
        assert!(guard.check().is_ok());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(guard.check(), Err(AgentError::TimedOut));
    }

    #[tokio::test]
    async fn test_cancellation_precedes_timeout() {
        let token = CancellationToken::new();
        let guard = RunGuard::new(token.clone(), Some(Duration::from_millis(1)));
        token.cancel();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(guard.check(), Err(AgentError::Cancelled));
    }
}
