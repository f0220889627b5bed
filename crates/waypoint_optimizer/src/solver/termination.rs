use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use jiff::{SignedDuration, Timestamp};

/// Cooperative stop signal shared between a caller and running searches.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Deadline,
    Cancelled,
}

/// When a search has to give up and hand back its best result so far.
#[derive(Clone, Debug, Default)]
pub struct Termination {
    deadline: Option<Timestamp>,
    cancellation: Option<CancellationToken>,
}

impl Termination {
    pub fn never() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Timestamp) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Deadline `budget` from now. Budgets too large to represent are ignored.
    pub fn with_time_budget(self, budget: SignedDuration) -> Self {
        match Timestamp::now().checked_add(budget) {
            Ok(deadline) => self.with_deadline(deadline),
            Err(_) => self,
        }
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    pub fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        if self
            .cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            return Some(StopReason::Cancelled);
        }

        match self.deadline {
            Some(deadline) if Timestamp::now() >= deadline => Some(StopReason::Deadline),
            _ => None,
        }
    }

    #[inline]
    pub fn should_stop(&self) -> bool {
        self.stop_reason().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_stops() {
        assert!(!Termination::never().should_stop());
    }

    #[test]
    fn test_deadline_in_the_past() {
        let termination =
            Termination::never().with_deadline(Timestamp::now() - SignedDuration::from_secs(1));

        assert_eq!(termination.stop_reason(), Some(StopReason::Deadline));
    }

    #[test]
    fn test_cancellation_wins() {
        let token = CancellationToken::new();
        let termination = Termination::never()
            .with_time_budget(SignedDuration::from_mins(10))
            .with_cancellation(token.clone());

        assert!(!termination.should_stop());
        token.cancel();
        assert_eq!(termination.stop_reason(), Some(StopReason::Cancelled));
    }

    #[test]
    fn test_earliest_deadline_is_kept() {
        let now = Timestamp::now();
        let termination = Termination::never()
            .with_deadline(now + SignedDuration::from_secs(5))
            .with_deadline(now + SignedDuration::from_secs(60));

        assert_eq!(termination.deadline(), Some(now + SignedDuration::from_secs(5)));
    }
}
