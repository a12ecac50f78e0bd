// src/scheduler/timer.rs - Single cancellable deadline
use std::time::Duration;

use tokio::time::{sleep_until, Instant};

/// One-shot deadline owned by an element task.
///
/// Arming always replaces the previous deadline, so at most one firing is
/// ever outstanding. An unarmed timer never completes.
#[derive(Debug, Default)]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    pub fn new() -> Self {
        Self { deadline: None }
    }

    pub fn arm(&mut self, after: Duration) {
        self.deadline = Some(Instant::now() + after);
    }

    /// Arms only if nothing is pending. Returns whether it armed.
    pub fn arm_if_idle(&mut self, after: Duration) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.arm(after);
        true
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Completes at the deadline. The caller re-arms or cancels after it fires.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_deadline() {
        let mut timer = Timer::new();
        timer.arm(Duration::from_secs(300));
        let first = timer.deadline().unwrap();
        timer.arm(Duration::from_secs(90));
        assert!(timer.deadline().unwrap() < first);

        let start = Instant::now();
        timer.expired().await;
        assert!(start.elapsed() >= Duration::from_secs(90));
        assert!(start.elapsed() < Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let mut timer = Timer::new();
        timer.arm(Duration::from_secs(1));
        timer.cancel();
        assert!(timer.deadline().is_none());
        let fired = tokio::time::timeout(Duration::from_secs(10), timer.expired()).await;
        assert!(fired.is_err());
    }

    #[tokio::test]
    async fn test_arm_if_idle() {
        let mut timer = Timer::new();
        assert!(timer.arm_if_idle(Duration::from_millis(250)));
        let deadline = timer.deadline();
        assert!(!timer.arm_if_idle(Duration::from_millis(250)));
        assert_eq!(timer.deadline(), deadline);
    }
}
