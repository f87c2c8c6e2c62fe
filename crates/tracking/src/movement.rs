use std::time::Duration;

use tokio::time::Instant;

/// Raised when a cycle moved at least one vehicle, lowered again `duration`
/// after the most recent movement.
#[derive(Debug, Clone)]
pub struct MovementFlag {
    duration: Duration,
    armed_until: Option<Instant>,
}

impl MovementFlag {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            armed_until: None,
        }
    }

    /// (Re)arms the flag. A newer movement extends the deadline.
    pub fn arm(&mut self, now: Instant) {
        self.armed_until = Some(now + self.duration);
    }

    pub fn is_set(&self, now: Instant) -> bool {
        self.armed_until.is_some_and(|until| now < until)
    }

    /// When the flag lowers, `None` if it is not raised.
    pub fn deadline(&self) -> Option<Instant> {
        self.armed_until
    }

    /// Forgets an expired deadline. Returns true if the flag just lowered.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.armed_until {
            Some(until) if now >= until => {
                self.armed_until = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn flag_lowers_after_its_duration() {
        let mut flag = MovementFlag::new(Duration::from_secs(3));
        assert!(!flag.is_set(Instant::now()));

        flag.arm(Instant::now());
        assert!(flag.is_set(Instant::now()));

        tokio::time::advance(Duration::from_millis(2999)).await;
        assert!(flag.is_set(Instant::now()));
        assert!(!flag.expire(Instant::now()));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!flag.is_set(Instant::now()));
        assert!(flag.expire(Instant::now()));
        assert_eq!(flag.deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_movement_rearms_the_flag() {
        let mut flag = MovementFlag::new(Duration::from_secs(3));
        flag.arm(Instant::now());

        tokio::time::advance(Duration::from_secs(2)).await;
        flag.arm(Instant::now());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(flag.is_set(Instant::now()));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!flag.is_set(Instant::now()));
    }
}
