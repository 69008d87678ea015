use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

use crate::models::Poll;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PollStatus {
    Open,
    Closed,
}

// The end instant itself already counts as closed.
pub fn status(poll: &Poll, now: DateTime<Utc>) -> PollStatus {
    if now >= poll.end_time {
        PollStatus::Closed
    } else {
        PollStatus::Open
    }
}

/// Time left until the poll closes, never negative.
pub fn remaining(poll: &Poll, now: DateTime<Utc>) -> Duration {
    match status(poll, now) {
        PollStatus::Closed => Duration::zero(),
        PollStatus::Open => poll.end_time - now,
    }
}

/// Whole hours/minutes/seconds of a remaining duration, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemainingTime {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    // Taken from the exact duration; under a second left still counts as open.
    pub closed: bool,
}

impl From<Duration> for RemainingTime {
    fn from(duration: Duration) -> Self {
        let total = duration.num_seconds().max(0);
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
            closed: duration <= Duration::zero(),
        }
    }
}

impl fmt::Display for RemainingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.closed {
            write!(f, "Poll Closed")
        } else {
            write!(f, "{}h {}m {}s remaining", self.hours, self.minutes, self.seconds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PollOption;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn lunch() -> Poll {
        Poll {
            id: "p1".to_string(),
            title: "Lunch".to_string(),
            options: vec![
                PollOption { text: "Pizza".to_string(), vote_count: 0 },
                PollOption { text: "Sushi".to_string(), vote_count: 0 },
            ],
            start_time: at(0),
            end_time: at(1000),
        }
    }

    #[test]
    fn test_status_boundary_is_closed() {
        let poll = lunch();
        assert_eq!(status(&poll, at(0)), PollStatus::Open);
        assert_eq!(status(&poll, at(999)), PollStatus::Open);
        assert_eq!(status(&poll, at(1000)), PollStatus::Closed);
        assert_eq!(status(&poll, at(5000)), PollStatus::Closed);
    }

    #[test]
    fn test_remaining_clamps_to_zero() {
        let poll = lunch();
        assert_eq!(remaining(&poll, at(400)), Duration::milliseconds(600));
        assert_eq!(remaining(&poll, at(1000)), Duration::zero());
        assert_eq!(remaining(&poll, at(9000)), Duration::zero());
    }

    #[test]
    fn test_remaining_time_decomposition() {
        let parts = RemainingTime::from(Duration::seconds(3 * 3600 + 25 * 60 + 7));
        assert_eq!(
            parts,
            RemainingTime { hours: 3, minutes: 25, seconds: 7, closed: false }
        );
        assert_eq!(parts.to_string(), "3h 25m 7s remaining");

        assert_eq!(RemainingTime::from(Duration::zero()).to_string(), "Poll Closed");
        assert_eq!(RemainingTime::from(Duration::milliseconds(-5)).to_string(), "Poll Closed");
    }

    #[test]
    fn test_last_second_still_reads_as_open() {
        let poll = lunch();
        let parts = RemainingTime::from(remaining(&poll, at(400)));
        assert_eq!(status(&poll, at(400)), PollStatus::Open);
        assert!(!parts.closed);
        assert_eq!(parts.to_string(), "0h 0m 0s remaining");

        let parts = RemainingTime::from(Duration::milliseconds(600));
        assert_ne!(parts.to_string(), "Poll Closed");
    }
}
