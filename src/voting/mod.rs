pub mod plurality;

use serde::Serialize;

use crate::models::{Poll, PollOption};

pub use plurality::tally;

// Aggregated vote counts of one poll, in option order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub counts: Vec<u64>,
    pub total: u64,
    pub leader_index: Option<usize>, // None until the first vote is in
}

impl Tally {
    /// Share of the total for option `index`, 0 when nobody has voted.
    pub fn percentage(&self, index: usize) -> f64 {
        match self.counts.get(index) {
            Some(&count) if self.total > 0 => count as f64 / self.total as f64 * 100.0,
            _ => 0.0,
        }
    }

    pub fn percentages(&self) -> Vec<f64> {
        (0..self.counts.len()).map(|i| self.percentage(i)).collect()
    }

    pub fn leader<'a>(&self, poll: &'a Poll) -> Option<&'a PollOption> {
        self.leader_index.and_then(|i| poll.options.get(i))
    }

    pub fn is_leader(&self, index: usize) -> bool {
        self.leader_index == Some(index)
    }
}
