use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PollError;

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_OPTION_LEN: usize = 50;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    #[serde(default = "new_poll_id")]
    pub id: String,
    pub title: String,
    pub options: Vec<PollOption>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    pub text: String,
    // Older records were written as `votes`, or without any count at all.
    #[serde(default, alias = "votes")]
    pub vote_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Minutes,
    Hours,
    Days,
}

impl DurationUnit {
    pub fn to_duration(self, amount: i64) -> Option<Duration> {
        match self {
            DurationUnit::Minutes => Duration::try_minutes(amount),
            DurationUnit::Hours => Duration::try_hours(amount),
            DurationUnit::Days => Duration::try_days(amount),
        }
    }
}

impl std::str::FromStr for DurationUnit {
    type Err = PollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "min" | "minute" | "minutes" => Ok(DurationUnit::Minutes),
            "h" | "hour" | "hours" => Ok(DurationUnit::Hours),
            "d" | "day" | "days" => Ok(DurationUnit::Days),
            other => Err(PollError::InvalidPoll(format!("unknown duration unit: {}", other))),
        }
    }
}

/// Raw input of the poll authoring form, before validation.
#[derive(Debug, Clone)]
pub struct PollDraft {
    pub title: String,
    pub options: Vec<String>,
    pub duration: i64,
    pub unit: DurationUnit,
}

fn new_poll_id() -> String {
    Uuid::new_v4().to_string()
}

impl Poll {
    /// Builds a poll opening at `now` from a draft. Option texts are trimmed
    /// and blank entries dropped before the length rules are applied.
    pub fn from_draft(draft: PollDraft, now: DateTime<Utc>) -> Result<Self, PollError> {
        let title = draft.title.trim().to_string();
        let options: Vec<PollOption> = draft
            .options
            .iter()
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .map(|text| PollOption {
                text: text.to_string(),
                vote_count: 0,
            })
            .collect();

        if draft.duration <= 0 {
            return Err(PollError::InvalidPoll(
                "duration must be a positive number".to_string(),
            ));
        }

        let end_time = draft
            .unit
            .to_duration(draft.duration)
            .and_then(|duration| now.checked_add_signed(duration))
            .ok_or_else(|| PollError::InvalidPoll("duration is too long".to_string()))?;

        let poll = Self {
            id: new_poll_id(),
            title,
            options,
            start_time: now,
            end_time,
        };
        poll.validate()?;
        Ok(poll)
    }

    /// Checks the well-formedness rules every stored poll must satisfy.
    pub fn validate(&self) -> Result<(), PollError> {
        let title_len = self.title.chars().count();
        if title_len == 0 || title_len > MAX_TITLE_LEN {
            return Err(PollError::InvalidPoll(format!(
                "title must be 1 to {} characters",
                MAX_TITLE_LEN
            )));
        }
        if self.options.len() < MIN_OPTIONS || self.options.len() > MAX_OPTIONS {
            return Err(PollError::InvalidPoll(format!(
                "a poll needs {} to {} options, got {}",
                MIN_OPTIONS,
                MAX_OPTIONS,
                self.options.len()
            )));
        }
        for option in &self.options {
            let len = option.text.chars().count();
            if len == 0 || len > MAX_OPTION_LEN {
                return Err(PollError::InvalidPoll(format!(
                    "option text must be 1 to {} characters",
                    MAX_OPTION_LEN
                )));
            }
        }
        if self.end_time <= self.start_time {
            return Err(PollError::InvalidPoll(
                "end time must be after start time".to_string(),
            ));
        }
        Ok(())
    }

    /// Rejects an edit that breaks what stays fixed for a poll's lifetime:
    /// identity, option count and texts, the time window, and vote counts
    /// never going down.
    pub fn check_transition(&self, next: &Poll) -> Result<(), PollError> {
        if next.id != self.id || next.title != self.title {
            return Err(PollError::InvalidPoll("poll identity cannot change".to_string()));
        }
        if next.start_time != self.start_time || next.end_time != self.end_time {
            return Err(PollError::InvalidPoll("time window cannot change".to_string()));
        }
        if next.options.len() != self.options.len() {
            return Err(PollError::InvalidPoll("option count cannot change".to_string()));
        }
        for (before, after) in self.options.iter().zip(&next.options) {
            if before.text != after.text {
                return Err(PollError::InvalidPoll("option text cannot change".to_string()));
            }
            if after.vote_count < before.vote_count {
                return Err(PollError::InvalidPoll("vote counts cannot decrease".to_string()));
            }
        }
        Ok(())
    }
}
