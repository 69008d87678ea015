pub mod poll;

use clap::{Parser, Subcommand};

use crate::models::{DurationUnit, MAX_OPTIONS, PollDraft};

#[derive(Parser, Debug)]
#[command(name = "poll-tally", version, about = "Time-bounded polls with live results")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Create a poll that opens now
    Create {
        title: String,
        duration: i64,
        /// minutes, hours or days
        unit: DurationUnit,
        #[arg(required = true, num_args = 2..)]
        options: Vec<String>,
    },
    /// List polls, optionally filtered by title
    List { query: Option<String> },
    /// Vote for an option, numbered from 1
    Vote {
        title: String,
        #[arg(value_parser = clap::value_parser!(u64).range(1..=MAX_OPTIONS as u64))]
        option: u64,
    },
    /// Follow the live results of a poll
    Watch { title: String },
    Delete { title: String },
}

impl Command {
    pub fn draft(&self) -> Option<PollDraft> {
        match self {
            Command::Create { title, duration, unit, options } => Some(PollDraft {
                title: title.clone(),
                options: options.clone(),
                duration: *duration,
                unit: *unit,
            }),
            _ => None,
        }
    }
}

/// Zero-based index of a 1-based option number from the command line.
pub fn option_index(option: u64) -> usize {
    option.saturating_sub(1) as usize
}
