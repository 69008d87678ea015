use crate::models::Poll;
use crate::voting::Tally;

pub fn tally(poll: &Poll) -> Tally {
    let counts: Vec<u64> = poll.options.iter().map(|option| option.vote_count).collect();
    let total = counts.iter().sum();

    // Strict comparison keeps the first option among equal maxima.
    let leader_index = if total > 0 {
        let mut best = 0;
        for (i, &count) in counts.iter().enumerate() {
            if count > counts[best] {
                best = i;
            }
        }
        Some(best)
    } else {
        None
    };

    Tally {
        counts,
        total,
        leader_index,
    }
}

/// Human readable breakdown, one line per option in poll order.
pub fn summary(poll: &Poll, tally: &Tally) -> String {
    let mut summary = String::new();

    match tally.leader(poll) {
        Some(leader) => summary.push_str(&format!("Currently leading: {}\n", leader.text)),
        None => summary.push_str("No votes yet\n"),
    }

    for (i, option) in poll.options.iter().enumerate() {
        let votes = tally.counts.get(i).copied().unwrap_or(0);
        let line = if tally.is_leader(i) {
            format!("**{}**: {} votes ({:.1}%)", option.text, votes, tally.percentage(i))
        } else {
            format!("{}: {} votes ({:.1}%)", option.text, votes, tally.percentage(i))
        };
        summary.push_str(&line);
        summary.push('\n');
    }

    summary.push_str(&format!("\nTotal votes: {}", tally.total));
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PollOption;
    use chrono::{TimeZone, Utc};

    fn poll_with(counts: &[u64]) -> Poll {
        Poll {
            id: "p".to_string(),
            title: "Lunch".to_string(),
            options: counts
                .iter()
                .enumerate()
                .map(|(i, &vote_count)| PollOption {
                    text: format!("Option {}", i + 1),
                    vote_count,
                })
                .collect(),
            start_time: Utc.timestamp_millis_opt(0).unwrap(),
            end_time: Utc.timestamp_millis_opt(1000).unwrap(),
        }
    }

    #[test]
    fn test_ties_go_to_lowest_index() {
        let result = tally(&poll_with(&[3, 3, 1]));
        assert_eq!(result.counts, vec![3, 3, 1]);
        assert_eq!(result.total, 7);
        assert_eq!(result.leader_index, Some(0));

        let result = tally(&poll_with(&[1, 4, 4]));
        assert_eq!(result.leader_index, Some(1));
    }

    #[test]
    fn test_zero_votes_has_no_leader() {
        let result = tally(&poll_with(&[0, 0]));
        assert_eq!(result.total, 0);
        assert_eq!(result.leader_index, None);
        assert_eq!(result.percentages(), vec![0.0, 0.0]);
        assert!(result.percentages().iter().all(|p| !p.is_nan()));
    }

    #[test]
    fn test_percentages() {
        let result = tally(&poll_with(&[1, 3]));
        assert_eq!(result.percentage(0), 25.0);
        assert_eq!(result.percentage(1), 75.0);
        assert_eq!(result.percentage(7), 0.0);
    }

    #[test]
    fn test_tally_is_deterministic() {
        let poll = poll_with(&[2, 5, 5, 0]);
        assert_eq!(tally(&poll), tally(&poll));
    }

    #[test]
    fn test_summary_marks_leader() {
        let poll = poll_with(&[1, 3]);
        let text = summary(&poll, &tally(&poll));
        assert!(text.starts_with("Currently leading: Option 2"));
        assert!(text.contains("**Option 2**: 3 votes (75.0%)"));
        assert!(text.contains("Option 1: 1 votes (25.0%)"));

        let empty = poll_with(&[0, 0]);
        assert!(summary(&empty, &tally(&empty)).starts_with("No votes yet"));
    }
}
