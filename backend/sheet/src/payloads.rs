//! JSON bodies exchanged between the browser client and the server.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::records::PollOption;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    pub article_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeResponse {
    pub likes: u64,
}

/// `option` stays a string so unknown codes reach the handler and get a 400
/// instead of a generic deserialization rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub option: String,
}

/// Tallies keyed by option code, every known option present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotesResponse {
    pub votes: BTreeMap<String, u64>,
}

impl VotesResponse {
    pub fn from_tally(tally: &BTreeMap<PollOption, u64>) -> Self {
        Self {
            votes: PollOption::ALL
                .iter()
                .map(|option| {
                    (
                        option.code().to_string(),
                        tally.get(option).copied().unwrap_or(0),
                    )
                })
                .collect(),
        }
    }

    pub fn count(&self, option: PollOption) -> u64 {
        self.votes.get(option.code()).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        PollOption::ALL.iter().map(|option| self.count(*option)).sum()
    }

    /// One-line result, e.g. `Pull the Lever: 40.0% | Do Nothing: 60.0%`.
    pub fn summary(&self) -> String {
        let total = self.total();
        if total == 0 {
            return "No votes yet".to_string();
        }

        PollOption::ALL
            .iter()
            .map(|option| {
                let percent = self.count(*option) as f64 * 100.0 / total as f64;
                format!("{}: {percent:.1}%", option.label())
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
