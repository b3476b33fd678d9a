use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Identifier of the one poll stored in the table.
pub const POLL_ID: &str = "trolley";

/// Reserved prefix of every article key cell.
pub const ARTICLE_PREFIX: &str = "article";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub id: u32,
    pub title: String,
    pub date: String,
    pub genre: String,
    pub intro: String,
    pub full_content: String,
    pub like_count: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl ArticleRecord {
    pub fn key(&self) -> CounterKey {
        CounterKey::Article(self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollTallyRecord {
    pub poll_id: String,
    pub option: PollOption,
    pub count: u64,
}

impl PollTallyRecord {
    pub fn key(&self) -> CounterKey {
        CounterKey::Poll(self.option)
    }
}

/// The known option codes of the trolley poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PollOption {
    A,
    B,
}

impl PollOption {
    pub const ALL: [PollOption; 2] = [PollOption::A, PollOption::B];

    pub fn code(self) -> &'static str {
        match self {
            PollOption::A => "A",
            PollOption::B => "B",
        }
    }

    /// Button text shown next to the option.
    pub fn label(self) -> &'static str {
        match self {
            PollOption::A => "Pull the Lever",
            PollOption::B => "Do Nothing",
        }
    }
}

impl fmt::Display for PollOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOption(pub String);

impl fmt::Display for UnknownOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown poll option {:?}", self.0)
    }
}

impl std::error::Error for UnknownOption {}

impl FromStr for PollOption {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(PollOption::A),
            "B" | "b" => Ok(PollOption::B),
            other => Err(UnknownOption(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Article,
    PollTally,
}

/// Logical locator of one mutable count in the table.
///
/// A key must resolve to at most one physical row; the table does not enforce
/// this, so lookups report duplicates instead of picking one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterKey {
    Article(u32),
    Poll(PollOption),
}

impl CounterKey {
    pub fn kind(self) -> RecordKind {
        match self {
            CounterKey::Article(_) => RecordKind::Article,
            CounterKey::Poll(_) => RecordKind::PollTally,
        }
    }

    /// Name of the browser-local "already acted" flag guarding this counter.
    ///
    /// Likes are guarded per article, votes per poll.
    pub fn action_flag(self) -> String {
        match self {
            CounterKey::Article(id) => format!("like:{ARTICLE_PREFIX}{id}"),
            CounterKey::Poll(_) => format!("vote:{POLL_ID}"),
        }
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterKey::Article(id) => write!(f, "{ARTICLE_PREFIX}{id}"),
            CounterKey::Poll(option) => write!(f, "{POLL_ID}:{option}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_parse() {
        assert_eq!("A".parse::<PollOption>(), Ok(PollOption::A));
        assert_eq!(" b ".parse::<PollOption>(), Ok(PollOption::B));
        assert!("C".parse::<PollOption>().is_err());
    }

    #[test]
    fn test_action_flags() {
        assert_eq!(CounterKey::Article(7).action_flag(), "like:article7");
        assert_eq!(
            CounterKey::Poll(PollOption::A).action_flag(),
            CounterKey::Poll(PollOption::B).action_flag()
        );
    }

    #[test]
    fn test_article_json_shape() {
        let article = ArticleRecord {
            id: 1,
            title: "Intro to X".into(),
            date: "2024-01-01".into(),
            genre: "Tech".into(),
            intro: "short intro".into(),
            full_content: "long body".into(),
            like_count: 3,
            url: String::new(),
        };

        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["likeCount"], 3);
        assert_eq!(json["fullContent"], "long body");
        assert!(json.get("url").is_none());
    }
}
