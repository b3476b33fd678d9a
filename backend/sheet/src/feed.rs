//! # Feed Assembler
//!
//! Filters, sorts and paginates decoded articles for display. Pure: the same
//! records and query always give the same page.
use std::{cmp::Ordering, str::FromStr};

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::records::ArticleRecord;

pub const DEFAULT_PAGE_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Newest first.
    #[default]
    Latest,
    Oldest,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" | "newest" | "desc" => Ok(SortOrder::Latest),
            "oldest" | "asc" => Ok(SortOrder::Oldest),
            other => Err(format!("unknown sort order {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedQuery {
    pub search_term: String,
    pub genre_filter: String,
    pub sort_order: SortOrder,
    /// 1-based, clamped into range. Signed so `page=-1` clamps instead of
    /// being rejected.
    pub page: i64,
    /// Values below 1 mean 1.
    pub page_size: i64,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            genre_filter: String::new(),
            sort_order: SortOrder::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE as i64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub page_items: Vec<ArticleRecord>,
    pub total_pages: usize,
    /// The page actually returned, after clamping.
    pub page: usize,
    pub total_items: usize,
}

/// Parses the date formats editors type into the table.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%m/%d/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(text, "%B %d, %Y"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}

fn matches(article: &ArticleRecord, search: &str, genre: &str) -> bool {
    if !genre.is_empty() && article.genre.trim().to_lowercase() != genre {
        return false;
    }

    search.is_empty()
        || article.title.to_lowercase().contains(search)
        || article.intro.to_lowercase().contains(search)
        || article.genre.to_lowercase().contains(search)
}

/// Undated articles go last in either order.
fn compare(a: Option<NaiveDate>, b: Option<NaiveDate>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Latest => b.cmp(&a),
            SortOrder::Oldest => a.cmp(&b),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    total_items.div_ceil(page_size.max(1))
}

pub fn assemble(records: &[ArticleRecord], query: &FeedQuery) -> FeedPage {
    let search = query.search_term.trim().to_lowercase();
    let genre = query.genre_filter.trim().to_lowercase();

    let mut filtered: Vec<(Option<NaiveDate>, &ArticleRecord)> = records
        .iter()
        .filter(|article| matches(article, &search, &genre))
        .map(|article| (parse_date(&article.date), article))
        .collect();

    // stable: ties keep table order
    filtered.sort_by(|(a, _), (b, _)| compare(*a, *b, query.sort_order));

    let page_size = usize::try_from(query.page_size).unwrap_or(0).max(1);
    let total_items = filtered.len();
    let total_pages = total_pages(total_items, page_size);
    let page = usize::try_from(query.page)
        .unwrap_or(0)
        .clamp(1, total_pages.max(1));

    let page_items = filtered
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .map(|(_, article)| article.clone())
        .collect();

    FeedPage {
        page_items,
        total_pages,
        page,
        total_items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: u32, date: &str, genre: &str, title: &str) -> ArticleRecord {
        ArticleRecord {
            id,
            title: title.to_string(),
            date: date.to_string(),
            genre: genre.to_string(),
            intro: format!("intro {id}"),
            full_content: String::new(),
            like_count: 0,
            url: String::new(),
        }
    }

    fn records() -> Vec<ArticleRecord> {
        vec![
            article(1, "2024-01-01", "Tech", "Intro to X"),
            article(2, "2024-03-01", "Philosophy", "Kant"),
            article(3, "2024-01-01", "Tech", "Same day"),
            article(4, "not a date", "Tech", "Undated"),
            article(5, "02/15/2024", "AI and Tech", "Models"),
        ]
    }

    fn ids(page: &FeedPage) -> Vec<u32> {
        page.page_items.iter().map(|a| a.id).collect()
    }

    fn everything(sort_order: SortOrder) -> FeedQuery {
        FeedQuery {
            sort_order,
            page_size: 100,
            ..FeedQuery::default()
        }
    }

    #[test]
    fn test_latest_is_stable() {
        let query = everything(SortOrder::Latest);
        let page = assemble(&records(), &query);

        assert_eq!(ids(&page), vec![2, 5, 1, 3, 4]);
        assert_eq!(assemble(&records(), &query), page);
    }

    #[test]
    fn test_oldest() {
        let page = assemble(&records(), &everything(SortOrder::Oldest));
        assert_eq!(ids(&page), vec![1, 3, 5, 2, 4]);
    }

    #[test]
    fn test_search_matches_title_intro_genre() {
        let mut query = everything(SortOrder::Oldest);

        query.search_term = "  KANT ".into();
        assert_eq!(ids(&assemble(&records(), &query)), vec![2]);

        query.search_term = "intro 3".into();
        assert_eq!(ids(&assemble(&records(), &query)), vec![3]);

        query.search_term = "philo".into();
        assert_eq!(ids(&assemble(&records(), &query)), vec![2]);
    }

    #[test]
    fn test_genre_filter_is_exact() {
        let mut query = everything(SortOrder::Oldest);
        query.genre_filter = "tech".into();
        assert_eq!(ids(&assemble(&records(), &query)), vec![1, 3, 4]);

        query.search_term = "same".into();
        assert_eq!(ids(&assemble(&records(), &query)), vec![3]);
    }

    #[test]
    fn test_pagination_clamps() {
        let records: Vec<ArticleRecord> = (1..=9)
            .map(|id| article(id, &format!("2024-01-{id:02}"), "Tech", "t"))
            .collect();

        let mut query = FeedQuery {
            sort_order: SortOrder::Oldest,
            page_size: 4,
            ..FeedQuery::default()
        };

        query.page = 5;
        let page = assemble(&records, &query);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 3);
        assert_eq!(ids(&page), vec![9]);

        query.page = 0;
        let page = assemble(&records, &query);
        assert_eq!(page.page, 1);
        assert_eq!(ids(&page), vec![1, 2, 3, 4]);

        query.page = -3;
        query.page_size = -1;
        let page = assemble(&records, &query);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 9);
        assert_eq!(ids(&page), vec![1]);
    }

    #[test]
    fn test_empty_feed() {
        let page = assemble(&[], &FeedQuery { page: 3, ..FeedQuery::default() });
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.page, 1);
        assert!(page.page_items.is_empty());
    }

    #[test]
    fn test_query_from_json_defaults() {
        let query: FeedQuery = serde_json::from_str(r#"{"sortOrder":"oldest"}"#).unwrap();
        assert_eq!(query.sort_order, SortOrder::Oldest);
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, DEFAULT_PAGE_SIZE as i64);
    }
}
