//! Denormalized counters keyed by `(type, reference_id)`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CountStatsType {
    PostCountInCategory,
    PostCountInTag,
    PostCount,
    CategoryCount,
    TagCount,
    CommentCount,
    LikeCount,
    WebsiteViewCount,
}

impl CountStatsType {
    /// Counters kept once per website, keyed by their own name.
    pub const WEBSITE: [CountStatsType; 6] = [
        CountStatsType::PostCount,
        CountStatsType::CategoryCount,
        CountStatsType::TagCount,
        CountStatsType::CommentCount,
        CountStatsType::LikeCount,
        CountStatsType::WebsiteViewCount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CountStatsType::PostCountInCategory => "PostCountInCategory",
            CountStatsType::PostCountInTag => "PostCountInTag",
            CountStatsType::PostCount => "PostCount",
            CountStatsType::CategoryCount => "CategoryCount",
            CountStatsType::TagCount => "TagCount",
            CountStatsType::CommentCount => "CommentCount",
            CountStatsType::LikeCount => "LikeCount",
            CountStatsType::WebsiteViewCount => "WebsiteViewCount",
        }
    }

    pub fn is_website_level(&self) -> bool {
        Self::WEBSITE.contains(self)
    }
}

impl fmt::Display for CountStatsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored counter type is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown count stats type: {0}")]
pub struct UnknownCountStatsType(pub String);

impl FromStr for CountStatsType {
    type Err = UnknownCountStatsType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "PostCountInCategory" => CountStatsType::PostCountInCategory,
            "PostCountInTag" => CountStatsType::PostCountInTag,
            "PostCount" => CountStatsType::PostCount,
            "CategoryCount" => CountStatsType::CategoryCount,
            "TagCount" => CountStatsType::TagCount,
            "CommentCount" => CountStatsType::CommentCount,
            "LikeCount" => CountStatsType::LikeCount,
            "WebsiteViewCount" => CountStatsType::WebsiteViewCount,
            other => return Err(UnknownCountStatsType(other.to_string())),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountStats {
    #[serde(rename = "type")]
    pub stats_type: CountStatsType,
    pub reference_id: String,
    pub count: i64,
}

impl CountStats {
    pub fn new(stats_type: CountStatsType, reference_id: impl Into<String>) -> Self {
        Self {
            stats_type,
            reference_id: reference_id.into(),
            count: 0,
        }
    }

    /// Website-level row: the type name doubles as the reference id.
    pub fn website(stats_type: CountStatsType) -> Self {
        Self::new(stats_type, stats_type.as_str())
    }
}

/// Aggregated website totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteCountStats {
    pub post_count: i64,
    pub category_count: i64,
    pub tag_count: i64,
    pub comment_count: i64,
    pub like_count: i64,
    pub website_view_count: i64,
}

impl WebsiteCountStats {
    pub fn set_count_by_type(&mut self, stats_type: CountStatsType, count: i64) {
        match stats_type {
            CountStatsType::PostCount => self.post_count = count,
            CountStatsType::CategoryCount => self.category_count = count,
            CountStatsType::TagCount => self.tag_count = count,
            CountStatsType::CommentCount => self.comment_count = count,
            CountStatsType::LikeCount => self.like_count = count,
            CountStatsType::WebsiteViewCount => self.website_view_count = count,
            CountStatsType::PostCountInCategory | CountStatsType::PostCountInTag => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_roundtrips_through_str() {
        for t in [
            CountStatsType::PostCountInCategory,
            CountStatsType::PostCountInTag,
            CountStatsType::CommentCount,
        ] {
            assert_eq!(t.as_str().parse::<CountStatsType>().unwrap(), t);
        }
        assert!("Bogus".parse::<CountStatsType>().is_err());
    }

    #[test]
    fn test_website_row_uses_type_name() {
        let row = CountStats::website(CountStatsType::LikeCount);
        assert_eq!(row.reference_id, "LikeCount");
        assert!(CountStatsType::LikeCount.is_website_level());
        assert!(!CountStatsType::PostCountInTag.is_website_level());
    }
}
