//! Categories and tags share one shape and one lifecycle.

use serde::{Deserialize, Serialize};

use super::count_stats::CountStatsType;
use crate::bus::topics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyKind {
    Category,
    Tag,
}

impl TaxonomyKind {
    /// Topic the lifecycle events of this kind are published on.
    pub fn topic(self) -> &'static str {
        match self {
            TaxonomyKind::Category => topics::CATEGORY,
            TaxonomyKind::Tag => topics::TAG,
        }
    }

    /// Per-entity post counter.
    pub fn count_type(self) -> CountStatsType {
        match self {
            TaxonomyKind::Category => CountStatsType::PostCountInCategory,
            TaxonomyKind::Tag => CountStatsType::PostCountInTag,
        }
    }

    /// Website total of entities of this kind.
    pub fn website_count_type(self) -> CountStatsType {
        match self {
            TaxonomyKind::Category => CountStatsType::CategoryCount,
            TaxonomyKind::Tag => CountStatsType::TagCount,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaxonomyKind::Category => "category",
            TaxonomyKind::Tag => "tag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub id: String,
    pub kind: TaxonomyKind,
    pub name: String,
    pub route: String,
    /// Tags carry no description.
    pub description: Option<String>,
    pub enabled: bool,
}

impl Taxonomy {
    pub fn new(kind: TaxonomyKind, name: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            kind,
            name: name.into(),
            route: route.into(),
            description: None,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyWithCount {
    pub taxonomy: Taxonomy,
    pub post_count: i64,
}
