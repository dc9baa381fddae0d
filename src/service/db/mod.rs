//! Keyword and response storage.

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::base::types::{CategoryId, Res, Void};

pub mod seed;
pub mod surreal;

// Records.

/// A stored pattern mapping a substring to a response category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub rule_id: i64,
    pub keyword_text: String,
    pub category_id: CategoryId,
}

/// One candidate response text inside a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEntry {
    pub category_id: CategoryId,
    pub response_id: i64,
    pub response_text: String,
}

/// Picks the winning rule among several matches.
///
/// The longest keyword wins; equal lengths fall back to the lowest rule ID.
pub fn pick_rule(rules: impl IntoIterator<Item = KeywordRule>) -> Option<KeywordRule> {
    rules
        .into_iter()
        .min_by(|a, b| b.keyword_text.chars().count().cmp(&a.keyword_text.chars().count()).then(a.rule_id.cmp(&b.rule_id)))
}

// Traits.

/// Generic database client trait that clients must implement.
///
/// This trait defines the read paths used by the resolver, plus the write paths used
/// to administer the keyword and response tables. Implementing this trait allows
/// different database backends to be used with the keyword-bot.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenericDbClient: Send + Sync + 'static {
    /// Finds the category of the keyword rule contained in `text`, if any.
    ///
    /// Matching is case-insensitive; when several rules match, [`pick_rule`] decides.
    async fn find_category_for_text(&self, text: &str) -> Res<Option<CategoryId>>;

    /// Finds the response with the smallest response ID in a category.
    async fn find_response_for_category(&self, category_id: CategoryId) -> Res<Option<ResponseEntry>>;

    /// Finds the first response of `category_id`, or else the first response of
    /// `fallback_id`, in a single round trip.
    async fn find_response_with_fallback(&self, category_id: CategoryId, fallback_id: CategoryId) -> Res<Option<ResponseEntry>>;

    /// Inserts or replaces a keyword rule, keyed by its rule ID.
    async fn upsert_keyword_rule(&self, rule: &KeywordRule) -> Void;

    /// Inserts or replaces a response entry, keyed by its category and response ID.
    async fn upsert_response_entry(&self, entry: &ResponseEntry) -> Void;
}

// Structs.

/// Database client for keyword-bot.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct DbClient {
    inner: Arc<dyn GenericDbClient>,
}

impl Deref for DbClient {
    type Target = dyn GenericDbClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl DbClient {
    pub fn new(inner: Arc<dyn GenericDbClient>) -> Self {
        Self { inner }
    }
}
