//! Maps inbound text to a canned response.
//!
//! Resolution is a two-step lookup: the text is matched against the stored keyword
//! rules to find a category, and the category's first response (by response ID) is
//! returned. When no keyword matches, or the matched category is empty, the
//! configured fallback category answers instead. At most two store queries are
//! issued per call, and store failures are never retried here.

use tracing::{debug, instrument};

use crate::{
    base::types::{CategoryId, ResolveError},
    service::db::DbClient,
};

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// A keyword rule matched and its category had an entry.
    Keyword,
    /// The fallback category answered.
    Fallback,
}

/// A resolved response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub text: String,
    pub category_id: CategoryId,
    pub source: ResponseSource,
}

/// The response resolver.
///
/// It holds no mutable state, so it can be cloned freely and called concurrently.
#[derive(Clone)]
pub struct Resolver {
    db: DbClient,
    fallback_category: CategoryId,
}

impl Resolver {
    pub fn new(db: DbClient, fallback_category: CategoryId) -> Self {
        Self { db, fallback_category }
    }

    /// The category used when nothing else answers.
    pub fn fallback_category(&self) -> CategoryId {
        self.fallback_category
    }

    /// Resolves `text` to a response.
    ///
    /// Returns `Ok(None)` when neither a keyword category nor the fallback category has
    /// an entry; callers should then stay silent.
    #[instrument(skip(self))]
    pub async fn resolve(&self, text: &str) -> Result<Option<Response>, ResolveError> {
        let matched = self.db.find_category_for_text(text).await.map_err(ResolveError::StoreUnavailable)?;

        let entry = match matched {
            Some(category_id) if category_id != self.fallback_category => {
                debug!("Keyword matched category {}.", category_id);
                self.db.find_response_with_fallback(category_id, self.fallback_category).await
            }
            _ => self.db.find_response_for_category(self.fallback_category).await,
        }
        .map_err(ResolveError::StoreUnavailable)?;

        let Some(entry) = entry else {
            debug!("No response available.");
            return Ok(None);
        };

        let source = if matched == Some(entry.category_id) { ResponseSource::Keyword } else { ResponseSource::Fallback };

        Ok(Some(Response {
            text: entry.response_text,
            category_id: entry.category_id,
            source,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mockall::predicate::eq;

    use super::*;
    use crate::service::db::{MockGenericDbClient, ResponseEntry};

    fn entry(category_id: CategoryId, response_id: i64, text: &str) -> ResponseEntry {
        ResponseEntry {
            category_id,
            response_id,
            response_text: text.to_string(),
        }
    }

    fn resolver(mock: MockGenericDbClient) -> Resolver {
        Resolver::new(DbClient::new(Arc::new(mock)), 5)
    }

    #[tokio::test]
    async fn keyword_match_answers_from_its_category() {
        let mut mock = MockGenericDbClient::new();
        mock.expect_find_category_for_text().times(1).returning(|_| Ok(Some(3)));
        mock.expect_find_response_with_fallback()
            .with(eq(3), eq(5))
            .times(1)
            .returning(|_, _| Ok(Some(entry(3, 1, "It's sunny today!"))));
        mock.expect_find_response_for_category().never();

        let response = resolver(mock).resolve("what's the weather like").await.unwrap().unwrap();

        assert_eq!(response.text, "It's sunny today!");
        assert_eq!(response.category_id, 3);
        assert_eq!(response.source, ResponseSource::Keyword);
    }

    #[tokio::test]
    async fn no_match_answers_from_the_fallback_category() {
        let mut mock = MockGenericDbClient::new();
        mock.expect_find_category_for_text().times(1).returning(|_| Ok(None));
        mock.expect_find_response_for_category()
            .with(eq(5))
            .times(1)
            .returning(|_| Ok(Some(entry(5, 1, "I don't understand."))));
        mock.expect_find_response_with_fallback().never();

        let response = resolver(mock).resolve("tell me a joke").await.unwrap().unwrap();

        assert_eq!(response.text, "I don't understand.");
        assert_eq!(response.source, ResponseSource::Fallback);
    }

    #[tokio::test]
    async fn empty_matched_category_falls_back_in_two_queries() {
        let mut mock = MockGenericDbClient::new();
        mock.expect_find_category_for_text().times(1).returning(|_| Ok(Some(8)));
        mock.expect_find_response_with_fallback()
            .with(eq(8), eq(5))
            .times(1)
            .returning(|_, _| Ok(Some(entry(5, 1, "I don't understand."))));
        mock.expect_find_response_for_category().never();

        let response = resolver(mock).resolve("empty category").await.unwrap().unwrap();

        assert_eq!(response.category_id, 5);
        assert_eq!(response.source, ResponseSource::Fallback);
    }

    #[tokio::test]
    async fn keyword_pointing_at_the_fallback_category_is_a_keyword_answer() {
        let mut mock = MockGenericDbClient::new();
        mock.expect_find_category_for_text().returning(|_| Ok(Some(5)));
        mock.expect_find_response_for_category().with(eq(5)).times(1).returning(|_| Ok(Some(entry(5, 1, "Huh?"))));
        mock.expect_find_response_with_fallback().never();

        let response = resolver(mock).resolve("huh").await.unwrap().unwrap();

        assert_eq!(response.source, ResponseSource::Keyword);
    }

    #[tokio::test]
    async fn empty_fallback_is_no_response() {
        let mut mock = MockGenericDbClient::new();
        mock.expect_find_category_for_text().returning(|_| Ok(None));
        mock.expect_find_response_for_category().returning(|_| Ok(None));

        assert_eq!(resolver(mock).resolve("anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_response_text_is_still_a_response() {
        let mut mock = MockGenericDbClient::new();
        mock.expect_find_category_for_text().returning(|_| Ok(None));
        mock.expect_find_response_for_category().returning(|_| Ok(Some(entry(5, 1, ""))));

        let response = resolver(mock).resolve("anything").await.unwrap();

        assert_eq!(response.map(|r| r.text), Some(String::new()));
    }

    #[tokio::test]
    async fn store_failure_is_store_unavailable_and_not_retried() {
        let mut mock = MockGenericDbClient::new();
        mock.expect_find_category_for_text().times(1).returning(|_| Err(anyhow::anyhow!("connection refused")));
        mock.expect_find_response_for_category().never();
        mock.expect_find_response_with_fallback().never();

        let err = resolver(mock).resolve("hello").await.unwrap_err();

        assert!(matches!(err, ResolveError::StoreUnavailable(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn resolution_is_deterministic() {
        let mut mock = MockGenericDbClient::new();
        mock.expect_find_category_for_text().times(2).returning(|_| Ok(Some(3)));
        mock.expect_find_response_with_fallback().times(2).returning(|_, _| Ok(Some(entry(3, 1, "It's sunny today!"))));

        let resolver = resolver(mock);
        let first = resolver.resolve("weather").await.unwrap();
        let second = resolver.resolve("weather").await.unwrap();

        assert_eq!(first, second);
    }
}
