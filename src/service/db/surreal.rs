//! SurrealDB implementation for keyword-bot data storage.

use std::sync::Arc;

use async_trait::async_trait;
use surrealdb::{
    Surreal,
    engine::any::{self, Any},
    opt::auth::Root,
};
use tracing::{debug, info, instrument};

use crate::base::{
    config::Config,
    types::{CategoryId, Res, Void},
};

use super::{DbClient, GenericDbClient, KeywordRule, ResponseEntry, pick_rule};

// Queries.

const SCHEMA: &str = r#"
    DEFINE TABLE IF NOT EXISTS keyword_rule SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS rule_id ON keyword_rule TYPE int;
    DEFINE FIELD IF NOT EXISTS keyword_text ON keyword_rule TYPE string;
    DEFINE FIELD IF NOT EXISTS category_id ON keyword_rule TYPE int;

    DEFINE TABLE IF NOT EXISTS response_entry SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS category_id ON response_entry TYPE int;
    DEFINE FIELD IF NOT EXISTS response_id ON response_entry TYPE int;
    DEFINE FIELD IF NOT EXISTS response_text ON response_entry TYPE string;
    DEFINE INDEX IF NOT EXISTS response_entry_category ON response_entry FIELDS category_id;
"#;

// `$text` is lowercased by the caller; empty keywords never match.
const FIND_MATCHING_RULES: &str = r#"
    SELECT rule_id, keyword_text, category_id FROM keyword_rule
    WHERE keyword_text != '' AND string::contains($text, string::lowercase(keyword_text))
"#;

const FIND_FIRST_RESPONSE: &str = r#"
    SELECT category_id, response_id, response_text FROM response_entry
    WHERE category_id = $category_id
    ORDER BY response_id ASC
    LIMIT 1
"#;

// Two statements, one round trip: the first response of each category.
const FIND_FIRST_RESPONSE_OR_FALLBACK: &str = r#"
    SELECT category_id, response_id, response_text FROM response_entry
    WHERE category_id = $category_id
    ORDER BY response_id ASC
    LIMIT 1;

    SELECT category_id, response_id, response_text FROM response_entry
    WHERE category_id = $fallback_id
    ORDER BY response_id ASC
    LIMIT 1;
"#;

const UPSERT_KEYWORD_RULE: &str = "UPSERT type::thing('keyword_rule', $rule.rule_id) CONTENT $rule";

const UPSERT_RESPONSE_ENTRY: &str = "UPSERT type::thing('response_entry', [$entry.category_id, $entry.response_id]) CONTENT $entry";

// Extra methods on `DbClient` applied by the surreal implementation.

impl DbClient {
    /// Connects to the database named by the configuration.
    pub async fn surreal(config: &Config) -> Res<Self> {
        let client = SurrealDbClient::new(config).await?;
        Ok(Self { inner: Arc::new(client) })
    }

    /// Creates a fresh in-memory database.
    pub async fn surreal_memory() -> Res<Self> {
        let client = SurrealDbClient::memory().await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Structs.

/// SurrealDB client implementation.
#[derive(Clone)]
pub struct SurrealDbClient {
    db: Surreal<Any>,
}

impl SurrealDbClient {
    /// Connect, authenticate, and define the schema.
    #[instrument(name = "SurrealDbClient::new", skip_all, fields(endpoint = %config.db_endpoint))]
    pub async fn new(config: &Config) -> Res<Self> {
        let db = any::connect(config.db_endpoint.as_str()).await?;

        // Authenticate with the database if credentials were provided.
        if let (Some(username), Some(password)) = (&config.db_username, &config.db_password) {
            db.signin(Root {
                username: username.as_str(),
                password: password.as_str(),
            })
            .await?;
        }

        db.use_ns(config.db_namespace.as_str()).use_db(config.db_database.as_str()).await?;

        let client = Self { db };
        client.define_schema().await?;

        info!("Database initialized successfully.");

        Ok(client)
    }

    /// Creates an in-memory database with the default namespace.
    pub async fn memory() -> Res<Self> {
        let db = any::connect("mem://").await?;
        db.use_ns("keyword").use_db("bot").await?;

        let client = Self { db };
        client.define_schema().await?;

        Ok(client)
    }

    async fn define_schema(&self) -> Void {
        self.db.query(SCHEMA).await?.check()?;
        Ok(())
    }
}

#[async_trait]
impl GenericDbClient for SurrealDbClient {
    #[instrument(skip(self))]
    async fn find_category_for_text(&self, text: &str) -> Res<Option<CategoryId>> {
        let mut response = self.db.query(FIND_MATCHING_RULES).bind(("text", text.to_lowercase())).await?;
        let rules: Vec<KeywordRule> = response.take(0)?;

        debug!("{} keyword rule(s) matched.", rules.len());

        Ok(pick_rule(rules).map(|rule| rule.category_id))
    }

    #[instrument(skip(self))]
    async fn find_response_for_category(&self, category_id: CategoryId) -> Res<Option<ResponseEntry>> {
        let mut response = self.db.query(FIND_FIRST_RESPONSE).bind(("category_id", category_id)).await?;
        let entries: Vec<ResponseEntry> = response.take(0)?;

        Ok(entries.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn find_response_with_fallback(&self, category_id: CategoryId, fallback_id: CategoryId) -> Res<Option<ResponseEntry>> {
        let mut response = self
            .db
            .query(FIND_FIRST_RESPONSE_OR_FALLBACK)
            .bind(("category_id", category_id))
            .bind(("fallback_id", fallback_id))
            .await?;
        let preferred: Vec<ResponseEntry> = response.take(0)?;
        let fallback: Vec<ResponseEntry> = response.take(1)?;

        Ok(preferred.into_iter().chain(fallback).next())
    }

    #[instrument(skip(self))]
    async fn upsert_keyword_rule(&self, rule: &KeywordRule) -> Void {
        self.db.query(UPSERT_KEYWORD_RULE).bind(("rule", rule.clone())).await?.check()?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn upsert_response_entry(&self, entry: &ResponseEntry) -> Void {
        self.db.query(UPSERT_RESPONSE_ENTRY).bind(("entry", entry.clone())).await?.check()?;
        Ok(())
    }
}
