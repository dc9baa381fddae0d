//! Administrative seed files for the keyword and response tables.
//!
//! A seed file is TOML with two arrays:
//!
//! ```toml
//! [[keywords]]
//! rule_id = 1
//! keyword_text = "weather"
//! category_id = 3
//!
//! [[responses]]
//! category_id = 3
//! response_id = 1
//! response_text = "It's sunny today!"
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{info, instrument};

use crate::base::types::{Res, Void};

use super::{DbClient, KeywordRule, ResponseEntry};

/// The contents of a seed file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub keywords: Vec<KeywordRule>,
    #[serde(default)]
    pub responses: Vec<ResponseEntry>,
}

impl SeedData {
    /// Reads a seed file; the format follows the file extension.
    pub fn load(path: &Path) -> Res<Self> {
        let data = config::Config::builder().add_source(config::File::from(path.to_path_buf())).build()?.try_deserialize()?;

        Ok(data)
    }

    /// Upserts every record into the store.
    #[instrument(skip_all)]
    pub async fn apply(&self, db: &DbClient) -> Void {
        for rule in &self.keywords {
            db.upsert_keyword_rule(rule).await?;
        }

        for entry in &self.responses {
            db.upsert_response_entry(entry).await?;
        }

        info!("Seeded {} keyword rule(s) and {} response(s).", self.keywords.len(), self.responses.len());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn loads_keywords_and_responses() {
        let path = std::env::temp_dir().join(format!("keyword-bot-seed-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
[[keywords]]
rule_id = 1
keyword_text = "weather"
category_id = 3

[[responses]]
category_id = 3
response_id = 1
response_text = "It's sunny today!"

[[responses]]
category_id = 5
response_id = 1
response_text = "I don't understand."
"#
        )
        .unwrap();
        drop(file);

        let seed = SeedData::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(seed.keywords.len(), 1);
        assert_eq!(seed.keywords[0].keyword_text, "weather");
        assert_eq!(seed.responses.len(), 2);
        assert_eq!(seed.responses[1].category_id, 5);
    }

    #[tokio::test]
    async fn apply_writes_every_record() {
        let db = DbClient::surreal_memory().await.unwrap();
        let seed = SeedData {
            keywords: vec![KeywordRule {
                rule_id: 1,
                keyword_text: "weather".to_string(),
                category_id: 3,
            }],
            responses: vec![ResponseEntry {
                category_id: 3,
                response_id: 1,
                response_text: "It's sunny today!".to_string(),
            }],
        };

        seed.apply(&db).await.unwrap();
        // Seeding twice is harmless.
        seed.apply(&db).await.unwrap();

        assert_eq!(db.find_category_for_text("weather?").await.unwrap(), Some(3));
        assert_eq!(db.find_response_for_category(3).await.unwrap().unwrap().response_text, "It's sunny today!");
    }
}
