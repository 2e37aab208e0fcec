//! Cloud Firestore REST backend.
//!
//! Issues a single `documents:runQuery` against the score collection ordered by
//! `highScore` descending. Documents written by the game are loosely typed, so
//! decoding is permissive: missing or malformed numbers read as zero and
//! negative numbers are clamped to zero.

use std::collections::HashMap;

use async_trait::async_trait;
use coindash_core::config::StoreConfig;
use coindash_core::ScoreRecord;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{ScoreStore, ScoreStoreError};

pub const SCORE_COLLECTION_ID: &str = "coindash_scores";
const SCORE_FIELD: &str = "highScore";
const REFERRAL_FIELDS: [&str; 2] = ["referrals", "referralCount"];

pub struct FirestoreScoreStore {
    client: Client,
    base_url: String,
    project_id: String,
    collection_parent: String,
    api_key: Option<SecretString>,
    access_token: Option<SecretString>,
}

impl FirestoreScoreStore {
    pub fn new(client: Client, config: &StoreConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            project_id: config.project_id.clone(),
            collection_parent: config.collection_parent(),
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
        }
    }

    pub fn collection_path(&self) -> String {
        format!("{}/{SCORE_COLLECTION_ID}", self.collection_parent)
    }

    fn run_query_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents/{}:runQuery",
            self.base_url, self.project_id, self.collection_parent
        )
    }
}

#[async_trait]
impl ScoreStore for FirestoreScoreStore {
    fn backend(&self) -> &'static str {
        "firestore"
    }

    async fn fetch_top_scores(&self, limit: usize) -> Result<Vec<ScoreRecord>, ScoreStoreError> {
        let mut request =
            self.client.post(self.run_query_url()).json(&RunQueryRequest::top_scores(limit));
        if let Some(api_key) = &self.api_key {
            request = request.query(&[("key", api_key.expose_secret())]);
        }
        if let Some(access_token) = &self.access_token {
            request = request.bearer_auth(access_token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|error| ScoreStoreError::Transport(error.without_url().to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ScoreStoreError::Unauthorized(status.as_u16()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoreStoreError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let rows: Vec<RunQueryRow> = response
            .json()
            .await
            .map_err(|error| ScoreStoreError::Decode(error.without_url().to_string()))?;
        let records = decode_rows(rows);

        debug!(
            event_name = "store.firestore.query_completed",
            collection = %self.collection_path(),
            rows = records.len(),
            "score query completed"
        );
        Ok(records)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunQueryRequest {
    structured_query: StructuredQuery,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredQuery {
    from: Vec<CollectionSelector>,
    order_by: Vec<Order>,
    limit: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionSelector {
    collection_id: &'static str,
}

#[derive(Debug, Serialize)]
struct Order {
    field: FieldReference,
    direction: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldReference {
    field_path: &'static str,
}

impl RunQueryRequest {
    fn top_scores(limit: usize) -> Self {
        Self {
            structured_query: StructuredQuery {
                from: vec![CollectionSelector { collection_id: SCORE_COLLECTION_ID }],
                order_by: vec![Order {
                    field: FieldReference { field_path: SCORE_FIELD },
                    direction: "DESCENDING",
                }],
                limit,
            },
        }
    }
}

// Result sets with no matches still yield one row carrying only `readTime`.
#[derive(Debug, Deserialize)]
struct RunQueryRow {
    document: Option<Document>,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
}

fn decode_rows(rows: Vec<RunQueryRow>) -> Vec<ScoreRecord> {
    rows.into_iter().filter_map(|row| row.document).map(decode_document).collect()
}

fn decode_document(document: Document) -> ScoreRecord {
    let username = document
        .fields
        .get("username")
        .and_then(|value| value.get("stringValue"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    let high_score = count_field(&document, SCORE_FIELD);
    let referral_count = REFERRAL_FIELDS
        .iter()
        .find(|field| document.fields.contains_key(**field))
        .map(|field| count_field(&document, field))
        .unwrap_or(0);

    ScoreRecord::new(username, high_score, referral_count)
}

fn count_field(document: &Document, field: &str) -> u64 {
    let Some(value) = document.fields.get(field) else {
        return 0;
    };

    let raw = if let Some(integer) = value.get("integerValue") {
        integer.as_str().and_then(|text| text.parse::<i64>().ok()).or_else(|| integer.as_i64())
    } else if let Some(double) = value.get("doubleValue").and_then(Value::as_f64) {
        // Saturating float-to-int cast; NaN becomes 0.
        Some(double.trunc() as i64)
    } else {
        None
    };

    match raw {
        Some(number) if number < 0 => {
            warn!(
                event_name = "store.firestore.negative_value_clamped",
                document = %document.name,
                field,
                value = number,
                "negative count in score document clamped to zero"
            );
            0
        }
        Some(number) => number.unsigned_abs(),
        None => 0,
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|payload| payload.pointer("/error/message")?.as_str().map(str::to_owned))
        .unwrap_or_else(|| body.chars().take(200).collect())
}
