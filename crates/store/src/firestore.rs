//! Cloud Firestore over its REST API.
//!
//! Documents are plain JSON on our side; this module converts them to and
//! from Firestore's typed `Value` encoding. Authentication uses an OAuth2
//! access token supplied by the deployment.

use super::{DocumentStore, StoredDocument};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

#[derive(Clone)]
pub struct FirestoreStore {
    pub base_url: String,
    pub project_id: String,
    access_token: String,
    http_client: reqwest::Client,
}

impl FirestoreStore {
    pub fn new(base_url: String, project_id: String, access_token: String) -> Arc<Self> {
        Arc::new(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id,
            access_token,
            http_client: reqwest::Client::new(),
        })
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.base_url, self.project_id
        )
    }

    async fn check(resp: reqwest::Response, what: &str) -> Result<Value> {
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("Firestore {} failed: {} - {}", what, status, body);
        }
        resp.json()
            .await
            .with_context(|| format!("Failed to parse Firestore {what} response"))
    }
}

/// JSON value -> Firestore `Value`.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub fn encode_fields(map: &Map<String, Value>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

/// Firestore `Value` -> JSON value. Timestamps and references come back as strings.
pub fn decode_value(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = obj.iter().next() else {
        return Value::Null;
    };
    match kind.as_str() {
        "booleanValue" => inner.clone(),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| inner.clone()),
        "doubleValue" => inner.clone(),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|vs| vs.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => decode_fields(inner.get("fields").unwrap_or(&Value::Null)),
        _ => Value::Null,
    }
}

pub fn decode_fields(fields: &Value) -> Value {
    Value::Object(
        fields
            .as_object()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), decode_value(v))).collect())
            .unwrap_or_default(),
    )
}

fn quote_segment(segment: &str) -> String {
    let simple = segment
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false)
        && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        segment.to_string()
    } else {
        format!("`{}`", segment.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// Leaf field paths of `doc`, so a PATCH merges nested maps instead of
/// replacing them.
pub fn field_paths(doc: &Map<String, Value>) -> Vec<String> {
    let mut out = Vec::new();
    collect_paths(doc, "", &mut out);
    out
}

fn collect_paths(map: &Map<String, Value>, prefix: &str, out: &mut Vec<String>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            quote_segment(key)
        } else {
            format!("{prefix}.{}", quote_segment(key))
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => collect_paths(inner, &path, out),
            _ => out.push(path),
        }
    }
}

fn document_id(name: &str) -> String {
    name.rsplit('/').next().unwrap_or(name).to_string()
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn add(&self, collection: &str, doc: Value) -> Result<String> {
        let fields = doc
            .as_object()
            .ok_or_else(|| anyhow!("documents must be JSON objects"))?;
        let url = format!("{}/{}", self.documents_url(), collection);

        let resp = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "fields": encode_fields(fields) }))
            .send()
            .await
            .context("Failed to create Firestore document")?;

        let created = Self::check(resp, "create").await?;
        let name = created
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Firestore create response has no document name"))?;
        Ok(document_id(name))
    }

    async fn merge(&self, collection: &str, id: &str, doc: Value) -> Result<()> {
        let fields = doc
            .as_object()
            .ok_or_else(|| anyhow!("documents must be JSON objects"))?;
        let url = format!("{}/{}/{}", self.documents_url(), collection, id);
        let mask: Vec<(&str, String)> = field_paths(fields)
            .into_iter()
            .map(|p| ("updateMask.fieldPaths", p))
            .collect();

        let resp = self
            .http_client
            .patch(&url)
            .bearer_auth(&self.access_token)
            .query(&mask)
            .json(&json!({ "fields": encode_fields(fields) }))
            .send()
            .await
            .context("Failed to merge Firestore document")?;

        Self::check(resp, "merge").await?;
        Ok(())
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>> {
        let url = format!("{}:runQuery", self.documents_url());
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": quote_segment(field) },
                        "op": "EQUAL",
                        "value": encode_value(value),
                    }
                }
            }
        });

        let resp = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&query)
            .send()
            .await
            .context("Failed to query Firestore")?;

        let rows = Self::check(resp, "query").await?;
        Ok(rows
            .as_array()
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row.get("document"))
                    .map(|d| StoredDocument {
                        id: d
                            .get("name")
                            .and_then(Value::as_str)
                            .map(document_id)
                            .unwrap_or_default(),
                        data: decode_fields(d.get("fields").unwrap_or(&Value::Null)),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
