pub mod audit;
pub mod firestore;
pub mod sled_store;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Collection names used by the checkout flows.
pub mod collections {
    pub const PURCHASES: &str = "compras";
    pub const RECOVERY_PURCHASES: &str = "compras_recuperacao";
    pub const USERS: &str = "usuarios";
    pub const FAILED_TRANSACTIONS: &str = "transacoes_falhadas";
    pub const SMS_LOGS: &str = "sms_logs";
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Value,
}

/// Schemaless document database, modelled on a Firestore subset.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a document under a generated id and returns the id.
    async fn add(&self, collection: &str, doc: Value) -> Result<String>;

    /// Creates the document if missing, otherwise deep-merges `doc` into it.
    async fn merge(&self, collection: &str, id: &str, doc: Value) -> Result<()>;

    /// Documents whose top-level `field` equals `value`.
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>>;
}

/// Recursive object merge: nested objects combine, anything else replaces.
pub fn deep_merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

pub(crate) fn generate_document_id() -> String {
    use rand::{distributions::Alphanumeric, Rng};
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}
