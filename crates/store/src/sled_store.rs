use super::{deep_merge, generate_document_id, DocumentStore, StoredDocument};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sled::Db;
use std::path::Path;
use std::sync::Arc;

/// Embedded store: one sled tree per collection, JSON documents by id.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        let path = path.as_ref();
        let db = sled::open(path)
            .with_context(|| format!("Failed to open document store at {}", path.display()))?;
        Ok(Arc::new(Self { db }))
    }

    fn tree(&self, collection: &str) -> Result<sled::Tree> {
        Ok(self.db.open_tree(collection)?)
    }

    pub fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let tree = self.tree(collection)?;
        match tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn list(&self, collection: &str) -> Result<Vec<StoredDocument>> {
        let tree = self.tree(collection)?;
        let mut out = Vec::new();
        for item in tree.iter() {
            let (k, v) = item?;
            out.push(StoredDocument {
                id: String::from_utf8_lossy(&k).into_owned(),
                data: serde_json::from_slice(&v)?,
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl DocumentStore for SledStore {
    async fn add(&self, collection: &str, doc: Value) -> Result<String> {
        if !doc.is_object() {
            return Err(anyhow!("documents must be JSON objects"));
        }
        let tree = self.tree(collection)?;
        let id = generate_document_id();
        tree.insert(id.as_bytes(), serde_json::to_vec(&doc)?)?;
        tracing::debug!(collection, id = %id, "Document added");
        Ok(id)
    }

    async fn merge(&self, collection: &str, id: &str, doc: Value) -> Result<()> {
        if !doc.is_object() {
            return Err(anyhow!("documents must be JSON objects"));
        }
        let tree = self.tree(collection)?;
        let merged = match tree.get(id.as_bytes())? {
            Some(existing) => {
                let mut current: Value = serde_json::from_slice(&existing)?;
                deep_merge(&mut current, doc);
                current
            }
            None => doc,
        };
        tree.insert(id.as_bytes(), serde_json::to_vec(&merged)?)?;
        tracing::debug!(collection, id, "Document merged");
        Ok(())
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>> {
        Ok(self
            .list(collection)?
            .into_iter()
            .filter(|d| d.data.get(field) == Some(value))
            .collect())
    }
}
