use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{segments, DocumentStore, StoreError};

/// In-process document tree with Realtime Database semantics: null and empty
/// containers are never stored, and removing the last child of an object
/// removes the object.
pub struct MemoryStore {
    root: RwLock<Map<String, Value>>,
    available: AtomicBool,
    writes: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Map::new()),
            available: AtomicBool::new(true),
            writes: AtomicUsize::new(0),
        }
    }

    /// Simulate the backend going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of successful set/update/delete calls so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn ensure_available(&self, path: &str) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!("memory store offline ({})", path)))
        }
    }

    async fn write(&self, path: &str, doc: &Value) -> Result<(), StoreError> {
        self.ensure_available(path)?;
        let parts = segments(path);
        let (last, parents) = parts
            .split_last()
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;

        let mut root = self.root.write().await;
        match compact(doc.clone()) {
            Some(value) => {
                let mut node = &mut *root;
                for part in parents {
                    let entry = node
                        .entry(part.to_string())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if !entry.is_object() {
                        *entry = Value::Object(Map::new());
                    }
                    node = match entry {
                        Value::Object(map) => map,
                        _ => unreachable!("entry was just made an object"),
                    };
                }
                node.insert(last.to_string(), value);
            }
            None => remove_at(&mut root, &parts),
        }

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        self.ensure_available(path)?;
        let root = self.root.read().await;

        let mut parts = segments(path).into_iter();
        let first = match parts.next() {
            Some(first) => first,
            None if root.is_empty() => return Ok(None),
            None => return Ok(Some(Value::Object(root.clone()))),
        };

        let mut node = match root.get(first) {
            Some(node) => node,
            None => return Ok(None),
        };
        for part in parts {
            node = match node.get(part) {
                Some(child) => child,
                None => return Ok(None),
            };
        }
        Ok(Some(node.clone()))
    }

    async fn set(&self, path: &str, doc: &Value) -> Result<(), StoreError> {
        self.write(path, doc).await
    }

    async fn update(&self, path: &str, doc: &Value) -> Result<(), StoreError> {
        self.write(path, doc).await
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.write(path, &Value::Null).await
    }
}

/// Drop nulls and empty containers, the way the hosted store does on write
fn compact(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| compact(v).map(|v| (k, v)))
                .collect();
            (!map.is_empty()).then_some(Value::Object(map))
        }
        Value::Array(items) => {
            let items: Vec<Value> = items.into_iter().filter_map(compact).collect();
            (!items.is_empty()).then_some(Value::Array(items))
        }
        other => Some(other),
    }
}

/// Remove the node at `parts`, then prune parents left empty
fn remove_at(node: &mut Map<String, Value>, parts: &[&str]) {
    match parts {
        [] => {}
        [last] => {
            node.remove(*last);
        }
        [first, rest @ ..] => {
            let now_empty = match node.get_mut(*first) {
                Some(Value::Object(child)) => {
                    remove_at(child, rest);
                    child.is_empty()
                }
                _ => false,
            };
            if now_empty {
                node.remove(*first);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_get_nested() {
        let store = MemoryStore::new();
        store.set("grupos/chess", &json!({"name": "Chess"})).await.unwrap();

        let doc = store.get("grupos/chess").await.unwrap();
        assert_eq!(doc, Some(json!({"name": "Chess"})));

        let subtree = store.get("grupos").await.unwrap().unwrap();
        assert_eq!(subtree, json!({"chess": {"name": "Chess"}}));
        assert_eq!(store.get("grupos/go").await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_collections_are_not_stored() {
        let store = MemoryStore::new();
        store
            .set("grupos/chess", &json!({"name": "Chess", "events": [], "bio": null}))
            .await
            .unwrap();
        assert_eq!(store.get("grupos/chess").await.unwrap(), Some(json!({"name": "Chess"})));
    }

    #[tokio::test]
    async fn delete_prunes_empty_parents() {
        let store = MemoryStore::new();
        store.set("grupos/chess", &json!({"name": "Chess"})).await.unwrap();
        store.delete("grupos/chess").await.unwrap();

        assert_eq!(store.get("grupos").await.unwrap(), None);
        assert_eq!(store.get("").await.unwrap(), None);
        // absent path is a no-op
        store.delete("grupos/chess").await.unwrap();
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_available(false);
        assert!(matches!(
            store.get("grupos").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.set("grupos/a", &json!({"x": 1})).await.is_err());
        assert_eq!(store.writes(), 0);
    }
}
