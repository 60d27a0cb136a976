//! memory.rs
//!
//! In-memory `Store` implementation. This is the backend the property tests
//! and integration tests run against, and the default for local development
//! (`STORE_BACKEND=memory`). A single `RwLock` over the whole
//! table gives `transact_write` true all-or-nothing semantics without a real
//! transaction manager: the write lock is taken once, every predicate is
//! evaluated against the current map, and the batch only mutates if all of
//! them pass.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{Item, Predicate, Store, StoreError, WriteOp};

type Key = (String, String);

#[derive(Default)]
pub struct InMemoryStore {
    table: RwLock<BTreeMap<Key, Item>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply_set_remove(item: &mut Item, set: &Map<String, Value>, remove: &[String]) {
    for (k, v) in set {
        item.attrs.insert(k.clone(), v.clone());
    }
    for k in remove {
        item.attrs.remove(k);
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<Item>, StoreError> {
        let table = self.table.read().await;
        Ok(table.get(&(pk.to_string(), sk.to_string())).cloned())
    }

    async fn query(&self, pk: &str, sk_prefix: Option<&str>) -> Result<Vec<Item>, StoreError> {
        let table = self.table.read().await;
        Ok(table
            .values()
            .filter(|item| {
                item.pk == pk && sk_prefix.map(|p| item.sk.starts_with(p)).unwrap_or(true)
            })
            .cloned()
            .collect())
    }

    async fn scan_by_attr(&self, attr: &str, value: &str) -> Result<Vec<Item>, StoreError> {
        let table = self.table.read().await;
        Ok(table
            .values()
            .filter(|item| item.get_str(attr) == Some(value))
            .cloned()
            .collect())
    }

    async fn put(&self, item: Item) -> Result<(), StoreError> {
        let mut table = self.table.write().await;
        table.insert((item.pk.clone(), item.sk.clone()), item);
        Ok(())
    }

    async fn update_conditional(
        &self,
        pk: &str,
        sk: &str,
        set: Map<String, Value>,
        remove: Vec<String>,
        predicate: Predicate,
    ) -> Result<(), StoreError> {
        let mut table = self.table.write().await;
        let key = (pk.to_string(), sk.to_string());
        let current = table.get(&key).cloned();
        if !predicate.eval(current.as_ref()) {
            return Err(StoreError::PredicateFailed(pk.to_string(), sk.to_string()));
        }
        let mut item = current.unwrap_or_else(|| Item::new(pk, sk));
        apply_set_remove(&mut item, &set, &remove);
        table.insert(key, item);
        Ok(())
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut table = self.table.write().await;

        for op in &ops {
            let (pk, sk) = op.key();
            let current = table.get(&(pk.to_string(), sk.to_string()));
            let predicate = match op {
                WriteOp::Put { predicate, .. } => predicate,
                WriteOp::Update { predicate, .. } => predicate,
                WriteOp::Delete { predicate, .. } => predicate,
            };
            if !predicate.eval(current) {
                return Err(StoreError::TransactionCancelled(format!(
                    "predicate failed on ({pk}, {sk})"
                )));
            }
        }

        for op in ops {
            match op {
                WriteOp::Put { item, .. } => {
                    table.insert((item.pk.clone(), item.sk.clone()), item);
                }
                WriteOp::Update { pk, sk, set, remove, .. } => {
                    let key = (pk.clone(), sk.clone());
                    let mut item = table.get(&key).cloned().unwrap_or_else(|| Item::new(&pk, &sk));
                    apply_set_remove(&mut item, &set, &remove);
                    table.insert(key, item);
                }
                WriteOp::Delete { pk, sk, .. } => {
                    table.remove(&(pk, sk));
                }
            }
        }

        Ok(())
    }
}
