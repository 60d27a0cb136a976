//! mod.rs
//!
//! The persistence contract the rest of the core depends on: a single-table,
//! key-partitioned store exposing conditional writes and multi-item atomic
//! transactions. Everything above this layer (`seat_state`, `services::*`)
//! only ever talks to `dyn Store` — never to Postgres or an in-memory map
//! directly — so tests can substitute `InMemoryStore` for the real backend.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;

/// A single record: `(pk, sk)` plus its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub pk: String,
    pub sk: String,
    pub attrs: Map<String, Value>,
}

impl Item {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Item { pk: pk.into(), sk: sk.into(), attrs: Map::new() }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }
}

/// A condition checked against the *current* state of an item before a write
/// is allowed to apply. Mirrors the conditional-write vocabulary of a
/// DynamoDB-style `ConditionExpression`, narrowed to what this system needs.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// No condition; always passes.
    None,
    /// The item must exist.
    Exists,
    /// The item must not exist.
    NotExists,
    /// The item must exist and the named attribute must equal the given value.
    AttrEq(String, Value),
    /// Both sub-predicates must hold.
    And(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn eval(&self, current: Option<&Item>) -> bool {
        match self {
            Predicate::None => true,
            Predicate::Exists => current.is_some(),
            Predicate::NotExists => current.is_none(),
            Predicate::AttrEq(key, value) => {
                current.and_then(|i| i.attrs.get(key)).map(|v| v == value).unwrap_or(false)
            }
            Predicate::And(a, b) => a.eval(current) && b.eval(current),
        }
    }
}

/// One write inside a `transact_write` batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Put { item: Item, predicate: Predicate },
    Update { pk: String, sk: String, set: Map<String, Value>, remove: Vec<String>, predicate: Predicate },
    Delete { pk: String, sk: String, predicate: Predicate },
}

impl WriteOp {
    pub fn key(&self) -> (&str, &str) {
        match self {
            WriteOp::Put { item, .. } => (item.pk.as_str(), item.sk.as_str()),
            WriteOp::Update { pk, sk, .. } => (pk.as_str(), sk.as_str()),
            WriteOp::Delete { pk, sk, .. } => (pk.as_str(), sk.as_str()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("conditional check failed on ({0}, {1})")]
    PredicateFailed(String, String),
    #[error("transaction cancelled: {0}")]
    TransactionCancelled(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The persistence contract. Implementations must guarantee that
/// `transact_write` is all-or-nothing: either every predicate in the batch
/// holds and every write applies, or none do.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<Item>, StoreError>;

    /// All items sharing `pk`, optionally restricted to a `sk` prefix.
    async fn query(&self, pk: &str, sk_prefix: Option<&str>) -> Result<Vec<Item>, StoreError>;

    /// Cross-partition lookup by an arbitrary attribute equality. The
    /// contract only promises "eventually returns all matching items": a
    /// full scan over the backing store, filtered by attribute. Callers
    /// (`holding_id`/`booking_id` lookups) only ever use this for single-row
    /// reads, so `PostgresStore` backs it with an expression index on the
    /// attribute rather than a sequential scan.
    async fn scan_by_attr(&self, attr: &str, value: &str) -> Result<Vec<Item>, StoreError>;

    async fn put(&self, item: Item) -> Result<(), StoreError>;

    async fn update_conditional(
        &self,
        pk: &str,
        sk: &str,
        set: Map<String, Value>,
        remove: Vec<String>,
        predicate: Predicate,
    ) -> Result<(), StoreError>;

    /// Apply every op atomically. Either all predicates hold and all writes
    /// land, or the batch fails wholly with `TransactionCancelled` (or the
    /// op-specific `PredicateFailed` when exactly one op's predicate is the
    /// cause and the backend can tell).
    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;
}
