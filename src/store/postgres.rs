//! postgres.rs
//!
//! `Store` implementation backed by a single-table, key-partitioned schema:
//! one `items(pk, sk, attrs jsonb)` table, migrated with `sqlx::migrate!`.
//!
//! `transact_write` runs inside one `Transaction<'_, Postgres>`: every key
//! touched by the batch is first locked with `SELECT ... FOR UPDATE`,
//! predicates are evaluated in Rust against the locked snapshot (the same
//! `Predicate::eval` logic the in-memory backend uses), and only then are
//! the writes applied. A `Put` with a `NotExists` predicate has no existing
//! row to lock, so its uniqueness is instead enforced by the table's primary
//! key: a colliding insert surfaces as a Postgres unique-violation, which
//! this backend treats as a predicate failure.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::time::Duration;

use super::{Item, Predicate, Store, StoreError, WriteOp};

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str, pool_size: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(300))
            .connect(database_url)
            .await?;
        Ok(PostgresStore { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_item(pk: String, sk: String, attrs: serde_json::Value) -> Item {
        Item { pk, sk, attrs: attrs.as_object().cloned().unwrap_or_default() }
    }
}

fn backend_err(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e.as_database_error().and_then(|d| d.code()), Some(code) if code == "23505")
}

#[async_trait]
impl Store for PostgresStore {
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<Item>, StoreError> {
        let row = sqlx::query("SELECT pk, sk, attrs FROM items WHERE pk = $1 AND sk = $2")
            .bind(pk)
            .bind(sk)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(row.map(|r| Self::row_to_item(r.get("pk"), r.get("sk"), r.get("attrs"))))
    }

    async fn query(&self, pk: &str, sk_prefix: Option<&str>) -> Result<Vec<Item>, StoreError> {
        let rows = match sk_prefix {
            Some(prefix) => {
                sqlx::query("SELECT pk, sk, attrs FROM items WHERE pk = $1 AND sk LIKE $2")
                    .bind(pk)
                    .bind(format!("{prefix}%"))
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT pk, sk, attrs FROM items WHERE pk = $1")
                    .bind(pk)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(backend_err)?;

        Ok(rows
            .into_iter()
            .map(|r| Self::row_to_item(r.get("pk"), r.get("sk"), r.get("attrs")))
            .collect())
    }

    async fn scan_by_attr(&self, attr: &str, value: &str) -> Result<Vec<Item>, StoreError> {
        let rows = sqlx::query("SELECT pk, sk, attrs FROM items WHERE attrs ->> $1 = $2")
            .bind(attr)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(rows
            .into_iter()
            .map(|r| Self::row_to_item(r.get("pk"), r.get("sk"), r.get("attrs")))
            .collect())
    }

    async fn put(&self, item: Item) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO items (pk, sk, attrs) VALUES ($1, $2, $3)
             ON CONFLICT (pk, sk) DO UPDATE SET attrs = EXCLUDED.attrs",
        )
        .bind(&item.pk)
        .bind(&item.sk)
        .bind(Value::Object(item.attrs))
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
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
        let mut tx = self.pool.begin().await.map_err(backend_err)?;

        let row = sqlx::query("SELECT attrs FROM items WHERE pk = $1 AND sk = $2 FOR UPDATE")
            .bind(pk)
            .bind(sk)
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend_err)?;

        let current = row.map(|r| Self::row_to_item(pk.to_string(), sk.to_string(), r.get("attrs")));
        if !predicate.eval(current.as_ref()) {
            tx.rollback().await.ok();
            return Err(StoreError::PredicateFailed(pk.to_string(), sk.to_string()));
        }

        apply_update(&mut tx, pk, sk, &set, &remove).await?;
        tx.commit().await.map_err(backend_err)?;
        Ok(())
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend_err)?;

        for op in &ops {
            let (pk, sk) = op.key();
            let predicate = match op {
                WriteOp::Put { predicate, .. } => predicate,
                WriteOp::Update { predicate, .. } => predicate,
                WriteOp::Delete { predicate, .. } => predicate,
            };

            // A Put with no existing row to lock relies on the primary key
            // constraint instead (handled at insert time, below).
            if matches!(op, WriteOp::Put { .. }) && matches!(predicate, Predicate::NotExists | Predicate::None) {
                continue;
            }

            let row = sqlx::query("SELECT attrs FROM items WHERE pk = $1 AND sk = $2 FOR UPDATE")
                .bind(pk)
                .bind(sk)
                .fetch_optional(&mut *tx)
                .await
                .map_err(backend_err)?;
            let current = row.map(|r| Self::row_to_item(pk.to_string(), sk.to_string(), r.get("attrs")));

            if !predicate.eval(current.as_ref()) {
                tx.rollback().await.ok();
                return Err(StoreError::TransactionCancelled(format!(
                    "predicate failed on ({pk}, {sk})"
                )));
            }
        }

        for op in ops {
            match op {
                WriteOp::Put { item, .. } => {
                    let inserted = sqlx::query("INSERT INTO items (pk, sk, attrs) VALUES ($1, $2, $3)")
                        .bind(&item.pk)
                        .bind(&item.sk)
                        .bind(Value::Object(item.attrs))
                        .execute(&mut *tx)
                        .await;
                    if let Err(e) = inserted {
                        tx.rollback().await.ok();
                        if is_unique_violation(&e) {
                            return Err(StoreError::TransactionCancelled(format!(
                                "duplicate key ({}, {})",
                                item.pk, item.sk
                            )));
                        }
                        return Err(backend_err(e));
                    }
                }
                WriteOp::Update { pk, sk, set, remove, .. } => {
                    apply_update(&mut tx, &pk, &sk, &set, &remove).await?;
                }
                WriteOp::Delete { pk, sk, .. } => {
                    sqlx::query("DELETE FROM items WHERE pk = $1 AND sk = $2")
                        .bind(&pk)
                        .bind(&sk)
                        .execute(&mut *tx)
                        .await
                        .map_err(backend_err)?;
                }
            }
        }

        tx.commit().await.map_err(backend_err)?;
        Ok(())
    }
}

async fn apply_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    pk: &str,
    sk: &str,
    set: &Map<String, Value>,
    remove: &[String],
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO items (pk, sk, attrs) VALUES ($1, $2, '{}'::jsonb)
         ON CONFLICT (pk, sk) DO NOTHING",
    )
    .bind(pk)
    .bind(sk)
    .execute(&mut **tx)
    .await
    .map_err(backend_err)?;

    sqlx::query("UPDATE items SET attrs = (attrs - $3::text[]) || $4::jsonb WHERE pk = $1 AND sk = $2")
        .bind(pk)
        .bind(sk)
        .bind(remove)
        .bind(Value::Object(set.clone()))
        .execute(&mut **tx)
        .await
        .map_err(backend_err)?;

    Ok(())
}
