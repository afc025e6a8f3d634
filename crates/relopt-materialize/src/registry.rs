//! # Materialization Registry
//!
//! Process-wide record of materialized views. A materialization is a named
//! SQL query whose result is stored in a table. Each record moves through
//! three states:
//!
//! ```text
//! Defined ──populate──▶ Valid ──table dropped / invalidate──▶ Invalidated
//!                         ▲                                        │
//!                         └───────────────populate─────────────────┘
//! ```
//!
//! Records are immutable. A state transition swaps in a new record under the
//! write lock, so a reader holding an `Arc<Materialization>` keeps a consistent
//! snapshot while another thread invalidates or re-validates the view.

use crate::star::first_star_match;
use parking_lot::RwLock;
use relopt_core::catalog::{Catalog, TableHandle};
use relopt_core::operator::TableRef;
use relopt_core::rel::RelNode;
use relopt_core::PlanError;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Opaque identifier handed out by [`MaterializationRegistry::define`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterializationKey(u64);

impl fmt::Display for MaterializationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mv#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MaterializeError {
    #[error("unknown materialization {0}")]
    UnknownMaterialization(MaterializationKey),

    #[error("materialization {key} could not be converted: {message}")]
    Conversion {
        key: MaterializationKey,
        message: String,
    },

    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Turns a materialization's SQL text into a logical tree. Parsing and
/// validation live outside the optimizer.
pub trait QueryConverter: Send + Sync {
    fn convert(&self, schema: &str, sql: &str) -> Result<RelNode, String>;
}

/// What populating a materialization established.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidMaterialization {
    /// The defining query as a logical tree.
    pub query: RelNode,
    pub table: TableHandle,
    /// Scan of the table holding the results.
    pub table_rel: RelNode,
    /// The defining query rewritten over the first star table it can use.
    pub star_rel: Option<RelNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MaterializationState {
    Defined,
    Valid(ValidMaterialization),
    Invalidated { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Materialization {
    pub key: MaterializationKey,
    pub schema: String,
    pub sql: String,
    pub table: TableRef,
    pub state: MaterializationState,
}

impl Materialization {
    pub fn valid(&self) -> Option<&ValidMaterialization> {
        match &self.state {
            MaterializationState::Valid(valid) => Some(valid),
            _ => None,
        }
    }

    fn with_state(&self, state: MaterializationState) -> Materialization {
        Materialization {
            state,
            ..self.clone()
        }
    }
}

#[derive(Default)]
pub struct MaterializationRegistry {
    records: RwLock<HashMap<MaterializationKey, Arc<Materialization>>>,
    next_key: AtomicU64,
}

impl MaterializationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a materialization in the `Defined` state.
    pub fn define(&self, schema: &str, sql: &str, table: TableRef) -> MaterializationKey {
        let key = MaterializationKey(self.next_key.fetch_add(1, Ordering::Relaxed));
        let record = Materialization {
            key,
            schema: schema.to_string(),
            sql: sql.to_string(),
            table,
            state: MaterializationState::Defined,
        };
        debug!("Defined materialization {} over {}", key, record.table);
        self.records.write().insert(key, Arc::new(record));
        key
    }

    pub fn get(&self, key: MaterializationKey) -> Option<Arc<Materialization>> {
        self.records.read().get(&key).cloned()
    }

    /// Converts the defining SQL, resolves the target table and records the
    /// first star table the query can use. On success the record becomes
    /// `Valid`; on failure it keeps its previous state.
    pub fn populate(
        &self,
        key: MaterializationKey,
        converter: &dyn QueryConverter,
        catalog: &dyn Catalog,
    ) -> Result<Arc<Materialization>, MaterializeError> {
        let record = self.get(key).ok_or(MaterializeError::UnknownMaterialization(key))?;
        let query = converter
            .convert(&record.schema, &record.sql)
            .map_err(|message| MaterializeError::Conversion { key, message })?;
        let resolved = catalog
            .resolve(&record.table)
            .ok_or_else(|| PlanError::UnresolvableReference {
                table: record.table.to_string(),
            })?;

        let matches_table = query
            .row_type()
            .is_some_and(|row_type| row_type.equivalent_to(&resolved.row_type));
        if !matches_table {
            return Err(MaterializeError::Conversion {
                key,
                message: format!("query does not produce the columns of {}", record.table),
            });
        }

        let star_rel = first_star_match(&query, &catalog.star_tables(&record.schema)).map(|(rel, _)| rel);
        let valid = ValidMaterialization {
            table_rel: RelNode::scan(record.table.clone(), resolved.row_type),
            table: resolved.handle,
            query,
            star_rel,
        };
        let populated = Arc::new(record.with_state(MaterializationState::Valid(valid)));
        self.records.write().insert(key, Arc::clone(&populated));
        info!("Materialization {} over {} is valid", key, record.table);
        Ok(populated)
    }

    /// The table handle of a valid materialization whose table still resolves
    /// to the handle recorded when it was populated. A valid record whose
    /// table is gone or was recreated is invalidated.
    pub fn check_valid(&self, key: MaterializationKey, catalog: &dyn Catalog) -> Option<TableHandle> {
        let record = self.get(key)?;
        let valid = record.valid()?;
        match catalog.resolve(&record.table) {
            Some(resolved) if resolved.handle == valid.table => Some(resolved.handle),
            _ => {
                self.invalidate(key, format!("table {} no longer resolves", record.table));
                None
            }
        }
    }

    /// Moves a record to `Invalidated`. Returns `false` if the key is unknown
    /// or the record was already invalidated.
    pub fn invalidate(&self, key: MaterializationKey, reason: impl Into<String>) -> bool {
        let mut records = self.records.write();
        let Some(record) = records.get(&key) else {
            return false;
        };
        if matches!(record.state, MaterializationState::Invalidated { .. }) {
            return false;
        }
        let reason = reason.into();
        debug!("Invalidating materialization {}: {}", key, reason);
        let invalidated = record.with_state(MaterializationState::Invalidated { reason });
        records.insert(key, Arc::new(invalidated));
        true
    }

    /// Invalidates every materialization defined in `schema`, as a schema
    /// change would. Returns how many records changed state.
    pub fn invalidate_schema(&self, schema: &str) -> usize {
        let keys: Vec<MaterializationKey> = self
            .records
            .read()
            .values()
            .filter(|m| m.schema == schema)
            .map(|m| m.key)
            .collect();
        keys.into_iter()
            .filter(|key| self.invalidate(*key, format!("schema {schema} changed")))
            .count()
    }

    /// Snapshot of the records currently `Valid`, ordered by key.
    pub fn valid_materializations(&self) -> Vec<Arc<Materialization>> {
        let mut valid: Vec<Arc<Materialization>> = self
            .records
            .read()
            .values()
            .filter(|m| m.valid().is_some())
            .cloned()
            .collect();
        valid.sort_by_key(|m| m.key);
        valid
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
