//! Record store boundary for the object catalog and interceptor actions.
//!
//! The store is the only durability boundary: the simulation holds no cache beyond one
//! refresh interval. `MemoryStore` backs the binary and the tests.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::{error::StoreError, threat::ThreatLevel};

/// A persisted entity. Identity and creation time are assigned by the store.
pub trait Record: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;

    fn assign_identity(&mut self, id: String, created_date: DateTime<Utc>);

    /// Severity used by `SortField::ThreatLevel`, records without one sort last.
    fn severity(&self) -> Option<ThreatLevel> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedDate,
    ThreatLevel,
}

/// List ordering in the `field` / `-field` form, a leading '-' meaning descending.
/// Ascending threat level puts the most severe records first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

impl SortKey {
    pub fn newest_first() -> Self {
        SortKey {
            field: SortField::CreatedDate,
            descending: true,
        }
    }

    pub fn most_severe_first() -> Self {
        SortKey {
            field: SortField::ThreatLevel,
            descending: false,
        }
    }
}

impl FromStr for SortKey {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let field = match name {
            "created_date" => SortField::CreatedDate,
            "threat_level" => SortField::ThreatLevel,
            _ => return Err(StoreError::InvalidSortKey(s.to_string())),
        };

        Ok(SortKey { field, descending })
    }
}

#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    async fn list(&self, sort: SortKey, limit: Option<usize>) -> Result<Vec<R>, StoreError>;

    async fn bulk_create(&self, records: Vec<R>) -> Result<Vec<R>, StoreError>;

    async fn create(&self, record: R) -> Result<R, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// In-process store keeping records in creation order.
pub struct MemoryStore<R> {
    records: RwLock<Vec<R>>,
}

impl<R: Record> MemoryStore<R> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    fn stamp(mut record: R) -> R {
        record.assign_identity(Uuid::new_v4().to_string(), Utc::now());
        record
    }
}

impl<R: Record> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for MemoryStore<R> {
    async fn list(&self, sort: SortKey, limit: Option<usize>) -> Result<Vec<R>, StoreError> {
        let mut records = self.records.read().clone();

        match sort.field {
            // Vec order is creation order
            SortField::CreatedDate => {}
            SortField::ThreatLevel => {
                records.sort_by_key(|r| r.severity().unwrap_or(ThreatLevel::None))
            }
        }
        if sort.descending {
            records.reverse();
        }
        if let Some(limit) = limit {
            records.truncate(limit);
        }

        Ok(records)
    }

    async fn bulk_create(&self, records: Vec<R>) -> Result<Vec<R>, StoreError> {
        let created: Vec<R> = records.into_iter().map(Self::stamp).collect();
        self.records.write().extend(created.iter().cloned());

        Ok(created)
    }

    async fn create(&self, record: R) -> Result<R, StoreError> {
        let created = Self::stamp(record);
        self.records.write().push(created.clone());

        Ok(created)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let index = records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        records.remove(index);

        Ok(())
    }
}
