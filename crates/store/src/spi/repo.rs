use crate::errors::StoreError;
use crate::model::Record;
use admission_core_types::RecordId;
use async_trait::async_trait;

/// Durable source of rules and mappings.
///
/// `list_enabled` is the only query the decision and rewrite engines depend on: it returns
/// enabled records sorted by priority descending, ties broken by id ascending.
#[async_trait]
pub trait Repository<E: Record>: Send + Sync {
    async fn list_enabled(&self) -> Result<Vec<E>, StoreError>;
    async fn list_all(&self) -> Result<Vec<E>, StoreError>;
    async fn get(&self, id: RecordId) -> Result<Option<E>, StoreError>;
    /// Inserts or replaces a record. A non-positive id asks the store to allocate one.
    async fn save(&self, entity: &E) -> Result<E, StoreError>;
    async fn delete(&self, id: RecordId) -> Result<(), StoreError>;
}
