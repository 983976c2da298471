use super::datastore::MemoryStore;
use crate::errors::StoreError;
use crate::model::{decode_rows, enabled_in_order, Record};
use crate::spi::repo::Repository;
use admission_core_types::{sort_by_priority, RecordId};
use async_trait::async_trait;
use chrono::Utc;
use std::marker::PhantomData;

#[derive(Clone)]
pub struct InMemoryRepository<E: Record> {
    store: MemoryStore,
    _marker: PhantomData<E>,
}

impl<E: Record> InMemoryRepository<E> {
    pub fn new(store: &MemoryStore) -> Self {
        Self {
            store: store.clone(),
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<E: Record> Repository<E> for InMemoryRepository<E> {
    async fn list_enabled(&self) -> Result<Vec<E>, StoreError> {
        let rows = self.store.list(E::TABLE);
        Ok(enabled_in_order(decode_rows(rows.iter())))
    }

    async fn list_all(&self) -> Result<Vec<E>, StoreError> {
        let rows = self.store.list(E::TABLE);
        let mut records: Vec<E> = decode_rows(rows.iter());
        sort_by_priority(&mut records);
        Ok(records)
    }

    async fn get(&self, id: RecordId) -> Result<Option<E>, StoreError> {
        self.store
            .fetch(E::TABLE, id)
            .map(|row| E::from_row(&row))
            .transpose()
    }

    async fn save(&self, entity: &E) -> Result<E, StoreError> {
        entity.validate()?;
        let mut record = entity.clone();
        if record.record_id() <= 0 {
            record.assign_id(self.store.allocate_id(E::TABLE));
        }
        record.touch(Utc::now());
        self.store
            .store(E::TABLE, record.record_id(), record.to_row());
        Ok(record)
    }

    async fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        self.store
            .remove(E::TABLE, id)
            .ok_or_else(|| StoreError::not_found(&format!("{} #{id} not found", E::TABLE)))?;
        Ok(())
    }
}
