use crate::errors::StoreError;
use crate::model::{decode_rows, enabled_in_order, Record, Row};
use crate::spi::repo::Repository;
use admission_core_types::{sort_by_priority, RecordId};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Tables keyed by name, each a list of rows.
type Document = BTreeMap<String, Vec<Row>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
            _ => FileFormat::Yaml,
        }
    }
}

/// A YAML or JSON document holding every table. Each read goes back to disk, so edits made
/// outside the process are picked up on the next cache refresh.
#[derive(Clone)]
pub struct FileStore {
    path: PathBuf,
    format: FileFormat,
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = FileFormat::from_path(&path);
        Self {
            path,
            format,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Document, StoreError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|err| {
            StoreError::unavailable(&format!("read {}: {err}", self.path.display()))
        })?;
        self.parse(&raw)
    }

    async fn read_or_empty(&self) -> Result<Document, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => self.parse(&raw),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Document::new()),
            Err(err) => Err(StoreError::unavailable(&format!(
                "read {}: {err}",
                self.path.display()
            ))),
        }
    }

    fn parse(&self, raw: &str) -> Result<Document, StoreError> {
        if raw.trim().is_empty() {
            return Ok(Document::new());
        }
        let doc = match self.format {
            FileFormat::Yaml => serde_yaml::from_str(raw).map_err(|err| err.to_string()),
            FileFormat::Json => serde_json::from_str(raw).map_err(|err| err.to_string()),
        };
        doc.map_err(|err| {
            StoreError::serialization(&format!("parse {}: {err}", self.path.display()))
        })
    }

    async fn write(&self, doc: &Document) -> Result<(), StoreError> {
        let body = match self.format {
            FileFormat::Yaml => serde_yaml::to_string(doc).map_err(|err| err.to_string()),
            FileFormat::Json => serde_json::to_string_pretty(doc).map_err(|err| err.to_string()),
        }
        .map_err(|err| StoreError::serialization(&err))?;

        let staging = self.path.with_extension("tmp");
        tokio::fs::write(&staging, body).await.map_err(|err| {
            StoreError::unavailable(&format!("write {}: {err}", staging.display()))
        })?;
        tokio::fs::rename(&staging, &self.path).await.map_err(|err| {
            StoreError::unavailable(&format!("replace {}: {err}", self.path.display()))
        })
    }
}

fn row_id(row: &Row) -> Option<RecordId> {
    row.get("id").and_then(serde_json::Value::as_i64)
}

#[derive(Clone)]
pub struct FileRepository<E: Record> {
    store: FileStore,
    _marker: PhantomData<E>,
}

impl<E: Record> FileRepository<E> {
    pub fn new(store: &FileStore) -> Self {
        Self {
            store: store.clone(),
            _marker: PhantomData,
        }
    }

    async fn rows(&self) -> Result<Vec<Row>, StoreError> {
        let mut doc = self.store.read().await?;
        Ok(doc.remove(E::TABLE).unwrap_or_default())
    }
}

#[async_trait]
impl<E: Record> Repository<E> for FileRepository<E> {
    async fn list_enabled(&self) -> Result<Vec<E>, StoreError> {
        let rows = self.rows().await?;
        Ok(enabled_in_order(decode_rows(rows.iter())))
    }

    async fn list_all(&self) -> Result<Vec<E>, StoreError> {
        let rows = self.rows().await?;
        let mut records: Vec<E> = decode_rows(rows.iter());
        sort_by_priority(&mut records);
        Ok(records)
    }

    async fn get(&self, id: RecordId) -> Result<Option<E>, StoreError> {
        let rows = self.rows().await?;
        rows.iter()
            .find(|row| row_id(row) == Some(id))
            .map(E::from_row)
            .transpose()
    }

    async fn save(&self, entity: &E) -> Result<E, StoreError> {
        entity.validate()?;
        let _guard = self.store.write_lock.lock().await;
        let mut doc = self.store.read_or_empty().await?;
        let rows = doc.entry(E::TABLE.to_string()).or_default();

        let mut record = entity.clone();
        if record.record_id() <= 0 {
            let next = rows.iter().filter_map(row_id).max().unwrap_or(0) + 1;
            record.assign_id(next);
        }
        record.touch(Utc::now());

        let id = record.record_id();
        let row = record.to_row();
        match rows.iter_mut().find(|existing| row_id(existing) == Some(id)) {
            Some(slot) => *slot = row,
            None => rows.push(row),
        }
        self.store.write(&doc).await?;
        tracing::debug!(table = E::TABLE, id, path = %self.store.path.display(), "record saved");
        Ok(record)
    }

    async fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        let _guard = self.store.write_lock.lock().await;
        let mut doc = self.store.read_or_empty().await?;
        let rows = doc.entry(E::TABLE.to_string()).or_default();
        let before = rows.len();
        rows.retain(|row| row_id(row) != Some(id));
        if rows.len() == before {
            return Err(StoreError::not_found(&format!("{} #{id} not found", E::TABLE)));
        }
        self.store.write(&doc).await
    }
}
