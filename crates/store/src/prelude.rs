pub use crate::errors::StoreError;
#[cfg(feature = "file")]
pub use crate::file::{FileFormat, FileRepository, FileStore};
#[cfg(feature = "memory")]
pub use crate::memory::{InMemoryRepository, MemoryStore};
pub use crate::model::{Record, Row};
pub use crate::spi::repo::Repository;
