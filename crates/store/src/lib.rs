pub mod errors;
#[cfg(feature = "file")]
pub mod file;
#[cfg(feature = "memory")]
pub mod memory;
pub mod model;
pub mod prelude;
pub mod spi;

pub use errors::StoreError;
pub use model::{Record, Row};
pub use spi::*;
