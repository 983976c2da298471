pub mod datastore;
pub mod repo;

pub use datastore::MemoryStore;
pub use repo::InMemoryRepository;
