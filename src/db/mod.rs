pub mod dbdocs;
pub mod memory;
pub mod store;

pub use dbdocs::PgDocumentStore;
pub use memory::MemoryDocumentStore;
pub use store::{DocumentStore, StoreError, StoredDocument};
