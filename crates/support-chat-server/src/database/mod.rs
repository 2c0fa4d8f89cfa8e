pub mod memory;
pub mod models;
pub mod pool;
pub mod repository;

pub use memory::InMemoryStore;
pub use models::*;
pub use pool::DbPool;
pub use repository::Repository;
