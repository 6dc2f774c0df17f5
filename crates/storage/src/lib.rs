pub mod memory;
pub mod postgres;
pub mod sqlite;

pub use memory::MemoryTaskStore;
pub use postgres::PostgresTaskStore;
pub use sqlite::SqliteTaskStore;
