pub mod models;
pub mod store;

pub use models::{ExecDetail, ExecState, TaskHandler};
pub use store::TaskStore;
