mod exec_detail;
mod task_handler;

pub use exec_detail::{ExecDetail, ExecState};
pub use task_handler::TaskHandler;
