pub mod dto;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod service;

pub use dto::{ExecDetailDto, TaskHandlerDto};
pub use response::Reply;
pub use routes::{create_routes, AppState};
pub use service::ScheduleService;
