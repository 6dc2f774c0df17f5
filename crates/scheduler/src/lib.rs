pub mod pool;
pub mod recovery;
pub mod registration;
pub mod registry;
pub mod retry;
pub mod runnable;
pub mod scheduler;
pub mod trigger;

pub use pool::WorkerPool;
pub use recovery::{RecoveryReport, RecoveryService};
pub use registration::{ExecSpec, JobDeclaration, RegistrationService};
pub use registry::{job_fn, HandlerRegistry, JobFn, RegisteredBean};
pub use retry::RetryPolicy;
pub use runnable::ScheduledRunnable;
pub use scheduler::Scheduler;
pub use trigger::CronTrigger;
