//! easycron：基于cron表达式的定时任务调度中间件
//!
//! 宿主应用注册无参的可调用对象并声明执行计划（cron表达式、描述、
//! 次数上限），中间件负责调度、暂停、恢复、取消，并把任务状态持久化
//! 到存储，跨进程重启恢复执行进度；管理端HTTP接口提供查询与生命周期
//! 控制。
//!
//! ```no_run
//! use easycron::{AppConfig, EasyCronApplication};
//! use easycron::{job_fn, ExecSpec, HandlerRegistry, JobDeclaration, RegisteredBean};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     easycron::init_tracing();
//!
//!     let registry = HandlerRegistry::new();
//!     registry.register_bean(
//!         RegisteredBean::new("demoJob", "demo::DemoJob").method(
//!             "run",
//!             job_fn(|| async {
//!                 println!("定时任务执行");
//!                 Ok(())
//!             }),
//!         ),
//!     )?;
//!
//!     let declaration = JobDeclaration::new("demoJob", "demo::DemoJob", "run")
//!         .with_spec(ExecSpec::new("0/4 * * * * ?").with_desc("每4秒执行一次"));
//!
//!     let app =
//!         EasyCronApplication::start(AppConfig::default(), registry, vec![declaration]).await?;
//!     tokio::signal::ctrl_c().await?;
//!     app.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod config;
pub mod shutdown;

pub use app::EasyCronApplication;
pub use config::{AdminConfig, AppConfig, DataSourceConfig, StorageType};
pub use shutdown::ShutdownManager;

pub use easycron_api::{ExecDetailDto, Reply, ScheduleService, TaskHandlerDto};
pub use easycron_domain::{ExecDetail, ExecState, TaskHandler, TaskStore};
pub use easycron_errors::{SchedulerError, SchedulerResult};
pub use easycron_scheduler::{
    job_fn, CronTrigger, ExecSpec, HandlerRegistry, JobDeclaration, JobFn, RecoveryReport,
    RecoveryService, RegisteredBean, RegistrationService, RetryPolicy, Scheduler, WorkerPool,
};
pub use easycron_storage::{MemoryTaskStore, PostgresTaskStore, SqliteTaskStore};

/// 初始化tracing订阅器；日志级别由RUST_LOG控制，默认info
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
