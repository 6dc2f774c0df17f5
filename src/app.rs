use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use easycron_api::{create_routes, AppState, ScheduleService};
use easycron_domain::TaskStore;
use easycron_scheduler::{
    HandlerRegistry, JobDeclaration, RecoveryService, RegistrationService, RetryPolicy, Scheduler,
    WorkerPool,
};
use easycron_storage::{MemoryTaskStore, PostgresTaskStore, SqliteTaskStore};

use crate::config::{AppConfig, StorageType};
use crate::shutdown::ShutdownManager;

/// easycron应用
///
/// 引导顺序固定：冻结注册表 → 建立存储 → 注册声明的任务 → 恢复
/// 持久化任务 → 启动管理端接口。宿主在进程退出前调用shutdown。
pub struct EasyCronApplication {
    config: AppConfig,
    task_store: Arc<dyn TaskStore>,
    scheduler: Arc<Scheduler>,
    shutdown_manager: ShutdownManager,
    admin_handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for EasyCronApplication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EasyCronApplication").finish()
    }
}

impl EasyCronApplication {
    pub async fn start(
        config: AppConfig,
        registry: HandlerRegistry,
        declarations: Vec<JobDeclaration>,
    ) -> Result<Self> {
        config.validate()?;
        info!("easycron启动中");

        // 启动之后注册表不再接受修改
        registry.freeze();
        let handler_registry = Arc::new(registry);

        let task_store = build_task_store(&config).await?;

        RegistrationService::new(Arc::clone(&task_store))
            .register_all(&declarations)
            .await
            .context("任务注册失败")?;

        let scheduler = Arc::new(Scheduler::new(
            Arc::clone(&task_store),
            Arc::clone(&handler_registry),
            WorkerPool::new(config.pool_size, config.await_termination_seconds),
            RetryPolicy::default(),
        ));

        RecoveryService::new(
            Arc::clone(&task_store),
            Arc::clone(&handler_registry),
            Arc::clone(&scheduler),
        )
        .recover()
        .await
        .context("任务恢复失败")?;

        let shutdown_manager = ShutdownManager::new();
        let admin_handle = if config.admin.enabled {
            Some(
                spawn_admin_server(
                    &config,
                    Arc::clone(&scheduler),
                    Arc::clone(&task_store),
                    &shutdown_manager,
                )
                .await?,
            )
        } else {
            None
        };

        info!("easycron启动完成");
        Ok(Self {
            config,
            task_store,
            scheduler,
            shutdown_manager,
            admin_handle,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn scheduler(&self) -> Arc<Scheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn task_store(&self) -> Arc<dyn TaskStore> {
        Arc::clone(&self.task_store)
    }

    /// 关停应用：停掉管理端与所有活任务，持久化状态保持原样
    pub async fn shutdown(mut self) {
        info!("easycron关停中");
        self.shutdown_manager.shutdown().await;
        self.scheduler.shutdown().await;
        if let Some(handle) = self.admin_handle.take() {
            let _ = handle.await;
        }
        info!("easycron已退出");
    }
}

async fn build_task_store(config: &AppConfig) -> Result<Arc<dyn TaskStore>> {
    if !config.enable_storage {
        info!("持久化未启用，使用内存存储");
        return Ok(Arc::new(MemoryTaskStore::new()));
    }

    match config.storage_type {
        StorageType::Sqlite => {
            info!("使用SQLite存储: {}", config.data_source.url);
            let store = SqliteTaskStore::new_embedded(&config.data_source.url)
                .await
                .context("初始化SQLite存储失败")?;
            Ok(Arc::new(store))
        }
        StorageType::Postgres => {
            info!("使用PostgreSQL存储");
            let mut options = PgConnectOptions::from_str(&config.data_source.url)
                .context("解析PostgreSQL连接串失败")?;
            if !config.data_source.username.is_empty() {
                options = options.username(&config.data_source.username);
            }
            if !config.data_source.password.is_empty() {
                options = options.password(&config.data_source.password);
            }
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect_with(options)
                .await
                .context("连接PostgreSQL失败")?;
            PostgresTaskStore::run_migrations(&pool)
                .await
                .context("初始化PostgreSQL表结构失败")?;
            Ok(Arc::new(PostgresTaskStore::new(pool)))
        }
    }
}

async fn spawn_admin_server(
    config: &AppConfig,
    scheduler: Arc<Scheduler>,
    task_store: Arc<dyn TaskStore>,
    shutdown_manager: &ShutdownManager,
) -> Result<JoinHandle<()>> {
    let service = ScheduleService::new(scheduler, task_store);
    let router = create_routes(AppState {
        service: Arc::new(service),
    });

    let listener = TcpListener::bind(&config.admin.bind_address)
        .await
        .with_context(|| format!("管理端接口绑定 {} 失败", config.admin.bind_address))?;
    info!("管理端接口监听 {}", config.admin.bind_address);

    let mut shutdown_rx = shutdown_manager.subscribe().await;
    Ok(tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await;
        if let Err(e) = result {
            error!("管理端接口异常退出: {}", e);
        }
    }))
}
