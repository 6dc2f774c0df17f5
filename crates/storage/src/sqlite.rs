use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use easycron_domain::{ExecDetail, ExecState, TaskHandler, TaskStore};
use easycron_errors::{SchedulerError, SchedulerResult};

/// SQLite任务存储
///
/// 嵌入式持久化后端；`new_embedded` 自动建库、开启外键与WAL模式并
/// 执行建表迁移。
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 创建嵌入式SQLite存储，自动初始化数据库
    pub async fn new_embedded(database_path: &str) -> SchedulerResult<Self> {
        use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
        use std::str::FromStr;

        debug!("创建嵌入式SQLite任务存储: {}", database_path);

        let connect_options = SqliteConnectOptions::from_str(database_path)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .connect_with(connect_options)
            .await?;

        Self::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// 执行数据库迁移
    pub async fn run_migrations(pool: &SqlitePool) -> SchedulerResult<()> {
        debug!("执行SQLite数据库迁移");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS task_handler (
                key TEXT PRIMARY KEY,
                bean_name TEXT NOT NULL,
                bean_class_name TEXT NOT NULL,
                method_name TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS exec_detail (
                key TEXT PRIMARY KEY,
                "desc" TEXT NOT NULL DEFAULT '',
                cron_expr TEXT NOT NULL,
                task_handler_key TEXT NOT NULL,
                init_time DATETIME NOT NULL,
                end_time DATETIME,
                last_exec_time DATETIME,
                exec_count INTEGER NOT NULL DEFAULT 0,
                max_exec_count INTEGER NOT NULL,
                state INTEGER NOT NULL DEFAULT 0,
                error_msg TEXT,
                FOREIGN KEY (task_handler_key) REFERENCES task_handler(key)
            )
            "#,
        )
        .execute(pool)
        .await?;

        let indexes = [
            "CREATE INDEX IF NOT EXISTS idx_exec_detail_state ON exec_detail(state)",
            "CREATE INDEX IF NOT EXISTS idx_exec_detail_handler ON exec_detail(task_handler_key)",
        ];
        for index_sql in indexes {
            sqlx::query(index_sql).execute(pool).await?;
        }

        debug!("SQLite数据库迁移完成");
        Ok(())
    }

    fn row_to_handler(row: &sqlx::sqlite::SqliteRow) -> SchedulerResult<TaskHandler> {
        Ok(TaskHandler {
            key: row.try_get("key")?,
            bean_name: row.try_get("bean_name")?,
            bean_class_name: row.try_get("bean_class_name")?,
            method_name: row.try_get("method_name")?,
        })
    }

    fn row_to_exec(row: &sqlx::sqlite::SqliteRow) -> SchedulerResult<ExecDetail> {
        Ok(ExecDetail {
            key: row.try_get("key")?,
            desc: row.try_get("desc")?,
            cron_expr: row.try_get("cron_expr")?,
            task_handler_key: row.try_get("task_handler_key")?,
            init_time: row.try_get("init_time")?,
            end_time: row.try_get("end_time")?,
            last_exec_time: row.try_get("last_exec_time")?,
            exec_count: row.try_get("exec_count")?,
            max_exec_count: row.try_get("max_exec_count")?,
            state: row.try_get("state")?,
            error_msg: row.try_get("error_msg")?,
        })
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn put_handler(&self, handler: &TaskHandler) -> SchedulerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO task_handler (key, bean_name, bean_class_name, method_name)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
                bean_name = excluded.bean_name,
                bean_class_name = excluded.bean_class_name,
                method_name = excluded.method_name
            "#,
        )
        .bind(&handler.key)
        .bind(&handler.bean_name)
        .bind(&handler.bean_class_name)
        .bind(&handler.method_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn put_exec(&self, exec: &ExecDetail) -> SchedulerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO exec_detail
                (key, "desc", cron_expr, task_handler_key, init_time, end_time,
                 last_exec_time, exec_count, max_exec_count, state, error_msg)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(key) DO UPDATE SET
                "desc" = excluded."desc",
                cron_expr = excluded.cron_expr,
                task_handler_key = excluded.task_handler_key,
                end_time = excluded.end_time,
                last_exec_time = excluded.last_exec_time,
                exec_count = excluded.exec_count,
                max_exec_count = excluded.max_exec_count,
                state = excluded.state,
                error_msg = excluded.error_msg
            "#,
        )
        .bind(&exec.key)
        .bind(&exec.desc)
        .bind(&exec.cron_expr)
        .bind(&exec.task_handler_key)
        .bind(exec.init_time)
        .bind(exec.end_time)
        .bind(exec.last_exec_time)
        .bind(exec.exec_count)
        .bind(exec.max_exec_count)
        .bind(exec.state)
        .bind(&exec.error_msg)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_exec(&self, key: &str) -> SchedulerResult<()> {
        sqlx::query("DELETE FROM exec_detail WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_handler(&self, key: &str) -> SchedulerResult<TaskHandler> {
        let row = sqlx::query("SELECT * FROM task_handler WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| SchedulerError::task_handler_not_found(key))?;
        Self::row_to_handler(&row)
    }

    async fn get_exec(&self, key: &str) -> SchedulerResult<ExecDetail> {
        let row = sqlx::query("SELECT * FROM exec_detail WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| SchedulerError::exec_detail_not_found(key))?;
        Self::row_to_exec(&row)
    }

    async fn list_handlers(&self) -> SchedulerResult<Vec<TaskHandler>> {
        let rows = sqlx::query("SELECT * FROM task_handler")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_handler).collect()
    }

    async fn list_execs(&self) -> SchedulerResult<Vec<ExecDetail>> {
        let rows = sqlx::query("SELECT * FROM exec_detail")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_exec).collect()
    }

    async fn update_exec(&self, exec: &ExecDetail) -> SchedulerResult<()> {
        sqlx::query(
            r#"
            UPDATE exec_detail SET
                "desc" = ?2,
                cron_expr = ?3,
                task_handler_key = ?4,
                end_time = ?5,
                last_exec_time = ?6,
                exec_count = ?7,
                max_exec_count = ?8,
                state = ?9,
                error_msg = ?10
            WHERE key = ?1
            "#,
        )
        .bind(&exec.key)
        .bind(&exec.desc)
        .bind(&exec.cron_expr)
        .bind(&exec.task_handler_key)
        .bind(exec.end_time)
        .bind(exec.last_exec_time)
        .bind(exec.exec_count)
        .bind(exec.max_exec_count)
        .bind(exec.state)
        .bind(&exec.error_msg)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_state(&self, key: &str, state: ExecState) -> SchedulerResult<()> {
        sqlx::query("UPDATE exec_detail SET state = ?2 WHERE key = ?1")
            .bind(key)
            .bind(state)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_state_to_error(&self, key: &str, error_msg: &str) -> SchedulerResult<()> {
        sqlx::query(
            "UPDATE exec_detail SET state = ?2, error_msg = ?3, end_time = ?4 WHERE key = ?1",
        )
        .bind(key)
        .bind(ExecState::Error)
        .bind(error_msg)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn increment_exec_count(
        &self,
        key: &str,
        last_exec_time: DateTime<Utc>,
    ) -> SchedulerResult<i64> {
        // 单条UPDATE保证计数对并发写者原子
        let row = sqlx::query(
            r#"
            UPDATE exec_detail
            SET exec_count = exec_count + 1, last_exec_time = ?2
            WHERE key = ?1
            RETURNING exec_count
            "#,
        )
        .bind(key)
        .bind(last_exec_time)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| SchedulerError::exec_detail_not_found(key))?;
        Ok(row.try_get("exec_count")?)
    }

    async fn recover(&self) -> SchedulerResult<Vec<ExecDetail>> {
        let rows = sqlx::query("SELECT * FROM exec_detail WHERE state != ?1")
            .bind(ExecState::Error)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_exec).collect()
    }
}
