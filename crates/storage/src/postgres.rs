use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::debug;

use easycron_domain::{ExecDetail, ExecState, TaskHandler, TaskStore};
use easycron_errors::{SchedulerError, SchedulerResult};

/// PostgreSQL任务存储
///
/// 关系型持久化后端，对应配置里的 `storage_type = "postgres"`。
/// 表结构与SQLite后端一致：task_handler 与 exec_detail 两张表，
/// 状态列持久化为整数编码。
pub struct PostgresTaskStore {
    pool: PgPool,
}

impl PostgresTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 执行数据库迁移
    pub async fn run_migrations(pool: &PgPool) -> SchedulerResult<()> {
        debug!("执行PostgreSQL数据库迁移");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS task_handler (
                key VARCHAR(64) PRIMARY KEY,
                bean_name VARCHAR(255) NOT NULL,
                bean_class_name VARCHAR(255) NOT NULL,
                method_name VARCHAR(255) NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS exec_detail (
                key VARCHAR(64) PRIMARY KEY,
                "desc" VARCHAR(255) NOT NULL DEFAULT '',
                cron_expr VARCHAR(255) NOT NULL,
                task_handler_key VARCHAR(64) NOT NULL REFERENCES task_handler(key),
                init_time TIMESTAMPTZ NOT NULL,
                end_time TIMESTAMPTZ,
                last_exec_time TIMESTAMPTZ,
                exec_count BIGINT NOT NULL DEFAULT 0,
                max_exec_count BIGINT NOT NULL,
                state INT NOT NULL DEFAULT 0,
                error_msg TEXT
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_exec_detail_state ON exec_detail(state)")
            .execute(pool)
            .await?;

        debug!("PostgreSQL数据库迁移完成");
        Ok(())
    }

    fn row_to_handler(row: &sqlx::postgres::PgRow) -> SchedulerResult<TaskHandler> {
        Ok(TaskHandler {
            key: row.try_get("key")?,
            bean_name: row.try_get("bean_name")?,
            bean_class_name: row.try_get("bean_class_name")?,
            method_name: row.try_get("method_name")?,
        })
    }

    fn row_to_exec(row: &sqlx::postgres::PgRow) -> SchedulerResult<ExecDetail> {
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
impl TaskStore for PostgresTaskStore {
    async fn put_handler(&self, handler: &TaskHandler) -> SchedulerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO task_handler (key, bean_name, bean_class_name, method_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (key) DO UPDATE SET
                bean_name = EXCLUDED.bean_name,
                bean_class_name = EXCLUDED.bean_class_name,
                method_name = EXCLUDED.method_name
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
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (key) DO UPDATE SET
                "desc" = EXCLUDED."desc",
                cron_expr = EXCLUDED.cron_expr,
                task_handler_key = EXCLUDED.task_handler_key,
                end_time = EXCLUDED.end_time,
                last_exec_time = EXCLUDED.last_exec_time,
                exec_count = EXCLUDED.exec_count,
                max_exec_count = EXCLUDED.max_exec_count,
                state = EXCLUDED.state,
                error_msg = EXCLUDED.error_msg
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
        sqlx::query("DELETE FROM exec_detail WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_handler(&self, key: &str) -> SchedulerResult<TaskHandler> {
        let row = sqlx::query("SELECT * FROM task_handler WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| SchedulerError::task_handler_not_found(key))?;
        Self::row_to_handler(&row)
    }

    async fn get_exec(&self, key: &str) -> SchedulerResult<ExecDetail> {
        let row = sqlx::query("SELECT * FROM exec_detail WHERE key = $1")
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
                "desc" = $2,
                cron_expr = $3,
                task_handler_key = $4,
                end_time = $5,
                last_exec_time = $6,
                exec_count = $7,
                max_exec_count = $8,
                state = $9,
                error_msg = $10
            WHERE key = $1
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
        sqlx::query("UPDATE exec_detail SET state = $2 WHERE key = $1")
            .bind(key)
            .bind(state)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_state_to_error(&self, key: &str, error_msg: &str) -> SchedulerResult<()> {
        sqlx::query(
            "UPDATE exec_detail SET state = $2, error_msg = $3, end_time = $4 WHERE key = $1",
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
            SET exec_count = exec_count + 1, last_exec_time = $2
            WHERE key = $1
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
        let rows = sqlx::query("SELECT * FROM exec_detail WHERE state != $1")
            .bind(ExecState::Error)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_exec).collect()
    }
}
