use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use easycron_domain::{ExecDetail, ExecState, TaskHandler};
use easycron_errors::{SchedulerError, SchedulerResult};

/// 内存任务存储
///
/// 用于 `enable_storage = false` 的临时部署和测试场景，进程退出即丢失。
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    handlers: Mutex<HashMap<String, TaskHandler>>,
    execs: Mutex<HashMap<String, ExecDetail>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl easycron_domain::TaskStore for MemoryTaskStore {
    async fn put_handler(&self, handler: &TaskHandler) -> SchedulerResult<()> {
        let mut handlers = self.handlers.lock().unwrap();
        handlers.insert(handler.key.clone(), handler.clone());
        Ok(())
    }

    async fn put_exec(&self, exec: &ExecDetail) -> SchedulerResult<()> {
        let mut execs = self.execs.lock().unwrap();
        execs.insert(exec.key.clone(), exec.clone());
        Ok(())
    }

    async fn delete_exec(&self, key: &str) -> SchedulerResult<()> {
        let mut execs = self.execs.lock().unwrap();
        execs.remove(key);
        Ok(())
    }

    async fn get_handler(&self, key: &str) -> SchedulerResult<TaskHandler> {
        let handlers = self.handlers.lock().unwrap();
        handlers
            .get(key)
            .cloned()
            .ok_or_else(|| SchedulerError::task_handler_not_found(key))
    }

    async fn get_exec(&self, key: &str) -> SchedulerResult<ExecDetail> {
        let execs = self.execs.lock().unwrap();
        execs
            .get(key)
            .cloned()
            .ok_or_else(|| SchedulerError::exec_detail_not_found(key))
    }

    async fn list_handlers(&self) -> SchedulerResult<Vec<TaskHandler>> {
        let handlers = self.handlers.lock().unwrap();
        Ok(handlers.values().cloned().collect())
    }

    async fn list_execs(&self) -> SchedulerResult<Vec<ExecDetail>> {
        let execs = self.execs.lock().unwrap();
        Ok(execs.values().cloned().collect())
    }

    async fn update_exec(&self, exec: &ExecDetail) -> SchedulerResult<()> {
        let mut execs = self.execs.lock().unwrap();
        execs.insert(exec.key.clone(), exec.clone());
        Ok(())
    }

    async fn update_state(&self, key: &str, state: ExecState) -> SchedulerResult<()> {
        let mut execs = self.execs.lock().unwrap();
        if let Some(exec) = execs.get_mut(key) {
            exec.state = state;
        }
        Ok(())
    }

    async fn update_state_to_error(&self, key: &str, error_msg: &str) -> SchedulerResult<()> {
        let mut execs = self.execs.lock().unwrap();
        if let Some(exec) = execs.get_mut(key) {
            exec.state = ExecState::Error;
            exec.error_msg = Some(error_msg.to_string());
            exec.end_time = Some(Utc::now());
        }
        Ok(())
    }

    async fn increment_exec_count(
        &self,
        key: &str,
        last_exec_time: DateTime<Utc>,
    ) -> SchedulerResult<i64> {
        let mut execs = self.execs.lock().unwrap();
        let exec = execs
            .get_mut(key)
            .ok_or_else(|| SchedulerError::exec_detail_not_found(key))?;
        exec.exec_count += 1;
        exec.last_exec_time = Some(last_exec_time);
        Ok(exec.exec_count)
    }

    async fn recover(&self) -> SchedulerResult<Vec<ExecDetail>> {
        let execs = self.execs.lock().unwrap();
        Ok(execs
            .values()
            .filter(|exec| !exec.state.is_terminal())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easycron_domain::TaskStore;

    fn sample_exec(key: &str) -> ExecDetail {
        ExecDetail::new(key, "内存存储测试", "0/2 * * * * ?", "h1").with_max_exec_count(5)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryTaskStore::new();
        let handler = TaskHandler::new("h1", "job", "demo::Job", "run");
        store.put_handler(&handler).await.unwrap();
        store.put_exec(&sample_exec("e1")).await.unwrap();

        assert_eq!(store.get_handler("h1").await.unwrap(), handler);
        assert_eq!(store.get_exec("e1").await.unwrap().key, "e1");
        assert!(store.get_exec("missing").await.unwrap_err().is_not_found());
        assert!(store
            .get_handler("missing")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryTaskStore::new();
        store.put_exec(&sample_exec("e1")).await.unwrap();

        store.delete_exec("e1").await.unwrap();
        assert!(store.get_exec("e1").await.is_err());
        // 第二次删除同样成功
        store.delete_exec("e1").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_state_on_missing_key_is_noop() {
        let store = MemoryTaskStore::new();
        store
            .update_state("missing", ExecState::Running)
            .await
            .unwrap();
        store
            .update_state_to_error("missing", "whatever")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_increment_exec_count() {
        let store = MemoryTaskStore::new();
        store.put_exec(&sample_exec("e1")).await.unwrap();

        let now = Utc::now();
        assert_eq!(store.increment_exec_count("e1", now).await.unwrap(), 1);
        assert_eq!(store.increment_exec_count("e1", now).await.unwrap(), 2);

        let exec = store.get_exec("e1").await.unwrap();
        assert_eq!(exec.exec_count, 2);
        assert_eq!(exec.last_exec_time, Some(now));

        assert!(store
            .increment_exec_count("missing", now)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_update_state_to_error_records_message() {
        let store = MemoryTaskStore::new();
        store.put_exec(&sample_exec("e1")).await.unwrap();

        store
            .update_state_to_error("e1", "执行失败: boom")
            .await
            .unwrap();
        let exec = store.get_exec("e1").await.unwrap();
        assert_eq!(exec.state, ExecState::Error);
        assert_eq!(exec.error_msg.as_deref(), Some("执行失败: boom"));
        assert!(exec.end_time.is_some());
    }

    #[tokio::test]
    async fn test_recover_skips_terminal_records() {
        let store = MemoryTaskStore::new();
        store.put_exec(&sample_exec("e1")).await.unwrap();
        store.put_exec(&sample_exec("e2")).await.unwrap();
        store.update_state("e1", ExecState::Running).await.unwrap();
        store.update_state_to_error("e2", "boom").await.unwrap();

        let recovered = store.recover().await.unwrap();
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0].key, "e1");
    }
}
