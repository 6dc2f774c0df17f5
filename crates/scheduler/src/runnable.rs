use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info};

use easycron_domain::{ExecState, TaskStore};

use crate::registry::JobFn;

/// 单次触发的结果：继续等待下一跳，还是退出调度循环
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    Continue,
    Retire,
}

/// 包装一次触发的执行体
///
/// 每次触发前重新读取持久化状态，防御与暂停/删除之间的竞争；
/// 用户回调的任何失败都被就地捕获并落盘为ERROR，绝不向调度循环
/// 之外传播。
pub struct ScheduledRunnable {
    task_key: String,
    job: JobFn,
    task_store: Arc<dyn TaskStore>,
}

impl ScheduledRunnable {
    pub fn new(task_key: String, job: JobFn, task_store: Arc<dyn TaskStore>) -> Self {
        Self {
            task_key,
            job,
            task_store,
        }
    }

    pub async fn run(&self) -> FireOutcome {
        let key = &self.task_key;

        // 1. 重新读取执行详情；记录不存在说明任务已被删除
        let exec = match self.task_store.get_exec(key).await {
            Ok(exec) => exec,
            Err(e) if e.is_not_found() => {
                info!("任务 {} 已被删除，停止调度", key);
                return FireOutcome::Retire;
            }
            Err(e) => {
                error!("任务 {} 触发前读取状态失败: {}", key, e);
                return FireOutcome::Retire;
            }
        };

        // 2. 非RUNNING状态说明在睡眠期间被暂停或出错
        if exec.state != ExecState::Running {
            debug!(
                "任务 {} 当前状态为 {}，停止调度",
                key,
                exec.state.description()
            );
            return FireOutcome::Retire;
        }

        // 3. 先落盘触发时刻与计数，再执行回调
        let new_count = match self.task_store.increment_exec_count(key, Utc::now()).await {
            Ok(count) => count,
            Err(e) if e.is_not_found() => {
                info!("任务 {} 已被删除，停止调度", key);
                return FireOutcome::Retire;
            }
            Err(e) => {
                error!("任务 {} 更新执行计数失败: {}", key, e);
                return FireOutcome::Retire;
            }
        };

        // 4. 在子任务中执行用户回调，panic被捕获为JoinError
        let job = Arc::clone(&self.job);
        let outcome = tokio::spawn(async move { job().await }).await;
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("{e:#}")),
            Err(join_err) => Some(describe_join_error(join_err)),
        };
        if let Some(msg) = failure {
            error!("任务 {} 第 {} 次执行失败: {}", key, new_count, msg);
            if let Err(e) = self
                .task_store
                .update_state_to_error(key, &format!("任务执行失败: {msg}"))
                .await
            {
                error!("任务 {} 落盘错误状态失败: {}", key, e);
            }
            return FireOutcome::Retire;
        }

        // 5. 达到执行次数上限后删除记录，任务生命周期结束
        if new_count >= exec.max_exec_count {
            info!(
                "任务 {} 已达最大执行次数 {}，删除任务",
                key, exec.max_exec_count
            );
            if let Err(e) = self.task_store.delete_exec(key).await {
                error!("任务 {} 删除失败: {}", key, e);
            }
            return FireOutcome::Retire;
        }

        FireOutcome::Continue
    }
}

fn describe_join_error(err: tokio::task::JoinError) -> String {
    if err.is_panic() {
        match err.into_panic().downcast::<String>() {
            Ok(msg) => format!("panic: {msg}"),
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(msg) => format!("panic: {msg}"),
                Err(_) => "panic: <非字符串panic信息>".to_string(),
            },
        }
    } else {
        "任务被运行时取消".to_string()
    }
}
