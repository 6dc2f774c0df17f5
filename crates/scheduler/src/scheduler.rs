use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Notify, OwnedSemaphorePermit, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use easycron_domain::{ExecDetail, ExecState, TaskHandler, TaskStore};
use easycron_errors::{SchedulerError, SchedulerResult};

use crate::pool::WorkerPool;
use crate::registry::HandlerRegistry;
use crate::retry::RetryPolicy;
use crate::runnable::{FireOutcome, ScheduledRunnable};
use crate::trigger::CronTrigger;

/// 活的定时任务条目：停止标志与唤醒句柄成对出现
///
/// cancel只阻止后续触发，不打断正在执行的回调；在途的触发会在
/// 下一次预检时发现状态不再是RUNNING并自行退出。
struct LiveTask {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl LiveTask {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
enum StartMode {
    Schedule,
    Resume,
}

/// 定时任务调度器
///
/// 维护 key -> 活任务 的并发映射，负责任务的启动、暂停、恢复、删除
/// 与关停；持久化状态与活任务表的双向同步都经由这里。
pub struct Scheduler {
    task_store: Arc<dyn TaskStore>,
    handler_registry: Arc<HandlerRegistry>,
    pool: WorkerPool,
    retry_policy: RetryPolicy,
    live_tasks: Arc<RwLock<HashMap<String, LiveTask>>>,
}

impl Scheduler {
    pub fn new(
        task_store: Arc<dyn TaskStore>,
        handler_registry: Arc<HandlerRegistry>,
        pool: WorkerPool,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            task_store,
            handler_registry,
            pool,
            retry_policy,
            live_tasks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 创建并启动任务；只接受INIT状态，其余情况记录日志后忽略
    pub async fn schedule_task(&self, task_key: &str) -> SchedulerResult<()> {
        self.start_with_retry(task_key, StartMode::Schedule).await
    }

    /// 重启任务；接受PAUSED/BLOCKED/RUNNING状态
    ///
    /// RUNNING覆盖故障恢复场景：进程崩溃后数据库里的状态停留在
    /// RUNNING，重启时需要据此重新拉起任务。
    pub async fn resume_task(&self, task_key: &str) -> SchedulerResult<()> {
        self.start_with_retry(task_key, StartMode::Resume).await
    }

    /// 暂停任务
    pub async fn pause_task(&self, task_key: &str) -> SchedulerResult<()> {
        // 必须先摘掉活条目再落盘PAUSED，清理扫描以RUNNING状态判定活条目
        self.cancel_task(task_key).await;
        self.task_store
            .update_state(task_key, ExecState::Paused)
            .await?;
        info!("任务 {} 已暂停", task_key);
        Ok(())
    }

    /// 删除任务：停掉活条目并移除持久化记录；幂等
    pub async fn delete_task(&self, task_key: &str) -> SchedulerResult<()> {
        self.cancel_task(task_key).await;
        self.task_store.delete_exec(task_key).await?;
        info!("任务 {} 已删除", task_key);
        Ok(())
    }

    /// 取消活条目，不触碰持久化状态
    async fn cancel_task(&self, task_key: &str) {
        let removed = self.live_tasks.write().await.remove(task_key);
        if let Some(task) = removed {
            task.cancel();
        }
    }

    /// 指定任务当前是否有活的定时器
    pub async fn is_live(&self, task_key: &str) -> bool {
        self.live_tasks.read().await.contains_key(task_key)
    }

    pub async fn live_task_count(&self) -> usize {
        self.live_tasks.read().await.len()
    }

    /// 关停调度器
    ///
    /// 停掉所有活任务并在配置的时限内等待在途触发结束；持久化状态
    /// 保持RUNNING，下次启动由恢复流程继续执行。
    pub async fn shutdown(&self) {
        let tasks: Vec<(String, LiveTask)> = {
            let mut live = self.live_tasks.write().await;
            live.drain().collect()
        };
        if tasks.is_empty() {
            return;
        }

        info!("正在停止 {} 个运行中的任务", tasks.len());
        for (_, task) in &tasks {
            task.cancel();
        }

        let deadline = tokio::time::Instant::now() + self.pool.await_termination();
        for (key, task) in tasks {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if tokio::time::timeout(remaining, task.handle).await.is_err() {
                warn!("等待任务 {} 退出超时", key);
            }
        }
        info!("调度器已关停");
    }

    async fn start_with_retry(&self, task_key: &str, mode: StartMode) -> SchedulerResult<()> {
        for attempt in 1..=self.retry_policy.max_attempts {
            // 首次被拒后任务已落盘BLOCKED，后续重试必须走恢复语义
            let attempt_mode = if attempt == 1 { mode } else { StartMode::Resume };
            match self.try_start(task_key, attempt_mode).await {
                Ok(()) => return Ok(()),
                Err(SchedulerError::TaskRejected(msg)) => {
                    if attempt == self.retry_policy.max_attempts {
                        error!(
                            "任务 {} 提交被拒绝，重试 {} 次后放弃",
                            task_key, self.retry_policy.max_attempts
                        );
                        self.task_store
                            .update_state_to_error(
                                task_key,
                                &format!(
                                    "任务提交被拒绝，重试{}次后仍失败: {}",
                                    self.retry_policy.max_attempts, msg
                                ),
                            )
                            .await?;
                        return Ok(());
                    }
                    let delay = self.retry_policy.delay_for_attempt(attempt);
                    warn!(
                        "任务 {} 提交被拒绝，{:?} 后重试 ({}/{})",
                        task_key, delay, attempt, self.retry_policy.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn try_start(&self, task_key: &str, mode: StartMode) -> SchedulerResult<()> {
        self.clear_invalid_tasks().await;

        // 获取任务信息
        let exec = self.task_store.get_exec(task_key).await?;
        let handler = self.task_store.get_handler(&exec.task_handler_key).await?;

        if self.live_tasks.read().await.contains_key(task_key) {
            warn!("任务 {} 已在运行，忽略本次请求", task_key);
            return Ok(());
        }

        match mode {
            StartMode::Schedule => {
                if exec.state != ExecState::Init {
                    warn!(
                        "任务 {} 当前状态为 {}，不是INIT，无法调度",
                        task_key,
                        exec.state.description()
                    );
                    return Ok(());
                }
            }
            StartMode::Resume => {
                if !matches!(
                    exec.state,
                    ExecState::Paused | ExecState::Blocked | ExecState::Running
                ) {
                    warn!(
                        "任务 {} 当前状态为 {}，不是PAUSED/BLOCKED/RUNNING，无法恢复",
                        task_key,
                        exec.state.description()
                    );
                    return Ok(());
                }
            }
        }

        self.run_task(&handler, &exec).await
    }

    /// 清理活任务表中已失效的条目
    ///
    /// 先收集再删除：持久化状态不再是RUNNING（或记录已不存在）的条目
    /// 统一摘除，不在遍历中原地删除。
    async fn clear_invalid_tasks(&self) {
        let keys: Vec<String> = self.live_tasks.read().await.keys().cloned().collect();
        if keys.is_empty() {
            return;
        }

        let mut doomed = Vec::new();
        for key in keys {
            match self.task_store.get_exec(&key).await {
                Ok(exec) if exec.state == ExecState::Running => {}
                Ok(_) => doomed.push(key),
                Err(e) if e.is_not_found() => doomed.push(key),
                Err(e) => warn!("清理检查任务 {} 失败，跳过: {}", key, e),
            }
        }
        if doomed.is_empty() {
            return;
        }

        let mut live = self.live_tasks.write().await;
        for key in doomed {
            if let Some(task) = live.remove(&key) {
                if !task.is_cancelled() {
                    task.cancel();
                }
                debug!("已清理失效任务 {}", key);
            }
        }
    }

    /// 组装并启动任务
    async fn run_task(&self, handler: &TaskHandler, exec: &ExecDetail) -> SchedulerResult<()> {
        let task_key = exec.key.clone();

        // 执行次数已达上限的任务直接移除
        if exec.is_exhausted() {
            warn!("任务 {} 已达最大执行次数，不再启动", task_key);
            self.task_store.delete_exec(&task_key).await?;
            return Ok(());
        }

        // 解析可调用对象
        let job = match self.handler_registry.resolve(
            &handler.bean_class_name,
            &handler.bean_name,
            &handler.method_name,
        ) {
            Ok(job) => job,
            Err(e) => {
                error!("任务 {} 启动失败: {}", task_key, e);
                self.task_store
                    .update_state_to_error(&task_key, &e.to_string())
                    .await?;
                return Ok(());
            }
        };

        let trigger = CronTrigger::new(&exec.cron_expr)?;
        let runnable = ScheduledRunnable::new(
            task_key.clone(),
            job,
            Arc::clone(&self.task_store),
        );

        // 占用调度池许可；池满时落盘BLOCKED并抛出，交给重试策略
        let permit = match self.pool.try_acquire() {
            Ok(permit) => permit,
            Err(e) => {
                warn!("任务 {} 提交被拒绝，等待重试", task_key);
                self.task_store
                    .update_state(&task_key, ExecState::Blocked)
                    .await?;
                return Err(e);
            }
        };

        let cancelled = Arc::new(AtomicBool::new(false));
        let notify = Arc::new(Notify::new());
        let handle = tokio::spawn(fire_loop(
            trigger,
            runnable,
            Arc::clone(&cancelled),
            Arc::clone(&notify),
            Arc::clone(&self.live_tasks),
            task_key.clone(),
            permit,
        ));

        self.live_tasks.write().await.insert(
            task_key.clone(),
            LiveTask {
                cancelled,
                notify,
                handle,
            },
        );
        self.task_store
            .update_state(&task_key, ExecState::Running)
            .await?;
        info!("任务 {} 已启动", task_key);
        Ok(())
    }
}

/// 单个任务的触发循环
///
/// 同一任务的触发由本循环串行化：下一跳在上一次触发完成后才计算，
/// 因此回调超时会使后续触发相对完成时刻顺延，错过的触发点被丢弃。
async fn fire_loop(
    trigger: CronTrigger,
    runnable: ScheduledRunnable,
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
    live_tasks: Arc<RwLock<HashMap<String, LiveTask>>>,
    task_key: String,
    permit: OwnedSemaphorePermit,
) {
    // 许可在循环退出时归还
    let _permit = permit;

    loop {
        let now = Utc::now();
        let Some(next) = trigger.next_execution_time(now) else {
            info!("任务 {} 没有后续触发时间，停止调度", task_key);
            break;
        };
        let delay = (next - now).to_std().unwrap_or(Duration::ZERO);

        {
            // 先登记唤醒，再检查标志，保证取消不会丢失
            let notified = notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if cancelled.load(Ordering::SeqCst) {
                break;
            }
            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if cancelled.load(Ordering::SeqCst) {
            break;
        }

        if runnable.run().await == FireOutcome::Retire {
            break;
        }
    }

    // 自行退出时只清理属于自己的条目，避免误删后继任务
    let mut live = live_tasks.write().await;
    if let Some(entry) = live.get(&task_key) {
        if Arc::ptr_eq(&entry.cancelled, &cancelled) {
            live.remove(&task_key);
        }
    }
}
