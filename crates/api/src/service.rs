use std::sync::Arc;

use easycron_domain::TaskStore;
use easycron_errors::SchedulerResult;
use easycron_scheduler::Scheduler;

use crate::dto::{ExecDetailDto, TaskHandlerDto};

/// 定时任务管理服务
///
/// 管理端的业务入口：查询走存储快照，生命周期操作一律路由到调度器，
/// 保证活任务表和持久化状态同步变化。
pub struct ScheduleService {
    scheduler: Arc<Scheduler>,
    task_store: Arc<dyn TaskStore>,
}

impl ScheduleService {
    pub fn new(scheduler: Arc<Scheduler>, task_store: Arc<dyn TaskStore>) -> Self {
        Self {
            scheduler,
            task_store,
        }
    }

    /// 查询所有任务信息
    pub async fn query_all_tasks(&self) -> SchedulerResult<Vec<ExecDetailDto>> {
        let execs = self.task_store.list_execs().await?;
        Ok(execs.iter().map(ExecDetailDto::from_exec).collect())
    }

    /// 查询单个任务信息
    pub async fn query_task(&self, task_key: &str) -> SchedulerResult<ExecDetailDto> {
        let exec = self.task_store.get_exec(task_key).await?;
        Ok(ExecDetailDto::from_exec(&exec))
    }

    /// 取消任务（停止并删除）
    pub async fn delete_task(&self, task_key: &str) -> SchedulerResult<()> {
        self.scheduler.delete_task(task_key).await
    }

    /// 暂停任务
    pub async fn pause_task(&self, task_key: &str) -> SchedulerResult<()> {
        self.scheduler.pause_task(task_key).await
    }

    /// 恢复任务
    pub async fn resume_task(&self, task_key: &str) -> SchedulerResult<()> {
        self.scheduler.resume_task(task_key).await
    }

    /// 调度任务
    pub async fn schedule_task(&self, task_key: &str) -> SchedulerResult<()> {
        self.scheduler.schedule_task(task_key).await
    }

    /// 查询任务处理器
    pub async fn query_handler(&self, handler_key: &str) -> SchedulerResult<TaskHandlerDto> {
        let handler = self.task_store.get_handler(handler_key).await?;
        Ok(TaskHandlerDto::from(&handler))
    }

    /// 查询任务报错信息
    pub async fn query_error_msg(&self, task_key: &str) -> SchedulerResult<Option<String>> {
        let exec = self.task_store.get_exec(task_key).await?;
        Ok(exec.error_msg)
    }
}
