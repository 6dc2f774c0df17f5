use async_trait::async_trait;
use chrono::{DateTime, Utc};
use easycron_errors::SchedulerResult;

use crate::models::{ExecDetail, ExecState, TaskHandler};

/// 任务存储服务接口
///
/// 调度器与持久层之间的唯一边界。实现必须允许并发调用；热路径上的
/// 定点更新（状态、计数）必须对单条记录原子生效。
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// 添加或覆盖任务处理器
    async fn put_handler(&self, handler: &TaskHandler) -> SchedulerResult<()>;

    /// 添加或覆盖执行详情
    async fn put_exec(&self, exec: &ExecDetail) -> SchedulerResult<()>;

    /// 删除执行详情；key不存在时视为成功（删除幂等）
    async fn delete_exec(&self, key: &str) -> SchedulerResult<()>;

    /// 根据key查询TaskHandler
    async fn get_handler(&self, key: &str) -> SchedulerResult<TaskHandler>;

    /// 根据key查询ExecDetail
    async fn get_exec(&self, key: &str) -> SchedulerResult<ExecDetail>;

    /// 获取所有任务处理器（只读快照）
    async fn list_handlers(&self) -> SchedulerResult<Vec<TaskHandler>>;

    /// 获取所有执行详情（只读快照）
    async fn list_execs(&self) -> SchedulerResult<Vec<ExecDetail>>;

    /// 整条记录更新
    async fn update_exec(&self, exec: &ExecDetail) -> SchedulerResult<()>;

    /// 更新任务状态；key不存在时不做任何事
    async fn update_state(&self, key: &str, state: ExecState) -> SchedulerResult<()>;

    /// 更新任务状态为ERROR并记录报错信息
    async fn update_state_to_error(&self, key: &str, error_msg: &str) -> SchedulerResult<()>;

    /// 原子地自增执行次数并记录本次触发时刻，返回自增后的计数
    async fn increment_exec_count(
        &self,
        key: &str,
        last_exec_time: DateTime<Utc>,
    ) -> SchedulerResult<i64>;

    /// 数据恢复：返回所有非终态的执行详情
    async fn recover(&self) -> SchedulerResult<Vec<ExecDetail>>;
}
