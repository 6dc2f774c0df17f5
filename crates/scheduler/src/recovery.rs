use std::sync::Arc;

use tracing::{error, info, warn};

use easycron_domain::{ExecState, TaskStore};
use easycron_errors::SchedulerResult;

use crate::registry::HandlerRegistry;
use crate::scheduler::Scheduler;

/// 恢复结果汇总
#[derive(Debug, Clone, Default)]
pub struct RecoveryReport {
    /// 重新拉起的任务数（RUNNING/PAUSED/BLOCKED）
    pub resumed: usize,
    /// 首次调度的任务数（INIT）
    pub scheduled: usize,
    /// 恢复失败（含处理器缺失）的任务key
    pub failed: Vec<String>,
}

/// 启动恢复服务
///
/// 启动依赖就绪（注册表冻结、存储可用）后执行一次：读取所有非终态
/// 记录并重建活任务表。处理器无法解析的记录落盘为ERROR；单条记录的
/// 失败只记日志，不中断整体恢复。
pub struct RecoveryService {
    task_store: Arc<dyn TaskStore>,
    handler_registry: Arc<HandlerRegistry>,
    scheduler: Arc<Scheduler>,
}

impl RecoveryService {
    pub fn new(
        task_store: Arc<dyn TaskStore>,
        handler_registry: Arc<HandlerRegistry>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        Self {
            task_store,
            handler_registry,
            scheduler,
        }
    }

    pub async fn recover(&self) -> SchedulerResult<RecoveryReport> {
        info!("开始恢复持久化的任务");
        let execs = self.task_store.recover().await?;
        let mut report = RecoveryReport::default();

        for exec in execs {
            // 校验处理器仍可解析，否则该记录进入ERROR终态
            let handler = match self.task_store.get_handler(&exec.task_handler_key).await {
                Ok(handler) => handler,
                Err(e) if e.is_not_found() => {
                    warn!(
                        "任务 {} 的处理器 {} 不存在，标记为ERROR",
                        exec.key, exec.task_handler_key
                    );
                    self.task_store
                        .update_state_to_error(
                            &exec.key,
                            &format!("恢复失败，任务处理器 {} 不存在", exec.task_handler_key),
                        )
                        .await?;
                    report.failed.push(exec.key);
                    continue;
                }
                Err(e) => return Err(e),
            };
            if let Err(e) = self.handler_registry.resolve(
                &handler.bean_class_name,
                &handler.bean_name,
                &handler.method_name,
            ) {
                warn!("任务 {} 的处理器无法解析: {}", exec.key, e);
                self.task_store
                    .update_state_to_error(&exec.key, &e.to_string())
                    .await?;
                report.failed.push(exec.key);
                continue;
            }

            let result = match exec.state {
                // 新注册的任务由这里完成首次调度
                ExecState::Init => {
                    self.scheduler
                        .schedule_task(&exec.key)
                        .await
                        .map(|_| report.scheduled += 1)
                }
                ExecState::Running | ExecState::Paused | ExecState::Blocked => {
                    self.scheduler
                        .resume_task(&exec.key)
                        .await
                        .map(|_| report.resumed += 1)
                }
                // recover()不返回终态记录，防御性跳过
                ExecState::Error => continue,
            };
            if let Err(e) = result {
                error!("恢复任务 {} 失败: {}", exec.key, e);
                report.failed.push(exec.key);
            }
        }

        info!(
            "任务恢复完成：首次调度 {} 个，重新拉起 {} 个，失败 {} 个",
            report.scheduled,
            report.resumed,
            report.failed.len()
        );
        Ok(report)
    }
}
