use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use easycron_errors::{SchedulerError, SchedulerResult};

pub const DEFAULT_POOL_SIZE: usize = 8;
pub const DEFAULT_AWAIT_TERMINATION_SECONDS: u64 = 60;

/// 调度工作池
///
/// 每个活的定时任务占用一个许可，许可在任务退出时归还。许可耗尽时
/// 提交被拒绝，对应线程池的TaskRejected语义，由上层重试策略处理。
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    pool_size: usize,
    await_termination: Duration,
}

impl WorkerPool {
    pub fn new(pool_size: usize, await_termination_seconds: u64) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(pool_size)),
            pool_size,
            await_termination: Duration::from_secs(await_termination_seconds),
        }
    }

    pub fn try_acquire(&self) -> SchedulerResult<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore).try_acquire_owned().map_err(|_| {
            SchedulerError::task_rejected(format!("调度池已满（容量 {}）", self.pool_size))
        })
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// 关闭时等待在途触发结束的时间上限
    pub fn await_termination(&self) -> Duration {
        self.await_termination
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE, DEFAULT_AWAIT_TERMINATION_SECONDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pool() {
        let pool = WorkerPool::default();
        assert_eq!(pool.pool_size(), 8);
        assert_eq!(pool.available(), 8);
        assert_eq!(pool.await_termination(), Duration::from_secs(60));
    }

    #[test]
    fn test_acquire_until_rejected() {
        let pool = WorkerPool::new(2, 60);
        let p1 = pool.try_acquire().unwrap();
        let _p2 = pool.try_acquire().unwrap();
        assert_eq!(pool.available(), 0);

        let err = pool.try_acquire().unwrap_err();
        assert!(err.is_retryable());

        // 归还许可后可以再次获取
        drop(p1);
        assert!(pool.try_acquire().is_ok());
    }
}
