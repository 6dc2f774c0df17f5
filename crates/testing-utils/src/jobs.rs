use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use anyhow::bail;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use easycron_scheduler::{job_fn, JobFn};

/// 计数任务：每次触发把计数器加一
pub fn counting_job() -> (JobFn, Arc<AtomicI64>) {
    let counter = Arc::new(AtomicI64::new(0));
    let inner = Arc::clone(&counter);
    let job = job_fn(move || {
        let inner = Arc::clone(&inner);
        async move {
            inner.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });
    (job, counter)
}

/// 计数并把每次触发的序号发到通道，便于测试按触发节奏推进
pub fn notifying_job() -> (JobFn, Arc<AtomicI64>, UnboundedReceiver<i64>) {
    let counter = Arc::new(AtomicI64::new(0));
    let (tx, rx) = unbounded_channel();
    let inner = Arc::clone(&counter);
    let job = job_fn(move || {
        let inner = Arc::clone(&inner);
        let tx = tx.clone();
        async move {
            let n = inner.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = tx.send(n);
            Ok(())
        }
    });
    (job, counter, rx)
}

/// 在第fail_on次触发时返回错误的任务
pub fn failing_job(fail_on: i64) -> (JobFn, Arc<AtomicI64>) {
    let counter = Arc::new(AtomicI64::new(0));
    let inner = Arc::clone(&counter);
    let job = job_fn(move || {
        let inner = Arc::clone(&inner);
        async move {
            let n = inner.fetch_add(1, Ordering::SeqCst) + 1;
            if n == fail_on {
                bail!("第{n}次执行故意失败");
            }
            Ok(())
        }
    });
    (job, counter)
}

/// 在第panic_on次触发时panic的任务
pub fn panicking_job(panic_on: i64) -> (JobFn, Arc<AtomicI64>) {
    let counter = Arc::new(AtomicI64::new(0));
    let inner = Arc::clone(&counter);
    let job = job_fn(move || {
        let inner = Arc::clone(&inner);
        async move {
            let n = inner.fetch_add(1, Ordering::SeqCst) + 1;
            if n == panic_on {
                panic!("第{n}次执行故意panic");
            }
            Ok(())
        }
    });
    (job, counter)
}
