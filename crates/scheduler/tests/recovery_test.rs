use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use easycron_domain::{ExecState, TaskStore};
use easycron_scheduler::{
    HandlerRegistry, JobFn, RecoveryService, RegisteredBean, RetryPolicy, Scheduler, WorkerPool,
};
use easycron_storage::MemoryTaskStore;
use easycron_testing_utils::{counting_job, notifying_job, ExecDetailBuilder, TaskHandlerBuilder};

const CLASS: &str = "demo::DemoJob";
const BEAN: &str = "demoJob";

fn registry_with(job: JobFn) -> Arc<HandlerRegistry> {
    let registry = HandlerRegistry::new();
    registry
        .register_bean(RegisteredBean::new(BEAN, CLASS).method("run", job))
        .unwrap();
    registry.freeze();
    Arc::new(registry)
}

fn build_scheduler(store: Arc<MemoryTaskStore>, registry: Arc<HandlerRegistry>) -> Arc<Scheduler> {
    Arc::new(Scheduler::new(
        store,
        registry,
        WorkerPool::new(8, 60),
        RetryPolicy::default(),
    ))
}

async fn seed_job(
    store: &MemoryTaskStore,
    exec_key: &str,
    handler_key: &str,
    class: &str,
    max: Option<i64>,
    state: ExecState,
) {
    let handler = TaskHandlerBuilder::new()
        .with_key(handler_key)
        .with_bean_name(BEAN)
        .with_bean_class_name(class)
        .with_method_name("run")
        .build();
    store.put_handler(&handler).await.unwrap();

    let mut builder = ExecDetailBuilder::new()
        .with_key(exec_key)
        .with_cron_expr("0/2 * * * * ?")
        .with_task_handler_key(handler_key)
        .with_state(state);
    if let Some(max) = max {
        builder = builder.with_max_exec_count(max);
    }
    store.put_exec(&builder.build()).await.unwrap();
}

async fn wait_until<F, Fut>(what: &str, mut cond: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..2000 {
        if cond().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("等待超时: {what}");
}

#[tokio::test(start_paused = true)]
async fn test_restart_recovery_continues_exec_count_without_duplication() {
    let store = Arc::new(MemoryTaskStore::new());

    // 第一次启动：触发3次后关停进程
    {
        let (job, _counter, mut fires) = notifying_job();
        let scheduler = build_scheduler(Arc::clone(&store), registry_with(job));
        seed_job(&store, "e1", "h1", CLASS, Some(10), ExecState::Init).await;

        scheduler.schedule_task("e1").await.unwrap();
        assert_eq!(fires.recv().await, Some(1));
        assert_eq!(fires.recv().await, Some(2));
        assert_eq!(fires.recv().await, Some(3));
        scheduler.shutdown().await;
    }

    // 崩溃等价路径：持久化状态停留在RUNNING，计数为3
    let exec = store.get_exec("e1").await.unwrap();
    assert_eq!(exec.state, ExecState::Running);
    assert_eq!(exec.exec_count, 3);

    // 第二次启动：恢复流程重新拉起任务，补满剩余7次
    let (job2, counter2) = counting_job();
    let registry2 = registry_with(job2);
    let scheduler2 = build_scheduler(Arc::clone(&store), Arc::clone(&registry2));
    let recovery = RecoveryService::new(
        Arc::clone(&store) as Arc<dyn TaskStore>,
        registry2,
        Arc::clone(&scheduler2),
    );

    let report = recovery.recover().await.unwrap();
    assert_eq!(report.resumed, 1);
    assert_eq!(report.scheduled, 0);
    assert!(report.failed.is_empty());
    assert_eq!(
        store.get_exec("e1").await.unwrap().state,
        ExecState::Running
    );

    wait_until("恢复后执行到次数上限并移除", || {
        let store = Arc::clone(&store);
        async move { store.get_exec("e1").await.is_err() }
    })
    .await;

    // 两轮合计恰好10次，重启没有重复计数
    assert_eq!(counter2.load(Ordering::SeqCst), 7);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(counter2.load(Ordering::SeqCst), 7);
}

#[tokio::test(start_paused = true)]
async fn test_recovery_marks_vanished_handler_as_error() {
    let store = Arc::new(MemoryTaskStore::new());
    let (job, _counter) = counting_job();
    let registry = registry_with(job);
    let scheduler = build_scheduler(Arc::clone(&store), Arc::clone(&registry));
    // 持久化的类名在当前进程里不存在
    seed_job(
        &store,
        "e1",
        "h1",
        "demo::VanishedJob",
        None,
        ExecState::Running,
    )
    .await;

    let recovery = RecoveryService::new(
        Arc::clone(&store) as Arc<dyn TaskStore>,
        registry,
        Arc::clone(&scheduler),
    );
    let report = recovery.recover().await.unwrap();

    assert_eq!(report.failed, vec!["e1".to_string()]);
    let exec = store.get_exec("e1").await.unwrap();
    assert_eq!(exec.state, ExecState::Error);
    assert!(exec.error_msg.unwrap().contains("demo::VanishedJob"));
    assert!(!scheduler.is_live("e1").await);
}

#[tokio::test(start_paused = true)]
async fn test_recovery_marks_missing_handler_record_as_error() {
    let store = Arc::new(MemoryTaskStore::new());
    let (job, _counter) = counting_job();
    let registry = registry_with(job);
    let scheduler = build_scheduler(Arc::clone(&store), Arc::clone(&registry));

    // 只有执行详情，处理器记录缺失（引用完整性被破坏）
    store
        .put_exec(
            &ExecDetailBuilder::new()
                .with_key("orphan")
                .with_task_handler_key("gone-handler")
                .with_state(ExecState::Running)
                .build(),
        )
        .await
        .unwrap();

    let recovery = RecoveryService::new(
        Arc::clone(&store) as Arc<dyn TaskStore>,
        registry,
        Arc::clone(&scheduler),
    );
    let report = recovery.recover().await.unwrap();

    assert_eq!(report.failed, vec!["orphan".to_string()]);
    let exec = store.get_exec("orphan").await.unwrap();
    assert_eq!(exec.state, ExecState::Error);
    assert!(exec.error_msg.unwrap().contains("gone-handler"));
}

#[tokio::test(start_paused = true)]
async fn test_recovery_dispatches_by_state_and_leaves_error_alone() {
    let store = Arc::new(MemoryTaskStore::new());
    let (job, _counter) = counting_job();
    let registry = registry_with(job);
    let scheduler = build_scheduler(Arc::clone(&store), Arc::clone(&registry));

    seed_job(&store, "init", "h1", CLASS, None, ExecState::Init).await;
    seed_job(&store, "paused", "h1", CLASS, None, ExecState::Paused).await;
    seed_job(&store, "blocked", "h1", CLASS, None, ExecState::Blocked).await;
    seed_job(&store, "errored", "h1", CLASS, None, ExecState::Init).await;
    store
        .update_state_to_error("errored", "历史错误")
        .await
        .unwrap();

    let recovery = RecoveryService::new(
        Arc::clone(&store) as Arc<dyn TaskStore>,
        registry,
        Arc::clone(&scheduler),
    );
    let report = recovery.recover().await.unwrap();

    assert_eq!(report.scheduled, 1);
    assert_eq!(report.resumed, 2);
    assert!(report.failed.is_empty());

    for key in ["init", "paused", "blocked"] {
        assert_eq!(
            store.get_exec(key).await.unwrap().state,
            ExecState::Running,
            "任务 {key} 应该已被拉起"
        );
        assert!(scheduler.is_live(key).await);
    }

    // ERROR记录原样保留
    let errored = store.get_exec("errored").await.unwrap();
    assert_eq!(errored.state, ExecState::Error);
    assert_eq!(errored.error_msg.as_deref(), Some("历史错误"));
    assert!(!scheduler.is_live("errored").await);
}

#[tokio::test(start_paused = true)]
async fn test_recovery_skips_exhausted_job_by_deleting_it() {
    let store = Arc::new(MemoryTaskStore::new());
    let (job, counter) = counting_job();
    let registry = registry_with(job);
    let scheduler = build_scheduler(Arc::clone(&store), Arc::clone(&registry));

    // 计数已达上限的RUNNING记录：恢复时直接删除，不再触发
    store
        .put_handler(
            &TaskHandlerBuilder::new()
                .with_key("h1")
                .with_bean_class_name(CLASS)
                .build(),
        )
        .await
        .unwrap();
    store
        .put_exec(
            &ExecDetailBuilder::new()
                .with_key("done")
                .with_task_handler_key("h1")
                .with_max_exec_count(5)
                .with_exec_count(5)
                .with_state(ExecState::Running)
                .build(),
        )
        .await
        .unwrap();

    let recovery = RecoveryService::new(
        Arc::clone(&store) as Arc<dyn TaskStore>,
        registry,
        Arc::clone(&scheduler),
    );
    recovery.recover().await.unwrap();

    assert!(store.get_exec("done").await.unwrap_err().is_not_found());
    assert!(!scheduler.is_live("done").await);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}
