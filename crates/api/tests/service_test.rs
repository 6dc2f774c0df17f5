use std::sync::Arc;

use easycron_api::{create_routes, AppState, ScheduleService};
use easycron_domain::{ExecState, TaskStore};
use easycron_scheduler::{
    HandlerRegistry, JobFn, RegisteredBean, RetryPolicy, Scheduler, WorkerPool,
};
use easycron_storage::MemoryTaskStore;
use easycron_testing_utils::{counting_job, ExecDetailBuilder, TaskHandlerBuilder};

const CLASS: &str = "demo::DemoJob";

fn registry_with(job: JobFn) -> Arc<HandlerRegistry> {
    let registry = HandlerRegistry::new();
    registry
        .register_bean(RegisteredBean::new("demoJob", CLASS).method("run", job))
        .unwrap();
    registry.freeze();
    Arc::new(registry)
}

async fn setup() -> (Arc<MemoryTaskStore>, Arc<Scheduler>, ScheduleService) {
    let store = Arc::new(MemoryTaskStore::new());
    let (job, _counter) = counting_job();
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&store) as Arc<dyn TaskStore>,
        registry_with(job),
        WorkerPool::new(8, 60),
        RetryPolicy::default(),
    ));
    let service = ScheduleService::new(
        Arc::clone(&scheduler),
        Arc::clone(&store) as Arc<dyn TaskStore>,
    );
    (store, scheduler, service)
}

async fn seed(store: &MemoryTaskStore, exec_key: &str) {
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
                .with_key(exec_key)
                .with_task_handler_key("h1")
                .with_max_exec_count(100)
                .build(),
        )
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_query_all_and_single_task() {
    let (store, _scheduler, service) = setup().await;
    seed(&store, "e1").await;
    seed(&store, "e2").await;

    let all = service.query_all_tasks().await.unwrap();
    assert_eq!(all.len(), 2);

    let one = service.query_task("e1").await.unwrap();
    assert_eq!(one.key, "e1");
    assert_eq!(one.state, ExecState::Init.value());
    assert_eq!(one.max_exec_count, Some(100));

    // 未知key原样上抛，由信封转换为失败响应
    assert!(service.query_task("missing").await.unwrap_err().is_not_found());
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_operations_route_through_scheduler() {
    let (store, scheduler, service) = setup().await;
    seed(&store, "e1").await;

    service.schedule_task("e1").await.unwrap();
    assert!(scheduler.is_live("e1").await);
    assert_eq!(
        store.get_exec("e1").await.unwrap().state,
        ExecState::Running
    );

    service.pause_task("e1").await.unwrap();
    assert!(!scheduler.is_live("e1").await);
    assert_eq!(store.get_exec("e1").await.unwrap().state, ExecState::Paused);

    service.resume_task("e1").await.unwrap();
    assert!(scheduler.is_live("e1").await);

    service.delete_task("e1").await.unwrap();
    assert!(!scheduler.is_live("e1").await);
    assert!(store.get_exec("e1").await.unwrap_err().is_not_found());
    // 删除幂等
    service.delete_task("e1").await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_query_handler_and_error_msg() {
    let (store, _scheduler, service) = setup().await;
    seed(&store, "e1").await;

    let handler = service.query_handler("h1").await.unwrap();
    assert_eq!(handler.bean_class_name, CLASS);
    assert!(service
        .query_handler("missing")
        .await
        .unwrap_err()
        .is_not_found());

    assert_eq!(service.query_error_msg("e1").await.unwrap(), None);
    store
        .update_state_to_error("e1", "执行失败: boom")
        .await
        .unwrap();
    assert_eq!(
        service.query_error_msg("e1").await.unwrap().as_deref(),
        Some("执行失败: boom")
    );
}

#[tokio::test(start_paused = true)]
async fn test_router_builds_with_state() {
    let (_store, scheduler, service) = setup().await;
    let state = AppState {
        service: Arc::new(service),
    };
    let _router = create_routes(state);
    drop(scheduler);
}
