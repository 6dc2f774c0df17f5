use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::{error, info};

use crate::response::Reply;
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskKeyRequest {
    pub task_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskKeyQuery {
    pub task_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerKeyQuery {
    pub handler_key: String,
}

/// 查询所有任务
pub async fn list(State(state): State<AppState>) -> Response {
    info!("查询所有任务");
    match state.service.query_all_tasks().await {
        Ok(data) => Reply::success(data).into_response(),
        Err(e) => {
            error!("查询所有任务失败: {}", e);
            Reply::<()>::fail(e.to_string()).into_response()
        }
    }
}

/// 查询单个任务
pub async fn query(State(state): State<AppState>, Query(params): Query<TaskKeyQuery>) -> Response {
    info!("查询任务, task key: {}", params.task_key);
    match state.service.query_task(&params.task_key).await {
        Ok(data) => Reply::success(data).into_response(),
        Err(e) => {
            error!("查询任务失败, task key: {}: {}", params.task_key, e);
            Reply::<()>::fail(e.to_string()).into_response()
        }
    }
}

/// 取消任务（停止并删除）
pub async fn cancel(
    State(state): State<AppState>,
    Json(request): Json<TaskKeyRequest>,
) -> Response {
    info!("取消任务, task key: {}", request.task_key);
    match state.service.delete_task(&request.task_key).await {
        Ok(()) => Reply::success_empty().into_response(),
        Err(e) => {
            error!("取消任务失败, task key: {}: {}", request.task_key, e);
            Reply::<()>::fail(e.to_string()).into_response()
        }
    }
}

/// 暂停任务
pub async fn pause(State(state): State<AppState>, Json(request): Json<TaskKeyRequest>) -> Response {
    info!("暂停任务, task key: {}", request.task_key);
    match state.service.pause_task(&request.task_key).await {
        Ok(()) => Reply::success_empty().into_response(),
        Err(e) => {
            error!("暂停任务失败, task key: {}: {}", request.task_key, e);
            Reply::<()>::fail(e.to_string()).into_response()
        }
    }
}

/// 恢复任务
pub async fn resume(
    State(state): State<AppState>,
    Json(request): Json<TaskKeyRequest>,
) -> Response {
    info!("恢复任务, task key: {}", request.task_key);
    match state.service.resume_task(&request.task_key).await {
        Ok(()) => Reply::success_empty().into_response(),
        Err(e) => {
            error!("恢复任务失败, task key: {}: {}", request.task_key, e);
            Reply::<()>::fail(e.to_string()).into_response()
        }
    }
}

/// 调度任务
pub async fn schedule(
    State(state): State<AppState>,
    Json(request): Json<TaskKeyRequest>,
) -> Response {
    info!("调度任务, task key: {}", request.task_key);
    match state.service.schedule_task(&request.task_key).await {
        Ok(()) => Reply::success_empty().into_response(),
        Err(e) => {
            error!("调度任务失败, task key: {}: {}", request.task_key, e);
            Reply::<()>::fail(e.to_string()).into_response()
        }
    }
}

/// 删除任务
pub async fn delete(
    State(state): State<AppState>,
    Json(request): Json<TaskKeyRequest>,
) -> Response {
    info!("删除任务, task key: {}", request.task_key);
    match state.service.delete_task(&request.task_key).await {
        Ok(()) => Reply::success_empty().into_response(),
        Err(e) => {
            error!("删除任务失败, task key: {}: {}", request.task_key, e);
            Reply::<()>::fail(e.to_string()).into_response()
        }
    }
}

/// 查询任务处理器
pub async fn query_handler(
    State(state): State<AppState>,
    Query(params): Query<HandlerKeyQuery>,
) -> Response {
    info!("查询处理器, handler key: {}", params.handler_key);
    match state.service.query_handler(&params.handler_key).await {
        Ok(data) => Reply::success(data).into_response(),
        Err(e) => {
            error!("查询处理器失败, handler key: {}: {}", params.handler_key, e);
            Reply::<()>::fail(e.to_string()).into_response()
        }
    }
}

/// 查询任务报错信息
pub async fn query_error(
    State(state): State<AppState>,
    Query(params): Query<TaskKeyQuery>,
) -> Response {
    info!("查询任务报错信息, task key: {}", params.task_key);
    match state.service.query_error_msg(&params.task_key).await {
        Ok(data) => Reply::success(data).into_response(),
        Err(e) => {
            error!("查询任务报错信息失败, task key: {}: {}", params.task_key, e);
            Reply::<()>::fail(e.to_string()).into_response()
        }
    }
}
