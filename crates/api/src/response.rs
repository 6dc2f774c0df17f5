use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

/// 管理端统一响应信封
///
/// 成功时code为200；失败时code为500，info携带人类可读的原因。
/// HTTP层始终返回200，调用方只看信封里的code。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply<T> {
    pub code: u16,
    pub info: String,
    pub data: Option<T>,
}

impl<T> Reply<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            info: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn fail(info: impl Into<String>) -> Self {
        Self {
            code: 500,
            info: info.into(),
            data: None,
        }
    }
}

impl Reply<()> {
    pub fn success_empty() -> Self {
        Self {
            code: 200,
            info: "success".to_string(),
            data: None,
        }
    }
}

impl<T> IntoResponse for Reply<T>
where
    T: Serialize,
{
    fn into_response(self) -> axum::response::Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
