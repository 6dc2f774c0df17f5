use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("存储操作错误: {0}")]
    Storage(String),
    #[error("执行详情未找到: {key}")]
    ExecDetailNotFound { key: String },
    #[error("任务处理器未找到: {key}")]
    TaskHandlerNotFound { key: String },
    #[error("无效的CRON表达式: {expr} - {message}")]
    InvalidCron { expr: String, message: String },
    #[error("处理器解析失败: {0}")]
    HandlerNotFound(String),
    #[error("注册表已冻结，启动完成后不允许修改")]
    RegistryFrozen,
    #[error("任务提交被拒绝: {0}")]
    TaskRejected(String),
    #[error("任务执行错误: {0}")]
    TaskExecution(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

impl SchedulerError {
    pub fn storage_error<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }
    pub fn exec_detail_not_found<S: Into<String>>(key: S) -> Self {
        Self::ExecDetailNotFound { key: key.into() }
    }
    pub fn task_handler_not_found<S: Into<String>>(key: S) -> Self {
        Self::TaskHandlerNotFound { key: key.into() }
    }
    pub fn handler_not_found<S: Into<String>>(msg: S) -> Self {
        Self::HandlerNotFound(msg.into())
    }
    pub fn task_rejected<S: Into<String>>(msg: S) -> Self {
        Self::TaskRejected(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SchedulerError::ExecDetailNotFound { .. } | SchedulerError::TaskHandlerNotFound { .. }
        )
    }
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchedulerError::TaskRejected(_))
    }
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SchedulerError::Configuration(_) | SchedulerError::Internal(_)
        )
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for SchedulerError {
    fn from(err: anyhow::Error) -> Self {
        SchedulerError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(SchedulerError::exec_detail_not_found("k1").is_not_found());
        assert!(SchedulerError::task_handler_not_found("h1").is_not_found());
        assert!(!SchedulerError::task_rejected("pool full").is_not_found());
    }

    #[test]
    fn test_retryable_classification() {
        // 只有池拒绝是可重试的，其它错误直接落盘为终态
        assert!(SchedulerError::task_rejected("pool full").is_retryable());
        assert!(!SchedulerError::handler_not_found("bean missing").is_retryable());
        assert!(!SchedulerError::config_error("bad").is_retryable());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(SchedulerError::config_error("missing datasource").is_fatal());
        assert!(!SchedulerError::exec_detail_not_found("k1").is_fatal());
    }

    #[test]
    fn test_error_display_contains_key() {
        let err = SchedulerError::exec_detail_not_found("task-42");
        assert!(err.to_string().contains("task-42"));

        let err = SchedulerError::InvalidCron {
            expr: "bad expr".to_string(),
            message: "parse failure".to_string(),
        };
        assert!(err.to_string().contains("bad expr"));
    }
}
