use chrono::{DateTime, Utc};
use easycron_errors::{SchedulerError, SchedulerResult};
use serde::{Deserialize, Serialize};

/// 执行详情实体
///
/// 记录一条调度线的执行信息；与 TaskHandler 实体关联：多对一。
/// 状态、计数和时间戳只由调度器修改，删除发生在执行次数达到上限
/// 或管理端显式删除时。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecDetail {
    pub key: String,
    pub desc: String,
    pub cron_expr: String,
    pub task_handler_key: String,
    /// 创建时刻，写入后不再变化
    pub init_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_exec_time: Option<DateTime<Utc>>,
    /// 已触发次数，单调不减
    pub exec_count: i64,
    /// 触发次数上限，`i64::MAX` 表示不限次
    pub max_exec_count: i64,
    pub state: ExecState,
    pub error_msg: Option<String>,
}

impl ExecDetail {
    pub fn new(
        key: impl Into<String>,
        desc: impl Into<String>,
        cron_expr: impl Into<String>,
        task_handler_key: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            desc: desc.into(),
            cron_expr: cron_expr.into(),
            task_handler_key: task_handler_key.into(),
            init_time: Utc::now(),
            end_time: None,
            last_exec_time: None,
            exec_count: 0,
            max_exec_count: i64::MAX,
            state: ExecState::Init,
            error_msg: None,
        }
    }

    pub fn with_max_exec_count(mut self, max_exec_count: i64) -> Self {
        self.max_exec_count = max_exec_count;
        self
    }

    /// 执行次数是否已达上限
    pub fn is_exhausted(&self) -> bool {
        self.exec_count >= self.max_exec_count
    }
}

/// 任务执行状态
///
/// 持久化为整数编码：INIT=0, RUNNING=1, PAUSED=2, BLOCKED=3, ERROR=4。
/// BLOCKED 与 PAUSED 的区别只在成因：BLOCKED 是线程池拒绝，PAUSED 是
/// 操作员暂停；ERROR 是终态，需要操作员介入。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ExecState {
    #[serde(rename = "INIT")]
    Init,
    #[serde(rename = "RUNNING")]
    Running,
    #[serde(rename = "PAUSED")]
    Paused,
    #[serde(rename = "BLOCKED")]
    Blocked,
    #[serde(rename = "ERROR")]
    Error,
}

impl ExecState {
    pub fn value(&self) -> i32 {
        match self {
            ExecState::Init => 0,
            ExecState::Running => 1,
            ExecState::Paused => 2,
            ExecState::Blocked => 3,
            ExecState::Error => 4,
        }
    }

    pub fn from_value(value: i32) -> SchedulerResult<Self> {
        match value {
            0 => Ok(ExecState::Init),
            1 => Ok(ExecState::Running),
            2 => Ok(ExecState::Paused),
            3 => Ok(ExecState::Blocked),
            4 => Ok(ExecState::Error),
            _ => Err(SchedulerError::storage_error(format!(
                "对象关系映射失败，未知的任务状态值：{value}"
            ))),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ExecState::Init => "Initialized",
            ExecState::Running => "Running",
            ExecState::Paused => "Paused",
            ExecState::Blocked => "Blocked",
            ExecState::Error => "Error",
        }
    }

    /// 终态记录不参与恢复
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecState::Error)
    }
}

impl sqlx::Type<sqlx::Postgres> for ExecState {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i32 as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl sqlx::Type<sqlx::Sqlite> for ExecState {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ExecState {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let v = <i32 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        ExecState::from_value(v).map_err(|e| e.to_string().into())
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for ExecState {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let v = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        ExecState::from_value(v as i32).map_err(|e| e.to_string().into())
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for ExecState {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <i32 as sqlx::Encode<sqlx::Postgres>>::encode(self.value(), buf)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for ExecState {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <i64 as sqlx::Encode<sqlx::Sqlite>>::encode(i64::from(self.value()), buf)
    }
}
