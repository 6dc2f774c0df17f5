use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use easycron_domain::{ExecDetail, TaskHandler};
use easycron_scheduler::CronTrigger;

/// 执行详情投影
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecDetailDto {
    pub key: String,
    pub desc: String,
    pub cron_expr: String,
    pub task_handler_key: String,
    pub init_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_exec_time: Option<DateTime<Utc>>,
    pub exec_count: i64,
    /// 不限次时为空
    pub max_exec_count: Option<i64>,
    pub state: i32,
    pub state_desc: String,
    pub error_msg: Option<String>,
    /// 按cron表达式推算的下一次触发时刻
    pub next_exec_time: Option<DateTime<Utc>>,
}

impl ExecDetailDto {
    pub fn from_exec(exec: &ExecDetail) -> Self {
        let next_exec_time = CronTrigger::new(&exec.cron_expr)
            .ok()
            .and_then(|trigger| trigger.next_execution_time(Utc::now()));
        Self {
            key: exec.key.clone(),
            desc: exec.desc.clone(),
            cron_expr: exec.cron_expr.clone(),
            task_handler_key: exec.task_handler_key.clone(),
            init_time: exec.init_time,
            end_time: exec.end_time,
            last_exec_time: exec.last_exec_time,
            exec_count: exec.exec_count,
            max_exec_count: (exec.max_exec_count != i64::MAX).then_some(exec.max_exec_count),
            state: exec.state.value(),
            state_desc: exec.state.description().to_string(),
            error_msg: exec.error_msg.clone(),
            next_exec_time,
        }
    }
}

/// 任务处理器投影
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskHandlerDto {
    pub key: String,
    pub bean_name: String,
    pub bean_class_name: String,
    pub method_name: String,
}

impl From<&TaskHandler> for TaskHandlerDto {
    fn from(handler: &TaskHandler) -> Self {
        Self {
            key: handler.key.clone(),
            bean_name: handler.bean_name.clone(),
            bean_class_name: handler.bean_class_name.clone(),
            method_name: handler.method_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easycron_domain::ExecState;

    #[test]
    fn test_exec_dto_projection() {
        let mut exec = ExecDetail::new("e1", "测试", "0/2 * * * * ?", "h1").with_max_exec_count(3);
        exec.state = ExecState::Running;
        exec.exec_count = 1;

        let dto = ExecDetailDto::from_exec(&exec);
        assert_eq!(dto.key, "e1");
        assert_eq!(dto.state, 1);
        assert_eq!(dto.state_desc, "Running");
        assert_eq!(dto.max_exec_count, Some(3));
        // 合法cron总能推算出下一跳
        assert!(dto.next_exec_time.is_some());
    }

    #[test]
    fn test_exec_dto_unbounded_max_is_none() {
        let exec = ExecDetail::new("e1", "测试", "0/2 * * * * ?", "h1");
        let dto = ExecDetailDto::from_exec(&exec);
        assert_eq!(dto.max_exec_count, None);
    }

    #[test]
    fn test_exec_dto_camel_case_fields() {
        let exec = ExecDetail::new("e1", "测试", "0/2 * * * * ?", "h1");
        let json = serde_json::to_string(&ExecDetailDto::from_exec(&exec)).unwrap();
        assert!(json.contains("\"cronExpr\""));
        assert!(json.contains("\"taskHandlerKey\""));
        assert!(json.contains("\"execCount\""));
    }

    #[test]
    fn test_handler_dto_projection() {
        let handler = TaskHandler::new("h1", "demoJob", "demo::DemoJob", "run");
        let dto = TaskHandlerDto::from(&handler);
        assert_eq!(dto.key, "h1");
        assert_eq!(dto.bean_class_name, "demo::DemoJob");
        let json = serde_json::to_string(&dto).unwrap();
        assert!(json.contains("\"beanClassName\""));
    }
}
