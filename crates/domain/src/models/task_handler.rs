use serde::{Deserialize, Serialize};

/// 任务处理器实体
///
/// 持久化的可调用对象身份，与具体某条调度记录无关。注册阶段写入一次，
/// 之后只读；通过 `(bean_class_name, bean_name, method_name)` 三元组在
/// 进程重启后重新绑定到活的可调用对象。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandler {
    pub key: String,
    pub bean_name: String,
    pub bean_class_name: String,
    pub method_name: String,
}

impl TaskHandler {
    pub fn new(
        key: impl Into<String>,
        bean_name: impl Into<String>,
        bean_class_name: impl Into<String>,
        method_name: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            bean_name: bean_name.into(),
            bean_class_name: bean_class_name.into(),
            method_name: method_name.into(),
        }
    }
}
