use easycron_domain::{ExecDetail, ExecState, TaskHandler};

/// TaskHandler构造器
pub struct TaskHandlerBuilder {
    key: String,
    bean_name: String,
    bean_class_name: String,
    method_name: String,
}

impl TaskHandlerBuilder {
    pub fn new() -> Self {
        Self {
            key: "handler-1".to_string(),
            bean_name: "demoJob".to_string(),
            bean_class_name: "demo::DemoJob".to_string(),
            method_name: "run".to_string(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_bean_name(mut self, bean_name: impl Into<String>) -> Self {
        self.bean_name = bean_name.into();
        self
    }

    pub fn with_bean_class_name(mut self, bean_class_name: impl Into<String>) -> Self {
        self.bean_class_name = bean_class_name.into();
        self
    }

    pub fn with_method_name(mut self, method_name: impl Into<String>) -> Self {
        self.method_name = method_name.into();
        self
    }

    pub fn build(self) -> TaskHandler {
        TaskHandler::new(
            self.key,
            self.bean_name,
            self.bean_class_name,
            self.method_name,
        )
    }
}

impl Default for TaskHandlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// ExecDetail构造器
pub struct ExecDetailBuilder {
    key: String,
    desc: String,
    cron_expr: String,
    task_handler_key: String,
    max_exec_count: Option<i64>,
    exec_count: i64,
    state: ExecState,
}

impl ExecDetailBuilder {
    pub fn new() -> Self {
        Self {
            key: "exec-1".to_string(),
            desc: "测试任务".to_string(),
            cron_expr: "0/2 * * * * ?".to_string(),
            task_handler_key: "handler-1".to_string(),
            max_exec_count: None,
            exec_count: 0,
            state: ExecState::Init,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    pub fn with_cron_expr(mut self, cron_expr: impl Into<String>) -> Self {
        self.cron_expr = cron_expr.into();
        self
    }

    pub fn with_task_handler_key(mut self, task_handler_key: impl Into<String>) -> Self {
        self.task_handler_key = task_handler_key.into();
        self
    }

    pub fn with_max_exec_count(mut self, max_exec_count: i64) -> Self {
        self.max_exec_count = Some(max_exec_count);
        self
    }

    pub fn with_exec_count(mut self, exec_count: i64) -> Self {
        self.exec_count = exec_count;
        self
    }

    pub fn with_state(mut self, state: ExecState) -> Self {
        self.state = state;
        self
    }

    pub fn build(self) -> ExecDetail {
        let mut exec = ExecDetail::new(self.key, self.desc, self.cron_expr, self.task_handler_key);
        if let Some(max) = self.max_exec_count {
            exec = exec.with_max_exec_count(max);
        }
        exec.exec_count = self.exec_count;
        exec.state = self.state;
        exec
    }
}

impl Default for ExecDetailBuilder {
    fn default() -> Self {
        Self::new()
    }
}
