use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use easycron_domain::{ExecDetail, TaskHandler, TaskStore};
use easycron_errors::SchedulerResult;

use crate::trigger::CronTrigger;

/// 一条执行计划：cron表达式、描述和可选的次数上限
#[derive(Debug, Clone)]
pub struct ExecSpec {
    pub cron: String,
    pub desc: String,
    pub max_exec_count: Option<i64>,
}

impl ExecSpec {
    pub fn new(cron: impl Into<String>) -> Self {
        Self {
            cron: cron.into(),
            desc: String::new(),
            max_exec_count: None,
        }
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    pub fn with_max_exec_count(mut self, max_exec_count: i64) -> Self {
        self.max_exec_count = Some(max_exec_count);
        self
    }
}

/// 宿主侧的任务声明：一个无参方法挂接一条或多条执行计划
#[derive(Debug, Clone)]
pub struct JobDeclaration {
    pub bean_name: String,
    pub bean_class_name: String,
    pub method_name: String,
    pub specs: Vec<ExecSpec>,
}

impl JobDeclaration {
    pub fn new(
        bean_name: impl Into<String>,
        bean_class_name: impl Into<String>,
        method_name: impl Into<String>,
    ) -> Self {
        Self {
            bean_name: bean_name.into(),
            bean_class_name: bean_class_name.into(),
            method_name: method_name.into(),
            specs: Vec::new(),
        }
    }

    pub fn with_spec(mut self, spec: ExecSpec) -> Self {
        self.specs.push(spec);
        self
    }
}

/// 启动注册服务
///
/// 把宿主声明的任务写入存储：一条声明按执行计划数量展开成多条
/// ExecDetail，共享一条TaskHandler。key对同一声明跨重启稳定；
/// key已存在时保留持久化记录，执行计数因此能跨重启延续。
pub struct RegistrationService {
    task_store: Arc<dyn TaskStore>,
}

impl RegistrationService {
    pub fn new(task_store: Arc<dyn TaskStore>) -> Self {
        Self { task_store }
    }

    pub async fn register_all(&self, declarations: &[JobDeclaration]) -> SchedulerResult<()> {
        for decl in declarations {
            self.register_one(decl).await?;
        }
        info!("任务注册完成，共 {} 条声明", declarations.len());
        Ok(())
    }

    async fn register_one(&self, decl: &JobDeclaration) -> SchedulerResult<()> {
        if decl.specs.is_empty() {
            warn!(
                "声明 {}::{} 没有执行计划，跳过",
                decl.bean_class_name, decl.method_name
            );
            return Ok(());
        }

        // 非法cron属于配置错误，启动阶段直接失败
        for spec in &decl.specs {
            CronTrigger::validate(&spec.cron)?;
        }

        let handler_key = Self::handler_key(decl);
        match self.task_store.get_handler(&handler_key).await {
            Ok(_) => {
                debug!("处理器 {} 已存在，沿用持久化记录", handler_key);
            }
            Err(e) if e.is_not_found() => {
                self.task_store
                    .put_handler(&TaskHandler::new(
                        handler_key.clone(),
                        &decl.bean_name,
                        &decl.bean_class_name,
                        &decl.method_name,
                    ))
                    .await?;
            }
            Err(e) => return Err(e),
        }

        for (index, spec) in decl.specs.iter().enumerate() {
            let exec_key = Self::exec_key(decl, spec, index);
            match self.task_store.get_exec(&exec_key).await {
                Ok(existing) => {
                    // 上一轮运行留下的记录优先，保住exec_count
                    debug!(
                        "任务 {} 已存在（已执行 {} 次），保留持久化记录",
                        exec_key, existing.exec_count
                    );
                }
                Err(e) if e.is_not_found() => {
                    let mut exec =
                        ExecDetail::new(exec_key.clone(), &spec.desc, &spec.cron, &handler_key);
                    if let Some(max) = spec.max_exec_count {
                        exec = exec.with_max_exec_count(max);
                    }
                    self.task_store.put_exec(&exec).await?;
                    debug!("已注册任务 {} (cron: {})", exec_key, spec.cron);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// 处理器key：类名+方法名的SHA-256截断，跨重启稳定
    pub fn handler_key(decl: &JobDeclaration) -> String {
        stable_key(&format!("{}#{}", decl.bean_class_name, decl.method_name))
    }

    /// 执行详情key：在处理器key的基础上叠加cron与序号
    pub fn exec_key(decl: &JobDeclaration, spec: &ExecSpec, index: usize) -> String {
        stable_key(&format!(
            "{}#{}#{}#{}",
            decl.bean_class_name, decl.method_name, spec.cron, index
        ))
    }
}

fn stable_key(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
