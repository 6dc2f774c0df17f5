use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use easycron_errors::{SchedulerError, SchedulerResult};

pub type JobFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// 可调度的用户回调
pub type JobFn = Arc<dyn Fn() -> JobFuture + Send + Sync>;

/// 把异步闭包包装成JobFn
pub fn job_fn<F, Fut>(f: F) -> JobFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

/// 注册到注册表的一个bean：类型名、实例名和它暴露的无参方法
pub struct RegisteredBean {
    pub bean_name: String,
    pub bean_class_name: String,
    methods: HashMap<String, JobFn>,
}

impl RegisteredBean {
    pub fn new(bean_name: impl Into<String>, bean_class_name: impl Into<String>) -> Self {
        Self {
            bean_name: bean_name.into(),
            bean_class_name: bean_class_name.into(),
            methods: HashMap::new(),
        }
    }

    pub fn method(mut self, method_name: impl Into<String>, job: JobFn) -> Self {
        self.methods.insert(method_name.into(), job);
        self
    }
}

/// 处理器注册表
///
/// 持久化的任务只保存字符串标识，进程重启后通过注册表把
/// `(bean_class_name, bean_name, method_name)` 重新解析成活的可调用
/// 对象。注册只发生在启动阶段，冻结之后拒绝任何修改。
pub struct HandlerRegistry {
    beans: RwLock<Vec<RegisteredBean>>,
    frozen: AtomicBool,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            beans: RwLock::new(Vec::new()),
            frozen: AtomicBool::new(false),
        }
    }

    /// 注册一个bean；冻结后调用返回RegistryFrozen
    pub fn register_bean(&self, bean: RegisteredBean) -> SchedulerResult<()> {
        if self.frozen.load(Ordering::SeqCst) {
            return Err(SchedulerError::RegistryFrozen);
        }
        debug!(
            "注册bean: {} ({})",
            bean.bean_name, bean.bean_class_name
        );
        self.beans.write().unwrap().push(bean);
        Ok(())
    }

    /// 冻结注册表，启动完成后由引导流程调用
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    /// 解析可调用对象
    ///
    /// 先按类型查找；同类型存在多个实例时再按名称收窄。类型未知、
    /// 名称不匹配或方法缺失都返回HandlerNotFound。
    pub fn resolve(
        &self,
        bean_class_name: &str,
        bean_name: &str,
        method_name: &str,
    ) -> SchedulerResult<JobFn> {
        let beans = self.beans.read().unwrap();
        let candidates: Vec<&RegisteredBean> = beans
            .iter()
            .filter(|bean| bean.bean_class_name == bean_class_name)
            .collect();

        let bean = match candidates.len() {
            0 => {
                return Err(SchedulerError::handler_not_found(format!(
                    "找不到类型为 {bean_class_name} 的bean"
                )))
            }
            1 => candidates[0],
            _ => candidates
                .into_iter()
                .find(|bean| bean.bean_name == bean_name)
                .ok_or_else(|| {
                    SchedulerError::handler_not_found(format!(
                        "类型 {bean_class_name} 的bean不唯一，且没有名为 {bean_name} 的实例"
                    ))
                })?,
        };

        bean.methods.get(method_name).cloned().ok_or_else(|| {
            SchedulerError::handler_not_found(format!(
                "bean {bean_name} ({bean_class_name}) 上找不到方法 {method_name}"
            ))
        })
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
