use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use cron::Schedule;

use easycron_errors::{SchedulerError, SchedulerResult};

/// CRON触发器
///
/// 纯函数式封装：给定参考时刻，计算下一次触发时刻。调度器在每次
/// 触发完成后重新调用它安排下一跳，因此长耗时的任务会相对完成时刻
/// 顺延，错过的触发点被丢弃而不是排队补偿。
#[derive(Debug)]
pub struct CronTrigger {
    schedule: Schedule,
}

impl CronTrigger {
    pub fn new(cron_expr: &str) -> SchedulerResult<Self> {
        // Quartz风格表达式里的?等价于*
        let normalized = cron_expr
            .split_whitespace()
            .map(|field| if field == "?" { "*" } else { field })
            .collect::<Vec<_>>()
            .join(" ");
        let schedule = Schedule::from_str(&normalized).map_err(|e| SchedulerError::InvalidCron {
            expr: cron_expr.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { schedule })
    }

    /// 校验CRON表达式是否合法
    pub fn validate(cron_expr: &str) -> SchedulerResult<()> {
        Self::new(cron_expr).map(|_| ())
    }

    /// 下一次触发时刻；None表示之后不会再触发
    pub fn next_execution_time(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&from).next()
    }

    /// 从指定时刻起的若干次触发时刻
    pub fn upcoming_times(&self, from: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        self.schedule.after(&from).take(count).collect()
    }

    /// 距下一次触发还有多久
    pub fn time_until_next_execution(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.next_execution_time(now).map(|next| next - now)
    }
}
