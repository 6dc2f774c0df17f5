use std::time::Duration;

/// 提交被拒时的重试策略
///
/// 最多5次尝试，初始间隔1秒，指数退避倍数2；只对TaskRejected生效。
/// 重试耗尽后由恢复动作把任务落盘为ERROR。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, multiplier: u32) -> Self {
        Self {
            max_attempts,
            initial_delay,
            multiplier,
        }
    }

    /// 第attempt次失败后的等待时长（attempt从1开始计）
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.initial_delay * self.multiplier.pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.multiplier, 2);
    }

    #[test]
    fn test_exponential_backoff_progression() {
        let policy = RetryPolicy::default();
        // 1s, 2s, 4s, 8s
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(8));
    }
}
