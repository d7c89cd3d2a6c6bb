use std::thread::sleep;
use std::time::Duration;

pub const DEFAULT_IMAGE_DELAY_MS: u64 = 100;
pub const DEFAULT_ARTICLE_DELAY_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseKind {
    Image,
    Article,
}

/// Fixed pacing intervals. Not adaptive: the same interval is applied
/// regardless of how the previous request went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolitenessPolicy {
    pub image_interval: Duration,
    pub article_interval: Duration,
}

impl Default for PolitenessPolicy {
    fn default() -> Self {
        Self {
            image_interval: Duration::from_millis(DEFAULT_IMAGE_DELAY_MS),
            article_interval: Duration::from_millis(DEFAULT_ARTICLE_DELAY_MS),
        }
    }
}

impl PolitenessPolicy {
    pub fn disabled() -> Self {
        Self {
            image_interval: Duration::ZERO,
            article_interval: Duration::ZERO,
        }
    }

    pub fn interval(&self, kind: PauseKind) -> Duration {
        match kind {
            PauseKind::Image => self.image_interval,
            PauseKind::Article => self.article_interval,
        }
    }
}

pub trait Pacer {
    fn pause(&mut self, kind: PauseKind);
}

#[derive(Debug, Clone)]
pub struct SleepPacer {
    policy: PolitenessPolicy,
}

impl SleepPacer {
    pub fn new(policy: PolitenessPolicy) -> Self {
        Self { policy }
    }
}

impl Pacer for SleepPacer {
    fn pause(&mut self, kind: PauseKind) {
        let interval = self.policy.interval(kind);
        if !interval.is_zero() {
            sleep(interval);
        }
    }
}
