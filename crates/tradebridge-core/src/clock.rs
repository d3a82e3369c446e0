use std::sync::Mutex;

use crate::UtcDateTime;

/// Wall-clock source for the scheduler and predicates.
pub trait Clock: Send + Sync {
    fn now(&self) -> UtcDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UtcDateTime {
        UtcDateTime::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<UtcDateTime>,
}

impl FixedClock {
    pub fn new(now: UtcDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: UtcDateTime) {
        *self.now.lock().expect("fixed clock lock is not poisoned") = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> UtcDateTime {
        *self.now.lock().expect("fixed clock lock is not poisoned")
    }
}
