use std::time::{Duration, Instant};

use crate::error::{Result, ScanError};

/// Wall-clock budget shared by every walker of one scan.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn check(&self) -> Result<()> {
        if self.started.elapsed() > self.budget {
            return Err(ScanError::DeadlineExceeded(self.budget));
        }
        Ok(())
    }
}

pub(crate) fn check(deadline: Option<&Deadline>) -> Result<()> {
    deadline.map_or(Ok(()), Deadline::check)
}
