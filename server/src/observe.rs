//! Operation-scoped logging for route handlers.

use std::time::Instant;
use tracing::{info, warn};

/// Times one named operation and logs its outcome
pub struct OpTimer {
    op: &'static str,
    start: Instant,
}

impl OpTimer {
    pub fn start(op: &'static str) -> Self {
        Self {
            op,
            start: Instant::now(),
        }
    }

    pub fn finish<T, E: std::fmt::Display>(self, result: &Result<T, E>) {
        let elapsed = self.start.elapsed().as_millis();
        match result {
            Ok(_) => info!("{} completed in {elapsed}ms", self.op),
            Err(e) => warn!("{} failed after {elapsed}ms: {e}", self.op),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_accepts_both_outcomes() {
        let ok: Result<u32, String> = Ok(1);
        OpTimer::start("test.ok").finish(&ok);

        let err: Result<u32, String> = Err("boom".into());
        OpTimer::start("test.err").finish(&err);
    }
}
