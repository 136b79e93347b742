//! System clock adapter
//!
//! Provides the production implementation of ClockPort using chrono.

use chrono::{DateTime, Utc};
use steamsesh_ports::ClockPort;

/// System clock implementation using real time
///
/// For testing, use `testing::ManualClock` or `MockClockPort` instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
