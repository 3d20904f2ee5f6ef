//! Resource samples bracketing a normalization pass.

use serde::Serialize;
use std::time::{Duration, Instant};
use sysinfo::{Pid, System};

#[derive(Debug, Clone, Copy)]
pub struct ResourceSample {
    pub wall: Instant,
    pub user_time: Duration,
    pub system_time: Duration,
    /// Peak resident set size, kilobytes. 0 where `getrusage` is unavailable.
    pub max_rss_kb: u64,
    /// Current resident set size, kilobytes.
    pub rss_kb: u64,
}

impl ResourceSample {
    pub fn capture() -> Self {
        let (user_time, system_time, max_rss_kb) = rusage_self();
        Self {
            wall: Instant::now(),
            user_time,
            system_time,
            max_rss_kb,
            rss_kb: current_rss_kb(),
        }
    }
}

#[cfg(unix)]
fn rusage_self() -> (Duration, Duration, u64) {
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        tracing::warn!(error = %std::io::Error::last_os_error(), "getrusage failed");
        return (Duration::ZERO, Duration::ZERO, 0);
    }
    (
        timeval_to_duration(usage.ru_utime),
        timeval_to_duration(usage.ru_stime),
        max_rss_to_kb(usage.ru_maxrss as u64),
    )
}

#[cfg(not(unix))]
fn rusage_self() -> (Duration, Duration, u64) {
    (Duration::ZERO, Duration::ZERO, 0)
}

#[cfg(unix)]
fn timeval_to_duration(tv: libc::timeval) -> Duration {
    Duration::from_secs(tv.tv_sec.max(0) as u64) + Duration::from_micros(tv.tv_usec.max(0) as u64)
}

// macOS reports bytes, Linux kilobytes.
#[cfg(unix)]
fn max_rss_to_kb(raw: u64) -> u64 {
    if cfg!(target_os = "macos") {
        raw / 1024
    } else {
        raw
    }
}

fn current_rss_kb() -> u64 {
    let mut sys = System::new();
    let pid = Pid::from_u32(std::process::id());
    sys.refresh_process(pid);
    // sysinfo 0.30 reports bytes
    sys.process(pid).map(|p| p.memory() / 1024).unwrap_or(0)
}

/// Resource usage consumed between two samples.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UsageDelta {
    pub wall: Duration,
    pub user_time: Duration,
    pub system_time: Duration,
    pub max_rss_kb: u64,
    pub rss_before_kb: u64,
    pub rss_after_kb: u64,
}

impl UsageDelta {
    pub fn between(before: &ResourceSample, after: &ResourceSample) -> Self {
        Self {
            wall: after.wall.saturating_duration_since(before.wall),
            user_time: after.user_time.saturating_sub(before.user_time),
            system_time: after.system_time.saturating_sub(before.system_time),
            max_rss_kb: after.max_rss_kb.max(before.max_rss_kb),
            rss_before_kb: before.rss_kb,
            rss_after_kb: after.rss_kb,
        }
    }

    /// Sum of repeated passes. Peak RSS keeps the maximum.
    pub fn accumulate(&mut self, other: &UsageDelta) {
        self.wall += other.wall;
        self.user_time += other.user_time;
        self.system_time += other.system_time;
        self.max_rss_kb = self.max_rss_kb.max(other.max_rss_kb);
        self.rss_after_kb = other.rss_after_kb;
    }
}
