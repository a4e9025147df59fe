use crate::config::GuardConfig;

/// Per-source connection-attempt state, keyed by IPv4 address in the
/// `SSH_ATTEMPTS` map. Updated in place by the XDP program.
/// Size: 32 bytes.
///
/// Invariants: `first_attempt_time <= last_attempt_time`;
/// `count <= max_attempts + 1` (an entry promotes to banned as soon as it
/// reaches the threshold); `block_until` is set only on a ban decision.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptInfo {
    /// New-connection attempts observed in the current window.
    pub count: u32,
    pub _pad: u32,
    /// Start of the current window (monotonic kernel ns).
    pub first_attempt_time: u64,
    /// Most recent observed attempt (monotonic kernel ns).
    pub last_attempt_time: u64,
    /// Banned while `now < block_until`; 0 = not banned.
    pub block_until: u64,
}

impl AttemptInfo {
    /// State for the first attempt of a new window.
    pub const fn fresh(now: u64) -> Self {
        Self {
            count: 1,
            _pad: 0,
            first_attempt_time: now,
            last_attempt_time: now,
            block_until: 0,
        }
    }
}

/// Outcome of observing one SYN from an already-tracked source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Under the threshold (or window rolled over): let the packet through.
    Pass,
    /// Source is inside an active ban interval: drop, no state change.
    Blocked,
    /// This attempt reached the threshold: drop and report the ban.
    Banned,
}

/// Advance the per-source state machine by one observed attempt.
///
/// A window that has aged `time_window_ns` or more resets (equality counts
/// as expiry); an attempt that reaches `max_attempts` bans (equality
/// triggers). While banned, counters are left untouched so the count
/// reported at ban time stays stable.
pub fn track_attempt(info: &mut AttemptInfo, cfg: &GuardConfig, now: u64) -> Verdict {
    if now < info.block_until {
        return Verdict::Blocked;
    }

    if now.saturating_sub(info.first_attempt_time) >= cfg.time_window_ns {
        *info = AttemptInfo::fresh(now);
        return Verdict::Pass;
    }

    info.count = info.count.saturating_add(1);
    info.last_attempt_time = now;

    if info.count >= cfg.max_attempts {
        info.block_until = now.saturating_add(cfg.block_time_ns);
        return Verdict::Banned;
    }

    Verdict::Pass
}

// SAFETY: AttemptInfo is #[repr(C)], Copy, 'static, and contains only
// primitive fields with explicit padding. Safe for zero-copy eBPF map
// operations via aya.
#[cfg(feature = "userspace")]
unsafe impl aya::Pod for AttemptInfo {}
