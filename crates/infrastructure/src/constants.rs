use std::time::Duration;

// ── Channel capacities ─────────────────────────────────────────────

/// Ban-event channel between the perf readers and the supervisor.
/// Producers block on a full channel; this is the backpressure budget.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

// ── Timeouts ───────────────────────────────────────────────────────

pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

// ── eBPF ──────────────────────────────────────────────────────────

/// Default directory containing the compiled XDP object.
pub const DEFAULT_EBPF_PROGRAM_DIR: &str = "/usr/local/lib/synshield";

/// Fall-back for local development (relative to the workspace root).
pub const DEFAULT_EBPF_PROGRAM_DIR_DEV: &str = "target/bpfel-unknown-none/release";

/// File name of the compiled XDP object inside the program directory.
pub const EBPF_PROGRAM_NAME: &str = "xdp-sshguard";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_capacity_is_positive() {
        assert!(EVENT_CHANNEL_CAPACITY > 0);
    }

    #[test]
    fn shutdown_timeout_is_reasonable() {
        assert!(GRACEFUL_SHUTDOWN_TIMEOUT.as_secs() >= 1);
        assert!(GRACEFUL_SHUTDOWN_TIMEOUT.as_secs() <= 30);
    }
}
