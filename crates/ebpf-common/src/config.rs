/// Map key for the single `SSH_CONFIG` slot.
pub const CONFIG_SLOT: u32 = 0;

/// Runtime policy for the SSH guard.
/// Written once by userspace before attach, re-read by the XDP program on
/// every packet. An all-zero record (freshly created map) means "not yet
/// configured" and the filter passes everything.
/// Size: 32 bytes (aligned to 8 bytes due to the u64 fields).
///
/// `ssh_port` is stored in host byte order; the filter converts the wire
/// port from network order at comparison time.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardConfig {
    /// TCP destination port to protect. 0 = unconfigured (pass all).
    pub ssh_port: u32,
    pub _pad0: u32,
    /// Ban threshold: the attempt that reaches this count is dropped.
    pub max_attempts: u32,
    pub _pad1: u32,
    /// Sliding window length in nanoseconds.
    pub time_window_ns: u64,
    /// Ban duration in nanoseconds.
    pub block_time_ns: u64,
}

impl GuardConfig {
    /// Build a config from CLI-level units (port, attempts, seconds).
    pub const fn new(ssh_port: u32, max_attempts: u32, window_secs: u64, block_secs: u64) -> Self {
        Self {
            ssh_port,
            _pad0: 0,
            max_attempts,
            _pad1: 0,
            time_window_ns: window_secs * 1_000_000_000,
            block_time_ns: block_secs * 1_000_000_000,
        }
    }
}

// SAFETY: GuardConfig is #[repr(C)], Copy, 'static, and contains only
// primitive fields with explicit padding. Safe for zero-copy eBPF map
// operations via aya.
#[cfg(feature = "userspace")]
unsafe impl aya::Pod for GuardConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem;

    #[test]
    fn guard_config_size() {
        assert_eq!(mem::size_of::<GuardConfig>(), 32);
    }

    #[test]
    fn guard_config_alignment() {
        assert_eq!(mem::align_of::<GuardConfig>(), 8);
    }

    #[test]
    fn guard_config_field_offsets() {
        assert_eq!(mem::offset_of!(GuardConfig, ssh_port), 0);
        assert_eq!(mem::offset_of!(GuardConfig, max_attempts), 8);
        assert_eq!(mem::offset_of!(GuardConfig, time_window_ns), 16);
        assert_eq!(mem::offset_of!(GuardConfig, block_time_ns), 24);
    }

    #[test]
    fn byte_round_trip_is_identical() {
        let cfg = GuardConfig::new(22, 5, 60, 300);
        let bytes: [u8; 32] = unsafe { mem::transmute(cfg) };
        let back: GuardConfig = unsafe { mem::transmute(bytes) };
        assert_eq!(back, cfg);

        // Little-endian field placement as seen across the map boundary.
        assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), 22);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 5);
        assert_eq!(
            u64::from_le_bytes(bytes[16..24].try_into().unwrap()),
            60_000_000_000
        );
        assert_eq!(
            u64::from_le_bytes(bytes[24..32].try_into().unwrap()),
            300_000_000_000
        );
    }

    #[test]
    fn new_converts_seconds_to_nanos() {
        let cfg = GuardConfig::new(22, 5, 60, 300);
        assert_eq!(cfg.ssh_port, 22);
        assert_eq!(cfg.max_attempts, 5);
        assert_eq!(cfg.time_window_ns, 60_000_000_000);
        assert_eq!(cfg.block_time_ns, 300_000_000_000);
    }
}
