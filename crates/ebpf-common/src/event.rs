/// Ban notification emitted by the XDP program through the `EVENTS`
/// perf event array, one record per transition into the banned state.
/// Size: 8 bytes, little-endian on every supported platform.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BanEvent {
    /// Source IPv4 address, host byte order (converted from the wire at
    /// parse time).
    pub ip: u32,
    /// Attempt counter at the moment of the ban.
    pub count: u32,
}

// SAFETY: BanEvent is #[repr(C)], Copy, 'static, and contains only
// primitive fields. Safe for zero-copy eBPF map operations via aya.
#[cfg(feature = "userspace")]
unsafe impl aya::Pod for BanEvent {}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem;

    #[test]
    fn ban_event_size() {
        assert_eq!(mem::size_of::<BanEvent>(), 8);
    }

    #[test]
    fn ban_event_alignment() {
        assert_eq!(mem::align_of::<BanEvent>(), 4);
    }

    #[test]
    fn ban_event_field_offsets() {
        assert_eq!(mem::offset_of!(BanEvent, ip), 0);
        assert_eq!(mem::offset_of!(BanEvent, count), 4);
    }
}
