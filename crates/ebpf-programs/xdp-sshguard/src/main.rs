#![no_std]
#![no_main]

use aya_ebpf::{
    bindings::xdp_action,
    helpers::bpf_ktime_get_ns,
    macros::{map, xdp},
    maps::{Array, LruHashMap, PerfEventArray},
    programs::XdpContext,
};
use aya_log_ebpf::info;
use core::mem;
use ebpf_common::{
    attempt::{track_attempt, AttemptInfo, Verdict},
    config::{GuardConfig, CONFIG_SLOT},
    event::BanEvent,
};
use network_types::{eth::EthHdr, ip::Ipv4Hdr};

// ── Constants ───────────────────────────────────────────────────────

const ETH_P_IP: u16 = 0x0800;
const PROTO_TCP: u8 = 6;

/// TCP flag masks.
const TCP_FLAG_SYN: u8 = 0x02;
const TCP_FLAG_ACK: u8 = 0x10;

// ── Inline TCP header type ──────────────────────────────────────────

/// Inline TCP header for SYN detection (20 bytes minimum).
#[repr(C)]
struct TcpHdr {
    src_port: u16,
    dst_port: u16,
    seq_num: u32,
    ack_num: u32,
    /// Data offset (top 4 bits) + reserved (bottom 4 bits).
    doff_reserved: u8,
    /// TCP flags byte (FIN=0x01, SYN=0x02, RST=0x04, PSH=0x08, ACK=0x10).
    flags: u8,
    window: u16,
    checksum: u16,
    urgent_ptr: u16,
}

// ── Maps ────────────────────────────────────────────────────────────

/// Singleton runtime policy at slot 0. Written by userspace before
/// attach; an all-zero record means "not configured yet" and the filter
/// passes everything.
#[map]
static SSH_CONFIG: Array<GuardConfig> = Array::with_max_entries(1, 0);

/// Per-source-IP attempt state. LRU so a full table evicts the stalest
/// source instead of refusing inserts.
#[map]
static SSH_ATTEMPTS: LruHashMap<u32, AttemptInfo> = LruHashMap::with_max_entries(1024, 0);

/// Kernel→userspace ban notifications, one per-CPU perf ring.
#[map]
static EVENTS: PerfEventArray<BanEvent> = PerfEventArray::new(0);

// ── Entry point ─────────────────────────────────────────────────────

/// XDP entry point. Default-to-pass on internal error: a parse failure
/// must never cost legitimate traffic.
#[xdp]
pub fn xdp_sshguard(ctx: XdpContext) -> u32 {
    match try_xdp_sshguard(&ctx) {
        Ok(action) => action,
        Err(()) => xdp_action::XDP_PASS,
    }
}

// ── Packet processing ───────────────────────────────────────────────

#[inline(always)]
fn try_xdp_sshguard(ctx: &XdpContext) -> Result<u32, ()> {
    // Parse Ethernet header
    let ethhdr: *const EthHdr = unsafe { ptr_at(ctx, 0)? };
    let ether_type = u16::from_be(unsafe { (*ethhdr).ether_type });
    if ether_type != ETH_P_IP {
        return Ok(xdp_action::XDP_PASS);
    }

    // Parse IPv4 header
    let ipv4hdr: *const Ipv4Hdr = unsafe { ptr_at(ctx, EthHdr::LEN)? };
    let protocol = unsafe { (*ipv4hdr).proto } as u8;
    if protocol != PROTO_TCP {
        return Ok(xdp_action::XDP_PASS);
    }

    let cfg = match SSH_CONFIG.get(CONFIG_SLOT) {
        Some(cfg) if cfg.ssh_port != 0 => cfg,
        // Unconfigured: only reachable in the window between load and
        // the config write.
        _ => return Ok(xdp_action::XDP_PASS),
    };

    // Variable-length IP header; TCP starts after it.
    let ihl = unsafe { (*ipv4hdr).ihl() } as usize;
    let l4_offset = EthHdr::LEN + ihl;

    let tcphdr: *const TcpHdr = unsafe { ptr_at(ctx, l4_offset)? };
    let dst_port = u16::from_be(unsafe { (*tcphdr).dst_port });
    if u32::from(dst_port) != cfg.ssh_port {
        return Ok(xdp_action::XDP_PASS);
    }

    // An attempt is a new-connection segment: SYN set, ACK clear.
    let tcp_flags = unsafe { (*tcphdr).flags };
    if tcp_flags & TCP_FLAG_SYN == 0 || tcp_flags & TCP_FLAG_ACK != 0 {
        return Ok(xdp_action::XDP_PASS);
    }

    let src_ip = u32::from_be_bytes(unsafe { (*ipv4hdr).src_addr });
    let now = unsafe { bpf_ktime_get_ns() };

    // In-place update through the map pointer keeps per-entry updates
    // serialized by the map; counter races at the threshold boundary
    // across CPUs are tolerated.
    let Some(info) = SSH_ATTEMPTS.get_ptr_mut(&src_ip) else {
        // First attempt from this source. An insert failure means the
        // table is exhausted; never drop traffic over that.
        let _ = SSH_ATTEMPTS.insert(&src_ip, &AttemptInfo::fresh(now), 0);
        return Ok(xdp_action::XDP_PASS);
    };

    match track_attempt(unsafe { &mut *info }, cfg, now) {
        Verdict::Pass => Ok(xdp_action::XDP_PASS),
        Verdict::Blocked => Ok(xdp_action::XDP_DROP),
        Verdict::Banned => {
            let count = unsafe { (*info).count };
            let event = BanEvent { ip: src_ip, count };
            // Best-effort: a full ring never blocks the verdict.
            EVENTS.output(ctx, &event, 0);
            info!(ctx, "SSHGUARD {:i} banned after {} attempts", src_ip, count);
            Ok(xdp_action::XDP_DROP)
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Bounds-checked pointer access for eBPF verifier compliance.
#[inline(always)]
unsafe fn ptr_at<T>(ctx: &XdpContext, offset: usize) -> Result<*const T, ()> {
    let start = ctx.data();
    let end = ctx.data_end();
    let len = mem::size_of::<T>();
    if start + offset + len > end {
        return Err(());
    }
    Ok((start + offset) as *const T)
}

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}
