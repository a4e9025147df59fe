use std::ffi::CString;

use aya::programs::{Xdp, XdpFlags};
use aya::Ebpf;
use tracing::{info, warn};

use crate::ebpf::error::GuardError;

/// Name of the XDP program inside the compiled object.
const PROGRAM_NAME: &str = "xdp_sshguard";

/// Loads, attaches, and detaches the SSH guard XDP program.
///
/// Wraps the `aya::Ebpf` instance and owns the attach link so that
/// `detach` is idempotent and the program is released on drop even after
/// a partial attach failure.
pub struct GuardLoader {
    ebpf: Ebpf,
    link: Option<aya::programs::xdp::XdpLinkId>,
}

impl GuardLoader {
    /// Load the XDP object from raw ELF bytes.
    ///
    /// Raises the memlock rlimit first (kernels without memcg-based
    /// accounting charge map memory against it), then hands the object to
    /// the kernel verifier. Initializes aya-log forwarding best-effort.
    pub fn load(program_bytes: &[u8]) -> Result<Self, GuardError> {
        raise_memlock_limit()?;

        let mut ebpf = Ebpf::load(program_bytes).map_err(|e| GuardError::Load(e.to_string()))?;

        // Non-fatal: the object may carry no log statements.
        if let Err(e) = aya_log::EbpfLogger::init(&mut ebpf) {
            warn!("eBPF logger init failed (non-fatal): {e}");
        }

        info!("XDP object loaded");
        Ok(Self { ebpf, link: None })
    }

    /// Attach the guard program to `iface` in the requested XDP mode.
    ///
    /// The interface name is resolved to an index up front so an unknown
    /// device surfaces as an interface error rather than a generic attach
    /// failure.
    pub fn attach(&mut self, iface: &str, mode: &str) -> Result<(), GuardError> {
        resolve_ifindex(iface)?;
        let flags = xdp_flags_for_mode(mode);

        let program: &mut Xdp = self
            .ebpf
            .program_mut(PROGRAM_NAME)
            .ok_or_else(|| GuardError::Load(format!("program '{PROGRAM_NAME}' not in object")))?
            .try_into()
            .map_err(|e: aya::programs::ProgramError| GuardError::Load(e.to_string()))?;

        program.load().map_err(|e| GuardError::Load(e.to_string()))?;
        let link = program
            .attach(iface, flags)
            .map_err(|e| GuardError::Attach {
                iface: iface.to_string(),
                reason: e.to_string(),
            })?;

        self.link = Some(link);
        info!(interface = iface, mode, "XDP program attached");
        Ok(())
    }

    /// Detach the program from its interface. Safe to call repeatedly and
    /// after a failed attach; only the first call after a successful
    /// attach does any work.
    pub fn detach(&mut self) -> Result<(), GuardError> {
        let Some(link) = self.link.take() else {
            return Ok(());
        };

        let program: &mut Xdp = self
            .ebpf
            .program_mut(PROGRAM_NAME)
            .ok_or_else(|| GuardError::Load(format!("program '{PROGRAM_NAME}' not in object")))?
            .try_into()
            .map_err(|e: aya::programs::ProgramError| GuardError::Load(e.to_string()))?;

        program
            .detach(link)
            .map_err(|e| GuardError::Load(e.to_string()))?;
        info!("XDP program detached");
        Ok(())
    }

    /// Borrow the inner `Ebpf` instance mutably.
    ///
    /// Used by the config map manager and the event reader to take maps.
    pub fn ebpf_mut(&mut self) -> &mut Ebpf {
        &mut self.ebpf
    }
}

/// Remove the locked-memory limit for this process.
fn raise_memlock_limit() -> Result<(), GuardError> {
    let rlim = libc::rlimit {
        rlim_cur: libc::RLIM_INFINITY,
        rlim_max: libc::RLIM_INFINITY,
    };
    let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
    if ret != 0 {
        return Err(GuardError::Privilege(std::io::Error::last_os_error()));
    }
    Ok(())
}

/// Resolve an interface name to its index.
fn resolve_ifindex(iface: &str) -> Result<u32, GuardError> {
    let name =
        CString::new(iface).map_err(|_| GuardError::Interface(iface.to_string()))?;
    let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
    if index == 0 {
        return Err(GuardError::Interface(iface.to_string()));
    }
    Ok(index)
}

/// Map a mode string to XDP attach flags.
///
/// `generic`/`skb` run above the driver (slow, universally supported),
/// `native` in the driver, `hw` offloaded to the NIC. Anything else falls
/// back to generic with a warning.
pub fn xdp_flags_for_mode(mode: &str) -> XdpFlags {
    match mode {
        "generic" | "skb" => XdpFlags::SKB_MODE,
        "native" => XdpFlags::DRV_MODE,
        "hw" => XdpFlags::HW_MODE,
        other => {
            warn!(mode = other, "unknown XDP mode, falling back to generic");
            XdpFlags::SKB_MODE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_modes_map_to_their_flags() {
        assert_eq!(xdp_flags_for_mode("generic").bits(), XdpFlags::SKB_MODE.bits());
        assert_eq!(xdp_flags_for_mode("skb").bits(), XdpFlags::SKB_MODE.bits());
        assert_eq!(xdp_flags_for_mode("native").bits(), XdpFlags::DRV_MODE.bits());
        assert_eq!(xdp_flags_for_mode("hw").bits(), XdpFlags::HW_MODE.bits());
    }

    #[test]
    fn unknown_mode_falls_back_to_generic() {
        assert_eq!(xdp_flags_for_mode("turbo").bits(), XdpFlags::SKB_MODE.bits());
        assert_eq!(xdp_flags_for_mode("").bits(), XdpFlags::SKB_MODE.bits());
    }

    #[test]
    fn loopback_interface_resolves() {
        assert!(resolve_ifindex("lo").is_ok());
    }

    #[test]
    fn bogus_interface_is_rejected() {
        assert!(matches!(
            resolve_ifindex("no-such-iface0"),
            Err(GuardError::Interface(_))
        ));
    }
}
