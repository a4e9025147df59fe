use aya::maps::{Array, MapData};
use aya::Ebpf;
use ebpf_common::config::{GuardConfig, CONFIG_SLOT};
use tracing::info;

use crate::ebpf::error::GuardError;

/// Manages the single-slot `SSH_CONFIG` eBPF `Array`.
///
/// Userspace writes the runtime policy once before attach; the XDP
/// program re-reads it on every packet, so later writes take effect on
/// the next packet without any synchronization barrier.
pub struct ConfigMapManager {
    config_map: Array<MapData, GuardConfig>,
}

impl ConfigMapManager {
    /// Take ownership of the `SSH_CONFIG` map from the loaded object.
    pub fn new(ebpf: &mut Ebpf) -> Result<Self, GuardError> {
        let map = ebpf
            .take_map("SSH_CONFIG")
            .ok_or_else(|| GuardError::table("SSH_CONFIG", "not found in eBPF object"))?;
        let config_map =
            Array::try_from(map).map_err(|e| GuardError::table("SSH_CONFIG", e))?;
        info!("SSH_CONFIG map acquired");
        Ok(Self { config_map })
    }

    /// Write the policy to slot 0.
    pub fn write(&mut self, cfg: &GuardConfig) -> Result<(), GuardError> {
        self.config_map
            .set(CONFIG_SLOT, cfg, 0)
            .map_err(|e| GuardError::table("SSH_CONFIG", e))?;
        info!(
            ssh_port = cfg.ssh_port,
            max_attempts = cfg.max_attempts,
            time_window_ns = cfg.time_window_ns,
            block_time_ns = cfg.block_time_ns,
            "guard policy written"
        );
        Ok(())
    }

    /// Read back the policy currently visible to the kernel.
    pub fn read(&self) -> Result<GuardConfig, GuardError> {
        self.config_map
            .get(&CONFIG_SLOT, 0)
            .map_err(|e| GuardError::table("SSH_CONFIG", e))
    }
}
