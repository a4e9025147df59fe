pub mod ebpf;

pub use ebpf::error::GuardError;
