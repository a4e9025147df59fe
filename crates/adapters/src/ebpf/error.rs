use thiserror::Error;

/// Failure kinds for the eBPF control plane. Everything here except
/// `Ring` read failures is fatal at startup.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("raising the memlock limit failed (insufficient privileges?): {0}")]
    Privilege(#[source] std::io::Error),

    #[error("loading the XDP object failed: {0}")]
    Load(String),

    #[error("unknown network interface '{0}'")]
    Interface(String),

    #[error("attaching to interface '{iface}' failed: {reason}")]
    Attach { iface: String, reason: String },

    #[error("table '{name}': {reason}")]
    Table { name: &'static str, reason: String },

    #[error("event ring setup failed: {0}")]
    Ring(String),
}

impl GuardError {
    pub(crate) fn table(name: &'static str, reason: impl ToString) -> Self {
        Self::Table {
            name,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_failing_piece() {
        let err = GuardError::Interface("eth9".to_string());
        assert!(err.to_string().contains("eth9"));

        let err = GuardError::table("SSH_CONFIG", "not found in eBPF object");
        assert!(err.to_string().contains("SSH_CONFIG"));
        assert!(err.to_string().contains("not found"));

        let err = GuardError::Attach {
            iface: "eth0".to_string(),
            reason: "driver refused".to_string(),
        };
        assert!(err.to_string().contains("eth0"));
    }
}
