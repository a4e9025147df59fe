use clap::Parser;
use infrastructure::config::{LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "synshield-agent",
    about = "XDP-based SSH brute-force guard",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Network interface to attach to (e.g. eth0)
    #[arg(short, long, visible_alias = "interface")]
    pub iface: String,

    /// TCP destination port to protect
    #[arg(long, default_value_t = 22)]
    pub port: u16,

    /// Ban threshold within the time window
    #[arg(long, default_value_t = 5)]
    pub max_attempts: u32,

    /// Sliding window length in seconds
    #[arg(long, default_value_t = 60)]
    pub time_window: u64,

    /// Ban duration in seconds
    #[arg(long, default_value_t = 300)]
    pub block_time: u64,

    /// XDP attach mode: generic (default), skb, native, or hw
    #[arg(long, default_value = "generic")]
    pub mode: String,

    /// Per-CPU event ring size in pages
    #[arg(long, default_value_t = 8)]
    pub perf_pages: usize,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: json (production) or text (development)
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["synshield-agent", "--iface", "eth0"]).unwrap();
        assert_eq!(cli.iface, "eth0");
        assert_eq!(cli.port, 22);
        assert_eq!(cli.max_attempts, 5);
        assert_eq!(cli.time_window, 60);
        assert_eq!(cli.block_time, 300);
        assert_eq!(cli.mode, "generic");
        assert_eq!(cli.perf_pages, 8);
        assert_eq!(cli.log_level, LogLevel::Info);
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn cli_interface_is_required() {
        assert!(Cli::try_parse_from(["synshield-agent"]).is_err());
    }

    #[test]
    fn cli_interface_long_alias() {
        let cli = Cli::try_parse_from(["synshield-agent", "--interface", "wlan0"]).unwrap();
        assert_eq!(cli.iface, "wlan0");
    }

    #[test]
    fn cli_full_policy() {
        let cli = Cli::try_parse_from([
            "synshield-agent",
            "--iface",
            "eth1",
            "--port",
            "2222",
            "--max-attempts",
            "3",
            "--time-window",
            "30",
            "--block-time",
            "600",
            "--mode",
            "native",
            "--perf-pages",
            "16",
        ])
        .unwrap();
        assert_eq!(cli.port, 2222);
        assert_eq!(cli.max_attempts, 3);
        assert_eq!(cli.time_window, 30);
        assert_eq!(cli.block_time, 600);
        assert_eq!(cli.mode, "native");
        assert_eq!(cli.perf_pages, 16);
    }

    #[test]
    fn cli_log_level_override() {
        let cli =
            Cli::try_parse_from(["synshield-agent", "--iface", "eth0", "--log-level", "debug"])
                .unwrap();
        assert_eq!(cli.log_level, LogLevel::Debug);
    }

    #[test]
    fn cli_log_format_json() {
        let cli =
            Cli::try_parse_from(["synshield-agent", "--iface", "eth0", "--log-format", "json"])
                .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn cli_invalid_log_level_rejected() {
        let result =
            Cli::try_parse_from(["synshield-agent", "--iface", "eth0", "--log-level", "banana"]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_non_numeric_port_rejected() {
        let result = Cli::try_parse_from(["synshield-agent", "--iface", "eth0", "--port", "ssh"]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_mode_is_free_form() {
        // Unknown modes are accepted here; the loader warns and falls
        // back to generic at attach time.
        let cli = Cli::try_parse_from(["synshield-agent", "--iface", "eth0", "--mode", "turbo"])
            .unwrap();
        assert_eq!(cli.mode, "turbo");
    }
}
