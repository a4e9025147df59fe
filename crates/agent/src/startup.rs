use std::net::Ipv4Addr;
use std::path::Path;

use adapters::ebpf::{BanEventReader, ConfigMapManager, GuardLoader};
use anyhow::Result;
use ebpf_common::config::GuardConfig;
use ebpf_common::event::BanEvent;
use infrastructure::constants::{
    DEFAULT_EBPF_PROGRAM_DIR, DEFAULT_EBPF_PROGRAM_DIR_DEV, EBPF_PROGRAM_NAME,
    EVENT_CHANNEL_CAPACITY, GRACEFUL_SHUTDOWN_TIMEOUT,
};
use infrastructure::logging::init_logging;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::Cli;

/// Run the supervisor: load, configure, attach, consume ban events,
/// tear down on signal.
pub async fn run(cli: &Cli) -> Result<()> {
    // ── 1. Initialize logging ───────────────────────────────────────
    init_logging(cli.log_level, cli.log_format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        interface = %cli.iface,
        "synshield starting"
    );

    // ── 2. Load the XDP object ──────────────────────────────────────
    let ebpf_dir = resolve_ebpf_program_dir();
    let program_bytes = read_ebpf_program(&ebpf_dir, EBPF_PROGRAM_NAME)?;
    let mut loader = GuardLoader::load(&program_bytes)?;

    // ── 3. Program the policy before attach ─────────────────────────
    let mut config_map = ConfigMapManager::new(loader.ebpf_mut())?;
    let cfg = GuardConfig::new(
        u32::from(cli.port),
        cli.max_attempts,
        cli.time_window,
        cli.block_time,
    );
    config_map.write(&cfg)?;

    // ── 4. Attach to the interface ──────────────────────────────────
    loader.attach(&cli.iface, &cli.mode)?;

    // Echo the policy the kernel actually sees.
    match config_map.read() {
        Ok(active) => info!(
            ssh_port = active.ssh_port,
            max_attempts = active.max_attempts,
            time_window_secs = active.time_window_ns / 1_000_000_000,
            block_time_secs = active.block_time_ns / 1_000_000_000,
            "active policy"
        ),
        Err(e) => warn!(error = %e, "policy read-back failed"),
    }

    // ── 5. Start the event consumer ─────────────────────────────────
    let cancel = shutdown_token()?;
    let (event_tx, mut event_rx) = mpsc::channel::<BanEvent>(EVENT_CHANNEL_CAPACITY);
    let reader = BanEventReader::new(loader.ebpf_mut(), cli.perf_pages)?;
    let reader_handles = reader.spawn(event_tx, cancel.clone())?;

    info!(
        port = cli.port,
        max_attempts = cli.max_attempts,
        time_window_secs = cli.time_window,
        block_time_secs = cli.block_time,
        mode = %cli.mode,
        perf_pages = cli.perf_pages,
        "SSH protection started"
    );

    // ── 6. Event loop until signal ──────────────────────────────────
    loop {
        tokio::select! {
            maybe_event = event_rx.recv() => match maybe_event {
                Some(event) => {
                    let ip = Ipv4Addr::from(event.ip);
                    info!("Banning IP: {ip}, Attempts: {}", event.count);
                }
                // All readers gone; nothing left to report.
                None => break,
            },
            () = cancel.cancelled() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    // ── 7. Ordered teardown; every step runs even if one fails ──────
    cancel.cancel();
    for handle in reader_handles {
        let _ = tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, handle).await;
    }
    if let Err(e) = loader.detach() {
        warn!(error = %e, "detach failed");
    }
    drop(config_map);
    drop(loader);

    info!("synshield stopped");
    Ok(())
}

/// Token cancelled by the first SIGINT or SIGTERM; clones of it go to
/// every reader task. XDP only exists on Linux, so plain Unix signal
/// streams suffice. Handler installation failure is a startup error,
/// not a panic.
fn shutdown_token() -> Result<CancellationToken> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = interrupt.recv() => {},
            _ = terminate.recv() => {},
        }
        signal_token.cancel();
    });

    Ok(token)
}

/// Resolve the directory containing the compiled XDP object.
///
/// Precedence: `EBPF_PROGRAM_DIR` env var > production default
/// (`/usr/local/lib/synshield`) > dev fallback
/// (`target/bpfel-unknown-none/release`).
fn resolve_ebpf_program_dir() -> String {
    if let Ok(dir) = std::env::var("EBPF_PROGRAM_DIR") {
        return dir;
    }
    if Path::new(DEFAULT_EBPF_PROGRAM_DIR).is_dir() {
        DEFAULT_EBPF_PROGRAM_DIR.to_string()
    } else {
        DEFAULT_EBPF_PROGRAM_DIR_DEV.to_string()
    }
}

/// Read the compiled XDP object from the program directory.
fn read_ebpf_program(dir: &str, name: &str) -> Result<Vec<u8>> {
    let path = Path::new(dir).join(name);
    std::fs::read(&path)
        .map_err(|e| anyhow::anyhow!("failed to read eBPF program '{}': {e}", path.display()))
}
