//! keyhook-monitor entry point.
//!
//! Installs the system-wide keyboard hook, logs dispatched keys and swallows
//! the chords listed in the config file until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load MonitorConfig        -- CLI arg, KEYHOOK_CONFIG, or platform dir
//!  └─ init tracing              -- RUST_LOG overrides config log level
//!  └─ HookManager::install()    -- WH_KEYBOARD_LL on this thread
//!  └─ run_message_loop()        -- hook callbacks run in here
//!       ▲
//!       └─ "keyhook-signal" thread: awaits Ctrl-C, posts WM_QUIT
//! ```

use std::path::PathBuf;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use keyhook::config::{self, MonitorConfig};

fn main() -> anyhow::Result<()> {
    let explicit = std::env::args_os().nth(1).map(PathBuf::from);
    let path = config::config_file_path(explicit.as_deref())?;
    let config = config::load_config_from(&path)
        .with_context(|| format!("loading config from {}", path.display()))?;

    init_logging(&config);
    tracing::info!(config = %path.display(), "keyhook-monitor starting");

    run(config)
}

/// Initialises structured logging. `RUST_LOG` overrides the configured level.
fn init_logging(config: &MonitorConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.monitor.log_level)),
        )
        .init();
}

#[cfg(target_os = "windows")]
fn run(config: MonitorConfig) -> anyhow::Result<()> {
    use keyhook::monitor::KeyMonitor;
    use keyhook::platform::windows::{current_thread_id, run_message_loop};
    use keyhook::HookManager;
    use tracing::{info, warn};

    let mut manager = HookManager::new();
    let _monitor = KeyMonitor::attach(&manager, &config).context("attaching key monitor")?;
    manager.install().context("installing keyboard hook")?;

    spawn_shutdown_listener(current_thread_id())?;
    info!("keyhook-monitor ready.  Press Ctrl-C to exit.");

    run_message_loop();

    if let Err(e) = manager.uninstall() {
        warn!(error = %e, "keyboard hook was not removed cleanly");
    }
    info!("keyhook-monitor stopped");
    Ok(())
}

/// Waits for Ctrl-C on a helper thread, then stops the hook thread's message loop.
#[cfg(target_os = "windows")]
fn spawn_shutdown_listener(hook_thread: u32) -> anyhow::Result<()> {
    use tracing::{error, info};

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building signal runtime")?;

    std::thread::Builder::new()
        .name("keyhook-signal".to_string())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => info!("shutdown signal received"),
                    Err(e) => error!(error = %e, "failed to listen for Ctrl-C; shutting down"),
                }
            });
            if let Err(code) = keyhook::platform::windows::post_quit(hook_thread) {
                error!(code, "failed to post WM_QUIT to hook thread");
            }
        })
        .context("spawning signal thread")?;
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn run(config: MonitorConfig) -> anyhow::Result<()> {
    tracing::error!(
        suppress = config.suppress.keys.len(),
        "low-level keyboard hooks are only available on Windows"
    );
    anyhow::bail!("platform not supported: {}", std::env::consts::OS)
}
