use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Where log lines go. The TUI owns the terminal, so interactive runs log to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over `default_filter`.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init(target: &LogTarget, default_filter: &str) -> std::io::Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(default_filter));

    let installed = match target {
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .is_ok()
        }
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init().is_ok(),
    };

    if installed {
        tracing::debug!(?target, "logging initialised");
    }
    Ok(())
}
