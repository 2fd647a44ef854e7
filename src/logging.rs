use std::io::Write;

use anyhow::{Context, Result};
use log::debug;

use crate::config::LoggingSettings;

/// Installs the global logger.
///
/// A configured log4rs YAML file takes precedence; otherwise `env_logger`
/// is used with `RUST_LOG` falling back to the configured level. Calling
/// this twice is not an error, the second logger is simply ignored.
pub fn init(settings: &LoggingSettings) -> Result<()> {
    if let Some(path) = settings.log4rs_config.as_ref().filter(|path| path.exists()) {
        log4rs::init_file(path, Default::default())
            .with_context(|| format!("failed to load log4rs config: {}", path.display()))?;
        debug!("Logging configured from {}", path.display());
        return Ok(());
    }

    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.level.as_str()),
    )
    .format(|buf, record| {
        writeln!(
            buf,
            "[{}] {} [{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    })
    .try_init();
    Ok(())
}
