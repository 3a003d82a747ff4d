//! Log subscriber setup
//!
//! The subscriber is installed before the configuration file is resolved so
//! that resolution messages reach the log. The level from the file is applied
//! afterwards, unless `RUST_LOG` or `--log-level` already chose one.

use anyhow::{Context, Result};
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

/// Level used until the configuration file is read
pub const DEFAULT_LEVEL: &str = "info";

/// Applies the configured level once the configuration is loaded
pub struct LogLevelHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    /// Set when `RUST_LOG` or the command line fixed the level
    pinned: bool,
}

impl LogLevelHandle {
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Switch to `level` unless the level is pinned
    pub fn apply_config_level(&self, level: &str) -> Result<()> {
        if self.pinned {
            return Ok(());
        }
        let filter = parse_level(level)?;
        self.handle
            .reload(filter)
            .context("Failed to apply configured log level")
    }
}

fn parse_level(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{}'", level))
}

/// Build the subscriber, writing formatted events to `writer`
///
/// `RUST_LOG` wins over `cli_level`; with neither, [`DEFAULT_LEVEL`] applies
/// until [`LogLevelHandle::apply_config_level`] is called.
pub fn subscriber<W>(
    cli_level: Option<&str>,
    writer: W,
) -> Result<(impl Subscriber + Send + Sync + 'static, LogLevelHandle)>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let (filter, pinned) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => match cli_level {
            Some(level) => (parse_level(level)?, true),
            None => (EnvFilter::new(DEFAULT_LEVEL), false),
        },
    };
    let (filter, handle) = reload::Layer::new(filter);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer));
    Ok((subscriber, LogLevelHandle { handle, pinned }))
}

/// Install the global subscriber on stdout
pub fn init(cli_level: Option<&str>) -> Result<LogLevelHandle> {
    let (subscriber, handle) = subscriber(cli_level, std::io::stdout)?;
    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")?;
    Ok(handle)
}
