//! Logging is live while the configuration is resolved

use nihtb_common::config::{load_config, ConfigFileResolver, CONFIG_ENV_VAR};
use nihtb_proc::config::{ProcConfig, APP_NAME};
use nihtb_proc::logging;
use std::io;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'w> MakeWriter<'w> for Captured {
    type Writer = Captured;

    fn make_writer(&'w self) -> Self::Writer {
        self.clone()
    }
}

// One test only: it changes process environment variables.
#[test]
fn test_config_resolution_warnings_are_logged_then_config_level_applies() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");
    std::env::remove_var("RUST_LOG");
    std::env::set_var(CONFIG_ENV_VAR, &missing);

    let captured = Captured::default();
    let (subscriber, level) = logging::subscriber(None, captured.clone()).unwrap();
    assert!(!level.is_pinned());

    tracing::subscriber::with_default(subscriber, || {
        let resolver = ConfigFileResolver::new(APP_NAME);
        let (config, _path): (ProcConfig, _) = load_config(&resolver, None).unwrap();
        assert_eq!(config, ProcConfig::default());

        level.apply_config_level("warn").unwrap();
        tracing::info!("suppressed after the configured level applies");
        tracing::warn!("still shown at warn");
    });

    std::env::remove_var(CONFIG_ENV_VAR);

    let output = captured.contents();
    assert!(output.contains("does not exist; ignoring"), "{}", output);
    assert!(output.contains(&missing.display().to_string()), "{}", output);
    assert!(!output.contains("suppressed after the configured level applies"));
    assert!(output.contains("still shown at warn"));

    let (_subscriber, level) = logging::subscriber(Some("debug"), Captured::default()).unwrap();
    assert!(level.is_pinned());
    assert!(logging::subscriber(Some("nihtb=loudest"), Captured::default()).is_err());
}
