//! Test helpers for liqrs.
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use liqrs::test_utils::{init_test_logging, render};
//! use serde_json::json;
//!
//! init_test_logging(None);
//! assert_eq!(render("{{ a | plus: 1 }}", json!({"a": 1})), "2");
//! ```

use std::sync::Once;

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::{Flavor, ParseSettings, ProtectionSettings};
use crate::context::Value;
use crate::core::Error;
use crate::template::parse;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise the
/// `RUST_LOG` environment variable; with neither, logging stays off.
///
/// To enable logging in tests via environment variable:
/// ```bash
/// RUST_LOG=liqrs=trace cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Parse and render with explicit settings.
pub fn render_with_settings(
    source: &str,
    data: serde_json::Value,
    settings: &ParseSettings,
    protection: &ProtectionSettings,
) -> Result<String, Error> {
    init_test_logging(None);
    let template = parse(source, settings)?;
    Ok(template.render_with(&Value::from(data), protection)?)
}

/// Render a Liquid-flavor template, panicking on any error.
pub fn render(source: &str, data: serde_json::Value) -> String {
    match render_with_settings(source, data, &ParseSettings::default(), &ProtectionSettings::default()) {
        Ok(output) => output,
        Err(error) => panic!("failed to render {source:?}: {error}"),
    }
}

/// Render a strict-flavor template.
pub fn render_strict(source: &str, data: serde_json::Value) -> Result<String, Error> {
    render_with_settings(
        source,
        data,
        &ParseSettings::with_flavor(Flavor::Strict),
        &ProtectionSettings::default(),
    )
}

/// Show spaces, tabs and line terminators so whitespace assertions read
/// clearly in failure messages.
pub fn visible_whitespace(text: &str) -> String {
    text.replace(' ', "·").replace('\t', "→").replace('\r', "\\r").replace('\n', "\\n\n")
}
