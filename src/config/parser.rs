//! TOML loading for engine configuration.
//!
//! Generic over any `DeserializeOwned` type so hosts can embed the engine's
//! settings inside their own configuration structs.
//!
//! Example error output:
//! ```text
//! Failed to parse config file: /path/to/liqrs.toml
//! Caused by:
//!     unknown variant `lax`, expected `strict` or `liquid`
//! ```

use anyhow::{Context, Result};
use std::path::Path;

/// Parse a TOML configuration file into the specified type.
///
/// # Errors
///
/// Fails when the file cannot be read or its contents do not deserialize
/// into `T`. Both cases carry the file path as context.
///
/// # Examples
///
/// ```rust,no_run
/// use liqrs::config::{EngineConfig, parse_config};
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// let config: EngineConfig = parse_config(Path::new("liqrs.toml"))?;
/// println!("flavor: {:?}", config.parse.flavor);
/// # Ok(())
/// # }
/// ```
pub fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: T = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    tracing::debug!("Loaded configuration from {}", path.display());

    Ok(config)
}
