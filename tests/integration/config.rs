//! Engine configuration loaded from TOML.

use anyhow::Result;
use liqrs::config::{EngineConfig, parse_config};
use liqrs::core::LimitKind;
use liqrs::{Engine, Error, Flavor, ParseError, Registry, RenderError, Value};

const CONFIG: &str = r#"
[parse]
flavor = "strict"
strip_space_around_tags = true
max_size_bytes = 4096

[protection]
max_iterations = 3
max_depth = 8
"#;

#[test]
fn test_config_file_drives_engine() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("liqrs.toml");
    std::fs::write(&path, CONFIG)?;

    let config: EngineConfig = parse_config(&path)?;
    assert_eq!(config.parse.flavor, Flavor::Strict);
    assert!(config.parse.strip_space_around_tags);
    assert_eq!(config.protection.max_iterations, 3);
    assert!(config.protection.enabled);

    let engine = Engine::from_config_file(&path)?;
    assert_eq!(engine.config(), &config);

    let output = engine.render_str("{% for i in (1..3) %}\n{{ i }}\n{% endfor %}", &Value::Nil)?;
    assert_eq!(output, "1\n2\n3\n");

    let err = engine.render_str("{% for i in (1..4) %}{% endfor %}", &Value::Nil).unwrap_err();
    assert!(matches!(
        err,
        Error::Render(RenderError::LimitExceeded {
            limit: LimitKind::Iterations,
            ..
        })
    ));

    let err = engine.render_str("{{ nope }}", &Value::Nil).unwrap_err();
    assert!(matches!(err, Error::Render(RenderError::UndefinedVariable { .. })));
    Ok(())
}

#[test]
fn test_size_limit_from_config() -> Result<()> {
    let config = EngineConfig::from_toml_str("[parse]\nmax_size_bytes = 8\n")?;
    let engine = Engine::new(Registry::standard(), config);
    assert!(matches!(engine.parse("0123456789"), Err(ParseError::SizeExceeded { .. })));
    assert!(engine.parse("01234567").is_ok());
    Ok(())
}

#[test]
fn test_invalid_config_is_reported() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[parse]\nflavor = \"loose\"\n")?;

    let err = Engine::from_config_file(&path).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.format_with_context().contains("Invalid Configuration"));
    Ok(())
}

#[test]
fn test_round_trip_through_toml() -> Result<()> {
    let config = EngineConfig::from_toml_str(CONFIG)?;
    let text = config.to_toml_string()?;
    assert_eq!(EngineConfig::from_toml_str(&text)?, config);
    Ok(())
}
