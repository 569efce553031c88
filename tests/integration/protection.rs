//! Resource limits enforced while rendering.
//!
//! These tests verify that:
//! - a loop limit of N accepts N iterations and rejects N + 1, for every loop construct
//! - nesting depth, render time and output size each trip their own limit
//! - a tripped limit aborts the render without output
//! - disabled protection performs no checks
//! - values built in variables are held to the same limits as output
//! - deeply nested or very long expressions fail to parse instead of
//!   exhausting the stack

use std::time::Duration;

use anyhow::Result;
use liqrs::core::LimitKind;
use liqrs::{ParseError, ParseSettings, ProtectionSettings, Registry, RenderError, Template, Value};

fn limit_of(result: Result<String, RenderError>) -> Option<LimitKind> {
    match result {
        Err(RenderError::LimitExceeded {
            limit,
            ..
        }) => Some(limit),
        _ => None,
    }
}

fn with_iterations(max: usize) -> ProtectionSettings {
    ProtectionSettings::builder().max_iterations(max).build()
}

#[test]
fn test_iteration_limit_boundary_for_loops() -> Result<()> {
    let settings = with_iterations(5);

    let ok = Template::parse("{% for i in (1..5) %}{{ i }}{% endfor %}")?;
    assert_eq!(ok.render_with(&Value::Nil, &settings)?, "12345");

    let too_many = Template::parse("{% for i in (1..6) %}{{ i }}{% endfor %}")?;
    assert_eq!(limit_of(too_many.render_with(&Value::Nil, &settings)), Some(LimitKind::Iterations));
    Ok(())
}

#[test]
fn test_iteration_limit_applies_to_arrays_and_tablerow() -> Result<()> {
    let settings = with_iterations(3);
    let data = Value::from(serde_json::json!({"small": [1, 2, 3], "large": [1, 2, 3, 4]}));

    let template = Template::parse("{% for i in small %}{{ i }}{% endfor %}")?;
    assert_eq!(template.render_with(&data, &settings)?, "123");

    let template = Template::parse("{% for i in large %}{{ i }}{% endfor %}")?;
    assert_eq!(limit_of(template.render_with(&data, &settings)), Some(LimitKind::Iterations));

    let template = Template::parse("{% tablerow i in large %}{{ i }}{% endtablerow %}")?;
    assert_eq!(limit_of(template.render_with(&data, &settings)), Some(LimitKind::Iterations));
    Ok(())
}

#[test]
fn test_limit_applies_after_offset_and_limit_options() -> Result<()> {
    let template = Template::parse("{% for i in (1..100) limit: 3 %}{{ i }}{% endfor %}")?;
    assert_eq!(template.render_with(&Value::Nil, &with_iterations(3))?, "123");
    Ok(())
}

#[test]
fn test_huge_ranges_fail_without_materializing() -> Result<()> {
    let template = Template::parse("{% for i in (1..9000000000000) %}{{ i }}{% endfor %}")?;
    let err = template.render_with(&Value::Nil, &with_iterations(1_000)).unwrap_err();
    match err {
        RenderError::LimitExceeded {
            limit,
            observed,
            max,
        } => {
            assert_eq!(limit, LimitKind::Iterations);
            assert_eq!(max, 1_000);
            assert!(observed > max);
        }
        other => panic!("expected a limit error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_depth_limit() -> Result<()> {
    let settings = ProtectionSettings::builder().max_depth(3).build();

    let shallow = Template::parse("{% if true %}{% if true %}{% if true %}x{% endif %}{% endif %}{% endif %}")?;
    assert_eq!(shallow.render_with(&Value::Nil, &settings)?, "x");

    let deep = Template::parse(
        "{% for a in (1..1) %}{% for b in (1..1) %}{% for c in (1..1) %}{% for d in (1..1) %}x{% endfor %}{% endfor %}{% endfor %}{% endfor %}",
    )?;
    assert_eq!(limit_of(deep.render_with(&Value::Nil, &settings)), Some(LimitKind::Depth));
    Ok(())
}

#[test]
fn test_recursive_partial_hits_depth_limit() -> Result<()> {
    let registry = Registry::standard().with_partial("again", "{% include 'again' %}", &ParseSettings::default())?;
    let template = Template::parse_with("{% include 'again' %}", &ParseSettings::default(), registry.into())?;

    let settings = ProtectionSettings::builder().max_depth(20).build();
    assert_eq!(limit_of(template.render_with(&Value::Nil, &settings)), Some(LimitKind::Depth));
    Ok(())
}

#[test]
fn test_render_time_limit() -> Result<()> {
    let template = Template::parse("{% for i in (1..1000000) %}{{ i | times: 2 }}{% endfor %}")?;
    let settings = ProtectionSettings::builder().max_render_time(Duration::from_millis(1)).build();
    assert_eq!(limit_of(template.render_with(&Value::Nil, &settings)), Some(LimitKind::RenderTime));
    Ok(())
}

#[test]
fn test_output_limit() -> Result<()> {
    let template = Template::parse("{% for i in (1..100) %}0123456789{% endfor %}")?;

    let settings = ProtectionSettings::builder().max_output_bytes(1_000).build();
    assert_eq!(template.render_with(&Value::Nil, &settings)?.len(), 1_000);

    let settings = ProtectionSettings::builder().max_output_bytes(999).build();
    assert_eq!(limit_of(template.render_with(&Value::Nil, &settings)), Some(LimitKind::OutputSize));
    Ok(())
}

#[test]
fn test_doubling_assign_hits_output_limit() -> Result<()> {
    let template = Template::parse(
        "{% assign s = 'x' %}{% for i in (1..24) %}{% assign s = s | append: s %}{% endfor %}{{ s | size }}",
    )?;
    let settings = ProtectionSettings::builder().max_output_bytes(1_000).build();
    assert_eq!(limit_of(template.render_with(&Value::Nil, &settings)), Some(LimitKind::OutputSize));

    let template = Template::parse(
        "{% capture s %}x{% endcapture %}{% for i in (1..24) %}{% capture s %}{{ s }}{{ s }}{% endcapture %}{% endfor %}",
    )?;
    assert_eq!(limit_of(template.render_with(&Value::Nil, &settings)), Some(LimitKind::OutputSize));
    Ok(())
}

#[test]
fn test_growing_arrays_hit_iteration_limit() -> Result<()> {
    let template = Template::parse(
        "{% assign a = 'x' | split: ',' %}{% for i in (1..30) %}{% assign a = a | concat: a %}{% endfor %}{{ a | size }}",
    )?;
    let settings = with_iterations(100);
    assert_eq!(limit_of(template.render_with(&Value::Nil, &settings)), Some(LimitKind::Iterations));
    Ok(())
}

#[test]
fn test_long_condition_parses_and_renders() -> Result<()> {
    let source = format!("{{% if {}true %}}x{{% endif %}}", "true and ".repeat(50_000));
    let template = Template::parse(&source)?;
    assert_eq!(template.render(&Value::Nil)?, "x");
    Ok(())
}

#[test]
fn test_deep_expression_nesting_is_a_parse_error() {
    let parens = format!("{{{{ {} }}}}", "(".repeat(20_000));
    assert!(matches!(Template::parse(&parens), Err(ParseError::TooDeep { .. })));

    let brackets = format!("{{{{ a{} }}}}", "[a".repeat(20_000));
    assert!(matches!(Template::parse(&brackets), Err(ParseError::TooDeep { .. })));

    let settings = ParseSettings::builder().max_depth(2).build();
    assert!(liqrs::parse("{{ a[b[0]] }}", &settings).is_ok());
    assert!(matches!(
        liqrs::parse("{{ a[b[c[0]]] }}", &settings),
        Err(ParseError::TooDeep { limit: 2, .. })
    ));
}

#[test]
fn test_disabled_protection_skips_checks() -> Result<()> {
    let settings = ProtectionSettings::builder()
        .max_iterations(1)
        .max_depth(1)
        .max_output_bytes(1)
        .enabled(false)
        .build();
    let template = Template::parse("{% for i in (1..3) %}{% if true %}{{ i }}{% endif %}{% endfor %}")?;
    assert_eq!(template.render_with(&Value::Nil, &settings)?, "123");

    let template = Template::parse("{% for i in (1..3) %}{{ i }}{% endfor %}")?;
    assert_eq!(template.render_with(&Value::Nil, &ProtectionSettings::disabled())?, "123");
    Ok(())
}

#[test]
fn test_template_default_protection_can_be_replaced() -> Result<()> {
    let template = Template::parse("{% for i in (1..3) %}{{ i }}{% endfor %}")?.with_protection(with_iterations(2));
    assert_eq!(limit_of(template.render(&Value::Nil)), Some(LimitKind::Iterations));
    Ok(())
}

#[test]
fn test_limit_report_is_readable() -> Result<()> {
    let template = Template::parse("{% for i in (1..3) %}{% endfor %}")?;
    let err = liqrs::Error::from(template.render_with(&Value::Nil, &with_iterations(2)).unwrap_err());
    let report = err.format_with_context();
    assert!(report.contains("Resource Limit Exceeded"), "{report}");
    assert!(report.contains("Maximum: 2"), "{report}");
    Ok(())
}
