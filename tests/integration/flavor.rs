//! Strict versus Liquid flavor.
//!
//! These tests verify that:
//! - undefined variables render as empty under Liquid and fail under Strict
//! - grammar leniencies (`<>`, empty outputs, trailing tokens) are Liquid-only
//! - type mismatches are tolerated under Liquid and reported under Strict
//! - Liquid `assign` binds render-wide without hiding inner bindings
//! - error reports carry suggestions

use anyhow::Result;
use liqrs::test_utils::{render, render_strict};
use liqrs::{Error, Flavor, ParseError, ParseSettings, RenderError, Template, Value, parse};
use serde_json::json;

fn strict(source: &str) -> Result<Template, ParseError> {
    parse(source, &ParseSettings::with_flavor(Flavor::Strict))
}

#[test]
fn test_undefined_variable_is_empty_under_liquid() {
    assert_eq!(render("[{{ missing }}][{{ user.missing.deeper }}]", json!({"user": {}})), "[][]");
    assert_eq!(render("{% if missing %}yes{% else %}no{% endif %}", json!({})), "no");
}

#[test]
fn test_undefined_variable_fails_under_strict() -> Result<()> {
    let template = strict("Hello {{ usr.name }}")?;
    let data = Value::from(json!({"user": {"name": "Ada"}}));

    match template.render(&data) {
        Err(RenderError::UndefinedVariable {
            name,
            suggestion,
            ..
        }) => {
            assert_eq!(name, "usr");
            assert_eq!(suggestion.as_deref(), Some("user"));
        }
        other => panic!("expected undefined variable, got {other:?}"),
    }

    let report = Error::from(template.render(&data).unwrap_err()).format_with_context();
    assert!(report.contains("Did you mean 'user'?"), "{report}");
    assert!(report.contains("Available variables"), "{report}");
    Ok(())
}

#[test]
fn test_diamond_operator() -> Result<()> {
    assert_eq!(render("{% if 1 <> 2 %}different{% endif %}", json!({})), "different");
    assert!(matches!(strict("{% if 1 <> 2 %}x{% endif %}"), Err(ParseError::Syntax { .. })));
    Ok(())
}

#[test]
fn test_empty_output() -> Result<()> {
    assert_eq!(render("a{{ }}b", json!({})), "ab");
    assert!(matches!(strict("a{{ }}b"), Err(ParseError::Syntax { .. })));
    Ok(())
}

#[test]
fn test_trailing_tokens() -> Result<()> {
    assert_eq!(render("{{ 'a' 'b' }}", json!({})), "a");
    assert!(matches!(strict("{{ 'a' 'b' }}"), Err(ParseError::Syntax { .. })));
    Ok(())
}

#[test]
fn test_comparison_type_mismatch() {
    assert_eq!(render("{% if 1 < 'a' %}yes{% else %}no{% endif %}", json!({})), "no");
    let err = render_strict("{% if 1 < 'a' %}yes{% endif %}", json!({})).unwrap_err();
    assert!(matches!(err, Error::Render(RenderError::TypeMismatch { .. })));
}

#[test]
fn test_iterating_a_number() {
    assert_eq!(render("{% for i in n %}{{ i }}{% else %}none{% endfor %}", json!({"n": 5})), "none");
    let err = render_strict("{% for i in n %}{{ i }}{% endfor %}", json!({"n": 5})).unwrap_err();
    assert!(matches!(err, Error::Render(RenderError::TypeMismatch { .. })));
}

#[test]
fn test_liquid_assign_does_not_replace_loop_variable() {
    let output = render(
        "{% for item in list %}{% assign item = 'x' %}{{ item }}{% endfor %}|{{ item }}",
        json!({"list": [1, 2]}),
    );
    assert_eq!(output, "12|x");
}

#[test]
fn test_strict_template_renders_well_formed_input() -> Result<()> {
    let output = render_strict(
        "{% assign total = 0 %}{% for p in prices %}{% assign total = total | plus: p %}{{ total }} {% endfor %}",
        json!({"prices": [1, 2, 3]}),
    )?;
    assert_eq!(output, "1 3 6 ");
    Ok(())
}

#[test]
fn test_unknown_filter_report() {
    let err = render_strict("{{ 'x' | upcse }}", json!({})).unwrap_err();
    let report = err.format_with_context();
    assert!(report.contains("Unknown Filter"), "{report}");
    assert!(report.contains("Did you mean 'upcase'?"), "{report}");
}

#[test]
fn test_parse_error_report_points_at_source() {
    let err = Error::from(Template::parse("line one\n{% iff x %}\n").unwrap_err());
    let report = err.format_with_context();
    assert!(report.contains("2 | {% iff x %}"), "{report}");
    assert!(report.contains("Did you mean 'if'?"), "{report}");
}
