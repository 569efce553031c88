//! Partials registered in the registry and pulled in with `include`.

use std::sync::Arc;

use anyhow::Result;
use liqrs::ast::Node;
use liqrs::{ParseSettings, Registry, RenderError, Template, Value};
use serde_json::json;

fn registry() -> Result<Arc<Registry>> {
    let settings = ParseSettings::default();
    let registry = Registry::standard()
        .with_partial("price", "${{ amount | divided_by: 100.0 }}", &settings)?
        .with_partial("product", "{{ product.title }} ({% include 'price', amount: product.cents %})", &settings)?
        .with_partial("snippets/badge.liquid", "[{{ badge }}]", &settings)?;
    Ok(Arc::new(registry))
}

#[test]
fn test_literal_include_is_linked_at_parse_time() -> Result<()> {
    let template = Template::parse_with("{% include 'product' %}", &ParseSettings::default(), registry()?)?;
    assert!(matches!(template.document().nodes.as_slice(), [Node::Document(_)]));

    let data = Value::from(json!({"product": {"title": "Tea", "cents": 250}}));
    assert_eq!(template.render(&data)?, "Tea ($2.5)");
    Ok(())
}

#[test]
fn test_with_binds_partial_alias() -> Result<()> {
    let template = Template::parse_with(
        "{% include 'snippets/badge.liquid' with label %}",
        &ParseSettings::default(),
        registry()?,
    )?;
    assert_eq!(template.render(&Value::from(json!({"label": "new"})))?, "[new]");
    Ok(())
}

#[test]
fn test_dynamic_partial_name_resolves_at_render_time() -> Result<()> {
    let template = Template::parse_with(
        "{% include name, amount: 100 %}",
        &ParseSettings::default(),
        registry()?,
    )?;
    assert_eq!(template.render(&Value::from(json!({"name": "price"})))?, "$1.0");

    match template.render(&Value::from(json!({"name": "missing"}))) {
        Err(RenderError::UnknownPartial {
            name,
        }) => assert_eq!(name, "missing"),
        other => panic!("expected unknown partial, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_partial_bindings_do_not_leak() -> Result<()> {
    let template = Template::parse_with(
        "{% include 'price', amount: 300 %}|{{ amount }}",
        &ParseSettings::default(),
        registry()?,
    )?;
    assert_eq!(template.render(&Value::Nil)?, "$3.0|");
    Ok(())
}
