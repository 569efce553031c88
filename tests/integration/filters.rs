//! Standard filters through complete templates.

use anyhow::Result;
use liqrs::registry::{FilterArgs, Registry};
use liqrs::test_utils::{render, render_strict};
use liqrs::{Context, Error, ParseSettings, RenderError, Template, Value};
use serde_json::json;

#[test]
fn test_filter_chains() {
    let data = json!({"title": "  the quick brown fox  "});
    assert_eq!(render("{{ title | strip | capitalize | truncatewords: 2 }}", data.clone()), "The quick...");
    assert_eq!(render("{{ title | split: ' ' | reverse | join: '-' | upcase }}", data), "FOX-BROWN-QUICK-THE");
}

#[test]
fn test_money_formatting() {
    let data = json!({"cents": 1999});
    assert_eq!(render("{{ cents | divided_by: 100 }}.{{ cents | modulo: 100 }}", data.clone()), "19.99");
    assert_eq!(render("{{ cents | times: 1.0 | divided_by: 100 | round: 1 }}", data), "20.0");
}

#[test]
fn test_where_map_and_sort_on_objects() {
    let data = json!({
        "people": [
            {"name": "zoe", "team": "red", "age": 31},
            {"name": "Al", "team": "blue", "age": 25},
            {"name": "bea", "team": "red", "age": 28}
        ]
    });
    assert_eq!(
        render("{{ people | where: 'team', 'red' | sort: 'age' | map: 'name' | join: ', ' }}", data.clone()),
        "bea, zoe"
    );
    assert_eq!(render("{{ people | sort_natural: 'name' | map: 'name' | join: ' ' }}", data), "Al bea zoe");
}

#[test]
fn test_filters_in_tag_arguments() {
    let source = "{% assign tags = 'b,a,b,c' | split: ',' | uniq | sort %}{% for t in tags %}{{ t }}{% endfor %}";
    assert_eq!(render(source, json!({})), "abc");
}

#[test]
fn test_filter_failure_is_wrapped() {
    let err = render_strict("{{ 10 | modulo: 0 }}", json!({})).unwrap_err();
    match err {
        Error::Render(RenderError::Filter {
            name,
            source,
        }) => {
            assert_eq!(name, "modulo");
            assert!(source.to_string().contains("divided by 0"));
        }
        other => panic!("expected a filter error, got {other:?}"),
    }
}

fn money(input: &Value, args: &FilterArgs, _ctx: &Context<'_>) -> anyhow::Result<Value> {
    let Some(cents) = input.as_f64() else {
        anyhow::bail!("money expects a number");
    };
    let symbol = args.get(0).map_or_else(|| "$".to_string(), |s| s.to_text().into_owned());
    Ok(Value::from(format!("{symbol}{:.2}", cents / 100.0)))
}

#[test]
fn test_custom_filter_registration() -> Result<()> {
    let registry = Registry::standard().with_filter("money", money);
    let template = Template::parse_with("{{ 1999 | money }} {{ 250 | money: '€' }}", &ParseSettings::default(), registry.into())?;
    assert_eq!(template.render(&Value::Nil)?, "$19.99 €2.50");

    let registry = Registry::standard().with_filter("money", money);
    let template = Template::parse_with("{{ 'x' | money }}", &ParseSettings::default(), registry.into())?;
    assert!(matches!(template.render(&Value::Nil), Err(RenderError::Filter { .. })));
    Ok(())
}

#[test]
fn test_date_formatting() {
    let data = json!({"published": "2023-11-02 14:05:00"});
    assert_eq!(render("{{ published | date: '%a, %b %d, %y' }}", data.clone()), "Thu, Nov 02, 23");
    assert_eq!(render("{{ published | date: '%H:%M' }}", data), "14:05");
}
