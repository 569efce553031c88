//! Standard tags working together in realistic templates.

use anyhow::Result;
use liqrs::test_utils::{render, render_strict};
use liqrs::{ParseError, Template};
use serde_json::json;

fn catalog() -> serde_json::Value {
    json!({
        "store": "Corner Shop",
        "products": [
            {"title": "Tea", "price": 3, "tags": ["drink", "hot"], "stock": 12},
            {"title": "Milk", "price": 2, "tags": ["drink", "cold"], "stock": 0},
            {"title": "Bread", "price": 4, "tags": ["bakery"], "stock": 5}
        ]
    })
}

#[test]
fn test_product_listing() {
    let source = "{{ store | upcase }}\n{% for p in products %}{% if p.stock > 0 %}{{ forloop.index }}. {{ p.title }} ${{ p.price }}{% unless forloop.last %}\n{% endunless %}{% endif %}{% endfor %}";
    assert_eq!(render(source, catalog()), "CORNER SHOP\n1. Tea $3\n3. Bread $4");
}

#[test]
fn test_case_renders_every_matching_when() {
    let source = "{% case 1 %}{% when 1 %}a{% when 2 %}b{% when 1 %}c{% endcase %}";
    assert_eq!(render(source, json!({})), "ac");
}

#[test]
fn test_case_else_only_when_nothing_matched() {
    let source = "{% case kind %}{% when 'a' %}A{% else %}other{% endcase %}";
    assert_eq!(render(source, json!({"kind": "a"})), "A");
    assert_eq!(render(source, json!({"kind": "z"})), "other");
}

#[test]
fn test_boolean_operators_group_from_the_right() {
    // `a and b or c` reads as `a and (b or c)`
    let source = "{% for p in products %}{% if p.tags contains 'drink' and p.stock > 0 or p.price == 4 %}{{ p.title }} {% endif %}{% endfor %}";
    assert_eq!(render(source, catalog()), "Tea ");

    let source = "{% for p in products %}{% if p.price == 4 or p.tags contains 'drink' and p.stock > 0 %}{{ p.title }} {% endif %}{% endfor %}";
    assert_eq!(render(source, catalog()), "Tea Bread ");
}

#[test]
fn test_empty_and_blank_literals() {
    let source = "{% if list == empty %}E{% endif %}{% if text == blank %}B{% endif %}{% if map == empty %}M{% endif %}";
    assert_eq!(render(source, json!({"list": [], "text": "  ", "map": {}})), "EBM");
}

#[test]
fn test_capture_accumulates_across_iterations() {
    let source = "{% capture list %}{% for p in products %}{{ p.title | downcase }};{% endfor %}{% endcapture %}[{{ list }}]";
    assert_eq!(render(source, catalog()), "[tea;milk;bread;]");
}

#[test]
fn test_loop_accumulator_survives_loop() {
    let source = "{% assign names = '' %}{% for p in products %}{% assign names = names | append: p.title %}{% endfor %}{{ names }}";
    assert_eq!(render(source, catalog()), "TeaMilkBread");
}

#[test]
fn test_counters_are_separate_from_variables() {
    let source = "{% assign n = 10 %}{% increment n %}{% increment n %}{{ n }}";
    assert_eq!(render(source, json!({})), "0110");
}

#[test]
fn test_offset_limit_and_reversed_ranges() {
    assert_eq!(render("{% for i in (1..10) offset: 2 limit: 3 %}{{ i }}{% endfor %}", json!({})), "345");
    assert_eq!(render("{% for i in (1..4) reversed %}{{ i }}{% endfor %}", json!({})), "4321");
    assert_eq!(render("{% for i in (a..b) %}{{ i }}{% endfor %}", json!({"a": 2, "b": 4})), "234");
    assert_eq!(render("{% for i in (3..1) %}{{ i }}{% else %}none{% endfor %}", json!({})), "none");
}

#[test]
fn test_tablerow_with_limit_and_offset() {
    let source = "{% tablerow i in (1..6) cols: 3 limit: 2 offset: 1 %}{{ tablerowloop.col }}:{{ i }}{% endtablerow %}";
    assert_eq!(
        render(source, json!({})),
        "<tr class=\"row1\">\n<td class=\"col1\">1:2</td><td class=\"col2\">2:3</td></tr>\n"
    );
}

#[test]
fn test_raw_keeps_delimiters() {
    let source = "{% raw %}{% if %}{{ x }}{% endraw %}";
    assert_eq!(render(source, json!({})), "{% if %}{{ x }}");
}

#[test]
fn test_nested_break_only_leaves_inner_loop() {
    let source = "{% for a in (1..2) %}{% for b in (1..3) %}{% if b == 2 %}{% break %}{% endif %}{{ a }}{{ b }} {% endfor %}{% endfor %}";
    assert_eq!(render(source, json!({})), "11 21 ");
}

#[test]
fn test_structural_parse_errors() {
    assert!(matches!(Template::parse("{% if x %}open"), Err(ParseError::Unterminated { .. })));
    assert!(matches!(Template::parse("{% if x %}{% endfor %}"), Err(ParseError::Mismatched { .. })));
    assert!(matches!(Template::parse("{{ unterminated"), Err(ParseError::Unterminated { .. })));
    assert!(matches!(Template::parse("{% bogus %}"), Err(ParseError::UnknownTag { .. })));
    assert!(matches!(
        Template::parse("{% if a %}{% else %}{% elsif b %}{% endif %}"),
        Err(ParseError::Mismatched { .. })
    ));
}

#[test]
fn test_strict_loop_option_validation() -> Result<()> {
    assert!(render_strict("{% for i in (1..3) sideways: 2 %}{% endfor %}", json!({})).is_err());
    assert_eq!(render("{% for i in (1..3) sideways: 2 %}{{ i }}{% endfor %}", json!({})), "123");
    Ok(())
}
