//! Whitespace control through full parse and render.
//!
//! These tests verify that:
//! - text without directives renders byte-for-byte, whatever its line endings
//! - trim markers remove all adjacent whitespace, across blank lines
//! - global stripping collapses exactly one line per side of a `{% %}` tag
//! - global stripping never touches `{{ }}` outputs

use anyhow::Result;
use liqrs::test_utils::{init_test_logging, visible_whitespace};
use liqrs::{ParseSettings, Template, Value, parse};

fn render_stripped(source: &str) -> Result<String> {
    let settings = ParseSettings::builder().strip_space_around_tags(true).build();
    Ok(parse(source, &settings)?.render(&Value::Nil)?)
}

fn render_plain(source: &str) -> Result<String> {
    Ok(Template::parse(source)?.render(&Value::Nil)?)
}

#[test]
fn test_text_without_directives_round_trips() -> Result<()> {
    init_test_logging(None);

    let samples = [
        "",
        "plain",
        "  leading and trailing  ",
        "unix\nlines\n\n",
        "windows\r\nlines\r\n\r\n",
        "old mac\rlines\r",
        "mixed\r\n\n\r  \t end",
        "braces { alone } and % signs %} and }}",
        "unicode: grüße, 日本語, emoji 🎉\n",
    ];
    for sample in samples {
        assert_eq!(render_plain(sample)?, sample, "plain render changed {:?}", sample);
        assert_eq!(render_stripped(sample)?, sample, "stripped render changed {:?}", sample);
    }
    Ok(())
}

#[test]
fn test_rerender_is_identical() -> Result<()> {
    let template = Template::parse(
        "{% for i in (1..3) %}{% cycle 'a', 'b' %}{% increment n %}{% ifchanged %}{{ i | modulo: 2 }}{% endifchanged %}\n{% endfor %}",
    )?;
    let first = template.render(&Value::Nil)?;
    let second = template.render(&Value::Nil)?;
    assert_eq!(first, second);
    assert_eq!(first, "a01\nb10\na21\n");
    Ok(())
}

#[test]
fn test_trim_markers_strip_across_blank_lines() -> Result<()> {
    let source = "A \n\n \t{%- assign x = 1 -%}\r\n\r\n   B";
    assert_eq!(render_plain(source)?, "AB");

    let source = "A\n\n  {{- 'x' -}}  \n\nB";
    assert_eq!(render_plain(source)?, "AxB");
    Ok(())
}

#[test]
fn test_unmarked_tags_preserve_surroundings() -> Result<()> {
    let source = "A \r\n{% assign x = 1 %}\r\n B";
    assert_eq!(render_plain(source)?, "A \r\n\r\n B");
    Ok(())
}

#[test]
fn test_one_sided_markers() -> Result<()> {
    assert_eq!(render_plain("a \n {%- assign x = 1 %} \n b")?, "a \n b");
    assert_eq!(render_plain("a \n {% assign x = 1 -%} \n b")?, "a \n b");
    Ok(())
}

#[test]
fn test_global_stripping_reference_fixtures() -> Result<()> {
    let cases = [
        ("a  \n  {% assign letter = 'b' %}  \n{{ letter }} \n  c", "a  \nb \n  c"),
        ("a  \n\n  {% assign letter = 'b' %}  \n{{ letter }}\n\n  c", "a  \n\nb\n\n  c"),
    ];

    for (source, expected) in cases {
        let output = render_stripped(source)?;
        assert_eq!(
            output,
            expected,
            "LF fixture:\n{}\nrendered as:\n{}",
            visible_whitespace(source),
            visible_whitespace(&output)
        );

        let crlf_source = source.replace('\n', "\r\n");
        let crlf_expected = expected.replace('\n', "\r\n");
        let output = render_stripped(&crlf_source)?;
        assert_eq!(
            output,
            crlf_expected,
            "CRLF fixture:\n{}\nrendered as:\n{}",
            visible_whitespace(&crlf_source),
            visible_whitespace(&output)
        );
    }
    Ok(())
}

#[test]
fn test_global_stripping_keeps_outputs_untouched() -> Result<()> {
    assert_eq!(render_stripped("a \n {{ 'x' }} \n b")?, "a \n x \n b");
    Ok(())
}

#[test]
fn test_global_stripping_block_layout() -> Result<()> {
    let source = "<ul>\n  {% for i in (1..2) %}\n  <li>{{ i }}</li>\n  {% endfor %}\n</ul>\n";
    assert_eq!(render_stripped(source)?, "<ul>\n  <li>1</li>\n  <li>2</li>\n</ul>\n");
    Ok(())
}

#[test]
fn test_explicit_marker_wins_over_global_mode() -> Result<()> {
    assert_eq!(render_stripped("a\n\n\n  {%- assign x = 1 %}\n\nb")?, "a\nb");
    Ok(())
}
