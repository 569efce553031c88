//! One compiled template rendered from many tasks at once.

use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use liqrs::{Template, Value};
use serde_json::json;

const SOURCE: &str = "{% increment calls %}{% assign total = 0 %}{% for item in items %}{% assign total = total | plus: item %}{% cycle 'a', 'b' %}{% endfor %}:{{ name }}={{ total }}";

fn data(n: i64) -> Value {
    Value::from(json!({
        "name": format!("task-{n}"),
        "items": (0..(n % 17)).collect::<Vec<_>>()
    }))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_renders_match_sequential() -> Result<()> {
    liqrs::test_utils::init_test_logging(None);

    let template = Arc::new(Template::parse(SOURCE)?);
    let expected: Vec<String> = (0..64).map(|n| template.render(&data(n))).collect::<Result<_, _>>()?;

    let handles = (0..64).map(|n| {
        let template = Arc::clone(&template);
        tokio::task::spawn_blocking(move || template.render(&data(n)))
    });
    let results = join_all(handles).await;

    for (n, result) in results.into_iter().enumerate() {
        let output = result??;
        assert_eq!(output, expected[n], "render {n} differs from its sequential run");
        assert!(output.starts_with('0'), "counters must not leak between renders: {output}");
    }
    Ok(())
}

#[test]
fn test_templates_share_across_threads() -> Result<()> {
    let template = Template::parse("{{ n | times: n }}")?;
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8i64)
            .map(|n| {
                let template = &template;
                scope.spawn(move || template.render(&Value::object([("n", n)])))
            })
            .collect();
        for (n, handle) in handles.into_iter().enumerate() {
            let output = handle.join().expect("render thread panicked")?;
            assert_eq!(output, (n * n).to_string());
        }
        Ok(())
    })
}
