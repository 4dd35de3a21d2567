use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use octofhir_handlebars::{Handlebars, HelperParams, Template, Value};
use serde_json::json;
use std::hint::black_box;

const ROWS: &str = r#"<table>
{{#each rows as |row|}}
  <tr class="{{#if @first}}first{{/if}}{{#if @last}} last{{/if}}">
    <td>{{@index}}</td><td>{{row.name}}</td><td>{{upper row.city}}</td>
    {{#if row.tags}}<td>{{#each row.tags}}{{this}}{{#unless @last}}, {{/unless}}{{/each}}</td>{{/if}}
  </tr>
{{/each}}
</table>"#;

fn context(rows: usize) -> Value {
    let rows: Vec<_> = (0..rows)
        .map(|i| {
            json!({
                "name": format!("Person <{i}>"),
                "city": "Amsterdam",
                "tags": if i % 3 == 0 { json!(["a", "b"]) } else { json!([]) },
            })
        })
        .collect();
    Value::from(json!({ "rows": rows }))
}

fn engine() -> Handlebars {
    let mut engine = Handlebars::new();
    engine.register_helper_fn("upper", |h: &HelperParams<'_>| {
        Ok(h.param_str(0).to_uppercase().into())
    });
    engine
        .register_partial_source("cell", "<td>{{this}}</td>")
        .expect("partial compiles");
    engine
}

fn benchmark_render_rows(c: &mut Criterion) {
    let engine = engine();
    let template = engine.compile(ROWS).expect("benchmark template compiles");

    let mut group = c.benchmark_group("render_rows");
    for rows in [10, 100, 1_000] {
        let data = context(rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &data, |b, data| {
            b.iter(|| black_box(engine.render(&template, data.clone())))
        });
    }
    group.finish();
}

fn benchmark_render_source_cached(c: &mut Criterion) {
    let engine = engine();
    let data = json!({"name": "world", "items": [1, 2, 3]});
    c.bench_function("render_source_cached", |b| {
        b.iter(|| {
            black_box(engine.render_source(
                black_box("Hello {{name}}: {{#each items}}{{> cell}}{{/each}}"),
                &data,
            ))
        })
    });
}

fn benchmark_escaping(c: &mut Criterion) {
    let engine = engine();
    let template = Template::compile("{{text}}").expect("benchmark template compiles");
    let data = Value::from(json!({ "text": "<script>alert('x & y')</script>".repeat(100) }));
    c.bench_function("render_escaped_text", |b| {
        b.iter(|| black_box(engine.render(&template, data.clone())))
    });
}

criterion_group!(
    benches,
    benchmark_render_rows,
    benchmark_render_source_cached,
    benchmark_escaping
);
criterion_main!(benches);
