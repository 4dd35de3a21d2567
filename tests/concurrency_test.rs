// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Concurrent rendering of shared templates

use octofhir_handlebars::{Handlebars, HelperParams, Template};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

mod utils;
use utils::init_logging;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_shared_types_are_thread_safe() {
    assert_send_sync::<Template>();
    assert_send_sync::<Handlebars>();
}

#[test]
fn test_concurrent_renders_share_one_engine() {
    init_logging();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut engine = Handlebars::new();
    engine.register_helper_fn("shout", move |h: &HelperParams<'_>| {
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(h.param_str(0).to_uppercase().into())
    });
    engine
        .register_partial_source("line", "{{@index}}={{shout this}};")
        .unwrap();
    let engine = Arc::new(engine);
    let template = engine.compile("{{id}}:{{#each words}}{{> line}}{{/each}}").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|id| {
            let engine = Arc::clone(&engine);
            let template = template.clone();
            thread::spawn(move || {
                let data = json!({"id": id, "words": ["a", "b", "c"]});
                (0..50)
                    .map(|_| engine.render(&template, &data).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for (id, handle) in handles.into_iter().enumerate() {
        let outputs = handle.join().unwrap();
        for output in outputs {
            assert_eq!(output, format!("{id}:0=A;1=B;2=C;"));
        }
    }
    assert_eq!(calls.load(Ordering::Relaxed), 8 * 50 * 3);
}

#[test]
fn test_concurrent_source_cache() {
    init_logging();
    let engine = Arc::new(Handlebars::new());
    let handles: Vec<_> = (0..4)
        .map(|n| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..25 {
                    let source = format!("{{{{v}}}}-{}", i % 5);
                    let out = engine.render_source(&source, &json!({"v": n})).unwrap();
                    assert_eq!(out, format!("{n}-{}", i % 5));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(engine.cached_templates(), 5);
}
