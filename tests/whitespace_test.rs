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

//! Whitespace control, comments and escaped delimiters

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

mod utils;
use utils::render;

#[rstest]
#[case::strip_both_sides("a  {{~x~}}  b", "a1b")]
#[case::strip_left_only("a  {{~x}}  b", "a1  b")]
#[case::strip_right_only("a  {{x~}}  b", "a  1b")]
#[case::strip_newlines("<ul>\n  {{~#each xs~}}\n    <li>{{this}}</li>\n  {{~/each~}}\n</ul>", "<ul><li>1</li><li>2</li></ul>")]
#[case::strip_around_else("{{#if no}}yes{{~else~}}   no   {{/if}}", "no   ")]
#[case::no_standalone_stripping("{{#if yes}}\nline\n{{/if}}\n", "\nline\n\n")]
#[case::comment("a{{! a comment }}b", "ab")]
#[case::long_comment("a{{!-- has }} inside --}}b", "ab")]
#[case::stripped_comment("a\n  {{~! gone ~}}\n  b", "ab")]
#[case::escaped_open(r"\{{x}} is {{x}}", "{{x}} is 1")]
fn test_whitespace_and_comments(#[case] source: &str, #[case] expected: &str) {
    let data = json!({"x": 1, "xs": [1, 2], "yes": true, "no": false});
    assert_eq!(render(source, data), expected);
}
