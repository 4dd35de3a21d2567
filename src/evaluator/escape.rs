//! HTML escaping for `{{expr}}` output

use std::borrow::Cow;

#[inline]
fn replacement(byte: u8) -> Option<&'static str> {
    match byte {
        b'&' => Some("&amp;"),
        b'<' => Some("&lt;"),
        b'>' => Some("&gt;"),
        b'"' => Some("&quot;"),
        b'\'' => Some("&#x27;"),
        b'`' => Some("&#x60;"),
        b'=' => Some("&#x3D;"),
        _ => None,
    }
}

/// Append `input` to `out` with `& < > " ' \` =` replaced by entities
pub fn escape_html_into(input: &str, out: &mut String) {
    let bytes = input.as_bytes();
    let mut last = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        if let Some(entity) = replacement(byte) {
            out.push_str(&input[last..i]);
            out.push_str(entity);
            last = i + 1;
        }
    }
    out.push_str(&input[last..]);
}

/// Escape `input`, borrowing it when nothing needs replacing
pub fn escape_html(input: &str) -> Cow<'_, str> {
    if !input.bytes().any(|b| replacement(b).is_some()) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 16);
    escape_html_into(input, &mut out);
    Cow::Owned(out)
}
