// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Markup neutralization for inbound form data.
//!
//! Two passes touch user input:
//! - [`neutralize_markup`] runs on every decoded string before any route
//!   sees it and only encodes angle brackets.
//! - [`escape_html`] runs on the text fields of a validated submission and
//!   encodes the full HTML-sensitive set.
//!
//! `escape_html` leaves existing character references alone, so running it
//! over neutralized text yields `&lt;` and not `&amp;lt;`.

use serde_json::Value;

/// Encode `<` and `>` so the text cannot open or close a tag.
pub fn neutralize_markup(input: &str) -> String {
    if !input.contains(['<', '>']) {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Apply [`neutralize_markup`] to every string inside a JSON value.
pub fn neutralize_value(value: &mut Value) {
    match value {
        Value::String(s) => *s = neutralize_markup(s),
        Value::Array(items) => items.iter_mut().for_each(neutralize_value),
        Value::Object(map) => map.values_mut().for_each(neutralize_value),
        _ => {}
    }
}

/// Escape HTML-sensitive characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 16);
    for (i, c) in input.char_indices() {
        match c {
            '&' if starts_char_reference(&input[i..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            _ => out.push(c),
        }
    }
    out
}

/// True when `s` (starting at `&`) is a named, decimal or hex reference.
fn starts_char_reference(s: &str) -> bool {
    let body = match s.strip_prefix('&') {
        Some(rest) => rest,
        None => return false,
    };
    let Some(end) = body.find(';') else {
        return false;
    };
    let name = &body[..end];
    if name.is_empty() || name.len() > 32 {
        return false;
    }

    if let Some(num) = name.strip_prefix('#') {
        if let Some(hex) = num.strip_prefix(['x', 'X']) {
            !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit())
        } else {
            !num.is_empty() && num.chars().all(|c| c.is_ascii_digit())
        }
    } else {
        name.chars().all(|c| c.is_ascii_alphanumeric())
            && name.starts_with(|c: char| c.is_ascii_alphabetic())
    }
}
