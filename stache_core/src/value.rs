//! Helpers for the `serde_json::Value`s that templates render.

use std::fmt::Write;

use serde_json::Value;

/// Check if a value is truthy when it drives a section.
///
/// - `null`, `false`, `0` and `""` are falsy
/// - empty sequences and empty mappings are falsy
/// - everything else is truthy, including the string `"false"`
pub fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
		Value::String(s) => !s.is_empty(),
		Value::Array(items) => !items.is_empty(),
		Value::Object(map) => !map.is_empty(),
	}
}

/// Whether a value counts as "not found" for first-non-empty resolution.
pub fn is_blank(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(s) => s.is_empty(),
		_ => false,
	}
}

/// Render a value as plain text.
///
/// - strings are returned as-is
/// - numbers and booleans use their JSON spelling
/// - `null` is the empty string
/// - sequences and mappings are compact JSON
pub fn display(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(s) => s.clone(),
		Value::Bool(b) => b.to_string(),
		Value::Number(number) => number.to_string(),
		Value::Array(_) | Value::Object(_) => value.to_string(),
	}
}

/// The JSON representation of a value: strings are quoted and escaped.
pub fn repr(value: &Value) -> String {
	value.to_string()
}

/// Like [`repr`], with every non-ASCII character escaped as `\uXXXX`.
pub fn ascii_repr(value: &Value) -> String {
	let repr = repr(value);
	let mut escaped = String::with_capacity(repr.len());

	for ch in repr.chars() {
		if ch.is_ascii() {
			escaped.push(ch);
			continue;
		}

		let mut units = [0u16; 2];
		for unit in ch.encode_utf16(&mut units) {
			let _ = write!(escaped, "\\u{unit:04x}");
		}
	}

	escaped
}

/// A short name for the kind of a value, used in error messages.
pub fn kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "bool",
		Value::Number(number) if number.is_f64() => "float",
		Value::Number(_) => "int",
		Value::String(_) => "str",
		Value::Array(_) => "sequence",
		Value::Object(_) => "mapping",
	}
}
