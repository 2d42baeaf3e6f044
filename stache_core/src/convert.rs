use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use serde_json::Value;

use crate::StacheError;
use crate::StacheResult;
use crate::value::ascii_repr;
use crate::value::display;
use crate::value::repr;

/// A conversion applied to a resolved value before it is formatted.
pub type Converter = dyn Fn(Value) -> Value + Send + Sync;

/// Named conversions consulted before the built-in codes.
///
/// The registry is configured before rendering and only read while a
/// template renders.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
	converters: HashMap<String, Arc<Converter>>,
}

impl std::fmt::Debug for ConverterRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut keys: Vec<_> = self.converters.keys().collect();
		keys.sort();
		f.debug_struct("ConverterRegistry")
			.field("converters", &keys)
			.finish()
	}
}

impl ConverterRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry holding the standard text converters:
	///
	/// - `h`: escape `&`, `<`, `>`, `"` and `'` for HTML
	/// - `u`: percent-encode everything except unreserved URL characters
	/// - `j`: escape for a JavaScript string literal
	/// - `upper`, `lower`, `trim`
	pub fn standard() -> Self {
		let mut registry = Self::new();
		registry.register("h", |value| map_text(&value, html_escape));
		registry.register("u", |value| map_text(&value, url_escape));
		registry.register("j", |value| map_text(&value, javascript_escape));
		registry.register("upper", |value| map_text(&value, str::to_uppercase));
		registry.register("lower", |value| map_text(&value, str::to_lowercase));
		registry.register("trim", |value| map_text(&value, |s| s.trim().to_string()));
		registry
	}

	/// Register a converter under `key`, replacing any previous one.
	pub fn register(
		&mut self,
		key: impl Into<String>,
		converter: impl Fn(Value) -> Value + Send + Sync + 'static,
	) -> &mut Self {
		self.converters.insert(key.into(), Arc::new(converter));
		self
	}

	pub fn contains(&self, key: &str) -> bool {
		self.converters.contains_key(key)
	}

	/// Apply the conversion `key` to `value`. Registered converters win over
	/// the built-in codes `s`, `r` and `a`.
	pub fn convert(&self, value: Value, key: Option<&str>) -> StacheResult<Value> {
		let Some(key) = key else {
			return Ok(value);
		};

		if let Some(converter) = self.converters.get(key) {
			return Ok(converter(value));
		}

		builtin_conversion(value, key)
	}
}

/// The conversion codes every format string understands.
fn builtin_conversion(value: Value, key: &str) -> StacheResult<Value> {
	let converted = match key {
		"s" => display(&value),
		"r" => repr(&value),
		"a" => ascii_repr(&value),
		other => return Err(StacheError::InvalidConversion(other.to_string())),
	};

	Ok(Value::String(converted))
}

fn map_text(value: &Value, transform: impl Fn(&str) -> String) -> Value {
	Value::String(transform(&display(value)))
}

fn html_escape(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());

	for ch in text.chars() {
		match ch {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#39;"),
			_ => escaped.push(ch),
		}
	}

	escaped
}

fn url_escape(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());

	for byte in text.bytes() {
		if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
			escaped.push(byte as char);
		} else {
			let _ = write!(escaped, "%{byte:02X}");
		}
	}

	escaped
}

fn javascript_escape(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());

	for ch in text.chars() {
		match ch {
			'\\' => escaped.push_str("\\\\"),
			'"' => escaped.push_str("\\\""),
			'\'' => escaped.push_str("\\'"),
			'\n' => escaped.push_str("\\n"),
			'\r' => escaped.push_str("\\r"),
			'\t' => escaped.push_str("\\t"),
			'<' => escaped.push_str("\\x3c"),
			'>' => escaped.push_str("\\x3e"),
			'&' => escaped.push_str("\\x26"),
			_ => escaped.push(ch),
		}
	}

	escaped
}
