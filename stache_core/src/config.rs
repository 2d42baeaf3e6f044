use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;

use crate::ConverterRegistry;
use crate::Dialect;
use crate::Formatter;
use crate::RenderOptions;
use crate::Resolution;
use crate::StacheError;
use crate::StacheResult;
use crate::Strictness;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["stache.toml", ".stache.toml", ".config/stache.toml"];

/// Data source entry for a `[data]` namespace.
///
/// The format is taken from the file extension:
///
/// ```toml
/// [data]
/// pkg = "package.json"
/// ```
///
/// Typed entries provide an explicit format:
///
/// ```toml
/// [data]
/// release = { path = "release-info", format = "json" }
/// ```
#[derive(Debug, Clone, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
#[non_exhaustive]
pub enum DataSource {
	Path(PathBuf),
	Typed(TypedDataSource),
}

impl DataSource {
	pub fn path(&self) -> &Path {
		match self {
			Self::Path(path) => path.as_path(),
			Self::Typed(typed) => typed.path.as_path(),
		}
	}

	/// The explicit format override, if configured.
	pub fn format(&self) -> Option<&str> {
		match self {
			Self::Path(_) => None,
			Self::Typed(typed) => Some(typed.format.as_str()),
		}
	}
}

/// Typed data source configuration for `[data]` entries.
#[derive(Debug, Clone, Deserialize, Eq, PartialEq)]
pub struct TypedDataSource {
	pub path: PathBuf,
	pub format: String,
}

/// Configuration loaded from a `stache.toml` file.
///
/// ```toml
/// syntax = "brace"
/// strictness = "lenient"
/// resolution = "first-present"
/// standard_converters = true
///
/// [data]
/// pkg = "package.json"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct StacheConfig {
	/// The template dialect. Defaults to `ctemplate`.
	#[serde(default)]
	pub syntax: Dialect,
	#[serde(default)]
	pub strictness: Strictness,
	#[serde(default)]
	pub resolution: Resolution,
	/// Register the standard converters (`h`, `u`, `j`, `upper`, `lower`,
	/// `trim`).
	#[serde(default)]
	pub standard_converters: bool,
	/// Map of namespace name to data file. Every namespace becomes a field of
	/// the global scope.
	#[serde(default)]
	pub data: HashMap<String, DataSource>,
}

impl StacheConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> StacheResult<Option<StacheConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config: StacheConfig =
			toml::from_str(&content).map_err(|e| StacheError::ConfigParse(e.to_string()))?;
		tracing::debug!(path = %config_path.display(), "loaded config");

		Ok(Some(config))
	}

	/// Read each data file and collect the values keyed by namespace.
	pub fn load_data(&self, root: &Path) -> StacheResult<Map<String, Value>> {
		let mut namespaces: Vec<_> = self.data.iter().collect();
		namespaces.sort_by_key(|(namespace, _)| namespace.as_str());

		let mut data = Map::new();

		for (namespace, source) in namespaces {
			let value = load_data_file(&root.join(source.path()), source.format())?;
			data.insert(namespace.clone(), value);
		}

		Ok(data)
	}

	pub fn render_options(&self) -> RenderOptions {
		RenderOptions::default()
			.strictness(self.strictness)
			.resolution(self.resolution)
	}

	/// A formatter configured from this file.
	pub fn formatter(&self) -> Formatter {
		let converters = if self.standard_converters {
			ConverterRegistry::standard()
		} else {
			ConverterRegistry::new()
		};

		Formatter::from_dialect(self.syntax)
			.with_options(self.render_options())
			.with_converters(converters)
	}
}

/// Read and parse a data file. Without an explicit `format` the file
/// extension decides.
pub fn load_data_file(path: &Path, format: Option<&str>) -> StacheResult<Value> {
	let path_display = path.display().to_string();
	let content = std::fs::read_to_string(path).map_err(|e| {
		StacheError::DataFile {
			path: path_display.clone(),
			reason: e.to_string(),
		}
	})?;
	let format = match format {
		Some(format) => format.trim().to_ascii_lowercase(),
		None => {
			path.extension()
				.and_then(|e| e.to_str())
				.unwrap_or("")
				.to_ascii_lowercase()
		}
	};

	parse_data(&content, &format, &path_display)
}

/// Parse data content into a `serde_json::Value` based on its format.
pub fn parse_data(content: &str, format: &str, path_display: &str) -> StacheResult<Value> {
	let data_error = |reason: String| {
		StacheError::DataFile {
			path: path_display.to_string(),
			reason,
		}
	};

	match format {
		"text" | "txt" => Ok(Value::String(content.to_string())),
		"json" => serde_json::from_str(content).map_err(|e| data_error(e.to_string())),
		"toml" => {
			let table: toml::Table =
				toml::from_str(content).map_err(|e| data_error(e.to_string()))?;
			Ok(toml_to_json(toml::Value::Table(table)))
		}
		"yaml" | "yml" => serde_yaml_ng::from_str(content).map_err(|e| data_error(e.to_string())),
		other => Err(StacheError::UnsupportedDataFormat(other.to_string())),
	}
}

/// Convert a `toml::Value` to a `serde_json::Value`. Datetimes and
/// non-finite floats become strings.
fn toml_to_json(value: toml::Value) -> Value {
	match value {
		toml::Value::String(s) => Value::String(s),
		toml::Value::Integer(i) => Value::from(i),
		toml::Value::Float(f) => {
			serde_json::Number::from_f64(f).map_or_else(|| Value::String(f.to_string()), Value::Number)
		}
		toml::Value::Boolean(b) => Value::Bool(b),
		toml::Value::Datetime(dt) => Value::String(dt.to_string()),
		toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
		toml::Value::Table(table) => {
			Value::Object(
				table
					.into_iter()
					.map(|(key, value)| (key, toml_to_json(value)))
					.collect(),
			)
		}
	}
}
