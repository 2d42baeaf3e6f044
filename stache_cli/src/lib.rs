use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde_json::Value;
use stache_core::Dialect;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Render sectioned format-string templates against structured data.",
	long_about = "stache renders templates made of literal text, field references and nested \
	              sections against JSON, TOML or YAML data.\n\nSections repeat once per \
	              element of a sequence, render once for a mapping or any other truthy value, \
	              and vanish for empty values.\n\nQuick start:\n  stache render page.tpl \
	              --data data.json\n  stache render - --set name=ada < page.tpl\n  stache \
	              tokens page.tpl"
)]
pub struct StacheCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory, where `stache.toml` is looked up.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Render a template and print the result.
	///
	/// Fields are resolved innermost first: `--set` and `--set-json` values,
	/// then `--data` files (the last one given wins), then the `[data]`
	/// namespaces from `stache.toml`.
	Render(RenderArgs),
	/// Print the token stream of a template as JSON.
	///
	/// Useful for checking how fields, section markers and comments are
	/// recognized by a dialect.
	Tokens {
		/// The template file, or `-` to read from stdin.
		template: PathBuf,

		/// The template dialect. Overrides `syntax` from `stache.toml`.
		#[arg(long, value_enum)]
		syntax: Option<SyntaxArg>,
	},
}

#[derive(Args)]
pub struct RenderArgs {
	/// The template file, or `-` to read from stdin.
	pub template: PathBuf,

	/// A JSON, TOML or YAML file holding a mapping of fields. May be repeated.
	#[arg(long, short)]
	pub data: Vec<PathBuf>,

	/// Set a field to a string: `KEY=VALUE`. The value may be quoted and use
	/// escapes such as `"a\nb"`.
	#[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
	pub set: Vec<(String, String)>,

	/// Set a field to a JSON value: `KEY=JSON`.
	#[arg(long = "set-json", value_name = "KEY=JSON", value_parser = parse_json_assignment)]
	pub set_json: Vec<(String, Value)>,

	/// The template dialect. Overrides `syntax` from `stache.toml`.
	#[arg(long, value_enum)]
	pub syntax: Option<SyntaxArg>,

	/// Recover from mismatched and unterminated sections instead of failing.
	#[arg(long, default_value_t = false)]
	pub lenient: bool,

	/// Write the result to a file instead of stdout.
	#[arg(long, short)]
	pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SyntaxArg {
	/// `{name!conv:spec}` fields with `{{` and `}}` as escaped braces.
	Brace,
	/// `{{name!conv:spec}}` tags.
	Ctemplate,
}

impl From<SyntaxArg> for Dialect {
	fn from(value: SyntaxArg) -> Self {
		match value {
			SyntaxArg::Brace => Dialect::Brace,
			SyntaxArg::Ctemplate => Dialect::CTemplate,
		}
	}
}

/// Parse `KEY=VALUE`. Quoted values are unescaped.
pub fn parse_assignment(input: &str) -> Result<(String, String), String> {
	let (key, value) = split_assignment(input)?;
	let value = snailquote::unescape(value).map_err(|e| format!("invalid value for `{key}`: {e}"))?;

	Ok((key.to_string(), value))
}

/// Parse `KEY=JSON`.
pub fn parse_json_assignment(input: &str) -> Result<(String, Value), String> {
	let (key, value) = split_assignment(input)?;
	let value = serde_json::from_str(value).map_err(|e| format!("invalid JSON for `{key}`: {e}"))?;

	Ok((key.to_string(), value))
}

fn split_assignment(input: &str) -> Result<(&str, &str), String> {
	let Some((key, value)) = input.split_once('=') else {
		return Err(format!("expected `KEY=VALUE`, found `{input}`"));
	};

	let key = key.trim();
	if key.is_empty() {
		return Err(format!("missing key in `{input}`"));
	}

	Ok((key, value))
}

#[cfg(test)]
mod tests {
	use rstest::rstest;
	use serde_json::json;

	use super::*;

	#[rstest]
	#[case::plain("name=ada", ("name", "ada"))]
	#[case::empty_value("name=", ("name", ""))]
	#[case::equals_in_value("expr=a=b", ("expr", "a=b"))]
	#[case::quoted("greeting=\"a\\nb\"", ("greeting", "a\nb"))]
	#[case::single_quoted("raw='a\\nb'", ("raw", "a\\nb"))]
	fn assignment(#[case] input: &str, #[case] expected: (&str, &str)) {
		let (key, value) = parse_assignment(input).unwrap_or_else(|e| panic!("{e}"));
		assert_eq!((key.as_str(), value.as_str()), expected);
	}

	#[rstest]
	#[case::no_equals("name")]
	#[case::no_key("=value")]
	fn invalid_assignment(#[case] input: &str) {
		assert!(parse_assignment(input).is_err());
	}

	#[test]
	fn json_assignment() {
		let (key, value) = parse_json_assignment("items=[1, 2]").unwrap_or_else(|e| panic!("{e}"));
		assert_eq!(key, "items");
		assert_eq!(value, json!([1, 2]));
		assert!(parse_json_assignment("items=[1,").is_err());
	}
}
