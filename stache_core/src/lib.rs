//! `stache_core` renders format-string templates with nested sections against
//! hierarchical data.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Template string
//!   → Syntax (splits the string into literal text and field units)
//!   → Tokenizer (classifies fields as plain, section start, section end or comment)
//!   → Evaluator (partitions the token stream into sections and renders each
//!     one against the right scope, repeating sections bound to sequences)
//!   → Value pipeline (conversion, then a format spec that may itself be a template)
//! ```
//!
//! ## Modules
//!
//! - [`syntax`]: The two built-in dialects: `{name!conv:spec}` and
//!   `{{name!conv:spec}}`.
//! - [`config`]: Configuration loading from `stache.toml` and data files in
//!   JSON, TOML, YAML or plain text.
//! - [`format_spec`]: The `[[fill]align][sign][#][0][width][grouping][.precision][type]`
//!   mini-language.
//! - [`value`]: Truthiness and text rendering of `serde_json::Value`s.
//!
//! ## Sections
//!
//! `{{#name}}...{{/name}}` renders its body zero or more times depending on
//! the value bound to `name`:
//!
//! - absent, empty, `null`, `false`, `0` and empty collections render nothing
//! - a sequence renders the body once per element, with the element as the
//!   innermost scope (non-mapping elements are visible as `{{.}}`)
//! - a mapping renders the body once with the mapping as the innermost scope
//! - any other value renders the body once in the enclosing scope
//!
//! `{{!name}}...{{/name}}` is a comment section and `{{! text }}` a comment on
//! its own. Neither renders anything.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use stache_core::Formatter;
//!
//! let formatter = Formatter::ctemplate();
//! let rendered = formatter
//! 	.render(
//! 		"{{#users}}{{name}} ({{age:>3}})\n{{/users}}",
//! 		&json!({ "users": [{ "name": "ada", "age": 36 }, { "name": "alan", "age": 41 }] }),
//! 	)
//! 	.unwrap();
//!
//! assert_eq!(rendered, "ada ( 36)\nalan ( 41)\n");
//! ```

pub use config::*;
pub use convert::*;
pub use engine::*;
pub use error::*;
pub use format_spec::*;
pub use scope::*;
pub use syntax::*;
pub use tokens::*;

pub mod config;
mod convert;
mod engine;
#[allow(unused_assignments)]
mod error;
pub mod format_spec;
pub(crate) mod lexer;
mod scope;
pub mod syntax;
mod tokens;
pub mod value;
