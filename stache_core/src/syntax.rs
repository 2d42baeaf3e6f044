//! Format-string dialects.
//!
//! A [`Syntax`] splits a template string into [`RawUnit`]s: the literal text
//! preceding a field, the raw field name (marker prefix still attached), the
//! format spec and the conversion key. Two dialects ship with the crate:
//!
//! - [`BraceSyntax`]: `{name!conv:spec}` fields, `{{` and `}}` are escaped
//!   braces, section markers `#` `/` and comment marker `%`.
//! - [`CTemplateSyntax`]: `{{name!conv:spec}}` tags, single braces are
//!   literal text, section markers `#` `/` and comment marker `!`.

use serde::Deserialize;
use serde::Serialize;

use crate::Marker;
use crate::StacheError;
use crate::StacheResult;
use crate::lexer::BraceWalker;
use crate::lexer::RawToken;

/// One unit of a parsed template: literal text followed by an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawUnit {
	/// Literal text preceding the field. May be empty.
	pub text: String,
	/// The raw field name, including any marker prefix. `None` for trailing
	/// literal text.
	pub field: Option<String>,
	/// The raw format spec. May itself contain field references.
	pub spec: String,
	/// The conversion key written after `!`.
	pub conversion: Option<String>,
}

impl RawUnit {
	/// A unit holding only literal text.
	pub fn text(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			..Self::default()
		}
	}

	/// Split a field body into name, conversion and spec and attach the
	/// preceding literal text.
	pub fn field(text: impl Into<String>, body: &str) -> StacheResult<Self> {
		let (field, conversion, spec) = split_field(body)?;

		Ok(Self {
			text: text.into(),
			field: Some(field.to_string()),
			spec: spec.to_string(),
			conversion: conversion.map(ToString::to_string),
		})
	}

	/// A field unit whose whole body is the field name.
	pub fn verbatim(text: impl Into<String>, body: &str) -> Self {
		Self {
			text: text.into(),
			field: Some(body.to_string()),
			..Self::default()
		}
	}
}

/// The one-character prefixes that turn a field into a structural marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerTable {
	pub start_section: char,
	pub end_section: char,
	pub comment: char,
}

impl MarkerTable {
	pub const BRACE: Self = Self {
		start_section: '#',
		end_section: '/',
		comment: '%',
	};
	pub const CTEMPLATE: Self = Self {
		start_section: '#',
		end_section: '/',
		comment: '!',
	};

	/// The marker registered for `prefix`, or [`Marker::None`].
	pub fn lookup(&self, prefix: char) -> Marker {
		if prefix == self.start_section {
			Marker::StartSection
		} else if prefix == self.end_section {
			Marker::EndSection
		} else if prefix == self.comment {
			Marker::Comment
		} else {
			Marker::None
		}
	}
}

/// A format-string mini-language parser.
pub trait Syntax: std::fmt::Debug + Send + Sync {
	/// Split `template` into raw units, in order.
	fn parse(&self, template: &str) -> StacheResult<Vec<RawUnit>>;

	/// The marker prefixes recognized by this dialect.
	fn markers(&self) -> MarkerTable;
}

/// The built-in dialects, selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
	Brace,
	#[default]
	CTemplate,
}

impl Dialect {
	pub fn syntax(self) -> Box<dyn Syntax> {
		match self {
			Self::Brace => Box::new(BraceSyntax),
			Self::CTemplate => Box::new(CTemplateSyntax),
		}
	}
}

/// `str.format`-style fields: `{name!conv:spec}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BraceSyntax;

impl Syntax for BraceSyntax {
	fn parse(&self, template: &str) -> StacheResult<Vec<RawUnit>> {
		let mut walker = BraceWalker::new(template);
		let mut units = vec![];
		let mut literal = String::new();

		while let Some(token) = walker.current() {
			match token {
				RawToken::Text => {
					literal.push_str(walker.current_slice());
					walker.advance(1);
				}
				RawToken::BraceOpen if walker.peek(1) == Some(RawToken::BraceOpen) => {
					literal.push('{');
					walker.advance(2);
				}
				RawToken::BraceClose if walker.peek(1) == Some(RawToken::BraceClose) => {
					literal.push('}');
					walker.advance(2);
				}
				RawToken::BraceClose => {
					return Err(StacheError::UnmatchedBrace {
						offset: walker.offset(),
					});
				}
				RawToken::BraceOpen => {
					let opened_at = walker.offset();
					walker.advance(1);
					let body = walker.take_single_braced(opened_at)?;
					units.push(RawUnit::field(std::mem::take(&mut literal), body)?);
				}
			}
		}

		if !literal.is_empty() {
			units.push(RawUnit::text(literal));
		}

		Ok(units)
	}

	fn markers(&self) -> MarkerTable {
		MarkerTable::BRACE
	}
}

/// ctemplate-style tags: `{{name!conv:spec}}`.
///
/// A run of three or more `{` emits the extra braces as literal text before
/// the tag, so `{{{NAME}}` renders a literal `{` followed by `NAME`. A tag
/// that starts with the comment marker is kept verbatim, which lets comments
/// hold arbitrary text such as `{{!VAR {VAR} }}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CTemplateSyntax;

impl Syntax for CTemplateSyntax {
	fn parse(&self, template: &str) -> StacheResult<Vec<RawUnit>> {
		let mut walker = BraceWalker::new(template);
		let mut units = vec![];
		let mut literal = String::new();
		let comment = self.markers().comment;

		while let Some(token) = walker.current() {
			match token {
				RawToken::Text => {
					literal.push_str(walker.current_slice());
					walker.advance(1);
				}
				RawToken::BraceClose => {
					literal.push('}');
					walker.advance(1);
				}
				RawToken::BraceOpen => {
					let run = walker.run_length(RawToken::BraceOpen);

					if run < 2 {
						literal.push('{');
						walker.advance(1);
						continue;
					}

					for _ in 2..run {
						literal.push('{');
					}

					walker.advance(run - 2);
					let opened_at = walker.offset();
					walker.advance(2);
					let body = walker.take_double_braced(opened_at)?;
					let text = std::mem::take(&mut literal);

					if body.starts_with(comment) {
						units.push(RawUnit::verbatim(text, body));
					} else {
						units.push(RawUnit::field(text, body.trim())?);
					}
				}
			}
		}

		if !literal.is_empty() {
			units.push(RawUnit::text(literal));
		}

		Ok(units)
	}

	fn markers(&self) -> MarkerTable {
		MarkerTable::CTEMPLATE
	}
}

/// Split a field body into `(name, conversion, spec)`.
///
/// The name ends at the first `!` or `:` outside of `[...]`. A conversion runs
/// from `!` up to the next `:`.
pub fn split_field(body: &str) -> StacheResult<(&str, Option<&str>, &str)> {
	let mut in_index = false;
	let mut split = None;

	for (index, ch) in body.char_indices() {
		match ch {
			'[' => in_index = true,
			']' => in_index = false,
			'!' | ':' if !in_index => {
				split = Some((index, ch));
				break;
			}
			_ => {}
		}
	}

	let Some((index, delimiter)) = split else {
		check_field_name(body)?;
		return Ok((body, None, ""));
	};

	let name = &body[..index];
	check_field_name(name)?;
	let rest = &body[index + 1..];

	if delimiter == ':' {
		return Ok((name, None, rest));
	}

	let (conversion, spec) = rest.split_once(':').unwrap_or((rest, ""));

	if conversion.is_empty() {
		return Err(StacheError::InvalidField {
			field: body.to_string(),
			reason: "expected a conversion key after `!`".to_string(),
		});
	}

	Ok((name, Some(conversion), spec))
}

fn check_field_name(name: &str) -> StacheResult<()> {
	if name.contains(['{', '}']) {
		return Err(StacheError::InvalidField {
			field: name.to_string(),
			reason: "unexpected brace in field name".to_string(),
		});
	}

	Ok(())
}
