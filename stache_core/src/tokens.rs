use std::fmt::Display;

use serde::Serialize;

use crate::syntax::MarkerTable;
use crate::syntax::RawUnit;

/// The structural role of a field, decided once during tokenization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Marker {
	/// A plain field reference, or a literal-only token.
	#[default]
	None,
	/// `#name` opens a section bound to `name`.
	StartSection,
	/// `/name` closes the section bound to `name`.
	EndSection,
	/// A comment. It discards its own content, and everything up to a
	/// matching end marker when one exists.
	Comment,
}

impl Display for Marker {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Marker::None => write!(f, "none"),
			Marker::StartSection => write!(f, "start-section"),
			Marker::EndSection => write!(f, "end-section"),
			Marker::Comment => write!(f, "comment"),
		}
	}
}

/// A literal run followed by an optional field reference.
///
/// `marker` is always [`Marker::None`] when `field` is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Token {
	/// Literal text preceding the field.
	pub text: String,
	/// The field name with its marker prefix stripped.
	pub field: Option<String>,
	pub marker: Marker,
	/// The raw format spec, possibly holding nested field references.
	pub spec: String,
	pub conversion: Option<String>,
}

impl Token {
	/// A token carrying only literal text.
	pub fn text(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			..Self::default()
		}
	}

	/// Classify a raw unit using the dialect's marker prefixes.
	pub fn from_unit(unit: RawUnit, markers: MarkerTable) -> Self {
		let RawUnit {
			text,
			field,
			spec,
			conversion,
		} = unit;

		let Some(field) = field else {
			return Self {
				text,
				field: None,
				marker: Marker::None,
				spec,
				conversion,
			};
		};

		let mut chars = field.chars();
		let marker = chars
			.next()
			.map_or(Marker::None, |prefix| markers.lookup(prefix));
		let field = match marker {
			Marker::None => field,
			_ => chars.as_str().to_string(),
		};

		Self {
			text,
			field: Some(field),
			marker,
			spec,
			conversion,
		}
	}

	/// Restore the invariant that a token without a field carries no marker.
	/// Tokens built by hand may not hold it.
	#[must_use]
	pub fn normalized(mut self) -> Self {
		if self.field.is_none() {
			self.marker = Marker::None;
		}

		self
	}

	/// The field name, or `""` for literal-only tokens.
	pub fn name(&self) -> &str {
		self.field.as_deref().unwrap_or_default()
	}

	pub fn is_literal(&self) -> bool {
		self.field.is_none()
	}
}

/// Lazily classify raw units into tokens. Marker detection looks at one unit
/// at a time.
pub fn tokenize(
	units: impl IntoIterator<Item = RawUnit>,
	markers: MarkerTable,
) -> impl Iterator<Item = Token> {
	units
		.into_iter()
		.map(move |unit| Token::from_unit(unit, markers))
}
