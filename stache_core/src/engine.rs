use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::BraceSyntax;
use crate::CTemplateSyntax;
use crate::ConverterRegistry;
use crate::Dialect;
use crate::FormatSpec;
use crate::Marker;
use crate::Resolution;
use crate::Scope;
use crate::ScopeChain;
use crate::StacheError;
use crate::StacheResult;
use crate::Syntax;
use crate::Token;
use crate::tokenize;
use crate::value::display;
use crate::value::is_truthy;
use crate::value::kind;

/// How the evaluator treats sections that are not closed properly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strictness {
	/// Mismatched end markers and unterminated sections are errors.
	#[default]
	Strict,
	/// A mismatched end marker is kept as section content and an unterminated
	/// section runs to the end of the template.
	Lenient,
}

/// Options controlling a single render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderOptions {
	pub strictness: Strictness,
	pub resolution: Resolution,
}

impl RenderOptions {
	#[must_use]
	pub fn strictness(mut self, strictness: Strictness) -> Self {
		self.strictness = strictness;
		self
	}

	#[must_use]
	pub fn resolution(mut self, resolution: Resolution) -> Self {
		self.resolution = resolution;
		self
	}
}

/// Renders templates with nested sections against hierarchical data.
///
/// A formatter pairs a [`Syntax`] with the converters and options used while
/// rendering. It is configured up front and only read during [`render`].
///
/// [`render`]: Formatter::render
#[derive(Debug)]
pub struct Formatter {
	syntax: Box<dyn Syntax>,
	converters: ConverterRegistry,
	options: RenderOptions,
}

impl Default for Formatter {
	fn default() -> Self {
		Self::ctemplate()
	}
}

impl Formatter {
	pub fn new(syntax: impl Syntax + 'static) -> Self {
		Self {
			syntax: Box::new(syntax),
			converters: ConverterRegistry::new(),
			options: RenderOptions::default(),
		}
	}

	/// A formatter for `{name!conv:spec}` templates.
	pub fn brace() -> Self {
		Self::new(BraceSyntax)
	}

	/// A formatter for `{{name!conv:spec}}` templates.
	pub fn ctemplate() -> Self {
		Self::new(CTemplateSyntax)
	}

	pub fn from_dialect(dialect: Dialect) -> Self {
		Self {
			syntax: dialect.syntax(),
			converters: ConverterRegistry::new(),
			options: RenderOptions::default(),
		}
	}

	#[must_use]
	pub fn with_syntax(mut self, syntax: impl Syntax + 'static) -> Self {
		self.syntax = Box::new(syntax);
		self
	}

	#[must_use]
	pub fn with_options(mut self, options: RenderOptions) -> Self {
		self.options = options;
		self
	}

	#[must_use]
	pub fn with_converters(mut self, converters: ConverterRegistry) -> Self {
		self.converters = converters;
		self
	}

	/// Register a conversion available as `!key` in fields and sections.
	pub fn register_converter(
		&mut self,
		key: impl Into<String>,
		converter: impl Fn(Value) -> Value + Send + Sync + 'static,
	) -> &mut Self {
		self.converters.register(key, converter);
		self
	}

	pub fn options(&self) -> RenderOptions {
		self.options
	}

	pub fn converters(&self) -> &ConverterRegistry {
		&self.converters
	}

	/// Parse a template into its token stream.
	pub fn tokenize(&self, template: &str) -> StacheResult<Vec<Token>> {
		let units = self.syntax.parse(template)?;
		Ok(tokenize(units, self.syntax.markers()).collect())
	}

	/// Render `template` with `data` as the global scope. `data` must be a
	/// mapping, or `null` for no data at all.
	pub fn render(&self, template: &str, data: &Value) -> StacheResult<String> {
		match data {
			Value::Object(map) => self.render_map(template, map),
			Value::Null => self.render_with_scopes(template, &ScopeChain::new()),
			other => {
				Err(StacheError::InvalidData(format!(
					"expected a mapping, found a {}",
					kind(other)
				)))
			}
		}
	}

	pub fn render_map(&self, template: &str, data: &Map<String, Value>) -> StacheResult<String> {
		self.render_with_scopes(template, &ScopeChain::global(data))
	}

	/// Render `template` against an explicit scope chain, innermost first.
	pub fn render_with_scopes(&self, template: &str, scopes: &ScopeChain<'_>) -> StacheResult<String> {
		let tokens = self.tokenize(template)?;
		self.evaluate(&tokens, scopes)
	}

	/// Render an already tokenized template.
	pub fn render_tokens(
		&self,
		tokens: impl IntoIterator<Item = Token>,
		scopes: &ScopeChain<'_>,
	) -> StacheResult<String> {
		let tokens: Vec<Token> = tokens.into_iter().map(Token::normalized).collect();
		self.evaluate(&tokens, scopes)
	}

	/// Walk one level of the token stream. At most one section is open at a
	/// time; anything nested inside it is buffered and handled when the
	/// section recurses.
	fn evaluate(&self, tokens: &[Token], scopes: &ScopeChain<'_>) -> StacheResult<String> {
		let ends = comment_ends(tokens);
		let strictness = self.options.strictness;
		let mut output = String::new();
		let mut section: Option<Section> = None;

		for (index, (token, comment_end)) in tokens.iter().zip(ends).enumerate() {
			if let Some(open) = section.as_mut() {
				if open.buffer(index, token, comment_end, strictness)? {
					if let Some(closed) = section.take() {
						output.push_str(&self.render_section(closed, scopes)?);
					}
				}

				continue;
			}

			output.push_str(&token.text);

			match token.marker {
				Marker::StartSection => section = Some(Section::open(token, SectionKind::Normal)),
				Marker::Comment => {
					if let Some(end) = comment_end {
						section = Some(Section::open(token, SectionKind::Comment { end }));
					}
				}
				Marker::EndSection => {
					tracing::warn!(name = token.name(), "ignoring end marker with no open section");
				}
				Marker::None => {
					if !token.is_literal() {
						output.push_str(&self.render_field(token, scopes)?);
					}
				}
			}
		}

		if let Some(open) = section {
			if strictness == Strictness::Strict {
				return Err(StacheError::UnterminatedSection(open.name));
			}

			tracing::warn!(name = %open.name, "closing unterminated section at the end of the template");
			output.push_str(&self.render_section(open, scopes)?);
		}

		Ok(output)
	}

	fn render_section(&self, section: Section, scopes: &ScopeChain<'_>) -> StacheResult<String> {
		if matches!(section.kind, SectionKind::Comment { .. }) {
			tracing::trace!(name = %section.name, "skipping comment section");
			return Ok(String::new());
		}

		let value = scopes.lookup(&section.name, self.options.resolution);
		let iterations = section_scopes(value);
		tracing::debug!(
			name = %section.name,
			iterations = iterations.len(),
			"evaluating section"
		);

		if iterations.is_empty() {
			return Ok(String::new());
		}

		let mut rendered = String::new();

		for scope in iterations {
			let chain = match scope {
				Some(scope) => scopes.with_inner(scope),
				None => scopes.clone(),
			};
			rendered.push_str(&self.evaluate(&section.tokens, &chain)?);
		}

		self.finish(
			Value::String(rendered),
			section.conversion.as_deref(),
			&section.spec,
			scopes,
		)
	}

	fn render_field(&self, token: &Token, scopes: &ScopeChain<'_>) -> StacheResult<String> {
		let value = scopes
			.lookup(token.name(), self.options.resolution)
			.cloned()
			.unwrap_or_else(|| Value::String(String::new()));

		self.finish(value, token.conversion.as_deref(), &token.spec, scopes)
	}

	/// Apply the conversion, then the format spec.
	fn finish(
		&self,
		value: Value,
		conversion: Option<&str>,
		spec: &str,
		scopes: &ScopeChain<'_>,
	) -> StacheResult<String> {
		let converted = self.converters.convert(value, conversion)?;
		self.format_value(&converted, spec, scopes)
	}

	/// Format `value` with `spec`. A spec containing braces is a template in
	/// its own right and is rendered with the same scopes first.
	fn format_value(&self, value: &Value, spec: &str, scopes: &ScopeChain<'_>) -> StacheResult<String> {
		if spec.is_empty() {
			return Ok(display(value));
		}

		let spec = if spec.contains(['{', '}']) {
			self.render_with_scopes(spec, scopes)?
		} else {
			spec.to_string()
		};

		FormatSpec::parse(&spec)?.apply(value)
	}
}

/// Render a ctemplate-style template with `data` as the global scope.
///
/// ```rust
/// use serde_json::json;
///
/// let rendered = stache_core::render(
/// 	"{{#items}}{{name}},{{/items}}",
/// 	&json!({ "items": [{ "name": "a" }, { "name": "b" }] }),
/// )
/// .unwrap();
///
/// assert_eq!(rendered, "a,b,");
/// ```
pub fn render(template: &str, data: &Value) -> StacheResult<String> {
	Formatter::ctemplate().render(template, data)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
	Normal,
	/// A comment section closed by the end marker at token index `end`.
	Comment { end: usize },
}

/// A section being collected. Its tokens are evaluated once the matching end
/// marker is found.
#[derive(Debug)]
struct Section {
	name: String,
	kind: SectionKind,
	tokens: Vec<Token>,
	conversion: Option<String>,
	spec: String,
	/// Sections opened inside this one and not yet closed. Its length is the
	/// nesting depth.
	nested: Vec<(String, SectionKind)>,
}

impl Section {
	fn open(token: &Token, kind: SectionKind) -> Self {
		Self {
			name: token.name().to_string(),
			kind,
			tokens: vec![],
			conversion: token.conversion.clone(),
			spec: token.spec.clone(),
			nested: vec![],
		}
	}

	fn depth(&self) -> usize {
		self.nested.len()
	}

	/// Buffer the token at `index`. Returns `true` once the token closes this
	/// section. Inside a comment only the comment's own end marker counts.
	fn buffer(
		&mut self,
		index: usize,
		token: &Token,
		comment_end: Option<usize>,
		strictness: Strictness,
	) -> StacheResult<bool> {
		if let Some(end) = self.open_comment_end() {
			if index == end && self.nested.pop().is_none() {
				self.tokens.push(Token::text(token.text.clone()));
				return Ok(true);
			}

			self.tokens.push(token.clone());
			return Ok(false);
		}

		match token.marker {
			Marker::StartSection => {
				self.nested
					.push((token.name().to_string(), SectionKind::Normal));
			}
			Marker::Comment => {
				if let Some(end) = comment_end {
					self.nested
						.push((token.name().to_string(), SectionKind::Comment { end }));
				}
			}
			Marker::EndSection => {
				if self.expected() != token.name() {
					self.mismatched(token, strictness)?;
				} else if self.depth() > 0 {
					self.nested.pop();
				} else {
					// The end marker's text still belongs to the section body.
					self.tokens.push(Token::text(token.text.clone()));
					return Ok(true);
				}
			}
			Marker::None => {}
		}

		self.tokens.push(token.clone());
		Ok(false)
	}

	/// The name the next end marker must carry.
	fn expected(&self) -> &str {
		self.nested
			.last()
			.map_or(self.name.as_str(), |(name, _)| name.as_str())
	}

	/// The closing index of the comment the buffered tokens are inside of.
	/// Nothing is nested inside a comment, so it is always the innermost entry.
	fn open_comment_end(&self) -> Option<usize> {
		let kind = self.nested.last().map_or(self.kind, |(_, kind)| *kind);

		match kind {
			SectionKind::Comment { end } => Some(end),
			SectionKind::Normal => None,
		}
	}

	fn mismatched(&self, token: &Token, strictness: Strictness) -> StacheResult<()> {
		let expected = self.expected();

		if strictness == Strictness::Strict {
			return Err(StacheError::MismatchedSection {
				expected: expected.to_string(),
				found: token.name().to_string(),
			});
		}

		tracing::warn!(
			expected = %expected,
			found = token.name(),
			"keeping mismatched end marker as section content"
		);

		Ok(())
	}
}

/// For each comment token that opens a comment section, the index of the end
/// marker closing it.
///
/// A comment closes at the first later end marker with its name. Everything in
/// between is opaque. When an end marker for the innermost enclosing section
/// arrives first, or the tokens run out, the comment is standalone and the
/// tokens after it are scanned again as regular structure.
fn comment_ends(tokens: &[Token]) -> Vec<Option<usize>> {
	let mut ends = vec![None; tokens.len()];
	let mut open: Vec<&str> = vec![];
	let mut comment: Option<(usize, &str)> = None;
	let mut index = 0;

	loop {
		while let Some(token) = tokens.get(index) {
			if let Some((start, name)) = comment {
				if token.marker == Marker::EndSection {
					if token.name() == name {
						ends[start] = Some(index);
						comment = None;
					} else if open.last() == Some(&token.name()) {
						comment = None;
						index = start + 1;
						continue;
					}
				}

				index += 1;
				continue;
			}

			match token.marker {
				Marker::StartSection => open.push(token.name()),
				Marker::Comment => comment = Some((index, token.name())),
				Marker::EndSection => {
					if open.last() == Some(&token.name()) {
						open.pop();
					}
				}
				Marker::None => {}
			}

			index += 1;
		}

		match comment.take() {
			Some((start, _)) => index = start + 1,
			None => break,
		}
	}

	ends
}

/// The scopes to prepend for each iteration of a section bound to `value`.
/// `None` keeps the enclosing chain unchanged for that iteration.
fn section_scopes(value: Option<&Value>) -> Vec<Option<Scope<'_>>> {
	match value {
		Some(value) if !is_truthy(value) => vec![],
		None => vec![],
		Some(Value::Array(items)) => {
			items
				.iter()
				.map(|item| {
					Some(match item {
						Value::Object(map) => Scope::Map(map),
						other => Scope::Item(other),
					})
				})
				.collect()
		}
		Some(Value::Object(map)) => vec![Some(Scope::Map(map))],
		Some(_) => vec![None],
	}
}
