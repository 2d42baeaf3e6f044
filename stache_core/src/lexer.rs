use std::ops::Range;

use logos::Logos;

use crate::StacheError;
use crate::StacheResult;

/// Raw tokens produced by logos for flat tokenization of a template. Only
/// braces carry structure; everything else is a run of text.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawToken {
	#[token("{")]
	BraceOpen,
	#[token("}")]
	BraceClose,
	#[regex(r"[^{}]+")]
	Text,
}

/// Walks the logos token stream with a cursor. The dialects in
/// [`crate::syntax`] drive the walker and decide what each brace means.
pub(crate) struct BraceWalker<'a> {
	/// The template source.
	source: &'a str,
	/// The collected raw tokens and their byte spans.
	raw_tokens: Vec<(RawToken, Range<usize>)>,
	/// Current index into `raw_tokens`.
	cursor: usize,
}

impl<'a> BraceWalker<'a> {
	pub(crate) fn new(source: &'a str) -> Self {
		// Every byte is covered by one of the three patterns, so a lexing error
		// can only be a stray fragment of text.
		let raw_tokens = RawToken::lexer(source)
			.spanned()
			.map(|(result, span)| (result.unwrap_or(RawToken::Text), span))
			.collect();

		Self {
			source,
			raw_tokens,
			cursor: 0,
		}
	}

	/// The raw token under the cursor.
	pub(crate) fn current(&self) -> Option<RawToken> {
		self.peek(0)
	}

	/// The raw token `distance` places after the cursor.
	pub(crate) fn peek(&self, distance: usize) -> Option<RawToken> {
		self.raw_tokens
			.get(self.cursor + distance)
			.map(|(token, _)| *token)
	}

	/// Get the text slice for the current raw token.
	pub(crate) fn current_slice(&self) -> &'a str {
		self.raw_tokens
			.get(self.cursor)
			.map_or("", |(_, span)| &self.source[span.clone()])
	}

	/// Byte offset of the current raw token, or the end of the source once the
	/// walker is exhausted.
	pub(crate) fn offset(&self) -> usize {
		self.raw_tokens
			.get(self.cursor)
			.map_or(self.source.len(), |(_, span)| span.start)
	}

	pub(crate) fn advance(&mut self, count: usize) {
		self.cursor = (self.cursor + count).min(self.raw_tokens.len());
	}

	/// Count consecutive raw tokens of the given kind starting at the cursor.
	pub(crate) fn run_length(&self, kind: RawToken) -> usize {
		self.raw_tokens[self.cursor..]
			.iter()
			.take_while(|(token, _)| *token == kind)
			.count()
	}

	/// Consume a single-brace field body. The cursor must sit just after the
	/// opening `{`; nested `{`/`}` pairs are kept inside the body. The cursor
	/// ends just after the closing `}`.
	pub(crate) fn take_single_braced(&mut self, opened_at: usize) -> StacheResult<&'a str> {
		let start = self.offset();
		let mut depth = 1usize;

		while let Some(token) = self.current() {
			match token {
				RawToken::BraceOpen => depth += 1,
				RawToken::BraceClose => {
					depth -= 1;

					if depth == 0 {
						let end = self.offset();
						self.advance(1);
						return Ok(&self.source[start..end]);
					}
				}
				RawToken::Text => {}
			}

			self.advance(1);
		}

		Err(StacheError::UnterminatedField { offset: opened_at })
	}

	/// Consume a double-brace tag body. The cursor must sit just after the
	/// opening `{{`; nested `{{`/`}}` pairs are kept inside the body while
	/// single braces are plain content. The cursor ends just after the closing
	/// `}}`.
	pub(crate) fn take_double_braced(&mut self, opened_at: usize) -> StacheResult<&'a str> {
		let start = self.offset();
		let mut depth = 1usize;

		while let Some(token) = self.current() {
			let doubled = self.peek(1) == Some(token);

			match token {
				RawToken::BraceOpen if doubled => {
					depth += 1;
					self.advance(2);
				}
				RawToken::BraceClose if doubled => {
					depth -= 1;
					let end = self.offset();
					self.advance(2);

					if depth == 0 {
						return Ok(&self.source[start..end]);
					}
				}
				_ => self.advance(1),
			}
		}

		Err(StacheError::UnterminatedField { offset: opened_at })
	}
}
