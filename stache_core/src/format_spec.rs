//! The format-spec mini-language:
//!
//! ```text
//! [[fill]align][sign][#][0][width][grouping][.precision][type]
//! ```
//!
//! Strings accept `s` (or no type), integers accept `b c d o x X n` and the
//! float types, floats accept `e E f F g G n %`. Width and precision count
//! characters, not bytes.

use serde_json::Number;
use serde_json::Value;

use crate::StacheError;
use crate::StacheResult;
use crate::value::display;

/// The largest width or precision a spec may ask for.
pub const MAX_FORMAT_NUMBER: usize = i32::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
	/// `<`
	Left,
	/// `>`
	Right,
	/// `^`
	Center,
	/// `=`: padding goes between the sign and the digits.
	AfterSign,
}

impl Align {
	fn from_char(ch: char) -> Option<Self> {
		match ch {
			'<' => Some(Self::Left),
			'>' => Some(Self::Right),
			'^' => Some(Self::Center),
			'=' => Some(Self::AfterSign),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
	/// `-`: only negative numbers carry a sign.
	Minus,
	/// `+`
	Plus,
	/// ` `: positive numbers get a leading space.
	Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
	/// `,`
	Comma,
	/// `_`
	Underscore,
}

impl Grouping {
	fn separator(self) -> char {
		match self {
			Self::Comma => ',',
			Self::Underscore => '_',
		}
	}
}

/// A parsed format spec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatSpec {
	pub fill: Option<char>,
	pub align: Option<Align>,
	pub sign: Option<Sign>,
	/// `#`
	pub alternate: bool,
	/// `0`
	pub zero: bool,
	pub width: Option<usize>,
	pub grouping: Option<Grouping>,
	pub precision: Option<usize>,
	pub kind: Option<char>,
	/// The spec as written, for error messages.
	source: String,
}

impl FormatSpec {
	pub fn parse(spec: &str) -> StacheResult<Self> {
		let chars: Vec<char> = spec.chars().collect();
		let mut parsed = Self {
			source: spec.to_string(),
			..Self::default()
		};
		let mut i = 0;

		if let Some(align) = chars.get(1).copied().and_then(Align::from_char) {
			parsed.fill = Some(chars[0]);
			parsed.align = Some(align);
			i = 2;
		} else if let Some(align) = chars.first().copied().and_then(Align::from_char) {
			parsed.align = Some(align);
			i = 1;
		}

		parsed.sign = match chars.get(i) {
			Some('+') => Some(Sign::Plus),
			Some('-') => Some(Sign::Minus),
			Some(' ') => Some(Sign::Space),
			_ => None,
		};
		if parsed.sign.is_some() {
			i += 1;
		}

		if chars.get(i) == Some(&'#') {
			parsed.alternate = true;
			i += 1;
		}

		if chars.get(i) == Some(&'0') {
			parsed.zero = true;
			i += 1;
		}

		let (width, next) = parsed.read_number(&chars, i)?;
		parsed.width = width;
		i = next;

		parsed.grouping = match chars.get(i) {
			Some(',') => Some(Grouping::Comma),
			Some('_') => Some(Grouping::Underscore),
			_ => None,
		};
		if parsed.grouping.is_some() {
			i += 1;
		}

		if chars.get(i) == Some(&'.') {
			let (precision, next) = parsed.read_number(&chars, i + 1)?;
			if precision.is_none() {
				return Err(parsed.error("format specifier missing precision"));
			}
			parsed.precision = precision;
			i = next;
		}

		if let Some(kind) = chars.get(i) {
			parsed.kind = Some(*kind);
			i += 1;
		}

		if i < chars.len() {
			return Err(parsed.error("invalid format specifier"));
		}

		Ok(parsed)
	}

	/// Whether this spec leaves values untouched.
	pub fn is_empty(&self) -> bool {
		self.source.is_empty()
	}

	/// Format `value` according to this spec.
	pub fn apply(&self, value: &Value) -> StacheResult<String> {
		if self.is_empty() {
			return Ok(display(value));
		}

		match value {
			Value::Number(number) => self.format_number(number),
			_ => self.format_str(&display(value)),
		}
	}

	fn read_number(&self, chars: &[char], start: usize) -> StacheResult<(Option<usize>, usize)> {
		let digits: String = chars[start.min(chars.len())..]
			.iter()
			.take_while(|ch| ch.is_ascii_digit())
			.collect();

		if digits.is_empty() {
			return Ok((None, start));
		}

		let number = digits
			.parse::<usize>()
			.ok()
			.filter(|number| *number <= MAX_FORMAT_NUMBER)
			.ok_or_else(|| self.error("too many decimal digits in format string"))?;

		Ok((Some(number), start + digits.len()))
	}

	fn error(&self, reason: impl Into<String>) -> StacheError {
		StacheError::InvalidFormatSpec {
			spec: self.source.clone(),
			reason: reason.into(),
		}
	}

	fn unknown_code(&self, kind: char, type_name: &str) -> StacheError {
		self.error(format!(
			"unknown format code `{kind}` for object of type `{type_name}`"
		))
	}

	fn format_str(&self, text: &str) -> StacheResult<String> {
		if let Some(kind) = self.kind.filter(|kind| *kind != 's') {
			return Err(self.unknown_code(kind, "str"));
		}
		if self.sign.is_some() {
			return Err(self.error("sign not allowed in string format specifier"));
		}
		if self.alternate {
			return Err(self.error("alternate form (#) not allowed in string format specifier"));
		}
		if self.align == Some(Align::AfterSign) {
			return Err(self.error("`=` alignment not allowed in string format specifier"));
		}
		if self.grouping.is_some() {
			return Err(self.error("cannot specify grouping with a string"));
		}

		let body: String = match self.precision {
			Some(precision) => text.chars().take(precision).collect(),
			None => text.to_string(),
		};

		Ok(self.pad("", &body, Align::Left))
	}

	fn format_number(&self, number: &Number) -> StacheResult<String> {
		if let Some(int) = number.as_i64() {
			return self.format_int(i128::from(int));
		}
		if let Some(int) = number.as_u64() {
			return self.format_int(i128::from(int));
		}

		self.format_float(number.as_f64().unwrap_or(f64::NAN))
	}

	fn format_int(&self, int: i128) -> StacheResult<String> {
		let kind = self.kind.unwrap_or('d');

		if matches!(kind, 'e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%') {
			return self.format_float(int as f64);
		}

		if self.precision.is_some() {
			return Err(self.error("precision not allowed in integer format specifier"));
		}

		let magnitude = int.unsigned_abs();
		let (digits, prefix, group_size) = match kind {
			'd' | 'n' => (magnitude.to_string(), "", 3),
			'b' => (format!("{magnitude:b}"), "0b", 4),
			'o' => (format!("{magnitude:o}"), "0o", 4),
			'x' => (format!("{magnitude:x}"), "0x", 4),
			'X' => (format!("{magnitude:X}"), "0X", 4),
			'c' => {
				if self.sign.is_some() {
					return Err(self.error("sign not allowed with integer format specifier `c`"));
				}
				let ch = u32::try_from(int)
					.ok()
					.and_then(char::from_u32)
					.ok_or_else(|| self.error("`c` arg not in a valid character range"))?;
				return Ok(self.pad("", &ch.to_string(), Align::Right));
			}
			other => return Err(self.unknown_code(other, "int")),
		};

		if self.grouping == Some(Grouping::Comma) && group_size != 3 {
			return Err(self.error(format!("cannot specify `,` with `{kind}`")));
		}
		if kind == 'n' && self.grouping.is_some() {
			return Err(self.error("cannot specify grouping with `n`"));
		}

		let mut lead = self.sign_prefix(int < 0).to_string();
		if self.alternate {
			lead.push_str(prefix);
		}

		let body = self.group_integer(&digits, group_size, lead.chars().count());
		Ok(self.pad(&lead, &body, Align::Right))
	}

	fn format_float(&self, float: f64) -> StacheResult<String> {
		let precision = self.precision;
		let magnitude = float.abs();
		let upper = matches!(self.kind, Some('E' | 'F' | 'G'));

		let body = if !magnitude.is_finite() {
			let text = if magnitude.is_nan() { "nan" } else { "inf" };
			match self.kind {
				Some('%') => format!("{text}%"),
				_ => text.to_string(),
			}
		} else {
			match self.kind {
				None => match precision {
					None => shortest(magnitude),
					Some(precision) => {
						let mut text = general(magnitude, precision, self.alternate);
						if !text.contains(['.', 'e']) {
							text.push_str(".0");
						}
						text
					}
				},
				Some('f' | 'F') => format!("{:.*}", precision.unwrap_or(6), magnitude),
				Some('e' | 'E') => scientific(magnitude, precision.unwrap_or(6)),
				Some('g' | 'G' | 'n') => general(magnitude, precision.unwrap_or(6), self.alternate),
				Some('%') => format!("{:.*}%", precision.unwrap_or(6), magnitude * 100.0),
				Some(other) => return Err(self.unknown_code(other, "float")),
			}
		};

		if self.kind == Some('n') && self.grouping.is_some() {
			return Err(self.error("cannot specify grouping with `n`"));
		}

		let body = if upper { body.to_uppercase() } else { body };
		let lead = self.sign_prefix(float.is_sign_negative() && !float.is_nan());

		let body = match body.find(['.', 'e', 'E', '%']) {
			Some(split) if magnitude.is_finite() => {
				let (integer, rest) = body.split_at(split);
				let mut grouped = self.group_integer(integer, 3, lead.chars().count() + rest.chars().count());
				grouped.push_str(rest);
				grouped
			}
			_ if magnitude.is_finite() => self.group_integer(&body, 3, lead.chars().count()),
			_ => body,
		};

		Ok(self.pad(lead, &body, Align::Right))
	}

	fn sign_prefix(&self, negative: bool) -> &'static str {
		if negative {
			return "-";
		}

		match self.sign {
			Some(Sign::Plus) => "+",
			Some(Sign::Space) => " ",
			Some(Sign::Minus) | None => "",
		}
	}

	/// Insert the grouping separator into a run of digits. Zero padding is
	/// grouped too, so it is applied here when it is in effect.
	fn group_integer(&self, digits: &str, group_size: usize, reserved: usize) -> String {
		let zero_padded = self.zero_fill() == Some('0') && self.effective_align(Align::Right) == Align::AfterSign;
		let target = match (zero_padded, self.width) {
			(true, Some(width)) => width.saturating_sub(reserved),
			_ => 0,
		};

		let Some(grouping) = self.grouping else {
			if digits.len() >= target {
				return digits.to_string();
			}
			return format!("{}{digits}", "0".repeat(target - digits.len()));
		};

		let mut digits = digits.to_string();
		loop {
			let grouped = insert_separators(&digits, group_size, grouping.separator());
			if grouped.chars().count() >= target {
				return grouped;
			}
			digits.insert(0, '0');
		}
	}

	/// The fill implied by the `0` flag when no explicit alignment is given.
	fn zero_fill(&self) -> Option<char> {
		match (self.fill, self.align) {
			(Some(fill), _) => Some(fill),
			(None, None) if self.zero => Some('0'),
			_ => None,
		}
	}

	fn effective_align(&self, default: Align) -> Align {
		match self.align {
			Some(align) => align,
			None if self.zero && default == Align::Right => Align::AfterSign,
			None => default,
		}
	}

	fn pad(&self, lead: &str, body: &str, default: Align) -> String {
		let width = self.width.unwrap_or(0);
		let len = lead.chars().count() + body.chars().count();

		if len >= width {
			return format!("{lead}{body}");
		}

		let fill = self.zero_fill().unwrap_or(' ').to_string();
		let padding = width - len;

		match self.effective_align(default) {
			Align::Left => format!("{lead}{body}{}", fill.repeat(padding)),
			Align::Right => format!("{}{lead}{body}", fill.repeat(padding)),
			Align::Center => {
				let left = padding / 2;
				format!(
					"{}{lead}{body}{}",
					fill.repeat(left),
					fill.repeat(padding - left)
				)
			}
			Align::AfterSign => format!("{lead}{}{body}", fill.repeat(padding)),
		}
	}
}

fn insert_separators(digits: &str, group_size: usize, separator: char) -> String {
	let count = digits.chars().count();
	let mut grouped = String::with_capacity(count + count / group_size);

	for (index, ch) in digits.chars().enumerate() {
		if index > 0 && (count - index) % group_size == 0 {
			grouped.push(separator);
		}
		grouped.push(ch);
	}

	grouped
}

/// The shortest representation that reads back as the same float, with at
/// least one fractional digit. Very large and very small magnitudes switch to
/// scientific notation.
fn shortest(magnitude: f64) -> String {
	if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
		let text = format!("{magnitude:e}");
		return normalize_exponent(&text);
	}

	let text = format!("{magnitude}");
	if text.contains('.') {
		text
	} else {
		format!("{text}.0")
	}
}

fn scientific(magnitude: f64, precision: usize) -> String {
	normalize_exponent(&format!("{magnitude:.precision$e}"))
}

/// `1.5e3` → `1.5e+03`
fn normalize_exponent(text: &str) -> String {
	let Some((mantissa, exponent)) = text.split_once('e') else {
		return text.to_string();
	};
	let exponent: i32 = exponent.parse().unwrap_or(0);
	let sign = if exponent < 0 { '-' } else { '+' };

	format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
}

/// `g` formatting: scientific when the exponent is below -4 or at least the
/// precision, fixed-point otherwise. Trailing zeros are removed unless the
/// alternate form is requested.
fn general(magnitude: f64, precision: usize, alternate: bool) -> String {
	let precision = precision.max(1);
	let exponent = if magnitude == 0.0 {
		0
	} else {
		let text = format!("{magnitude:.prec$e}", prec = precision - 1);
		text.split_once('e')
			.and_then(|(_, exponent)| exponent.parse::<i32>().ok())
			.unwrap_or(0)
	};

	let text = if exponent < -4 || exponent >= precision as i32 {
		scientific(magnitude, precision - 1)
	} else {
		let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
		format!("{magnitude:.decimals$}")
	};

	if alternate {
		return text;
	}

	strip_trailing_zeros(&text)
}

fn strip_trailing_zeros(text: &str) -> String {
	let (mantissa, exponent) = match text.find('e') {
		Some(index) => text.split_at(index),
		None => (text, ""),
	};

	if !mantissa.contains('.') {
		return text.to_string();
	}

	let trimmed = mantissa.trim_end_matches('0').trim_end_matches('.');
	format!("{trimmed}{exponent}")
}
