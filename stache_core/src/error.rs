use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum StacheError {
	#[error(transparent)]
	#[diagnostic(code(stache::io_error))]
	Io(#[from] std::io::Error),

	#[error("single `}}` encountered in format string at byte {offset}")]
	#[diagnostic(
		code(stache::unmatched_brace),
		help("write `}}}}` for a literal closing brace")
	)]
	UnmatchedBrace { offset: usize },

	#[error("expected `}}` before end of string for the field opened at byte {offset}")]
	#[diagnostic(code(stache::unterminated_field))]
	UnterminatedField { offset: usize },

	#[error("invalid field `{field}`: {reason}")]
	#[diagnostic(code(stache::invalid_field))]
	InvalidField { field: String, reason: String },

	#[error("missing closing marker for section: `{0}`")]
	#[diagnostic(
		code(stache::unterminated_section),
		help("close the section with a matching end marker, e.g. `{{{{/{0}}}}}`")
	)]
	UnterminatedSection(String),

	#[error("section `{expected}` was closed by `{found}`")]
	#[diagnostic(
		code(stache::mismatched_section),
		help("end markers must name the section they close; inner sections close first")
	)]
	MismatchedSection { expected: String, found: String },

	#[error("invalid conversion: `{0}`")]
	#[diagnostic(
		code(stache::invalid_conversion),
		help("register a converter for this key, or use one of the built-in codes: s, r, a")
	)]
	InvalidConversion(String),

	#[error("invalid format spec `{spec}`: {reason}")]
	#[diagnostic(code(stache::invalid_format_spec))]
	InvalidFormatSpec { spec: String, reason: String },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(stache::config_parse),
		help("check that stache.toml is valid TOML")
	)]
	ConfigParse(String),

	#[error("failed to load data file `{path}`: {reason}")]
	#[diagnostic(code(stache::data_file))]
	DataFile { path: String, reason: String },

	#[error("unsupported data file format: `{0}`")]
	#[diagnostic(
		code(stache::unsupported_format),
		help("supported formats: text, json, toml, yaml, yml")
	)]
	UnsupportedDataFormat(String),

	#[error("invalid template data: {0}")]
	#[diagnostic(
		code(stache::invalid_data),
		help("template data must be a mapping from field names to values")
	)]
	InvalidData(String),
}

pub type StacheResult<T> = Result<T, StacheError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
