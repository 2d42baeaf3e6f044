use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use owo_colors::OwoColorize;
use serde_json::Map;
use serde_json::Value;
use stache_cli::Commands;
use stache_cli::RenderArgs;
use stache_cli::StacheCli;
use stache_cli::SyntaxArg;
use stache_core::AnyEmptyResult;
use stache_core::AnyResult;
use stache_core::Formatter;
use stache_core::ScopeChain;
use stache_core::StacheConfig;
use stache_core::StacheError;
use stache_core::Strictness;
use stache_core::load_data_file;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = StacheCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose);

	let result = match &args.command {
		Some(Commands::Render(render)) => run_render(&args, render),
		Some(Commands::Tokens { template, syntax }) => run_tokens(&args, template, *syntax),
		None => {
			eprintln!("No subcommand specified. Run `stache --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		match e.downcast::<StacheError>() {
			Ok(stache_err) => {
				let report: miette::Report = (*stache_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `--verbose` shows debug events, otherwise `RUST_LOG`
/// decides and warnings are shown by default.
fn init_tracing(verbose: bool) {
	let filter = if verbose {
		EnvFilter::new("debug")
	} else {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
	};

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.with_ansi(color_enabled())
		.init();
}

fn resolve_root(args: &StacheCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn load_config(args: &StacheCli, syntax: Option<SyntaxArg>) -> AnyResult<StacheConfig> {
	let root = resolve_root(args);
	let mut config = StacheConfig::load(&root)?.unwrap_or_default();

	if let Some(syntax) = syntax {
		config.syntax = syntax.into();
	}

	Ok(config)
}

fn read_template(path: &Path) -> AnyResult<String> {
	if path == Path::new("-") {
		let mut template = String::new();
		std::io::stdin().read_to_string(&mut template)?;
		return Ok(template);
	}

	std::fs::read_to_string(path).map_err(|e| format!("failed to read template `{}`: {e}", path.display()).into())
}

/// Load a `--data` file, which must hold a mapping.
fn load_data_mapping(path: &Path) -> AnyResult<Map<String, Value>> {
	match load_data_file(path, None)? {
		Value::Object(map) => Ok(map),
		_ => {
			Err(StacheError::InvalidData(format!(
				"`{}` does not contain a mapping",
				path.display()
			))
			.into())
		}
	}
}

fn run_render(args: &StacheCli, render: &RenderArgs) -> AnyEmptyResult {
	let root = resolve_root(args);
	let mut config = load_config(args, render.syntax)?;

	if render.lenient {
		config.strictness = Strictness::Lenient;
	}

	let formatter: Formatter = config.formatter();
	let template = read_template(&render.template)?;

	let mut overrides = Map::new();
	for (key, value) in &render.set {
		overrides.insert(key.clone(), Value::String(value.clone()));
	}
	for (key, value) in &render.set_json {
		overrides.insert(key.clone(), value.clone());
	}

	let files = render
		.data
		.iter()
		.map(|path| load_data_mapping(path))
		.collect::<AnyResult<Vec<_>>>()?;
	let global = config.load_data(&root)?;

	let mut scopes = ScopeChain::global(&overrides);
	for file in files.iter().rev() {
		scopes.push_outer(file);
	}
	scopes.push_outer(&global);

	tracing::debug!(
		scopes = scopes.len(),
		syntax = ?config.syntax,
		strictness = ?config.strictness,
		"rendering template"
	);
	let rendered = formatter.render_with_scopes(&template, &scopes)?;

	match &render.output {
		Some(output) => {
			std::fs::write(output, rendered)?;
			eprintln!("{} {}", colored!("wrote", green), output.display());
		}
		None => {
			let mut stdout = std::io::stdout().lock();
			stdout.write_all(rendered.as_bytes())?;
			stdout.flush()?;
		}
	}

	Ok(())
}

fn run_tokens(args: &StacheCli, template: &Path, syntax: Option<SyntaxArg>) -> AnyEmptyResult {
	let config = load_config(args, syntax)?;
	let template = read_template(template)?;
	let tokens = config.formatter().tokenize(&template)?;

	println!("{}", serde_json::to_string_pretty(&tokens)?);

	Ok(())
}
