mod common;

use stache_core::AnyEmptyResult;

/// Renders `{{x}}` with `x=1`. The brace dialect prints the escaped braces,
/// the ctemplate dialect prints the value.
fn render_probe(root: &std::path::Path) -> assert_cmd::assert::Assert {
	common::stache_cmd()
		.arg("render")
		.arg("-")
		.arg("--set")
		.arg("x=1")
		.arg("--path")
		.arg(root)
		.write_stdin("{{x}}")
		.assert()
}

#[test]
fn render_without_config_uses_ctemplate() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	render_probe(tmp.path()).success().stdout("1");

	Ok(())
}

#[test]
fn render_resolves_dot_stache_toml() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join(".stache.toml"), "syntax = \"brace\"\n")?;

	render_probe(tmp.path()).success().stdout("{x}");

	Ok(())
}

#[test]
fn render_resolves_dot_config_stache_toml() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join(".config"))?;
	std::fs::write(tmp.path().join(".config/stache.toml"), "syntax = \"brace\"\n")?;

	render_probe(tmp.path()).success().stdout("{x}");

	Ok(())
}

#[test]
fn render_prefers_stache_toml_over_other_candidates() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join(".config"))?;
	std::fs::write(tmp.path().join("stache.toml"), "syntax = \"ctemplate\"\n")?;
	std::fs::write(tmp.path().join(".stache.toml"), "syntax = \"brace\"\n")?;
	std::fs::write(tmp.path().join(".config/stache.toml"), "syntax = \"brace\"\n")?;

	render_probe(tmp.path()).success().stdout("1");

	Ok(())
}

#[test]
fn render_reports_invalid_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("stache.toml"), "syntax = [\n")?;

	render_probe(tmp.path())
		.failure()
		.code(2)
		.stderr(predicates::str::contains("stache::config_parse"));

	Ok(())
}
