mod common;

use predicates::prelude::PredicateBooleanExt;
use stache_core::AnyEmptyResult;

#[test]
fn render_template_with_data_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("page.tpl"), "{{#items}}{{name}},{{/items}}")?;
	std::fs::write(
		tmp.path().join("data.json"),
		r#"{ "items": [{ "name": "a" }, { "name": "b" }] }"#,
	)?;

	common::stache_cmd()
		.current_dir(tmp.path())
		.arg("render")
		.arg("page.tpl")
		.arg("--data")
		.arg("data.json")
		.assert()
		.success()
		.stdout("a,b,");

	Ok(())
}

#[test]
fn render_from_stdin() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::stache_cmd()
		.current_dir(tmp.path())
		.arg("render")
		.arg("-")
		.arg("--set")
		.arg("name=ada")
		.write_stdin("hi {{name}}{{!unused}}")
		.assert()
		.success()
		.stdout("hi ada");

	Ok(())
}

#[test]
fn render_scope_precedence() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join("stache.toml"),
		"[data]\npkg = \"package.json\"\n",
	)?;
	std::fs::write(tmp.path().join("package.json"), r#"{ "name": "stache" }"#)?;
	std::fs::write(tmp.path().join("a.json"), r#"{ "x": "a", "y": "a", "z": "a" }"#)?;
	std::fs::write(tmp.path().join("b.yaml"), "x: b\ny: b\n")?;

	common::stache_cmd()
		.current_dir(tmp.path())
		.arg("render")
		.arg("-")
		.arg("--data")
		.arg("a.json")
		.arg("--data")
		.arg("b.yaml")
		.arg("--set")
		.arg("x=cli")
		.write_stdin("{{pkg.name}} {{x}} {{y}} {{z}}")
		.assert()
		.success()
		.stdout("stache cli b a");

	Ok(())
}

#[test]
fn render_json_values() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::stache_cmd()
		.current_dir(tmp.path())
		.arg("render")
		.arg("-")
		.arg("--set-json")
		.arg("n=5")
		.arg("--set-json")
		.arg("tags=[\"x\", \"y\"]")
		.write_stdin("{{n:03}} {{#tags}}<{{.}}>{{/tags}}")
		.assert()
		.success()
		.stdout("005 <x><y>");

	Ok(())
}

#[test]
fn render_quoted_set_value() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::stache_cmd()
		.current_dir(tmp.path())
		.arg("render")
		.arg("-")
		.arg("--set")
		.arg("greeting=\"a\\nb\"")
		.write_stdin("{{greeting}}")
		.assert()
		.success()
		.stdout("a\nb");

	Ok(())
}

#[test]
fn render_brace_syntax() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::stache_cmd()
		.current_dir(tmp.path())
		.arg("render")
		.arg("-")
		.arg("--syntax")
		.arg("brace")
		.arg("--set")
		.arg("x=1")
		.write_stdin("{{{x}}} {x:>3}")
		.assert()
		.success()
		.stdout("{1}   1");

	Ok(())
}

#[test]
fn render_to_output_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let output = tmp.path().join("out.txt");

	common::stache_cmd()
		.current_dir(tmp.path())
		.arg("render")
		.arg("-")
		.arg("--set")
		.arg("x=1")
		.arg("--output")
		.arg(&output)
		.write_stdin("x={{x}}")
		.assert()
		.success()
		.stdout("")
		.stderr(predicates::str::contains("wrote"));

	assert_eq!(std::fs::read_to_string(output)?, "x=1");

	Ok(())
}

#[test]
fn render_unterminated_section_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::stache_cmd()
		.current_dir(tmp.path())
		.arg("render")
		.arg("-")
		.arg("--set")
		.arg("a=1")
		.write_stdin("{{#a}}x")
		.assert()
		.failure()
		.code(2)
		.stderr(
			predicates::str::contains("stache::unterminated_section")
				.and(predicates::str::contains("missing closing marker for section")),
		);

	Ok(())
}

#[test]
fn render_lenient_recovers() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::stache_cmd()
		.current_dir(tmp.path())
		.arg("render")
		.arg("-")
		.arg("--lenient")
		.arg("--set")
		.arg("a=1")
		.write_stdin("{{#a}}x")
		.assert()
		.success()
		.stdout("x")
		.stderr(predicates::str::contains("closing unterminated section"));

	Ok(())
}

#[test]
fn render_invalid_conversion_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::stache_cmd()
		.current_dir(tmp.path())
		.arg("render")
		.arg("-")
		.write_stdin("{{x!nope}}")
		.assert()
		.failure()
		.code(2)
		.stderr(predicates::str::contains("invalid conversion"));

	Ok(())
}

#[test]
fn render_standard_converters_from_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("stache.toml"), "standard_converters = true\n")?;

	common::stache_cmd()
		.current_dir(tmp.path())
		.arg("render")
		.arg("-")
		.arg("--path")
		.arg(tmp.path())
		.arg("--set")
		.arg("x=<b>")
		.write_stdin("{{x!h}}")
		.assert()
		.success()
		.stdout("&lt;b&gt;");

	Ok(())
}

#[test]
fn render_rejects_non_mapping_data_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("list.json"), "[1, 2]")?;

	common::stache_cmd()
		.current_dir(tmp.path())
		.arg("render")
		.arg("-")
		.arg("--data")
		.arg("list.json")
		.write_stdin("{{x}}")
		.assert()
		.failure()
		.code(2)
		.stderr(predicates::str::contains("does not contain a mapping"));

	Ok(())
}

#[test]
fn render_missing_template_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::stache_cmd()
		.current_dir(tmp.path())
		.arg("render")
		.arg("missing.tpl")
		.assert()
		.failure()
		.code(2)
		.stderr(predicates::str::contains("failed to read template"));

	Ok(())
}

#[test]
fn render_verbose_logs_to_stderr() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::stache_cmd()
		.current_dir(tmp.path())
		.arg("--verbose")
		.arg("render")
		.arg("-")
		.arg("--set")
		.arg("a=1")
		.write_stdin("{{#a}}y{{/a}}")
		.assert()
		.success()
		.stdout("y")
		.stderr(predicates::str::contains("rendering template").and(predicates::str::contains("evaluating section")));

	Ok(())
}

#[test]
fn no_subcommand_exits_with_usage_hint() {
	common::stache_cmd()
		.assert()
		.failure()
		.code(1)
		.stderr(predicates::str::contains("stache --help"));
}
