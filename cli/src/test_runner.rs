use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use renderer::{CompileError, RenderTree, ThemeRegistry};

#[derive(Debug, Deserialize)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Theme to render with, overriding the document's config block.
    #[serde(default)]
    pub theme: Option<String>,

    /// Expected exact rendered output (trimmed comparison).
    #[serde(default)]
    pub expect_output: Option<String>,

    /// Expected compile error; the error's message must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// If set, the compile error must be reported on this 1-based source line.
    #[serde(default)]
    pub expect_error_line: Option<usize>,
}

/// Parse a `.test.pmd` file into its TOML frontmatter and PMDX source.
/// The frontmatter sits between `---` lines at the top of the file; the
/// runner strips it before the source ever reaches the compiler.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM

    if !content.starts_with("---") {
        return Err("missing opening --- frontmatter delimiter".into());
    }

    let after_open = &content[3..];
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest_start = close_pos + 4; // skip \n---
    let source = after_open[rest_start..]
        .strip_prefix("\r\n")
        .or_else(|| after_open[rest_start..].strip_prefix('\n'))
        .unwrap_or(&after_open[rest_start..]);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn compile_source(source: &str, config: &TestConfig) -> Result<RenderTree, CompileError> {
    let themes = ThemeRegistry::builtin();
    match &config.theme {
        Some(name) => {
            let theme = themes
                .get(name)
                .ok_or_else(|| CompileError::new(format!("unknown theme '{}'", name)))?;
            renderer::compile_with_theme(source, theme, 0)
        }
        None => renderer::compile(source, &themes),
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("frontmatter error: {}", e)),
    };

    let description = config.description.clone();
    let result = compile_source(source, &config);

    let outcome = match (&config.expect_error, result) {
        (Some(expected_err), Err(error)) => {
            if !error.message.contains(expected_err.as_str()) {
                Some(format!(
                    "expected error containing \"{}\", got: {}",
                    expected_err, error
                ))
            } else if let Some(expected_line) = config.expect_error_line {
                match error.line {
                    Some(actual) if actual == expected_line => None,
                    Some(actual) => Some(format!(
                        "expected error on line {}, but it is on line {}",
                        expected_line, actual
                    )),
                    None => Some(format!(
                        "expected error on line {}, but the error has no line",
                        expected_line
                    )),
                }
            } else {
                None
            }
        }
        (Some(expected_err), Ok(_)) => Some(format!(
            "expected error containing \"{}\", but compilation succeeded",
            expected_err
        )),
        (None, Err(error)) => Some(format!("unexpected compile error: {}", error)),
        (None, Ok(tree)) => match &config.expect_output {
            Some(expected_output) => {
                let actual = renderer::to_text(&tree);
                let actual_trimmed = actual.trim();
                let expected_trimmed = expected_output.trim();
                if actual_trimmed == expected_trimmed {
                    None
                } else {
                    Some(format!(
                        "output mismatch\n  expected: {}\n  actual:   {}",
                        expected_trimmed, actual_trimmed
                    ))
                }
            }
            None => None,
        },
    };

    match outcome {
        Some(reason) => fail(description, reason),
        None => TestResult {
            path: path.to_path_buf(),
            description,
            outcome: TestOutcome::Pass,
        },
    }
}

/// Discover `.test.pmd` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
/// Returns a BTreeMap so categories are sorted alphabetically.
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(".test.pmd") {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                out.entry(category).or_default().push(path);
            }
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.pmd files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn pass_label(no_color: bool) -> &'static str {
    if no_color { "PASS" } else { "\x1b[32mPASS\x1b[0m" }
}

fn fail_label(no_color: bool) -> &'static str {
    if no_color { "FAIL" } else { "\x1b[31mFAIL\x1b[0m" }
}

fn bold(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", s)
    }
}

fn result_label<'a>(result: &'a TestResult, path: &'a Path) -> &'a str {
    result.description.as_deref().unwrap_or_else(|| {
        path.file_stem().and_then(|s| s.to_str()).unwrap_or("?")
    })
}

/// Run all `.test.pmd` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    // Single file mode ignores categories
    if path.is_file() {
        let result = run_single_test(path);
        let label = result_label(&result, path);
        return match &result.outcome {
            TestOutcome::Pass => {
                eprintln!("  {}  {}", pass_label(no_color), label);
                eprintln!();
                eprintln!(
                    "test result: {}. 1 passed, 0 failed",
                    if no_color { "ok" } else { "\x1b[32mok\x1b[0m" }
                );
                0
            }
            TestOutcome::Fail(reason) => {
                eprintln!("  {}  {}", fail_label(no_color), label);
                eprintln!();
                eprintln!("failures:");
                eprintln!();
                eprintln!("  --- {} ---", path.display());
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
                eprintln!();
                eprintln!(
                    "test result: {}. 0 passed, 1 failed (of 1)",
                    if no_color { "FAILED" } else { "\x1b[31mFAILED\x1b[0m" }
                );
                1
            }
        };
    }

    let all_categories = discover_categorized(path);

    if all_categories.is_empty() {
        eprintln!("no .test.pmd files found in {}", path.display());
        return 1;
    }

    // Filter categories if specified
    let run_categories: BTreeMap<&str, &Vec<PathBuf>> = if categories.is_empty() {
        all_categories.iter().map(|(k, v)| (k.as_str(), v)).collect()
    } else {
        let mut filtered = BTreeMap::new();
        for requested in categories {
            let req = requested.trim_matches('/');
            let mut found = false;
            for (cat, files) in &all_categories {
                if cat == req || cat.starts_with(&format!("{}/", req)) {
                    filtered.insert(cat.as_str(), files);
                    found = true;
                }
            }
            if !found {
                eprintln!(
                    "warning: category '{}' not found (available: {})",
                    req,
                    all_categories
                        .keys()
                        .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
        filtered
    };

    if run_categories.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &run_categories {
        let header = if cat.is_empty() {
            "(root)".to_string()
        } else {
            cat.to_string()
        };
        eprintln!();
        eprintln!("{}", bold(&header, no_color));

        for file in *files {
            let result = run_single_test(file);
            let label = result_label(&result, file).to_string();

            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", pass_label(no_color), label);
                }
                TestOutcome::Fail(_) => {
                    failed += 1;
                    eprintln!("  {}  {}", fail_label(no_color), label);
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failed == 0 {
        if no_color {
            eprintln!("test result: ok. {} passed, 0 failed", passed);
        } else {
            eprintln!("test result: \x1b[32mok\x1b[0m. {} passed, 0 failed", passed);
        }
        0
    } else {
        let total = passed + failed;
        if no_color {
            eprintln!(
                "test result: FAILED. {} passed, {} failed (of {})",
                passed, failed, total
            );
        } else {
            eprintln!(
                "test result: \x1b[31mFAILED\x1b[0m. {} passed, {} failed (of {})",
                passed, failed, total
            );
        }
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn frontmatter_splits_config_from_source() {
        let content = "---\ndescription = \"demo\"\n---\n# Heading\n\nbody\n";
        let (config, source) = parse_test_file(content).unwrap();
        assert_eq!(config.description.as_deref(), Some("demo"));
        assert_eq!(source, "# Heading\n\nbody\n");
    }

    #[test]
    fn missing_frontmatter_is_rejected() {
        let err = parse_test_file("# Heading\n").unwrap_err();
        assert!(err.contains("missing opening"));
    }

    #[test]
    fn passing_output_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_file(
            dir.path(),
            "tags.test.pmd",
            "---\nexpect_output = \"[Rust] [SQL]\"\n---\n~ Rust SQL\n",
        );
        let result = run_single_test(&path);
        assert!(matches!(result.outcome, TestOutcome::Pass));
    }

    #[test]
    fn output_mismatch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_file(
            dir.path(),
            "tags.test.pmd",
            "---\nexpect_output = \"[Go]\"\n---\n~ Rust\n",
        );
        let result = run_single_test(&path);
        let TestOutcome::Fail(reason) = result.outcome else {
            panic!("expected failure");
        };
        assert!(reason.contains("output mismatch"));
    }

    #[test]
    fn expected_error_with_line_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_file(
            dir.path(),
            "mismatch.test.pmd",
            concat!(
                "---\n",
                "expect_error = \"mismatched closing tag\"\n",
                "expect_error_line = 2\n",
                "---\n",
                "Entry: company=A role=B dates=C\n",
                "/Section\n",
            ),
        );
        let result = run_single_test(&path);
        assert!(matches!(result.outcome, TestOutcome::Pass));
    }

    #[test]
    fn theme_override_applies() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_file(
            dir.path(),
            "mono.test.pmd",
            "---\ntheme = \"mono\"\nexpect_output = \"#Rust\"\n---\n~ Rust\n",
        );
        let result = run_single_test(&path);
        assert!(matches!(result.outcome, TestOutcome::Pass));
    }

    #[test]
    fn discovery_groups_by_subfolder() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("errors")).unwrap();
        write_test_file(dir.path(), "a.test.pmd", "---\n---\nhello\n");
        write_test_file(
            &dir.path().join("errors"),
            "b.test.pmd",
            "---\nexpect_error = \"unexpected\"\n---\n/Entry\n",
        );
        write_test_file(dir.path(), "ignored.pmd", "hello\n");

        let categories = discover_categorized(dir.path());
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[""].len(), 1);
        assert_eq!(categories["errors"].len(), 1);
    }
}
