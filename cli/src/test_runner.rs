use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use blockdoc::BlockId;
use compiler::{AttachmentPolicy, Compiled, Compiler};

use crate::manifest::Manifest;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// The report to compile.
    pub report: Manifest,

    /// Attachment policy; the default policy when absent.
    #[serde(default)]
    pub policy: Option<AttachmentPolicy>,

    #[serde(default)]
    pub expect: Expectations,
}

/// Checks applied to the compile result. Absent keys are not checked.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Expectations {
    /// The compile must fail with an error whose Display contains this substring.
    pub error: Option<String>,

    /// Exact number of attachments.
    pub attachments: Option<usize>,

    /// Every identifier in the compiled tree, in pre-order.
    pub ids: Option<Vec<String>>,

    /// Number of children of the root group.
    pub root_children: Option<usize>,

    /// Substrings the document must contain.
    pub contains: Vec<String>,

    /// Substrings the document must not contain.
    pub absent: Vec<String>,
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

fn run_single_test(path: &Path) -> TestResult {
    // 1. Read file
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("cannot read file: {}", e)),
            };
        }
    };

    // 2. Parse fixture
    let config: TestConfig = match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("fixture error: {}", e)),
            };
        }
    };

    let description = config.description.clone();
    let base_dir = path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    // 3. Load blocks and compile; manifest errors count as compile errors
    let meta = config.report.meta();
    let compiler = Compiler::with_policy(config.policy.unwrap_or_default());
    let result = config
        .report
        .into_blocks(&base_dir)
        .map_err(|e| e.to_string())
        .and_then(|blocks| compiler.compile(blocks, &meta).map_err(|e| e.to_string()));

    // 4. Check expectations
    let outcome = match (&config.expect.error, result) {
        (Some(expected), Err(actual)) if actual.contains(expected.as_str()) => TestOutcome::Pass,
        (Some(expected), Err(actual)) => TestOutcome::Fail(format!(
            "expected error containing \"{}\", got: {}",
            expected, actual
        )),
        (Some(expected), Ok(_)) => TestOutcome::Fail(format!(
            "expected error containing \"{}\", but compile succeeded",
            expected
        )),
        (None, Err(actual)) => TestOutcome::Fail(format!("unexpected compile error: {}", actual)),
        (None, Ok(compiled)) => match check_compiled(&compiled, &config.expect) {
            Some(reason) => TestOutcome::Fail(reason),
            None => TestOutcome::Pass,
        },
    };

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome,
    }
}

/// Check a successful compile against expectations. Returns `Some(reason)` on mismatch.
fn check_compiled(compiled: &Compiled, expect: &Expectations) -> Option<String> {
    if let Some(expected) = expect.attachments {
        let actual = compiled.attachments.len();
        if actual != expected {
            return Some(format!("expected {} attachment(s), got {}", expected, actual));
        }
    }

    if let Some(expected) = &expect.ids {
        let actual: Vec<&str> = compiled.tree.ids().into_iter().map(BlockId::as_str).collect();
        if actual != *expected {
            return Some(format!(
                "identifier mismatch\n  expected: {}\n  actual:   {}",
                expected.join(", "),
                actual.join(", ")
            ));
        }
    }

    if let Some(expected) = expect.root_children {
        let actual = compiled.tree.children().len();
        if actual != expected {
            return Some(format!("expected {} root child(ren), got {}", expected, actual));
        }
    }

    let document = compiled.document.as_str();
    for needle in &expect.contains {
        if !document.contains(needle.as_str()) {
            return Some(format!("document does not contain \"{}\"", needle));
        }
    }
    for needle in &expect.absent {
        if document.contains(needle.as_str()) {
            return Some(format!("document unexpectedly contains \"{}\"", needle));
        }
    }

    None
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

const FIXTURE_SUFFIX: &str = ".test.toml";

/// Fixtures grouped by category (sub-folder relative to `root`, "" for
/// files directly in it). Categories and files are sorted.
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
    for path in entries.flatten().map(|entry| entry.path()) {
        if path.is_dir() {
            collect_tests(&path, root, out);
            continue;
        }
        let is_fixture = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(FIXTURE_SUFFIX));
        if is_fixture {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// Keep the requested categories (and their sub-categories). Unknown names are
/// reported and skipped.
fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a [PathBuf]> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
    }

    let mut selected = BTreeMap::new();
    for request in requested {
        let request = request.trim_matches('/');
        let prefix = format!("{}/", request);
        let before = selected.len();
        for (category, files) in all {
            if category == request || category.starts_with(&prefix) {
                selected.insert(category.as_str(), files.as_slice());
            }
        }
        if selected.len() == before {
            let available: Vec<&str> = all.keys().map(|k| category_label(k)).collect();
            eprintln!(
                "warning: category '{}' not found (available: {})",
                request,
                available.join(", ")
            );
        }
    }
    selected
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (category, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(category), files.len());
    }
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

struct Palette {
    no_color: bool,
}

impl Palette {
    fn paint(&self, text: &str, code: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        }
    }

    fn pass(&self) -> String {
        self.paint("PASS", "32")
    }

    fn fail(&self) -> String {
        self.paint("FAIL", "31")
    }

    fn bold(&self, text: &str) -> String {
        self.paint(text, "1")
    }
}

fn test_label(result: &TestResult) -> &str {
    result.description.as_deref().unwrap_or_else(|| {
        result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_suffix(FIXTURE_SUFFIX))
            .unwrap_or("?")
    })
}

#[derive(Default)]
struct Tally {
    passed: usize,
    failures: Vec<TestResult>,
}

impl Tally {
    fn record(&mut self, result: TestResult, palette: &Palette) {
        match result.outcome {
            TestOutcome::Pass => {
                self.passed += 1;
                eprintln!("  {}  {}", palette.pass(), test_label(&result));
            }
            TestOutcome::Fail(_) => {
                eprintln!("  {}  {}", palette.fail(), test_label(&result));
                self.failures.push(result);
            }
        }
    }

    /// Print failure details and the summary line. Returns the exit code.
    fn finish(self, palette: &Palette) -> i32 {
        if !self.failures.is_empty() {
            eprintln!();
            eprintln!("failures:");
            for failure in &self.failures {
                eprintln!();
                eprintln!("  --- {} ---", failure.path.display());
                if let TestOutcome::Fail(reason) = &failure.outcome {
                    for line in reason.lines() {
                        eprintln!("  {}", line);
                    }
                }
            }
        }

        eprintln!();
        let failed = self.failures.len();
        if failed == 0 {
            eprintln!(
                "test result: {}. {} passed, 0 failed",
                palette.paint("ok", "32"),
                self.passed
            );
            0
        } else {
            eprintln!(
                "test result: {}. {} passed, {} failed (of {})",
                palette.paint("FAILED", "31"),
                self.passed,
                failed,
                self.passed + failed
            );
            1
        }
    }
}

/// Run all fixtures under `path` (or a single fixture file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let palette = Palette { no_color };
    let mut tally = Tally::default();

    if path.is_file() {
        tally.record(run_single_test(path), &palette);
        return tally.finish(&palette);
    }

    let all_categories = discover_categorized(path);
    if all_categories.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return 1;
    }

    let selected = select_categories(&all_categories, categories);
    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    for (category, files) in selected {
        eprintln!();
        eprintln!("{}", palette.bold(category_label(category)));
        for file in files {
            tally.record(run_single_test(file), &palette);
        }
    }

    tally.finish(&palette)
}
