//! Hygiene: source-level rules for the annotation engine.
//!
//! The engine runs inside an interactive canvas; a panic there loses the
//! user's unsaved drawing. Each rule below scans `src/` (excluding `*_test.rs`)
//! for a pattern and fails if the count exceeds its budget. Budgets only ever
//! go down.

use std::fs;
use std::path::Path;

struct Rule {
    pattern: &'static str,
    budget: usize,
    hint: &'static str,
}

const RULES: &[Rule] = &[
    Rule { pattern: ".unwrap()", budget: 0, hint: "propagate with ? or fall back explicitly" },
    Rule { pattern: ".expect(", budget: 0, hint: "propagate with ? or fall back explicitly" },
    Rule { pattern: "panic!(", budget: 0, hint: "return a no-op or an AnnotationError" },
    Rule { pattern: "unreachable!(", budget: 0, hint: "make the state impossible in the type instead" },
    Rule { pattern: "todo!(", budget: 0, hint: "finish the stub" },
    Rule { pattern: "unimplemented!(", budget: 0, hint: "finish the stub" },
    Rule { pattern: "let _ =", budget: 0, hint: "inspect the value or log why it is dropped" },
    Rule { pattern: ".ok()", budget: 0, hint: "don't discard errors silently" },
    Rule { pattern: "#[allow(dead_code)]", budget: 0, hint: "delete unused code" },
    Rule { pattern: "println!(", budget: 0, hint: "log through tracing" },
    Rule { pattern: "eprintln!(", budget: 0, hint: "log through tracing" },
    Rule { pattern: "dbg!(", budget: 0, hint: "remove debugging output" },
];

fn source_files(dir: &Path, out: &mut Vec<(String, String)>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            source_files(&path, out);
            continue;
        }
        let name = path.to_string_lossy().to_string();
        if !name.ends_with(".rs") || name.ends_with("_test.rs") {
            continue;
        }
        if let Ok(content) = fs::read_to_string(&path) {
            out.push((name, content));
        }
    }
}

fn hits(files: &[(String, String)], pattern: &str) -> Vec<(String, usize)> {
    files
        .iter()
        .filter_map(|(path, content)| {
            let n = content.lines().filter(|line| line.contains(pattern)).count();
            (n > 0).then(|| (path.clone(), n))
        })
        .collect()
}

#[test]
fn sources_are_found() {
    let mut files = Vec::new();
    source_files(Path::new("src"), &mut files);
    assert!(files.iter().any(|(p, _)| p.ends_with("engine.rs")), "run from the crate root");
}

#[test]
fn rule_budgets_hold() {
    let mut files = Vec::new();
    source_files(Path::new("src"), &mut files);

    let mut failures = Vec::new();
    for rule in RULES {
        let found = hits(&files, rule.pattern);
        let count: usize = found.iter().map(|(_, n)| n).sum();
        if count > rule.budget {
            let detail: Vec<String> = found.iter().map(|(p, n)| format!("    {p}: {n}")).collect();
            failures.push(format!(
                "`{}` found {count}, budget {} ({})\n{}",
                rule.pattern,
                rule.budget,
                rule.hint,
                detail.join("\n")
            ));
        }
    }
    assert!(failures.is_empty(), "hygiene budgets exceeded:\n{}", failures.join("\n"));
}
