//! Local textual grading of code submissions.
//!
//! Nothing is executed or parsed: every check is a substring or regex match
//! against the submitted text. A name inside a comment or string literal still
//! satisfies a declaration check. Patterns are built from identifier names
//! supplied by question authors, which are escaped before use.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::domain::{Check, TestCase, TestResult};

static RETURN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"return\s").unwrap());
static IF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bif\s*\(").unwrap());
static ELSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\belse\b").unwrap());
static SWITCH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bswitch\s*\(").unwrap());
static CASE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bcase\b").unwrap());

/// Verdict for a whole submission.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
  pub all_passed: bool,
  pub test_results: Vec<TestResult>,
}

/// Decide whether `code` satisfies a single test case.
pub fn evaluate(code: &str, test_case: &TestCase) -> bool {
  match &test_case.check {
    Check::Contains { values } => {
      let haystack = code.trim().to_lowercase();
      values.iter().all(|v| haystack.contains(&v.to_lowercase()))
    }
    Check::VariableDeclaration { variables } => variables
      .iter()
      .all(|name| matches_any(code, &[format!(r"(?i)(let|const|var)\s+{}", regex::escape(name))])),
    Check::FunctionDeclaration { functions } => functions.iter().all(|name| {
      let n = regex::escape(name);
      matches_any(
        code,
        &[
          format!(r"(?i)function\s+{n}"),
          format!(r"(?i)const\s+{n}\s*="),
          format!(r"(?i){n}\s*=\s*function"),
          format!(r"(?i){n}\s*=>"),
        ],
      )
    }),
    Check::HasReturn => RETURN_RE.is_match(code),
    Check::HasIfElse => IF_RE.is_match(code) && ELSE_RE.is_match(code),
    Check::HasSwitch => SWITCH_RE.is_match(code) && CASE_RE.is_match(code),
    Check::Unknown => {
      debug!(target: "grading", description = %test_case.description, "Unknown check tag; failing closed");
      false
    }
  }
}

/// Evaluate every test case in order. Pure; repeated calls give identical output.
pub fn run_all(code: &str, test_cases: &[TestCase]) -> Vec<TestResult> {
  test_cases
    .iter()
    .map(|tc| TestResult {
      description: tc.description.clone(),
      passed: evaluate(code, tc),
      feedback: None,
    })
    .collect()
}

/// Logical AND over the per-test verdicts.
pub fn all_passed(results: &[TestResult]) -> bool {
  results.iter().all(|r| r.passed)
}

#[instrument(level = "debug", skip(code, test_cases), fields(code_len = code.len(), tests = test_cases.len()))]
pub fn grade(code: &str, test_cases: &[TestCase]) -> Grade {
  let test_results = run_all(code, test_cases);
  let all_passed = all_passed(&test_results);
  debug!(target: "grading", %all_passed, "Submission graded");
  Grade { all_passed, test_results }
}

fn matches_any(code: &str, patterns: &[String]) -> bool {
  patterns.iter().any(|p| match Regex::new(p) {
    Ok(re) => re.is_match(code),
    Err(e) => {
      // Escaped identifiers always compile; only absurdly long names hit the size limit.
      warn!(target: "grading", pattern_len = p.len(), error = %e, "Matcher failed to compile");
      false
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tc(check: Check) -> TestCase {
    TestCase { description: "t".into(), check }
  }

  fn vars(names: &[&str]) -> TestCase {
    tc(Check::VariableDeclaration { variables: names.iter().map(|s| s.to_string()).collect() })
  }

  fn funcs(names: &[&str]) -> TestCase {
    tc(Check::FunctionDeclaration { functions: names.iter().map(|s| s.to_string()).collect() })
  }

  #[test]
  fn declared_variables_pass() {
    assert!(evaluate("const PI = 3.14159; let radius = 5;", &vars(&["PI", "radius"])));
  }

  #[test]
  fn undeclared_variable_fails() {
    assert!(!evaluate("let area = 10;", &vars(&["PI"])));
  }

  #[test]
  fn variable_declaration_is_case_insensitive() {
    assert!(evaluate("CONST pi = 3;", &vars(&["PI"])));
    assert!(evaluate("var   count = 0", &vars(&["count"])));
  }

  #[test]
  fn declaration_inside_comment_still_counts() {
    assert!(evaluate("// let total = 0\nconsole.log(1)", &vars(&["total"])));
  }

  #[test]
  fn keyword_without_whitespace_does_not_count() {
    assert!(!evaluate("letx = 1; x = 2;", &vars(&["x"])));
  }

  #[test]
  fn regex_metacharacters_in_names_are_literal() {
    assert!(!evaluate("let ab = 1;", &vars(&["a.b"])));
    assert!(evaluate("let $el = 1;", &vars(&["$el"])));
  }

  #[test]
  fn contains_is_case_insensitive_substring() {
    let check = tc(Check::Contains { values: vec!["Console.Log".into(), "HELLO".into()] });
    assert!(evaluate("  console.log('hello')  ", &check));
    assert!(!evaluate("console.log('bye')", &check));
  }

  #[test]
  fn contains_with_no_values_passes() {
    assert!(evaluate("anything", &tc(Check::Contains { values: vec![] })));
  }

  #[test]
  fn function_declaration_forms() {
    assert!(evaluate("function greet(name) {}", &funcs(&["greet"])));
    assert!(evaluate("const greet = (n) => n;", &funcs(&["greet"])));
    assert!(evaluate("greet = function(n) { return n; }", &funcs(&["greet"])));
    assert!(evaluate("items.map(greet => greet.id)", &funcs(&["greet"])));
    assert!(evaluate("FUNCTION Greet() {}", &funcs(&["greet"])));
    assert!(!evaluate("greet('bob');", &funcs(&["greet"])));
  }

  #[test]
  fn every_function_must_be_declared() {
    let code = "function add(a, b) { return a + b; }";
    assert!(!evaluate(code, &funcs(&["add", "sub"])));
  }

  #[test]
  fn has_return_needs_trailing_whitespace() {
    assert!(evaluate("function greet(name) { return 'Hello'; }", &tc(Check::HasReturn)));
    assert!(!evaluate("function f() { return; }", &tc(Check::HasReturn)));
  }

  #[test]
  fn if_else_requires_both_tokens() {
    assert!(evaluate("if (x) { a() } else { b() }", &tc(Check::HasIfElse)));
    assert!(!evaluate("if (x) { a() }", &tc(Check::HasIfElse)));
    assert!(!evaluate("if (x) { elsewhere() }", &tc(Check::HasIfElse)));
  }

  #[test]
  fn switch_requires_switch_and_case() {
    assert!(evaluate("switch (day) { case 1: break; }", &tc(Check::HasSwitch)));
    assert!(!evaluate("switch (day) { default: break; }", &tc(Check::HasSwitch)));
  }

  #[test]
  fn unknown_check_fails_closed() {
    assert!(!evaluate("for (;;) {}", &tc(Check::Unknown)));
  }

  #[test]
  fn run_all_preserves_order_and_is_idempotent() {
    let cases = vec![
      TestCase { description: "declares PI".into(), check: Check::VariableDeclaration { variables: vec!["PI".into()] } },
      TestCase { description: "returns".into(), check: Check::HasReturn },
      TestCase { description: "mystery".into(), check: Check::Unknown },
    ];
    let code = "const PI = 3.14;";
    let first = run_all(code, &cases);
    let second = run_all(code, &cases);
    assert_eq!(first, second);
    assert_eq!(
      first.iter().map(|r| (r.description.as_str(), r.passed)).collect::<Vec<_>>(),
      vec![("declares PI", true), ("returns", false), ("mystery", false)]
    );
    assert!(!all_passed(&first));
  }

  #[test]
  fn grade_reports_overall_success() {
    let cases = vec![
      TestCase { description: "has return".into(), check: Check::HasReturn },
      TestCase { description: "greet".into(), check: Check::FunctionDeclaration { functions: vec!["greet".into()] } },
    ];
    let g = grade("function greet(n) { return n; }", &cases);
    assert!(g.all_passed);
    assert_eq!(g.test_results.len(), 2);
  }

  #[test]
  fn empty_test_list_is_vacuously_passed() {
    assert!(grade("", &[]).all_passed);
  }
}
