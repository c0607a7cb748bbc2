//! Built-in challenge bank so the skill tree has content without a model.

use crate::domain::{ChallengeQuestion, Check, TestCase};

fn case(description: &str, check: Check) -> TestCase {
  TestCase { description: description.into(), check }
}

fn names(items: &[&str]) -> Vec<String> {
  items.iter().map(|s| s.to_string()).collect()
}

/// `(node_id, question)` pairs shipped with the server.
pub fn seed_challenges() -> Vec<(String, ChallengeQuestion)> {
  vec![
    (
      "js-variables".into(),
      ChallengeQuestion {
        id: "js-variables-1".into(),
        title: "Circle Constants".into(),
        difficulty: 1,
        description: "Store values in variables before using them.".into(),
        prompt: "Declare a constant PI set to 3.14159 and a variable radius set to 5.".into(),
        starter_code: "// Declare PI and radius below\n".into(),
        test_cases: vec![
          case("Declares PI", Check::VariableDeclaration { variables: names(&["PI"]) }),
          case("Declares radius", Check::VariableDeclaration { variables: names(&["radius"]) }),
          case("Uses the value 3.14159", Check::Contains { values: names(&["3.14159"]) }),
        ],
        hints: names(&["Use const for values that never change.", "let works for values that might."]),
      },
    ),
    (
      "js-functions".into(),
      ChallengeQuestion {
        id: "js-functions-1".into(),
        title: "Say Hello".into(),
        difficulty: 2,
        description: "Functions package up reusable logic.".into(),
        prompt: "Write a function greet(name) that returns 'Hello, ' followed by the name.".into(),
        starter_code: "function greet(name) {\n  // your code\n}\n".into(),
        test_cases: vec![
          case("Declares greet", Check::FunctionDeclaration { functions: names(&["greet"]) }),
          case("Returns a value", Check::HasReturn),
          case("Builds a greeting", Check::Contains { values: names(&["hello"]) }),
        ],
        hints: names(&["Use the return keyword.", "Join strings with + or a template literal."]),
      },
    ),
    (
      "js-conditionals".into(),
      ChallengeQuestion {
        id: "js-conditionals-1".into(),
        title: "Even or Odd".into(),
        difficulty: 2,
        description: "Branch on a condition.".into(),
        prompt: "Write a function parity(n) that returns 'even' or 'odd' using if/else.".into(),
        starter_code: "function parity(n) {\n}\n".into(),
        test_cases: vec![
          case("Declares parity", Check::FunctionDeclaration { functions: names(&["parity"]) }),
          case("Uses if/else", Check::HasIfElse),
          case("Uses the remainder operator", Check::Contains { values: names(&["%"]) }),
        ],
        hints: names(&["n % 2 is 0 for even numbers."]),
      },
    ),
    (
      "js-conditionals".into(),
      ChallengeQuestion {
        id: "js-conditionals-2".into(),
        title: "Day Names".into(),
        difficulty: 3,
        description: "Pick between many cases.".into(),
        prompt: "Write a function dayName(d) that maps 0 to 'Sunday' and 1 to 'Monday' using a switch statement.".into(),
        starter_code: "function dayName(d) {\n}\n".into(),
        test_cases: vec![
          case("Declares dayName", Check::FunctionDeclaration { functions: names(&["dayName"]) }),
          case("Uses switch/case", Check::HasSwitch),
          case("Returns a value", Check::HasReturn),
        ],
        hints: names(&["Each case should return a string.", "Add a default case for other numbers."]),
      },
    ),
  ]
}
