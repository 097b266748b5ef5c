//! Builtin scenarios: the phase walkthrough and the runnable code examples,
//! each pairing a NovaScript snippet with the catalog its run progresses
//! through. Payloads are display data only; nothing here is executed.

use crate::catalog::{Phase, StageCatalog};
use serde_json::json;
use std::sync::Arc;

/// One runnable scenario: a code sample plus the catalog to animate.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Doubles as the run id.
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub code: &'static str,
    pub output: &'static str,
    pub catalog: Arc<StageCatalog>,
}

/// All builtin scenarios, walkthrough first.
pub fn builtin() -> Vec<Scenario> {
    let example_catalog = Arc::new(example_catalog());
    let mut scenarios = vec![Scenario {
        id: "walkthrough",
        title: "Phase Walkthrough",
        description: "Watch a countdown loop move through each compilation phase",
        code: "let a be 10\nrepeat while a>0\n  say a\n  set a to a-1\nend",
        output: "10\n9\n8\n7\n6\n5\n4\n3\n2\n1",
        catalog: Arc::new(walkthrough_catalog()),
    }];
    scenarios.extend([
        Scenario {
            id: "hello-world",
            title: "Hello World",
            description: "A simple greeting program",
            code: "let a be \"Hello World\"\nsay a",
            output: "Hello World",
            catalog: Arc::clone(&example_catalog),
        },
        Scenario {
            id: "while-loop",
            title: "While Loop Counter",
            description: "Counting from 10 to 20",
            code: "let a be 10\nrepeat while a<=20\n    say \"count: \",a\n    set a to a + 1\nend",
            output: "Count: 10\nCount: 11\nCount: 12\nCount: 13\nCount: 14\nCount: 15\nCount: 16\nCount: 17\nCount: 18\nCount: 19\nCount: 20",
            catalog: Arc::clone(&example_catalog),
        },
        Scenario {
            id: "factorial",
            title: "Factorial Function",
            description: "Calculate factorial",
            code: "define function factorial(n)\n  let result be 1\n  let i be 1\n\n  repeat while i<=n\n    set result to result*i\n    set i to i+1\n  end\n\n  return result\nend\n\nlet answer be call factorial(5)\nsay \"5! = \",answer",
            output: "5! = 120",
            catalog: Arc::clone(&example_catalog),
        },
        Scenario {
            id: "conditional",
            title: "Conditional Logic",
            description: "Conditions applied to a variable value check",
            code: "let age be 11\nwhen age>=18 then\n    say \"u can vote\"\notherwise\n    say \"u cant vote\"\nend",
            output: "u cant vote",
            catalog: example_catalog,
        },
    ]);
    scenarios
}

pub fn find(id: &str) -> Option<Scenario> {
    builtin().into_iter().find(|s| s.id == id)
}

/// The four-phase walkthrough catalog with its per-phase display payloads.
fn walkthrough_catalog() -> StageCatalog {
    let phases = vec![
        Phase::with_payload(
            "Lexical Analysis",
            json!({
                "description": "Breaking code into tokens (keywords, identifiers, operators, literals)",
                "tokens": [
                    "let", "a", "be", "10",
                    "repeat", "while", "a", ">", "0",
                    "say", "a",
                    "set", "a", "to", "a", "-", "1",
                    "end"
                ],
            }),
        ),
        Phase::with_payload(
            "Syntax Analysis",
            json!({
                "description": "Building an Abstract Syntax Tree (AST) from tokens",
                "tree": {
                    "name": "RepeatWhile",
                    "children": [
                        { "name": "Condition: a > 0" },
                        {
                            "name": "Body",
                            "children": [
                                { "name": "say a" },
                                { "name": "set a to a - 1" }
                            ]
                        }
                    ]
                },
            }),
        ),
        Phase::with_payload(
            "Semantic Analysis",
            json!({
                "description": "Type checking and scope validation",
                "checks": [
                    { "check": "Variable 'a' declared", "status": "✓" },
                    { "check": "Type of 'a' is integer", "status": "✓" },
                    { "check": "'a > 0' is valid boolean condition", "status": "✓" },
                    { "check": "'say' can output integer", "status": "✓" }
                ],
            }),
        ),
        Phase::with_payload(
            "Code Execution",
            json!({
                "description": "Running the interpreted code",
                "output": ["10", "9", "8", "7", "6", "5", "4", "3", "2", "1"],
            }),
        ),
    ];
    StageCatalog::new(phases).expect("builtin walkthrough catalog is valid")
}

/// The five-phase catalog shared by the runnable code examples.
fn example_catalog() -> StageCatalog {
    let phases = ["Lexical", "Syntax", "Semantic", "Target Code", "Output"]
        .into_iter()
        .map(Phase::named)
        .collect();
    StageCatalog::new(phases).expect("builtin example catalog is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ids_are_unique() {
        let scenarios = builtin();
        let mut ids: Vec<_> = scenarios.iter().map(|s| s.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), scenarios.len());
    }

    #[test]
    fn walkthrough_has_four_payloaded_phases() {
        let s = find("walkthrough").unwrap();
        assert_eq!(s.catalog.len(), 4);
        assert!(s.catalog.phases().iter().all(|p| p.payload.is_some()));
        assert_eq!(s.catalog.phase(0).unwrap().name, "Lexical Analysis");
    }

    #[test]
    fn examples_share_the_five_phase_catalog() {
        let s = find("factorial").unwrap();
        let names: Vec<_> = s.catalog.phases().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Lexical", "Syntax", "Semantic", "Target Code", "Output"]);
    }

    #[test]
    fn find_unknown_id_is_none() {
        assert!(find("missing").is_none());
    }
}
