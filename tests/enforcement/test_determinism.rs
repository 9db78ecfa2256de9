// Tests that rule evaluation order and results are reproducible

use warden_core::config::WardenConfig;
use warden_core::policy::PolicyDocument;
use warden_enforce::validator::PathValidator;

use super::common::{create_repo, dispatcher, generators::generate_paths};

const POLICY: &str = r#"{
  "id": "layout",
  "rules": [
    { "id": "z-no-docs-py", "pattern": "docs/**", "action": "deny" },
    { "id": "a-tests-warn", "pattern": "tests/*.py", "action": "warn", "severity": "warning" },
    { "id": "m-no-eval", "pattern": "src/**/*.py", "engine": "content",
      "params": { "check_type": "forbidden_content", "patterns": ["eval\\("] } },
    { "id": "b-api-deny", "pattern": "src/api/**", "action": "deny",
      "description": "API modules are generated" }
  ]
}"#;

#[test]
fn test_repeated_runs_are_identical() {
    let paths = generate_paths(40);
    let files: Vec<(String, String)> = paths
        .iter()
        .filter(|p| !p.starts_with(".intent"))
        .map(|p| (p.clone(), "x = eval('1')\n".to_string()))
        .collect();
    let borrowed: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
    let (_dir, root) = create_repo(&borrowed);

    let doc = PolicyDocument::from_json("layout.json", POLICY).unwrap();
    let v = PathValidator::for_config(&root, &WardenConfig::default(), doc.rules.clone(), dispatcher());
    let first = v.check_paths(&paths);
    assert!(!first.is_valid);

    for _ in 0..5 {
        let again = PathValidator::for_config(&root, &WardenConfig::default(), doc.rules.clone(), dispatcher())
            .check_paths(&paths);
        assert_eq!(
            serde_json::to_string(&again).unwrap(),
            serde_json::to_string(&first).unwrap()
        );
    }
}

#[test]
fn test_rules_apply_in_id_order_regardless_of_document_order() {
    let (_dir, root) = create_repo(&[("src/api/h.py", "y = eval('2')\n")]);
    let doc = PolicyDocument::from_json("layout.json", POLICY).unwrap();
    let mut reversed = doc.rules.clone();
    reversed.reverse();

    let v = PathValidator::for_config(&root, &WardenConfig::default(), reversed, dispatcher());
    let result = v.check_paths(&["src/api/h.py".into()]);
    let ids: Vec<_> = result.violations.iter().map(|v| v.rule.as_str()).collect();
    assert_eq!(ids, vec!["b-api-deny", "m-no-eval"]);
    assert_eq!(result.violations[0].message, "API modules are generated");
    assert_eq!(result.violations[1].line, Some(1));
}
