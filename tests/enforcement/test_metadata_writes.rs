// Tests for judging pending writes with the metadata-only rule

use warden_core::config::WardenConfig;
use warden_core::policy::PolicyDocument;
use warden_enforce::validator::{PathValidator, ProposedWrite};

use super::common::{create_repo, dispatcher};

const ORIGINAL: &str = "def area(r):\n    return 3.14 * r * r\n";

fn validator(root: &std::path::Path) -> PathValidator {
    let doc = PolicyDocument::from_json(
        "autonomy.json",
        r#"{"id": "autonomy", "rules": [{
            "id": "metadata-only", "pattern": "src/**/*.py", "engine": "structural",
            "description": "Autonomous edits must be metadata-only",
            "params": { "check_type": "metadata_only", "max_comment_length": 40,
                        "allowed_edits": ["comment_insert", "doc_insert", "doc_replace"] }
        }]}"#,
    )
    .unwrap();
    PathValidator::for_config(root, &WardenConfig::default(), doc.rules, dispatcher())
}

fn write(content: &str) -> Vec<ProposedWrite> {
    vec![ProposedWrite {
        path: "src/geometry.py".into(),
        content: content.into(),
    }]
}

#[test]
fn test_docstring_and_comment_additions_pass() {
    let (_dir, root) = create_repo(&[("src/geometry.py", ORIGINAL)]);
    let edited = "def area(r):\n    \"\"\"Area of a circle.\"\"\"\n    # pi approximated\n    return 3.14 * r * r\n";
    let result = validator(&root).check_writes(&write(edited));
    assert!(result.is_valid, "{:?}", result.violations);
}

#[test]
fn test_logic_change_is_blocked() {
    let (_dir, root) = create_repo(&[("src/geometry.py", ORIGINAL)]);
    let edited = "def area(r):\n    return 3.14159 * r * r\n";
    let result = validator(&root).check_writes(&write(edited));
    assert!(!result.is_valid);
    assert!(result.violations[0].message.contains("edit changes executable semantics"));
}

#[test]
fn test_secondary_constraints_apply_after_semantics_hold() {
    let (_dir, root) = create_repo(&[("src/geometry.py", "# old note\n")]);
    let long_comment = "# this comment is definitely far longer than forty characters\n# old note\n";
    let result = validator(&root).check_writes(&write(long_comment));
    assert!(!result.is_valid);

    let deleted = "";
    let result = validator(&root).check_writes(&write(deleted));
    assert!(!result.is_valid, "comment deletion is not an allowed category");
}

#[test]
fn test_new_file_has_no_baseline() {
    let (_dir, root) = create_repo(&[]);
    let result = validator(&root).check_writes(&write("x = 1\n"));
    assert!(!result.is_valid);
}
