// Property tests: metadata edits preserve semantics, logic edits never do

use std::collections::BTreeMap;

use proptest::prelude::*;
use warden_parsers::canonical::compare;
use warden_parsers::metadata::{diff_metadata, EditCategory, SourceMetadata};
use warden_parsers::python::PythonGrammar;

/// Render `v<name> = <value>` statements. `slots[i]` holds the comments
/// placed above the i-th statement; extra slots trail the module.
fn program(stmts: &[(usize, i64)], slots: &[Vec<String>], docstring: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(doc) = docstring {
        out.push_str(&format!("\"\"\"{doc}\"\"\"\n"));
    }
    for (pos, (name, value)) in stmts.iter().enumerate() {
        for c in slots.get(pos).into_iter().flatten() {
            out.push_str(&format!("# {c}\n"));
        }
        out.push_str(&format!("v{name} = {value}\n"));
    }
    for c in slots.iter().skip(stmts.len()).flatten() {
        out.push_str(&format!("# {c}\n"));
    }
    out
}

fn numbered(values: &[i64]) -> Vec<(usize, i64)> {
    values.iter().copied().enumerate().collect()
}

fn render(values: &[i64], comments: &[Option<String>], docstring: Option<&str>) -> String {
    let slots: Vec<Vec<String>> = comments.iter().map(|c| c.iter().cloned().collect()).collect();
    program(&numbered(values), &slots, docstring)
}

fn statements() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..10_000, 2..12)
}

fn comment_slots() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec("[a-z][a-z ]{0,20}", 0..3), 0..12)
}

fn docs() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z ]{0,30}"
}

fn preserved(a: &str, b: &str) -> bool {
    compare(&PythonGrammar, a, b).unwrap().semantics_preserved()
}

fn edit_counts(a: &str, b: &str) -> BTreeMap<EditCategory, usize> {
    let before = SourceMetadata::extract(&PythonGrammar, a).unwrap();
    let after = SourceMetadata::extract(&PythonGrammar, b).unwrap();
    diff_metadata(&before, &after).categories()
}

fn count(counts: &BTreeMap<EditCategory, usize>, category: EditCategory) -> usize {
    counts.get(&category).copied().unwrap_or(0)
}

proptest! {
    #[test]
    fn comment_and_docstring_edits_preserve_semantics(
        values in statements(),
        comments in prop::collection::vec(prop::option::of("[a-z][a-z ]{0,20}"), 0..12),
        doc in prop::option::of(docs()),
    ) {
        let original = render(&values, &[], None);
        let edited = render(&values, &comments, doc.as_deref());
        prop_assert!(preserved(&original, &edited));

        let categories = edit_counts(&original, &edited);
        let inserted = comments.iter().filter(|c| c.is_some()).count();
        prop_assert_eq!(count(&categories, EditCategory::CommentInsert), inserted);
        prop_assert_eq!(categories.contains_key(&EditCategory::DocInsert), doc.is_some());
        prop_assert!(!categories.contains_key(&EditCategory::CommentDelete));
    }

    #[test]
    fn deleting_and_moving_comments_preserves_semantics(
        values in statements(),
        slots in comment_slots(),
        keep in prop::collection::vec(any::<bool>(), 36),
        target in any::<prop::sample::Index>(),
        doc in prop::option::of(docs()),
        drop_doc in any::<bool>(),
    ) {
        let stmts = numbered(&values);
        let original = program(&stmts, &slots, doc.as_deref());

        let all: Vec<String> = slots.iter().flatten().cloned().collect();
        let kept: Vec<String> = all
            .iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(c, _)| c.clone())
            .collect();
        let mut moved: Vec<Vec<String>> = vec![Vec::new(); stmts.len()];
        moved[target.index(stmts.len())] = kept.iter().rev().cloned().collect();
        let edited_doc = if drop_doc { None } else { doc.as_deref() };
        let edited = program(&stmts, &moved, edited_doc);
        prop_assert!(preserved(&original, &edited));

        let categories = edit_counts(&original, &edited);
        prop_assert_eq!(count(&categories, EditCategory::CommentDelete), all.len() - kept.len());
        prop_assert_eq!(count(&categories, EditCategory::CommentInsert), 0);
        prop_assert_eq!(count(&categories, EditCategory::CommentReplace), 0);
        prop_assert_eq!(categories.contains_key(&EditCategory::DocDelete), doc.is_some() && drop_doc);
    }

    #[test]
    fn removing_a_statement_under_comment_noise_is_detected(
        values in statements(),
        slots in comment_slots(),
        noise in comment_slots(),
        doc in prop::option::of(docs()),
        pick in any::<prop::sample::Index>(),
    ) {
        let stmts = numbered(&values);
        let original = program(&stmts, &slots, doc.as_deref());
        let mut fewer = stmts.clone();
        fewer.remove(pick.index(stmts.len()));
        let edited = program(&fewer, &noise, doc.as_deref());
        prop_assert!(!preserved(&original, &edited));
    }

    #[test]
    fn swapping_statements_under_comment_noise_is_detected(
        values in statements(),
        slots in comment_slots(),
        noise in comment_slots(),
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
    ) {
        let (i, j) = (a.index(values.len()), b.index(values.len()));
        prop_assume!(i != j);
        let stmts = numbered(&values);
        let original = program(&stmts, &slots, None);
        let mut swapped = stmts.clone();
        swapped.swap(i, j);
        let edited = program(&swapped, &noise, None);
        prop_assert!(!preserved(&original, &edited));
    }

    #[test]
    fn removing_a_statement_is_detected(values in statements(), pick in any::<prop::sample::Index>()) {
        let original = render(&values, &[], None);
        let k = pick.index(values.len());
        let lines: Vec<&str> = original.lines().collect();
        let edited: String = lines
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != k)
            .map(|(_, l)| format!("{l}\n"))
            .collect();
        prop_assert!(!preserved(&original, &edited));
    }

    #[test]
    fn swapping_statements_is_detected(
        values in statements(),
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
    ) {
        let (i, j) = (a.index(values.len()), b.index(values.len()));
        prop_assume!(i != j);
        let original = render(&values, &[], None);
        let mut lines: Vec<&str> = original.lines().collect();
        lines.swap(i, j);
        let edited = lines.join("\n") + "\n";
        prop_assert!(!preserved(&original, &edited));
    }

    #[test]
    fn changing_a_literal_is_detected(values in statements(), pick in any::<prop::sample::Index>()) {
        let original = render(&values, &[], None);
        let mut changed = values.clone();
        let k = pick.index(values.len());
        changed[k] += 1;
        let edited = render(&changed, &[Some("tweaked".into())], None);
        prop_assert!(!preserved(&original, &edited));
    }
}

#[test]
fn blank_lines_and_trailing_comments_are_layout() {
    let original = "x = 1\ny = 2\n";
    let edited = "x = 1  # one\n\n\ny = 2\n";
    assert!(preserved(original, edited));
}

#[test]
fn docstring_turning_into_expression_is_detected() {
    let original = "def f():\n    \"\"\"Doc.\"\"\"\n    return 1\n";
    let edited = "def f():\n    return 1\n    \"\"\"Doc.\"\"\"\n";
    assert!(!preserved(original, edited));
}
