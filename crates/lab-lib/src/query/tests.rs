//! Matching tests over small labeled collections

use super::*;
use crate::error::{Error, MatchError};

fn cluster() -> LabeledSet<LabeledEntity> {
    vec![
        labeled("n3", ["role=x", "region=us"]),
        labeled("n1", ["role=x", "region=eu"]),
        labeled("n2", ["role=y", "region=us", "seeder"]),
        labeled("n4", Vec::<String>::new()),
    ]
    .into_iter()
    .collect()
}

const EXPRESSIONS: &[&str] = &[
    "all",
    "'role=x'",
    "role=y",
    "(not 'role=x')",
    "(and 'region=us' (not seeder))",
    "(or 'role=y' (and 'role=x' 'region=eu'))",
    "(or missing)",
    "(not (or 'role=x' 'role=y'))",
    "(and all 'region=us')",
];

#[test]
fn test_match_keeps_insertion_order() {
    let set = cluster();
    let matched = parse("(or 'role=x' 'role=y')").unwrap().match_set(&set).unwrap();
    assert_eq!(matched.ids(), vec!["n3", "n1", "n2"]);
}

#[test]
fn test_match_all_and_empty() {
    let set = cluster();
    assert_eq!(parse("all").unwrap().match_set(&set).unwrap().len(), 4);

    let none = parse("'nope'").unwrap().match_set(&set).unwrap();
    assert!(none.is_empty());
    assert!(none.slice().is_empty());
}

#[test]
fn test_matched_set_references_input() {
    let set = cluster();
    let matched = parse("seeder").unwrap().match_set(&set).unwrap();
    let first = matched.slice()[0];
    assert!(std::ptr::eq(first, &set.slice()[2]));
    assert!(matched.contains("n2"));
    assert!(!matched.contains("n1"));
}

#[test]
fn test_canonical_string_round_trip() {
    let set = cluster();
    for expr in EXPRESSIONS {
        let query = parse(expr).unwrap();
        let canonical = query.to_string();
        let reparsed = parse(&canonical).unwrap();

        assert_eq!(reparsed, query, "{} -> {}", expr, canonical);
        assert_eq!(reparsed.to_string(), canonical);
        assert_eq!(
            reparsed.match_set(&set).unwrap().ids(),
            query.match_set(&set).unwrap().ids(),
            "{}",
            expr
        );
    }
}

#[test]
fn test_canonical_form_quotes_labels() {
    let query = parse("(and   region=us (not  seeder))").unwrap();
    assert_eq!(query.to_string(), "(and 'region=us' (not 'seeder'))");
    assert_eq!(parse("all").unwrap().to_string(), "all");
    assert_eq!(parse("'all'").unwrap().to_string(), "'all'");
}

#[test]
fn test_duplicate_ids_fail_to_match() {
    let mut set = cluster();
    set.add(labeled("n1", ["role=z"]));

    let err = parse("'role=z'").unwrap().match_set(&set).unwrap_err();
    assert_eq!(err, MatchError::DuplicateId("n1".to_string()));
}

#[test]
fn test_execute_surfaces_parse_errors() {
    let set = cluster();
    match execute(&set, "(and") {
        Err(Error::Parse(err)) => assert_eq!(err.position, 0),
        other => panic!("expected parse error, got {:?}", other.map(|m| m.ids())),
    }
    assert_eq!(execute(&set, "region=eu").unwrap().ids(), vec!["n1"]);
}
