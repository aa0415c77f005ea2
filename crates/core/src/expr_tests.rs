use super::*;

#[test]
fn literal_regex_matches_exact_uri() {
    let expr = Expr::compile("urn:demo:echo").expect("compiles");
    assert!(expr.matches("urn:demo:echo"));
    assert!(!expr.matches("urn:demo:other"));
}

#[test]
fn regex_wildcard_matches_prefix_family() {
    let expr = Expr::compile("urn:demo:.*").expect("compiles");
    assert!(expr.matches("urn:demo:echo"));
    assert!(expr.matches("urn:demo:"));
    assert!(!expr.matches("urn:other:echo"));
}

#[test]
fn negation_inverts_match() {
    let expr = Expr::compile("!urn:demo:echo").expect("compiles");
    assert!(!expr.matches("urn:demo:echo"));
    assert!(expr.matches("urn:demo:other"));
}

#[test]
fn bad_pattern_is_rejected() {
    let result = Expr::compile("(unterminated");
    assert!(result.is_err());
}

#[test]
fn original_text_is_preserved_for_diagnostics() {
    let expr = Expr::compile("urn:x:app").expect("compiles");
    assert_eq!(expr.original(), "urn:x:app");
}

#[test]
fn match_is_total_never_panics_on_empty_input() {
    let expr = Expr::compile(".*").expect("compiles");
    assert!(expr.matches(""));
}
