//! Parser-level tests: statement forms, error messages, spans and the
//! serialized tree.

use rebind_script::ast::{Endpoint, Lit, StmtKind};
use rebind_script::parse_str;

fn kinds(src: &str) -> Vec<StmtKind> {
    parse_str("<mem>", src)
        .expect("parse failed")
        .stmts
        .into_iter()
        .map(|s| s.kind)
        .collect()
}

fn err(src: &str) -> String {
    parse_str("<mem>", src).unwrap_err().to_string()
}

// ==========================================================================
// Statement forms
// ==========================================================================

#[test]
fn every_endpoint_form_parses() {
    let src = "invoke static A::b; invoke virtual m; invoke special A::m; \
               invoke constructor A; get_static A::f; set_static A::f; \
               get_field f; set_field f; identity; constant 3; nop; throw;";
    let endpoints: Vec<String> = kinds(src)
        .into_iter()
        .map(|k| match k {
            StmtKind::Endpoint(e) => e.to_string(),
            other => panic!("not an endpoint: {other}"),
        })
        .collect();
    assert_eq!(
        endpoints,
        vec![
            "invoke static A::b",
            "invoke virtual m",
            "invoke special A::m",
            "invoke constructor A",
            "get_static A::f",
            "set_static A::f",
            "get_field f",
            "set_field f",
            "identity",
            "constant 3",
            "nop",
            "throw",
        ]
    );
}

#[test]
fn empty_signature_and_empty_call() {
    let ks = kinds("sig () -> void; nop; call ();");
    assert!(matches!(&ks[0], StmtKind::Sig(s) if s.params.is_empty()));
    assert!(matches!(&ks[1], StmtKind::Endpoint(Endpoint::Nop)));
    assert!(matches!(&ks[2], StmtKind::Call(args) if args.is_empty()));
}

#[test]
fn array_types_and_literals() {
    let ks = kinds(r#"sig (xs: String[][]) -> int; call ([["a"], []]);"#);
    let StmtKind::Sig(sig) = &ks[0] else { panic!() };
    assert_eq!(sig.params[0].ty.dims, 2);
    let StmtKind::Call(args) = &ks[1] else { panic!() };
    assert_eq!(
        args,
        &vec![Lit::Array(vec![
            Lit::Array(vec![Lit::Str("a".into())]),
            Lit::Array(vec![]),
        ])]
    );
}

#[test]
fn patterns_may_be_quoted() {
    let ks = kinds(r#"permute b, "a.*"; exclude "x|y";"#);
    let StmtKind::Permute(ps) = &ks[0] else { panic!() };
    assert_eq!((ps[0].quoted, ps[1].quoted), (false, true));
    assert_eq!(ps[1].text, "a.*");
    assert_eq!(ks[1].to_string(), "exclude \"x|y\"");
}

#[test]
fn comments_are_skipped() {
    let ks = kinds("// leading\nnop; // trailing\n// done");
    assert_eq!(ks.len(), 1);
}

// ==========================================================================
// Errors
// ==========================================================================

#[test]
fn missing_semicolon_is_error() {
    assert!(err("drop x").contains("expected Semicolon"));
}

#[test]
fn unknown_statement_names_the_word() {
    let e = err("  frobnicate x;");
    assert!(e.contains("unknown statement `frobnicate` at 2..12"), "{e}");
}

#[test]
fn invoke_needs_a_known_kind() {
    assert!(err("invoke sideways A::b;").contains("after invoke"));
}

#[test]
fn insert_needs_an_index() {
    assert!(err("insert x = 1;").contains("expected an argument index"));
}

#[test]
fn lexer_errors_surface_with_their_span() {
    let e = err(r#"call ("open);"#);
    assert!(e.contains("unterminated string at 6..13"), "{e}");
    assert!(err("drop @;").contains("unexpected character"));
}

#[test]
fn minus_needs_a_number() {
    assert!(err(r#"constant -"x";"#).contains("expected a number after `-`"));
}

// ==========================================================================
// Spans and serialization
// ==========================================================================

#[test]
fn member_and_binding_spans() {
    let script = parse_str("<mem>", "fold g = Greeter::make; append n: int = 7;").unwrap();
    let StmtKind::Fold { function, .. } = &script.stmts[0].kind else { panic!() };
    assert_eq!((function.span.start, function.span.end), (9, 22));
    let StmtKind::Append(binding) = &script.stmts[1].kind else { panic!() };
    // `n: int = 7`
    assert_eq!((binding.span.start, binding.span.end), (31, 41));
    assert_eq!((script.stmts[1].span.start, script.stmts[1].span.end), (24, 42));
}

#[test]
fn tree_serializes_to_json() {
    let script = parse_str("<mem>", "drop x;").unwrap();
    let json = serde_json::to_value(&script).unwrap();
    assert_eq!(json["stmts"][0]["kind"]["Drop"]["text"], "x");
    assert_eq!(json["stmts"][0]["span"]["end"], 7);
}
