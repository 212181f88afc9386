//! End-to-end binding scripts run against the builtin library.

use rebind_core::{Capabilities, Value};
use rebind_script::{parse_str, Composition, Interpreter};

fn run_with(caps: Capabilities, src: &str) -> Vec<Composition> {
    let script = parse_str("<mem>", src).expect("parse failed");
    Interpreter::new(caps).run(&script).expect("run failed")
}

fn run(src: &str) -> Vec<Composition> {
    run_with(Capabilities::default(), src)
}

/// Rendered calls of every composition, in order.
fn calls(src: &str) -> Vec<String> {
    run(src)
        .iter()
        .flat_map(|c| c.calls.iter().map(ToString::to_string))
        .collect()
}

fn run_err(src: &str) -> String {
    let script = parse_str("<mem>", src).expect("parse failed");
    let err = Interpreter::new(Capabilities::default()).run(&script).unwrap_err();
    format!("{err:#}")
}

// ==========================================================================
// Argument list
// ==========================================================================

#[test]
fn permute_can_broadcast() {
    assert_eq!(
        calls("sig (s: String) -> String; permute s, s; invoke static Strings::concat; call (\"foo\");"),
        vec![r#"call("foo") = "foofoo""#]
    );
}

#[test]
fn fold_then_exclude_the_inputs() {
    let out = calls(
        "sig (a: String, b: String) -> String;
         fold ab = Strings::concat;
         exclude a, b;
         invoke static Strings::upper;
         call (\"x\", \"y\");",
    );
    assert_eq!(out, vec![r#"call("x", "y") = "XY""#]);
}

#[test]
fn spread_reads_an_array_argument() {
    let out = calls(
        r#"sig (xs: String[]) -> String;
           spread a: String, b: String;
           invoke static Strings::concat;
           call (["x", "y"]);
           call (["x"]);
           call (null);"#,
    );
    assert_eq!(out[0], r#"call(["x", "y"]) = "xy""#);
    assert!(out[1].contains("threw IllegalArgumentException"), "{}", out[1]);
    assert!(out[2].contains("threw NullPointerException"), "{}", out[2]);
}

#[test]
fn collect_gathers_scattered_arguments() {
    let out = run(
        r#"sig (a: String, n: int, b: String) -> String;
           collect parts = "a|b";
           drop n;
           invoke static Arrays::join;
           call ("x", 3, "y");"#,
    );
    assert_eq!(out[0].steps[0].signature, "(parts: String[], n: int) -> String");
    assert_eq!(out[0].calls[0].result, Ok(Value::from("x, y")));
}

#[test]
fn append_and_prepend_infer_literal_types() {
    let out = run(
        r#"sig () -> String;
           prepend s = "ab";
           append n = 2;
           invoke static Strings::repeat;
           call ();"#,
    );
    assert_eq!(out[0].steps[1].signature, "(s: String, n: int) -> String");
    assert_eq!(out[0].calls[0].result, Ok(Value::from("abab")));
}

// ==========================================================================
// Conversions
// ==========================================================================

#[test]
fn convert_widens_the_return() {
    let out = calls(
        "sig (a: int, b: int) -> long; convert (a: int, b: int) -> int; invoke static Ints::add; call (2, 3);",
    );
    assert_eq!(out, vec!["call(2, 3) = 5L"]);
}

#[test]
fn cast_narrows_arguments() {
    let out = run(
        "sig (a: long, b: long) -> int; cast (a: int, b: int) -> int; invoke static Ints::add; call (2, 3);",
    );
    assert_eq!(out[0].calls[0].args, vec![Value::Long(2), Value::Long(3)]);
    assert_eq!(out[0].calls[0].result, Ok(Value::Int(5)));
}

#[test]
fn convert_rejects_narrowing() {
    let e = run_err("sig (a: long) -> long; convert (a: int) -> long;");
    assert!(e.contains("at 23..48"), "{e}");
}

// ==========================================================================
// Functions
// ==========================================================================

#[test]
fn filter_by_pattern_and_return() {
    let out = calls(
        r#"sig (a: String, b: String) -> String;
           filter "a|b" = Strings::upper;
           invoke static Strings::concat;
           call ("x", "y");
           sig (s: String) -> int;
           filter_return Strings::length;
           invoke static Strings::upper;
           call ("abc");"#,
    );
    assert_eq!(out, vec![r#"call("x", "y") = "XY""#, r#"call("abc") = 3"#]);
}

#[test]
fn fold_void_runs_first() {
    let out = run(
        r#"sig (s: String) -> String;
           fold_void Log::note;
           invoke static Strings::upper;
           call ("hi");"#,
    );
    let call = &out[0].calls[0];
    assert_eq!(call.notes, vec!["hi".to_string()]);
    assert_eq!(call.result, Ok(Value::from("HI")));
}

#[test]
fn named_fold_of_a_void_function_adds_nothing() {
    let out = run(
        r#"sig (s: String, t: String) -> String;
           fold logged = Log::note;
           drop t;
           invoke static Strings::upper;
           call ("hi", "there");"#,
    );
    assert_eq!(out[0].steps[0].signature, "(s: String, t: String) -> String");
    assert_eq!(out[0].steps[1].signature, "(s: String) -> String");
    let call = &out[0].calls[0];
    assert_eq!(call.notes, vec!["hi".to_string()]);
    assert_eq!(call.result, Ok(Value::from("HI")));
}

#[test]
fn catch_recovers_with_the_arguments() {
    let out = calls(
        r#"sig (s: String) -> String;
           catch IllegalStateException = Errors::recover;
           invoke static Errors::fail;
           call ("x");"#,
    );
    assert_eq!(out, vec![r#"call("x") = "recovered x from IllegalStateException""#]);
}

#[test]
fn finally_runs_under_both_strategies() {
    let src = r#"sig (s: String) -> String;
                 finally Log::note;
                 invoke static Errors::fail;
                 call ("boom");
                 sig (s: String) -> String;
                 finally Log::note;
                 invoke static Strings::upper;
                 call ("fine");"#;
    for caps in [Capabilities::native(), Capabilities::emulated()] {
        let out = run_with(caps, src);
        let failed = &out[0].calls[0];
        assert_eq!(failed.notes, vec!["boom".to_string()], "{caps:?}");
        assert_eq!(
            failed.to_string(),
            r#"call("boom") threw IllegalStateException: boom"#,
            "{caps:?}"
        );
        let fine = &out[1].calls[0];
        assert_eq!(fine.notes, vec!["fine".to_string()], "{caps:?}");
        assert_eq!(fine.result, Ok(Value::from("FINE")), "{caps:?}");
    }
}

// ==========================================================================
// Linkage
// ==========================================================================

#[test]
fn virtual_dispatch_on_a_folded_receiver() {
    let out = calls(
        r#"sig (name: String, whom: String) -> String;
           fold g = Greeter::make_loud;
           drop name;
           invoke virtual greet;
           call ("ann", "bob");"#,
    );
    assert_eq!(out, vec![r#"call("ann", "bob") = "ANN GREETS BOB""#]);
}

#[test]
fn special_call_skips_the_override() {
    let out = calls(
        r#"sig (name: String, whom: String) -> String;
           fold g = Greeter::make_loud;
           drop name;
           invoke special Greeter::greet;
           call ("ann", "bob");"#,
    );
    assert_eq!(out, vec![r#"call("ann", "bob") = "ann greets bob""#]);
}

#[test]
fn special_call_needs_a_subclass_receiver() {
    let e = run_err("sig (o: Object, whom: String) -> String; invoke special Greeter::greet;");
    assert!(e.contains("invoke special Greeter::greet"), "{e}");
    assert!(e.contains("is not accessible from Object"), "{e}");
}

#[test]
fn virtual_call_on_null_throws() {
    let out = calls("sig (g: Greeter, whom: String) -> String; invoke virtual greet; call (null, \"bob\");");
    assert!(out[0].contains("threw NullPointerException"), "{}", out[0]);
}

#[test]
fn constructor_and_field_read() {
    let out = run(
        r#"sig (name: String) -> Greeter;
           invoke constructor Greeter;
           call ("ann");
           sig (name: String) -> String;
           fold g = Greeter::make;
           drop name;
           get_field name;
           call ("bea");"#,
    );
    assert_eq!(out[0].calls[0].to_string(), r#"call("ann") = <Greeter>"#);
    assert_eq!(out[1].calls[0].result, Ok(Value::from("bea")));
}

#[test]
fn static_fields_persist_across_compositions() {
    let out = calls(
        "sig (n: int) -> void; set_static Greeter::count; call (5);
         sig () -> int; get_static Greeter::count; call ();",
    );
    assert_eq!(out, vec!["call(5) = ()", "call() = 5"]);
}

#[test]
fn missing_member_is_a_link_error() {
    let e = run_err("sig (s: String) -> String; invoke static Strings::shout;");
    assert!(e.contains("no such method"), "{e}");
}

// ==========================================================================
// Endpoints without a target
// ==========================================================================

#[test]
fn constant_and_nop() {
    let out = calls(
        r#"sig (x: int) -> String; constant "k"; call (1);
           sig (x: int) -> void; nop; call (1);"#,
    );
    assert_eq!(out, vec![r#"call(1) = "k""#, "call(1) = ()"]);
}

// ==========================================================================
// Reports and failures
// ==========================================================================

#[test]
fn explain_builds_without_calling() {
    let script = parse_str(
        "<mem>",
        r#"sig (greeting: String, name: String) -> String;
           drop name;
           insert 1 name: String = "world";
           invoke static Strings::concat;
           call ("Hello, ", "ignored");"#,
    )
    .unwrap();
    let out = Interpreter::new(Capabilities::default()).explain(&script).unwrap();
    let c = &out[0];
    assert!(c.calls.is_empty());
    assert_eq!(c.start, "(greeting: String, name: String) -> String");
    assert_eq!(
        c.steps.iter().map(|s| s.signature.as_str()).collect::<Vec<_>>(),
        vec!["(greeting: String) -> String", "(greeting: String, name: String) -> String"]
    );
    assert_eq!(c.endpoint.as_deref(), Some("invoke static Strings::concat"));
    assert_eq!(c.trace[0], "start (String, String)String");
    assert!(c.trace[1].starts_with("drop_arguments"), "{:?}", c.trace);
    assert!(c.trace[2].starts_with("insert_arguments"), "{:?}", c.trace);
}

#[test]
fn unfinished_compositions_are_reported() {
    let out = run("sig (a: int) -> int; drop a;");
    assert!(out[0].endpoint.is_none());
    assert!(out[0].handle.is_none());
    assert_eq!(out[0].trace.len(), 2);
}

#[test]
fn unknown_argument_names_the_signature() {
    let e = run_err("sig (a: String) -> String; drop b;");
    assert!(e.contains("at 27..34: drop b;"), "{e}");
    assert!(e.contains("argument or pattern 'b' not found in (a: String) -> String"), "{e}");
}

#[test]
fn call_before_endpoint_fails() {
    assert!(run_err("sig () -> void; call ();").contains("call before an endpoint"));
    assert!(run_err("sig () -> void; nop; drop x;").contains("already has an endpoint"));
}

#[test]
fn unknown_functions() {
    assert!(run_err("sig (s: String) -> String; fold x = Strings::nothing;").contains("no static method"));
    assert!(run_err("sig (s: String) -> String; fold x = Nope::f;").contains("no such class: Nope"));
}
