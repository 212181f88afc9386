//! Integration tests for the static conversion rules.
//!
//! Each kind permits a superset of the one before it:
//! Assignment <= Checked <= Explicit.

use rebind_types::{ConversionKind, FnType, PrimType, Type};

use ConversionKind::{Assignment, Checked, Explicit};

/// Helper: the weakest kind permitting `from -> to`, if any
fn weakest(from: &Type, to: &Type) -> Option<ConversionKind> {
    [Assignment, Checked, Explicit]
        .into_iter()
        .find(|k| k.permits(from, to))
}

fn parse(name: &str) -> Type {
    Type::parse(name).unwrap_or_else(|| panic!("cannot parse {name}"))
}

// ============================================================================
// Primitives
// ============================================================================

#[test]
fn widening_is_assignment() {
    for (from, to) in [("byte", "short"), ("short", "int"), ("char", "int"), ("int", "long"), ("long", "float"), ("float", "double")] {
        assert_eq!(weakest(&parse(from), &parse(to)), Some(Assignment), "{from} -> {to}");
    }
}

#[test]
fn narrowing_is_explicit() {
    for (from, to) in [("long", "int"), ("int", "byte"), ("double", "float"), ("int", "boolean"), ("char", "short")] {
        assert_eq!(weakest(&parse(from), &parse(to)), Some(Explicit), "{from} -> {to}");
    }
}

#[test]
fn every_kind_is_reflexive() {
    for p in PrimType::ALL {
        let t = Type::Prim(p);
        assert_eq!(weakest(&t, &t), Some(Assignment));
    }
}

// ============================================================================
// Boxing and references
// ============================================================================

#[test]
fn boxing_and_unboxing() {
    assert_eq!(weakest(&Type::int(), &Type::boxed(PrimType::Int)), Some(Assignment));
    assert_eq!(weakest(&Type::int(), &Type::number()), Some(Assignment));
    assert_eq!(weakest(&Type::boxed(PrimType::Int), &Type::long()), Some(Assignment));
    assert_eq!(weakest(&Type::number(), &Type::int()), Some(Checked));
    assert_eq!(weakest(&Type::int(), &Type::boxed(PrimType::Long)), Some(Explicit));
}

#[test]
fn reference_narrowing_is_checked() {
    assert_eq!(weakest(&Type::string(), &Type::object()), Some(Assignment));
    assert_eq!(weakest(&Type::object(), &Type::string()), Some(Checked));
    assert_eq!(weakest(&Type::string(), &Type::number()), Some(Explicit));
}

#[test]
fn void_only_converts_to_itself() {
    for kind in [Assignment, Checked, Explicit] {
        assert!(kind.permits(&Type::void(), &Type::void()));
        assert!(!kind.permits(&Type::void(), &Type::int()));
        assert!(!kind.permits(&Type::object(), &Type::void()));
        assert!(kind.permits_return(&Type::int(), &Type::void()));
        assert!(kind.permits_return(&Type::void(), &Type::string()));
    }
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn types_render_and_parse() {
    for name in ["int", "String[]", "long[][]", "Object", "void"] {
        assert_eq!(parse(name).to_string(), name);
    }
    assert!(Type::parse("void[]").is_none());
    assert!(Type::parse("no spaces").is_none());
}

#[test]
fn function_types_render() {
    let ty = FnType::new(Type::string(), vec![Type::int(), Type::string().array()]);
    assert_eq!(ty.to_string(), "(int, String[])String");
    assert_eq!(ty.drop_params(0, 1).to_string(), "(String[])String");
    assert_eq!(FnType::returning(Type::void()).to_string(), "()void");
}
