//! Core `Type` definitions: the descriptors every signature is built from.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimType {
    pub const ALL: [PrimType; 8] = [
        PrimType::Boolean,
        PrimType::Byte,
        PrimType::Short,
        PrimType::Char,
        PrimType::Int,
        PrimType::Long,
        PrimType::Float,
        PrimType::Double,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PrimType::Boolean => "boolean",
            PrimType::Byte => "byte",
            PrimType::Short => "short",
            PrimType::Char => "char",
            PrimType::Int => "int",
            PrimType::Long => "long",
            PrimType::Float => "float",
            PrimType::Double => "double",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        PrimType::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Name of the reference class that boxes this primitive.
    pub fn wrapper_name(self) -> &'static str {
        match self {
            PrimType::Boolean => "Boolean",
            PrimType::Byte => "Byte",
            PrimType::Short => "Short",
            PrimType::Char => "Character",
            PrimType::Int => "Integer",
            PrimType::Long => "Long",
            PrimType::Float => "Float",
            PrimType::Double => "Double",
        }
    }

    pub fn from_wrapper_name(name: &str) -> Option<Self> {
        PrimType::ALL.into_iter().find(|p| p.wrapper_name() == name)
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, PrimType::Boolean)
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimType::Byte | PrimType::Short | PrimType::Char | PrimType::Int | PrimType::Long
        )
    }

    /// Widening primitive conversion (never loses magnitude).
    pub fn widens_to(self, to: PrimType) -> bool {
        use PrimType::*;
        match self {
            Byte => matches!(to, Short | Int | Long | Float | Double),
            Short | Char => matches!(to, Int | Long | Float | Double),
            Int => matches!(to, Long | Float | Double),
            Long => matches!(to, Float | Double),
            Float => matches!(to, Double),
            Boolean | Double => false,
        }
    }
}

/// A nominal reference class. Equality and hashing are by name; the
/// superclass chain only drives assignability.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Class {
    name: String,
    superclass: Option<Arc<Class>>,
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Class {}

impl Hash for Class {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl Class {
    pub fn new(name: impl Into<String>, superclass: Option<Arc<Class>>) -> Arc<Class> {
        Arc::new(Class {
            name: name.into(),
            superclass,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superclass(&self) -> Option<&Arc<Class>> {
        self.superclass.as_ref()
    }

    /// This class followed by every superclass up to the root.
    pub fn ancestry(&self) -> impl Iterator<Item = &Class> {
        std::iter::successors(Some(self), |c| c.superclass.as_deref())
    }

    /// Reflexive: a class is a subclass of itself.
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        self.ancestry().any(|c| c.name == other.name)
    }

    /// Resolve one of the built-in classes by name. Unknown names become
    /// direct subclasses of `Object`.
    pub fn builtin(name: &str) -> Arc<Class> {
        let parent = match name {
            "Object" => None,
            "Integer" | "Long" | "Short" | "Byte" | "Float" | "Double" => Some("Number"),
            "Exception" | "Error" => Some("Throwable"),
            "RuntimeException" => Some("Exception"),
            "ClassCastException"
            | "NullPointerException"
            | "IllegalArgumentException"
            | "IllegalStateException"
            | "WrongMethodTypeException"
            | "UnsupportedOperationException" => Some("RuntimeException"),
            _ => Some("Object"),
        };
        Class::new(name, parent.map(Class::builtin))
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Absence of a value. Only meaningful as a return type.
    Void,

    /// Primitive scalar types.
    Prim(PrimType),

    /// Array of a component type.
    Array(Box<Type>),

    /// Nominal reference type.
    Ref(Arc<Class>),
}

impl Type {
    pub fn void() -> Self {
        Type::Void
    }
    pub fn boolean() -> Self {
        Type::Prim(PrimType::Boolean)
    }
    pub fn byte() -> Self {
        Type::Prim(PrimType::Byte)
    }
    pub fn short() -> Self {
        Type::Prim(PrimType::Short)
    }
    pub fn char() -> Self {
        Type::Prim(PrimType::Char)
    }
    pub fn int() -> Self {
        Type::Prim(PrimType::Int)
    }
    pub fn long() -> Self {
        Type::Prim(PrimType::Long)
    }
    pub fn float() -> Self {
        Type::Prim(PrimType::Float)
    }
    pub fn double() -> Self {
        Type::Prim(PrimType::Double)
    }

    pub fn object() -> Self {
        Type::named("Object")
    }
    pub fn string() -> Self {
        Type::named("String")
    }
    pub fn number() -> Self {
        Type::named("Number")
    }
    pub fn callable() -> Self {
        Type::named("Callable")
    }
    pub fn throwable() -> Self {
        Type::named("Throwable")
    }
    pub fn exception() -> Self {
        Type::named("Exception")
    }
    pub fn runtime_exception() -> Self {
        Type::named("RuntimeException")
    }
    pub fn class_cast_exception() -> Self {
        Type::named("ClassCastException")
    }
    pub fn null_pointer_exception() -> Self {
        Type::named("NullPointerException")
    }
    pub fn illegal_argument_exception() -> Self {
        Type::named("IllegalArgumentException")
    }
    pub fn illegal_state_exception() -> Self {
        Type::named("IllegalStateException")
    }
    pub fn wrong_method_type_exception() -> Self {
        Type::named("WrongMethodTypeException")
    }

    /// The reference type boxing `prim`.
    pub fn boxed(prim: PrimType) -> Self {
        Type::named(prim.wrapper_name())
    }

    /// A built-in reference type by class name.
    pub fn named(name: &str) -> Self {
        Type::Ref(Class::builtin(name))
    }

    /// A user class extending `parent` (or `Object` when `parent` is not a
    /// class type).
    pub fn subclass(name: impl Into<String>, parent: &Type) -> Self {
        let parent = match parent {
            Type::Ref(c) => c.clone(),
            _ => Class::builtin("Object"),
        };
        Type::Ref(Class::new(name, Some(parent)))
    }

    pub fn array_of(elem: Type) -> Self {
        Type::Array(Box::new(elem))
    }

    pub fn array(&self) -> Self {
        Type::array_of(self.clone())
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Prim(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    /// Arrays and classes.
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Array(_) | Type::Ref(_))
    }

    pub fn prim(&self) -> Option<PrimType> {
        match self {
            Type::Prim(p) => Some(*p),
            _ => None,
        }
    }

    pub fn class(&self) -> Option<&Arc<Class>> {
        match self {
            Type::Ref(c) => Some(c),
            _ => None,
        }
    }

    pub fn component(&self) -> Option<&Type> {
        match self {
            Type::Array(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn is_throwable(&self) -> bool {
        match self {
            Type::Ref(c) => c.is_subclass_of(&Class::builtin("Throwable")),
            _ => false,
        }
    }

    /// The primitive a wrapper class unboxes to.
    pub fn unboxed(&self) -> Option<PrimType> {
        match self {
            Type::Ref(c) => PrimType::from_wrapper_name(c.name()),
            _ => None,
        }
    }

    /// Reference widening: can a value statically typed `from` be stored in
    /// a slot of this type without a check?
    pub fn is_assignable_from(&self, from: &Type) -> bool {
        if self == from {
            return true;
        }
        match (self, from) {
            (Type::Ref(to), Type::Array(_)) => to.name() == "Object",
            (Type::Ref(to), Type::Ref(from)) => from.is_subclass_of(to),
            (Type::Array(to), Type::Array(from)) => {
                to.is_reference() && from.is_reference() && to.is_assignable_from(from)
            }
            _ => false,
        }
    }

    /// Look up a type by its rendered name (`int`, `String`, `long[]`, ...).
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if let Some(elem) = name.strip_suffix("[]") {
            return Type::parse(elem).filter(|t| !t.is_void()).map(Type::array_of);
        }
        if name == "void" {
            return Some(Type::Void);
        }
        if let Some(p) = PrimType::from_name(name) {
            return Some(Type::Prim(p));
        }
        let ident = name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        (ident && !name.is_empty()).then(|| Type::named(name))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Prim(p) => write!(f, "{}", p.name()),
            Type::Array(elem) => write!(f, "{}[]", elem),
            Type::Ref(c) => write!(f, "{}", c.name()),
        }
    }
}

impl From<PrimType> for Type {
    fn from(p: PrimType) -> Self {
        Type::Prim(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_hierarchy() {
        let cce = Class::builtin("ClassCastException");
        let names: Vec<_> = cce.ancestry().map(|c| c.name().to_string()).collect();
        assert_eq!(
            names,
            vec![
                "ClassCastException",
                "RuntimeException",
                "Exception",
                "Throwable",
                "Object"
            ]
        );
    }

    #[test]
    fn reference_widening() {
        assert!(Type::object().is_assignable_from(&Type::string()));
        assert!(Type::number().is_assignable_from(&Type::boxed(PrimType::Long)));
        assert!(!Type::string().is_assignable_from(&Type::object()));
        assert!(Type::object().is_assignable_from(&Type::int().array()));
        assert!(Type::object()
            .array()
            .is_assignable_from(&Type::string().array()));
        assert!(!Type::long().array().is_assignable_from(&Type::int().array()));
        assert!(!Type::object().is_assignable_from(&Type::int()));
    }

    #[test]
    fn user_classes_extend_parents() {
        let base = Type::subclass("Shape", &Type::object());
        let circle = Type::subclass("Circle", &base);
        assert!(base.is_assignable_from(&circle));
        assert!(!circle.is_assignable_from(&base));
        let boom = Type::subclass("Boom", &Type::runtime_exception());
        assert!(boom.is_throwable());
        assert!(Type::exception().is_assignable_from(&boom));
    }

    #[test]
    fn parse_and_display_agree() {
        for name in ["int", "void", "String", "long[]", "Object[][]", "Integer"] {
            let ty = Type::parse(name).expect("parse type name");
            assert_eq!(ty.to_string(), name);
        }
        assert_eq!(Type::parse("void[]"), None);
        assert_eq!(Type::parse("a-b"), None);
    }

    #[test]
    fn prim_widening_table() {
        assert!(PrimType::Int.widens_to(PrimType::Long));
        assert!(PrimType::Char.widens_to(PrimType::Int));
        assert!(!PrimType::Char.widens_to(PrimType::Short));
        assert!(!PrimType::Long.widens_to(PrimType::Int));
        assert!(!PrimType::Boolean.widens_to(PrimType::Int));
    }
}
