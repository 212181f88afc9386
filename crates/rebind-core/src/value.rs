//! Runtime values flowing through callables.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rebind_types::{Class, PrimType, Type};

use crate::callable::Callable;

/// Runtime values.
///
/// A boxed primitive is represented by the primitive variant itself, so a
/// `Value::Int` conforms to `int`, `Integer`, `Number` and `Object` alike.
#[derive(Debug, Clone)]
pub enum Value {
    /// Result of a `void` call.
    Unit,
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Array(ArrayValue),
    /// Instance of a nominal class; compared by identity.
    Object(Arc<Object>),
    Callable(Callable),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Unit, Unit) | (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Byte(a), Byte(b)) => a == b,
            (Short(a), Short(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Long(a), Long(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Double(a), Double(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Object(a), Object(b)) => Arc::ptr_eq(a, b),
            (Callable(a), Callable(b)) => a.same(b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Callable> for Value {
    fn from(c: Callable) -> Self {
        Value::Callable(c)
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The primitive kind of a (possibly boxed) primitive value.
    pub fn prim_type(&self) -> Option<PrimType> {
        Some(match self {
            Value::Bool(_) => PrimType::Boolean,
            Value::Byte(_) => PrimType::Byte,
            Value::Short(_) => PrimType::Short,
            Value::Char(_) => PrimType::Char,
            Value::Int(_) => PrimType::Int,
            Value::Long(_) => PrimType::Long,
            Value::Float(_) => PrimType::Float,
            Value::Double(_) => PrimType::Double,
            _ => return None,
        })
    }

    /// The most specific static type describing this value. Primitives
    /// report their primitive type; `null` reports `Object`.
    pub fn natural_type(&self) -> Type {
        if let Some(p) = self.prim_type() {
            return Type::Prim(p);
        }
        match self {
            Value::Unit => Type::Void,
            Value::Str(_) => Type::string(),
            Value::Array(a) => a.ty(),
            Value::Object(o) => o.ty(),
            Value::Callable(_) => Type::callable(),
            _ => Type::object(),
        }
    }

    /// Runtime class used for dispatch and failure messages.
    pub fn runtime_class(&self) -> Option<Arc<Class>> {
        if let Some(p) = self.prim_type() {
            return Type::boxed(p).class().cloned();
        }
        match self {
            Value::Str(_) => Type::string().class().cloned(),
            Value::Object(o) => Some(o.class().clone()),
            Value::Callable(_) => Type::callable().class().cloned(),
            Value::Array(_) => Type::object().class().cloned(),
            _ => None,
        }
    }

    /// Whether this value may occupy a slot of type `ty`.
    pub fn conforms_to(&self, ty: &Type) -> bool {
        match ty {
            Type::Void => matches!(self, Value::Unit),
            Type::Prim(p) => self.prim_type() == Some(*p),
            Type::Array(_) => match self {
                Value::Null => true,
                Value::Array(a) => ty.is_assignable_from(&a.ty()),
                _ => false,
            },
            Type::Ref(_) => match self {
                Value::Null => true,
                Value::Unit => false,
                Value::Array(a) => ty.is_assignable_from(&a.ty()),
                other => other
                    .runtime_class()
                    .is_some_and(|c| ty.is_assignable_from(&Type::Ref(c))),
            },
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<Object>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Value::Callable(c) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Byte(v) => write!(f, "{v}"),
            Value::Short(v) => write!(f, "{v}"),
            Value::Char(v) => match char::from_u32(u32::from(*v)) {
                Some(c) => write!(f, "'{c}'"),
                None => write!(f, "'\\u{{{v:04x}}}'"),
            },
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}L"),
            Value::Float(v) => write!(f, "{v}f"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "\"{s}\""),
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, item) in a.items().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(o) => match o.message() {
                Some(msg) => write!(f, "{}: {}", o.class().name(), msg),
                None => write!(f, "<{}>", o.class().name()),
            },
            Value::Callable(c) => write!(f, "<callable {}>", c),
        }
    }
}

/// An immutable array value. Compared by content.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    elem: Type,
    items: Arc<Vec<Value>>,
}

impl ArrayValue {
    pub fn new(elem: Type, items: Vec<Value>) -> Self {
        Self {
            elem,
            items: Arc::new(items),
        }
    }

    pub fn elem(&self) -> &Type {
        &self.elem
    }

    /// The array type, `elem[]`.
    pub fn ty(&self) -> Type {
        Type::array_of(self.elem.clone())
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Instance of a nominal class: an optional message (used by throwables)
/// plus named fields.
#[derive(Debug)]
pub struct Object {
    class: Arc<Class>,
    message: Option<String>,
    fields: RwLock<BTreeMap<String, Value>>,
}

impl Object {
    pub fn new(class: Arc<Class>) -> Self {
        Self {
            class,
            message: None,
            fields: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn with_message(class: Arc<Class>, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(class)
        }
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    pub fn ty(&self) -> Type {
        Type::Ref(self.class.clone())
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.fields.read().get(name).cloned()
    }

    pub fn set_field(&self, name: &str, value: Value) {
        self.fields.write().insert(name.to_string(), value);
    }
}

/// A failure raised by an invocation: a throwable object.
///
/// Two `Thrown`s are equal only if they carry the same object, so tests can
/// check that a failure was propagated rather than re-created.
#[derive(Debug, Clone)]
pub struct Thrown(Arc<Object>);

impl PartialEq for Thrown {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Thrown {
    /// Raise an instance of `ty` (which should be a throwable class).
    pub fn new(ty: &Type, message: impl Into<String>) -> Self {
        let class = match ty {
            Type::Ref(c) => c.clone(),
            _ => Class::builtin("RuntimeException"),
        };
        Thrown(Arc::new(Object::with_message(class, message)))
    }

    pub fn from_object(object: Arc<Object>) -> Self {
        Thrown(object)
    }

    pub fn class_cast(message: impl Into<String>) -> Self {
        Thrown::new(&Type::class_cast_exception(), message)
    }

    pub fn null_pointer(message: impl Into<String>) -> Self {
        Thrown::new(&Type::null_pointer_exception(), message)
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Thrown::new(&Type::illegal_argument_exception(), message)
    }

    pub fn wrong_method_type(message: impl Into<String>) -> Self {
        Thrown::new(&Type::wrong_method_type_exception(), message)
    }

    pub fn object(&self) -> &Arc<Object> {
        &self.0
    }

    pub fn class(&self) -> &Arc<Class> {
        self.0.class()
    }

    pub fn ty(&self) -> Type {
        self.0.ty()
    }

    pub fn message(&self) -> Option<&str> {
        self.0.message()
    }

    /// The thrown object as a value, as handed to recovery handlers.
    pub fn value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Whether the failure's class is `ty` or a subclass of it.
    pub fn is_instance_of(&self, ty: &Type) -> bool {
        ty.is_assignable_from(&self.ty())
    }
}

impl fmt::Display for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(msg) => write!(f, "{}: {}", self.class().name(), msg),
            None => write!(f, "{}", self.class().name()),
        }
    }
}

impl std::error::Error for Thrown {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxed_primitives_conform_to_wrappers() {
        let v = Value::Int(3);
        assert!(v.conforms_to(&Type::int()));
        assert!(v.conforms_to(&Type::boxed(PrimType::Int)));
        assert!(v.conforms_to(&Type::number()));
        assert!(v.conforms_to(&Type::object()));
        assert!(!v.conforms_to(&Type::long()));
        assert!(!v.conforms_to(&Type::string()));
    }

    #[test]
    fn null_only_conforms_to_references() {
        assert!(Value::Null.conforms_to(&Type::string()));
        assert!(Value::Null.conforms_to(&Type::int().array()));
        assert!(!Value::Null.conforms_to(&Type::int()));
        assert!(!Value::Null.conforms_to(&Type::void()));
    }

    #[test]
    fn arrays_are_covariant_on_references() {
        let strings = Value::Array(ArrayValue::new(
            Type::string(),
            vec![Value::from("a"), Value::from("b")],
        ));
        assert!(strings.conforms_to(&Type::object().array()));
        assert!(strings.conforms_to(&Type::object()));
        assert!(!strings.conforms_to(&Type::int().array()));
    }

    #[test]
    fn objects_compare_by_identity() {
        let class = Class::builtin("Point");
        let a = Value::Object(Arc::new(Object::new(class.clone())));
        let b = Value::Object(Arc::new(Object::new(class)));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn thrown_matches_superclasses() {
        let t = Thrown::class_cast("nope");
        assert!(t.is_instance_of(&Type::runtime_exception()));
        assert!(t.is_instance_of(&Type::throwable()));
        assert!(!t.is_instance_of(&Type::null_pointer_exception()));
        assert_eq!(t.to_string(), "ClassCastException: nope");
    }
}
