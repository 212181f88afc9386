use std::fmt;

use rebind_types::{ConversionKind, Type};

use crate::callable::{Callable, Invocation};
use crate::combinators::{
    as_type, constant, drop_arguments, filter_return_value, guard_with_test, insert_arguments,
};
use crate::error::BindError;
use crate::signature::Signature;
use crate::value::Value;

/// A materialized callable together with the names of its arguments.
/// The signature's types always equal the callable's type.
#[derive(Debug, Clone)]
pub struct SmartHandle {
    signature: Signature,
    handle: Callable,
}

impl SmartHandle {
    pub fn from(signature: Signature, handle: Callable) -> Result<Self, BindError> {
        if signature.ty() != handle.ty() {
            return Err(BindError::EndpointMismatch {
                expected: signature.ty().clone(),
                found: handle.ty().clone(),
            });
        }
        Ok(SmartHandle { signature, handle })
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn handle(&self) -> &Callable {
        &self.handle
    }

    pub fn invoke(&self, args: Vec<Value>) -> Invocation {
        self.handle.invoke(args)
    }

    /// Bind `value` as the first argument.
    pub fn bind_to(&self, value: Value) -> Result<Self, BindError> {
        let handle = insert_arguments(&self.handle, 0, &[value])?;
        SmartHandle::from(self.signature.drop_arg_at(0)?, handle)
    }

    /// Accept an ignored argument `name: ty` just before the argument
    /// called `before`.
    pub fn drop(&self, before: &str, name: &str, ty: Type) -> Result<Self, BindError> {
        let signature = self.signature.insert_arg_before(before, name, ty.clone())?;
        let index = self.signature.arg_offset(before).unwrap_or_default();
        let handle = drop_arguments(&self.handle, index, &[ty])?;
        SmartHandle::from(signature, handle)
    }

    /// Accept an ignored trailing argument `name: ty`.
    pub fn drop_last(&self, name: &str, ty: Type) -> Result<Self, BindError> {
        let handle = drop_arguments(&self.handle, self.signature.arg_count(), &[ty.clone()])?;
        SmartHandle::from(self.signature.append_arg(name, ty), handle)
    }

    pub fn convert(&self, target: &Signature) -> Result<Self, BindError> {
        let handle = as_type(&self.handle, target.ty(), ConversionKind::Assignment)?;
        SmartHandle::from(target.clone(), handle)
    }

    pub fn cast(&self, target: &Signature) -> Result<Self, BindError> {
        let handle = as_type(&self.handle, target.ty(), ConversionKind::Explicit)?;
        SmartHandle::from(target.clone(), handle)
    }

    /// Use this boolean-returning handle to choose between `target` and
    /// `fallback`, which must share a signature.
    pub fn guard(&self, target: &SmartHandle, fallback: &SmartHandle) -> Result<Self, BindError> {
        let handle = guard_with_test(&self.handle, &target.handle, &fallback.handle)?;
        SmartHandle::from(target.signature.clone(), handle)
    }

    /// Discard the result and return `value` of type `ty` instead.
    pub fn returning_value(&self, ty: &Type, value: Value) -> Result<Self, BindError> {
        let mut replace = constant(ty, value)?;
        let ret = self.handle.ty().ret();
        if !ret.is_void() {
            replace = drop_arguments(&replace, 0, std::slice::from_ref(ret))?;
        }
        let handle = filter_return_value(&self.handle, &replace)?;
        SmartHandle::from(self.signature.change_return(ty.clone()), handle)
    }
}

impl fmt::Display for SmartHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.handle.name(), self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Thrown;
    use rebind_types::FnType;

    fn greet() -> SmartHandle {
        let sig = Signature::returning(Type::string())
            .append_arg("greeting", Type::string())
            .append_arg("name", Type::string());
        let handle = Callable::new("greet", sig.ty().clone(), |args| match (&args[0], &args[1]) {
            (Value::Str(g), Value::Str(n)) => Ok(Value::Str(format!("{g}, {n}"))),
            _ => Err(Thrown::null_pointer("greet")),
        });
        SmartHandle::from(sig, handle).unwrap()
    }

    #[test]
    fn bind_and_drop_by_name() {
        let hello = greet().bind_to(Value::from("Hello")).unwrap();
        assert_eq!(hello.signature().to_string(), "(name: String) -> String");

        let loud = hello.drop("name", "volume", Type::int()).unwrap();
        assert_eq!(loud.signature().names(), &["volume", "name"]);
        assert_eq!(
            loud.invoke(vec![Value::Int(11), Value::from("Bob")]),
            Ok(Value::from("Hello, Bob"))
        );
    }

    #[test]
    fn guard_chooses_branch() {
        let sig = greet().signature().clone();
        let is_hi = Callable::new(
            "is_hi",
            FnType::new(Type::boolean(), vec![Type::string()]),
            |args| Ok(Value::Bool(args[0].as_str() == Some("hi"))),
        );
        let test = SmartHandle::from(sig.drop_last(1).unwrap().change_return(Type::boolean()), is_hi).unwrap();
        let other = greet().returning_value(&Type::string(), Value::from("nope")).unwrap();
        let guarded = test.guard(&greet(), &other).unwrap();
        assert_eq!(
            guarded.invoke(vec!["hi".into(), "x".into()]),
            Ok(Value::from("hi, x"))
        );
        assert_eq!(
            guarded.invoke(vec!["yo".into(), "x".into()]),
            Ok(Value::from("nope"))
        );
    }
}
