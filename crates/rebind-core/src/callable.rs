//! The opaque invocable value every adaptation wraps.

use std::fmt;
use std::sync::Arc;

use rebind_types::FnType;

use crate::value::{Thrown, Value};

/// Outcome of calling a [`Callable`]: a value, or a propagated failure.
pub type Invocation = Result<Value, Thrown>;

type Body = dyn Fn(Vec<Value>) -> Invocation + Send + Sync;

/// A typed function value. Cloning is cheap; clones share the body.
#[derive(Clone)]
pub struct Callable {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    ty: FnType,
    varargs: bool,
    body: Arc<Body>,
}

impl Callable {
    pub fn new<F>(name: impl Into<String>, ty: FnType, body: F) -> Self
    where
        F: Fn(Vec<Value>) -> Invocation + Send + Sync + 'static,
    {
        Callable {
            inner: Arc::new(Inner {
                name: name.into(),
                ty,
                varargs: false,
                body: Arc::new(body),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn ty(&self) -> &FnType {
        &self.inner.ty
    }

    /// Whether `as_type` may collect trailing arguments into the last
    /// (array) parameter when the requested arity differs.
    pub fn is_varargs(&self) -> bool {
        self.inner.varargs
    }

    /// The same body with the varargs flag set as given.
    pub fn with_varargs(&self, varargs: bool) -> Self {
        Callable {
            inner: Arc::new(Inner {
                name: self.inner.name.clone(),
                ty: self.inner.ty.clone(),
                varargs,
                body: self.inner.body.clone(),
            }),
        }
    }

    /// Identity comparison.
    pub fn same(&self, other: &Callable) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Invoke with exactly matching arguments.
    ///
    /// Arity and per-argument conformance are checked first; a mismatch
    /// raises `WrongMethodTypeException` without entering the body. A
    /// `void` callable always yields [`Value::Unit`].
    pub fn invoke(&self, args: Vec<Value>) -> Invocation {
        let ty = &self.inner.ty;
        if args.len() != ty.param_count() {
            return Err(Thrown::wrong_method_type(format!(
                "{} expects {} arguments, got {}",
                self,
                ty.param_count(),
                args.len()
            )));
        }
        for (i, (arg, param)) in args.iter().zip(ty.params()).enumerate() {
            if !arg.conforms_to(param) {
                return Err(Thrown::wrong_method_type(format!(
                    "{}: argument {} ({}) is not a {}",
                    self, i, arg, param
                )));
            }
        }
        let result = (self.inner.body)(args)?;
        if ty.ret().is_void() {
            return Ok(Value::Unit);
        }
        if !result.conforms_to(ty.ret()) {
            return Err(Thrown::wrong_method_type(format!(
                "{}: result {} is not a {}",
                self,
                result,
                ty.ret()
            )));
        }
        Ok(result)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.inner.name)
            .field("ty", &self.inner.ty)
            .field("varargs", &self.inner.varargs)
            .finish()
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.inner.name, self.inner.ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebind_types::Type;

    fn add() -> Callable {
        Callable::new(
            "add",
            FnType::new(Type::int(), vec![Type::int(), Type::int()]),
            |args| match (&args[0], &args[1]) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
                _ => Err(Thrown::illegal_argument("add")),
            },
        )
    }

    #[test]
    fn invoke_checks_arity_and_types() {
        let f = add();
        assert_eq!(f.invoke(vec![Value::Int(2), Value::Int(3)]), Ok(Value::Int(5)));

        let err = f.invoke(vec![Value::Int(2)]).unwrap_err();
        assert_eq!(err.class().name(), "WrongMethodTypeException");

        let err = f.invoke(vec![Value::Int(2), Value::Long(3)]).unwrap_err();
        assert_eq!(err.class().name(), "WrongMethodTypeException");
    }

    #[test]
    fn void_callables_yield_unit() {
        let f = Callable::new("noisy", FnType::returning(Type::void()), |_| {
            Ok(Value::Int(1))
        });
        assert_eq!(f.invoke(vec![]), Ok(Value::Unit));
    }

    #[test]
    fn varargs_flag_shares_body() {
        let f = add();
        let g = f.with_varargs(true);
        assert!(g.is_varargs());
        assert!(!f.is_varargs());
        assert!(!f.same(&g));
        assert_eq!(g.to_string(), "add(int, int)int");
    }
}
