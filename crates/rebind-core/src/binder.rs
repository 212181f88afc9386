//! Positional composition engine.
//!
//! A [`Binder`] starts from the type callers will see and records a stack
//! of [`Transform`]s, each projecting the type one step closer to the
//! endpoint. `invoke` walks the stack newest-first, wrapping the endpoint
//! until it has the start type again.
//!
//! Binders are persistent: every operation returns a new binder sharing
//! the unchanged prefix, so siblings derived from one binder never see
//! each other's steps.

use std::fmt;
use std::sync::Arc;

use rebind_types::{ConversionKind, FnType, Type};
use tracing::{debug, trace, warn};

use crate::callable::Callable;
use crate::capabilities::Capabilities;
use crate::combinators::{
    as_type, constant, empty, exact_invoker, explicit_cast_arguments, identity, throw_exception,
};
use crate::error::{BindError, LinkError};
use crate::lookup::Lookup;
use crate::transform::Transform;
use crate::value::Value;

#[derive(Debug)]
struct Link {
    transform: Transform,
    /// Type after `transform`.
    ty: FnType,
    prev: Option<Arc<Link>>,
}

#[derive(Debug, Clone)]
pub struct Binder {
    start: FnType,
    top: Option<Arc<Link>>,
    caps: Capabilities,
}

impl Binder {
    pub fn from(start: FnType) -> Self {
        Binder {
            start,
            top: None,
            caps: Capabilities::default(),
        }
    }

    pub fn with_capabilities(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// The type callers of the finished callable see.
    pub fn start_type(&self) -> &FnType {
        &self.start
    }

    /// The type the endpoint must have.
    pub fn current_type(&self) -> &FnType {
        match &self.top {
            Some(link) => &link.ty,
            None => &self.start,
        }
    }

    /// Steps newest first, each with the type it produced.
    fn links(&self) -> impl Iterator<Item = &Link> {
        std::iter::successors(self.top.as_deref(), |link| link.prev.as_deref())
    }

    /// Validate `transform` against the current type and push it.
    pub fn add(&self, transform: Transform) -> Result<Binder, BindError> {
        let ty = transform.down(self.current_type())?;
        debug!(%transform, from = %self.current_type(), to = %ty, "push transform");
        Ok(Binder {
            start: self.start.clone(),
            top: Some(Arc::new(Link {
                transform,
                ty,
                prev: self.top.clone(),
            })),
            caps: self.caps,
        })
    }

    // -----------------------------------------------------------------------
    // Argument list
    // -----------------------------------------------------------------------

    /// Ignore `count` incoming arguments starting at `index`.
    pub fn drop(&self, index: usize, count: usize) -> Result<Binder, BindError> {
        let ty = self.current_type();
        if index.checked_add(count).map_or(true, |end| end > ty.param_count()) {
            return Err(BindError::PositionOutOfRange {
                op: "drop",
                position: index,
                count,
                arity: ty.param_count(),
            });
        }
        let types = ty.params()[index..index + count].to_vec();
        self.add(Transform::Drop {
            position: index,
            types,
        })
    }

    pub fn drop_first(&self, count: usize) -> Result<Binder, BindError> {
        self.drop(0, count)
    }

    pub fn drop_last(&self, count: usize) -> Result<Binder, BindError> {
        let arity = self.current_type().param_count();
        match arity.checked_sub(count) {
            Some(index) => self.drop(index, count),
            None => Err(BindError::PositionOutOfRange {
                op: "drop_last",
                position: 0,
                count,
                arity,
            }),
        }
    }

    pub fn drop_all(&self) -> Result<Binder, BindError> {
        self.drop(0, self.current_type().param_count())
    }

    /// Insert `values` at `index`, typed by their natural types.
    pub fn insert(&self, index: usize, values: Vec<Value>) -> Result<Binder, BindError> {
        let types = values.iter().map(Value::natural_type).collect();
        self.insert_typed(index, types, values)
    }

    pub fn insert_typed(
        &self,
        index: usize,
        types: Vec<Type>,
        values: Vec<Value>,
    ) -> Result<Binder, BindError> {
        self.add(Transform::Insert {
            position: index,
            types,
            values,
        })
    }

    pub fn append(&self, values: Vec<Value>) -> Result<Binder, BindError> {
        self.insert(self.current_type().param_count(), values)
    }

    pub fn prepend(&self, values: Vec<Value>) -> Result<Binder, BindError> {
        self.insert(0, values)
    }

    /// Target argument `i` receives incoming argument `reorder[i]`.
    pub fn permute(&self, reorder: &[usize]) -> Result<Binder, BindError> {
        self.add(Transform::Permute {
            source: self.current_type().clone(),
            reorder: reorder.to_vec(),
        })
    }

    // -----------------------------------------------------------------------
    // Conversions
    // -----------------------------------------------------------------------

    /// Widening/boxing conversion to `target`.
    pub fn convert(&self, target: FnType) -> Result<Binder, BindError> {
        self.add(Transform::Convert {
            source: self.current_type().clone(),
            target,
        })
    }

    /// Explicit (possibly narrowing) conversion to `target`.
    pub fn cast(&self, target: FnType) -> Result<Binder, BindError> {
        self.add(Transform::Cast {
            source: self.current_type().clone(),
            target,
        })
    }

    // -----------------------------------------------------------------------
    // Arrays
    // -----------------------------------------------------------------------

    /// Spread the trailing array argument into `types`.
    pub fn spread(&self, types: &[Type]) -> Result<Binder, BindError> {
        let array_type = self.current_type().last_param().cloned().unwrap_or(Type::Void);
        self.add(Transform::Spread {
            array_type,
            spread_types: types.to_vec(),
        })
    }

    /// Collect every argument from `index` on into `array_type`.
    pub fn collect(&self, index: usize, array_type: Type) -> Result<Binder, BindError> {
        let count = self.current_type().param_count().saturating_sub(index);
        self.collect_count(index, count, array_type)
    }

    pub fn collect_count(&self, index: usize, count: usize, array_type: Type) -> Result<Binder, BindError> {
        self.add(Transform::Collect {
            source: self.current_type().clone(),
            index,
            count,
            array_type,
            collector: None,
        })
    }

    /// Collect `count` arguments at `index` by calling `collector`.
    pub fn collect_with(&self, index: usize, count: usize, collector: Callable) -> Result<Binder, BindError> {
        self.add(Transform::Collect {
            source: self.current_type().clone(),
            index,
            count,
            array_type: collector.ty().ret().clone(),
            collector: Some(collector),
        })
    }

    /// Collect any number of arguments from `index` on into `array_type`.
    pub fn varargs(&self, index: usize, array_type: Type) -> Result<Binder, BindError> {
        self.add(Transform::Varargs {
            source: self.current_type().clone(),
            index,
            array_type,
        })
    }

    // -----------------------------------------------------------------------
    // Functions
    // -----------------------------------------------------------------------

    /// Prepend the result of `function` applied to the leading arguments.
    pub fn fold(&self, function: Callable) -> Result<Binder, BindError> {
        self.add(Transform::Fold {
            source: self.current_type().clone(),
            function,
        })
    }

    /// Run `function` on the leading arguments and discard its result.
    pub fn fold_void(&self, function: Callable) -> Result<Binder, BindError> {
        let function = if function.ty().ret().is_void() {
            function
        } else {
            let ty = function.ty().change_return(Type::Void);
            as_type(&function, &ty, ConversionKind::Assignment)?
        };
        self.fold(function)
    }

    pub fn filter(&self, index: usize, functions: &[Callable]) -> Result<Binder, BindError> {
        self.add(Transform::Filter {
            source: self.current_type().clone(),
            index,
            functions: functions.to_vec(),
        })
    }

    pub fn filter_return(&self, function: Callable) -> Result<Binder, BindError> {
        self.add(Transform::FilterReturn {
            source: self.current_type().clone(),
            function,
        })
    }

    /// Recover from failures of `throwable` with
    /// `function(failure, leading args...)`.
    pub fn catch_exception(&self, throwable: Type, function: Callable) -> Result<Binder, BindError> {
        self.add(Transform::Catch {
            source: self.current_type().clone(),
            throwable,
            function,
        })
    }

    /// Run `post(leading args...)` after every call, whether it returns or
    /// fails.
    pub fn try_finally(&self, post: Callable) -> Result<Binder, BindError> {
        self.add(Transform::TryFinally {
            source: self.current_type().clone(),
            post,
        })
    }

    /// Append `other`'s steps. `other` must start where `self` ends.
    pub fn to(&self, other: &Binder) -> Result<Binder, BindError> {
        if other.start_type() != self.current_type() {
            return Err(BindError::Splice {
                expected: self.current_type().clone(),
                found: other.start_type().clone(),
            });
        }
        let mut steps: Vec<&Transform> = other.links().map(|l| &l.transform).collect();
        steps.reverse();
        steps
            .into_iter()
            .try_fold(self.clone(), |binder, t| binder.add(t.clone()))
    }

    // -----------------------------------------------------------------------
    // Materialization
    // -----------------------------------------------------------------------

    /// Wrap `target` in every recorded step.
    ///
    /// `target` must have the current type, or convert to it under
    /// assignment rules.
    pub fn invoke(&self, target: &Callable) -> Result<Callable, BindError> {
        let current = self.current_type();
        let mut callable = if target.ty() == current {
            target.clone()
        } else {
            as_type(target, current, ConversionKind::Assignment).map_err(|_| {
                BindError::EndpointMismatch {
                    expected: current.clone(),
                    found: target.ty().clone(),
                }
            })?
        };
        debug!(
            start = %self.start,
            endpoint = %target.ty(),
            steps = self.links().count(),
            "materialize"
        );
        for link in self.links() {
            callable = link.transform.up(callable, &self.caps)?;
            trace!(step = link.transform.name(), ty = %callable.ty(), "up");
        }
        if callable.ty() != &self.start {
            warn!(
                found = %callable.ty(),
                expected = %self.start,
                "materialized type differs from start, casting"
            );
            callable = explicit_cast_arguments(&callable, &self.start)?;
        }
        Ok(callable)
    }

    /// Drop every argument and return `value`.
    pub fn constant(&self, value: Value) -> Result<Callable, BindError> {
        let ret = self.current_type().ret().clone();
        self.drop_all()?.invoke(&constant(&ret, value)?)
    }

    /// Return the single argument, which must have the return type.
    pub fn identity(&self) -> Result<Callable, BindError> {
        let ty = self.current_type();
        if ty.param_count() != 1 || ty.params()[0] != *ty.ret() {
            return Err(BindError::InvalidShape {
                op: "identity",
                detail: format!("{} is not (T)T", ty),
            });
        }
        self.invoke(&identity(ty.ret())?)
    }

    /// Do nothing. The current type must return void.
    pub fn nop(&self) -> Result<Callable, BindError> {
        let ty = self.current_type();
        if !ty.ret().is_void() {
            return Err(BindError::InvalidShape {
                op: "nop",
                detail: format!("{} does not return void", ty),
            });
        }
        self.invoke(&empty(ty)?)
    }

    /// Throw the single (throwable) argument.
    pub fn throw_exception(&self) -> Result<Callable, BindError> {
        let ty = self.current_type();
        if ty.param_count() != 1 {
            return Err(BindError::InvalidShape {
                op: "throw_exception",
                detail: format!("{} does not take exactly one throwable", ty),
            });
        }
        self.invoke(&throw_exception(ty.ret(), &ty.params()[0])?)
    }

    /// Invoke the leading `Callable` argument with the rest.
    pub fn invoker(&self) -> Result<Callable, BindError> {
        let ty = self.current_type();
        match ty.param(0) {
            Some(first) if *first == Type::callable() => {
                self.invoke(&exact_invoker(&ty.drop_params(0, 1))?)
            }
            _ => Err(BindError::InvalidShape {
                op: "invoker",
                detail: format!("{} does not start with a Callable", ty),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Lookup-based endpoints
    // -----------------------------------------------------------------------

    fn receiver(&self, op: &'static str) -> Result<(Type, FnType), BindError> {
        let ty = self.current_type();
        match ty.param(0) {
            Some(first) if first.class().is_some() => Ok((first.clone(), ty.drop_params(0, 1))),
            _ => Err(BindError::InvalidShape {
                op,
                detail: format!("{} has no receiver argument", ty),
            }),
        }
    }

    /// Call static method `class.name` of the current type.
    pub fn invoke_static(&self, lookup: &Lookup, class: &Type, name: &str) -> Result<Callable, LinkError> {
        let target = lookup.find_static(class, name, self.current_type())?;
        Ok(self.invoke(&target)?)
    }

    /// Call virtual method `name` on the first argument.
    pub fn invoke_virtual(&self, lookup: &Lookup, name: &str) -> Result<Callable, LinkError> {
        let (class, ty) = self.receiver("invoke_virtual")?;
        let target = lookup.find_virtual(&class, name, &ty)?;
        Ok(self.invoke(&target)?)
    }

    /// Call `class.name` on the first argument without dynamic dispatch.
    pub fn invoke_special(&self, lookup: &Lookup, class: &Type, name: &str) -> Result<Callable, LinkError> {
        let (_, ty) = self.receiver("invoke_special")?;
        let target = lookup.find_special(class, name, &ty)?;
        Ok(self.invoke(&target)?)
    }

    /// Construct the return type from the arguments.
    pub fn invoke_constructor(&self, lookup: &Lookup, class: &Type) -> Result<Callable, LinkError> {
        let ty = self.current_type();
        let target = lookup.find_constructor(class, ty.params())?;
        Ok(self.invoke(&target)?)
    }

    /// Read field `name` of the single receiver argument.
    pub fn get_field(&self, lookup: &Lookup, name: &str) -> Result<Callable, LinkError> {
        let (class, rest) = self.receiver("get_field")?;
        let target = lookup.find_getter(&class, name, rest.ret())?;
        Ok(self.invoke(&target)?)
    }

    /// Write the second argument to field `name` of the first.
    pub fn set_field(&self, lookup: &Lookup, name: &str) -> Result<Callable, LinkError> {
        let (class, rest) = self.receiver("set_field")?;
        let value_ty = rest.param(0).cloned().ok_or(BindError::InvalidShape {
            op: "set_field",
            detail: format!("{} has no value argument", self.current_type()),
        })?;
        let target = lookup.find_setter(&class, name, &value_ty)?;
        Ok(self.invoke(&target)?)
    }

    /// Read static field `class.name`.
    pub fn get_static(&self, lookup: &Lookup, class: &Type, name: &str) -> Result<Callable, LinkError> {
        let target = lookup.find_static_getter(class, name, self.current_type().ret())?;
        Ok(self.invoke(&target)?)
    }

    /// Write the single argument to static field `class.name`.
    pub fn set_static(&self, lookup: &Lookup, class: &Type, name: &str) -> Result<Callable, LinkError> {
        let ty = self.current_type();
        let value_ty = ty.param(0).cloned().ok_or(BindError::InvalidShape {
            op: "set_static",
            detail: format!("{} has no value argument", ty),
        })?;
        let target = lookup.find_static_setter(class, name, &value_ty)?;
        Ok(self.invoke(&target)?)
    }

    pub fn invoke_static_quiet(&self, lookup: &Lookup, class: &Type, name: &str) -> Result<Callable, BindError> {
        Ok(self.invoke_static(lookup, class, name)?)
    }

    pub fn invoke_virtual_quiet(&self, lookup: &Lookup, name: &str) -> Result<Callable, BindError> {
        Ok(self.invoke_virtual(lookup, name)?)
    }

    pub fn invoke_special_quiet(&self, lookup: &Lookup, class: &Type, name: &str) -> Result<Callable, BindError> {
        Ok(self.invoke_special(lookup, class, name)?)
    }

    pub fn invoke_constructor_quiet(&self, lookup: &Lookup, class: &Type) -> Result<Callable, BindError> {
        Ok(self.invoke_constructor(lookup, class)?)
    }

    pub fn get_field_quiet(&self, lookup: &Lookup, name: &str) -> Result<Callable, BindError> {
        Ok(self.get_field(lookup, name)?)
    }

    pub fn set_field_quiet(&self, lookup: &Lookup, name: &str) -> Result<Callable, BindError> {
        Ok(self.set_field(lookup, name)?)
    }

    pub fn get_static_quiet(&self, lookup: &Lookup, class: &Type, name: &str) -> Result<Callable, BindError> {
        Ok(self.get_static(lookup, class, name)?)
    }

    pub fn set_static_quiet(&self, lookup: &Lookup, class: &Type, name: &str) -> Result<Callable, BindError> {
        Ok(self.set_static(lookup, class, name)?)
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    /// One line per step, oldest first: the primitive operation and the
    /// type it leaves behind.
    pub fn trace(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .links()
            .map(|l| format!("{}  -> {}", l.transform, l.ty))
            .collect();
        lines.reverse();
        lines.insert(0, format!("start {}", self.start));
        lines
    }
}

impl fmt::Display for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.current_type())
    }
}
