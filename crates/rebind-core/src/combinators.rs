//! Primitive adapters every transform is materialized from.
//!
//! Each combinator validates its inputs eagerly and returns a new
//! [`Callable`] wrapping the given ones; adapted callables keep the
//! target's name so diagnostics still point at the endpoint.

use rebind_types::{ConversionKind, FnType, Type};

use crate::callable::{Callable, Invocation};
use crate::convert::{convert_value, default_value};
use crate::error::BindError;
use crate::value::{ArrayValue, Thrown, Value};

type BindResult = Result<Callable, BindError>;

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn check_range(op: &'static str, position: usize, count: usize, arity: usize) -> Result<(), BindError> {
    if position.checked_add(count).map_or(true, |end| end > arity) {
        return Err(BindError::PositionOutOfRange {
            op,
            position,
            count,
            arity,
        });
    }
    Ok(())
}

fn check_no_void(op: &'static str, types: &[Type]) -> Result<(), BindError> {
    if types.iter().any(Type::is_void) {
        return Err(BindError::VoidParameter { op });
    }
    Ok(())
}

fn check_same(op: &'static str, expected: &Type, found: &Type) -> Result<(), BindError> {
    if expected != found {
        return Err(BindError::TypeMismatch {
            op,
            expected: expected.clone(),
            found: found.clone(),
        });
    }
    Ok(())
}

/// `prefix` must be a leading run of `params`, type for type.
fn check_prefix(op: &'static str, prefix: &[Type], params: &[Type]) -> Result<(), BindError> {
    if prefix.len() > params.len() {
        return Err(BindError::ArityMismatch {
            op,
            expected: params.len(),
            found: prefix.len(),
        });
    }
    for (p, q) in prefix.iter().zip(params) {
        check_same(op, q, p)?;
    }
    Ok(())
}

fn array_component<'a>(op: &'static str, ty: &'a Type) -> Result<&'a Type, BindError> {
    ty.component().ok_or_else(|| BindError::NotAnArray {
        op,
        ty: ty.clone(),
    })
}

fn adapt<F>(target: &Callable, ty: FnType, body: F) -> Callable
where
    F: Fn(Vec<Value>) -> Invocation + Send + Sync + 'static,
{
    Callable::new(target.name(), ty, body)
}

// ---------------------------------------------------------------------------
// Argument list adapters
// ---------------------------------------------------------------------------

/// Accept extra arguments of `types` at `position` and ignore them.
pub fn drop_arguments(target: &Callable, position: usize, types: &[Type]) -> BindResult {
    let arity = target.ty().param_count();
    check_range("drop_arguments", position, 0, arity)?;
    check_no_void("drop_arguments", types)?;
    if types.is_empty() {
        return Ok(target.clone());
    }
    let count = types.len();
    let next = target.clone();
    Ok(adapt(
        target,
        target.ty().insert_params(position, types),
        move |mut args| {
            args.drain(position..position + count);
            next.invoke(args)
        },
    ))
}

/// Bind `values` into the parameters starting at `position`.
pub fn insert_arguments(target: &Callable, position: usize, values: &[Value]) -> BindResult {
    let ty = target.ty();
    check_range("insert_arguments", position, values.len(), ty.param_count())?;
    for (i, value) in values.iter().enumerate() {
        let param = &ty.params()[position + i];
        if !value.conforms_to(param) {
            return Err(BindError::ValueMismatch {
                op: "insert_arguments",
                position: position + i,
                value: value.to_string(),
                ty: param.clone(),
            });
        }
    }
    if values.is_empty() {
        return Ok(target.clone());
    }
    let bound = values.to_vec();
    let next = target.clone();
    Ok(adapt(
        target,
        ty.drop_params(position, values.len()),
        move |mut args| {
            args.splice(position..position, bound.iter().cloned());
            next.invoke(args)
        },
    ))
}

/// Build a callable of `new_type` whose argument `reorder[i]` is passed as
/// the target's argument `i`. Indices may repeat or be omitted.
pub fn permute_arguments(target: &Callable, new_type: &FnType, reorder: &[usize]) -> BindResult {
    let ty = target.ty();
    if reorder.len() != ty.param_count() {
        return Err(BindError::ArityMismatch {
            op: "permute_arguments",
            expected: ty.param_count(),
            found: reorder.len(),
        });
    }
    check_same("permute_arguments", ty.ret(), new_type.ret())?;
    for (i, &from) in reorder.iter().enumerate() {
        let Some(incoming) = new_type.param(from) else {
            return Err(BindError::IndexOutOfRange {
                op: "permute_arguments",
                index: from,
                arity: new_type.param_count(),
            });
        };
        check_same("permute_arguments", &ty.params()[i], incoming)?;
    }
    let reorder = reorder.to_vec();
    let next = target.clone();
    Ok(adapt(target, new_type.clone(), move |args| {
        next.invoke(reorder.iter().map(|&i| args[i].clone()).collect())
    }))
}

// ---------------------------------------------------------------------------
// Type conversions
// ---------------------------------------------------------------------------

/// Adapt `target` to `new_type`, converting every argument and the result
/// under `kind`.
///
/// A varargs target whose trailing array cannot take the last incoming
/// argument as is collects the trailing arguments first.
pub fn as_type(target: &Callable, new_type: &FnType, kind: ConversionKind) -> BindResult {
    let ty = target.ty();
    if ty == new_type {
        return Ok(target.clone());
    }
    if target.is_varargs() && needs_collection(ty, new_type, kind) {
        let fixed = ty.param_count() - 1;
        if new_type.param_count() < fixed {
            return Err(BindError::ArityMismatch {
                op: "as_type",
                expected: fixed,
                found: new_type.param_count(),
            });
        }
        let array = ty.params()[fixed].clone();
        let plain = target.with_varargs(false);
        let collected = as_collector(&plain, &array, new_type.param_count() - fixed)?;
        return as_type(&collected, new_type, kind);
    }
    if ty.param_count() != new_type.param_count() {
        return Err(BindError::ArityMismatch {
            op: "as_type",
            expected: ty.param_count(),
            found: new_type.param_count(),
        });
    }
    for (i, (from, to)) in new_type.params().iter().zip(ty.params()).enumerate() {
        if !kind.permits(from, to) {
            return Err(BindError::IncompatibleConversion {
                op: "as_type",
                position: Some(i),
                from: from.clone(),
                to: to.clone(),
            });
        }
    }
    if !kind.permits_return(ty.ret(), new_type.ret()) {
        return Err(BindError::IncompatibleConversion {
            op: "as_type",
            position: None,
            from: ty.ret().clone(),
            to: new_type.ret().clone(),
        });
    }

    let params = ty.params().to_vec();
    let ret = new_type.ret().clone();
    let next = target.clone();
    Ok(adapt(target, new_type.clone(), move |args| {
        let converted = args
            .into_iter()
            .zip(&params)
            .map(|(arg, param)| convert_value(arg, param, kind))
            .collect::<Result<Vec<_>, _>>()?;
        let result = next.invoke(converted)?;
        convert_value(result, &ret, kind)
    }))
}

fn needs_collection(ty: &FnType, new_type: &FnType, kind: ConversionKind) -> bool {
    if ty.param_count() != new_type.param_count() {
        return true;
    }
    match (ty.last_param(), new_type.last_param()) {
        (Some(array), Some(last)) => !kind.permits(last, array),
        _ => false,
    }
}

/// `as_type` under explicit (possibly narrowing) conversion.
pub fn explicit_cast_arguments(target: &Callable, new_type: &FnType) -> BindResult {
    as_type(target, new_type, ConversionKind::Explicit)
}

// ---------------------------------------------------------------------------
// Arrays
// ---------------------------------------------------------------------------

/// Replace the trailing `count` parameters with one parameter of
/// `array_type`, whose elements are spread back out per call.
pub fn as_spreader(target: &Callable, array_type: &Type, count: usize) -> BindResult {
    let ty = target.ty();
    let component = array_component("as_spreader", array_type)?.clone();
    let arity = ty.param_count();
    if count > arity {
        return Err(BindError::PositionOutOfRange {
            op: "as_spreader",
            position: 0,
            count,
            arity,
        });
    }
    let start = arity - count;
    let spread = ty.params()[start..].to_vec();
    for (i, param) in spread.iter().enumerate() {
        if !ConversionKind::Checked.permits(&component, param) {
            return Err(BindError::IncompatibleConversion {
                op: "as_spreader",
                position: Some(start + i),
                from: component.clone(),
                to: param.clone(),
            });
        }
    }

    let next = target.clone();
    let new_type = ty.drop_params(start, count).append_params(&[array_type.clone()]);
    Ok(adapt(target, new_type, move |mut args| {
        let array = args.pop().unwrap_or(Value::Null);
        let items = match &array {
            Value::Array(a) => a.items().to_vec(),
            Value::Null if count == 0 => Vec::new(),
            Value::Null => return Err(Thrown::null_pointer("cannot spread a null array")),
            other => return Err(Thrown::class_cast(format!("{} is not an array", other))),
        };
        if items.len() != count {
            return Err(Thrown::illegal_argument(format!(
                "array is not of length {}",
                count
            )));
        }
        for (item, param) in items.into_iter().zip(&spread) {
            args.push(convert_value(item, param, ConversionKind::Checked)?);
        }
        next.invoke(args)
    }))
}

/// Replace the trailing array parameter with `count` parameters of the
/// component type of `array_type`, gathered into an array per call.
pub fn as_collector(target: &Callable, array_type: &Type, count: usize) -> BindResult {
    let ty = target.ty();
    let component = array_component("as_collector", array_type)?.clone();
    let Some(last) = ty.last_param() else {
        return Err(BindError::ArityMismatch {
            op: "as_collector",
            expected: 1,
            found: 0,
        });
    };
    if !last.is_assignable_from(array_type) {
        return Err(BindError::TypeMismatch {
            op: "as_collector",
            expected: last.clone(),
            found: array_type.clone(),
        });
    }
    let start = ty.param_count() - 1;
    let new_type = ty
        .drop_params(start, 1)
        .append_params(&vec![component.clone(); count]);
    let next = target.clone();
    Ok(adapt(target, new_type, move |mut args| {
        let items = args.split_off(start);
        args.push(Value::Array(ArrayValue::new(component.clone(), items)));
        next.invoke(args)
    }))
}

/// Mark `target` as collecting any number of trailing arguments into its
/// final `array_type` parameter when adapted with [`as_type`].
pub fn as_varargs_collector(target: &Callable, array_type: &Type) -> BindResult {
    array_component("as_varargs_collector", array_type)?;
    let Some(last) = target.ty().last_param() else {
        return Err(BindError::ArityMismatch {
            op: "as_varargs_collector",
            expected: 1,
            found: 0,
        });
    };
    if !last.is_assignable_from(array_type) {
        return Err(BindError::TypeMismatch {
            op: "as_varargs_collector",
            expected: last.clone(),
            found: array_type.clone(),
        });
    }
    Ok(target.with_varargs(true))
}

// ---------------------------------------------------------------------------
// Function-driven adapters
// ---------------------------------------------------------------------------

/// Pre-process the arguments at `position` with `collector`. The
/// collector's result (unless void) becomes the target's argument at
/// `position`.
pub fn collect_arguments(target: &Callable, position: usize, collector: &Callable) -> BindResult {
    let ty = target.ty();
    let produces = !collector.ty().ret().is_void();
    check_range("collect_arguments", position, usize::from(produces), ty.param_count())?;
    let mut new_type = ty.clone();
    if produces {
        check_same("collect_arguments", &ty.params()[position], collector.ty().ret())?;
        new_type = new_type.drop_params(position, 1);
    }
    let new_type = new_type.insert_params(position, collector.ty().params());

    let width = collector.ty().param_count();
    let next = target.clone();
    let collector = collector.clone();
    Ok(adapt(target, new_type, move |mut args| {
        let run: Vec<Value> = args.drain(position..position + width).collect();
        let result = collector.invoke(run)?;
        if produces {
            args.insert(position, result);
        }
        next.invoke(args)
    }))
}

/// Run `combiner` on the leading arguments and pass its result (unless
/// void) as an extra first argument to `target`.
pub fn fold_arguments(target: &Callable, combiner: &Callable) -> BindResult {
    let ty = target.ty();
    let produces = !combiner.ty().ret().is_void();
    let mut new_type = ty.clone();
    if produces {
        check_range("fold_arguments", 0, 1, ty.param_count())?;
        check_same("fold_arguments", &ty.params()[0], combiner.ty().ret())?;
        new_type = new_type.drop_params(0, 1);
    }
    check_prefix("fold_arguments", combiner.ty().params(), new_type.params())?;

    let width = combiner.ty().param_count();
    let next = target.clone();
    let combiner = combiner.clone();
    Ok(adapt(target, new_type, move |mut args| {
        let result = combiner.invoke(args[..width].to_vec())?;
        if produces {
            args.insert(0, result);
        }
        next.invoke(args)
    }))
}

/// Replace arguments `position..position + filters.len()` with the result
/// of the matching unary filter.
pub fn filter_arguments(target: &Callable, position: usize, filters: &[Callable]) -> BindResult {
    let ty = target.ty();
    check_range("filter_arguments", position, filters.len(), ty.param_count())?;
    let mut new_type = ty.clone();
    for (i, filter) in filters.iter().enumerate() {
        let fty = filter.ty();
        if fty.param_count() != 1 {
            return Err(BindError::ArityMismatch {
                op: "filter_arguments",
                expected: 1,
                found: fty.param_count(),
            });
        }
        check_same("filter_arguments", &ty.params()[position + i], fty.ret())?;
        new_type = new_type.change_param(position + i, fty.params()[0].clone());
    }
    if filters.is_empty() {
        return Ok(target.clone());
    }

    let filters = filters.to_vec();
    let next = target.clone();
    Ok(adapt(target, new_type, move |mut args| {
        for (i, filter) in filters.iter().enumerate() {
            let arg = std::mem::replace(&mut args[position + i], Value::Null);
            args[position + i] = filter.invoke(vec![arg])?;
        }
        next.invoke(args)
    }))
}

/// Pipe the target's result through `filter`. A void target feeds a
/// zero-parameter filter.
pub fn filter_return_value(target: &Callable, filter: &Callable) -> BindResult {
    let ret = target.ty().ret().clone();
    let fty = filter.ty();
    let expected = if ret.is_void() { 0 } else { 1 };
    if fty.param_count() != expected {
        return Err(BindError::ArityMismatch {
            op: "filter_return_value",
            expected,
            found: fty.param_count(),
        });
    }
    if expected == 1 {
        check_same("filter_return_value", &ret, &fty.params()[0])?;
    }

    let next = target.clone();
    let filter = filter.clone();
    let new_type = target.ty().change_return(fty.ret().clone());
    Ok(adapt(target, new_type, move |args| {
        let result = next.invoke(args)?;
        if ret.is_void() {
            filter.invoke(Vec::new())
        } else {
            filter.invoke(vec![result])
        }
    }))
}

// ---------------------------------------------------------------------------
// Failure handling
// ---------------------------------------------------------------------------

fn check_throwable(op: &'static str, ty: &Type) -> Result<(), BindError> {
    if !ty.is_throwable() {
        return Err(BindError::NotThrowable { op, ty: ty.clone() });
    }
    Ok(())
}

/// Recover from failures of type `ex_type` by calling
/// `handler(failure, leading args...)`.
pub fn catch_exception(target: &Callable, ex_type: &Type, handler: &Callable) -> BindResult {
    check_throwable("catch_exception", ex_type)?;
    let ty = target.ty();
    let hty = handler.ty();
    let Some(first) = hty.param(0) else {
        return Err(BindError::ArityMismatch {
            op: "catch_exception",
            expected: 1,
            found: 0,
        });
    };
    check_same("catch_exception", ex_type, first)?;
    check_prefix("catch_exception", &hty.params()[1..], ty.params())?;
    check_same("catch_exception", ty.ret(), hty.ret())?;

    let width = hty.param_count() - 1;
    let ex_type = ex_type.clone();
    let next = target.clone();
    let handler = handler.clone();
    Ok(adapt(target, ty.clone(), move |args| {
        let prefix = args[..width].to_vec();
        match next.invoke(args) {
            Err(thrown) if thrown.is_instance_of(&ex_type) => {
                let mut handler_args = Vec::with_capacity(width + 1);
                handler_args.push(thrown.value());
                handler_args.extend(prefix);
                handler.invoke(handler_args)
            }
            other => other,
        }
    }))
}

/// Run `cleanup(failure-or-null, [result], leading args...)` after every
/// call of `target`.
///
/// On success the cleanup's result is the call's result. On failure the
/// original failure is rethrown once cleanup returns; a failure raised by
/// cleanup itself replaces it.
pub fn try_finally(target: &Callable, cleanup: &Callable) -> BindResult {
    let ty = target.ty();
    let cty = cleanup.ty();
    let ret = ty.ret().clone();
    let mut leading = vec![Type::throwable()];
    if !ret.is_void() {
        leading.push(ret.clone());
    }
    if cty.param_count() < leading.len() {
        return Err(BindError::ArityMismatch {
            op: "try_finally",
            expected: leading.len(),
            found: cty.param_count(),
        });
    }
    check_prefix("try_finally", &leading, cty.params())?;
    check_prefix("try_finally", &cty.params()[leading.len()..], ty.params())?;
    check_same("try_finally", &ret, cty.ret())?;

    let width = cty.param_count() - leading.len();
    let next = target.clone();
    let cleanup = cleanup.clone();
    Ok(adapt(target, ty.clone(), move |args| {
        let prefix = args[..width].to_vec();
        let outcome = next.invoke(args);
        let mut cleanup_args = Vec::with_capacity(width + 2);
        match &outcome {
            Ok(_) => cleanup_args.push(Value::Null),
            Err(thrown) => cleanup_args.push(thrown.value()),
        }
        if !ret.is_void() {
            cleanup_args.push(match &outcome {
                Ok(value) => value.clone(),
                Err(_) => default_value(&ret),
            });
        }
        cleanup_args.extend(prefix);
        let cleaned = cleanup.invoke(cleanup_args);
        match outcome {
            Ok(_) => cleaned,
            Err(thrown) => {
                cleaned?;
                Err(thrown)
            }
        }
    }))
}

/// Call `target` when `test` (run on the leading arguments) is true,
/// `fallback` otherwise.
pub fn guard_with_test(test: &Callable, target: &Callable, fallback: &Callable) -> BindResult {
    let ty = target.ty();
    if ty != fallback.ty() {
        return Err(BindError::EndpointMismatch {
            expected: ty.clone(),
            found: fallback.ty().clone(),
        });
    }
    check_same("guard_with_test", &Type::boolean(), test.ty().ret())?;
    check_prefix("guard_with_test", test.ty().params(), ty.params())?;

    let width = test.ty().param_count();
    let test = test.clone();
    let then = target.clone();
    let otherwise = fallback.clone();
    Ok(adapt(target, ty.clone(), move |args| {
        match test.invoke(args[..width].to_vec())? {
            Value::Bool(true) => then.invoke(args),
            _ => otherwise.invoke(args),
        }
    }))
}

// ---------------------------------------------------------------------------
// Synthesized endpoints
// ---------------------------------------------------------------------------

/// `() -> value`.
pub fn constant(ty: &Type, value: Value) -> BindResult {
    check_no_void("constant", std::slice::from_ref(ty))?;
    if !value.conforms_to(ty) {
        return Err(BindError::ValueMismatch {
            op: "constant",
            position: 0,
            value: value.to_string(),
            ty: ty.clone(),
        });
    }
    Ok(Callable::new(
        "constant",
        FnType::returning(ty.clone()),
        move |_| Ok(value.clone()),
    ))
}

/// `(ty) -> ty`, returning its argument.
pub fn identity(ty: &Type) -> BindResult {
    check_no_void("identity", std::slice::from_ref(ty))?;
    Ok(Callable::new(
        "identity",
        FnType::new(ty.clone(), vec![ty.clone()]),
        |mut args| Ok(args.pop().unwrap_or(Value::Unit)),
    ))
}

/// Ignores its arguments and returns the default of the return type.
pub fn empty(ty: &FnType) -> BindResult {
    check_no_void("empty", ty.params())?;
    let ret = ty.ret().clone();
    Ok(Callable::new("empty", ty.clone(), move |_| Ok(default_value(&ret))))
}

/// `(ex_type) -> ret` that throws its argument.
pub fn throw_exception(ret: &Type, ex_type: &Type) -> BindResult {
    check_throwable("throw_exception", ex_type)?;
    Ok(Callable::new(
        "throw",
        FnType::new(ret.clone(), vec![ex_type.clone()]),
        |args| match args.into_iter().next() {
            Some(Value::Object(object)) => Err(Thrown::from_object(object)),
            _ => Err(Thrown::null_pointer("cannot throw null")),
        },
    ))
}

/// `(Callable, params...) -> ret` invoking its first argument, which must
/// have exactly the type `ty`.
pub fn exact_invoker(ty: &FnType) -> BindResult {
    check_no_void("exact_invoker", ty.params())?;
    let expected = ty.clone();
    Ok(Callable::new(
        "invoker",
        ty.prepend_params(&[Type::callable()]),
        move |mut args| {
            let rest = args.split_off(1);
            match args.pop() {
                Some(Value::Callable(c)) if c.ty() == &expected => c.invoke(rest),
                Some(Value::Callable(c)) => Err(Thrown::wrong_method_type(format!(
                    "expected {}, found {}",
                    expected,
                    c.ty()
                ))),
                _ => Err(Thrown::null_pointer("cannot invoke null")),
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebind_types::PrimType;

    fn concat() -> Callable {
        Callable::new(
            "concat",
            FnType::new(Type::string(), vec![Type::string(), Type::string()]),
            |args| match (&args[0], &args[1]) {
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
                _ => Err(Thrown::null_pointer("concat")),
            },
        )
    }

    fn s(v: &str) -> Value {
        Value::from(v)
    }

    #[test]
    fn drop_then_insert() {
        let f = drop_arguments(&concat(), 1, &[Type::int()]).unwrap();
        assert_eq!(f.ty().to_string(), "(String, int, String)String");
        assert_eq!(f.invoke(vec![s("a"), Value::Int(1), s("b")]), Ok(s("ab")));

        let g = insert_arguments(&concat(), 0, &[s(">")]).unwrap();
        assert_eq!(g.invoke(vec![s("x")]), Ok(s(">x")));

        let err = insert_arguments(&concat(), 0, &[Value::Int(1)]).unwrap_err();
        assert!(matches!(err, BindError::ValueMismatch { position: 0, .. }));
    }

    #[test]
    fn permute_duplicates() {
        let ty = FnType::new(Type::string(), vec![Type::string()]);
        let f = permute_arguments(&concat(), &ty, &[0, 0]).unwrap();
        assert_eq!(f.invoke(vec![s("ab")]), Ok(s("abab")));
        assert!(permute_arguments(&concat(), &ty, &[0, 1]).is_err());
    }

    #[test]
    fn as_type_widens_and_rejects_narrowing() {
        let id = identity(&Type::long()).unwrap();
        let wide = as_type(&id, &FnType::new(Type::long(), vec![Type::int()]), ConversionKind::Assignment)
            .unwrap();
        assert_eq!(wide.invoke(vec![Value::Int(4)]), Ok(Value::Long(4)));

        let narrow = FnType::new(Type::int(), vec![Type::long()]);
        assert!(as_type(&id, &narrow, ConversionKind::Assignment).is_err());
        let cast = explicit_cast_arguments(&id, &narrow).unwrap();
        assert_eq!(cast.invoke(vec![Value::Long(1 << 32 | 5)]), Ok(Value::Int(5)));
    }

    #[test]
    fn spreader_checks_length() {
        let f = as_spreader(&concat(), &Type::string().array(), 2).unwrap();
        let arr = |items: Vec<Value>| Value::Array(ArrayValue::new(Type::string(), items));
        assert_eq!(f.invoke(vec![arr(vec![s("a"), s("b")])]), Ok(s("ab")));
        let err = f.invoke(vec![arr(vec![s("a")])]).unwrap_err();
        assert_eq!(err.class().name(), "IllegalArgumentException");
    }

    #[test]
    fn varargs_collects_through_as_type() {
        let count = Callable::new(
            "count",
            FnType::new(Type::int(), vec![Type::int().array()]),
            |args| Ok(Value::Int(args[0].as_array().map_or(0, |a| a.len() as i32))),
        );
        let va = as_varargs_collector(&count, &Type::int().array()).unwrap();
        let three = FnType::new(Type::int(), vec![Type::int(); 3]);
        let f = as_type(&va, &three, ConversionKind::Assignment).unwrap();
        assert_eq!(f.invoke(vec![Value::Int(1), Value::Int(2), Value::Int(3)]), Ok(Value::Int(3)));
    }

    #[test]
    fn catch_and_finally() {
        let boom = Callable::new(
            "boom",
            FnType::new(Type::string(), vec![Type::string()]),
            |_| Err(Thrown::illegal_argument("boom")),
        );
        let handler = Callable::new(
            "recover",
            FnType::new(Type::string(), vec![Type::runtime_exception(), Type::string()]),
            |args| Ok(Value::Str(format!("recovered {}", args[1]))),
        );
        let f = catch_exception(&boom, &Type::runtime_exception(), &handler).unwrap();
        assert_eq!(f.invoke(vec![s("x")]), Ok(s("recovered \"x\"")));

        let cleanup = Callable::new(
            "cleanup",
            FnType::new(Type::string(), vec![Type::throwable(), Type::string()]),
            |args| Ok(args[1].clone()),
        );
        let g = try_finally(&boom, &cleanup).unwrap();
        let err = g.invoke(vec![s("x")]).unwrap_err();
        assert_eq!(err.message(), Some("boom"));
    }

    #[test]
    fn endpoints() {
        let c = constant(&Type::boxed(PrimType::Int), Value::Int(3)).unwrap();
        assert_eq!(c.invoke(vec![]), Ok(Value::Int(3)));
        assert!(constant(&Type::string(), Value::Int(3)).is_err());

        let nop = empty(&FnType::new(Type::int(), vec![Type::string()])).unwrap();
        assert_eq!(nop.invoke(vec![s("x")]), Ok(Value::Int(0)));

        let inv = exact_invoker(concat().ty()).unwrap();
        assert_eq!(
            inv.invoke(vec![Value::Callable(concat()), s("a"), s("b")]),
            Ok(s("ab"))
        );
        assert!(throw_exception(&Type::int(), &Type::string()).is_err());
    }
}
