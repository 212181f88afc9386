//! The closed set of adaptation steps a [`Binder`](crate::Binder) stacks.
//!
//! `down` projects the caller-side type onto the type the next step (or
//! the endpoint) must have; `up` turns a callable of that projected type
//! back into one of the caller-side type. Each variant records the
//! caller-side type it was pushed against when `up` needs it.

use std::fmt;

use rebind_types::{ConversionKind, FnType, Type};

use crate::binder::Binder;
use crate::callable::Callable;
use crate::capabilities::Capabilities;
use crate::combinators::{
    as_collector, as_spreader, as_type, as_varargs_collector, catch_exception, collect_arguments,
    drop_arguments, filter_arguments, filter_return_value, fold_arguments, insert_arguments,
    permute_arguments, throw_exception, try_finally,
};
use crate::error::BindError;
use crate::value::Value;

#[derive(Debug, Clone)]
pub enum Transform {
    /// Ignore `types.len()` incoming arguments at `position`.
    Drop { position: usize, types: Vec<Type> },
    /// Supply `values` as the target's arguments at `position`.
    Insert {
        position: usize,
        types: Vec<Type>,
        values: Vec<Value>,
    },
    /// Target argument `i` is incoming argument `reorder[i]`.
    Permute { source: FnType, reorder: Vec<usize> },
    /// Assignment conversion from `source` to `target`.
    Convert { source: FnType, target: FnType },
    /// Explicit conversion from `source` to `target`.
    Cast { source: FnType, target: FnType },
    /// Spread the trailing array argument into `spread_types`.
    Spread {
        array_type: Type,
        spread_types: Vec<Type>,
    },
    /// Gather `count` arguments at `index` into one `array_type` argument,
    /// or into whatever `collector` returns.
    Collect {
        source: FnType,
        index: usize,
        count: usize,
        array_type: Type,
        collector: Option<Callable>,
    },
    /// Gather every argument from `index` on into `array_type`.
    Varargs {
        source: FnType,
        index: usize,
        array_type: Type,
    },
    /// Prepend the result of `function` run on the leading arguments.
    Fold { source: FnType, function: Callable },
    /// Pass arguments from `index` on through the unary `functions`.
    Filter {
        source: FnType,
        index: usize,
        functions: Vec<Callable>,
    },
    /// Pass the result through `function`.
    FilterReturn { source: FnType, function: Callable },
    /// Recover from `throwable` failures with `function`.
    Catch {
        source: FnType,
        throwable: Type,
        function: Callable,
    },
    /// Run `post` after every call, on both paths.
    TryFinally { source: FnType, post: Callable },
}

fn range(op: &'static str, position: usize, count: usize, arity: usize) -> Result<(), BindError> {
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

fn convertible(
    op: &'static str,
    position: Option<usize>,
    from: &Type,
    to: &Type,
) -> Result<(), BindError> {
    let ok = match position {
        Some(_) => ConversionKind::Assignment.permits(from, to),
        None => ConversionKind::Assignment.permits_return(from, to),
    };
    if !ok {
        return Err(BindError::IncompatibleConversion {
            op,
            position,
            from: from.clone(),
            to: to.clone(),
        });
    }
    Ok(())
}

/// Leading arguments of `ty` must convert to each parameter of `params`.
fn leading(op: &'static str, ty: &FnType, params: &[Type]) -> Result<(), BindError> {
    if params.len() > ty.param_count() {
        return Err(BindError::ArityMismatch {
            op,
            expected: ty.param_count(),
            found: params.len(),
        });
    }
    for (i, (from, to)) in ty.params().iter().zip(params).enumerate() {
        convertible(op, Some(i), from, to)?;
    }
    Ok(())
}

impl Transform {
    /// The combinator-level name of this step.
    pub fn name(&self) -> &'static str {
        match self {
            Transform::Drop { .. } => "drop",
            Transform::Insert { .. } => "insert",
            Transform::Permute { .. } => "permute",
            Transform::Convert { .. } => "convert",
            Transform::Cast { .. } => "cast",
            Transform::Spread { .. } => "spread",
            Transform::Collect { .. } => "collect",
            Transform::Varargs { .. } => "varargs",
            Transform::Fold { .. } => "fold",
            Transform::Filter { .. } => "filter",
            Transform::FilterReturn { .. } => "filter_return",
            Transform::Catch { .. } => "catch",
            Transform::TryFinally { .. } => "try_finally",
        }
    }

    /// Project `ty` through this step, validating it.
    pub fn down(&self, ty: &FnType) -> Result<FnType, BindError> {
        let arity = ty.param_count();
        match self {
            Transform::Drop { position, types } => {
                range("drop", *position, types.len(), arity)?;
                if &ty.params()[*position..*position + types.len()] != types.as_slice() {
                    return Err(BindError::InvalidShape {
                        op: "drop",
                        detail: format!("dropped types do not match {}", ty),
                    });
                }
                Ok(ty.drop_params(*position, types.len()))
            }
            Transform::Insert {
                position,
                types,
                values,
            } => {
                range("insert", *position, 0, arity)?;
                if types.iter().any(Type::is_void) {
                    return Err(BindError::VoidParameter { op: "insert" });
                }
                if types.len() != values.len() {
                    return Err(BindError::ArityMismatch {
                        op: "insert",
                        expected: types.len(),
                        found: values.len(),
                    });
                }
                for (i, (value, t)) in values.iter().zip(types).enumerate() {
                    if !value.conforms_to(t) {
                        return Err(BindError::ValueMismatch {
                            op: "insert",
                            position: position + i,
                            value: value.to_string(),
                            ty: t.clone(),
                        });
                    }
                }
                Ok(ty.insert_params(*position, types))
            }
            Transform::Permute { reorder, .. } => {
                let mut params = Vec::with_capacity(reorder.len());
                for &i in reorder {
                    match ty.param(i) {
                        Some(t) => params.push(t.clone()),
                        None => {
                            return Err(BindError::IndexOutOfRange {
                                op: "permute",
                                index: i,
                                arity,
                            })
                        }
                    }
                }
                Ok(FnType::new(ty.ret().clone(), params))
            }
            Transform::Convert { target, .. } | Transform::Cast { target, .. } => {
                let (op, kind) = match self {
                    Transform::Convert { .. } => ("convert", ConversionKind::Assignment),
                    _ => ("cast", ConversionKind::Explicit),
                };
                if target.param_count() != arity {
                    return Err(BindError::ArityMismatch {
                        op,
                        expected: arity,
                        found: target.param_count(),
                    });
                }
                for (i, (from, to)) in ty.params().iter().zip(target.params()).enumerate() {
                    if !kind.permits(from, to) {
                        return Err(BindError::IncompatibleConversion {
                            op,
                            position: Some(i),
                            from: from.clone(),
                            to: to.clone(),
                        });
                    }
                }
                if !kind.permits_return(target.ret(), ty.ret()) {
                    return Err(BindError::IncompatibleConversion {
                        op,
                        position: None,
                        from: target.ret().clone(),
                        to: ty.ret().clone(),
                    });
                }
                Ok(target.clone())
            }
            Transform::Spread {
                array_type,
                spread_types,
            } => {
                let last = ty.last_param().ok_or(BindError::ArityMismatch {
                    op: "spread",
                    expected: 1,
                    found: 0,
                })?;
                let component = last.component().ok_or_else(|| BindError::NotAnArray {
                    op: "spread",
                    ty: last.clone(),
                })?;
                if last != array_type {
                    return Err(BindError::TypeMismatch {
                        op: "spread",
                        expected: last.clone(),
                        found: array_type.clone(),
                    });
                }
                for (i, t) in spread_types.iter().enumerate() {
                    if !ConversionKind::Checked.permits(component, t) {
                        return Err(BindError::IncompatibleConversion {
                            op: "spread",
                            position: Some(arity - 1 + i),
                            from: component.clone(),
                            to: t.clone(),
                        });
                    }
                }
                Ok(ty.drop_params(arity - 1, 1).append_params(spread_types))
            }
            Transform::Collect {
                index,
                count,
                array_type,
                collector,
                ..
            } => {
                range("collect", *index, *count, arity)?;
                let run = &ty.params()[*index..*index + count];
                match collector {
                    Some(c) => {
                        if c.ty().param_count() != *count {
                            return Err(BindError::ArityMismatch {
                                op: "collect",
                                expected: *count,
                                found: c.ty().param_count(),
                            });
                        }
                        for (i, (from, to)) in run.iter().zip(c.ty().params()).enumerate() {
                            convertible("collect", Some(index + i), from, to)?;
                        }
                        if c.ty().ret() != array_type {
                            return Err(BindError::TypeMismatch {
                                op: "collect",
                                expected: array_type.clone(),
                                found: c.ty().ret().clone(),
                            });
                        }
                    }
                    None => {
                        let component =
                            array_type.component().ok_or_else(|| BindError::NotAnArray {
                                op: "collect",
                                ty: array_type.clone(),
                            })?;
                        for (i, from) in run.iter().enumerate() {
                            convertible("collect", Some(index + i), from, component)?;
                        }
                    }
                }
                Ok(ty
                    .drop_params(*index, *count)
                    .insert_params(*index, &[array_type.clone()]))
            }
            Transform::Varargs {
                index, array_type, ..
            } => {
                range("varargs", *index, 0, arity)?;
                let component = array_type.component().ok_or_else(|| BindError::NotAnArray {
                    op: "varargs",
                    ty: array_type.clone(),
                })?;
                for (i, from) in ty.params()[*index..].iter().enumerate() {
                    // a lone trailing array of the right type passes through
                    if arity - index == 1 && from == array_type {
                        break;
                    }
                    convertible("varargs", Some(index + i), from, component)?;
                }
                Ok(ty
                    .drop_params(*index, arity - index)
                    .append_params(&[array_type.clone()]))
            }
            Transform::Fold { function, .. } => {
                leading("fold", ty, function.ty().params())?;
                let ret = function.ty().ret();
                if ret.is_void() {
                    Ok(ty.clone())
                } else {
                    Ok(ty.prepend_params(&[ret.clone()]))
                }
            }
            Transform::Filter {
                index, functions, ..
            } => {
                range("filter", *index, functions.len(), arity)?;
                let mut next = ty.clone();
                for (i, function) in functions.iter().enumerate() {
                    let fty = function.ty();
                    if fty.param_count() != 1 {
                        return Err(BindError::ArityMismatch {
                            op: "filter",
                            expected: 1,
                            found: fty.param_count(),
                        });
                    }
                    if fty.ret().is_void() {
                        return Err(BindError::VoidParameter { op: "filter" });
                    }
                    convertible("filter", Some(index + i), &ty.params()[index + i], &fty.params()[0])?;
                    next = next.change_param(index + i, fty.ret().clone());
                }
                Ok(next)
            }
            Transform::FilterReturn { function, .. } => {
                let fty = function.ty();
                if fty.param_count() > 1 {
                    return Err(BindError::ArityMismatch {
                        op: "filter_return",
                        expected: 1,
                        found: fty.param_count(),
                    });
                }
                convertible("filter_return", None, fty.ret(), ty.ret())?;
                Ok(ty.change_return(fty.param(0).cloned().unwrap_or(Type::Void)))
            }
            Transform::Catch {
                throwable,
                function,
                ..
            } => {
                if !throwable.is_throwable() {
                    return Err(BindError::NotThrowable {
                        op: "catch",
                        ty: throwable.clone(),
                    });
                }
                let fty = function.ty();
                let Some(first) = fty.param(0) else {
                    return Err(BindError::ArityMismatch {
                        op: "catch",
                        expected: 1,
                        found: 0,
                    });
                };
                convertible("catch", Some(0), throwable, first)?;
                leading("catch", ty, &fty.params()[1..])?;
                convertible("catch", None, fty.ret(), ty.ret())?;
                Ok(ty.clone())
            }
            Transform::TryFinally { post, .. } => {
                leading("try_finally", ty, post.ty().params())?;
                Ok(ty.clone())
            }
        }
    }

    /// Adapt `target` (of this step's projected type) back to the type the
    /// step was pushed against.
    pub fn up(&self, target: Callable, caps: &Capabilities) -> Result<Callable, BindError> {
        match self {
            Transform::Drop { position, types } => drop_arguments(&target, *position, types),
            Transform::Insert {
                position, values, ..
            } => insert_arguments(&target, *position, values),
            Transform::Permute { source, reorder } => permute_arguments(&target, source, reorder),
            Transform::Convert { source, .. } => {
                as_type(&target, source, ConversionKind::Assignment)
            }
            Transform::Cast { source, .. } => as_type(&target, source, ConversionKind::Explicit),
            Transform::Spread {
                array_type,
                spread_types,
            } => as_spreader(&target, array_type, spread_types.len()),
            Transform::Collect {
                source,
                index,
                count,
                array_type,
                collector,
            } => collect_up(target, source, *index, *count, array_type, collector.as_ref(), caps),
            Transform::Varargs { source, array_type, .. } => {
                let collector = as_varargs_collector(&target, array_type)?;
                as_type(&collector, source, ConversionKind::Assignment)
            }
            Transform::Fold { source, function } => {
                let k = function.ty().param_count();
                let shape = source.slice(0, k, function.ty().ret().clone());
                let combiner = as_type(function, &shape, ConversionKind::Assignment)?;
                fold_arguments(&target, &combiner)
            }
            Transform::Filter {
                source,
                index,
                functions,
            } => {
                let adapted = functions
                    .iter()
                    .enumerate()
                    .map(|(i, f)| {
                        let shape = FnType::new(
                            f.ty().ret().clone(),
                            vec![source.params()[index + i].clone()],
                        );
                        as_type(f, &shape, ConversionKind::Assignment)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                filter_arguments(&target, *index, &adapted)
            }
            Transform::FilterReturn { source, function } => {
                let filtered = filter_return_value(&target, function)?;
                as_type(&filtered, source, ConversionKind::Assignment)
            }
            Transform::Catch {
                source,
                throwable,
                function,
            } => {
                let k = function.ty().param_count() - 1;
                let shape = source
                    .slice(0, k, source.ret().clone())
                    .prepend_params(&[throwable.clone()]);
                let handler = as_type(function, &shape, ConversionKind::Assignment)?;
                catch_exception(&target, throwable, &handler)
            }
            Transform::TryFinally { source, post } => {
                let k = post.ty().param_count();
                let post = as_type(post, &source.slice(0, k, Type::Void), ConversionKind::Assignment)?;
                if caps.native_try_finally {
                    native_try_finally(&target, source, &post, caps)
                } else {
                    emulated_try_finally(&target, source, &post, caps)
                }
            }
        }
    }
}

/// Collect a run that may sit anywhere. The tail case gathers directly; any
/// other run is rotated to the tail first and rotated back afterwards.
fn collect_up(
    target: Callable,
    source: &FnType,
    index: usize,
    count: usize,
    array_type: &Type,
    collector: Option<&Callable>,
    caps: &Capabilities,
) -> Result<Callable, BindError> {
    let n = source.param_count();
    if index + count == n {
        let gathered = match collector {
            Some(c) => {
                let shape = FnType::new(array_type.clone(), source.params()[index..].to_vec());
                let c = as_type(c, &shape, ConversionKind::Assignment)?;
                collect_arguments(&target, index, &c)?
            }
            None => as_collector(&target, array_type, count)?,
        };
        return as_type(&gathered, source, ConversionKind::Assignment);
    }

    // incoming order with the run moved to the end
    let move_to_tail: Vec<usize> = (0..index).chain(index + count..n).chain(index..index + count).collect();
    // collected order with the array moved back to `index`
    let m = n - count + 1;
    let mut move_back: Vec<usize> = (0..m).collect();
    move_back[index] = m - 1;
    for i in index..m - 1 {
        move_back[i + 1] = i;
    }

    let tail = m - 1;
    let binder = Binder::from(source.clone())
        .with_capabilities(*caps)
        .permute(&move_to_tail)?;
    let binder = match collector {
        Some(c) => binder.collect_with(tail, count, c.clone())?,
        None => binder.collect_count(tail, count, array_type.clone())?,
    };
    binder.permute(&move_back)?.invoke(&target)
}

/// Cleanup `(Throwable, [V], A...) -> V` that runs `post` and hands back
/// the original result.
fn native_try_finally(
    target: &Callable,
    source: &FnType,
    post: &Callable,
    caps: &Capabilities,
) -> Result<Callable, BindError> {
    let ret = source.ret().clone();
    let n = source.param_count();
    let cleanup = if ret.is_void() {
        let ty = source.prepend_params(&[Type::throwable()]);
        Binder::from(ty)
            .with_capabilities(*caps)
            .fold_void(drop_arguments(post, 0, &[Type::throwable()])?)?
            .drop_all()?
            .nop()?
    } else {
        let ty = source.prepend_params(&[Type::throwable(), ret.clone()]);
        Binder::from(ty)
            .with_capabilities(*caps)
            .fold_void(drop_arguments(post, 0, &[Type::throwable(), ret.clone()])?)?
            .drop(0, 1)?
            .drop(1, n)?
            .identity()?
    };
    try_finally(target, &cleanup)
}

/// Try/finally from `catch_exception` and `fold_arguments` alone: failures
/// run `post` inside the handler before rethrowing, successes run it
/// after the guarded call returns.
fn emulated_try_finally(
    target: &Callable,
    source: &FnType,
    post: &Callable,
    caps: &Capabilities,
) -> Result<Callable, BindError> {
    let ret = source.ret().clone();
    let n = source.param_count();

    let rethrow = Binder::from(source.prepend_params(&[Type::throwable()]))
        .with_capabilities(*caps)
        .fold_void(drop_arguments(post, 0, &[Type::throwable()])?)?
        .drop(1, n)?
        .invoke(&throw_exception(&ret, &Type::throwable())?)?;
    let guarded = catch_exception(target, &Type::throwable(), &rethrow)?;

    let after = if ret.is_void() {
        let k = post.ty().param_count();
        drop_arguments(post, k, &source.params()[k..])?
    } else {
        Binder::from(source.prepend_params(&[ret.clone()]))
            .with_capabilities(*caps)
            .fold_void(drop_arguments(post, 0, &[ret.clone()])?)?
            .drop(1, n)?
            .identity()?
    };
    fold_arguments(&after, &guarded)
}

fn list<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Drop { position, types } => {
                write!(f, "drop_arguments(target, {}, [{}])", position, list(types))
            }
            Transform::Insert {
                position, values, ..
            } => write!(f, "insert_arguments(target, {}, [{}])", position, list(values)),
            Transform::Permute { source, reorder } => {
                write!(f, "permute_arguments(target, {}, {:?})", source, reorder)
            }
            Transform::Convert { source, .. } => {
                write!(f, "as_type(target, {}, assignment)", source)
            }
            Transform::Cast { source, .. } => write!(f, "explicit_cast_arguments(target, {})", source),
            Transform::Spread {
                array_type,
                spread_types,
            } => write!(f, "as_spreader(target, {}, {})", array_type, spread_types.len()),
            Transform::Collect {
                index,
                count,
                array_type,
                collector: Some(c),
                ..
            } => write!(
                f,
                "collect_arguments(target, {}, {}) /* {} args into {} */",
                index, c, count, array_type
            ),
            Transform::Collect {
                index,
                count,
                array_type,
                collector: None,
                ..
            } => write!(f, "as_collector(target, {}, {}) /* at {} */", array_type, count, index),
            Transform::Varargs {
                index, array_type, ..
            } => write!(f, "as_varargs_collector(target, {}) /* from {} */", array_type, index),
            Transform::Fold { function, .. } => write!(f, "fold_arguments(target, {})", function),
            Transform::Filter {
                index, functions, ..
            } => write!(f, "filter_arguments(target, {}, [{}])", index, list(functions)),
            Transform::FilterReturn { function, .. } => {
                write!(f, "filter_return_value(target, {})", function)
            }
            Transform::Catch {
                throwable,
                function,
                ..
            } => write!(f, "catch_exception(target, {}, {})", throwable, function),
            Transform::TryFinally { post, .. } => write!(f, "try_finally(target, {})", post),
        }
    }
}
