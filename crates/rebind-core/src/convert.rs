//! Run-time half of the conversion rules: turning one value into the
//! representation a parameter or return slot expects.

use rebind_types::{ConversionKind, PrimType, Type};

use crate::callable::Invocation;
use crate::value::{Thrown, Value};

/// Zero, `false` or `null`, as synthesized for a missing result.
pub fn default_value(ty: &Type) -> Value {
    match ty {
        Type::Void => Value::Unit,
        Type::Prim(p) => match p {
            PrimType::Boolean => Value::Bool(false),
            PrimType::Byte => Value::Byte(0),
            PrimType::Short => Value::Short(0),
            PrimType::Char => Value::Char(0),
            PrimType::Int => Value::Int(0),
            PrimType::Long => Value::Long(0),
            PrimType::Float => Value::Float(0.0),
            PrimType::Double => Value::Double(0.0),
        },
        Type::Array(_) | Type::Ref(_) => Value::Null,
    }
}

/// Convert `value` for a slot of type `to`.
///
/// The static check (`ConversionKind::permits`) has already passed; what
/// remains are the per-value checks: unboxing `null` raises
/// `NullPointerException`, a reference of the wrong runtime class raises
/// `ClassCastException`.
pub fn convert_value(value: Value, to: &Type, kind: ConversionKind) -> Invocation {
    match to {
        Type::Void => Ok(Value::Unit),
        _ if matches!(value, Value::Unit) => Ok(default_value(to)),
        Type::Prim(q) => to_primitive(value, *q, kind),
        _ => to_reference(value, to, kind),
    }
}

fn to_primitive(value: Value, to: PrimType, kind: ConversionKind) -> Invocation {
    let Some(from) = value.prim_type() else {
        return Err(match value {
            Value::Null => Thrown::null_pointer(format!("cannot unbox null to {}", to.name())),
            other => Thrown::class_cast(format!(
                "{} cannot be converted to {}",
                describe(&other),
                to.name()
            )),
        });
    };
    if from == to {
        return Ok(value);
    }
    if from.widens_to(to) || kind == ConversionKind::Explicit {
        return Ok(cast_prim(&value, to));
    }
    Err(Thrown::class_cast(format!(
        "{} cannot be converted to {}",
        from.wrapper_name(),
        to.name()
    )))
}

fn to_reference(value: Value, to: &Type, kind: ConversionKind) -> Invocation {
    if value.conforms_to(to) {
        return Ok(value);
    }
    if let (Some(_), Some(q)) = (value.prim_type(), to.unboxed()) {
        if kind == ConversionKind::Explicit {
            return Ok(cast_prim(&value, q));
        }
    }
    Err(Thrown::class_cast(format!(
        "{} cannot be cast to {}",
        describe(&value),
        to
    )))
}

fn describe(value: &Value) -> String {
    match value.runtime_class() {
        Some(class) => class.name().to_string(),
        None => value.natural_type().to_string(),
    }
}

enum Num {
    Int(i64),
    Float(f64),
}

fn numeric(value: &Value) -> Option<Num> {
    Some(match value {
        Value::Bool(b) => Num::Int(i64::from(*b)),
        Value::Byte(v) => Num::Int(i64::from(*v)),
        Value::Short(v) => Num::Int(i64::from(*v)),
        Value::Char(v) => Num::Int(i64::from(*v)),
        Value::Int(v) => Num::Int(i64::from(*v)),
        Value::Long(v) => Num::Int(*v),
        Value::Float(v) => Num::Float(f64::from(*v)),
        Value::Double(v) => Num::Float(*v),
        _ => return None,
    })
}

/// Primitive conversion with two's-complement truncation for narrowing.
/// Floating values narrow to sub-int types through `int`; booleans
/// convert to and from the low bit.
pub fn cast_prim(value: &Value, to: PrimType) -> Value {
    let Some(num) = numeric(value) else {
        return value.clone();
    };
    match num {
        Num::Int(i) => match to {
            PrimType::Boolean => Value::Bool(i & 1 != 0),
            PrimType::Byte => Value::Byte(i as i8),
            PrimType::Short => Value::Short(i as i16),
            PrimType::Char => Value::Char(i as u16),
            PrimType::Int => Value::Int(i as i32),
            PrimType::Long => Value::Long(i),
            PrimType::Float => Value::Float(i as f32),
            PrimType::Double => Value::Double(i as f64),
        },
        Num::Float(f) => match to {
            PrimType::Boolean => Value::Bool((f as i64) & 1 != 0),
            PrimType::Byte => Value::Byte(f as i32 as i8),
            PrimType::Short => Value::Short(f as i32 as i16),
            PrimType::Char => Value::Char(f as i32 as u16),
            PrimType::Int => Value::Int(f as i32),
            PrimType::Long => Value::Long(f as i64),
            PrimType::Float => Value::Float(f as f32),
            PrimType::Double => Value::Double(f),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebind_types::ConversionKind::*;

    #[test]
    fn narrowing_truncates() {
        let big = Value::Long(i64::from(i32::MAX) + 2);
        assert_eq!(
            convert_value(big, &Type::int(), Explicit),
            Ok(Value::Int(i32::MIN + 1))
        );
        assert_eq!(cast_prim(&Value::Int(300), PrimType::Byte), Value::Byte(44));
        assert_eq!(cast_prim(&Value::Double(1e20), PrimType::Int), Value::Int(i32::MAX));
        assert_eq!(cast_prim(&Value::Int(3), PrimType::Boolean), Value::Bool(true));
        assert_eq!(cast_prim(&Value::Bool(true), PrimType::Long), Value::Long(1));
    }

    #[test]
    fn widening_and_unboxing() {
        assert_eq!(
            convert_value(Value::Int(7), &Type::long(), Assignment),
            Ok(Value::Long(7))
        );
        let err = convert_value(Value::Null, &Type::int(), Assignment).unwrap_err();
        assert_eq!(err.class().name(), "NullPointerException");
    }

    #[test]
    fn checked_reference_narrowing() {
        assert_eq!(
            convert_value(Value::from("s"), &Type::string(), Checked),
            Ok(Value::from("s"))
        );
        let err = convert_value(Value::from("s"), &Type::number(), Checked).unwrap_err();
        assert_eq!(err.class().name(), "ClassCastException");
        assert_eq!(err.message(), Some("String cannot be cast to Number"));
    }

    #[test]
    fn void_results_default() {
        assert_eq!(convert_value(Value::Unit, &Type::int(), Assignment), Ok(Value::Int(0)));
        assert_eq!(convert_value(Value::Unit, &Type::string(), Assignment), Ok(Value::Null));
        assert_eq!(convert_value(Value::Int(1), &Type::void(), Assignment), Ok(Value::Unit));
    }
}
