//! Name-driven composition over a [`Binder`].
//!
//! A [`SmartBinder`] pairs a binder with the named [`Signature`] of its
//! current type. Every operation edits both the same way, so arguments can
//! be addressed by name (or name pattern) instead of by position.

use rebind_types::Type;

use crate::binder::Binder;
use crate::callable::Callable;
use crate::capabilities::Capabilities;
use crate::error::{BindError, LinkError};
use crate::lookup::Lookup;
use crate::signature::Signature;
use crate::smart_handle::SmartHandle;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct SmartBinder {
    start: Signature,
    signature: Signature,
    binder: Binder,
}

impl SmartBinder {
    pub fn from(start: Signature) -> Self {
        SmartBinder {
            binder: Binder::from(start.ty().clone()),
            signature: start.clone(),
            start,
        }
    }

    pub fn with_capabilities(self, caps: Capabilities) -> Self {
        SmartBinder {
            binder: self.binder.with_capabilities(caps),
            ..self
        }
    }

    /// The signature callers of the finished handle see.
    pub fn start(&self) -> &Signature {
        &self.start
    }

    /// The named signature the endpoint must have.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    pub fn trace(&self) -> Vec<String> {
        self.binder.trace()
    }

    fn next(&self, signature: Signature, binder: Binder) -> Self {
        SmartBinder {
            start: self.start.clone(),
            signature,
            binder,
        }
    }

    fn offset(&self, name: &str) -> Result<usize, BindError> {
        self.signature
            .arg_offset(name)
            .ok_or_else(|| BindError::UnknownArgument {
                name: name.to_string(),
                signature: self.signature.to_string(),
            })
    }

    // -----------------------------------------------------------------------
    // Functions
    // -----------------------------------------------------------------------

    /// Prepend the result of `function` as a new argument `name`. A void
    /// `function` adds no argument and `name` goes unused.
    pub fn fold(&self, name: &str, function: Callable) -> Result<Self, BindError> {
        let ret = function.ty().ret().clone();
        let binder = self.binder.fold(function)?;
        let signature = if ret.is_void() {
            self.signature.clone()
        } else {
            self.signature.prepend_arg(name, ret)
        };
        Ok(self.next(signature, binder))
    }

    pub fn fold_void(&self, function: Callable) -> Result<Self, BindError> {
        let binder = self.binder.fold_void(function)?;
        Ok(self.next(self.signature.clone(), binder))
    }

    /// Filter every argument whose name matches `pattern` through
    /// `function`.
    pub fn filter(&self, pattern: &str, function: Callable) -> Result<Self, BindError> {
        let offsets = self.signature.arg_offsets(pattern)?;
        let ret = function.ty().ret().clone();
        let mut binder = self.binder.clone();
        let mut signature = self.signature.clone();
        for &i in &offsets {
            binder = binder.filter(i, std::slice::from_ref(&function))?;
            signature = signature.change_arg_type(i, ret.clone())?;
        }
        Ok(self.next(signature, binder))
    }

    pub fn filter_return(&self, function: Callable) -> Result<Self, BindError> {
        let binder = self.binder.filter_return(function)?;
        let ret = binder.current_type().ret().clone();
        Ok(self.next(self.signature.change_return(ret), binder))
    }

    pub fn catch_exception(&self, throwable: Type, function: Callable) -> Result<Self, BindError> {
        let binder = self.binder.catch_exception(throwable, function)?;
        Ok(self.next(self.signature.clone(), binder))
    }

    pub fn try_finally(&self, post: Callable) -> Result<Self, BindError> {
        let binder = self.binder.try_finally(post)?;
        Ok(self.next(self.signature.clone(), binder))
    }

    // -----------------------------------------------------------------------
    // Argument list
    // -----------------------------------------------------------------------

    /// Reorder to `target`'s names; each name takes the first argument of
    /// that name. Names may repeat (broadcast) or be left out.
    pub fn permute(&self, target: &Signature) -> Result<Self, BindError> {
        let reorder = self.signature.to(target)?;
        let binder = self.binder.permute(&reorder)?;
        let signature = Signature::from_parts(binder.current_type().clone(), target.names().to_vec())?;
        Ok(self.next(signature, binder))
    }

    /// Keep the arguments matching each pattern, in pattern order.
    pub fn permute_names(&self, patterns: &[&str]) -> Result<Self, BindError> {
        let reorder = self.signature.to_patterns(patterns)?;
        let binder = self.binder.permute(&reorder)?;
        Ok(self.next(self.signature.permute(patterns)?, binder))
    }

    /// Drop every argument matching one of `patterns`.
    pub fn exclude(&self, patterns: &[&str]) -> Result<Self, BindError> {
        let reorder = self.signature.retained(patterns)?;
        let binder = self.binder.permute(&reorder)?;
        Ok(self.next(self.signature.exclude(patterns)?, binder))
    }

    /// Spread the trailing array argument into named arguments of the
    /// given types.
    pub fn spread(&self, names: &[&str], types: &[Type]) -> Result<Self, BindError> {
        let signature = self.signature.spread(names, types)?;
        let binder = self.binder.spread(types)?;
        Ok(self.next(signature, binder))
    }

    /// Spread the trailing array into `base0, base1, ...`.
    pub fn spread_count(&self, base: &str, count: usize) -> Result<Self, BindError> {
        let signature = self.signature.spread_count(base, count)?;
        let types = signature.ty().params()[signature.arg_count() - count..].to_vec();
        let binder = self.binder.spread(&types)?;
        Ok(self.next(signature, binder))
    }

    /// Insert a named value, typed by its natural type.
    pub fn insert(&self, index: usize, name: &str, value: Value) -> Result<Self, BindError> {
        self.insert_typed(index, name, value.natural_type(), value)
    }

    pub fn insert_typed(&self, index: usize, name: &str, ty: Type, value: Value) -> Result<Self, BindError> {
        let signature = self.signature.insert_arg(index, name, ty.clone())?;
        let binder = self.binder.insert_typed(index, vec![ty], vec![value])?;
        Ok(self.next(signature, binder))
    }

    pub fn append(&self, name: &str, value: Value) -> Result<Self, BindError> {
        self.insert(self.signature.arg_count(), name, value)
    }

    pub fn append_typed(&self, name: &str, ty: Type, value: Value) -> Result<Self, BindError> {
        self.insert_typed(self.signature.arg_count(), name, ty, value)
    }

    pub fn prepend(&self, name: &str, value: Value) -> Result<Self, BindError> {
        self.insert(0, name, value)
    }

    pub fn prepend_typed(&self, name: &str, ty: Type, value: Value) -> Result<Self, BindError> {
        self.insert_typed(0, name, ty, value)
    }

    /// Drop the argument called `name`.
    pub fn drop(&self, name: &str) -> Result<Self, BindError> {
        let index = self.offset(name)?;
        let binder = self.binder.drop(index, 1)?;
        Ok(self.next(self.signature.drop_arg_at(index)?, binder))
    }

    pub fn drop_first(&self, count: usize) -> Result<Self, BindError> {
        let signature = self.signature.drop_first(count)?;
        Ok(self.next(signature, self.binder.drop_first(count)?))
    }

    pub fn drop_last(&self, count: usize) -> Result<Self, BindError> {
        let signature = self.signature.drop_last(count)?;
        Ok(self.next(signature, self.binder.drop_last(count)?))
    }

    /// Collect every argument matching `pattern` into one array argument
    /// `name`, placed at the first match. Non-adjacent matches are moved
    /// together first.
    pub fn collect(&self, name: &str, pattern: &str) -> Result<Self, BindError> {
        let signature = self.signature.collect(name, pattern)?;
        let offsets = self.signature.arg_offsets(pattern)?;
        let first = offsets[0];
        let count = offsets.len();
        let array_type = signature.ty().params()[first].clone();

        let contiguous = offsets.iter().enumerate().all(|(k, &i)| i == first + k);
        let binder = if contiguous {
            self.binder.clone()
        } else {
            let others = (0..self.signature.arg_count()).filter(|i| !offsets.contains(i));
            let reorder: Vec<usize> = others
                .clone()
                .take_while(|&i| i < first)
                .chain(offsets.iter().copied())
                .chain(others.skip_while(|&i| i < first))
                .collect();
            self.binder.permute(&reorder)?
        };
        let binder = binder.collect_count(first, count, array_type)?;
        Ok(self.next(signature, binder))
    }

    // -----------------------------------------------------------------------
    // Conversions
    // -----------------------------------------------------------------------

    /// Convert to `target`'s types and take its names.
    pub fn convert(&self, target: &Signature) -> Result<Self, BindError> {
        let binder = self.binder.convert(target.ty().clone())?;
        Ok(self.next(target.clone(), binder))
    }

    pub fn cast(&self, target: &Signature) -> Result<Self, BindError> {
        let binder = self.binder.cast(target.ty().clone())?;
        Ok(self.next(target.clone(), binder))
    }

    /// Cast the argument called `name` to `ty`.
    pub fn cast_arg(&self, name: &str, ty: Type) -> Result<Self, BindError> {
        let target = self.signature.replace_arg(name, name, ty)?;
        self.cast(&target)
    }

    pub fn cast_return(&self, ty: Type) -> Result<Self, BindError> {
        let target = self.signature.change_return(ty);
        self.cast(&target)
    }

    // -----------------------------------------------------------------------
    // Finalization
    // -----------------------------------------------------------------------

    fn finish(&self, handle: Callable) -> Result<SmartHandle, BindError> {
        SmartHandle::from(self.start.clone(), handle)
    }

    pub fn invoke(&self, target: &Callable) -> Result<SmartHandle, BindError> {
        self.finish(self.binder.invoke(target)?)
    }

    pub fn identity(&self) -> Result<SmartHandle, BindError> {
        self.finish(self.binder.identity()?)
    }

    pub fn constant(&self, value: Value) -> Result<SmartHandle, BindError> {
        self.finish(self.binder.constant(value)?)
    }

    pub fn nop(&self) -> Result<SmartHandle, BindError> {
        self.finish(self.binder.nop()?)
    }

    pub fn throw_exception(&self) -> Result<SmartHandle, BindError> {
        self.finish(self.binder.throw_exception()?)
    }

    pub fn invoke_static(&self, lookup: &Lookup, class: &Type, name: &str) -> Result<SmartHandle, LinkError> {
        Ok(self.finish(self.binder.invoke_static(lookup, class, name)?)?)
    }

    pub fn invoke_virtual(&self, lookup: &Lookup, name: &str) -> Result<SmartHandle, LinkError> {
        Ok(self.finish(self.binder.invoke_virtual(lookup, name)?)?)
    }

    pub fn invoke_special(&self, lookup: &Lookup, class: &Type, name: &str) -> Result<SmartHandle, LinkError> {
        Ok(self.finish(self.binder.invoke_special(lookup, class, name)?)?)
    }

    pub fn invoke_constructor(&self, lookup: &Lookup, class: &Type) -> Result<SmartHandle, LinkError> {
        Ok(self.finish(self.binder.invoke_constructor(lookup, class)?)?)
    }

    pub fn get_field(&self, lookup: &Lookup, name: &str) -> Result<SmartHandle, LinkError> {
        Ok(self.finish(self.binder.get_field(lookup, name)?)?)
    }

    pub fn set_field(&self, lookup: &Lookup, name: &str) -> Result<SmartHandle, LinkError> {
        Ok(self.finish(self.binder.set_field(lookup, name)?)?)
    }

    pub fn get_static(&self, lookup: &Lookup, class: &Type, name: &str) -> Result<SmartHandle, LinkError> {
        Ok(self.finish(self.binder.get_static(lookup, class, name)?)?)
    }

    pub fn set_static(&self, lookup: &Lookup, class: &Type, name: &str) -> Result<SmartHandle, LinkError> {
        Ok(self.finish(self.binder.set_static(lookup, class, name)?)?)
    }

    pub fn invoke_static_quiet(&self, lookup: &Lookup, class: &Type, name: &str) -> Result<SmartHandle, BindError> {
        Ok(self.invoke_static(lookup, class, name)?)
    }

    pub fn invoke_virtual_quiet(&self, lookup: &Lookup, name: &str) -> Result<SmartHandle, BindError> {
        Ok(self.invoke_virtual(lookup, name)?)
    }

    pub fn invoke_special_quiet(&self, lookup: &Lookup, class: &Type, name: &str) -> Result<SmartHandle, BindError> {
        Ok(self.invoke_special(lookup, class, name)?)
    }

    pub fn invoke_constructor_quiet(&self, lookup: &Lookup, class: &Type) -> Result<SmartHandle, BindError> {
        Ok(self.invoke_constructor(lookup, class)?)
    }

    pub fn get_field_quiet(&self, lookup: &Lookup, name: &str) -> Result<SmartHandle, BindError> {
        Ok(self.get_field(lookup, name)?)
    }

    pub fn set_field_quiet(&self, lookup: &Lookup, name: &str) -> Result<SmartHandle, BindError> {
        Ok(self.set_field(lookup, name)?)
    }

    pub fn get_static_quiet(&self, lookup: &Lookup, class: &Type, name: &str) -> Result<SmartHandle, BindError> {
        Ok(self.get_static(lookup, class, name)?)
    }

    pub fn set_static_quiet(&self, lookup: &Lookup, class: &Type, name: &str) -> Result<SmartHandle, BindError> {
        Ok(self.set_static(lookup, class, name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebind_types::FnType;

    fn start() -> Signature {
        Signature::returning(Type::string())
            .append_arg("a", Type::string())
            .append_arg("n", Type::int())
            .append_arg("b", Type::string())
    }

    fn join() -> Callable {
        Callable::new(
            "join",
            FnType::new(Type::string(), vec![Type::string().array()]),
            |args| {
                let parts: Vec<String> = args[0]
                    .as_array()
                    .map(|a| a.items().iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                    .unwrap_or_default();
                Ok(Value::Str(parts.join("+")))
            },
        )
    }

    #[test]
    fn collect_moves_scattered_matches_together() {
        let sb = SmartBinder::from(start()).collect("parts", "a|b").unwrap();
        assert_eq!(sb.signature().to_string(), "(parts: String[], n: int) -> String");
        let sb = sb.drop("n").unwrap();
        let handle = sb.invoke(&join()).unwrap();
        assert_eq!(
            handle.invoke(vec!["x".into(), Value::Int(1), "y".into()]),
            Ok(Value::from("x+y"))
        );
    }

    #[test]
    fn names_track_every_edit() {
        let sb = SmartBinder::from(start())
            .drop("n")
            .unwrap()
            .insert(1, "sep", Value::from("-"))
            .unwrap();
        assert_eq!(sb.signature().names(), &["a", "sep", "b"]);
        assert_eq!(sb.binder().current_type(), sb.signature().ty());
    }

    #[test]
    fn exclude_drops_matching() {
        let sb = SmartBinder::from(start()).exclude(&["n"]).unwrap();
        assert_eq!(sb.signature().to_string(), "(a: String, b: String) -> String");
        assert!(SmartBinder::from(start()).drop("missing").is_err());
    }
}
