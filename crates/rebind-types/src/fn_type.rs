use std::fmt;

use crate::types::Type;

/// Unnamed callable signature: ordered parameter types plus a return type.
///
/// Every edit returns a new value. Index arguments follow `Vec` rules and
/// panic when out of range; callers validate positions first.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FnType {
    params: Vec<Type>,
    ret: Type,
}

impl FnType {
    pub fn new(ret: Type, params: impl Into<Vec<Type>>) -> Self {
        Self {
            params: params.into(),
            ret,
        }
    }

    /// A zero-parameter type returning `ret`.
    pub fn returning(ret: Type) -> Self {
        Self::new(ret, Vec::new())
    }

    pub fn params(&self) -> &[Type] {
        &self.params
    }

    pub fn param(&self, index: usize) -> Option<&Type> {
        self.params.get(index)
    }

    pub fn last_param(&self) -> Option<&Type> {
        self.params.last()
    }

    pub fn ret(&self) -> &Type {
        &self.ret
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn drop_params(&self, start: usize, count: usize) -> Self {
        let mut params = self.params.clone();
        params.drain(start..start + count);
        Self::new(self.ret.clone(), params)
    }

    pub fn insert_params(&self, index: usize, types: &[Type]) -> Self {
        let mut params = self.params.clone();
        params.splice(index..index, types.iter().cloned());
        Self::new(self.ret.clone(), params)
    }

    pub fn append_params(&self, types: &[Type]) -> Self {
        self.insert_params(self.params.len(), types)
    }

    pub fn prepend_params(&self, types: &[Type]) -> Self {
        self.insert_params(0, types)
    }

    pub fn change_param(&self, index: usize, ty: Type) -> Self {
        let mut params = self.params.clone();
        params[index] = ty;
        Self::new(self.ret.clone(), params)
    }

    pub fn change_return(&self, ret: Type) -> Self {
        Self::new(ret, self.params.clone())
    }

    /// The sub-signature `params[start..end] -> ret`.
    pub fn slice(&self, start: usize, end: usize, ret: Type) -> Self {
        Self::new(ret, self.params[start..end].to_vec())
    }
}

impl fmt::Display for FnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, "){}", self.ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_are_pure() {
        let base = FnType::new(Type::string(), vec![Type::int(), Type::long()]);
        let dropped = base.drop_params(0, 1);
        assert_eq!(dropped.params(), &[Type::long()]);
        assert_eq!(base.param_count(), 2);

        let inserted = base.insert_params(1, &[Type::string(), Type::object()]);
        assert_eq!(inserted.to_string(), "(int, String, Object, long)String");
        assert_eq!(base.change_return(Type::void()).to_string(), "(int, long)void");
    }
}
