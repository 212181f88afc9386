//! Named signatures: an [`FnType`] whose parameters carry symbolic names.
//!
//! Names need not be unique. A repeated name stands for the same logical
//! argument in several positions, which is how broadcast permutes are
//! expressed. Patterns are regular expressions matched against the whole
//! name.

use std::fmt;

use regex::Regex;
use rebind_types::{FnType, Type};

use crate::error::BindError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    ty: FnType,
    names: Vec<String>,
}

fn compile(pattern: &str) -> Result<Regex, BindError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|e| BindError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

impl Signature {
    /// A signature with no arguments.
    pub fn returning(ret: Type) -> Self {
        Signature {
            ty: FnType::returning(ret),
            names: Vec::new(),
        }
    }

    pub fn from_parts(ty: FnType, names: Vec<String>) -> Result<Self, BindError> {
        if names.len() != ty.param_count() {
            return Err(BindError::ArityMismatch {
                op: "signature",
                expected: ty.param_count(),
                found: names.len(),
            });
        }
        Ok(Signature { ty, names })
    }

    pub fn ty(&self) -> &FnType {
        &self.ty
    }

    pub fn ret(&self) -> &Type {
        self.ty.ret()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn arg_count(&self) -> usize {
        self.names.len()
    }

    pub fn arg_name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn arg_type(&self, index: usize) -> Option<&Type> {
        self.ty.param(index)
    }

    /// Position of the first argument called `name`.
    pub fn arg_offset(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    fn require(&self, name: &str) -> Result<usize, BindError> {
        self.arg_offset(name).ok_or_else(|| self.unknown(name))
    }

    fn unknown(&self, name: &str) -> BindError {
        BindError::UnknownArgument {
            name: name.to_string(),
            signature: self.to_string(),
        }
    }

    /// Every position whose name matches `pattern`, in order.
    pub fn arg_offsets(&self, pattern: &str) -> Result<Vec<usize>, BindError> {
        let re = compile(pattern)?;
        Ok(self
            .names
            .iter()
            .enumerate()
            .filter(|(_, n)| re.is_match(n))
            .map(|(i, _)| i)
            .collect())
    }

    // -- additions ----------------------------------------------------------

    pub fn change_return(&self, ret: Type) -> Self {
        Signature {
            ty: self.ty.change_return(ret),
            names: self.names.clone(),
        }
    }

    pub fn append_arg(&self, name: impl Into<String>, ty: Type) -> Self {
        let mut names = self.names.clone();
        names.push(name.into());
        Signature {
            ty: self.ty.append_params(&[ty]),
            names,
        }
    }

    pub fn append_args(&self, names: &[&str], types: &[Type]) -> Result<Self, BindError> {
        self.insert_args(self.arg_count(), names, types)
    }

    pub fn prepend_arg(&self, name: impl Into<String>, ty: Type) -> Self {
        let mut names = self.names.clone();
        names.insert(0, name.into());
        Signature {
            ty: self.ty.prepend_params(&[ty]),
            names,
        }
    }

    pub fn prepend_args(&self, names: &[&str], types: &[Type]) -> Result<Self, BindError> {
        self.insert_args(0, names, types)
    }

    pub fn insert_arg(&self, index: usize, name: &str, ty: Type) -> Result<Self, BindError> {
        self.insert_args(index, &[name], &[ty])
    }

    pub fn insert_args(&self, index: usize, names: &[&str], types: &[Type]) -> Result<Self, BindError> {
        if index > self.arg_count() {
            return Err(BindError::IndexOutOfRange {
                op: "insert_args",
                index,
                arity: self.arg_count(),
            });
        }
        if names.len() != types.len() {
            return Err(BindError::ArityMismatch {
                op: "insert_args",
                expected: names.len(),
                found: types.len(),
            });
        }
        let mut all = self.names.clone();
        all.splice(index..index, names.iter().map(|n| n.to_string()));
        Ok(Signature {
            ty: self.ty.insert_params(index, types),
            names: all,
        })
    }

    /// Insert a new argument just before the argument called `before`.
    pub fn insert_arg_before(&self, before: &str, name: &str, ty: Type) -> Result<Self, BindError> {
        let index = self.require(before)?;
        self.insert_arg(index, name, ty)
    }

    // -- removals -----------------------------------------------------------

    /// Remove the first argument called `name`. An absent name is an error.
    pub fn drop_arg(&self, name: &str) -> Result<Self, BindError> {
        let index = self.require(name)?;
        self.drop_arg_at(index)
    }

    pub fn drop_arg_at(&self, index: usize) -> Result<Self, BindError> {
        self.drop_range("drop_arg", index, 1)
    }

    pub fn drop_first(&self, count: usize) -> Result<Self, BindError> {
        self.drop_range("drop_first", 0, count)
    }

    pub fn drop_last(&self, count: usize) -> Result<Self, BindError> {
        let start = self.arg_count().checked_sub(count).ok_or(BindError::PositionOutOfRange {
            op: "drop_last",
            position: 0,
            count,
            arity: self.arg_count(),
        })?;
        self.drop_range("drop_last", start, count)
    }

    fn drop_range(&self, op: &'static str, position: usize, count: usize) -> Result<Self, BindError> {
        if position.checked_add(count).map_or(true, |end| end > self.arg_count()) {
            return Err(BindError::PositionOutOfRange {
                op,
                position,
                count,
                arity: self.arg_count(),
            });
        }
        let mut names = self.names.clone();
        names.drain(position..position + count);
        Ok(Signature {
            ty: self.ty.drop_params(position, count),
            names,
        })
    }

    /// Rename and retype the argument called `old`, keeping its position.
    pub fn replace_arg(&self, old: &str, name: &str, ty: Type) -> Result<Self, BindError> {
        let index = self.require(old)?;
        let mut names = self.names.clone();
        names[index] = name.to_string();
        Ok(Signature {
            ty: self.ty.change_param(index, ty),
            names,
        })
    }

    /// Retype the argument at `index`, keeping its name.
    pub fn change_arg_type(&self, index: usize, ty: Type) -> Result<Self, BindError> {
        if index >= self.arg_count() {
            return Err(BindError::PositionOutOfRange {
                op: "change_arg_type",
                position: index,
                count: 1,
                arity: self.arg_count(),
            });
        }
        Ok(Signature {
            ty: self.ty.change_param(index, ty),
            names: self.names.clone(),
        })
    }

    // -- structural edits ---------------------------------------------------

    fn trailing_array(&self, op: &'static str) -> Result<Type, BindError> {
        let last = self.ty.last_param().ok_or(BindError::ArityMismatch {
            op,
            expected: 1,
            found: 0,
        })?;
        last.component().cloned().ok_or_else(|| BindError::NotAnArray {
            op,
            ty: last.clone(),
        })
    }

    /// Replace the trailing array argument with one argument per name.
    pub fn spread(&self, names: &[&str], types: &[Type]) -> Result<Self, BindError> {
        self.trailing_array("spread")?;
        if names.len() != types.len() {
            return Err(BindError::ArityMismatch {
                op: "spread",
                expected: names.len(),
                found: types.len(),
            });
        }
        self.drop_last(1)?.append_args(names, types)
    }

    /// Spread the trailing array into arguments of its component type.
    pub fn spread_names(&self, names: &[&str]) -> Result<Self, BindError> {
        let component = self.trailing_array("spread")?;
        self.spread(names, &vec![component; names.len()])
    }

    /// Spread the trailing array into `base0, base1, ...`.
    pub fn spread_count(&self, base: &str, count: usize) -> Result<Self, BindError> {
        let names: Vec<String> = (0..count).map(|i| format!("{base}{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        self.spread_names(&refs)
    }

    /// Replace every argument matching `pattern` with one array argument
    /// named `name`, placed at the first match.
    pub fn collect(&self, name: &str, pattern: &str) -> Result<Self, BindError> {
        let offsets = self.arg_offsets(pattern)?;
        let Some(&first) = offsets.first() else {
            return Err(self.unknown(pattern));
        };
        let types: Vec<Type> = offsets.iter().map(|&i| self.ty.params()[i].clone()).collect();
        if types.iter().any(|t| t != &types[0]) {
            return Err(BindError::HeterogeneousCollect {
                pattern: pattern.to_string(),
                types,
            });
        }
        let element = types[0].clone();

        let mut names = Vec::new();
        let mut params = Vec::new();
        for (i, (n, t)) in self.names.iter().zip(self.ty.params()).enumerate() {
            if i == first {
                names.push(name.to_string());
                params.push(element.array());
            } else if !offsets.contains(&i) {
                names.push(n.clone());
                params.push(t.clone());
            }
        }
        Ok(Signature {
            ty: FnType::new(self.ret().clone(), params),
            names,
        })
    }

    /// Project onto the arguments matching each pattern, in pattern order.
    /// Arguments may repeat or be left out.
    pub fn permute(&self, patterns: &[&str]) -> Result<Self, BindError> {
        let indices = self.to_patterns(patterns)?;
        Ok(self.pick(&indices))
    }

    /// Keep the arguments matching none of the patterns, in order.
    pub fn exclude(&self, patterns: &[&str]) -> Result<Self, BindError> {
        Ok(self.pick(&self.retained(patterns)?))
    }

    /// Positions `exclude` keeps.
    pub fn retained(&self, patterns: &[&str]) -> Result<Vec<usize>, BindError> {
        let res = patterns
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self
            .names
            .iter()
            .enumerate()
            .filter(|(_, n)| !res.iter().any(|re| re.is_match(n)))
            .map(|(i, _)| i)
            .collect())
    }

    fn pick(&self, indices: &[usize]) -> Self {
        Signature {
            ty: FnType::new(
                self.ret().clone(),
                indices.iter().map(|&i| self.ty.params()[i].clone()).collect::<Vec<_>>(),
            ),
            names: indices.iter().map(|&i| self.names[i].clone()).collect(),
        }
    }

    // -- index mapping ------------------------------------------------------

    /// For each argument of `other`, the position of the first argument of
    /// `self` with the same name.
    pub fn to(&self, other: &Signature) -> Result<Vec<usize>, BindError> {
        let names: Vec<&str> = other.names.iter().map(String::as_str).collect();
        self.to_names(&names)
    }

    pub fn to_names(&self, names: &[&str]) -> Result<Vec<usize>, BindError> {
        names.iter().map(|n| self.require(n)).collect()
    }

    /// Every position matching each pattern, concatenated in pattern
    /// order. A pattern matching nothing is an error.
    pub fn to_patterns(&self, patterns: &[&str]) -> Result<Vec<usize>, BindError> {
        let mut indices = Vec::new();
        for pattern in patterns {
            let found = self.arg_offsets(pattern)?;
            if found.is_empty() {
                return Err(self.unknown(pattern));
            }
            indices.extend(found);
        }
        Ok(indices)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, (name, ty)) in self.names.iter().zip(self.ty.params()).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {ty}")?;
        }
        write!(f, ") -> {}", self.ret())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig() -> Signature {
        Signature::returning(Type::string())
            .append_arg("a", Type::int())
            .append_arg("b", Type::string())
            .append_arg("c", Type::int())
    }

    #[test]
    fn display() {
        assert_eq!(sig().to_string(), "(a: int, b: String, c: int) -> String");
    }

    #[test]
    fn drop_absent_name_fails() {
        let err = sig().drop_arg("zz").unwrap_err();
        assert!(matches!(err, BindError::UnknownArgument { ref name, .. } if name == "zz"));
        assert_eq!(sig().drop_arg("b").unwrap().names(), &["a", "c"]);
    }

    #[test]
    fn collect_non_contiguous() {
        let s = sig().collect("nums", "a|c").unwrap();
        assert_eq!(s.to_string(), "(nums: int[], b: String) -> String");
        assert!(matches!(
            sig().collect("all", ".*"),
            Err(BindError::HeterogeneousCollect { .. })
        ));
    }

    #[test]
    fn permute_and_exclude() {
        let s = sig().permute(&["c", "a", "c"]).unwrap();
        assert_eq!(s.names(), &["c", "a", "c"]);
        assert_eq!(sig().to_patterns(&["c", "a|b"]).unwrap(), vec![2, 0, 1]);
        assert_eq!(sig().exclude(&["b"]).unwrap().names(), &["a", "c"]);
        assert!(sig().permute(&["q"]).is_err());
        assert!(matches!(
            sig().permute(&["("]),
            Err(BindError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn spread_trailing_array() {
        let s = Signature::returning(Type::void()).append_arg("xs", Type::long().array());
        let spread = s.spread_count("x", 2).unwrap();
        assert_eq!(spread.to_string(), "(x0: long, x1: long) -> void");
        assert!(sig().spread_count("x", 2).is_err());
    }

    #[test]
    fn insert_before_and_replace() {
        let s = sig().insert_arg_before("b", "z", Type::long()).unwrap();
        assert_eq!(s.names(), &["a", "z", "b", "c"]);
        let r = sig().replace_arg("b", "bee", Type::object()).unwrap();
        assert_eq!(r.to_string(), "(a: int, bee: Object, c: int) -> String");
        assert!(sig().insert_arg_before("nope", "z", Type::long()).is_err());
    }
}
