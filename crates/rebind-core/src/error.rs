//! Composition-time error taxonomy.
//!
//! Failures of an *invocation* are not errors of the engine: they travel as
//! [`Thrown`](crate::Thrown) values inside `Result<Value, Thrown>`.

use rebind_types::{FnType, Type};
use thiserror::Error;

/// An adaptation that can never be materialized ("invalid adaptation").
///
/// Raised synchronously when a transform is pushed onto a binder, or when a
/// combinator is asked to build an impossible adapter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindError {
    #[error("{op}: positions {position}..{} out of range for {arity} parameters", end(.position, .count))]
    PositionOutOfRange {
        op: &'static str,
        position: usize,
        count: usize,
        arity: usize,
    },

    #[error("{op}: index {index} out of range for {arity} parameters")]
    IndexOutOfRange {
        op: &'static str,
        index: usize,
        arity: usize,
    },

    #[error("{op}: expected {expected} arguments, found {found}")]
    ArityMismatch {
        op: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{op}: expected an array type, found {ty}")]
    NotAnArray { op: &'static str, ty: Type },

    #[error("collect: arguments matching '{pattern}' have mixed types [{}]", join(.types))]
    HeterogeneousCollect { pattern: String, types: Vec<Type> },

    #[error("{op}: cannot convert {} from {from} to {to}", describe_position(.position))]
    IncompatibleConversion {
        op: &'static str,
        position: Option<usize>,
        from: Type,
        to: Type,
    },

    #[error("{op}: expected {expected}, found {found}")]
    TypeMismatch {
        op: &'static str,
        expected: Type,
        found: Type,
    },

    #[error("{op}: {detail}")]
    InvalidShape { op: &'static str, detail: String },

    #[error("{op}: void is not a valid parameter type")]
    VoidParameter { op: &'static str },

    #[error("{op}: value {value} does not conform to {ty} at position {position}")]
    ValueMismatch {
        op: &'static str,
        position: usize,
        value: String,
        ty: Type,
    },

    #[error("{op}: {ty} is not a throwable type")]
    NotThrowable { op: &'static str, ty: Type },

    #[error("argument or pattern '{name}' not found in {signature}")]
    UnknownArgument { name: String, signature: String },

    #[error("invalid argument name pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("endpoint type {found} does not match binder type {expected}")]
    EndpointMismatch { expected: FnType, found: FnType },

    #[error("cannot splice binder starting at {found} onto binder ending at {expected}")]
    Splice { expected: FnType, found: FnType },

    #[error("unresolved target: {0}")]
    Unresolved(#[from] LookupError),
}

/// Failure resolving a named member through a [`Lookup`](crate::Lookup).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("no such class: {class}")]
    NoSuchClass { class: String },

    #[error("no such method: {class}.{name}{ty}")]
    NoSuchMethod {
        class: String,
        name: String,
        ty: FnType,
    },

    #[error("no such field: {class}.{name} of type {ty}")]
    NoSuchField {
        class: String,
        name: String,
        ty: Type,
    },

    #[error("{class}.{member} is not accessible from {}", context_name(.context))]
    IllegalAccess {
        class: String,
        member: String,
        context: Option<String>,
    },
}

/// Result of the primary lookup-based finalizers: either the named target
/// could not be resolved, or the composition itself was invalid.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinkError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Bind(#[from] BindError),
}

impl From<LinkError> for BindError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::Lookup(e) => BindError::Unresolved(e),
            LinkError::Bind(e) => e,
        }
    }
}

fn join(types: &[Type]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn end(position: &usize, count: &usize) -> usize {
    position.saturating_add(*count)
}

fn context_name(context: &Option<String>) -> &str {
    context.as_deref().unwrap_or("<public lookup>")
}

fn describe_position(position: &Option<usize>) -> String {
    match position {
        Some(i) => format!("argument {}", i),
        None => "return value".to_string(),
    }
}
