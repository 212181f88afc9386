#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
#![forbid(unsafe_code)]

//! Adapter composition over typed callables.
//!
//! A [`Binder`] (or its name-aware overlay [`SmartBinder`]) records how the
//! signature callers see should be turned into the signature an endpoint
//! has. Finalizing it against an endpoint produces a single [`Callable`]
//! that performs every recorded adaptation per call.

pub mod binder;
pub mod callable;
pub mod capabilities;
pub mod combinators;
pub mod convert;
pub mod error;
pub mod lookup;
pub mod signature;
pub mod smart_binder;
pub mod smart_handle;
pub mod transform;
pub mod value;

pub use binder::Binder;
pub use callable::{Callable, Invocation};
pub use capabilities::Capabilities;
pub use error::{BindError, LinkError, LookupError};
pub use lookup::{ClassEntry, Lookup, Registry, Visibility};
pub use signature::Signature;
pub use smart_binder::SmartBinder;
pub use smart_handle::SmartHandle;
pub use transform::Transform;
pub use value::{ArrayValue, Object, Thrown, Value};

pub use rebind_types::{ConversionKind, FnType, PrimType, Type};

// Ergonomic prelude -- short names in dependents.
pub mod prelude {
    pub use crate::binder::Binder;
    pub use crate::callable::{Callable, Invocation};
    pub use crate::capabilities::Capabilities;
    pub use crate::error::{BindError, LinkError, LookupError};
    pub use crate::lookup::{Lookup, Registry};
    pub use crate::signature::Signature;
    pub use crate::smart_binder::SmartBinder;
    pub use crate::smart_handle::SmartHandle;
    pub use crate::value::{ArrayValue, Thrown, Value};
    pub use rebind_types::prelude::*;
}
