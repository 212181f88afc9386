#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
#![forbid(unsafe_code)]

mod conversion;
mod fn_type;
mod types;

pub use conversion::ConversionKind;
pub use fn_type::FnType;
pub use types::{Class, PrimType, Type};

// Ergonomic prelude -- short names in dependents.
pub mod prelude {
    pub use crate::conversion::ConversionKind;
    pub use crate::fn_type::FnType;
    pub use crate::types::{Class, PrimType, Type};
}
