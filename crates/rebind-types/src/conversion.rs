//! Static conversion rules.
//!
//! These decide, at composition time, whether a value statically typed
//! `from` may be handed to a slot typed `to`. The run-time half (actually
//! converting a value, and raising when a checked conversion fails) lives
//! in the engine.

use crate::types::{PrimType, Type};

/// How permissive a conversion is.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionKind {
    /// Widening, boxing and unboxing only. Never fails at call time
    /// except when unboxing `null`.
    Assignment,
    /// Assignment plus reference narrowing and unboxing from a
    /// supertype of a wrapper, both verified per value at call time.
    Checked,
    /// Checked plus primitive narrowing, boolean/numeric conversion and
    /// casts between unrelated references.
    Explicit,
}

impl ConversionKind {
    /// Whether an argument of type `from` converts to a parameter of
    /// type `to`. `void` never converts to or from anything but itself.
    pub fn permits(self, from: &Type, to: &Type) -> bool {
        if from == to {
            return true;
        }
        match (from, to) {
            (Type::Void, _) | (_, Type::Void) => false,
            (Type::Prim(p), Type::Prim(q)) => match self {
                ConversionKind::Explicit => true,
                _ => p.widens_to(*q),
            },
            (Type::Prim(p), to) => {
                if to.is_assignable_from(&Type::boxed(*p)) {
                    return true;
                }
                // explicit boxing to another wrapper converts the primitive first
                self == ConversionKind::Explicit && to.unboxed().is_some()
            }
            (from, Type::Prim(q)) => {
                if let Some(p) = from.unboxed() {
                    if p == *q || p.widens_to(*q) {
                        return true;
                    }
                }
                match self {
                    ConversionKind::Assignment => false,
                    ConversionKind::Checked => PrimType::ALL
                        .into_iter()
                        .filter(|p| p == q || p.widens_to(*q))
                        .any(|p| from.is_assignable_from(&Type::boxed(p))),
                    ConversionKind::Explicit => PrimType::ALL
                        .into_iter()
                        .any(|p| from.is_assignable_from(&Type::boxed(p))),
                }
            }
            (from, to) => match self {
                ConversionKind::Assignment => to.is_assignable_from(from),
                ConversionKind::Checked => {
                    to.is_assignable_from(from) || from.is_assignable_from(to)
                }
                // unrelated references still cast; the value is checked per call
                ConversionKind::Explicit => true,
            },
        }
    }

    /// Return-position conversion: a result can always be discarded into
    /// `void`, and a missing result is replaced by a default.
    pub fn permits_return(self, from: &Type, to: &Type) -> bool {
        to.is_void() || from.is_void() || self.permits(from, to)
    }
}
