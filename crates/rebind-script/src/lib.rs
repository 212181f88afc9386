#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]

//! Binding scripts: a statement-per-line front end for the named binder.
//!
//! ```text
//! sig (greeting: String, name: String) -> String;
//! drop name;
//! insert 1 name: String = "world";
//! invoke static Strings::concat;
//! call ("Hello, ", "ignored");
//! ```

pub mod ast;
mod interp;
mod lexer;
pub mod library;
mod parser;
mod token;

pub use interp::{Call, Composition, Interpreter, Step};
pub use library::{Library, Notes};
pub use parser::parse_str;
