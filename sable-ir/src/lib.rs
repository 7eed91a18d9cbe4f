//! Intermediate representation for the sable IR driver.
//!
//! The IR is deliberately small: operations with named SSA results and
//! operands, an ordered attribute dictionary, and nested regions. Dialects
//! describe which operations exist and how they are checked and printed.
//!
//! # Architecture
//!
//! ```text
//! text → lexer → parser → Operation (verified) → passes → printer → text
//! ```

mod attribute;
mod context;
pub mod dialect;
mod lexer;
mod operation;
mod parser;
mod printer;
mod verifier;

pub use attribute::{AttrKind, Attribute, Attributes};
pub use context::{Context, ContextOptions, ThreadingGuard};
pub use dialect::{Arity, Dialect, DialectRegistry, OpDefinition, Syntax};
pub use operation::{Operation, Region};
pub use parser::{ParseError, parse};
pub use printer::{PrintOptions, print, summarize};
pub use verifier::verify;
