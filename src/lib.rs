//! Terminfo database parser and parameterized string interpreter

/// Byte-level reader over a compiled entry
mod bytes;
/// Standard capability names, by position in the binary
pub mod caps;
/// Index over a terminfo directory tree
pub mod database;
/// Compiled-entry decoder
pub mod entry;
mod error;
/// Printf-style conversions for `%c %d %o %x %X %s`
pub mod format;
/// Capability-source lexer
mod lexer;
/// Capability compiler
pub mod program;
/// Stack-machine runtime
pub mod vm;

pub use self::database::Database;
pub use self::entry::{Entry, Magic, TermNames};
pub use self::error::Error;
pub use self::program::{Instruction, Program};
pub use self::vm::{Run, Terminal, Value};
