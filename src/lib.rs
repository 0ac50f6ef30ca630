//! scenscript — embedded mission-script virtual machine
//!
//! Level data ships scripts as a flat, indexed graph of syntax nodes rather
//! than source text. This crate decodes that graph and executes it
//! deterministically, including scripts that suspend mid-statement
//! (`sleep`, `sleep_until`) and resume on a later engine tick without
//! losing their place in nested expressions.
//!
//! # Architecture
//!
//! ```text
//! ScriptGraph (decoded level data)
//!       |
//!       v
//! VariableStore  <-- RecursiveInterpreter (one-shot, must-complete)
//!       |
//!       v
//! IterativeInterpreter (explicit frame stack, resumable)
//!       |
//!       v
//! ScriptExecutor (one InterpreterState per script method, once per tick)
//! ```
//!
//! The iterative interpreter is the core: a small coroutine-capable
//! evaluator that keeps all in-progress state in an explicit
//! [`InterpreterState`](interp::InterpreterState) instead of the host call
//! stack, so a suspended script is just data the engine holds onto between
//! ticks.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod exec;
pub mod graph;
pub mod host;
pub mod interp;
pub mod value;

pub mod util;

pub use error::VmError;
pub use graph::ScriptGraph;
pub use host::HostSurface;
pub use interp::{InterpreterConfig, InterpreterState, IterativeInterpreter, RecursiveInterpreter};
pub use value::Value;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
