//! Script evaluation
//!
//! Two evaluators share one set of operator semantics ([`operators`]):
//!
//! - [`RecursiveInterpreter`]: depth-first, must-complete. Used for
//!   variable initializers and `sleep_until` condition rechecks, where
//!   suspension is either impossible or forbidden.
//! - [`IterativeInterpreter`]: the core. Keeps all in-progress evaluation
//!   in an explicit frame stack ([`state::Frame`]) so a script blocked on
//!   `sleep`/`sleep_until` is just an [`InterpreterState`] value the engine
//!   holds between ticks.
//!
//! [`VariableStore`] owns the script-global slots both evaluators read and
//! write.

pub mod iterative;
pub mod recursive;
pub mod state;
pub mod variables;

mod operators;


pub use iterative::{BeginRandomPolicy, InterpreterConfig, IterativeInterpreter};
pub use recursive::RecursiveInterpreter;
pub use state::{InterpreterState, Suspension};
pub use variables::VariableStore;
