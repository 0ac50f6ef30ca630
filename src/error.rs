//! VM error taxonomy
//!
//! Failures split three ways. Graph corruption comes up from the graph
//! layer and aborts the run. Evaluation errors describe a script whose
//! shape or types the VM cannot execute. Host errors are whatever the
//! embedding engine reports from a dispatched builtin. Caller contract
//! violations (resuming a state that is not suspended, completing against
//! the wrong graph) are panics, not variants.

use thiserror::Error;

use crate::graph::{GraphError, ScriptDataType};
use crate::host::HostError;

#[derive(Debug, Error)]
pub enum VmError {
    /// Structural damage detected while traversing the node graph
    #[error("script graph corruption: {0}")]
    GraphCorruption(#[from] GraphError),

    /// Operator applied to an operand kind it does not accept
    #[error("operator `{op}` cannot accept a {found} operand")]
    OperatorType {
        op: &'static str,
        found: ScriptDataType,
    },

    /// No implicit cast between the value produced and the declared type
    #[error("cannot cast {from} to {to}")]
    TypeMismatch {
        from: ScriptDataType,
        to: ScriptDataType,
    },

    /// Integer `/` with a zero divisor; float division is left to IEEE rules
    #[error("integer division by zero")]
    DivisionByZero,

    /// `sleep`/`sleep_until` reached in a context that must run to completion
    #[error("script suspended in a non-resumable context")]
    CannotSuspend,

    /// Frame stack exceeded its fixed depth
    #[error("script nesting exceeds the {0}-frame call stack")]
    StackOverflow(usize),

    /// Engine-side builtin reported a failure
    #[error("host builtin failed: {0}")]
    Host(#[from] HostError),
}
