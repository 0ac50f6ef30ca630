//! Host surface: the engine-side half of builtin dispatch
//!
//! The VM executes structural operators itself; everything else a script
//! can call (AI orders, camera moves, sound playback) belongs to the
//! embedding engine. [`HostSurface`] is the seam: the interpreter collects
//! a builtin's arguments into values and hands them across with the
//! operator id and name, and the host returns the resulting value.
//!
//! Every method has a default so tests and minimal embeddings only
//! override what they observe.

use thiserror::Error;

use crate::graph::ScriptDataType;
use crate::value::Value;

/// Failures reported by the embedding engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// Builtin id the host does not implement
    #[error("builtin `{name}` (op {op}) is not implemented by this host")]
    UnknownBuiltin { op: u16, name: String },

    /// Named game object could not be resolved to a handle
    #[error("cannot resolve {kind} reference `{name}`")]
    UnknownReference { kind: ScriptDataType, name: String },

    /// Engine-specific failure inside a builtin
    #[error("{0}")]
    Failed(String),
}

/// Engine services the interpreter calls out to.
pub trait HostSurface {
    /// `print` output channel.
    fn emit_text(
        &mut self,
        text: &str,
    ) {
        tracing::info!("script: {text}");
    }

    /// Whether the current session is a playtest build.
    fn game_is_playtest(&self) -> bool {
        false
    }

    /// Simulation tick rate, used to convert seconds to sleep ticks.
    fn ticks_per_second(&self) -> u32 {
        30
    }

    /// Resolve a reference-typed leaf to a game object handle.
    ///
    /// The default hands back a zero handle of the declared kind, which is
    /// enough for scripts that only pass references through to builtins.
    fn resolve_reference(
        &mut self,
        kind: ScriptDataType,
        name: &str,
    ) -> Result<Value, HostError> {
        let _ = name;
        Ok(Value::reference(kind, 0))
    }

    /// Dispatch a non-structural builtin.
    ///
    /// Arguments arrive fully evaluated, in call order. The default is a
    /// void no-op so unported builtins do not abort whole mission scripts;
    /// hosts that want strict dispatch return
    /// [`HostError::UnknownBuiltin`] instead.
    fn invoke_builtin(
        &mut self,
        op: u16,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, HostError> {
        let _ = args;
        tracing::debug!("unhandled builtin `{name}` (op {op}), returning void");
        Ok(Value::Void)
    }
}

/// Host that ignores every effect; the default for tests and tooling.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl HostSurface for NullHost {}
