//! Per-tick script scheduler
//!
//! One [`Execution`] record per script method in the graph: its lifecycle
//! decides whether it starts armed (Startup, Continuous) or parked
//! (Dormant, Static, Stub, command scripts). [`ScriptExecutor::run_tick`]
//! drives every live record through the iterative interpreter exactly once
//! per engine tick; suspended scripts keep their state between ticks and
//! continuous scripts are re-primed after each completion.
//!
//! An evaluation error fails only the script that raised it; the rest of
//! the schedule keeps running.

#[cfg(test)]
mod tests;

use tracing::{error, info, trace};

use crate::error::VmError;
use crate::graph::{Lifecycle, ScriptGraph};
use crate::host::HostSurface;
use crate::interp::{InterpreterConfig, InterpreterState, IterativeInterpreter};

/// Scheduling status of one script method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStatus {
    /// Primed to run from the top on the next tick
    Ready,
    /// Parked at a sleep; resumed every tick
    Suspended,
    /// Not scheduled until woken or re-armed
    Parked,
    /// Ran to completion and will not be scheduled again
    Terminated,
    /// Aborted by an evaluation error
    Failed,
}

struct Execution {
    name: String,
    lifecycle: Lifecycle,
    status: ScriptStatus,
    state: InterpreterState,
}

/// Owns one interpreter and the per-method execution records for a graph.
pub struct ScriptExecutor<'a, H> {
    interpreter: IterativeInterpreter<'a, H>,
    executions: Vec<Execution>,
    tick: u64,
}

impl<'a, H: HostSurface> ScriptExecutor<'a, H> {
    pub fn new(
        graph: &'a ScriptGraph,
        host: H,
    ) -> Result<Self, VmError> {
        Self::with_config(graph, host, InterpreterConfig::default())
    }

    pub fn with_config(
        graph: &'a ScriptGraph,
        host: H,
        config: InterpreterConfig,
    ) -> Result<Self, VmError> {
        let interpreter = IterativeInterpreter::with_config(graph, host, config)?;

        let mut executions = Vec::with_capacity(graph.methods().len());
        for method in graph.methods() {
            let state = interpreter.create_state(method.entry)?;
            let status = match method.lifecycle {
                Lifecycle::Startup | Lifecycle::Continuous => ScriptStatus::Ready,
                Lifecycle::Dormant
                | Lifecycle::Static
                | Lifecycle::Stub
                | Lifecycle::CommandScript => ScriptStatus::Parked,
            };
            trace!(script = %method.name, ?status, "scheduled");
            executions.push(Execution {
                name: method.name.clone(),
                lifecycle: method.lifecycle,
                status,
                state,
            });
        }

        Ok(Self {
            interpreter,
            executions,
            tick: 0,
        })
    }

    pub fn interpreter(&self) -> &IterativeInterpreter<'a, H> {
        &self.interpreter
    }

    pub fn host_mut(&mut self) -> &mut H {
        self.interpreter.host_mut()
    }

    /// Ticks run so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn status(
        &self,
        method: &str,
    ) -> Option<ScriptStatus> {
        self.executions
            .iter()
            .find(|e| e.name == method)
            .map(|e| e.status)
    }

    /// Arm a dormant script; it runs on the next tick.
    pub fn wake(
        &mut self,
        method: &str,
    ) {
        if let Some(exec) = self
            .executions
            .iter_mut()
            .find(|e| e.name == method && e.status == ScriptStatus::Parked)
        {
            info!(script = %exec.name, "woken");
            exec.status = ScriptStatus::Ready;
        }
    }

    /// Force a script's scheduling status. Arming a script re-primes its
    /// state from the top.
    pub fn set_status(
        &mut self,
        method: &str,
        status: ScriptStatus,
    ) {
        let Some(exec) = self.executions.iter_mut().find(|e| e.name == method) else {
            return;
        };

        if status == ScriptStatus::Ready {
            if let Err(e) = self.interpreter.reset_state(&mut exec.state) {
                error!(script = %exec.name, "failed to re-arm: {e}");
                exec.status = ScriptStatus::Failed;
                return;
            }
        }
        exec.status = status;
    }

    /// Run one engine tick: resume every Ready or Suspended script once.
    pub fn run_tick(&mut self) {
        self.tick += 1;

        for i in 0..self.executions.len() {
            if !matches!(
                self.executions[i].status,
                ScriptStatus::Ready | ScriptStatus::Suspended
            ) {
                continue;
            }

            let exec = &mut self.executions[i];
            match self.interpreter.resume(&mut exec.state) {
                Ok(true) => {
                    trace!(script = %exec.name, result = %exec.state.result(), "completed");
                    if exec.lifecycle == Lifecycle::Continuous {
                        match self.interpreter.reset_state(&mut exec.state) {
                            Ok(()) => exec.status = ScriptStatus::Ready,
                            Err(e) => {
                                error!(script = %exec.name, "failed to re-arm: {e}");
                                exec.status = ScriptStatus::Failed;
                            }
                        }
                    } else {
                        exec.status = ScriptStatus::Terminated;
                    }
                }
                Ok(false) => exec.status = ScriptStatus::Suspended,
                Err(e) => {
                    error!(script = %exec.name, "script failed: {e}");
                    exec.status = ScriptStatus::Failed;
                }
            }
        }
    }
}
