//! Resumable interpreter state
//!
//! An [`InterpreterState`] is the whole of a script's in-progress
//! evaluation: a stack of [`Frame`]s for the invocations currently being
//! argued, the suspension the script is parked on (if any), and the final
//! result once the stack drains. Nothing lives on the host call stack, so
//! the engine can hold any number of these across ticks.

use std::collections::VecDeque;

use smallvec::SmallVec;

use crate::error::VmError;
use crate::graph::{Node, NodeRef};
use crate::value::Value;

/// Fixed frame-stack depth; real mission scripts stay well under this.
pub(crate) const MAX_FRAMES: usize = 32;

/// One in-progress invocation.
///
/// `current` tracks the last child consumed from the argument chain;
/// `next` is the child queued for evaluation, if any. Operand values land
/// in `locals` in argument order.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    /// Invocation node that opened this frame; its `data_type` is the
    /// cast target when the frame completes
    pub originating: Node,
    /// Cursor into the argument chain
    pub current: Node,
    /// Child queued for evaluation
    pub next: Option<NodeRef>,
    /// Evaluated operands, in argument order
    pub locals: VecDeque<Value>,
    /// Running boolean for `and`/`or` folds
    pub acc: Option<bool>,
    /// Slot named by the first variable operand; `set`'s destination
    pub dest_slot: Option<u16>,
    /// Remaining child order for `begin_random` (popped back to front)
    pub schedule: Option<SmallVec<[NodeRef; 6]>>,
}

impl Frame {
    pub fn new(
        originating: Node,
        current: Node,
    ) -> Self {
        Self {
            originating,
            current,
            next: None,
            locals: VecDeque::with_capacity(4),
            acc: None,
            dest_slot: None,
            schedule: None,
        }
    }
}

/// Why a state is parked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suspension {
    /// `sleep`: remaining tick count, decremented once per resume
    Ticks(u32),
    /// `sleep_until`: condition subtree re-evaluated once per call
    Until { condition: NodeRef },
}

/// Opaque, resumable continuation for one script evaluation.
///
/// Created by [`IterativeInterpreter::interpret`] or `create_state`;
/// mutated in place by each `resume`; reusable after `reset_state`.
///
/// [`IterativeInterpreter::interpret`]: super::IterativeInterpreter::interpret
#[derive(Debug, Clone)]
pub struct InterpreterState {
    pub(crate) origin: u16,
    pub(crate) frames: SmallVec<[Frame; 8]>,
    pub(crate) suspension: Option<Suspension>,
    pub(crate) result: Value,
}

impl InterpreterState {
    pub(crate) fn new(origin: u16) -> Self {
        Self {
            origin,
            frames: SmallVec::new(),
            suspension: None,
            result: Value::Void,
        }
    }

    /// Node index this state evaluates from.
    pub fn origin(&self) -> u16 {
        self.origin
    }

    /// Final value; meaningful only after termination was reported.
    pub fn result(&self) -> &Value {
        &self.result
    }

    pub fn is_suspended(&self) -> bool {
        self.suspension.is_some()
    }

    pub fn suspension(&self) -> Option<&Suspension> {
        self.suspension.as_ref()
    }

    /// Whether evaluation has run to completion.
    pub fn is_terminated(&self) -> bool {
        self.frames.is_empty() && self.suspension.is_none()
    }

    pub(crate) fn reset(&mut self) {
        self.frames.clear();
        self.suspension = None;
        self.result = Value::Void;
    }

    pub(crate) fn push(
        &mut self,
        frame: Frame,
    ) -> Result<(), VmError> {
        if self.frames.len() >= MAX_FRAMES {
            return Err(VmError::StackOverflow(MAX_FRAMES));
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Panics when the stack is empty; callers only pop frames they pushed.
    pub(crate) fn pop(&mut self) -> Frame {
        match self.frames.pop() {
            Some(frame) => frame,
            None => panic!("popped an empty interpreter frame stack"),
        }
    }

    /// Panics when the stack is empty.
    pub(crate) fn top(&mut self) -> &mut Frame {
        match self.frames.last_mut() {
            Some(frame) => frame,
            None => panic!("no active interpreter frame"),
        }
    }
}
