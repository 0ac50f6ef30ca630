//! Iterative, resumable evaluator
//!
//! Evaluates the same graph as the recursive walker, but keeps every
//! in-progress invocation in an explicit [`Frame`] stack instead of the
//! host call stack. That buys the two things mission scripts need: nesting
//! depth bounded by data rather than native stack, and the ability to park
//! at `sleep`/`sleep_until` and resume on a later tick from exactly the
//! same spot.
//!
//! # Architecture
//!
//! The main loop always defers to the invocation that opened the top
//! frame. A frame either has a child queued (`next`), in which case that
//! child is evaluated (leaves enqueue a value directly, invocations push a
//! new frame), or it has no child queued and its operator is dispatched.
//! Control constructs (`begin`, `if`, `and`/`or`, `set`, the sleeps)
//! request arguments one at a time and decide after each; every other
//! operator consumes its whole argument list before running. Completing a
//! frame casts the produced value to the originating node's declared type
//! and hands it to the parent frame's operand queue.

use rand::seq::{IndexedRandom, SliceRandom};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::error::VmError;
use crate::graph::{ops, GraphError, Node, NodeRef, NodeType, ScriptDataType, ScriptGraph, NONE};
use crate::host::HostSurface;
use crate::interp::operators;
use crate::interp::recursive::RecursiveInterpreter;
use crate::interp::state::{Frame, InterpreterState, Suspension};
use crate::interp::variables::VariableStore;
use crate::value::Value;

/// Child-selection policy for `begin_random`.
///
/// The upstream data never pins this down, so it is a configuration
/// choice instead of a hard-coded guess.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BeginRandomPolicy {
    /// Execute every child once, in a random order; the last executed
    /// child's value is the result
    #[default]
    Shuffle,
    /// Execute one uniformly chosen child and take its value
    Single,
}

/// Evaluation policy knobs.
#[derive(Debug, Clone, Copy)]
pub struct InterpreterConfig {
    /// Stop folding `and`/`or` (skipping later operands and their side
    /// effects) once the result is determined
    pub short_circuit: bool,
    pub begin_random: BeginRandomPolicy,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            short_circuit: true,
            begin_random: BeginRandomPolicy::default(),
        }
    }
}

/// The resumable evaluator. One per script graph; any number of
/// [`InterpreterState`]s may be driven through it.
pub struct IterativeInterpreter<'a, H> {
    graph: &'a ScriptGraph,
    host: H,
    store: VariableStore,
    config: InterpreterConfig,
}

impl<'a, H: HostSurface> IterativeInterpreter<'a, H> {
    /// Build an interpreter and eagerly initialize the variable store from
    /// the graph's definitions.
    pub fn new(
        graph: &'a ScriptGraph,
        host: H,
    ) -> Result<Self, VmError> {
        Self::with_config(graph, host, InterpreterConfig::default())
    }

    pub fn with_config(
        graph: &'a ScriptGraph,
        mut host: H,
        config: InterpreterConfig,
    ) -> Result<Self, VmError> {
        let store = VariableStore::initialize(graph, &mut host)?;
        Ok(Self {
            graph,
            host,
            store,
            config,
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn variables(&self) -> &VariableStore {
        &self.store
    }

    /// Current value of a script-global slot. Out-of-range indices panic;
    /// see [`VariableStore::get`].
    pub fn get_variable(
        &self,
        index: u16,
    ) -> &Value {
        self.store.get(index)
    }

    /// Fresh state primed to evaluate from `start`.
    pub fn create_state(
        &self,
        start: u16,
    ) -> Result<InterpreterState, VmError> {
        let mut state = InterpreterState::new(start);
        self.reset_state(&mut state)?;
        Ok(state)
    }

    /// Re-prime a state for another evaluation of its origin node.
    pub fn reset_state(
        &self,
        state: &mut InterpreterState,
    ) -> Result<(), VmError> {
        state.reset();
        let node = *self.graph.node_at(state.origin)?;
        self.push_root(&node, state)
    }

    /// Evaluate from `start` until completion or the first suspension.
    ///
    /// Returns `(true, state)` with `state.result()` populated on
    /// completion, `(false, state)` when the script parked at a sleep.
    pub fn interpret(
        &mut self,
        start: u16,
    ) -> Result<(bool, InterpreterState), VmError> {
        let mut state = self.create_state(start)?;
        let terminated = self.run(&mut state)?;
        Ok((terminated, state))
    }

    /// Drive a parked state one step further.
    ///
    /// One call is one engine tick: a tick-sleep loses one tick, a
    /// `sleep_until` re-checks its condition exactly once. The state must
    /// have come from this interpreter and must not be terminated.
    pub fn resume(
        &mut self,
        state: &mut InterpreterState,
    ) -> Result<bool, VmError> {
        debug_assert!(
            !state.is_terminated(),
            "resumed a terminated interpreter state"
        );

        if let Some(suspension) = state.suspension.take() {
            match suspension {
                Suspension::Ticks(remaining) => {
                    let remaining = remaining.saturating_sub(1);
                    if remaining > 0 {
                        state.suspension = Some(Suspension::Ticks(remaining));
                        return Ok(false);
                    }
                    trace!("sleep elapsed");
                }
                Suspension::Until { condition } => {
                    if self.check_condition(condition)? {
                        trace!("sleep_until condition satisfied");
                        Self::complete_frame_void(state);
                    } else {
                        state.suspension = Some(Suspension::Until { condition });
                        return Ok(false);
                    }
                }
            }
        }

        self.run(state)
    }

    fn run(
        &mut self,
        state: &mut InterpreterState,
    ) -> Result<bool, VmError> {
        while !state.frames.is_empty() && state.suspension.is_none() {
            // The invocation that opened the top frame decides what to do
            match state.top().originating.node_type {
                NodeType::BuiltinInvocation => self.step_builtin(state)?,
                NodeType::Scope => self.step_scope(state)?,
                NodeType::ScriptInvocation => self.step_script(state)?,
                other => unreachable!("{other:?} frame on the interpreter stack"),
            }
        }
        Ok(state.suspension.is_none())
    }

    fn step_builtin(
        &mut self,
        state: &mut InterpreterState,
    ) -> Result<(), VmError> {
        // A queued child is evaluated before the operator sees anything;
        // clearing `next` lets the operator request further arguments
        if let Some(next) = state.top().next.take() {
            let node = *self.graph.follow(next)?;
            self.interpret_child(&node, state)
        } else {
            self.dispatch(state)
        }
    }

    fn step_scope(
        &mut self,
        state: &mut InterpreterState,
    ) -> Result<(), VmError> {
        if let Some(next) = state.top().next.take() {
            let node = *self.graph.follow(next)?;
            self.interpret_child(&node, state)
        } else {
            let value = state.top().locals.pop_front().unwrap_or(Value::Void);
            Self::complete_frame(state, value)
        }
    }

    fn step_script(
        &mut self,
        state: &mut InterpreterState,
    ) -> Result<(), VmError> {
        if state.top().next.is_none() {
            // First visit: queue the callee body. `next` stays set while
            // the body runs, marking the call as started.
            let method_id = state.top().current.operation_id;
            let method = self.graph.method_at(method_id)?;
            let entry = method.entry;
            trace!(method = %method.name, "script call");

            let body = *self.graph.node_at(entry)?;
            state.top().next = Some(NodeRef {
                index: entry,
                checkval: body.checkval,
            });
            self.interpret_child(&body, state)
        } else if state.top().originating.data_type == ScriptDataType::Void {
            Self::complete_frame_void(state);
            Ok(())
        } else {
            let value = state
                .top()
                .locals
                .pop_front()
                .ok_or(Self::malformed(NONE, "script call produced no value"))?;
            Self::complete_frame(state, value)
        }
    }

    fn interpret_child(
        &mut self,
        node: &Node,
        state: &mut InterpreterState,
    ) -> Result<(), VmError> {
        match node.node_type {
            NodeType::BuiltinInvocation | NodeType::ScriptInvocation => {
                self.push_invocation(node, state)
            }
            NodeType::Scope => self.push_scope(node, state),
            NodeType::Expression => {
                let value = operators::decode_literal(node, self.graph, &mut self.host)?;
                let top = state.top();
                top.locals.push_back(value);
                top.current = *node;
                Ok(())
            }
            NodeType::VariableAccess => {
                let slot = node.payload_h16();
                let value = self.store.get(slot).clone();
                let top = state.top();
                // First variable operand in a frame names `set`'s target
                if top.dest_slot.is_none() {
                    top.dest_slot = Some(slot);
                }
                top.locals.push_back(value);
                top.current = *node;
                Ok(())
            }
        }
    }

    fn push_invocation(
        &self,
        node: &Node,
        state: &mut InterpreterState,
    ) -> Result<(), VmError> {
        let head = *self.graph.invocation_head(node)?;

        // The parent resumes its argument chain from this node
        if let Some(top) = state.frames.last_mut() {
            top.current = *node;
        }

        state.push(Frame::new(*node, head))
    }

    fn push_scope(
        &self,
        node: &Node,
        state: &mut InterpreterState,
    ) -> Result<(), VmError> {
        let target = node
            .target()
            .ok_or(Self::malformed(NONE, "scope has no inner node"))?;

        if let Some(top) = state.frames.last_mut() {
            top.current = *node;
        }

        let mut frame = Frame::new(*node, *node);
        frame.next = Some(target);
        state.push(frame)
    }

    fn dispatch(
        &mut self,
        state: &mut InterpreterState,
    ) -> Result<(), VmError> {
        let op = state.top().originating.operation_id;

        // Control constructs manage their own argument evaluation
        match op {
            ops::BEGIN => return self.op_begin(state),
            ops::BEGIN_RANDOM => return self.op_begin_random(state),
            ops::IF => return self.op_if(state),
            ops::AND | ops::OR => return self.op_and_or(state, op),
            ops::SET => return self.op_set(state),
            ops::SLEEP_UNTIL => return self.op_sleep_until(state),
            _ => {}
        }

        // Everything else consumes its whole argument list first
        if Self::prepare_next_argument(state) {
            return Ok(());
        }

        trace!(op = ops::name(op), "dispatch");

        match op {
            ops::SLEEP => self.op_sleep(state),
            ops::NOT => self.op_not(state),
            _ if operators::is_comparison(op) => self.op_compare(state, op),
            _ if operators::is_arithmetic(op) => self.op_arithmetic(state, op),
            _ => self.op_host(state, op),
        }
    }

    fn op_begin(
        &mut self,
        state: &mut InterpreterState,
    ) -> Result<(), VmError> {
        let pending = Self::prepare_next_argument(state);
        let result = state.top().locals.pop_front();

        if pending {
            return Ok(());
        }

        if state.top().originating.data_type == ScriptDataType::Void {
            Self::complete_frame_void(state);
            Ok(())
        } else {
            Self::complete_frame(state, result.unwrap_or(Value::Void))
        }
    }

    fn op_begin_random(
        &mut self,
        state: &mut InterpreterState,
    ) -> Result<(), VmError> {
        if state.top().schedule.is_none() {
            let mut children: SmallVec<[NodeRef; 6]> = SmallVec::new();
            let mut next = state.top().current.next();
            while let Some(reference) = next {
                let node = *self.graph.follow(reference)?;
                next = node.next();
                children.push(reference);
            }

            let mut rng = rand::rng();
            match self.config.begin_random {
                BeginRandomPolicy::Shuffle => children.shuffle(&mut rng),
                BeginRandomPolicy::Single => {
                    if let Some(&pick) = children.choose(&mut rng) {
                        children.clear();
                        children.push(pick);
                    }
                }
            }
            // Popped back to front while executing
            children.reverse();
            state.top().schedule = Some(children);
        }

        let scheduled = {
            let top = state.top();
            let result = top.locals.pop_front();
            let next = top.schedule.as_mut().and_then(|s| s.pop());
            if let Some(reference) = next {
                top.next = Some(reference);
            }
            (next.is_some(), result)
        };

        match scheduled {
            (true, _) => Ok(()),
            (false, result) => {
                if state.top().originating.data_type == ScriptDataType::Void {
                    Self::complete_frame_void(state);
                    Ok(())
                } else {
                    Self::complete_frame(state, result.unwrap_or(Value::Void))
                }
            }
        }
    }

    fn op_if(
        &mut self,
        state: &mut InterpreterState,
    ) -> Result<(), VmError> {
        match state.top().locals.len() {
            0 => {
                if !Self::prepare_next_argument(state) {
                    return Err(Self::malformed(NONE, "if requires a condition"));
                }
                Ok(())
            }
            1 => {
                let condition = {
                    let top = state.top();
                    match top.locals.front() {
                        Some(value) => value
                            .as_boolean()
                            .ok_or_else(|| operators::operand_error(ops::IF, value))?,
                        None => unreachable!("length checked above"),
                    }
                };

                if !Self::prepare_next_argument(state) {
                    return Err(Self::malformed(NONE, "if requires a branch"));
                }

                if state.top().originating.data_type == ScriptDataType::Void {
                    // Void branches complete without a value; park a
                    // placeholder so the completion arm still fires
                    state.top().locals.push_back(Value::Void);
                }

                if !condition {
                    // Skip over the queued true branch
                    let true_ref = match state.top().next {
                        Some(reference) => reference,
                        None => unreachable!("argument was just prepared"),
                    };
                    let true_node = *self.graph.follow(true_ref)?;
                    match true_node.next() {
                        Some(false_ref) => state.top().next = Some(false_ref),
                        None => {
                            if state.top().originating.data_type != ScriptDataType::Void {
                                return Err(Self::malformed(
                                    true_ref.index,
                                    "non-void if requires a false branch",
                                ));
                            }
                            Self::complete_frame_void(state);
                        }
                    }
                }
                Ok(())
            }
            _ => {
                if state.top().originating.data_type == ScriptDataType::Void {
                    Self::complete_frame_void(state);
                    Ok(())
                } else {
                    let result = {
                        let top = state.top();
                        let _condition = top.locals.pop_front();
                        top.locals.pop_front()
                    };
                    let result =
                        result.ok_or(Self::malformed(NONE, "if produced no branch value"))?;
                    Self::complete_frame(state, result)
                }
            }
        }
    }

    fn op_and_or(
        &mut self,
        state: &mut InterpreterState,
        op: u16,
    ) -> Result<(), VmError> {
        let pending = Self::prepare_next_argument(state);
        let identity = op == ops::AND;

        let determined = {
            let top = state.top();
            if let Some(operand) = top.locals.pop_front() {
                let b = operand
                    .as_boolean()
                    .ok_or_else(|| operators::operand_error(op, &operand))?;
                let acc = top.acc.get_or_insert(identity);
                if op == ops::AND {
                    *acc &= b;
                } else {
                    *acc |= b;
                }
                *acc != identity && self.config.short_circuit
            } else {
                false
            }
        };

        if determined {
            return Self::complete_frame(state, Value::Boolean(!identity));
        }

        if pending {
            Ok(())
        } else {
            let result = state.top().acc.unwrap_or(identity);
            Self::complete_frame(state, Value::Boolean(result))
        }
    }

    fn op_set(
        &mut self,
        state: &mut InterpreterState,
    ) -> Result<(), VmError> {
        if state.top().locals.len() != 2 {
            if !Self::prepare_next_argument(state) {
                return Err(Self::malformed(NONE, "set requires a destination and a value"));
            }
            return Ok(());
        }

        let (slot, value) = {
            let top = state.top();
            let slot = top
                .dest_slot
                .ok_or(Self::malformed(NONE, "set destination must be a variable"))?;
            // First local is the destination's current value, unused
            let _previous = top.locals.pop_front();
            let value = top
                .locals
                .pop_front()
                .ok_or(Self::malformed(NONE, "set requires a value"))?;
            (slot, value)
        };

        debug!("set `{}` = {}", self.store.name(slot), value);
        self.store.set(slot, value)?;
        Self::complete_frame_void(state);
        Ok(())
    }

    fn op_sleep(
        &mut self,
        state: &mut InterpreterState,
    ) -> Result<(), VmError> {
        let arg = state
            .top()
            .locals
            .pop_front()
            .ok_or(Self::malformed(NONE, "sleep requires a tick count"))?;
        let ticks = arg
            .as_int()
            .ok_or_else(|| operators::operand_error(ops::SLEEP, &arg))?;

        if ticks > 0 {
            debug!(ticks, "sleep");
            state.suspension = Some(Suspension::Ticks(ticks as u32));
        }
        Self::complete_frame_void(state);
        Ok(())
    }

    fn op_sleep_until(
        &mut self,
        state: &mut InterpreterState,
    ) -> Result<(), VmError> {
        let condition = state
            .top()
            .current
            .next()
            .ok_or(Self::malformed(NONE, "sleep_until requires a condition"))?;
        let cond_node = *self.graph.follow(condition)?;
        if cond_node.next().is_some() {
            return Err(Self::malformed(
                condition.index,
                "sleep_until takes a single condition",
            ));
        }

        if self.check_condition(condition)? {
            Self::complete_frame_void(state);
        } else {
            debug!("sleep_until parked");
            state.suspension = Some(Suspension::Until { condition });
        }
        Ok(())
    }

    /// Re-evaluate a `sleep_until` condition from scratch. Side effects in
    /// the condition subtree fire on every check; that is the contract.
    fn check_condition(
        &mut self,
        condition: NodeRef,
    ) -> Result<bool, VmError> {
        self.graph.follow(condition)?;
        let value = {
            let mut eval = RecursiveInterpreter::new(self.graph, &mut self.host, &mut self.store);
            eval.evaluate(condition.index)?
        };
        value
            .as_boolean()
            .ok_or_else(|| operators::operand_error(ops::SLEEP_UNTIL, &value))
    }

    fn op_not(
        &mut self,
        state: &mut InterpreterState,
    ) -> Result<(), VmError> {
        let arg = state
            .top()
            .locals
            .pop_front()
            .ok_or(Self::malformed(NONE, "not takes exactly one operand"))?;
        let b = arg
            .as_boolean()
            .ok_or_else(|| operators::operand_error(ops::NOT, &arg))?;
        Self::complete_frame(state, Value::Boolean(!b))
    }

    fn op_compare(
        &mut self,
        state: &mut InterpreterState,
        op: u16,
    ) -> Result<(), VmError> {
        let operands = {
            let top = state.top();
            (top.locals.pop_front(), top.locals.pop_front())
        };
        let (Some(left), Some(right)) = operands else {
            return Err(Self::malformed(NONE, "comparison takes exactly two operands"));
        };

        let value = operators::compare(op, &left, &right)?;
        Self::complete_frame(state, value)
    }

    fn op_arithmetic(
        &mut self,
        state: &mut InterpreterState,
        op: u16,
    ) -> Result<(), VmError> {
        let mut acc = state
            .top()
            .locals
            .pop_front()
            .ok_or(Self::malformed(NONE, "operator needs operands"))?;
        while let Some(rhs) = state.top().locals.pop_front() {
            acc = operators::apply_arithmetic(op, acc, &rhs)?;
        }
        Self::complete_frame(state, acc)
    }

    fn op_host(
        &mut self,
        state: &mut InterpreterState,
        op: u16,
    ) -> Result<(), VmError> {
        let originating = state.top().originating;
        let args: Vec<Value> = state.top().locals.drain(..).collect();

        let value = match op {
            ops::PRINT => match args.first() {
                Some(Value::String(text)) => {
                    self.host.emit_text(text);
                    Value::Void
                }
                Some(other) => return Err(operators::operand_error(op, other)),
                None => return Err(Self::malformed(NONE, "print takes exactly one operand")),
            },
            ops::GAME_IS_PLAYTEST => Value::Boolean(self.host.game_is_playtest()),
            _ => {
                // Invocation nodes carry the builtin's name in the string
                // blob; fall back to the id table for synthetic graphs
                let name = self
                    .graph
                    .string_at(originating.string_index)
                    .unwrap_or_else(|_| ops::name(op));
                self.host.invoke_builtin(op, name, args)?
            }
        };

        if originating.data_type == ScriptDataType::Void {
            Self::complete_frame_void(state);
            Ok(())
        } else {
            Self::complete_frame(state, value)
        }
    }

    fn prepare_next_argument(state: &mut InterpreterState) -> bool {
        let top = state.top();
        match top.current.next() {
            Some(reference) => {
                top.next = Some(reference);
                true
            }
            None => false,
        }
    }

    fn push_root(
        &self,
        node: &Node,
        state: &mut InterpreterState,
    ) -> Result<(), VmError> {
        match node.node_type {
            NodeType::BuiltinInvocation | NodeType::ScriptInvocation => {
                self.push_invocation(node, state)
            }
            NodeType::Scope => self.push_scope(node, state),
            _ => {
                // Bare literals and variable reads still need a frame to
                // complete into; wrap them in a synthesized begin
                let origin = state.origin;
                let (invocation, head) =
                    Node::synthesized_begin(node.data_type, origin, node.checkval);
                state.push(Frame::new(invocation, head))
            }
        }
    }

    /// Pop the top frame and hand `value`, cast to the originating node's
    /// declared type, to the parent (or to the state's result slot).
    fn complete_frame(
        state: &mut InterpreterState,
        value: Value,
    ) -> Result<(), VmError> {
        let frame = state.pop();
        let dest = frame.originating.data_type;

        let value = if value.data_type() == dest {
            value
        } else {
            let from = value.data_type();
            value
                .cast(dest)
                .ok_or(VmError::TypeMismatch { from, to: dest })?
        };

        if state.frames.is_empty() {
            state.result = value;
        } else {
            state.top().locals.push_back(value);
        }
        Ok(())
    }

    /// Pop the top frame without handing the parent a value.
    fn complete_frame_void(state: &mut InterpreterState) {
        let _ = state.pop();
    }

    fn malformed(
        index: u16,
        reason: &'static str,
    ) -> VmError {
        GraphError::MalformedInvocation { index, reason }.into()
    }
}
