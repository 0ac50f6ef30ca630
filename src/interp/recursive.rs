//! Depth-first, must-complete evaluator
//!
//! Walks a node and its descendants with native recursion and returns the
//! resulting value. It cannot park: reaching `sleep` or `sleep_until` is a
//! [`VmError::CannotSuspend`]. The two places that need exactly this shape
//! are variable initializers (run once, at store construction) and
//! `sleep_until` condition rechecks (run once per tick, side effects
//! included, never cached).

use smallvec::SmallVec;

use crate::error::VmError;
use crate::graph::{ops, Node, NodeType, ScriptDataType, ScriptGraph};
use crate::host::HostSurface;
use crate::interp::operators;
use crate::interp::variables::VariableStore;
use crate::value::Value;

pub struct RecursiveInterpreter<'a> {
    graph: &'a ScriptGraph,
    host: &'a mut dyn HostSurface,
    store: &'a mut VariableStore,
}

impl<'a> RecursiveInterpreter<'a> {
    pub fn new(
        graph: &'a ScriptGraph,
        host: &'a mut dyn HostSurface,
        store: &'a mut VariableStore,
    ) -> Self {
        Self { graph, host, store }
    }

    /// Evaluate the subtree rooted at `index` to completion.
    pub fn evaluate(
        &mut self,
        index: u16,
    ) -> Result<Value, VmError> {
        let node = *self.graph.node_at(index)?;
        self.eval(&node)
    }

    fn eval(
        &mut self,
        node: &Node,
    ) -> Result<Value, VmError> {
        match node.node_type {
            NodeType::Scope => {
                let target = node.target().ok_or(crate::graph::GraphError::MalformedInvocation {
                    index: crate::graph::NONE,
                    reason: "scope has no inner node",
                })?;
                let inner = *self.graph.follow(target)?;
                let value = self.eval(&inner)?;
                self.finish(node, value)
            }
            NodeType::Expression => operators::decode_literal(node, self.graph, self.host),
            NodeType::VariableAccess => Ok(self.store.get(node.payload_h16()).clone()),
            NodeType::BuiltinInvocation => self.eval_invocation(node),
            NodeType::ScriptInvocation => {
                let method = self.graph.method_at(node.operation_id)?;
                let value = self.evaluate(method.entry)?;
                self.finish(node, value)
            }
        }
    }

    fn eval_invocation(
        &mut self,
        node: &Node,
    ) -> Result<Value, VmError> {
        let head = *self.graph.invocation_head(node)?;
        let op = node.operation_id;

        let value = match op {
            // No suspension machinery here; these belong to the iterative
            // evaluator
            ops::SLEEP | ops::SLEEP_UNTIL => return Err(VmError::CannotSuspend),

            // Without a resumable frame there is nothing to randomize
            // against, so begin_random degenerates to begin
            ops::BEGIN | ops::BEGIN_RANDOM => {
                let mut last = Value::Void;
                for arg in self.arg_nodes(&head)? {
                    last = self.eval(&arg)?;
                }
                last
            }

            ops::IF => self.eval_if(&head)?,

            // The recursive evaluator always folds every operand; only the
            // iterative evaluator carries the short-circuit policy
            ops::AND => {
                let mut acc = true;
                for arg in self.arg_nodes(&head)? {
                    let operand = self.eval(&arg)?;
                    acc &= operand
                        .as_boolean()
                        .ok_or_else(|| operators::operand_error(op, &operand))?;
                }
                Value::Boolean(acc)
            }
            ops::OR => {
                let mut acc = false;
                for arg in self.arg_nodes(&head)? {
                    let operand = self.eval(&arg)?;
                    acc |= operand
                        .as_boolean()
                        .ok_or_else(|| operators::operand_error(op, &operand))?;
                }
                Value::Boolean(acc)
            }

            ops::NOT => {
                let operand = self.eval_single(&head, "not takes exactly one operand")?;
                let b = operand
                    .as_boolean()
                    .ok_or_else(|| operators::operand_error(op, &operand))?;
                Value::Boolean(!b)
            }

            ops::SET => self.eval_set(&head)?,

            _ if operators::is_arithmetic(op) => {
                let mut args = self.eval_args(&head)?.into_iter();
                let mut acc = args.next().ok_or(self.malformed("operator needs operands"))?;
                for rhs in args {
                    acc = operators::apply_arithmetic(op, acc, &rhs)?;
                }
                acc
            }

            _ if operators::is_comparison(op) => {
                let args = self.eval_args(&head)?;
                let [left, right] = args.as_slice() else {
                    return Err(self.malformed("comparison takes exactly two operands"));
                };
                operators::compare(op, left, right)?
            }

            ops::PRINT => {
                let operand = self.eval_single(&head, "print takes exactly one operand")?;
                let Value::String(text) = &operand else {
                    return Err(operators::operand_error(op, &operand));
                };
                self.host.emit_text(text);
                Value::Void
            }

            ops::GAME_IS_PLAYTEST => Value::Boolean(self.host.game_is_playtest()),

            _ => {
                let args = self.eval_args(&head)?.into_vec();
                let name = self
                    .graph
                    .string_at(head.string_index)
                    .unwrap_or_else(|_| ops::name(op));
                self.host.invoke_builtin(op, name, args)?
            }
        };

        self.finish(node, value)
    }

    fn eval_if(
        &mut self,
        head: &Node,
    ) -> Result<Value, VmError> {
        let cond_ref = head
            .next()
            .ok_or(self.malformed("if requires a condition"))?;
        let cond_node = *self.graph.follow(cond_ref)?;
        let condition = self.eval(&cond_node)?;
        let condition = condition
            .as_boolean()
            .ok_or_else(|| operators::operand_error(ops::IF, &condition))?;

        let true_ref = cond_node
            .next()
            .ok_or(self.malformed("if requires a branch"))?;
        let true_node = *self.graph.follow(true_ref)?;

        if condition {
            self.eval(&true_node)
        } else {
            match true_node.next() {
                Some(false_ref) => {
                    let false_node = *self.graph.follow(false_ref)?;
                    self.eval(&false_node)
                }
                None => Ok(Value::Void),
            }
        }
    }

    fn eval_set(
        &mut self,
        head: &Node,
    ) -> Result<Value, VmError> {
        let dest_ref = head
            .next()
            .ok_or(self.malformed("set requires a destination"))?;
        let dest_node = *self.graph.follow(dest_ref)?;
        if dest_node.node_type != NodeType::VariableAccess {
            return Err(self.malformed("set destination must be a variable"));
        }

        let value_ref = dest_node
            .next()
            .ok_or(self.malformed("set requires a value"))?;
        let value_node = *self.graph.follow(value_ref)?;
        let value = self.eval(&value_node)?;

        self.store.set(dest_node.payload_h16(), value)?;
        Ok(Value::Void)
    }

    /// Collect the argument chain behind an invocation head, unevaluated.
    fn arg_nodes(
        &self,
        head: &Node,
    ) -> Result<SmallVec<[Node; 6]>, VmError> {
        let mut nodes = SmallVec::new();
        let mut next = head.next();
        while let Some(reference) = next {
            let node = *self.graph.follow(reference)?;
            next = node.next();
            nodes.push(node);
        }
        Ok(nodes)
    }

    fn eval_args(
        &mut self,
        head: &Node,
    ) -> Result<SmallVec<[Value; 6]>, VmError> {
        let nodes = self.arg_nodes(head)?;
        let mut values = SmallVec::with_capacity(nodes.len());
        for node in &nodes {
            values.push(self.eval(node)?);
        }
        Ok(values)
    }

    fn eval_single(
        &mut self,
        head: &Node,
        what: &'static str,
    ) -> Result<Value, VmError> {
        let args = self.eval_args(head)?;
        let [operand] = args.as_slice() else {
            return Err(self.malformed(what));
        };
        Ok(operand.clone())
    }

    /// Cast a produced value to the declaring node's type.
    fn finish(
        &self,
        node: &Node,
        value: Value,
    ) -> Result<Value, VmError> {
        if node.data_type == ScriptDataType::Void {
            return Ok(Value::Void);
        }
        if value.data_type() == node.data_type {
            return Ok(value);
        }
        let from = value.data_type();
        value.cast(node.data_type).ok_or(VmError::TypeMismatch {
            from,
            to: node.data_type,
        })
    }

    fn malformed(
        &self,
        reason: &'static str,
    ) -> VmError {
        crate::graph::GraphError::MalformedInvocation {
            index: crate::graph::NONE,
            reason,
        }
        .into()
    }
}
