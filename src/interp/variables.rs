//! Script-global variable slots
//!
//! Built once per level: each definition's initializer node is evaluated
//! with the recursive evaluator, in declaration order, and the produced
//! value is cast to the declared type. Afterwards the definitions are
//! never consulted again; only `set` mutates a slot.
//!
//! Initializers may read slots declared before them, so the store grows
//! one slot at a time while the remaining initializers run.

use tracing::debug;

use crate::error::VmError;
use crate::graph::{ScriptDataType, ScriptGraph};
use crate::host::HostSurface;
use crate::interp::recursive::RecursiveInterpreter;
use crate::value::Value;

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    data_type: ScriptDataType,
    value: Value,
}

/// Mutable script-global variable slots, indexed by declaration order.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    slots: Vec<Slot>,
}

impl VariableStore {
    /// Evaluate every variable definition in `graph` into a slot.
    pub fn initialize(
        graph: &ScriptGraph,
        host: &mut dyn HostSurface,
    ) -> Result<Self, VmError> {
        let mut store = Self {
            slots: Vec::with_capacity(graph.variables().len()),
        };

        for definition in graph.variables() {
            let value = {
                let mut init = RecursiveInterpreter::new(graph, &mut *host, &mut store);
                init.evaluate(definition.init_node)?
            };
            let from = value.data_type();
            let value = value
                .cast(definition.data_type)
                .ok_or(VmError::TypeMismatch {
                    from,
                    to: definition.data_type,
                })?;

            debug!(
                "variable `{}` initialized to {} ({})",
                definition.name, value, definition.data_type
            );

            store.slots.push(Slot {
                name: definition.name.clone(),
                data_type: definition.data_type,
                value,
            });
        }

        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current value of a slot. An out-of-range index is a caller bug and
    /// panics; slot indices come from the graph, which was validated.
    pub fn get(
        &self,
        index: u16,
    ) -> &Value {
        &self.slots[index as usize].value
    }

    pub fn name(
        &self,
        index: u16,
    ) -> &str {
        &self.slots[index as usize].name
    }

    /// Overwrite a slot, casting to its declared type when the kinds
    /// differ. Only the `set` builtin calls this during execution.
    pub fn set(
        &mut self,
        index: u16,
        value: Value,
    ) -> Result<(), VmError> {
        let slot = &mut self.slots[index as usize];

        if value.data_type() == slot.data_type {
            slot.value = value;
            return Ok(());
        }

        let from = value.data_type();
        slot.value = value.cast(slot.data_type).ok_or(VmError::TypeMismatch {
            from,
            to: slot.data_type,
        })?;
        Ok(())
    }
}
