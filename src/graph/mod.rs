//! Script graph: read-only view over one level's decoded script tables
//!
//! The external loader decodes a level into four flat tables: syntax
//! nodes, a NUL-separated string blob, variable definitions, and method
//! definitions. This module owns structural access to those tables and
//! nothing else; there are no mutation operations, and every cross-index
//! traversal is bounds- and checksum-validated so corrupt or mis-offset
//! data fails at the lookup instead of producing a wrong value.

pub mod node;
pub mod ops;

pub use node::{Node, NodeRef, NodeType, Operation, ScriptDataType, NONE};

use thiserror::Error;

/// Structural-integrity failures while traversing the graph.
///
/// All of these indicate untrustworthy upstream data (a loader bug or a
/// corrupt map); the current script run is aborted, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Node index past the end of the node table
    #[error("node index {index} out of bounds (node count {count})")]
    NodeOutOfBounds { index: u16, count: usize },
    /// Reference checkval disagrees with the target node's own checkval
    #[error("node {index} checksum mismatch (expected {expected:#06x}, found {found:#06x})")]
    ChecksumMismatch {
        index: u16,
        expected: u16,
        found: u16,
    },
    /// String offset past the end of the string blob
    #[error("string offset {0} out of bounds")]
    StringOutOfBounds(u16),
    /// String bytes at the offset are not valid UTF-8
    #[error("string at offset {0} is not valid UTF-8")]
    StringNotUtf8(u16),
    /// Invocation node whose shape violates the encoding rules
    #[error("malformed invocation at node {index}: {reason}")]
    MalformedInvocation { index: u16, reason: &'static str },
    /// Method id past the end of the method table
    #[error("unknown script method {0}")]
    UnknownMethod(u16),
    /// Literal leaf whose wire tag names no known storage format
    #[error("literal wire tag {0} is not decodable")]
    UnknownLiteralTag(u16),
}

/// When a script method is started by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Runs once at level start
    Startup,
    /// Parked until explicitly woken
    Dormant,
    /// Restarted every tick
    Continuous,
    /// Invoked only from other scripts
    Static,
    /// Placeholder body, never scheduled
    Stub,
    /// Driven by the command-script system, not the tick scheduler
    CommandScript,
}

/// One script method: a named entry point into the node graph.
#[derive(Debug, Clone)]
pub struct MethodDefinition {
    pub name: String,
    pub lifecycle: Lifecycle,
    pub return_type: ScriptDataType,
    /// Root node of the method body
    pub entry: u16,
}

/// One script-global variable: a declared type plus the node whose
/// evaluation yields the initial value. Consulted once, at variable-store
/// construction.
#[derive(Debug, Clone)]
pub struct VariableDefinition {
    pub name: String,
    pub data_type: ScriptDataType,
    /// Node index of the defining expression
    pub init_node: u16,
}

/// Immutable view over one level's script tables.
#[derive(Debug, Clone, Default)]
pub struct ScriptGraph {
    nodes: Vec<Node>,
    /// NUL-separated UTF-8 string blob, indexed by byte offset
    strings: Vec<u8>,
    variables: Vec<VariableDefinition>,
    methods: Vec<MethodDefinition>,
}

impl ScriptGraph {
    pub fn new(
        nodes: Vec<Node>,
        strings: Vec<u8>,
        variables: Vec<VariableDefinition>,
        methods: Vec<MethodDefinition>,
    ) -> Self {
        Self {
            nodes,
            strings,
            variables,
            methods,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Node at `index`, bounds-checked only.
    ///
    /// Use [`follow`](Self::follow) when traversing a reference that
    /// carries an expected checkval.
    pub fn node_at(
        &self,
        index: u16,
    ) -> Result<&Node, GraphError> {
        self.nodes
            .get(index as usize)
            .ok_or(GraphError::NodeOutOfBounds {
                index,
                count: self.nodes.len(),
            })
    }

    /// Node behind a checksum-guarded reference.
    ///
    /// The sentinel index is out of bounds by construction, so following a
    /// "none" reference reports corruption rather than panicking.
    pub fn follow(
        &self,
        reference: NodeRef,
    ) -> Result<&Node, GraphError> {
        let node = self.node_at(reference.index)?;
        if node.checkval != reference.checkval {
            return Err(GraphError::ChecksumMismatch {
                index: reference.index,
                expected: reference.checkval,
                found: node.checkval,
            });
        }
        Ok(node)
    }

    /// String starting at `offset`, scanned up to the terminating NUL.
    pub fn string_at(
        &self,
        offset: u16,
    ) -> Result<&str, GraphError> {
        let start = offset as usize;
        if start >= self.strings.len() {
            return Err(GraphError::StringOutOfBounds(offset));
        }
        let end = self.strings[start..]
            .iter()
            .position(|&b| b == 0)
            .map(|p| start + p)
            .unwrap_or(self.strings.len());
        std::str::from_utf8(&self.strings[start..end]).map_err(|_| GraphError::StringNotUtf8(offset))
    }

    /// First child (the method-name head) of an invocation node, with the
    /// shape checks both evaluators rely on: the head must be a
    /// MethodOrOperator expression whose operation id matches the
    /// invocation's own.
    pub fn invocation_head(
        &self,
        node: &Node,
    ) -> Result<&Node, GraphError> {
        let target = node.target().ok_or(GraphError::MalformedInvocation {
            index: NONE,
            reason: "invocation has no first child",
        })?;
        let head = self.follow(target)?;
        if head.node_type != NodeType::Expression {
            return Err(GraphError::MalformedInvocation {
                index: target.index,
                reason: "invocation's first child must be an expression",
            });
        }
        if head.data_type != ScriptDataType::MethodOrOperator {
            return Err(GraphError::MalformedInvocation {
                index: target.index,
                reason: "invocation's first child must be a method or operator",
            });
        }
        if head.operation_id != node.operation_id {
            return Err(GraphError::MalformedInvocation {
                index: target.index,
                reason: "operation id disagrees with the invocation's first child",
            });
        }
        Ok(head)
    }

    pub fn method_at(
        &self,
        id: u16,
    ) -> Result<&MethodDefinition, GraphError> {
        self.methods
            .get(id as usize)
            .ok_or(GraphError::UnknownMethod(id))
    }

    pub fn methods(&self) -> &[MethodDefinition] {
        &self.methods
    }

    pub fn variables(&self) -> &[VariableDefinition] {
        &self.variables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn void_node(checkval: u16) -> Node {
        Node {
            checkval,
            node_type: NodeType::Expression,
            data_type: ScriptDataType::Void,
            operation_id: 4,
            next_index: NONE,
            next_checkval: 0,
            string_index: 0,
            payload: 0,
        }
    }

    #[test]
    fn node_at_rejects_out_of_bounds() {
        let graph = ScriptGraph::new(vec![void_node(0)], Vec::new(), Vec::new(), Vec::new());

        assert!(graph.node_at(0).is_ok());
        assert_eq!(
            graph.node_at(1),
            Err(GraphError::NodeOutOfBounds { index: 1, count: 1 })
        );
        assert!(matches!(
            graph.node_at(NONE),
            Err(GraphError::NodeOutOfBounds { .. })
        ));
    }

    #[test]
    fn follow_validates_checkval() {
        let graph = ScriptGraph::new(vec![void_node(0xABCD)], Vec::new(), Vec::new(), Vec::new());

        assert!(graph
            .follow(NodeRef {
                index: 0,
                checkval: 0xABCD
            })
            .is_ok());
        assert_eq!(
            graph.follow(NodeRef {
                index: 0,
                checkval: 0x1111
            }),
            Err(GraphError::ChecksumMismatch {
                index: 0,
                expected: 0x1111,
                found: 0xABCD
            })
        );
    }

    #[test]
    fn string_at_scans_to_nul() {
        let graph = ScriptGraph::new(
            Vec::new(),
            b"hi\0hey\0hello\0".to_vec(),
            Vec::new(),
            Vec::new(),
        );

        assert_eq!(graph.string_at(0), Ok("hi"));
        assert_eq!(graph.string_at(3), Ok("hey"));
        assert_eq!(graph.string_at(7), Ok("hello"));
        assert_eq!(graph.string_at(100), Err(GraphError::StringOutOfBounds(100)));
    }

    #[test]
    fn string_at_rejects_invalid_utf8() {
        let graph = ScriptGraph::new(Vec::new(), vec![0xFF, 0xFE, 0x00], Vec::new(), Vec::new());
        assert_eq!(graph.string_at(0), Err(GraphError::StringNotUtf8(0)));
    }
}
