//! Syntax node record and its decoding rules
//!
//! One node is one fixed-size entry in the level's script node array. The
//! encoding is dense and reuses fields: `operation_id` is an operator id on
//! method/operator nodes but a wire type tag on literal leaves, and
//! `payload` holds literal bits on leaves but a (target index, checkval)
//! pair on invocation nodes. The accessors here decode those overlaps so
//! the evaluators never touch the raw integers directly.

use crate::graph::ops;

/// Sentinel meaning "no node" in every 16-bit index field.
pub const NONE: u16 = u16::MAX;

/// Structural role of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum NodeType {
    /// Wraps an inner chain and casts its value to the declared type
    Scope = 8,
    /// Literal leaf, or the method-name head of an invocation
    Expression = 9,
    /// Invokes another script method by id
    ScriptInvocation = 10,
    /// Reads (or, under `set`, names) a script variable slot
    VariableAccess = 13,
    /// Invokes an operator or engine builtin
    BuiltinInvocation = 14,
}

/// Result type tag a node produces when evaluated.
///
/// The numbering is the wire numbering: literal leaves carry the same
/// values in `operation_id` as their wire type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ScriptDataType {
    MethodOrOperator = 2,
    Void = 4,
    Boolean = 5,
    Float = 6,
    Short = 7,
    Int = 8,
    String = 9,
    ScriptReference = 10,
    StringId = 11,
    Trigger = 12,
    LocationFlag = 13,
    CameraPathTarget = 14,
    CinematicTitle = 15,
    DeviceGroup = 16,
    Ai = 17,
    AiScript = 18,
    AiBehavior = 19,
    AiOrders = 20,
    StartingProfile = 21,
    Bsp = 22,
    NavigationPoint = 23,
    SpatialPoint = 24,
    List = 25,
    Sound = 26,
    Effect = 27,
    DamageEffect = 28,
    LoopingSound = 29,
    TagReference = 30,
    Animation = 31,
    Model = 32,
    GameDifficulty = 33,
    Team = 34,
    DamageState = 35,
    Entity = 36,
    Unit = 37,
    Vehicle = 38,
    WeaponReference = 39,
    Device = 40,
    Scenery = 41,
    EntityIdentifier = 42,
    VehicleSeat = 43,
}

impl ScriptDataType {
    /// Whether values of this tag are backed by a number.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Float | Self::Short | Self::Int)
    }

    /// Whether this tag names an in-game object reference kind.
    pub fn is_reference(self) -> bool {
        !matches!(
            self,
            Self::MethodOrOperator
                | Self::Void
                | Self::Boolean
                | Self::Float
                | Self::Short
                | Self::Int
                | Self::String
        )
    }
}

impl std::fmt::Display for ScriptDataType {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Decoded meaning of the dual-purpose `operation_id` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Operator/builtin id (node produces `MethodOrOperator`)
    Operator(u16),
    /// Wire type tag describing the storage format of a literal leaf
    LiteralTag(u16),
}

/// A checksum-guarded cross-reference to another node.
///
/// The graph is the sole owner of all nodes; references carry the target's
/// expected checkval so mis-offset or corrupt graphs fail loudly at the
/// point of traversal instead of silently evaluating garbage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRef {
    pub index: u16,
    pub checkval: u16,
}

/// One entry in the script node array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    /// This node's own checksum, validated by inbound references
    pub checkval: u16,
    /// Structural role
    pub node_type: NodeType,
    /// Result type tag
    pub data_type: ScriptDataType,
    /// Operator id or literal wire tag, per `data_type`
    pub operation_id: u16,
    /// Sibling index (`NONE` = end of chain)
    pub next_index: u16,
    /// Expected checkval of the sibling
    pub next_checkval: u16,
    /// Byte offset into the NUL-separated string blob
    pub string_index: u16,
    /// Raw 32-bit literal bits, or packed (target index, target checkval)
    pub payload: u32,
}

impl Node {
    /// Low 16 bits of the payload: invocation target index, variable slot.
    pub fn payload_h16(&self) -> u16 {
        self.payload as u16
    }

    /// High 16 bits of the payload: expected checkval of the target.
    pub fn payload_l16(&self) -> u16 {
        (self.payload >> 16) as u16
    }

    /// Lowest payload byte, used by Boolean literals.
    pub fn payload_b(&self) -> u8 {
        self.payload as u8
    }

    /// Sibling reference, or `None` at the end of a chain.
    pub fn next(&self) -> Option<NodeRef> {
        if self.next_index == NONE {
            None
        } else {
            Some(NodeRef {
                index: self.next_index,
                checkval: self.next_checkval,
            })
        }
    }

    /// Invocation target (first child) reference.
    ///
    /// Only meaningful on Scope/BuiltinInvocation/ScriptInvocation nodes,
    /// where the payload packs the target index and its checkval.
    pub fn target(&self) -> Option<NodeRef> {
        if self.payload_h16() == NONE {
            None
        } else {
            Some(NodeRef {
                index: self.payload_h16(),
                checkval: self.payload_l16(),
            })
        }
    }

    /// Decode the dual-purpose `operation_id` field.
    pub fn operation(&self) -> Operation {
        if self.data_type == ScriptDataType::MethodOrOperator {
            Operation::Operator(self.operation_id)
        } else {
            Operation::LiteralTag(self.operation_id)
        }
    }

    /// Synthesized `begin` invocation wrapping `root_index`.
    ///
    /// Roots that are not invocations (bare literals, variable reads,
    /// variable initializers) still need a frame to complete into, so the
    /// interpreter wraps them in a begin whose only child is the root.
    pub(crate) fn synthesized_begin(
        data_type: ScriptDataType,
        root_index: u16,
        root_checkval: u16,
    ) -> (Node, Node) {
        let invocation = Node {
            checkval: 0,
            node_type: NodeType::BuiltinInvocation,
            data_type,
            operation_id: ops::BEGIN,
            next_index: NONE,
            next_checkval: 0,
            string_index: 0,
            payload: u32::from(NONE),
        };

        let head = Node {
            checkval: 0,
            node_type: NodeType::Expression,
            data_type: ScriptDataType::MethodOrOperator,
            operation_id: ops::BEGIN,
            next_index: root_index,
            next_checkval: root_checkval,
            string_index: 0,
            payload: 0,
        };

        (invocation, head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(data_type: ScriptDataType, tag: u16, payload: u32) -> Node {
        Node {
            checkval: 0,
            node_type: NodeType::Expression,
            data_type,
            operation_id: tag,
            next_index: NONE,
            next_checkval: 0,
            string_index: 0,
            payload,
        }
    }

    #[test]
    fn operation_decodes_by_data_type() {
        let op_node = leaf(ScriptDataType::MethodOrOperator, ops::ADD, 0);
        assert_eq!(op_node.operation(), Operation::Operator(ops::ADD));

        let lit = leaf(ScriptDataType::Float, 6, 0x4000_0000);
        assert_eq!(lit.operation(), Operation::LiteralTag(6));
    }

    #[test]
    fn payload_halves_split_correctly() {
        let node = leaf(ScriptDataType::Void, 4, 0xBEEF_0005);
        assert_eq!(node.payload_h16(), 0x0005);
        assert_eq!(node.payload_l16(), 0xBEEF);
    }

    #[test]
    fn next_is_none_at_sentinel() {
        let node = leaf(ScriptDataType::Void, 4, 0);
        assert!(node.next().is_none());

        let mut chained = node;
        chained.next_index = 7;
        chained.next_checkval = 0x1234;
        assert_eq!(
            chained.next(),
            Some(NodeRef {
                index: 7,
                checkval: 0x1234
            })
        );
    }
}
