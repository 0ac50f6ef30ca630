//! Operator semantics shared by both evaluators
//!
//! Literal decoding, the left-anchored arithmetic fold, and the two-operand
//! comparisons live here so the recursive and iterative evaluators cannot
//! drift apart on value behavior. Control flow (`begin`, `if`, `and`/`or`,
//! `set`, the sleeps) differs structurally between the two and stays in
//! each evaluator.

use crate::error::VmError;
use crate::graph::{ops, GraphError, Node, Operation, ScriptDataType, ScriptGraph};
use crate::host::HostSurface;
use crate::value::Value;

// Wire tags on literal leaves mirror the primitive data-type numbering.
const TAG_VOID: u16 = ScriptDataType::Void as u16;
const TAG_BOOLEAN: u16 = ScriptDataType::Boolean as u16;
const TAG_FLOAT: u16 = ScriptDataType::Float as u16;
const TAG_SHORT: u16 = ScriptDataType::Short as u16;
const TAG_INT: u16 = ScriptDataType::Int as u16;
const TAG_STRING: u16 = ScriptDataType::String as u16;
const TAG_SCRIPT_REFERENCE: u16 = ScriptDataType::ScriptReference as u16;
const TAG_AI_SCRIPT: u16 = ScriptDataType::AiScript as u16;

pub(crate) fn operand_error(
    op: u16,
    found: &Value,
) -> VmError {
    VmError::OperatorType {
        op: ops::name(op),
        found: found.data_type(),
    }
}

/// Decode a literal leaf into a value.
///
/// Storage is keyed by the wire tag in `operation_id`, not by the declared
/// `data_type`; when the two disagree (a Short leaf declared Float, a Unit
/// leaf declared Entity) the decoded value is implicitly cast afterwards.
/// Named in-game references resolve through the host surface.
pub(crate) fn decode_literal(
    node: &Node,
    graph: &ScriptGraph,
    host: &mut dyn HostSurface,
) -> Result<Value, VmError> {
    let Operation::LiteralTag(tag) = node.operation() else {
        // Heads are consumed by their wrapping invocation; one showing up
        // as an operand means the chain links are wrong
        return Err(GraphError::MalformedInvocation {
            index: crate::graph::NONE,
            reason: "method-or-operator node used as an operand",
        }
        .into());
    };

    let natural = match tag {
        TAG_VOID => Value::Void,
        TAG_BOOLEAN => Value::Boolean(node.payload_b() == 1),
        TAG_FLOAT => Value::Float(f32::from_bits(node.payload)),
        TAG_SHORT => Value::Short(node.payload_h16() as i16),
        TAG_INT => Value::Int(node.payload as i32),
        TAG_STRING => Value::String(graph.string_at(node.string_index)?.into()),
        // Method references carry the callee id in the payload, no lookup
        TAG_SCRIPT_REFERENCE | TAG_AI_SCRIPT => {
            Value::reference(node.data_type, u32::from(node.payload_h16()))
        }
        _ if node.data_type.is_reference() => {
            let name = graph.string_at(node.string_index)?;
            host.resolve_reference(node.data_type, name)?
        }
        _ => return Err(GraphError::UnknownLiteralTag(tag).into()),
    };

    if natural.data_type() == node.data_type {
        Ok(natural)
    } else {
        let from = natural.data_type();
        natural.cast(node.data_type).ok_or(VmError::TypeMismatch {
            from,
            to: node.data_type,
        })
    }
}

/// One step of the left-anchored arithmetic fold.
///
/// The accumulator's numeric kind anchors the whole fold; each right-hand
/// operand is viewed through that kind.
pub(crate) fn apply_arithmetic(
    op: u16,
    acc: Value,
    rhs: &Value,
) -> Result<Value, VmError> {
    match acc {
        Value::Float(a) => {
            let b = rhs.as_float().ok_or_else(|| operand_error(op, rhs))?;
            Ok(Value::Float(fold_f32(op, a, b)))
        }
        Value::Int(a) => {
            let b = rhs.as_int().ok_or_else(|| operand_error(op, rhs))?;
            Ok(Value::Int(fold_i32(op, a, b)?))
        }
        Value::Short(a) => {
            let b = rhs.as_short().ok_or_else(|| operand_error(op, rhs))?;
            Ok(Value::Short(fold_i16(op, a, b)?))
        }
        other => Err(operand_error(op, &other)),
    }
}

fn fold_f32(
    op: u16,
    a: f32,
    b: f32,
) -> f32 {
    match op {
        ops::ADD => a + b,
        ops::SUBTRACT => a - b,
        ops::MULTIPLY => a * b,
        ops::DIVIDE => a / b,
        ops::MIN => a.min(b),
        ops::MAX => a.max(b),
        _ => unreachable!("non-arithmetic op {op} in fold"),
    }
}

fn fold_i32(
    op: u16,
    a: i32,
    b: i32,
) -> Result<i32, VmError> {
    Ok(match op {
        ops::ADD => a.wrapping_add(b),
        ops::SUBTRACT => a.wrapping_sub(b),
        ops::MULTIPLY => a.wrapping_mul(b),
        ops::DIVIDE => {
            if b == 0 {
                return Err(VmError::DivisionByZero);
            }
            a.wrapping_div(b)
        }
        ops::MIN => a.min(b),
        ops::MAX => a.max(b),
        _ => unreachable!("non-arithmetic op {op} in fold"),
    })
}

fn fold_i16(
    op: u16,
    a: i16,
    b: i16,
) -> Result<i16, VmError> {
    Ok(match op {
        ops::ADD => a.wrapping_add(b),
        ops::SUBTRACT => a.wrapping_sub(b),
        ops::MULTIPLY => a.wrapping_mul(b),
        ops::DIVIDE => {
            if b == 0 {
                return Err(VmError::DivisionByZero);
            }
            a.wrapping_div(b)
        }
        ops::MIN => a.min(b),
        ops::MAX => a.max(b),
        _ => unreachable!("non-arithmetic op {op} in fold"),
    })
}

/// Two-operand comparison; the left operand's kind picks the view.
pub(crate) fn compare(
    op: u16,
    left: &Value,
    right: &Value,
) -> Result<Value, VmError> {
    let result = match *left {
        Value::Boolean(l) if op == ops::EQUALS => {
            let r = right.as_boolean().ok_or_else(|| operand_error(op, right))?;
            l == r
        }
        Value::Float(l) => {
            let r = right.as_float().ok_or_else(|| operand_error(op, right))?;
            compare_ordered(op, l, r)
        }
        Value::Short(l) => {
            let r = right.as_short().ok_or_else(|| operand_error(op, right))?;
            compare_ordered(op, l, r)
        }
        Value::Int(l) => {
            let r = right.as_int().ok_or_else(|| operand_error(op, right))?;
            compare_ordered(op, l, r)
        }
        // Difficulty, team and other opaque handles compare by identity
        Value::Reference(_) if op == ops::EQUALS => left == right,
        _ => return Err(operand_error(op, left)),
    };

    Ok(Value::Boolean(result))
}

fn compare_ordered<T: PartialOrd>(
    op: u16,
    a: T,
    b: T,
) -> bool {
    match op {
        ops::EQUALS => a == b,
        ops::GREATER_THAN => a > b,
        ops::LESS_THAN => a < b,
        ops::GREATER_THAN_OR_EQUAL => a >= b,
        ops::LESS_THAN_OR_EQUAL => a <= b,
        _ => unreachable!("non-comparison op {op}"),
    }
}

pub(crate) fn is_arithmetic(op: u16) -> bool {
    matches!(
        op,
        ops::ADD | ops::SUBTRACT | ops::MULTIPLY | ops::DIVIDE | ops::MIN | ops::MAX
    )
}

pub(crate) fn is_comparison(op: u16) -> bool {
    matches!(
        op,
        ops::EQUALS
            | ops::GREATER_THAN
            | ops::LESS_THAN
            | ops::GREATER_THAN_OR_EQUAL
            | ops::LESS_THAN_OR_EQUAL
    )
}
