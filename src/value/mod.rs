//! Runtime value model
//!
//! Values exist only transiently during evaluation: a literal decodes into
//! one, operators fold them, and assignments copy them into the variable
//! store. The variant set mirrors the graph's type system; in-game object
//! references stay opaque to the VM and carry their kind tag plus a handle
//! the host surface understands.
//!
//! Implicit casts are deliberately narrow: numeric widths convert via
//! native conversion, numerics and booleans convert via nonzero-is-true /
//! true-is-one, and references may only be retagged to another reference
//! kind. Everything else is a type mismatch the caller reports.

use std::sync::Arc;

use crate::graph::ScriptDataType;

/// Opaque in-game object reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub kind: ScriptDataType,
    /// Host-interpreted handle (entity slot, tag id, method id, ...)
    pub handle: u32,
}

/// A script runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Void,
    Boolean(bool),
    Int(i32),
    Short(i16),
    Float(f32),
    String(Arc<str>),
    Reference(Reference),
}

impl Value {
    /// Type tag this value carries.
    pub fn data_type(&self) -> ScriptDataType {
        match self {
            Value::Void => ScriptDataType::Void,
            Value::Boolean(_) => ScriptDataType::Boolean,
            Value::Int(_) => ScriptDataType::Int,
            Value::Short(_) => ScriptDataType::Short,
            Value::Float(_) => ScriptDataType::Float,
            Value::String(_) => ScriptDataType::String,
            Value::Reference(r) => r.kind,
        }
    }

    pub fn reference(
        kind: ScriptDataType,
        handle: u32,
    ) -> Self {
        Value::Reference(Reference { kind, handle })
    }

    /// Numeric view as f32, with boolean promotion.
    pub fn as_float(&self) -> Option<f32> {
        match *self {
            Value::Float(v) => Some(v),
            Value::Int(v) => Some(v as f32),
            Value::Short(v) => Some(f32::from(v)),
            Value::Boolean(v) => Some(if v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Numeric view as i32, truncating floats.
    pub fn as_int(&self) -> Option<i32> {
        match *self {
            Value::Int(v) => Some(v),
            Value::Short(v) => Some(i32::from(v)),
            Value::Float(v) => Some(v as i32),
            Value::Boolean(v) => Some(i32::from(v)),
            _ => None,
        }
    }

    /// Numeric view as i16, truncating floats and narrowing ints.
    pub fn as_short(&self) -> Option<i16> {
        match *self {
            Value::Short(v) => Some(v),
            Value::Int(v) => Some(v as i16),
            Value::Float(v) => Some(v as i16),
            Value::Boolean(v) => Some(i16::from(v)),
            _ => None,
        }
    }

    /// Boolean view; numerics are true when nonzero.
    pub fn as_boolean(&self) -> Option<bool> {
        match *self {
            Value::Boolean(v) => Some(v),
            Value::Int(v) => Some(v != 0),
            Value::Short(v) => Some(v != 0),
            Value::Float(v) => Some(v != 0.0),
            _ => None,
        }
    }

    /// Implicit cast to a declared type tag.
    ///
    /// Returns `None` when no cast is configured; callers turn that into a
    /// type-mismatch error with both tags attached.
    pub fn cast(
        &self,
        to: ScriptDataType,
    ) -> Option<Value> {
        if self.data_type() == to {
            return Some(self.clone());
        }

        match to {
            ScriptDataType::Float => self.as_float().map(Value::Float),
            ScriptDataType::Int => self.as_int().map(Value::Int),
            ScriptDataType::Short => self.as_short().map(Value::Short),
            ScriptDataType::Boolean => self.as_boolean().map(Value::Boolean),
            // References may be retagged within reference kinds (e.g. a
            // Unit leaf declared as Entity), never conjured from scalars.
            _ if to.is_reference() => match self {
                Value::Reference(r) => Some(Value::Reference(Reference {
                    kind: to,
                    handle: r.handle,
                })),
                _ => None,
            },
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{:?}", v),
            Value::Reference(r) => write!(f, "{}#{}", r.kind, r.handle),
        }
    }
}
