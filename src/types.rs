use std::fmt;

use serde::{Serialize, Serializer};

/// A single column value. The engine knows exactly two storage types:
/// 64-bit signed integers and text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Text(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Text(_) => "text",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

// Values serialize as bare JSON scalars so result rows come out as
// arrays of numbers and strings on the wire.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Tuple identifier: locates a heap tuple by page and slot.
/// Stable for the lifetime of the tuple (slots are never reused).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tid {
    pub page_id: u64,
    pub slot_id: u32,
}

impl Tid {
    pub fn new(page_id: u64, slot_id: u32) -> Self {
        Self { page_id, slot_id }
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_id, self.slot_id)
    }
}
