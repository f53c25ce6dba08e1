//! Host value model for the Reef runtime.
//!
//! On the target host, text, numbers and booleans are native values with no
//! attached class metadata; only heap objects and arrays carry a type tag.
//! This module mirrors that split: the tagless kinds are plain enum
//! variants, while [`Instance`] and [`ArrayInstance`] carry an
//! `Arc<TypeInfo>` tag that the type-test machinery in [`crate::typeinfo`]
//! reads.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::typeinfo::TypeInfo;

/// A runtime value as seen by compiled Reef code.
#[derive(Clone, Debug)]
pub enum Value {
    /// The host's "no value" (unit, absent slot, unallocated element).
    Unit,
    Bool(bool),
    Number(f64),
    Text(Arc<str>),
    Object(Arc<Instance>),
    Array(Arc<ArrayInstance>),
}

impl Value {
    /// Convenience constructor for text values.
    pub fn text(s: &str) -> Value {
        Value::Text(Arc::from(s))
    }

    /// The type tag, for values that carry one.
    pub fn type_tag(&self) -> Option<&Arc<TypeInfo>> {
        match self {
            Value::Object(obj) => Some(obj.class()),
            Value::Array(arr) => Some(arr.class()),
            _ => None,
        }
    }
}

/// Equality: by value for host-represented kinds, by reference identity for
/// objects and arrays.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A heap object: a type tag plus uniform value slots.
pub struct Instance {
    class: Arc<TypeInfo>,
    slots: Mutex<Vec<Value>>,
}

impl Instance {
    /// Allocate an instance of `class` with `slot_count` slots, all unset.
    pub fn new(class: &Arc<TypeInfo>, slot_count: usize) -> Arc<Instance> {
        Arc::new(Instance {
            class: class.clone(),
            slots: Mutex::new(vec![Value::Unit; slot_count]),
        })
    }

    pub fn class(&self) -> &Arc<TypeInfo> {
        &self.class
    }

    /// Read a slot. Panics if out of bounds.
    pub fn get(&self, slot: usize) -> Value {
        self.slots.lock()[slot].clone()
    }

    /// Write a slot. Panics if out of bounds.
    pub fn set(&self, slot: usize, value: Value) {
        self.slots.lock()[slot] = value;
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance<{}>", self.class.name())
    }
}

/// A one-dimensional array with a type tag; multi-dimensional arrays nest.
pub struct ArrayInstance {
    class: Arc<TypeInfo>,
    elems: Mutex<Vec<Value>>,
}

impl ArrayInstance {
    pub(crate) fn new(class: Arc<TypeInfo>, elems: Vec<Value>) -> Arc<ArrayInstance> {
        Arc::new(ArrayInstance {
            class,
            elems: Mutex::new(elems),
        })
    }

    pub fn class(&self) -> &Arc<TypeInfo> {
        &self.class
    }

    pub fn len(&self) -> usize {
        self.elems.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read an element. Panics if out of bounds.
    pub fn get(&self, index: usize) -> Value {
        self.elems.lock()[index].clone()
    }

    /// Write an element. Panics if out of bounds.
    pub fn set(&self, index: usize, value: Value) {
        self.elems.lock()[index] = value;
    }
}

impl fmt::Debug for ArrayInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(len {})", self.class.name(), self.len())
    }
}
