//! Heap instances, instance layouts and virtual dispatch tables
//!
//! Every registered class gets a [`ClassLayout`] when it is registered: the
//! ordered instance-field slots of the whole superclass chain (most derived
//! class first) and a [`VTable`] of concrete method bodies. Instances share
//! their class's layout and own one value per slot.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use refract_types::{ClassId, ClassRef};
use rustc_hash::FxHashMap;

use crate::value::Value;

/// Shared handle to a heap instance
pub type ObjectRef = Arc<Instance>;

/// Native method body: `(this, args) -> result`
///
/// `this` is [`Value::Null`] for static methods. An `Err` is reported to
/// callers as an invocation failure carrying the message.
pub type NativeMethod = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, String> + Send + Sync>;

/// Native constructor body, run against a freshly allocated instance
pub type NativeConstructor = Arc<dyn Fn(&ObjectRef, &[Value]) -> Result<(), String> + Send + Sync>;

/// Identifies one instance field: the declaring class plus the field name
///
/// A subclass field hiding a superclass field with the same name occupies a
/// separate slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey {
    /// Declaring class
    pub class: ClassId,
    /// Field name
    pub name: String,
}

impl FieldKey {
    /// Create a field key
    pub fn new(class: ClassId, name: impl Into<String>) -> Self {
        Self {
            class,
            name: name.into(),
        }
    }
}

/// Dispatch key: method name plus erased parameter classes
///
/// Return types do not take part, so a covariant override lands in the slot
/// of the method it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSlot {
    /// Method name
    pub name: String,
    /// Erased parameter classes
    pub params: Vec<ClassRef>,
}

/// Virtual method table
///
/// Built once per class: the superclass table is copied, then every concrete
/// instance method the class declares replaces the entry for its slot.
#[derive(Clone, Default)]
pub struct VTable {
    methods: FxHashMap<MethodSlot, NativeMethod>,
}

impl VTable {
    /// Create an empty vtable
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or override the body for a slot
    pub fn insert(&mut self, slot: MethodSlot, body: NativeMethod) {
        self.methods.insert(slot, body);
    }

    /// Look up the most derived body for a slot
    pub fn lookup(&self, slot: &MethodSlot) -> Option<&NativeMethod> {
        self.methods.get(slot)
    }

    /// Number of dispatchable methods
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether no method is dispatchable
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for VTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut slots: Vec<_> = self
            .methods
            .keys()
            .map(|s| format!("{}/{}", s.name, s.params.len()))
            .collect();
        slots.sort();
        f.debug_struct("VTable").field("slots", &slots).finish()
    }
}

/// Instance shape shared by every object of one class
#[derive(Debug)]
pub struct ClassLayout {
    class: ClassId,
    instantiable: bool,
    slots: Vec<(FieldKey, Value)>,
    index: FxHashMap<FieldKey, usize>,
    vtable: VTable,
}

impl ClassLayout {
    /// Create a layout from ordered slots (most derived class first) and their
    /// initial values
    pub(crate) fn new(
        class: ClassId,
        instantiable: bool,
        slots: Vec<(FieldKey, Value)>,
        vtable: VTable,
    ) -> Self {
        let index = slots
            .iter()
            .enumerate()
            .map(|(i, (key, _))| (key.clone(), i))
            .collect();
        Self {
            class,
            instantiable,
            slots,
            index,
            vtable,
        }
    }

    /// Class described by this layout
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Whether objects of this class can be allocated (not abstract, not an interface)
    pub fn is_instantiable(&self) -> bool {
        self.instantiable
    }

    /// Field slots, most derived class first
    pub fn field_keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.slots.iter().map(|(key, _)| key)
    }

    pub(crate) fn initial_values(&self) -> impl Iterator<Item = Value> + '_ {
        self.slots.iter().map(|(_, init)| init.clone())
    }

    /// Dispatch table for this class
    pub fn vtable(&self) -> &VTable {
        &self.vtable
    }

    /// Allocate a new instance with every slot at its initial value
    pub fn allocate(self: &Arc<Self>) -> ObjectRef {
        let values = self.slots.iter().map(|(_, init)| init.clone()).collect();
        Arc::new(Instance {
            layout: Arc::clone(self),
            values: RwLock::new(values),
        })
    }
}

/// A heap-allocated object
pub struct Instance {
    layout: Arc<ClassLayout>,
    values: RwLock<Vec<Value>>,
}

impl Instance {
    /// Runtime class of this object
    pub fn class_id(&self) -> ClassId {
        self.layout.class
    }

    /// Shared layout of this object's class
    pub fn layout(&self) -> &Arc<ClassLayout> {
        &self.layout
    }

    /// Whether this object has a slot for `key`
    pub fn has_field(&self, key: &FieldKey) -> bool {
        self.layout.index.contains_key(key)
    }

    /// Read the slot for an exact field
    pub fn get_field(&self, key: &FieldKey) -> Option<Value> {
        let i = *self.layout.index.get(key)?;
        self.values.read().get(i).cloned()
    }

    /// Write the slot for an exact field; returns `false` if no such slot exists
    pub fn set_field(&self, key: &FieldKey, value: Value) -> bool {
        match self.layout.index.get(key) {
            Some(&i) => {
                let mut values = self.values.write();
                match values.get_mut(i) {
                    Some(slot) => {
                        *slot = value;
                        true
                    }
                    None => false,
                }
            }
            None => false,
        }
    }

    /// Read a field by simple name, the most derived declaration winning
    ///
    /// Intended for native bodies written against the runtime class. Returns
    /// `None` if no slot has that name.
    pub fn get(&self, name: &str) -> Option<Value> {
        let i = self.position_of(name)?;
        self.values.read().get(i).cloned()
    }

    /// Write a field by simple name, the most derived declaration winning;
    /// returns `false` if no slot has that name
    pub fn set(&self, name: &str, value: Value) -> bool {
        let Some(i) = self.position_of(name) else {
            return false;
        };
        match self.values.write().get_mut(i) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.layout.slots.iter().position(|(key, _)| key.name == name)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.values.read();
        let mut s = f.debug_struct("Instance");
        s.field("class", &self.layout.class);
        for ((key, _), value) in self.layout.slots.iter().zip(values.iter()) {
            s.field(&key.name, value);
        }
        s.finish()
    }
}
