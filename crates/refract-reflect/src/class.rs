//! Class, field, method and constructor definitions
//!
//! These are the host runtime's view of a class: what a reflective API would
//! enumerate from a loaded class file. Definitions are created by the
//! [`ClassRegistry`](crate::registry::ClassRegistry) from builders and are
//! immutable afterwards, except for each member's accessibility override.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use refract_types::{ClassId, ClassRef, GenericField, GenericMethod, Type, TypeVariable};

use crate::error::InvokeError;
use crate::object::{ClassLayout, FieldKey, MethodSlot, NativeConstructor, NativeMethod};
use crate::value::Value;

/// Member and class modifier flags (bitflags)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u16);

impl Modifiers {
    /// No modifiers (package-private)
    pub const NONE: Self = Self(0x0000);
    /// `public`
    pub const PUBLIC: Self = Self(0x0001);
    /// `private`
    pub const PRIVATE: Self = Self(0x0002);
    /// `protected`
    pub const PROTECTED: Self = Self(0x0004);
    /// `static`
    pub const STATIC: Self = Self(0x0008);
    /// `final`
    pub const FINAL: Self = Self(0x0010);
    /// `abstract`
    pub const ABSTRACT: Self = Self(0x0020);
    /// Compiler-generated bridge method
    pub const BRIDGE: Self = Self(0x0040);
    /// Compiler-generated member
    pub const SYNTHETIC: Self = Self(0x0080);

    const VISIBILITY: Self = Self(0x0007);

    /// Create from raw bits
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub const fn bits(&self) -> u16 {
        self.0
    }

    /// Check if every flag in `other` is set
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Union of flags
    pub const fn union(&self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Remove flags
    pub const fn difference(&self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Replace the visibility flags with `visibility`
    pub const fn with_visibility(&self, visibility: Self) -> Self {
        self.difference(Self::VISIBILITY).union(visibility)
    }

    /// `public`
    pub const fn is_public(&self) -> bool {
        self.contains(Self::PUBLIC)
    }

    /// `private`
    pub const fn is_private(&self) -> bool {
        self.contains(Self::PRIVATE)
    }

    /// `static`
    pub const fn is_static(&self) -> bool {
        self.contains(Self::STATIC)
    }

    /// `final`
    pub const fn is_final(&self) -> bool {
        self.contains(Self::FINAL)
    }

    /// `abstract`
    pub const fn is_abstract(&self) -> bool {
        self.contains(Self::ABSTRACT)
    }

    /// Bridge method
    pub const fn is_bridge(&self) -> bool {
        self.contains(Self::BRIDGE)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Modifiers, &str); 8] = [
            (Modifiers::PUBLIC, "public"),
            (Modifiers::PRIVATE, "private"),
            (Modifiers::PROTECTED, "protected"),
            (Modifiers::ABSTRACT, "abstract"),
            (Modifiers::STATIC, "static"),
            (Modifiers::FINAL, "final"),
            (Modifiers::BRIDGE, "bridge"),
            (Modifiers::SYNTHETIC, "synthetic"),
        ];
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&names.join(" "))
    }
}

/// Kind of a registered class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    /// Ordinary class
    Class,
    /// Interface: no fields of its own instances, no constructors
    Interface,
    /// Immutable value record: every zero-argument method is a property
    Record,
}

/// Common view of fields, methods and constructors
pub trait Member {
    /// Simple name (`<init>` for constructors)
    fn name(&self) -> &str;
    /// Declaring class
    fn declaring_class(&self) -> ClassId;
    /// Modifier flags
    fn modifiers(&self) -> Modifiers;
    /// `Declaring.name`, for diagnostics
    fn qualified_name(&self) -> String;
    /// Whether the accessibility override has been applied
    fn is_accessible(&self) -> bool;
    /// Apply or clear the accessibility override
    fn set_accessible(&self, accessible: bool);

    /// Public members, and members whose override is set, can be used freely
    fn check_access(&self) -> Result<(), InvokeError> {
        if self.modifiers().is_public() || self.is_accessible() {
            Ok(())
        } else {
            Err(InvokeError::IllegalAccess)
        }
    }
}

macro_rules! impl_member {
    ($ty:ty) => {
        impl Member for $ty {
            fn name(&self) -> &str {
                <$ty>::name(self)
            }
            fn declaring_class(&self) -> ClassId {
                self.declaring
            }
            fn modifiers(&self) -> Modifiers {
                self.modifiers
            }
            fn qualified_name(&self) -> String {
                format!("{}.{}", self.owner_name, <$ty>::name(self))
            }
            fn is_accessible(&self) -> bool {
                self.accessible.load(Ordering::Acquire)
            }
            fn set_accessible(&self, accessible: bool) {
                self.accessible.store(accessible, Ordering::Release);
            }
        }
    };
}

/// A declared field
pub struct FieldDef {
    name: String,
    declaring: ClassId,
    owner_name: String,
    ty: Type,
    modifiers: Modifiers,
    accessible: AtomicBool,
    initial: Value,
    static_value: RwLock<Value>,
}

impl FieldDef {
    pub(crate) fn new(
        name: String,
        declaring: ClassId,
        owner_name: String,
        ty: Type,
        modifiers: Modifiers,
        initial: Value,
    ) -> Self {
        Self {
            name,
            declaring,
            owner_name,
            ty,
            modifiers,
            accessible: AtomicBool::new(false),
            static_value: RwLock::new(initial.clone()),
            initial,
        }
    }

    /// Simple name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class declaring this member
    pub fn declaring_class(&self) -> ClassId {
        self.declaring
    }

    /// Modifier flags
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Value a fresh instance (or the class, for statics) starts with
    pub fn initial_value(&self) -> &Value {
        &self.initial
    }

    /// Slot key of this field on instances
    pub fn key(&self) -> FieldKey {
        FieldKey::new(self.declaring, self.name.clone())
    }

    /// Read the field from `target` (ignored for static fields)
    pub fn get(&self, target: &Value) -> Result<Value, InvokeError> {
        self.check_access()?;
        if self.modifiers.is_static() {
            return Ok(self.static_value.read().clone());
        }
        let obj = target.as_object().ok_or_else(|| {
            InvokeError::Target(format!("cannot read field {} from {:?}", self.name, target))
        })?;
        obj.get_field(&self.key()).ok_or_else(|| {
            InvokeError::Target(format!(
                "object of {} has no field {}",
                obj.class_id(),
                self.qualified_name()
            ))
        })
    }

    /// Write the field on `target` (ignored for static fields)
    pub fn set(&self, target: &Value, value: Value) -> Result<(), InvokeError> {
        self.check_access()?;
        if self.modifiers.is_final() {
            if self.modifiers.is_static() {
                return Err(InvokeError::Target(format!(
                    "cannot set static final field {}",
                    self.qualified_name()
                )));
            }
            if !self.is_accessible() {
                return Err(InvokeError::IllegalAccess);
            }
        }
        if self.modifiers.is_static() {
            *self.static_value.write() = value;
            return Ok(());
        }
        let obj = target.as_object().ok_or_else(|| {
            InvokeError::Target(format!("cannot write field {} on {:?}", self.name, target))
        })?;
        if obj.set_field(&self.key(), value) {
            Ok(())
        } else {
            Err(InvokeError::Target(format!(
                "object of {} has no field {}",
                obj.class_id(),
                self.qualified_name()
            )))
        }
    }
}

impl_member!(FieldDef);

impl GenericField for FieldDef {
    fn generic_type(&self) -> &Type {
        &self.ty
    }
    fn declaring_class(&self) -> ClassId {
        self.declaring
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.qualified_name())
            .field("type", &self.ty)
            .field("modifiers", &self.modifiers)
            .finish()
    }
}

/// A declared method
pub struct MethodDef {
    name: String,
    declaring: ClassId,
    owner_name: String,
    return_type: Type,
    params: Vec<Type>,
    modifiers: Modifiers,
    accessible: AtomicBool,
    body: Option<NativeMethod>,
}

impl MethodDef {
    pub(crate) fn new(
        name: String,
        declaring: ClassId,
        owner_name: String,
        return_type: Type,
        params: Vec<Type>,
        modifiers: Modifiers,
        body: Option<NativeMethod>,
    ) -> Self {
        Self {
            name,
            declaring,
            owner_name,
            return_type,
            params,
            modifiers,
            accessible: AtomicBool::new(false),
            body,
        }
    }

    /// Simple name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class declaring this member
    pub fn declaring_class(&self) -> ClassId {
        self.declaring
    }

    /// Modifier flags
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Number of declared parameters
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Erased return class
    pub fn return_class(&self) -> ClassRef {
        self.return_type.erasure()
    }

    /// Erased parameter classes
    pub fn param_classes(&self) -> Vec<ClassRef> {
        self.params.iter().map(Type::erasure).collect()
    }

    /// Dispatch slot this method occupies
    pub fn slot(&self) -> MethodSlot {
        MethodSlot {
            name: self.name.clone(),
            params: self.param_classes(),
        }
    }

    /// Native body, if the method is concrete
    pub(crate) fn body(&self) -> Option<&NativeMethod> {
        self.body.as_ref()
    }

    /// Call the method on `target`
    ///
    /// Non-private instance methods dispatch through the target's vtable, so
    /// an override declared by the target's class runs instead of this body.
    pub fn invoke(&self, target: &Value, args: &[Value]) -> Result<Value, InvokeError> {
        self.check_access()?;
        if args.len() != self.params.len() {
            return Err(InvokeError::Target(format!(
                "wrong number of arguments: expected {}, got {}",
                self.params.len(),
                args.len()
            )));
        }

        if self.modifiers.is_static() {
            let body = self.body.as_ref().ok_or_else(|| self.no_implementation())?;
            return body(&Value::Null, args).map_err(InvokeError::Target);
        }

        let obj = target.as_object().ok_or_else(|| {
            InvokeError::Target(format!("cannot invoke {} on {:?}", self.name, target))
        })?;
        let dispatched = if self.modifiers.is_private() {
            None
        } else {
            obj.layout().vtable().lookup(&self.slot())
        };
        let body = dispatched
            .or(self.body.as_ref())
            .ok_or_else(|| self.no_implementation())?;
        body(target, args).map_err(InvokeError::Target)
    }

    fn no_implementation(&self) -> InvokeError {
        InvokeError::Target(format!("{} has no implementation", self.qualified_name()))
    }
}

impl_member!(MethodDef);

impl GenericMethod for MethodDef {
    fn generic_return_type(&self) -> &Type {
        &self.return_type
    }
    fn generic_parameter_types(&self) -> &[Type] {
        &self.params
    }
    fn declaring_class(&self) -> ClassId {
        self.declaring
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.qualified_name())
            .field("return_type", &self.return_type)
            .field("params", &self.params)
            .field("modifiers", &self.modifiers)
            .field("concrete", &self.body.is_some())
            .finish()
    }
}

/// A declared constructor
pub struct ConstructorDef {
    declaring: ClassId,
    owner_name: String,
    params: Vec<Type>,
    modifiers: Modifiers,
    accessible: AtomicBool,
    body: Option<NativeConstructor>,
    layout: Arc<ClassLayout>,
}

impl ConstructorDef {
    pub(crate) fn new(
        declaring: ClassId,
        owner_name: String,
        params: Vec<Type>,
        modifiers: Modifiers,
        body: Option<NativeConstructor>,
        layout: Arc<ClassLayout>,
    ) -> Self {
        Self {
            declaring,
            owner_name,
            params,
            modifiers,
            accessible: AtomicBool::new(false),
            body,
            layout,
        }
    }

    /// Constructors are all named `<init>`
    pub fn name(&self) -> &str {
        "<init>"
    }

    /// Class declaring this member
    pub fn declaring_class(&self) -> ClassId {
        self.declaring
    }

    /// Modifier flags
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Declared parameter types
    pub fn parameter_types(&self) -> &[Type] {
        &self.params
    }

    /// Number of declared parameters
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Allocate an instance and run this constructor on it
    pub fn new_instance(&self, args: &[Value]) -> Result<Value, InvokeError> {
        self.check_access()?;
        if !self.layout.is_instantiable() {
            return Err(InvokeError::Target(format!(
                "cannot instantiate abstract class {}",
                self.owner_name
            )));
        }
        if args.len() != self.params.len() {
            return Err(InvokeError::Target(format!(
                "wrong number of arguments: expected {}, got {}",
                self.params.len(),
                args.len()
            )));
        }
        let obj = self.layout.allocate();
        if let Some(body) = &self.body {
            body(&obj, args).map_err(InvokeError::Target)?;
        }
        Ok(Value::Object(obj))
    }
}

impl_member!(ConstructorDef);

impl fmt::Debug for ConstructorDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDef")
            .field("class", &self.owner_name)
            .field("params", &self.params)
            .field("modifiers", &self.modifiers)
            .finish()
    }
}

/// A registered class, interface or record
#[derive(Debug)]
pub struct ClassDef {
    pub(crate) id: ClassId,
    pub(crate) name: String,
    pub(crate) kind: ClassKind,
    pub(crate) modifiers: Modifiers,
    pub(crate) type_params: Vec<TypeVariable>,
    pub(crate) superclass: Option<Type>,
    pub(crate) interfaces: Vec<Type>,
    pub(crate) fields: Vec<Arc<FieldDef>>,
    pub(crate) methods: Vec<Arc<MethodDef>>,
    pub(crate) constructors: Vec<Arc<ConstructorDef>>,
    pub(crate) layout: Arc<ClassLayout>,
}

impl ClassDef {
    /// Class id
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class kind
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Class modifiers
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Whether this is an interface
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    /// Whether this is a value record
    pub fn is_record(&self) -> bool {
        self.kind == ClassKind::Record
    }

    /// Declared type parameters
    pub fn type_parameters(&self) -> &[TypeVariable] {
        &self.type_params
    }

    /// Superclass as written (`None` for the root class and interfaces)
    pub fn generic_superclass(&self) -> Option<&Type> {
        self.superclass.as_ref()
    }

    /// Implemented or extended interfaces as written
    pub fn generic_interfaces(&self) -> &[Type] {
        &self.interfaces
    }

    /// Fields declared by this class only
    pub fn declared_fields(&self) -> &[Arc<FieldDef>] {
        &self.fields
    }

    /// Methods declared by this class only
    pub fn declared_methods(&self) -> &[Arc<MethodDef>] {
        &self.methods
    }

    /// Constructors declared by this class
    pub fn declared_constructors(&self) -> &[Arc<ConstructorDef>] {
        &self.constructors
    }

    /// Instance layout
    pub fn layout(&self) -> &Arc<ClassLayout> {
        &self.layout
    }
}
