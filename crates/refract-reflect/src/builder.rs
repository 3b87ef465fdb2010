//! Fluent builders for describing classes to the registry
//!
//! ```ignore
//! let mut b = registry.class("Box");
//! let t = b.type_param("T");
//! let b = b
//!     .field(FieldBuilder::new("value", Type::var(t.clone())).private())
//!     .method(MethodBuilder::new("get").returns(Type::var(t)).reads("value"));
//! let box_id = registry.register(b)?;
//! ```

use std::sync::Arc;

use refract_types::{ClassId, Primitive, Type, TypeVariable};

use crate::class::{ClassKind, Modifiers};
use crate::object::{FieldKey, NativeConstructor, NativeMethod, ObjectRef};
use crate::value::Value;

/// Describes one class before registration
///
/// Created by [`ClassRegistry::class`](crate::registry::ClassRegistry::class)
/// and friends, which reserve the class id up front so the builder can mint
/// type variables and self-referencing types.
#[derive(Debug)]
pub struct ClassBuilder {
    pub(crate) id: ClassId,
    pub(crate) name: String,
    pub(crate) kind: ClassKind,
    pub(crate) modifiers: Modifiers,
    pub(crate) type_params: Vec<TypeVariable>,
    pub(crate) superclass: Option<Type>,
    pub(crate) interfaces: Vec<Type>,
    pub(crate) fields: Vec<FieldBuilder>,
    pub(crate) methods: Vec<MethodBuilder>,
    pub(crate) constructors: Vec<ConstructorBuilder>,
}

impl ClassBuilder {
    pub(crate) fn new(id: ClassId, name: String, kind: ClassKind) -> Self {
        let (modifiers, superclass) = match kind {
            ClassKind::Class => (Modifiers::PUBLIC, Some(Type::object())),
            ClassKind::Interface => (Modifiers::PUBLIC.union(Modifiers::ABSTRACT), None),
            ClassKind::Record => (Modifiers::PUBLIC.union(Modifiers::FINAL), Some(Type::object())),
        };
        Self {
            id,
            name,
            kind,
            modifiers,
            type_params: Vec::new(),
            superclass,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    /// Id this class will be registered under
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Plain type referring to this class
    pub fn this_type(&self) -> Type {
        Type::class(self.id)
    }

    /// Declare an unbounded type parameter and return it
    pub fn type_param(&mut self, name: &str) -> TypeVariable {
        let var = TypeVariable::new(name, self.id);
        self.type_params.push(var.clone());
        var
    }

    /// Declare a type parameter with an upper bound and return it
    pub fn type_param_bounded(&mut self, name: &str, bound: Type) -> TypeVariable {
        let var = TypeVariable::new(name, self.id).bounded_by(bound);
        self.type_params.push(var.clone());
        var
    }

    /// Set the superclass (defaults to `Object` for classes)
    pub fn extends(mut self, superclass: impl Into<Type>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Add an implemented interface (extended interface, for interfaces)
    pub fn implements(mut self, interface: impl Into<Type>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Mark the class abstract
    pub fn abstract_class(mut self) -> Self {
        self.modifiers = self.modifiers.union(Modifiers::ABSTRACT);
        self
    }

    /// Add a field
    pub fn field(mut self, field: FieldBuilder) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a method
    pub fn method(mut self, method: MethodBuilder) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a constructor
    pub fn constructor(mut self, constructor: ConstructorBuilder) -> Self {
        self.constructors.push(constructor);
        self
    }
}

/// Describes one field
#[derive(Debug, Clone)]
pub struct FieldBuilder {
    pub(crate) name: String,
    pub(crate) ty: Type,
    pub(crate) modifiers: Modifiers,
    pub(crate) initial: Value,
}

impl FieldBuilder {
    /// Public instance field, initially `Null`
    pub fn new(name: &str, ty: impl Into<Type>) -> Self {
        Self {
            name: name.to_string(),
            ty: ty.into(),
            modifiers: Modifiers::PUBLIC,
            initial: Value::Null,
        }
    }

    /// Make the field private
    pub fn private(mut self) -> Self {
        self.modifiers = self.modifiers.with_visibility(Modifiers::PRIVATE);
        self
    }

    /// Make the field protected
    pub fn protected(mut self) -> Self {
        self.modifiers = self.modifiers.with_visibility(Modifiers::PROTECTED);
        self
    }

    /// Make the field static
    pub fn static_(mut self) -> Self {
        self.modifiers = self.modifiers.union(Modifiers::STATIC);
        self
    }

    /// Make the field final
    pub fn final_(mut self) -> Self {
        self.modifiers = self.modifiers.union(Modifiers::FINAL);
        self
    }

    /// Initial value for new instances (or the class, for statics)
    pub fn initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = value.into();
        self
    }
}

/// Describes one method
#[derive(Clone)]
pub struct MethodBuilder {
    pub(crate) name: String,
    pub(crate) return_type: Type,
    pub(crate) params: Vec<Type>,
    pub(crate) modifiers: Modifiers,
    pub(crate) body: Option<MethodBody>,
}

/// Method implementation as declared, before it is bound to its class
#[derive(Clone)]
pub(crate) enum MethodBody {
    Native(NativeMethod),
    Reads(String),
    Writes(String),
}

impl MethodBody {
    /// Turn the declaration into a callable body
    ///
    /// Field accessors resolve their field against `slots` (the declaring
    /// class's layout, most derived first), so a subclass field with the same
    /// name never shadows the one the declaring class sees.
    pub(crate) fn bind<'a>(self, mut slots: impl Iterator<Item = &'a FieldKey>) -> NativeMethod {
        match self {
            MethodBody::Native(body) => body,
            MethodBody::Reads(field) => {
                let key = slots.find(|key| key.name == field).cloned();
                Arc::new(move |this: &Value, _: &[Value]| -> Result<Value, String> {
                    let obj = this
                        .as_object()
                        .ok_or_else(|| format!("no receiver to read '{}' from", field))?;
                    key.as_ref()
                        .and_then(|key| obj.get_field(key))
                        .ok_or_else(|| format!("no field '{}'", field))
                })
            }
            MethodBody::Writes(field) => {
                let key = slots.find(|key| key.name == field).cloned();
                Arc::new(move |this: &Value, args: &[Value]| -> Result<Value, String> {
                    let obj = this
                        .as_object()
                        .ok_or_else(|| format!("no receiver to write '{}' on", field))?;
                    let value = args.first().cloned().unwrap_or_default();
                    if key.as_ref().is_some_and(|key| obj.set_field(key, value)) {
                        Ok(Value::Null)
                    } else {
                        Err(format!("no field '{}'", field))
                    }
                })
            }
        }
    }
}

impl MethodBuilder {
    /// Public method returning `void`, no parameters, no body
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            return_type: Type::primitive(Primitive::Void),
            params: Vec::new(),
            modifiers: Modifiers::PUBLIC,
            body: None,
        }
    }

    /// Declared return type
    pub fn returns(mut self, ty: impl Into<Type>) -> Self {
        self.return_type = ty.into();
        self
    }

    /// Append a declared parameter
    pub fn param(mut self, ty: impl Into<Type>) -> Self {
        self.params.push(ty.into());
        self
    }

    /// Make the method private
    pub fn private(mut self) -> Self {
        self.modifiers = self.modifiers.with_visibility(Modifiers::PRIVATE);
        self
    }

    /// Make the method protected
    pub fn protected(mut self) -> Self {
        self.modifiers = self.modifiers.with_visibility(Modifiers::PROTECTED);
        self
    }

    /// Make the method static
    pub fn static_(mut self) -> Self {
        self.modifiers = self.modifiers.union(Modifiers::STATIC);
        self
    }

    /// Mark the method as a compiler-generated bridge
    pub fn bridge(mut self) -> Self {
        self.modifiers = self
            .modifiers
            .union(Modifiers::BRIDGE)
            .union(Modifiers::SYNTHETIC);
        self
    }

    /// Native implementation
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.body = Some(MethodBody::Native(Arc::new(body)));
        self
    }

    /// Implementation returning the named instance field of `this`
    ///
    /// The field is looked up from the declaring class upward, the way source
    /// code in that class would see it.
    pub fn reads(mut self, field: &str) -> Self {
        self.body = Some(MethodBody::Reads(field.to_string()));
        self
    }

    /// Implementation storing the first argument into the named instance field
    /// of `this`
    pub fn writes(mut self, field: &str) -> Self {
        self.body = Some(MethodBody::Writes(field.to_string()));
        self
    }
}

impl std::fmt::Debug for MethodBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodBuilder")
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .field("params", &self.params)
            .field("modifiers", &self.modifiers)
            .finish()
    }
}

/// Describes one constructor
#[derive(Clone)]
pub struct ConstructorBuilder {
    pub(crate) params: Vec<Type>,
    pub(crate) modifiers: Modifiers,
    pub(crate) body: Option<NativeConstructor>,
}

impl ConstructorBuilder {
    /// Public constructor with no parameters and no body
    pub fn new() -> Self {
        Self {
            params: Vec::new(),
            modifiers: Modifiers::PUBLIC,
            body: None,
        }
    }

    /// Append a declared parameter
    pub fn param(mut self, ty: impl Into<Type>) -> Self {
        self.params.push(ty.into());
        self
    }

    /// Make the constructor private
    pub fn private(mut self) -> Self {
        self.modifiers = self.modifiers.with_visibility(Modifiers::PRIVATE);
        self
    }

    /// Native initializer
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&ObjectRef, &[Value]) -> Result<(), String> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }
}

impl Default for ConstructorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConstructorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructorBuilder")
            .field("params", &self.params)
            .field("modifiers", &self.modifiers)
            .finish()
    }
}
