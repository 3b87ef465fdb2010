//! Class registry
//!
//! The registry is the host runtime the metadata engine reflects over. It
//! owns every [`ClassDef`], answers [`TypeHierarchy`] queries for the type
//! resolver, and builds each class's instance layout and vtable when the
//! class is registered.
//!
//! Classes are registered bottom-up: a superclass or interface must already
//! be registered, which keeps the hierarchy acyclic by construction.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use refract_types::{ClassId, Type, TypeHierarchy, TypeVariable};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::builder::{ClassBuilder, ConstructorBuilder};
use crate::class::{ClassDef, ClassKind, ConstructorDef, FieldDef, MethodDef, Modifiers};
use crate::error::ReflectError;
use crate::object::{ClassLayout, VTable};
use crate::permissions::{PermissionStore, SharedPermissions};

/// Ids of the classes every registry starts with
pub mod builtins {
    use refract_types::ClassId;

    /// `Object`, the root of every hierarchy
    pub const OBJECT: ClassId = ClassId::OBJECT;
    /// `String`
    pub const STRING: ClassId = ClassId::new(1);
    /// `Number` (abstract)
    pub const NUMBER: ClassId = ClassId::new(2);
    /// `Integer extends Number`
    pub const INTEGER: ClassId = ClassId::new(3);
    /// `Long extends Number`
    pub const LONG: ClassId = ClassId::new(4);
    /// `Double extends Number`
    pub const DOUBLE: ClassId = ClassId::new(5);
    /// `Boolean`
    pub const BOOLEAN: ClassId = ClassId::new(6);
}

/// Registry of every class known to the runtime
pub struct ClassRegistry {
    classes: Vec<Option<Arc<ClassDef>>>,
    by_name: FxHashMap<String, ClassId>,
    permissions: SharedPermissions,
}

impl ClassRegistry {
    /// Create a registry holding `Object` and the well-known value classes
    pub fn new() -> Self {
        let mut registry = Self {
            classes: Vec::new(),
            by_name: FxHashMap::default(),
            permissions: Arc::new(RwLock::new(PermissionStore::new())),
        };

        let mut object = registry.class("Object");
        object.superclass = None;
        registry.install(object);

        let string = registry.class("String");
        registry.install(final_class(string));
        let number = registry.class("Number").abstract_class();
        registry.install(number);
        for name in ["Integer", "Long", "Double"] {
            let boxed = registry.class(name).extends(builtins::NUMBER);
            registry.install(final_class(boxed));
        }
        let boolean = registry.class("Boolean");
        registry.install(final_class(boolean));

        debug!(classes = registry.len(), "class registry bootstrapped");
        registry
    }

    /// Start describing a class; its id is reserved immediately
    pub fn class(&mut self, name: &str) -> ClassBuilder {
        self.reserve(name, ClassKind::Class)
    }

    /// Start describing an interface
    pub fn interface(&mut self, name: &str) -> ClassBuilder {
        self.reserve(name, ClassKind::Interface)
    }

    /// Start describing a value record
    pub fn record(&mut self, name: &str) -> ClassBuilder {
        self.reserve(name, ClassKind::Record)
    }

    fn reserve(&mut self, name: &str, kind: ClassKind) -> ClassBuilder {
        let id = ClassId::new(self.classes.len() as u32);
        self.classes.push(None);
        ClassBuilder::new(id, name.to_string(), kind)
    }

    /// Validate and register a described class
    pub fn register(&mut self, builder: ClassBuilder) -> Result<ClassId, ReflectError> {
        match self.classes.get(builder.id.index()) {
            Some(None) => {}
            Some(Some(_)) => return Err(ReflectError::DuplicateClass(builder.name)),
            None => {
                return Err(ReflectError::InvalidHierarchy(format!(
                    "{} was not reserved by this registry",
                    builder.id
                )))
            }
        }
        if self.by_name.contains_key(&builder.name) {
            return Err(ReflectError::DuplicateClass(builder.name));
        }
        self.validate_supertypes(&builder)?;
        Ok(self.install(builder).id)
    }

    fn validate_supertypes(&self, builder: &ClassBuilder) -> Result<(), ReflectError> {
        let invalid = |msg: String| ReflectError::InvalidHierarchy(format!("{}: {}", builder.name, msg));

        match (&builder.superclass, builder.kind) {
            (Some(_), ClassKind::Interface) => {
                return Err(invalid("an interface cannot extend a class".to_string()))
            }
            (Some(superclass), _) => {
                let raw = superclass
                    .raw_class()
                    .ok_or_else(|| invalid(format!("superclass {:?} is not a class type", superclass)))?;
                let parent = self
                    .get(raw)
                    .ok_or_else(|| invalid(format!("superclass {} is not registered", raw)))?;
                if parent.is_interface() {
                    return Err(invalid(format!("cannot extend interface {}", parent.name)));
                }
                if parent.modifiers.is_final() {
                    return Err(invalid(format!("cannot extend final class {}", parent.name)));
                }
            }
            (None, _) => {}
        }

        for interface in &builder.interfaces {
            let raw = interface
                .raw_class()
                .ok_or_else(|| invalid(format!("interface {:?} is not a class type", interface)))?;
            match self.get(raw) {
                Some(def) if def.is_interface() => {}
                Some(def) => return Err(invalid(format!("{} is not an interface", def.name))),
                None => return Err(invalid(format!("interface {} is not registered", raw))),
            }
        }
        Ok(())
    }

    /// Build the definition, layout and vtable for a validated class
    fn install(&mut self, builder: ClassBuilder) -> Arc<ClassDef> {
        let ClassBuilder {
            id,
            name,
            kind,
            modifiers,
            type_params,
            superclass,
            interfaces,
            fields,
            methods,
            constructors,
        } = builder;
        let is_interface = kind == ClassKind::Interface;

        let fields: Vec<Arc<FieldDef>> = fields
            .into_iter()
            .map(|f| {
                let modifiers = if is_interface {
                    f.modifiers.union(Modifiers::STATIC).union(Modifiers::FINAL)
                } else {
                    f.modifiers
                };
                Arc::new(FieldDef::new(f.name, id, name.clone(), f.ty, modifiers, f.initial))
            })
            .collect();

        let parent_layout = superclass
            .as_ref()
            .and_then(Type::raw_class)
            .and_then(|raw| self.get(raw))
            .map(|def| Arc::clone(&def.layout));

        let mut slots: Vec<_> = fields
            .iter()
            .filter(|f| !f.modifiers().is_static())
            .map(|f| (f.key(), f.initial_value().clone()))
            .collect();
        if let Some(parent) = &parent_layout {
            slots.extend(parent.field_keys().cloned().zip(parent.initial_values()));
        }

        let methods: Vec<Arc<MethodDef>> = methods
            .into_iter()
            .map(|m| {
                let modifiers = if m.body.is_none() && !m.modifiers.is_static() {
                    m.modifiers.union(Modifiers::ABSTRACT)
                } else {
                    m.modifiers
                };
                Arc::new(MethodDef::new(
                    m.name,
                    id,
                    name.clone(),
                    m.return_type,
                    m.params,
                    modifiers,
                    m.body.map(|body| body.bind(slots.iter().map(|(key, _)| key))),
                ))
            })
            .collect();

        let mut vtable = parent_layout
            .as_ref()
            .map(|parent| parent.vtable().clone())
            .unwrap_or_else(VTable::new);
        for method in methods.iter().filter(|m| is_virtual(m)) {
            if let Some(body) = method.body() {
                vtable.insert(method.slot(), Arc::clone(body));
            }
        }
        for default in self.default_methods(&interfaces) {
            let slot = default.slot();
            if vtable.lookup(&slot).is_none() {
                if let Some(body) = default.body() {
                    vtable.insert(slot, Arc::clone(body));
                }
            }
        }

        let instantiable = !is_interface && !modifiers.is_abstract();
        let layout = Arc::new(ClassLayout::new(id, instantiable, slots, vtable));

        let mut constructors = constructors;
        if constructors.is_empty() && !is_interface {
            constructors.push(ConstructorBuilder::new());
        }
        let constructors = constructors
            .into_iter()
            .map(|c| {
                Arc::new(ConstructorDef::new(
                    id,
                    name.clone(),
                    c.params,
                    c.modifiers,
                    c.body,
                    Arc::clone(&layout),
                ))
            })
            .collect();

        let def = Arc::new(ClassDef {
            id,
            name,
            kind,
            modifiers,
            type_params,
            superclass,
            interfaces,
            fields,
            methods,
            constructors,
            layout,
        });

        debug!(class = %def.name, id = id.index(), kind = ?def.kind, "registered class");
        if let Some(slot) = self.classes.get_mut(id.index()) {
            *slot = Some(Arc::clone(&def));
        }
        self.by_name.insert(def.name.clone(), id);
        def
    }

    /// Concrete instance methods reachable through `interfaces`, nearest first
    fn default_methods(&self, interfaces: &[Type]) -> Vec<Arc<MethodDef>> {
        interfaces
            .iter()
            .filter_map(Type::raw_class)
            .flat_map(|iface| self.interface_methods(iface))
            .filter(|m| is_virtual(m) && m.body().is_some())
            .collect()
    }

    /// A registered class
    pub fn get(&self, id: ClassId) -> Option<&Arc<ClassDef>> {
        self.classes.get(id.index()).and_then(Option::as_ref)
    }

    /// A registered class, or `UnknownClass`
    pub fn class_def(&self, id: ClassId) -> Result<&Arc<ClassDef>, ReflectError> {
        self.get(id)
            .ok_or_else(|| ReflectError::UnknownClass(id.to_string()))
    }

    /// Look up a class id by name
    pub fn find_class(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether nothing is registered (never true after `new`)
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Permission store consulted by accessors over this registry
    pub fn permissions(&self) -> &SharedPermissions {
        &self.permissions
    }

    /// Public methods of an interface and, transitively, of every interface it
    /// extends; the interface's own methods come first
    pub fn interface_methods(&self, interface: ClassId) -> Vec<Arc<MethodDef>> {
        let mut methods = Vec::new();
        let mut visited = FxHashSet::default();
        self.collect_interface_methods(interface, &mut visited, &mut methods);
        methods
    }

    fn collect_interface_methods(
        &self,
        interface: ClassId,
        visited: &mut FxHashSet<ClassId>,
        out: &mut Vec<Arc<MethodDef>>,
    ) {
        if !visited.insert(interface) {
            return;
        }
        let Some(def) = self.get(interface) else {
            return;
        };
        out.extend(
            def.methods
                .iter()
                .filter(|m| m.modifiers().is_public())
                .cloned(),
        );
        for parent in def.interfaces.iter().filter_map(Type::raw_class) {
            self.collect_interface_methods(parent, visited, out);
        }
    }
}

fn final_class(builder: ClassBuilder) -> ClassBuilder {
    let mut builder = builder;
    builder.modifiers = builder.modifiers.union(Modifiers::FINAL);
    builder
}

fn is_virtual(method: &MethodDef) -> bool {
    let modifiers = method.modifiers();
    !modifiers.is_static() && !modifiers.is_private()
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.by_name.keys().collect();
        names.sort();
        f.debug_struct("ClassRegistry").field("classes", &names).finish()
    }
}

impl TypeHierarchy for ClassRegistry {
    fn class_name(&self, class: ClassId) -> Option<&str> {
        self.get(class).map(|def| def.name.as_str())
    }

    fn type_parameters(&self, class: ClassId) -> &[TypeVariable] {
        self.get(class).map(|def| def.type_params.as_slice()).unwrap_or(&[])
    }

    fn generic_superclass(&self, class: ClassId) -> Option<&Type> {
        self.get(class).and_then(|def| def.superclass.as_ref())
    }

    fn generic_interfaces(&self, class: ClassId) -> &[Type] {
        self.get(class).map(|def| def.interfaces.as_slice()).unwrap_or(&[])
    }
}
