//! Per-class property metadata
//!
//! [`ClassMetadata`] is the normalized view of one class: which properties
//! can be read, which can be written, through which accessor, and with which
//! generics-resolved type. It is built once from the registry and never
//! changes afterwards.
//!
//! Build order matters and is fixed:
//!
//! 1. default constructor
//! 2. method collection over the class chain and its interfaces
//! 3. records: every zero-argument method is a getter, and building stops
//! 4. getters, folding overloads down to one winner per property
//! 5. setters, preferring the one matching the resolved getter type
//! 6. field fallback for whatever is still missing
//! 7. property name lists and the case-insensitive index

use std::sync::Arc;

use refract_types::{type_to_class, ClassId, ClassRef, Type, TypeHierarchy, TypeResolver};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace, warn};

use crate::class::{ClassDef, ConstructorDef, FieldDef, Member, MethodDef};
use crate::error::{InvokeError, ReflectError};
use crate::invoker::{AmbiguousInvoker, FieldInvoker, Invoker, MethodInvoker};
use crate::naming;
use crate::permissions::{AccessKind, SharedPermissions};
use crate::registry::ClassRegistry;
use crate::value::Value;

/// Reflected property metadata for one class
#[derive(Debug)]
pub struct ClassMetadata {
    class: ClassId,
    class_name: String,
    readable_property_names: Vec<String>,
    writable_property_names: Vec<String>,
    set_methods: FxHashMap<String, Invoker>,
    get_methods: FxHashMap<String, Invoker>,
    set_types: FxHashMap<String, ClassRef>,
    get_types: FxHashMap<String, ClassRef>,
    default_constructor: Option<Arc<ConstructorDef>>,
    case_insensitive_property_map: FxHashMap<String, String>,
    permissions: SharedPermissions,
}

impl ClassMetadata {
    /// Reflect over a registered class
    pub fn build(registry: &ClassRegistry, class: ClassId) -> Result<Self, ReflectError> {
        let def = registry.class_def(class)?;
        let mut builder = MetadataBuilder {
            registry,
            def,
            source: Type::class(class),
            meta: ClassMetadata {
                class,
                class_name: def.name().to_string(),
                readable_property_names: Vec::new(),
                writable_property_names: Vec::new(),
                set_methods: FxHashMap::default(),
                get_methods: FxHashMap::default(),
                set_types: FxHashMap::default(),
                get_types: FxHashMap::default(),
                default_constructor: None,
                case_insensitive_property_map: FxHashMap::default(),
                permissions: Arc::clone(registry.permissions()),
            },
        };

        builder.add_default_constructor();
        let methods = builder.class_methods()?;
        if def.is_record() {
            builder.add_record_get_methods(&methods)?;
        } else {
            builder.add_get_methods(&methods)?;
            builder.add_set_methods(&methods)?;
            builder.add_fields()?;
        }
        let meta = builder.finish();

        debug!(
            class = %meta.class_name,
            readable = meta.readable_property_names.len(),
            writable = meta.writable_property_names.len(),
            "built class metadata"
        );
        Ok(meta)
    }

    /// Class this metadata describes
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Name of the class this metadata describes
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The zero-argument constructor
    pub fn default_constructor(&self) -> Result<&Arc<ConstructorDef>, ReflectError> {
        self.default_constructor
            .as_ref()
            .ok_or_else(|| ReflectError::NoDefaultConstructor {
                class: self.class_name.clone(),
            })
    }

    /// Whether a zero-argument constructor exists
    pub fn has_default_constructor(&self) -> bool {
        self.default_constructor.is_some()
    }

    /// Create an instance through the default constructor
    ///
    /// A restricted constructor is forced accessible once when the permission
    /// store allows invoking private members of the class.
    pub fn new_instance(&self) -> Result<Value, ReflectError> {
        let ctor = self.default_constructor()?;
        let member = ctor.qualified_name();
        match ctor.new_instance(&[]) {
            Err(InvokeError::IllegalAccess)
                if self
                    .permissions
                    .read()
                    .can_control_member_accessible(self.class, AccessKind::Invoke) =>
            {
                ctor.set_accessible(true);
                ctor.new_instance(&[]).map_err(|e| e.into_reflect(&member))
            }
            other => other.map_err(|e| e.into_reflect(&member)),
        }
    }

    /// Accessor writing `property`
    pub fn setter_invoker(&self, property: &str) -> Result<&Invoker, ReflectError> {
        self.set_methods
            .get(property)
            .ok_or_else(|| self.no_such_property(property, "setter"))
    }

    /// Accessor reading `property`
    pub fn getter_invoker(&self, property: &str) -> Result<&Invoker, ReflectError> {
        self.get_methods
            .get(property)
            .ok_or_else(|| self.no_such_property(property, "getter"))
    }

    /// Resolved type accepted by the setter for `property`
    pub fn setter_type(&self, property: &str) -> Result<&ClassRef, ReflectError> {
        self.set_types
            .get(property)
            .ok_or_else(|| self.no_such_property(property, "setter"))
    }

    /// Resolved type returned by the getter for `property`
    pub fn getter_type(&self, property: &str) -> Result<&ClassRef, ReflectError> {
        self.get_types
            .get(property)
            .ok_or_else(|| self.no_such_property(property, "getter"))
    }

    /// Readable property names, sorted
    pub fn readable_property_names(&self) -> &[String] {
        &self.readable_property_names
    }

    /// Writable property names, sorted
    pub fn writable_property_names(&self) -> &[String] {
        &self.writable_property_names
    }

    /// Whether `property` has a setter (possibly an ambiguous one)
    pub fn has_setter(&self, property: &str) -> bool {
        self.set_methods.contains_key(property)
    }

    /// Whether `property` has a getter (possibly an ambiguous one)
    pub fn has_getter(&self, property: &str) -> bool {
        self.get_methods.contains_key(property)
    }

    /// Canonical spelling of a property name, ignoring case
    pub fn find_canonical_name(&self, name: &str) -> Option<&str> {
        self.case_insensitive_property_map
            .get(&name.to_uppercase())
            .map(String::as_str)
    }

    fn no_such_property(&self, property: &str, kind: &'static str) -> ReflectError {
        ReflectError::NoSuchProperty {
            property: property.to_string(),
            class: self.class_name.clone(),
            kind,
        }
    }
}

impl PartialEq for ClassMetadata {
    fn eq(&self, other: &Self) -> bool {
        let same_ctor = match (&self.default_constructor, &other.default_constructor) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        self.class == other.class
            && same_ctor
            && self.readable_property_names == other.readable_property_names
            && self.writable_property_names == other.writable_property_names
            && self.get_methods == other.get_methods
            && self.set_methods == other.set_methods
            && self.get_types == other.get_types
            && self.set_types == other.set_types
            && self.case_insensitive_property_map == other.case_insensitive_property_map
    }
}

/// Erased signature used to drop overridden declarations
#[derive(Debug, PartialEq, Eq, Hash)]
struct MethodSignature {
    return_class: ClassRef,
    name: String,
    params: Vec<ClassRef>,
}

impl MethodSignature {
    fn of(method: &MethodDef) -> Self {
        Self {
            return_class: method.return_class(),
            name: method.name().to_string(),
            params: method.param_classes(),
        }
    }
}

/// Candidate accessors grouped by property, in discovery order
#[derive(Default)]
struct Conflicts {
    order: Vec<String>,
    by_name: FxHashMap<String, Vec<Arc<MethodDef>>>,
}

impl Conflicts {
    fn add(&mut self, property: String, method: Arc<MethodDef>) {
        match self.by_name.get_mut(&property) {
            Some(candidates) => candidates.push(method),
            None => {
                self.order.push(property.clone());
                self.by_name.insert(property, vec![method]);
            }
        }
    }

    fn into_groups(mut self) -> impl Iterator<Item = (String, Vec<Arc<MethodDef>>)> {
        self.order.into_iter().filter_map(move |name| {
            let candidates = self.by_name.remove(&name)?;
            Some((name, candidates))
        })
    }
}

struct MetadataBuilder<'r> {
    registry: &'r ClassRegistry,
    def: &'r Arc<ClassDef>,
    source: Type,
    meta: ClassMetadata,
}

impl<'r> MetadataBuilder<'r> {
    fn resolver(&self) -> TypeResolver<'r, ClassRegistry> {
        TypeResolver::new(self.registry)
    }

    fn add_default_constructor(&mut self) {
        self.meta.default_constructor = self
            .def
            .declared_constructors()
            .iter()
            .find(|c| c.param_count() == 0)
            .cloned();
    }

    /// Every method of the class chain below `Object` plus the methods of
    /// each implemented interface, first declaration of a signature winning
    fn class_methods(&self) -> Result<Vec<Arc<MethodDef>>, ReflectError> {
        let mut seen = FxHashSet::default();
        let mut methods = Vec::new();
        let mut add_unique = |candidates: &[Arc<MethodDef>]| {
            for method in candidates {
                if method.modifiers().is_bridge() {
                    continue;
                }
                if seen.insert(MethodSignature::of(method)) {
                    methods.push(Arc::clone(method));
                }
            }
        };

        let mut current = Some(self.meta.class);
        while let Some(class) = current {
            if class == ClassId::OBJECT {
                break;
            }
            let def = self.registry.class_def(class)?;
            add_unique(def.declared_methods());
            for interface in self.registry.interfaces(class) {
                add_unique(&self.registry.interface_methods(interface));
            }
            current = self.registry.superclass(class);
        }
        Ok(methods)
    }

    fn add_record_get_methods(&mut self, methods: &[Arc<MethodDef>]) -> Result<(), ReflectError> {
        for method in methods.iter().filter(|m| m.param_count() == 0) {
            self.add_get_method(method.name().to_string(), Arc::clone(method), false)?;
        }
        Ok(())
    }

    fn add_get_methods(&mut self, methods: &[Arc<MethodDef>]) -> Result<(), ReflectError> {
        let mut conflicting = Conflicts::default();
        for method in methods
            .iter()
            .filter(|m| m.param_count() == 0 && naming::is_getter(m.name()))
        {
            let property = naming::method_to_property(method.name())?;
            if naming::is_valid_property_name(&property) {
                conflicting.add(property, Arc::clone(method));
            }
        }

        for (property, candidates) in conflicting.into_groups() {
            let (winner, ambiguous) = self.pick_getter(&property, candidates);
            if let Some(winner) = winner {
                self.add_get_method(property, winner, ambiguous)?;
            }
        }
        Ok(())
    }

    /// Fold getter candidates down to one, reporting whether the fold hit an
    /// unresolvable pair
    fn pick_getter(
        &self,
        property: &str,
        candidates: Vec<Arc<MethodDef>>,
    ) -> (Option<Arc<MethodDef>>, bool) {
        let mut candidates = candidates.into_iter();
        let Some(mut winner) = candidates.next() else {
            return (None, false);
        };
        for candidate in candidates {
            let winner_type = winner.return_class();
            let candidate_type = candidate.return_class();
            if candidate_type == winner_type {
                if !candidate_type.is_boolean() {
                    trace!(property, "getters with identical return types");
                    return (Some(winner), true);
                }
                if candidate.name().starts_with("is") {
                    winner = candidate;
                }
            } else if self.registry.is_assignable_from(&candidate_type, &winner_type) {
                // winner's type is narrower; keep it
            } else if self.registry.is_assignable_from(&winner_type, &candidate_type) {
                winner = candidate;
            } else {
                trace!(property, "getters with unrelated return types");
                return (Some(winner), true);
            }
        }
        (Some(winner), false)
    }

    fn add_get_method(
        &mut self,
        property: String,
        method: Arc<MethodDef>,
        ambiguous: bool,
    ) -> Result<(), ReflectError> {
        let invoker = if ambiguous {
            let message = format!(
                "Illegal overloaded getter method with ambiguous type for property '{}' in class '{}'. \
                 This breaks the accessor naming contract and can cause unpredictable results.",
                property,
                self.class_name_of(method.declaring_class()),
            );
            warn!(class = %self.meta.class_name, property = %property, "ambiguous getter");
            Invoker::Ambiguous(AmbiguousInvoker::new(Arc::clone(&method), message))
        } else {
            Invoker::Method(MethodInvoker::new(
                Arc::clone(&method),
                Arc::clone(&self.meta.permissions),
            ))
        };
        let resolved = self.resolver().resolve_return_type(&*method, &self.source)?;
        self.meta.get_types.insert(property.clone(), type_to_class(&resolved));
        self.meta.get_methods.insert(property, invoker);
        Ok(())
    }

    fn add_set_methods(&mut self, methods: &[Arc<MethodDef>]) -> Result<(), ReflectError> {
        let mut conflicting = Conflicts::default();
        for method in methods
            .iter()
            .filter(|m| m.param_count() == 1 && naming::is_setter(m.name()))
        {
            let property = naming::method_to_property(method.name())?;
            if naming::is_valid_property_name(&property) {
                conflicting.add(property, Arc::clone(method));
            }
        }

        for (property, setters) in conflicting.into_groups() {
            let getter_type = self.meta.get_types.get(&property).cloned();
            let getter_ambiguous = self
                .meta
                .get_methods
                .get(&property)
                .is_some_and(Invoker::is_ambiguous);

            let mut setter_ambiguous = false;
            let mut matched: Option<Arc<MethodDef>> = None;
            for setter in setters {
                let param_type = setter.param_classes().into_iter().next();
                if !getter_ambiguous && param_type.is_some() && param_type == getter_type {
                    matched = Some(setter);
                    break;
                }
                if !setter_ambiguous {
                    matched = self.pick_better_setter(matched, setter, &property)?;
                    setter_ambiguous = matched.is_none();
                }
            }
            if let Some(setter) = matched {
                self.add_set_method(property, setter)?;
            }
        }
        Ok(())
    }

    /// Narrower parameter type wins; unrelated types register an ambiguous
    /// setter and leave no winner
    fn pick_better_setter(
        &mut self,
        current: Option<Arc<MethodDef>>,
        candidate: Arc<MethodDef>,
        property: &str,
    ) -> Result<Option<Arc<MethodDef>>, ReflectError> {
        let Some(current) = current else {
            return Ok(Some(candidate));
        };
        let current_type = first_param_class(&current);
        let candidate_type = first_param_class(&candidate);
        if self.registry.is_assignable_from(&current_type, &candidate_type) {
            return Ok(Some(candidate));
        }
        if self.registry.is_assignable_from(&candidate_type, &current_type) {
            return Ok(Some(current));
        }

        let message = format!(
            "Ambiguous setters defined for property '{}' in class '{}' with types '{}' and '{}'.",
            property,
            self.class_name_of(candidate.declaring_class()),
            self.registry.class_ref_name(&current_type),
            self.registry.class_ref_name(&candidate_type),
        );
        warn!(class = %self.meta.class_name, property, "ambiguous setters");
        let resolved = self.resolver().resolve_param_types(&*current, &self.source)?;
        let setter_type = resolved.first().map(type_to_class).unwrap_or(ClassRef::OBJECT);
        self.meta.set_types.insert(property.to_string(), setter_type);
        self.meta.set_methods.insert(
            property.to_string(),
            Invoker::Ambiguous(AmbiguousInvoker::new(current, message)),
        );
        Ok(None)
    }

    fn add_set_method(&mut self, property: String, method: Arc<MethodDef>) -> Result<(), ReflectError> {
        let resolved = self.resolver().resolve_param_types(&*method, &self.source)?;
        let setter_type = resolved.first().map(type_to_class).unwrap_or(ClassRef::OBJECT);
        self.meta.set_types.insert(property.clone(), setter_type);
        self.meta.set_methods.insert(
            property,
            Invoker::Method(MethodInvoker::new(method, Arc::clone(&self.meta.permissions))),
        );
        Ok(())
    }

    /// Expose fields of the class chain that no accessor method covers
    fn add_fields(&mut self) -> Result<(), ReflectError> {
        let mut current = Some(self.meta.class);
        while let Some(class) = current {
            let def = self.registry.class_def(class)?;
            for field in def.declared_fields() {
                if !self.meta.set_methods.contains_key(field.name()) {
                    let modifiers = field.modifiers();
                    if !(modifiers.is_final() && modifiers.is_static()) {
                        self.add_set_field(field)?;
                    }
                }
                if !self.meta.get_methods.contains_key(field.name()) {
                    self.add_get_field(field)?;
                }
            }
            current = self.registry.superclass(class);
        }
        Ok(())
    }

    fn add_set_field(&mut self, field: &Arc<FieldDef>) -> Result<(), ReflectError> {
        if !naming::is_valid_property_name(field.name()) {
            return Ok(());
        }
        let resolved = self.resolver().resolve_field_type(&**field, &self.source)?;
        let name = field.name().to_string();
        self.meta.set_types.insert(name.clone(), type_to_class(&resolved));
        self.meta.set_methods.insert(
            name,
            Invoker::SetField(FieldInvoker::new(
                Arc::clone(field),
                Arc::clone(&self.meta.permissions),
            )),
        );
        Ok(())
    }

    fn add_get_field(&mut self, field: &Arc<FieldDef>) -> Result<(), ReflectError> {
        if !naming::is_valid_property_name(field.name()) {
            return Ok(());
        }
        let resolved = self.resolver().resolve_field_type(&**field, &self.source)?;
        let name = field.name().to_string();
        self.meta.get_types.insert(name.clone(), type_to_class(&resolved));
        self.meta.get_methods.insert(
            name,
            Invoker::GetField(FieldInvoker::new(
                Arc::clone(field),
                Arc::clone(&self.meta.permissions),
            )),
        );
        Ok(())
    }

    /// Sorted name lists, then the case-insensitive index: readable names
    /// first, writable names second, so a writable spelling wins a collision
    fn finish(self) -> ClassMetadata {
        let mut meta = self.meta;
        meta.readable_property_names = meta.get_methods.keys().cloned().collect();
        meta.readable_property_names.sort();
        meta.writable_property_names = meta.set_methods.keys().cloned().collect();
        meta.writable_property_names.sort();

        for name in meta
            .readable_property_names
            .iter()
            .chain(meta.writable_property_names.iter())
        {
            meta.case_insensitive_property_map
                .insert(name.to_uppercase(), name.clone());
        }
        meta
    }

    fn class_name_of(&self, class: ClassId) -> String {
        self.registry.class_ref_name(&ClassRef::Declared(class))
    }
}

fn first_param_class(method: &MethodDef) -> ClassRef {
    method
        .param_classes()
        .into_iter()
        .next()
        .unwrap_or(ClassRef::OBJECT)
}
