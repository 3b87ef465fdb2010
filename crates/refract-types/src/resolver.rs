//! Generic type resolution
//!
//! Given a declared type as written inside its declaring class and the type
//! through which a member is being observed (a plain subclass, or a
//! parameterized instantiation of one), [`TypeResolver`] substitutes type
//! variables with whatever the inheritance chain binds them to.
//!
//! ```text
//! class Box<T> { T value; }
//! class StringBox extends Box<String> {}
//!
//! resolve(T, source = StringBox, declaring = Box)  =>  String
//! ```

use tracing::trace;

use crate::error::TypeError;
use crate::hierarchy::TypeHierarchy;
use crate::ty::{ClassId, ClassRef, ParameterizedType, Type, TypeVariable, WildcardType};

/// A field as seen by the resolver
pub trait GenericField {
    /// Declared type of the field
    fn generic_type(&self) -> &Type;
    /// Class declaring the field
    fn declaring_class(&self) -> ClassId;
}

/// A method as seen by the resolver
pub trait GenericMethod {
    /// Declared return type
    fn generic_return_type(&self) -> &Type;
    /// Declared parameter types, in order
    fn generic_parameter_types(&self) -> &[Type];
    /// Class declaring the method
    fn declaring_class(&self) -> ClassId;
}

/// Resolves declared types against an observing instantiation
pub struct TypeResolver<'h, H: TypeHierarchy + ?Sized> {
    hierarchy: &'h H,
}

impl<'h, H: TypeHierarchy + ?Sized> TypeResolver<'h, H> {
    /// Create a resolver over a class hierarchy
    pub fn new(hierarchy: &'h H) -> Self {
        Self { hierarchy }
    }

    /// Resolve the declared type of `field` as observed through `source`
    pub fn resolve_field_type<F>(&self, field: &F, source: &Type) -> Result<Type, TypeError>
    where
        F: GenericField + ?Sized,
    {
        self.resolve_type(field.generic_type(), source, field.declaring_class())
    }

    /// Resolve the declared return type of `method` as observed through `source`
    pub fn resolve_return_type<M>(&self, method: &M, source: &Type) -> Result<Type, TypeError>
    where
        M: GenericMethod + ?Sized,
    {
        self.resolve_type(method.generic_return_type(), source, method.declaring_class())
    }

    /// Resolve every declared parameter type of `method` as observed through `source`
    pub fn resolve_param_types<M>(&self, method: &M, source: &Type) -> Result<Vec<Type>, TypeError>
    where
        M: GenericMethod + ?Sized,
    {
        let declaring = method.declaring_class();
        method
            .generic_parameter_types()
            .iter()
            .map(|param| self.resolve_type(param, source, declaring))
            .collect()
    }

    /// Resolve `ty`, written inside `declaring`, as observed through `source`
    pub fn resolve_type(&self, ty: &Type, source: &Type, declaring: ClassId) -> Result<Type, TypeError> {
        match ty {
            Type::Class(_) => Ok(ty.clone()),
            Type::Variable(var) => self.resolve_type_var(var, source, declaring),
            Type::Parameterized(p) => self
                .resolve_parameterized(p, source, declaring)
                .map(Type::Parameterized),
            Type::GenericArray(component) => self.resolve_generic_array(component, source, declaring),
            Type::Wildcard(w) => self.resolve_wildcard(w, source, declaring).map(Type::Wildcard),
        }
    }

    fn resolve_parameterized(
        &self,
        p: &ParameterizedType,
        source: &Type,
        declaring: ClassId,
    ) -> Result<ParameterizedType, TypeError> {
        let args = p
            .args
            .iter()
            .map(|arg| self.resolve_type(arg, source, declaring))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ParameterizedType::new(p.raw, args))
    }

    fn resolve_generic_array(
        &self,
        component: &Type,
        source: &Type,
        declaring: ClassId,
    ) -> Result<Type, TypeError> {
        match self.resolve_type(component, source, declaring)? {
            Type::Class(class) => Ok(Type::Class(ClassRef::array_of(class))),
            generic => Ok(Type::generic_array(generic)),
        }
    }

    fn resolve_wildcard(
        &self,
        w: &WildcardType,
        source: &Type,
        declaring: ClassId,
    ) -> Result<WildcardType, TypeError> {
        let resolve_all = |bounds: &[Type]| {
            bounds
                .iter()
                .map(|b| self.resolve_type(b, source, declaring))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(WildcardType {
            upper: resolve_all(&w.upper)?,
            lower: resolve_all(&w.lower)?,
        })
    }

    fn resolve_type_var(
        &self,
        var: &TypeVariable,
        source: &Type,
        declaring: ClassId,
    ) -> Result<Type, TypeError> {
        let class = source.raw_class().ok_or_else(|| TypeError::InvalidSourceType {
            found: self.hierarchy.type_name(source),
        })?;

        if class == declaring {
            // No instantiation information left; fall back to the bound.
            trace!(var = %var.name, class = class.index(), "type variable unbound at declaring class");
            return Ok(var.bounds.first().cloned().unwrap_or_else(Type::object));
        }

        if let Some(superclass) = self.hierarchy.generic_superclass(class) {
            if let Some(found) = self.scan_super_type(var, source, declaring, class, superclass)? {
                return Ok(found);
            }
        }

        for interface in self.hierarchy.generic_interfaces(class) {
            if let Some(found) = self.scan_super_type(var, source, declaring, class, interface)? {
                return Ok(found);
            }
        }

        trace!(var = %var.name, class = class.index(), "type variable not bound by any supertype");
        Ok(Type::object())
    }

    fn scan_super_type(
        &self,
        var: &TypeVariable,
        source: &Type,
        declaring: ClassId,
        class: ClassId,
        super_type: &Type,
    ) -> Result<Option<Type>, TypeError> {
        match super_type {
            Type::Parameterized(parent) => {
                let parent_class = parent.raw;
                let parent = match source {
                    Type::Parameterized(src) => self.translate_parent_type_vars(src, class, parent),
                    _ => parent.clone(),
                };

                if parent_class == declaring {
                    let params = self.hierarchy.type_parameters(parent_class);
                    if let Some(index) = params.iter().position(|p| p == var) {
                        if let Some(arg) = parent.args.get(index) {
                            trace!(var = %var.name, index, "type variable bound positionally");
                            return Ok(Some(arg.clone()));
                        }
                    }
                }

                if self.hierarchy.is_subclass_of(parent_class, declaring) {
                    return self
                        .resolve_type_var(var, &Type::Parameterized(parent), declaring)
                        .map(Some);
                }
                Ok(None)
            }
            Type::Class(ClassRef::Declared(parent_class))
                if self.hierarchy.is_subclass_of(*parent_class, declaring) =>
            {
                self.resolve_type_var(var, super_type, declaring).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Substitute `class`'s own type variables inside `parent` with the actual
    /// arguments carried by `source`.
    fn translate_parent_type_vars(
        &self,
        source: &ParameterizedType,
        class: ClassId,
        parent: &ParameterizedType,
    ) -> ParameterizedType {
        let own_params = self.hierarchy.type_parameters(class);
        let args = parent
            .args
            .iter()
            .map(|arg| match arg {
                Type::Variable(v) => own_params
                    .iter()
                    .position(|p| p == v)
                    .and_then(|j| source.args.get(j))
                    .cloned()
                    .unwrap_or_else(|| arg.clone()),
                _ => arg.clone(),
            })
            .collect();
        ParameterizedType::new(parent.raw, args)
    }
}

/// Collapse a resolved type to its runtime class
///
/// Unresolved variables and wildcards collapse to `Object`, unlike
/// [`Type::erasure`] which consults their bounds.
pub fn type_to_class(ty: &Type) -> ClassRef {
    match ty {
        Type::Class(class) => class.clone(),
        Type::Parameterized(p) => ClassRef::Declared(p.raw),
        Type::GenericArray(component) => ClassRef::array_of(type_to_class(component)),
        Type::Wildcard(_) | Type::Variable(_) => ClassRef::OBJECT,
    }
}
