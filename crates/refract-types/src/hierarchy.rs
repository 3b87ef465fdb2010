//! Class hierarchy access and subtyping over erased classes
//!
//! [`TypeHierarchy`] is the only thing the resolver needs from a host runtime:
//! each class's declared type parameters, its generic superclass and its
//! generic interfaces. Subtyping and display helpers are provided on top.

use rustc_hash::FxHashSet;

use crate::ty::{ClassId, ClassRef, Type, TypeVariable};

/// Read access to a class hierarchy
///
/// Implementations return empty answers for unknown ids rather than failing;
/// every query here is total.
pub trait TypeHierarchy {
    /// Name of a class
    fn class_name(&self, class: ClassId) -> Option<&str>;

    /// Type parameters declared on a class, in declaration order
    fn type_parameters(&self, class: ClassId) -> &[TypeVariable];

    /// Superclass as written in the declaration (`extends Box<String>`)
    fn generic_superclass(&self, class: ClassId) -> Option<&Type>;

    /// Directly implemented (or, for interfaces, extended) interfaces as written
    fn generic_interfaces(&self, class: ClassId) -> &[Type];

    /// Erased direct superclass
    fn superclass(&self, class: ClassId) -> Option<ClassId> {
        self.generic_superclass(class).and_then(Type::raw_class)
    }

    /// Erased direct interfaces
    fn interfaces(&self, class: ClassId) -> Vec<ClassId> {
        self.generic_interfaces(class)
            .iter()
            .filter_map(Type::raw_class)
            .collect()
    }

    /// Whether `sub` is `sup` or inherits from it through any path
    fn is_subclass_of(&self, sub: ClassId, sup: ClassId) -> bool {
        if sub == sup || sup == ClassId::OBJECT {
            return true;
        }

        let mut visited = FxHashSet::default();
        let mut pending = vec![sub];
        while let Some(current) = pending.pop() {
            if current == sup {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            pending.extend(self.superclass(current));
            pending.extend(self.interfaces(current));
        }
        false
    }

    /// Whether a value of class `sub` can be stored where `sup` is expected
    ///
    /// Primitives are only assignable to themselves. Arrays of references are
    /// covariant; every declared class and array is assignable to `Object`.
    fn is_assignable_from(&self, sup: &ClassRef, sub: &ClassRef) -> bool {
        match (sup, sub) {
            (a, b) if a == b => true,
            (ClassRef::Declared(ClassId::OBJECT), ClassRef::Declared(_) | ClassRef::Array(_)) => {
                true
            }
            (ClassRef::Declared(a), ClassRef::Declared(b)) => self.is_subclass_of(*b, *a),
            (ClassRef::Array(a), ClassRef::Array(b)) => {
                !a.is_primitive() && !b.is_primitive() && self.is_assignable_from(a, b)
            }
            _ => false,
        }
    }

    /// Human-readable name of an erased class
    fn class_ref_name(&self, class: &ClassRef) -> String {
        match class {
            ClassRef::Primitive(p) => p.name().to_string(),
            ClassRef::Declared(id) => self
                .class_name(*id)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", id.index())),
            ClassRef::Array(component) => format!("{}[]", self.class_ref_name(component)),
        }
    }

    /// Human-readable rendering of a declared type
    fn type_name(&self, ty: &Type) -> String {
        match ty {
            Type::Class(class) => self.class_ref_name(class),
            Type::Parameterized(p) => {
                let args: Vec<String> = p.args.iter().map(|a| self.type_name(a)).collect();
                format!(
                    "{}<{}>",
                    self.class_ref_name(&ClassRef::Declared(p.raw)),
                    args.join(", ")
                )
            }
            Type::GenericArray(component) => format!("{}[]", self.type_name(component)),
            Type::Wildcard(w) => {
                if let Some(lower) = w.lower.first() {
                    format!("? super {}", self.type_name(lower))
                } else if w.upper.is_empty() || w.upper == [Type::object()] {
                    "?".to_string()
                } else {
                    let upper: Vec<String> = w.upper.iter().map(|u| self.type_name(u)).collect();
                    format!("? extends {}", upper.join(" & "))
                }
            }
            Type::Variable(v) => v.name.clone(),
        }
    }
}
