//! Core type definitions for the refract type model
//!
//! Two layers live here. [`ClassRef`] is an *erased* runtime class: what a
//! value actually is once generics are gone. [`Type`] is a *declared* type as
//! written on a field, a method return or a method parameter, and may still
//! mention type variables, wildcards and generic arrays.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Unique identifier for a class registered with a type hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub(crate) u32);

impl ClassId {
    /// The universal root class. Every hierarchy registers it first.
    pub const OBJECT: ClassId = ClassId(0);

    /// Create a class id from a registration index
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Registration index of this class
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

/// Primitive (non-class) value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `boolean`
    Boolean,
    /// `byte`
    Byte,
    /// `short`
    Short,
    /// `char`
    Char,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `void` (method returns only)
    Void,
}

impl Primitive {
    /// Source-level keyword for this primitive
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Char => "char",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Void => "void",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An erased runtime class: a primitive, a registered class, or an array of either
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassRef {
    /// Primitive type
    Primitive(Primitive),
    /// Registered class or interface
    Declared(ClassId),
    /// Array class with the given component
    Array(Box<ClassRef>),
}

impl ClassRef {
    /// The universal top type
    pub const OBJECT: ClassRef = ClassRef::Declared(ClassId::OBJECT);

    /// Array class whose component is `component`
    pub fn array_of(component: ClassRef) -> Self {
        ClassRef::Array(Box::new(component))
    }

    /// Whether this is the primitive `boolean`
    pub fn is_boolean(&self) -> bool {
        matches!(self, ClassRef::Primitive(Primitive::Boolean))
    }

    /// Whether this is a primitive
    pub fn is_primitive(&self) -> bool {
        matches!(self, ClassRef::Primitive(_))
    }

    /// Component class if this is an array
    pub fn component(&self) -> Option<&ClassRef> {
        match self {
            ClassRef::Array(component) => Some(component),
            _ => None,
        }
    }

    /// Class id if this is a registered class
    pub fn declared(&self) -> Option<ClassId> {
        match self {
            ClassRef::Declared(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<ClassId> for ClassRef {
    fn from(id: ClassId) -> Self {
        ClassRef::Declared(id)
    }
}

impl From<Primitive> for ClassRef {
    fn from(p: Primitive) -> Self {
        ClassRef::Primitive(p)
    }
}

/// Where a type variable was declared
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VarOwner {
    /// Declared on a generic class or interface
    Class(ClassId),
    /// Declared on a generic method
    Method {
        /// Class declaring the method
        class: ClassId,
        /// Method name
        method: String,
    },
}

/// Type variable: `T`, `K extends Comparable<K>`
///
/// Two variables are the same variable when they share a name and an owner;
/// bounds do not take part in equality.
#[derive(Debug, Clone)]
pub struct TypeVariable {
    /// Variable name
    pub name: String,
    /// Declaring class or method
    pub owner: VarOwner,
    /// Declared upper bounds, first one is the erasure bound
    pub bounds: Vec<Type>,
}

impl TypeVariable {
    /// Unbounded class-level type variable
    pub fn new(name: impl Into<String>, class: ClassId) -> Self {
        Self {
            name: name.into(),
            owner: VarOwner::Class(class),
            bounds: Vec::new(),
        }
    }

    /// Unbounded method-level type variable
    pub fn on_method(name: impl Into<String>, class: ClassId, method: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: VarOwner::Method {
                class,
                method: method.into(),
            },
            bounds: Vec::new(),
        }
    }

    /// Add an upper bound
    pub fn bounded_by(mut self, bound: Type) -> Self {
        self.bounds.push(bound);
        self
    }

    /// Class that lexically owns this variable
    pub fn declaring_class(&self) -> ClassId {
        match &self.owner {
            VarOwner::Class(class) => *class,
            VarOwner::Method { class, .. } => *class,
        }
    }
}

impl PartialEq for TypeVariable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.owner == other.owner
    }
}

impl Eq for TypeVariable {}

impl Hash for TypeVariable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.owner.hash(state);
    }
}

/// Generic instantiation: `G<A1, ..., An>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterizedType {
    /// The generic class being instantiated
    pub raw: ClassId,
    /// Actual type arguments, positionally matching the class's type parameters
    pub args: Vec<Type>,
}

impl ParameterizedType {
    /// Create a parameterized type
    pub fn new(raw: ClassId, args: Vec<Type>) -> Self {
        Self { raw, args }
    }
}

/// Wildcard type argument: `?`, `? extends X`, `? super X`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WildcardType {
    /// Upper bounds (`? extends`); `[Object]` when unbounded
    pub upper: Vec<Type>,
    /// Lower bounds (`? super`)
    pub lower: Vec<Type>,
}

impl WildcardType {
    /// `?`
    pub fn unbounded() -> Self {
        Self {
            upper: vec![Type::object()],
            lower: Vec::new(),
        }
    }

    /// `? extends bound`
    pub fn extends(bound: Type) -> Self {
        Self {
            upper: vec![bound],
            lower: Vec::new(),
        }
    }

    /// `? super bound`
    pub fn super_of(bound: Type) -> Self {
        Self {
            upper: vec![Type::object()],
            lower: vec![bound],
        }
    }
}

/// A declared type, possibly generic
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Plain class, primitive or array class
    Class(ClassRef),
    /// Parameterized type: `List<String>`
    Parameterized(ParameterizedType),
    /// Array whose component is still generic: `T[]`, `List<T>[]`
    GenericArray(Box<Type>),
    /// Wildcard argument
    Wildcard(WildcardType),
    /// Type variable
    Variable(TypeVariable),
}

impl Type {
    /// The universal top type
    pub fn object() -> Self {
        Type::Class(ClassRef::OBJECT)
    }

    /// Plain registered class
    pub fn class(id: ClassId) -> Self {
        Type::Class(ClassRef::Declared(id))
    }

    /// Primitive type
    pub fn primitive(p: Primitive) -> Self {
        Type::Class(ClassRef::Primitive(p))
    }

    /// Array class of a plain component
    pub fn array_of(component: ClassRef) -> Self {
        Type::Class(ClassRef::array_of(component))
    }

    /// Parameterized type `raw<args>`
    pub fn parameterized(raw: ClassId, args: Vec<Type>) -> Self {
        Type::Parameterized(ParameterizedType::new(raw, args))
    }

    /// Generic array `component[]`
    pub fn generic_array(component: Type) -> Self {
        Type::GenericArray(Box::new(component))
    }

    /// Type variable reference
    pub fn var(var: TypeVariable) -> Self {
        Type::Variable(var)
    }

    /// The generic class behind this type, for plain declared classes and
    /// parameterized types
    pub fn raw_class(&self) -> Option<ClassId> {
        match self {
            Type::Class(ClassRef::Declared(id)) => Some(*id),
            Type::Parameterized(p) => Some(p.raw),
            _ => None,
        }
    }

    /// Erasure as a runtime class would report it
    ///
    /// Type variables erase to their first bound, wildcards to their first
    /// upper bound, both defaulting to `Object`.
    pub fn erasure(&self) -> ClassRef {
        match self {
            Type::Class(class) => class.clone(),
            Type::Parameterized(p) => ClassRef::Declared(p.raw),
            Type::GenericArray(component) => ClassRef::array_of(component.erasure()),
            Type::Wildcard(w) => w.upper.first().map(Type::erasure).unwrap_or(ClassRef::OBJECT),
            Type::Variable(v) => v.bounds.first().map(Type::erasure).unwrap_or(ClassRef::OBJECT),
        }
    }
}

impl From<ClassRef> for Type {
    fn from(class: ClassRef) -> Self {
        Type::Class(class)
    }
}

impl From<ClassId> for Type {
    fn from(id: ClassId) -> Self {
        Type::class(id)
    }
}

impl From<Primitive> for Type {
    fn from(p: Primitive) -> Self {
        Type::primitive(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_equality_ignores_bounds() {
        let a = TypeVariable::new("T", ClassId::new(3));
        let b = TypeVariable::new("T", ClassId::new(3)).bounded_by(Type::class(ClassId::new(1)));
        let c = TypeVariable::new("T", ClassId::new(4));
        let m = TypeVariable::on_method("T", ClassId::new(3), "map");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, m);
    }

    #[test]
    fn test_erasure() {
        let number = ClassId::new(2);
        let list = ClassId::new(7);

        let bounded = TypeVariable::new("N", list).bounded_by(Type::class(number));
        assert_eq!(Type::var(bounded.clone()).erasure(), ClassRef::Declared(number));
        assert_eq!(Type::var(TypeVariable::new("T", list)).erasure(), ClassRef::OBJECT);

        let generic = Type::parameterized(list, vec![Type::var(bounded.clone())]);
        assert_eq!(generic.erasure(), ClassRef::Declared(list));

        let array = Type::generic_array(Type::var(bounded));
        assert_eq!(array.erasure(), ClassRef::array_of(ClassRef::Declared(number)));

        assert_eq!(Type::Wildcard(WildcardType::unbounded()).erasure(), ClassRef::OBJECT);
    }

    #[test]
    fn test_raw_class() {
        let list = ClassId::new(7);
        assert_eq!(Type::class(list).raw_class(), Some(list));
        assert_eq!(Type::parameterized(list, vec![]).raw_class(), Some(list));
        assert_eq!(Type::primitive(Primitive::Int).raw_class(), None);
        assert_eq!(Type::generic_array(Type::class(list)).raw_class(), None);
    }
}
