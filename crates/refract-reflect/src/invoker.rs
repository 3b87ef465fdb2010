//! Property accessors
//!
//! An [`Invoker`] reads or writes one property through a method, directly
//! through a field, or, for an ambiguous property, refuses to do either.
//!
//! Restricted members get one retry: when the first attempt is denied and the
//! permission store lets the declaring class's members be forced accessible,
//! the override is applied and the call is repeated once.

use std::fmt;
use std::sync::Arc;

use refract_types::{ClassId, ClassRef, GenericField};
use tracing::{debug, trace};

use crate::class::{FieldDef, Member, MethodDef};
use crate::error::{InvokeError, ReflectError};
use crate::permissions::{AccessKind, SharedPermissions};
use crate::value::Value;

/// Whether an accessor reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Reads the property
    Get,
    /// Writes the property
    Set,
}

/// Accessor backed by a getter or setter method
#[derive(Clone)]
pub struct MethodInvoker {
    method: Arc<MethodDef>,
    value_type: ClassRef,
    permissions: SharedPermissions,
}

impl MethodInvoker {
    /// Wrap a zero-argument getter or one-argument setter
    pub fn new(method: Arc<MethodDef>, permissions: SharedPermissions) -> Self {
        let value_type = match method.param_classes().first() {
            Some(param) if method.param_count() == 1 => param.clone(),
            _ => method.return_class(),
        };
        Self {
            method,
            value_type,
            permissions,
        }
    }

    /// Underlying method
    pub fn method(&self) -> &Arc<MethodDef> {
        &self.method
    }

    /// `Set` for one-argument methods, `Get` otherwise
    pub fn direction(&self) -> Direction {
        if self.method.param_count() == 1 {
            Direction::Set
        } else {
            Direction::Get
        }
    }

    fn invoke(&self, target: &Value, args: &[Value]) -> Result<Value, ReflectError> {
        with_access_override(
            &self.permissions,
            &*self.method,
            AccessKind::Invoke,
            || self.method.invoke(target, args),
        )
    }
}

/// Accessor backed directly by a field
#[derive(Clone)]
pub struct FieldInvoker {
    field: Arc<FieldDef>,
    permissions: SharedPermissions,
}

impl FieldInvoker {
    /// Wrap a field
    pub fn new(field: Arc<FieldDef>, permissions: SharedPermissions) -> Self {
        Self { field, permissions }
    }

    /// Underlying field
    pub fn field(&self) -> &Arc<FieldDef> {
        &self.field
    }

    fn get(&self, target: &Value, args: &[Value]) -> Result<Value, ReflectError> {
        if !args.is_empty() {
            return Err(ReflectError::InvocationFailure {
                member: self.field.qualified_name(),
                reason: format!("expected no arguments, got {}", args.len()),
            });
        }
        with_access_override(&self.permissions, &*self.field, AccessKind::Read, || {
            self.field.get(target)
        })
    }

    fn set(&self, target: &Value, args: &[Value]) -> Result<Value, ReflectError> {
        let value = match args {
            [value] => value.clone(),
            _ => {
                return Err(ReflectError::InvocationFailure {
                    member: self.field.qualified_name(),
                    reason: format!("expected exactly one value, got {}", args.len()),
                })
            }
        };
        with_access_override(&self.permissions, &*self.field, AccessKind::Write, || {
            self.field.set(target, value.clone())
        })?;
        Ok(Value::Null)
    }
}

/// Placeholder for a property whose candidates could not be reduced to one
#[derive(Clone)]
pub struct AmbiguousInvoker {
    method: Arc<MethodDef>,
    value_type: ClassRef,
    message: String,
}

impl AmbiguousInvoker {
    /// Record `method` as the representative candidate with an explanation
    pub fn new(method: Arc<MethodDef>, message: String) -> Self {
        let value_type = match method.param_classes().first() {
            Some(param) if method.param_count() == 1 => param.clone(),
            _ => method.return_class(),
        };
        Self {
            method,
            value_type,
            message,
        }
    }

    /// Explanation reported on every use
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Property accessor
#[derive(Clone)]
pub enum Invoker {
    /// Getter or setter method
    Method(MethodInvoker),
    /// Direct field read
    GetField(FieldInvoker),
    /// Direct field write
    SetField(FieldInvoker),
    /// Ambiguous property; always fails on use
    Ambiguous(AmbiguousInvoker),
}

impl Invoker {
    /// Read or write the property on `target`
    ///
    /// Getters take no arguments; setters take the new value and return `Null`.
    pub fn invoke(&self, target: &Value, args: &[Value]) -> Result<Value, ReflectError> {
        match self {
            Invoker::Method(m) => m.invoke(target, args),
            Invoker::GetField(f) => f.get(target, args),
            Invoker::SetField(f) => f.set(target, args),
            Invoker::Ambiguous(a) => Err(ReflectError::AmbiguousMember(a.message.clone())),
        }
    }

    /// Erased type of the value this accessor reads or writes
    pub fn value_type(&self) -> ClassRef {
        match self {
            Invoker::Method(m) => m.value_type.clone(),
            Invoker::GetField(f) | Invoker::SetField(f) => f.field.generic_type().erasure(),
            Invoker::Ambiguous(a) => a.value_type.clone(),
        }
    }

    /// Whether the accessor reads or writes
    pub fn direction(&self) -> Direction {
        match self {
            Invoker::Method(m) => m.direction(),
            Invoker::GetField(_) => Direction::Get,
            Invoker::SetField(_) => Direction::Set,
            Invoker::Ambiguous(a) => {
                if a.method.param_count() == 1 {
                    Direction::Set
                } else {
                    Direction::Get
                }
            }
        }
    }

    /// Whether this is the ambiguous placeholder
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Invoker::Ambiguous(_))
    }

    /// Class declaring the wrapped member
    pub fn declaring_class(&self) -> ClassId {
        match self {
            Invoker::Method(m) => m.method.declaring_class(),
            Invoker::GetField(f) | Invoker::SetField(f) => f.field.declaring_class(),
            Invoker::Ambiguous(a) => a.method.declaring_class(),
        }
    }
}

impl PartialEq for Invoker {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Invoker::Method(a), Invoker::Method(b)) => Arc::ptr_eq(&a.method, &b.method),
            (Invoker::GetField(a), Invoker::GetField(b))
            | (Invoker::SetField(a), Invoker::SetField(b)) => Arc::ptr_eq(&a.field, &b.field),
            (Invoker::Ambiguous(a), Invoker::Ambiguous(b)) => {
                Arc::ptr_eq(&a.method, &b.method) && a.message == b.message
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invoker::Method(m) => write!(f, "Method({})", m.method.qualified_name()),
            Invoker::GetField(i) => write!(f, "GetField({})", i.field.qualified_name()),
            Invoker::SetField(i) => write!(f, "SetField({})", i.field.qualified_name()),
            Invoker::Ambiguous(a) => write!(f, "Ambiguous({:?})", a.message),
        }
    }
}

/// Run `call`; if it is denied for lack of access, force the member
/// accessible when permitted and run it exactly once more
fn with_access_override<T>(
    permissions: &SharedPermissions,
    member: &dyn Member,
    access: AccessKind,
    call: impl Fn() -> Result<T, InvokeError>,
) -> Result<T, ReflectError> {
    match call() {
        Err(InvokeError::IllegalAccess) => {
            let allowed = permissions
                .read()
                .can_control_member_accessible(member.declaring_class(), access);
            if !allowed {
                debug!(member = %member.qualified_name(), ?access, "access override not permitted");
                return Err(ReflectError::AccessDenied {
                    member: member.qualified_name(),
                });
            }
            trace!(member = %member.qualified_name(), ?access, "forcing member accessible");
            member.set_accessible(true);
            call().map_err(|e| e.into_reflect(&member.qualified_name()))
        }
        other => other.map_err(|e| e.into_reflect(&member.qualified_name())),
    }
}
