//! Reflection permissions
//!
//! Decides whether an accessor may force its way past a member's visibility.
//! Public members are always usable; a private or protected member is only
//! used after the accessor applies the accessibility override, and that is
//! allowed only when the declaring class's resolved permissions contain the
//! matching `*_PRIVATE` flag.
//!
//! Resolution order: class-level entry, then the global default (`ALL`).
//!
//! ```toml
//! [reflect.permissions]
//! global = "ALL"
//!
//! [reflect.permissions.classes]
//! "Secret" = "PUBLIC_ONLY"
//! "Partner" = "READ_ALL|INVOKE_PUBLIC"
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use refract_types::ClassId;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::ReflectError;

/// Reflection permission flags (bitflags)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReflectionPermission(u8);

impl ReflectionPermission {
    /// No reflection allowed
    pub const NONE: Self = Self(0x00);
    /// Read public fields
    pub const READ_PUBLIC: Self = Self(0x01);
    /// Read private fields
    pub const READ_PRIVATE: Self = Self(0x02);
    /// Write public fields
    pub const WRITE_PUBLIC: Self = Self(0x04);
    /// Write private fields
    pub const WRITE_PRIVATE: Self = Self(0x08);
    /// Invoke public methods
    pub const INVOKE_PUBLIC: Self = Self(0x10);
    /// Invoke private methods and constructors
    pub const INVOKE_PRIVATE: Self = Self(0x20);

    /// READ_PUBLIC | READ_PRIVATE
    pub const READ_ALL: Self = Self(0x03);
    /// WRITE_PUBLIC | WRITE_PRIVATE
    pub const WRITE_ALL: Self = Self(0x0C);
    /// INVOKE_PUBLIC | INVOKE_PRIVATE
    pub const INVOKE_ALL: Self = Self(0x30);
    /// READ_PUBLIC | WRITE_PUBLIC | INVOKE_PUBLIC
    pub const PUBLIC_ONLY: Self = Self(0x15);
    /// All read/write/invoke
    pub const FULL_ACCESS: Self = Self(0x3F);
    /// Everything
    pub const ALL: Self = Self(0xFF);

    const NAMED: [(&'static str, Self); 13] = [
        ("NONE", Self::NONE),
        ("READ_PUBLIC", Self::READ_PUBLIC),
        ("READ_PRIVATE", Self::READ_PRIVATE),
        ("WRITE_PUBLIC", Self::WRITE_PUBLIC),
        ("WRITE_PRIVATE", Self::WRITE_PRIVATE),
        ("INVOKE_PUBLIC", Self::INVOKE_PUBLIC),
        ("INVOKE_PRIVATE", Self::INVOKE_PRIVATE),
        ("READ_ALL", Self::READ_ALL),
        ("WRITE_ALL", Self::WRITE_ALL),
        ("INVOKE_ALL", Self::INVOKE_ALL),
        ("PUBLIC_ONLY", Self::PUBLIC_ONLY),
        ("FULL_ACCESS", Self::FULL_ACCESS),
        ("ALL", Self::ALL),
    ];

    /// Create from raw bits
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Check if permission contains a flag
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Union of permissions
    pub const fn union(&self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Difference (remove flags)
    pub const fn difference(&self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Parse combined flags from a pipe-separated string (`"READ_ALL|INVOKE_PUBLIC"`)
    pub fn from_combined_str(s: &str) -> Option<Self> {
        s.split('|')
            .map(|part| part.trim().parse::<Self>().ok())
            .try_fold(Self::NONE, |acc, perm| perm.map(|p| acc.union(p)))
    }
}

impl FromStr for ReflectionPermission {
    type Err = ReflectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        if let Some((_, perm)) = Self::NAMED.iter().find(|(name, _)| *name == upper) {
            return Ok(*perm);
        }
        let bits = match s.strip_prefix("0x") {
            Some(hex) => u8::from_str_radix(hex, 16).ok(),
            None => s.parse::<u8>().ok(),
        };
        bits.map(Self::from_bits)
            .ok_or_else(|| ReflectError::Config(format!("unknown reflection permission '{}'", s)))
    }
}

impl Default for ReflectionPermission {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Display for ReflectionPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Self::NAMED.iter().find(|(_, perm)| perm == self) {
            Some((name, _)) => f.write_str(name),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}

/// What an accessor is trying to do with a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// Read a field
    Read,
    /// Write a field
    Write,
    /// Invoke a method or constructor
    Invoke,
}

impl AccessKind {
    /// Flag needed to force access to a restricted member this way
    pub const fn private_flag(self) -> ReflectionPermission {
        match self {
            AccessKind::Read => ReflectionPermission::READ_PRIVATE,
            AccessKind::Write => ReflectionPermission::WRITE_PRIVATE,
            AccessKind::Invoke => ReflectionPermission::INVOKE_PRIVATE,
        }
    }
}

/// Permission store shared between a registry and the accessors built over it
pub type SharedPermissions = Arc<RwLock<PermissionStore>>;

/// Store for reflection permissions
#[derive(Debug, Default)]
pub struct PermissionStore {
    global_default: ReflectionPermission,
    class_permissions: FxHashMap<ClassId, ReflectionPermission>,
    sealed_classes: FxHashSet<ClassId>,
}

impl PermissionStore {
    /// Create a store granting `ALL` everywhere
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if any permissions are configured
    pub fn has_any_restrictions(&self) -> bool {
        self.global_default != ReflectionPermission::ALL || !self.class_permissions.is_empty()
    }

    /// Set global default permissions
    pub fn set_global(&mut self, permissions: ReflectionPermission) {
        self.global_default = permissions;
    }

    /// Get global default permissions
    pub fn get_global(&self) -> ReflectionPermission {
        self.global_default
    }

    /// Set class-level permissions
    pub fn set_class(
        &mut self,
        class: ClassId,
        permissions: ReflectionPermission,
    ) -> Result<(), ReflectError> {
        if self.sealed_classes.contains(&class) {
            return Err(ReflectError::PermissionsSealed(class.to_string()));
        }
        self.class_permissions.insert(class, permissions);
        Ok(())
    }

    /// Get class-level permissions (not resolved)
    pub fn get_class(&self, class: ClassId) -> Option<ReflectionPermission> {
        self.class_permissions.get(&class).copied()
    }

    /// Clear class-level permissions
    pub fn clear_class(&mut self, class: ClassId) -> Result<(), ReflectError> {
        if self.sealed_classes.contains(&class) {
            return Err(ReflectError::PermissionsSealed(class.to_string()));
        }
        self.class_permissions.remove(&class);
        Ok(())
    }

    /// Seal class permissions
    pub fn seal_class(&mut self, class: ClassId) {
        self.sealed_classes.insert(class);
    }

    /// Check if class permissions are sealed
    pub fn is_class_sealed(&self, class: ClassId) -> bool {
        self.sealed_classes.contains(&class)
    }

    /// Effective permissions for members declared by `class`
    pub fn resolve(&self, class: ClassId) -> ReflectionPermission {
        self.get_class(class).unwrap_or(self.global_default)
    }

    /// Whether the accessibility override may be applied to a restricted
    /// member of `class` for `access`
    pub fn can_control_member_accessible(&self, class: ClassId, access: AccessKind) -> bool {
        self.resolve(class).contains(access.private_flag())
    }
}
