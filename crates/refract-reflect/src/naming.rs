//! Accessor naming conventions
//!
//! `getName` / `isActive` / `setName` map to the properties `name`, `active`
//! and `name`. A name whose first two characters are uppercase keeps its
//! case (`getURL` -> `URL`).

use crate::error::ReflectError;

/// Convert an accessor method name to its property name
pub fn method_to_property(name: &str) -> Result<String, ReflectError> {
    let stripped = if let Some(rest) = name.strip_prefix("is") {
        rest
    } else if let Some(rest) = name.strip_prefix("get").or_else(|| name.strip_prefix("set")) {
        rest
    } else {
        return Err(ReflectError::InvalidAccessorName {
            name: name.to_string(),
        });
    };

    let mut chars = stripped.chars();
    let Some(first) = chars.next() else {
        return Ok(String::new());
    };
    let second_is_upper = chars.next().is_some_and(char::is_uppercase);
    if second_is_upper {
        return Ok(stripped.to_string());
    }

    let mut property: String = first.to_lowercase().collect();
    property.push_str(&stripped[first.len_utf8()..]);
    Ok(property)
}

/// Whether `name` is shaped like a property accessor
pub fn is_property(name: &str) -> bool {
    is_getter(name) || is_setter(name)
}

/// Whether `name` is shaped like a getter (`getX` or `isX`)
pub fn is_getter(name: &str) -> bool {
    (name.starts_with("get") && name.len() > 3) || (name.starts_with("is") && name.len() > 2)
}

/// Whether `name` is shaped like a setter (`setX`)
pub fn is_setter(name: &str) -> bool {
    name.starts_with("set") && name.len() > 3
}

/// Whether a derived property name may be exposed
///
/// Compiler artifacts (`$`-prefixed names), `serialVersionUID` and `class`
/// are never properties.
pub fn is_valid_property_name(name: &str) -> bool {
    !(name.starts_with('$') || name == "serialVersionUID" || name == "class")
}
