//! Tagged property values attached to frames, atoms and residues

use crate::core::math::Vector3D;
use crate::errors::{Error, Result};

/// A property value: a tagged union over the four kinds of data formats
/// can attach to frames, atoms or residues.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    /// A boolean value
    Bool(bool),
    /// A 64-bit floating point value
    Double(f64),
    /// A string value
    String(String),
    /// A 3D vector value
    Vector3D(Vector3D),
}

impl Property {
    /// The name of the variant held by this property, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Property::Bool(_) => "bool",
            Property::Double(_) => "double",
            Property::String(_) => "string",
            Property::Vector3D(_) => "Vector3D",
        }
    }

    /// Get the boolean value, failing if this property holds another kind
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Property::Bool(value) => Ok(*value),
            other => Err(Error::Property(format!(
                "expected a bool property, got a {} instead",
                other.kind()
            ))),
        }
    }

    /// Get the double value, failing if this property holds another kind
    pub fn as_double(&self) -> Result<f64> {
        match self {
            Property::Double(value) => Ok(*value),
            other => Err(Error::Property(format!(
                "expected a double property, got a {} instead",
                other.kind()
            ))),
        }
    }

    /// Get the string value, failing if this property holds another kind
    pub fn as_string(&self) -> Result<&str> {
        match self {
            Property::String(value) => Ok(value),
            other => Err(Error::Property(format!(
                "expected a string property, got a {} instead",
                other.kind()
            ))),
        }
    }

    /// Get the vector value, failing if this property holds another kind
    pub fn as_vector3d(&self) -> Result<Vector3D> {
        match self {
            Property::Vector3D(value) => Ok(*value),
            other => Err(Error::Property(format!(
                "expected a Vector3D property, got a {} instead",
                other.kind()
            ))),
        }
    }
}

impl From<bool> for Property {
    fn from(value: bool) -> Property {
        Property::Bool(value)
    }
}

impl From<f64> for Property {
    fn from(value: f64) -> Property {
        Property::Double(value)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Property {
        Property::String(value.into())
    }
}

impl From<String> for Property {
    fn from(value: String) -> Property {
        Property::String(value)
    }
}

impl From<Vector3D> for Property {
    fn from(value: Vector3D) -> Property {
        Property::Vector3D(value)
    }
}

// Integer values widen to Double, whatever their width or sign
macro_rules! property_from_integer {
    ($($int:ty),*) => {
        $(impl From<$int> for Property {
            fn from(value: $int) -> Property {
                Property::Double(value as f64)
            }
        })*
    };
}

property_from_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

/// A map of named properties
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap {
    data: ahash::AHashMap<String, Property>,
}

impl PropertyMap {
    /// Create an empty property map
    pub fn new() -> PropertyMap {
        PropertyMap::default()
    }

    /// Set a property, inserting or replacing any existing value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Property>) {
        self.data.insert(name.into(), value.into());
    }

    /// Get a property by name
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.data.get(name)
    }

    /// Number of properties in the map
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over (name, property) pairs in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.data.iter().map(|(name, value)| (name.as_str(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let property = Property::from(42.0);
        assert_eq!(property.as_double().unwrap(), 42.0);
        assert!(property.as_bool().is_err());
        assert!(property.as_string().is_err());

        let property = Property::from("pressure");
        assert_eq!(property.as_string().unwrap(), "pressure");

        let property = Property::from(Vector3D::new(1.0, 2.0, 3.0));
        assert_eq!(property.as_vector3d().unwrap(), Vector3D::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_integers_widen_to_double() {
        assert_eq!(Property::from(12_i32), Property::Double(12.0));
        assert_eq!(Property::from(12_u64), Property::Double(12.0));
        assert_eq!(Property::from(-3_i8), Property::Double(-3.0));
        assert_eq!(Property::from(7_usize), Property::Double(7.0));
    }

    #[test]
    fn test_map_set_replaces() {
        let mut map = PropertyMap::new();
        map.set("time", 25.0);
        map.set("time", 50.0);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("time").unwrap().as_double().unwrap(), 50.0);
        assert!(map.get("missing").is_none());
    }

    #[test]
    fn test_wrong_kind_error_message() {
        let error = Property::from(true).as_double().unwrap_err();
        assert_eq!(
            error.to_string(),
            "property error: expected a double property, got a bool instead"
        );
    }
}
