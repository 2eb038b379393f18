//! Decoded PackStream values.

use std::collections::HashMap;

/// A value carried in parameters, metadata or records.
#[derive(Debug, Clone, PartialEq)]
pub enum PackStreamValue {
    /// Null
    Null,
    /// Boolean
    Boolean(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit float
    Float(f64),
    /// Byte array
    Bytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// List
    List(Vec<PackStreamValue>),
    /// Map with string keys
    Map(HashMap<String, PackStreamValue>),
    /// Tagged structure (node, relationship, temporal value, ...)
    Structure {
        /// Structure signature
        tag: u8,
        /// Structure fields
        fields: Vec<PackStreamValue>,
    },
}

impl PackStreamValue {
    /// List of strings, the shape of `fields` and `bookmarks`.
    pub fn string_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PackStreamValue::List(items.into_iter().map(|s| PackStreamValue::String(s.into())).collect())
    }

    /// Boolean content.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            PackStreamValue::Boolean(b) => Some(b),
            _ => None,
        }
    }

    /// Integer content.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            PackStreamValue::Integer(i) => Some(i),
            _ => None,
        }
    }

    /// String content.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PackStreamValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// List content.
    pub fn as_list(&self) -> Option<&[PackStreamValue]> {
        match self {
            PackStreamValue::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// String items of a list. Non-string items are skipped.
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        let items = self.as_list()?;
        Some(items.iter().filter_map(Self::as_str).map(String::from).collect())
    }

    /// Map content.
    pub fn as_map(&self) -> Option<&HashMap<String, PackStreamValue>> {
        match self {
            PackStreamValue::Map(map) => Some(map),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for PackStreamValue {
                fn from(v: $ty) -> Self {
                    PackStreamValue::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Boolean,
    i32 => Integer,
    i64 => Integer,
    f64 => Float,
    String => String,
    &str => String,
    Vec<u8> => Bytes,
    Vec<PackStreamValue> => List,
    HashMap<String, PackStreamValue> => Map,
}

impl<T: Into<PackStreamValue>> From<Option<T>> for PackStreamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(PackStreamValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_list() {
        let v = PackStreamValue::string_list(["name", "age"]);
        assert_eq!(
            v.as_string_list(),
            Some(vec!["name".to_string(), "age".to_string()])
        );
    }

    #[test]
    fn test_string_list_skips_non_strings() {
        let v = PackStreamValue::List(vec!["a".into(), 1i64.into()]);
        assert_eq!(v.as_string_list(), Some(vec!["a".to_string()]));
        assert_eq!(PackStreamValue::Null.as_string_list(), None);
    }

    #[test]
    fn test_accessors_reject_other_kinds() {
        let v = PackStreamValue::Integer(42);
        assert_eq!(v.as_int(), Some(42));
        assert_eq!(v.as_bool(), None);
        assert_eq!(v.as_str(), None);
        assert!(v.as_map().is_none());
        assert_eq!(PackStreamValue::Float(1.5).as_int(), None);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(PackStreamValue::from(7i32), PackStreamValue::Integer(7));
        assert_eq!(PackStreamValue::from(vec![1u8, 2]), PackStreamValue::Bytes(vec![1, 2]));
        assert_eq!(PackStreamValue::from(None::<i64>), PackStreamValue::Null);
        assert_eq!(
            PackStreamValue::from(Some("x")),
            PackStreamValue::String("x".to_string())
        );
    }
}
