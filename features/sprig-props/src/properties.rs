use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use crate::{
    convert::PropertyType,
    errors::PropsError,
    options::{GetOptions, Shape},
};

/// A source of configurable properties.
///
/// Keys are case-sensitive. Values are kept as strings and converted by the reader,
/// see [`PropertyType`].
pub trait Properties: Send + Sync {
    /// Returns the raw values stored for `key`.
    ///
    /// A scalar read returns exactly one value. Falls back to the default of `options`
    /// when the key is not set, fails with [`PropsError::NotFound`] otherwise.
    fn get(&self, key: &str, options: &GetOptions) -> Result<Vec<String>, PropsError>;

    /// Sets the value for key, overwriting any existing value.
    ///
    /// Objects are expanded to `key.field` and arrays to `key[index]`.
    fn set(&self, key: &str, value: Value) -> Result<(), PropsError>;
}

/// Typed access on top of any [`Properties`]
pub trait PropertiesExt {
    fn get_as<T: PropertyType>(&self, key: &str, default: Option<&str>) -> Result<T, PropsError>;
}

impl<P: Properties + ?Sized> PropertiesExt for P {
    fn get_as<T: PropertyType>(&self, key: &str, default: Option<&str>) -> Result<T, PropsError> {
        let options = GetOptions {
            shape: T::SHAPE,
            default: default.map(str::to_string),
        };
        let values = self.get(key, &options)?;
        T::from_values(key, values)
    }
}

/// In-memory property source
#[derive(Default)]
pub struct MemoryProperties {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a property source pre-filled with string values
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }

    fn get_scalar(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn get_sequence(&self, key: &str) -> Result<Option<Vec<String>>, PropsError> {
        let values = self.values.read();
        if let Some(value) = values.get(key) {
            return Ok(Some(vec![value.clone()]));
        }

        let mut indexed = Vec::new();
        for (k, v) in values.iter() {
            let Some(rest) = k.strip_prefix(key) else {
                continue;
            };
            let Some(index) = rest.strip_prefix('[').and_then(|r| r.strip_suffix(']')) else {
                continue;
            };
            // nested entries such as `key[0][1]` or `key[0].name`
            if index.contains(['[', ']']) {
                continue;
            }
            let index: i64 = index.parse().map_err(|_| PropsError::InvalidIndex {
                key: key.to_string(),
                index: index.to_string(),
            })?;
            indexed.push((index, v.clone()));
        }

        if indexed.is_empty() {
            return Ok(None);
        }
        indexed.sort_by_key(|(index, _)| *index);
        Ok(Some(indexed.into_iter().map(|(_, v)| v).collect()))
    }

    /// Removes `key` and everything nested below it
    fn remove_tree(values: &mut HashMap<String, String>, key: &str) {
        values.retain(|k, _| match k.strip_prefix(key) {
            Some(rest) => !(rest.is_empty() || rest.starts_with('[') || rest.starts_with('.')),
            None => true,
        });
    }
}

fn flatten(key: String, value: Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (field, value) in map {
                flatten(format!("{key}.{field}"), value, out);
            }
        }
        Value::Array(items) => {
            for (index, value) in items.into_iter().enumerate() {
                flatten(format!("{key}[{index}]"), value, out);
            }
        }
        Value::String(s) => out.push((key, s)),
        Value::Null => out.push((key, String::new())),
        other => out.push((key, other.to_string())),
    }
}

impl Properties for MemoryProperties {
    fn get(&self, key: &str, options: &GetOptions) -> Result<Vec<String>, PropsError> {
        let found = match options.shape {
            Shape::Scalar => self.get_scalar(key).map(|v| vec![v]),
            Shape::Sequence => self.get_sequence(key)?,
        };
        if let Some(values) = found {
            return Ok(values);
        }

        match (&options.default, options.shape) {
            (Some(default), Shape::Scalar) => Ok(vec![default.clone()]),
            (Some(default), Shape::Sequence) if default.is_empty() => Ok(Vec::new()),
            (Some(default), Shape::Sequence) => {
                Ok(default.split(',').map(str::to_string).collect())
            }
            (None, _) => Err(PropsError::NotFound(key.to_string())),
        }
    }

    fn set(&self, key: &str, value: Value) -> Result<(), PropsError> {
        let mut entries = Vec::new();
        flatten(key.to_string(), value, &mut entries);

        let mut values = self.values.write();
        Self::remove_tree(&mut values, key);
        for (key, value) in entries {
            tracing::debug!(key = %key, value = %value, "set property");
            values.insert(key, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn scalar_falls_back_to_default() {
        let props = MemoryProperties::new();
        let opts = GetOptions::scalar().with_default("8080");
        assert_eq!(props.get("server.port", &opts).unwrap(), vec!["8080"]);

        props.set("server.port", json!(9090)).unwrap();
        assert_eq!(props.get("server.port", &opts).unwrap(), vec!["9090"]);
    }

    #[test]
    fn missing_key_without_default_is_not_found() {
        let props = MemoryProperties::new();
        let err = props.get("missing", &GetOptions::scalar()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn set_expands_objects_and_arrays() {
        let props = MemoryProperties::new();
        props
            .set("db", json!({"hosts": ["a", "b", "c"], "port": 5432, "tls": true}))
            .unwrap();

        assert_eq!(props.get_as::<u16>("db.port", None).unwrap(), 5432);
        assert!(props.get_as::<bool>("db.tls", None).unwrap());
        assert_eq!(
            props.get_as::<Vec<String>>("db.hosts", None).unwrap(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn sequence_orders_by_index_not_insertion() {
        let props = MemoryProperties::from_pairs([("l[10]", "c"), ("l[2]", "b"), ("l[0]", "a")]);
        assert_eq!(props.get_as::<Vec<String>>("l", None).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn sequence_default_is_split() {
        let props = MemoryProperties::new();
        assert_eq!(props.get_as::<Vec<u8>>("l", Some("1,2")).unwrap(), vec![1, 2]);
        assert!(props.get_as::<Vec<u8>>("l", Some("")).unwrap().is_empty());
    }

    #[test]
    fn sequence_rejects_non_numeric_index() {
        let props = MemoryProperties::from_pairs([("l[x]", "a")]);
        let err = props.get("l", &GetOptions::sequence()).unwrap_err();
        assert!(matches!(err, PropsError::InvalidIndex { .. }));
    }

    #[test]
    fn set_replaces_the_whole_tree() {
        let props = MemoryProperties::new();
        props.set("hosts", json!(["a", "b", "c"])).unwrap();
        props.set("hosts", json!(["x"])).unwrap();
        assert_eq!(props.get_as::<Vec<String>>("hosts", None).unwrap(), vec!["x"]);

        props.set("hosts", json!("single")).unwrap();
        props.set("hosts", json!(["a", "b"])).unwrap();
        assert_eq!(props.get_as::<Vec<String>>("hosts", None).unwrap(), vec!["a", "b"]);
        assert!(props.get("hosts", &GetOptions::scalar()).unwrap_err().is_not_found());
    }

    #[test]
    fn set_leaves_sibling_keys_alone() {
        let props = MemoryProperties::new();
        props.set("db", json!({"host": "a", "port": 1})).unwrap();
        props.set("dbx", json!("other")).unwrap();
        props.set("db", json!({"host": "b"})).unwrap();

        assert_eq!(props.get_as::<String>("db.host", None).unwrap(), "b");
        assert!(props.get_as::<u16>("db.port", None).unwrap_err().is_not_found());
        assert_eq!(props.get_as::<String>("dbx", None).unwrap(), "other");
    }

    #[test]
    fn sequence_skips_nested_entries() {
        let props = MemoryProperties::new();
        props.set("m", json!([[1, 2], 3])).unwrap();
        assert_eq!(props.get_as::<Vec<u8>>("m", None).unwrap(), vec![3]);
        assert_eq!(props.get_as::<Vec<u8>>("m[0]", None).unwrap(), vec![1, 2]);
    }

    #[test]
    fn sequence_accepts_single_stored_value() {
        let props = MemoryProperties::from_pairs([("l", "only")]);
        assert_eq!(props.get_as::<Vec<String>>("l", None).unwrap(), vec!["only"]);
    }
}
