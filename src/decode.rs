//! Resilient extraction of typed values from loosely-typed documents.
//!
//! Engine responses are large, versioned and partially optional. A missing,
//! null or mistyped field only ever falls back to that field's default; it
//! never aborts decoding of the surrounding entity. The same rules apply to
//! JSON bodies and to YAML compose files through the [`Node`] trait.

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// A node in a tree of maps, sequences, scalars and nulls.
pub trait Node: Sized {
    /// Child of a map node. `None` for missing keys and non-map nodes.
    fn field(&self, key: &str) -> Option<&Self>;
    fn is_null(&self) -> bool;
    fn is_map(&self) -> bool;
    fn as_str(&self) -> Option<&str>;
    fn as_i64(&self) -> Option<i64>;
    fn as_bool(&self) -> Option<bool>;
    fn items(&self) -> Option<&[Self]>;
    /// Entries of a map node, keys passed through verbatim.
    fn entries(&self) -> Option<Vec<(String, &Self)>>;
    /// Wire type name, used in diagnostics.
    fn kind(&self) -> &'static str;
}

impl Node for Value {
    fn field(&self, key: &str) -> Option<&Self> {
        match self {
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn is_map(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn items(&self) -> Option<&[Self]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    fn entries(&self) -> Option<Vec<(String, &Self)>> {
        match self {
            Value::Object(map) => Some(map.iter().map(|(k, v)| (k.clone(), v)).collect()),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl Node for serde_yaml::Value {
    fn field(&self, key: &str) -> Option<&Self> {
        match self {
            serde_yaml::Value::Mapping(map) => map.get(key),
            serde_yaml::Value::Tagged(tagged) => tagged.value.field(key),
            _ => None,
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, serde_yaml::Value::Null)
    }

    fn is_map(&self) -> bool {
        match self {
            serde_yaml::Value::Mapping(_) => true,
            serde_yaml::Value::Tagged(tagged) => tagged.value.is_map(),
            _ => false,
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            serde_yaml::Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            serde_yaml::Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            serde_yaml::Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn items(&self) -> Option<&[Self]> {
        match self {
            serde_yaml::Value::Sequence(items) => Some(items.as_slice()),
            serde_yaml::Value::Tagged(tagged) => tagged.value.items(),
            _ => None,
        }
    }

    fn entries(&self) -> Option<Vec<(String, &Self)>> {
        match self {
            serde_yaml::Value::Mapping(map) => Some(
                map.iter()
                    .filter_map(|(k, v)| yaml_key(k).map(|k| (k, v)))
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => tagged.value.entries(),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            serde_yaml::Value::Null => "null",
            serde_yaml::Value::Bool(_) => "boolean",
            serde_yaml::Value::Number(_) => "number",
            serde_yaml::Value::String(_) => "string",
            serde_yaml::Value::Sequence(_) => "sequence",
            serde_yaml::Value::Mapping(_) => "mapping",
            serde_yaml::Value::Tagged(_) => "tagged",
        }
    }
}

// YAML allows non-string keys; scalar ones are read the way they are written.
fn yaml_key(key: &serde_yaml::Value) -> Option<String> {
    match key {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Why a single element could not be decoded at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("expected an object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("field `{field}`: expected {expected}, found {found}")]
    WrongType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl DecodeError {
    fn wrong_type<N: Node>(field: &str, expected: &'static str, found: &N) -> Self {
        DecodeError::WrongType {
            field: field.to_string(),
            expected,
            found: found.kind(),
        }
    }
}

/// Field accessor over a single node.
///
/// Every lenient getter treats "absent", "null" and "wrong wire type" the same
/// way: it yields the documented default. There is no implicit coercion
/// between strings and numbers. When the wrapped node is not a map, every
/// lookup is absent, so a mapper built from these getters produces the zero
/// value of its entity.
pub struct Fields<'a, N = Value> {
    node: &'a N,
}

impl<N> Clone for Fields<'_, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N> Copy for Fields<'_, N> {}

impl<'a, N: Node> Fields<'a, N> {
    pub fn new(node: &'a N) -> Self {
        Self { node }
    }

    /// Like [`Fields::new`], but rejects nodes that are not maps.
    pub fn object(node: &'a N) -> Result<Self, DecodeError> {
        if node.is_map() {
            Ok(Self { node })
        } else {
            Err(DecodeError::NotAnObject { found: node.kind() })
        }
    }

    pub fn node(&self) -> &'a N {
        self.node
    }

    /// Present and non-null value at `key`.
    pub fn value(&self, key: &str) -> Option<&'a N> {
        self.node.field(key).filter(|value| !value.is_null())
    }

    pub fn string(&self, key: &str) -> String {
        self.opt_string(key).unwrap_or_default()
    }

    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.opt_string(key).unwrap_or_else(|| default.to_string())
    }

    pub fn opt_string(&self, key: &str) -> Option<String> {
        self.value(key)?.as_str().map(str::to_owned)
    }

    /// Integer at `key`. Values that do not fit `T` fall back like any other
    /// mistyped field.
    pub fn int<T>(&self, key: &str) -> T
    where
        T: TryFrom<i64> + Default,
    {
        self.opt_int(key).unwrap_or_default()
    }

    pub fn int_or<T>(&self, key: &str, default: T) -> T
    where
        T: TryFrom<i64>,
    {
        self.opt_int(key).unwrap_or(default)
    }

    pub fn opt_int<T>(&self, key: &str) -> Option<T>
    where
        T: TryFrom<i64>,
    {
        self.value(key)?
            .as_i64()
            .and_then(|n| T::try_from(n).ok())
    }

    pub fn bool(&self, key: &str) -> bool {
        self.bool_or(key, false)
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.opt_bool(key).unwrap_or(default)
    }

    pub fn opt_bool(&self, key: &str) -> Option<bool> {
        self.value(key)?.as_bool()
    }

    /// Sequence at `key`, decoding each element with `decode`. Elements for
    /// which `decode` yields `None` are skipped; the rest keep their order.
    pub fn array<T, F>(&self, key: &str, mut decode: F) -> Vec<T>
    where
        F: FnMut(&'a N) -> Option<T>,
    {
        self.value(key)
            .and_then(|value| value.items())
            .map(|items| items.iter().filter_map(&mut decode).collect())
            .unwrap_or_default()
    }

    pub fn strings(&self, key: &str) -> Vec<String> {
        self.array(key, |item| item.as_str().map(str::to_owned))
    }

    /// Map at `key`, decoding each value with `decode`. Keys are domain
    /// identifiers (network names, port specs) and are kept verbatim.
    pub fn object_map<M, T, F>(&self, key: &str, mut decode: F) -> M
    where
        M: FromIterator<(String, T)>,
        F: FnMut(&'a N) -> Option<T>,
    {
        match self.value(key).and_then(|value| value.entries()) {
            Some(entries) => entries
                .into_iter()
                .filter_map(|(name, value)| decode(value).map(|decoded| (name, decoded)))
                .collect(),
            None => std::iter::empty().collect(),
        }
    }

    pub fn string_map<M>(&self, key: &str) -> M
    where
        M: FromIterator<(String, String)>,
    {
        self.object_map(key, |value| value.as_str().map(str::to_owned))
    }

    /// Keys of the map at `key` (the engine encodes sets as `{"80/tcp": {}}`).
    pub fn keys(&self, key: &str) -> Vec<String> {
        self.value(key)
            .and_then(|value| value.entries())
            .map(|entries| entries.into_iter().map(|(name, _)| name).collect())
            .unwrap_or_default()
    }

    /// Nested structure at `key`, or its zero value when `key` is absent or
    /// not a map.
    pub fn nested<T, F>(&self, key: &str, decode: F) -> T
    where
        T: Default,
        F: FnOnce(Fields<'a, N>) -> T,
    {
        match self.value(key) {
            Some(value) if value.is_map() => decode(Fields::new(value)),
            _ => T::default(),
        }
    }

    /// Accepts either a single mapping or a sequence at `key`; a single
    /// mapping yields a one-element list.
    pub fn one_or_many<T, F>(&self, key: &str, mut decode: F) -> Vec<T>
    where
        F: FnMut(&'a N) -> Option<T>,
    {
        match self.value(key) {
            Some(value) if value.is_map() => decode(value).into_iter().collect(),
            Some(value) => value
                .items()
                .map(|items| items.iter().filter_map(&mut decode).collect())
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// String at `key`; a present value of another type is an error.
    pub fn strict_str(&self, key: &str) -> Result<Option<&'a str>, DecodeError> {
        match self.value(key) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| DecodeError::wrong_type(key, "string", value)),
        }
    }

    pub fn strict_int<T>(&self, key: &str) -> Result<Option<T>, DecodeError>
    where
        T: TryFrom<i64>,
    {
        match self.value(key) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .and_then(|n| T::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| DecodeError::wrong_type(key, "integer", value)),
        }
    }

    pub fn strict_object(&self, key: &str) -> Result<Option<Fields<'a, N>>, DecodeError> {
        match self.value(key) {
            None => Ok(None),
            Some(value) if value.is_map() => Ok(Some(Fields::new(value))),
            Some(value) => Err(DecodeError::wrong_type(key, "object", value)),
        }
    }

    /// Sequence of strings at `key`, where every element must be a string.
    pub fn strict_strings(&self, key: &str) -> Result<Vec<String>, DecodeError> {
        let Some(value) = self.value(key) else {
            return Ok(Vec::new());
        };
        let items = value
            .items()
            .ok_or_else(|| DecodeError::wrong_type(key, "array", value))?;
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| DecodeError::wrong_type(&format!("{key}[{index}]"), "string", item))
            })
            .collect()
    }
}

/// Adapts a map decoder into an element decoder that skips non-map elements.
pub fn each_object<'a, N, T, F>(decode: F) -> impl FnMut(&'a N) -> Option<T>
where
    N: Node + 'a,
    F: Fn(Fields<'a, N>) -> T,
{
    move |node| Fields::object(node).ok().map(&decode)
}

/// Result of decoding a list document element by element.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    pub items: Vec<T>,
    pub skipped: Vec<Skipped>,
}

/// An element left out of a [`Batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub index: usize,
    pub reason: DecodeError,
}

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> Batch<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> IntoIterator for Batch<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Decodes every element of a sequence in isolation.
///
/// An element that fails is recorded in [`Batch::skipped`] and decoding goes
/// on with the next one. A root that is not a sequence yields an empty batch.
pub fn decode_batch<N, T, F>(root: &N, mut decode: F) -> Batch<T>
where
    N: Node,
    F: FnMut(&N) -> Result<T, DecodeError>,
{
    let Some(items) = root.items() else {
        if !root.is_null() {
            warn!(found = root.kind(), "expected a list document, decoding it as empty");
        }
        return Batch::default();
    };

    let mut batch = Batch {
        items: Vec::with_capacity(items.len()),
        skipped: Vec::new(),
    };
    for (index, item) in items.iter().enumerate() {
        match decode(item) {
            Ok(decoded) => batch.items.push(decoded),
            Err(reason) => {
                warn!(index, %reason, "skipping list element that could not be decoded");
                batch.skipped.push(Skipped { index, reason });
            }
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};

    #[test]
    fn test_string_defaults() {
        let doc = json!({"Name": "web", "Null": null, "Number": 7});
        let fields = Fields::new(&doc);
        assert_eq!(fields.string("Name"), "web");
        assert_eq!(fields.string("Missing"), "");
        assert_eq!(fields.string_or("Null", "fallback"), "fallback");
        assert_eq!(fields.string_or("Number", "fallback"), "fallback");
    }

    #[test]
    fn test_no_implicit_string_number_coercion() {
        let doc = json!({"Count": "12", "Flag": "true", "Text": 12});
        let fields = Fields::new(&doc);
        assert_eq!(fields.int::<i64>("Count"), 0);
        assert!(!fields.bool("Flag"));
        assert_eq!(fields.opt_string("Text"), None);
    }

    #[test]
    fn test_int_out_of_range_falls_back() {
        let doc = json!({"Port": 70000, "Negative": -1});
        let fields = Fields::new(&doc);
        assert_eq!(fields.int::<u16>("Port"), 0);
        assert_eq!(fields.int_or::<u32>("Negative", 5), 5);
        assert_eq!(fields.int::<i64>("Port"), 70000);
    }

    #[test]
    fn test_optional_distinguishes_unset_from_zero() {
        let doc = json!({"Swappiness": 0, "Unset": null, "Disable": false});
        let fields = Fields::new(&doc);
        assert_eq!(fields.opt_int::<i64>("Swappiness"), Some(0));
        assert_eq!(fields.opt_int::<i64>("Unset"), None);
        assert_eq!(fields.opt_int::<i64>("Missing"), None);
        assert_eq!(fields.opt_bool("Disable"), Some(false));
    }

    #[test]
    fn test_array_skips_mistyped_elements() {
        let doc = json!({"Env": ["A=1", 2, null, "B=2"], "NotArray": "x"});
        let fields = Fields::new(&doc);
        assert_eq!(fields.strings("Env"), vec!["A=1", "B=2"]);
        assert!(fields.strings("NotArray").is_empty());
        assert!(fields.strings("Missing").is_empty());
    }

    #[test]
    fn test_object_map_keeps_keys_verbatim() {
        let doc = json!({"Labels": {"com.example/Key": "v", "Other": 1}});
        let fields = Fields::new(&doc);
        let labels: HashMap<String, String> = fields.string_map("Labels");
        assert_eq!(labels.len(), 1);
        assert_eq!(labels["com.example/Key"], "v");
    }

    #[test]
    fn test_nested_zero_value_when_not_a_map() {
        #[derive(Default, Debug, PartialEq)]
        struct Inner {
            name: String,
        }
        let doc = json!({"Good": {"Name": "x"}, "Bad": [1, 2]});
        let fields = Fields::new(&doc);
        let good: Inner = fields.nested("Good", |f| Inner { name: f.string("Name") });
        let bad: Inner = fields.nested("Bad", |f| Inner { name: f.string("Name") });
        assert_eq!(good.name, "x");
        assert_eq!(bad, Inner::default());
    }

    #[test]
    fn test_scalar_root_reads_as_empty() {
        let doc = json!(42);
        let fields = Fields::new(&doc);
        assert_eq!(fields.string("Id"), "");
        assert_eq!(fields.int::<i64>("Size"), 0);
        assert!(fields.strings("RepoTags").is_empty());
        assert!(Fields::object(&doc).is_err());
    }

    #[test]
    fn test_one_or_many() {
        let single = json!({"Config": {"Subnet": "10.0.0.0/24"}});
        let many = json!({"Config": [{"Subnet": "10.0.0.0/24"}, {"Subnet": "10.1.0.0/24"}]});
        let subnet = |node: &Value| Some(Fields::new(node).string("Subnet"));
        assert_eq!(Fields::new(&single).one_or_many("Config", subnet), vec!["10.0.0.0/24"]);
        assert_eq!(
            Fields::new(&many).one_or_many("Config", subnet),
            vec!["10.0.0.0/24", "10.1.0.0/24"]
        );
    }

    #[test]
    fn test_strict_getters() {
        let doc = json!({"Id": "abc", "Created": "yesterday", "Names": ["/a", 3]});
        let fields = Fields::new(&doc);
        assert_eq!(fields.strict_str("Id"), Ok(Some("abc")));
        assert_eq!(fields.strict_str("Missing"), Ok(None));
        assert_eq!(
            fields.strict_int::<i64>("Created"),
            Err(DecodeError::WrongType {
                field: "Created".to_string(),
                expected: "integer",
                found: "string",
            })
        );
        assert!(matches!(
            fields.strict_strings("Names"),
            Err(DecodeError::WrongType { field, .. }) if field == "Names[1]"
        ));
    }

    #[test]
    fn test_yaml_nodes_share_the_decoder() {
        let doc: serde_yaml::Value =
            serde_yaml::from_str("driver: overlay\nattachable: true\nlabels:\n  tier: db\n  1: one\n")
                .unwrap();
        let fields = Fields::new(&doc);
        assert_eq!(fields.string("driver"), "overlay");
        assert!(fields.bool("attachable"));
        let labels: BTreeMap<String, String> = fields.string_map("labels");
        assert_eq!(labels["tier"], "db");
        assert_eq!(labels["1"], "one");
    }

    #[test]
    fn test_decode_batch_isolates_failures() {
        let doc = json!([{"Id": "a"}, {"Id": 5}, "scalar", {"Id": "c"}]);
        let batch = decode_batch(&doc, |item| {
            let fields = Fields::object(item)?;
            Ok(fields.strict_str("Id")?.unwrap_or_default().to_string())
        });
        assert_eq!(batch.items, vec!["a", "c"]);
        assert_eq!(
            batch.skipped.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_decode_batch_non_array_root() {
        let batch = decode_batch(&json!({"message": "oops"}), |_| Ok(()));
        assert!(batch.is_empty());
        assert!(batch.skipped.is_empty());
    }
}
