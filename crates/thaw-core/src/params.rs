//! Hierarchical configuration records.
//!
//! A [`ParameterList`] is an ordered tree of named, typed values, the
//! configuration record every evaluator and preconditioner is built from.
//! Lists (de)serialise with serde, so a full configuration can be read from
//! JSON. Construction code reads a list through a [`ParamReader`], which
//! remembers every key it consumed and rejects the leftovers, so a typo in
//! an input deck fails at construction instead of being silently ignored.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::field::IoFlags;
use crate::id::FieldKey;

/// A single configuration value.
///
/// Deserialisation is untagged: JSON integers become [`ParamValue::Int`],
/// other numbers [`ParamValue::Double`], objects [`ParamValue::List`].
/// Numeric accessors widen integers to doubles where a double is expected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Double-precision number.
    Double(f64),
    /// String.
    String(String),
    /// Array of strings (e.g. dependency key names).
    StringArray(Vec<String>),
    /// Array of integers (e.g. debug cell ids).
    IntArray(Vec<i64>),
    /// Array of doubles (e.g. exponents).
    DoubleArray(Vec<f64>),
    /// Nested sublist.
    List(ParameterList),
}

impl ParamValue {
    /// Name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::StringArray(_) => "string array",
            Self::IntArray(_) => "int array",
            Self::DoubleArray(_) => "double array",
            Self::List(_) => "sublist",
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        Self::StringArray(v)
    }
}

impl From<&[&str]> for ParamValue {
    fn from(v: &[&str]) -> Self {
        Self::StringArray(v.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<i64>> for ParamValue {
    fn from(v: Vec<i64>) -> Self {
        Self::IntArray(v)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        Self::DoubleArray(v)
    }
}

impl From<ParameterList> for ParamValue {
    fn from(v: ParameterList) -> Self {
        Self::List(v)
    }
}

/// Ordered map from parameter name to [`ParamValue`].
///
/// # Examples
///
/// ```
/// use thaw_core::ParameterList;
///
/// let mut plist = ParameterList::new();
/// plist
///     .set("evaluator type", "active layer average temperature")
///     .set("transition width [K]", 0.5);
/// assert_eq!(plist.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterList {
    entries: IndexMap<String, ParamValue>,
}

impl ParameterList {
    /// Empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Raw value lookup.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Nested sublist, if `key` names one.
    pub fn sublist(&self, key: &str) -> Option<&ParameterList> {
        match self.entries.get(key) {
            Some(ParamValue::List(list)) => Some(list),
            _ => None,
        }
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Consuming reader over a [`ParameterList`].
///
/// Each accessor records the key as consumed. [`finish`](Self::finish)
/// then fails with [`ConfigError::UnknownParameter`] for any key nobody
/// read. The `context` string (usually the evaluator type or output key)
/// prefixes every error.
pub struct ParamReader<'a> {
    list: &'a ParameterList,
    context: String,
    consumed: IndexSet<String>,
}

impl<'a> ParamReader<'a> {
    /// Start reading `list` on behalf of `context`.
    pub fn new(list: &'a ParameterList, context: impl Into<String>) -> Self {
        Self {
            list,
            context: context.into(),
            consumed: IndexSet::new(),
        }
    }

    /// Context string used in error messages.
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Mark a key as consumed without reading it.
    pub fn ignore(&mut self, key: &str) {
        self.consumed.insert(key.to_string());
    }

    fn take(&mut self, key: &str) -> Option<&'a ParamValue> {
        self.consumed.insert(key.to_string());
        self.list.get(key)
    }

    fn missing(&self, key: &str) -> ConfigError {
        ConfigError::MissingParameter {
            context: self.context.clone(),
            key: key.to_string(),
        }
    }

    fn wrong_type(&self, key: &str, expected: &'static str, found: &ParamValue) -> ConfigError {
        ConfigError::WrongType {
            context: self.context.clone(),
            key: key.to_string(),
            expected,
            found: found.type_name(),
        }
    }

    /// Invalid-value error attributed to this reader's context.
    pub fn invalid(&self, key: &str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            context: self.context.clone(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Optional string parameter.
    pub fn opt_string(&mut self, key: &str) -> Result<Option<String>, ConfigError> {
        match self.take(key) {
            None => Ok(None),
            Some(ParamValue::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.wrong_type(key, "string", other)),
        }
    }

    /// Required string parameter.
    pub fn string(&mut self, key: &str) -> Result<String, ConfigError> {
        self.opt_string(key)?.ok_or_else(|| self.missing(key))
    }

    /// String parameter with a default.
    pub fn string_or(&mut self, key: &str, default: &str) -> Result<String, ConfigError> {
        Ok(self.opt_string(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// Field key parameter with a default name.
    pub fn key_or(&mut self, key: &str, default: &str) -> Result<FieldKey, ConfigError> {
        let name = self.string_or(key, default)?;
        if name.is_empty() {
            return Err(self.invalid(key, "key must not be empty"));
        }
        Ok(FieldKey::new(name))
    }

    /// Optional double parameter. Integers are widened.
    pub fn opt_f64(&mut self, key: &str) -> Result<Option<f64>, ConfigError> {
        match self.take(key) {
            None => Ok(None),
            Some(ParamValue::Double(v)) => Ok(Some(*v)),
            Some(ParamValue::Int(v)) => Ok(Some(*v as f64)),
            Some(other) => Err(self.wrong_type(key, "double", other)),
        }
    }

    /// Required double parameter.
    pub fn f64(&mut self, key: &str) -> Result<f64, ConfigError> {
        self.opt_f64(key)?.ok_or_else(|| self.missing(key))
    }

    /// Double parameter with a default.
    pub fn f64_or(&mut self, key: &str, default: f64) -> Result<f64, ConfigError> {
        Ok(self.opt_f64(key)?.unwrap_or(default))
    }

    /// Boolean parameter with a default.
    pub fn bool_or(&mut self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.take(key) {
            None => Ok(default),
            Some(ParamValue::Bool(v)) => Ok(*v),
            Some(other) => Err(self.wrong_type(key, "bool", other)),
        }
    }

    /// Optional string array.
    pub fn opt_string_array(&mut self, key: &str) -> Result<Option<Vec<String>>, ConfigError> {
        match self.take(key) {
            None => Ok(None),
            Some(ParamValue::StringArray(v)) => Ok(Some(v.clone())),
            Some(other) => Err(self.wrong_type(key, "string array", other)),
        }
    }

    /// Optional double array. Integer arrays are widened; an empty array
    /// of any element type reads as empty.
    pub fn opt_f64_array(&mut self, key: &str) -> Result<Option<Vec<f64>>, ConfigError> {
        match self.take(key) {
            None => Ok(None),
            Some(ParamValue::DoubleArray(v)) => Ok(Some(v.clone())),
            Some(ParamValue::IntArray(v)) => Ok(Some(v.iter().map(|&x| x as f64).collect())),
            Some(ParamValue::StringArray(v)) if v.is_empty() => Ok(Some(Vec::new())),
            Some(other) => Err(self.wrong_type(key, "double array", other)),
        }
    }

    /// Non-negative integer array with a default of empty.
    pub fn usize_array_or_empty(&mut self, key: &str) -> Result<Vec<usize>, ConfigError> {
        match self.take(key) {
            None => Ok(Vec::new()),
            Some(ParamValue::IntArray(v)) => v
                .iter()
                .map(|&x| usize::try_from(x).map_err(|_| self.invalid(key, format!("{x} is negative"))))
                .collect(),
            Some(ParamValue::StringArray(v)) if v.is_empty() => Ok(Vec::new()),
            Some(other) => Err(self.wrong_type(key, "int array", other)),
        }
    }

    /// Required sublist.
    pub fn sublist(&mut self, key: &str) -> Result<&'a ParameterList, ConfigError> {
        match self.take(key) {
            None => Err(self.missing(key)),
            Some(ParamValue::List(list)) => Ok(list),
            Some(other) => Err(self.wrong_type(key, "sublist", other)),
        }
    }

    /// Visualisation and checkpoint flags for `key`.
    ///
    /// Reads `"visualize <key>"` (default `true`) and `"checkpoint <key>"`
    /// (default `false`).
    pub fn io_flags(&mut self, key: &FieldKey) -> Result<IoFlags, ConfigError> {
        let defaults = IoFlags::default();
        Ok(IoFlags {
            visualize: self.bool_or(&format!("visualize {}", key.name()), defaults.visualize)?,
            checkpoint: self.bool_or(&format!("checkpoint {}", key.name()), defaults.checkpoint)?,
        })
    }

    /// Finish reading: fail if any key was never consumed.
    pub fn finish(self) -> Result<(), ConfigError> {
        for key in self.list.keys() {
            if !self.consumed.contains(key) {
                return Err(ConfigError::UnknownParameter {
                    context: self.context,
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParameterList {
        ParameterList::new()
            .with("thermal conductivity key", "tc")
            .with("transition width [K]", 1_i64)
            .with("exponents", vec![2.0, 1.0])
            .with("debug cells", vec![0_i64, 3])
            .with(
                "thermal conductivity parameters",
                ParameterList::new().with("thermal conductivity type", "two-phase wet/dry"),
            )
    }

    #[test]
    fn reads_with_defaults_and_widening() {
        let plist = sample();
        let mut r = ParamReader::new(&plist, "test");
        assert_eq!(r.key_or("thermal conductivity key", "x").unwrap(), FieldKey::new("tc"));
        assert_eq!(r.key_or("porosity key", "porosity").unwrap(), FieldKey::new("porosity"));
        assert_eq!(r.f64_or("transition width [K]", 0.2).unwrap(), 1.0);
        assert_eq!(r.opt_f64_array("exponents").unwrap(), Some(vec![2.0, 1.0]));
        assert_eq!(r.usize_array_or_empty("debug cells").unwrap(), vec![0, 3]);
        let sub = r.sublist("thermal conductivity parameters").unwrap();
        assert!(sub.contains("thermal conductivity type"));
        r.finish().unwrap();
    }

    #[test]
    fn unknown_parameter_rejected_at_finish() {
        let plist = ParameterList::new().with("porosity kye", "phi");
        let mut r = ParamReader::new(&plist, "tc evaluator");
        r.key_or("porosity key", "porosity").unwrap();
        match r.finish() {
            Err(ConfigError::UnknownParameter { context, key }) => {
                assert_eq!(context, "tc evaluator");
                assert_eq!(key, "porosity kye");
            }
            other => panic!("expected UnknownParameter, got {other:?}"),
        }
    }

    #[test]
    fn missing_required_parameter() {
        let plist = ParameterList::new();
        let mut r = ParamReader::new(&plist, "ctx");
        assert!(matches!(
            r.string("conserved quantity A"),
            Err(ConfigError::MissingParameter { .. })
        ));
        assert!(matches!(
            r.sublist("thermal conductivity parameters"),
            Err(ConfigError::MissingParameter { .. })
        ));
    }

    #[test]
    fn wrong_type_reports_both_types() {
        let plist = ParameterList::new().with("decoupled", "yes");
        let mut r = ParamReader::new(&plist, "ctx");
        match r.bool_or("decoupled", false) {
            Err(ConfigError::WrongType { expected, found, .. }) => {
                assert_eq!(expected, "bool");
                assert_eq!(found, "string");
            }
            other => panic!("expected WrongType, got {other:?}"),
        }
    }

    #[test]
    fn negative_debug_cell_rejected() {
        let plist = ParameterList::new().with("debug cells", vec![-1_i64]);
        let mut r = ParamReader::new(&plist, "ctx");
        assert!(matches!(
            r.usize_array_or_empty("debug cells"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn io_flags_read_per_key() {
        let key = FieldKey::new("surface_column_0-active_layer_temperature");
        let plist = ParameterList::new()
            .with(format!("checkpoint {}", key.name()), true);
        let mut r = ParamReader::new(&plist, "ctx");
        let flags = r.io_flags(&key).unwrap();
        assert!(flags.visualize);
        assert!(flags.checkpoint);
        r.finish().unwrap();
    }

    #[test]
    fn json_roundtrip_preserves_types() {
        let json = r#"{
            "evaluator type": "multiplicative",
            "coefficient": 2,
            "exponents": [2.0, 0.5],
            "dependency keys": ["a", "b"],
            "nested": { "flag": true }
        }"#;
        let plist: ParameterList = serde_json::from_str(json).unwrap();
        assert_eq!(plist.get("coefficient"), Some(&ParamValue::Int(2)));
        assert!(matches!(plist.get("exponents"), Some(ParamValue::DoubleArray(_))));
        assert!(matches!(plist.get("dependency keys"), Some(ParamValue::StringArray(_))));
        assert_eq!(
            plist.sublist("nested").and_then(|s| s.get("flag")),
            Some(&ParamValue::Bool(true))
        );
        let back: ParameterList =
            serde_json::from_str(&serde_json::to_string(&plist).unwrap()).unwrap();
        assert_eq!(back, plist);
    }
}
