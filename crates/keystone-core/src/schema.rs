//! Schema adapters.
//!
//! A [`Schema`] turns a raw channel value into a typed output or an ordered
//! list of [`Issue`]s. Keystone never inspects schemas beyond this
//! capability; any validation library can be plugged in by implementing the
//! trait.
//!
//! # Provided adapters
//!
//! - [`Typed`]: serde-driven parse into any `DeserializeOwned` type
//! - [`FnSchema`]: wraps a closure
//! - [`ObjectSchema`]: field presence and type checks on JSON objects
//! - `JsonSchema`: JSON Schema documents (cargo feature `json-schema`)
//!
//! # Example
//!
//! ```
//! use keystone_core::schema::{FieldType, ObjectSchema, Schema};
//! use serde_json::json;
//!
//! let schema = ObjectSchema::new()
//!     .required("name", FieldType::String)
//!     .optional("age", FieldType::Integer);
//!
//! assert!(schema.validate(&json!({"name": "Ada"})).is_ok());
//!
//! let issues = schema.validate(&json!({"age": "old"})).unwrap_err();
//! assert_eq!(issues.len(), 2);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::ContextValue;

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Location of the failure inside the channel value (empty for the root).
    pub path: String,
    /// Human-readable description.
    pub message: String,
    /// Optional machine-readable code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Issue {
    /// Creates an issue at `path`.
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            code: None,
        }
    }

    /// Sets the machine-readable code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Ordered list of [`Issue`]s, serialized as a plain JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Issues(Vec<Issue>);

impl Issues {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates a list holding one issue.
    #[must_use]
    pub fn single(issue: Issue) -> Self {
        Self(vec![issue])
    }

    /// Appends an issue.
    pub fn push(&mut self, issue: Issue) {
        self.0.push(issue);
    }

    /// Returns the number of issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no issues.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the first issue.
    #[must_use]
    pub fn first(&self) -> Option<&Issue> {
        self.0.first()
    }

    /// Iterates over the issues in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Issue> {
        self.0.iter()
    }

    /// Consumes the list.
    #[must_use]
    pub fn into_vec(self) -> Vec<Issue> {
        self.0
    }
}

impl FromIterator<Issue> for Issues {
    fn from_iter<I: IntoIterator<Item = Issue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Issues {
    type Item = Issue;
    type IntoIter = std::vec::IntoIter<Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Issues {
    type Item = &'a Issue;
    type IntoIter = std::slice::Iter<'a, Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A validator for one request channel.
///
/// Implementations must report ordinary failures as [`Issues`], never by
/// panicking, and must not coerce values beyond what the schema itself
/// defines.
pub trait Schema: Send + Sync + 'static {
    /// The validated, typed value stored in the request context.
    type Output: Send + Sync + 'static;

    /// Validates a raw channel value.
    fn validate(&self, value: &Value) -> Result<Self::Output, Issues>;
}

/// Object-safe form of [`Schema`] used by route tables.
pub trait ErasedSchema: Send + Sync + 'static {
    /// Validates and boxes the output as a [`ContextValue`].
    fn validate_erased(&self, value: &Value) -> Result<ContextValue, Issues>;
}

impl<S: Schema> ErasedSchema for S {
    fn validate_erased(&self, value: &Value) -> Result<ContextValue, Issues> {
        self.validate(value).map(ContextValue::new)
    }
}

/// Shared, type-erased schema.
pub type BoxedSchema = Arc<dyn ErasedSchema>;

/// Deserializes the channel into `T` with serde.
///
/// A channel validated with `Typed<T>` is read back with
/// `ctx.body::<T>()` (or the matching channel accessor).
pub struct Typed<T>(PhantomData<fn() -> T>);

impl<T> Typed<T> {
    /// Creates the adapter.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Typed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Typed<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Typed<T> {}

impl<T> fmt::Debug for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Typed<{}>", std::any::type_name::<T>())
    }
}

impl<T> Schema for Typed<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    type Output = T;

    fn validate(&self, value: &Value) -> Result<T, Issues> {
        T::deserialize(value).map_err(|err| {
            let message = err.to_string();
            let path = field_from_serde_message(&message).unwrap_or_default();
            Issues::single(Issue::new(path, message).with_code("invalid"))
        })
    }
}

// serde_json reports field-level failures as "missing field `x`" or
// "unknown field `x`, expected ...".
fn field_from_serde_message(message: &str) -> Option<String> {
    if !(message.starts_with("missing field") || message.starts_with("unknown field")) {
        return None;
    }
    let start = message.find('`')? + 1;
    let len = message[start..].find('`')?;
    Some(message[start..start + len].to_string())
}

/// Adapts a closure into a [`Schema`].
///
/// ```
/// use keystone_core::schema::{FnSchema, Issue, Issues, Schema};
/// use serde_json::{json, Value};
///
/// let even = FnSchema::new(|value: &Value| match value.as_i64() {
///     Some(n) if n % 2 == 0 => Ok(n),
///     _ => Err(Issues::single(Issue::new("", "expected an even integer"))),
/// });
///
/// assert_eq!(even.validate(&json!(4)).unwrap(), 4);
/// assert!(even.validate(&json!(3)).is_err());
/// ```
pub struct FnSchema<F, T> {
    func: F,
    _output: PhantomData<fn() -> T>,
}

impl<F, T> FnSchema<F, T>
where
    F: Fn(&Value) -> Result<T, Issues> + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    /// Wraps `func`.
    #[must_use]
    pub const fn new(func: F) -> Self {
        Self {
            func,
            _output: PhantomData,
        }
    }
}

impl<F, T> fmt::Debug for FnSchema<F, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSchema").finish_non_exhaustive()
    }
}

impl<F, T> Schema for FnSchema<F, T>
where
    F: Fn(&Value) -> Result<T, Issues> + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    type Output = T;

    fn validate(&self, value: &Value) -> Result<T, Issues> {
        (self.func)(value)
    }
}

/// Expected type of an [`ObjectSchema`] field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// JSON string.
    String,
    /// JSON integer.
    Integer,
    /// Any JSON number.
    Number,
    /// JSON boolean.
    Boolean,
    /// JSON array.
    Array,
    /// JSON object.
    Object,
    /// A string holding a base-10 integer, e.g. a path parameter `"42"`.
    NumericString,
    /// Anything.
    Any,
}

impl FieldType {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::NumericString => value.as_str().is_some_and(is_numeric),
            Self::Any => true,
        }
    }

    const fn describe(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Number => "a number",
            Self::Boolean => "a boolean",
            Self::Array => "an array",
            Self::Object => "an object",
            Self::NumericString => "a numeric string",
            Self::Any => "any value",
        }
    }
}

fn is_numeric(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    kind: FieldType,
    required: bool,
}

/// Checks field presence and types of a JSON object.
///
/// The output is the validated object itself. All failures are reported,
/// in field declaration order.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: Vec<Field>,
    deny_unknown: bool,
}

impl ObjectSchema {
    /// Creates a schema accepting any object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a required field.
    #[must_use]
    pub fn required(mut self, name: impl Into<String>, kind: FieldType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            kind,
            required: true,
        });
        self
    }

    /// Declares an optional field.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, kind: FieldType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            kind,
            required: false,
        });
        self
    }

    /// Rejects fields that were not declared.
    #[must_use]
    pub fn deny_unknown_fields(mut self) -> Self {
        self.deny_unknown = true;
        self
    }
}

impl Schema for ObjectSchema {
    type Output = Map<String, Value>;

    fn validate(&self, value: &Value) -> Result<Self::Output, Issues> {
        let Some(object) = value.as_object() else {
            return Err(Issues::single(
                Issue::new("", "expected an object").with_code("invalid_type"),
            ));
        };

        let mut issues = Issues::new();

        for field in &self.fields {
            match object.get(&field.name) {
                None | Some(Value::Null) if field.required => issues.push(
                    Issue::new(&field.name, format!("Missing required field: {}", field.name))
                        .with_code("required"),
                ),
                Some(v) if !v.is_null() && !field.kind.accepts(v) => issues.push(
                    Issue::new(&field.name, format!("expected {}", field.kind.describe()))
                        .with_code("invalid_type"),
                ),
                _ => {}
            }
        }

        if self.deny_unknown {
            for key in object.keys() {
                if !self.fields.iter().any(|f| &f.name == key) {
                    issues.push(Issue::new(key, "unknown field").with_code("unknown_field"));
                }
            }
        }

        if issues.is_empty() {
            Ok(object.clone())
        } else {
            Err(issues)
        }
    }
}

/// Validates against a JSON Schema document.
#[cfg(feature = "json-schema")]
pub struct JsonSchema {
    compiled: jsonschema::JSONSchema,
}

#[cfg(feature = "json-schema")]
impl JsonSchema {
    /// Compiles a JSON Schema document.
    pub fn compile(schema: &Value) -> Result<Self, Issues> {
        jsonschema::JSONSchema::compile(schema)
            .map(|compiled| Self { compiled })
            .map_err(|err| {
                Issues::single(Issue::new("", err.to_string()).with_code("invalid_schema"))
            })
    }
}

#[cfg(feature = "json-schema")]
impl fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchema").finish_non_exhaustive()
    }
}

#[cfg(feature = "json-schema")]
impl Schema for JsonSchema {
    type Output = Value;

    fn validate(&self, value: &Value) -> Result<Value, Issues> {
        match self.compiled.validate(value) {
            Ok(()) => Ok(value.clone()),
            Err(errors) => Err(errors
                .map(|err| Issue::new(err.instance_path.to_string(), err.to_string()))
                .collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct CreateUser {
        name: String,
        age: u32,
    }

    #[test]
    fn test_typed_parses_output() {
        let schema = Typed::<CreateUser>::new();
        let user = schema.validate(&json!({"name": "Ada", "age": 36})).unwrap();
        assert_eq!(
            user,
            CreateUser {
                name: "Ada".to_string(),
                age: 36
            }
        );
    }

    #[test]
    fn test_typed_missing_field_names_path() {
        let issues = Typed::<CreateUser>::new()
            .validate(&json!({"name": "Ada"}))
            .unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues.first().unwrap().path, "age");
    }

    #[test]
    fn test_typed_does_not_coerce() {
        let issues = Typed::<CreateUser>::new()
            .validate(&json!({"name": "Ada", "age": "36"}))
            .unwrap_err();
        assert!(issues.first().unwrap().message.contains("invalid type"));
    }

    #[test]
    fn test_object_schema_collects_all_issues() {
        let schema = ObjectSchema::new()
            .required("name", FieldType::String)
            .required("email", FieldType::String)
            .optional("age", FieldType::Integer);

        let issues = schema.validate(&json!({"age": 1.5})).unwrap_err();
        let paths: Vec<_> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, ["name", "email", "age"]);
    }

    #[test]
    fn test_object_schema_rejects_non_object() {
        let issues = ObjectSchema::new().validate(&json!([1, 2])).unwrap_err();
        assert_eq!(issues.first().unwrap().code.as_deref(), Some("invalid_type"));
    }

    #[test]
    fn test_object_schema_unknown_fields() {
        let schema = ObjectSchema::new()
            .required("id", FieldType::String)
            .deny_unknown_fields();
        let issues = schema.validate(&json!({"id": "1", "extra": true})).unwrap_err();
        assert_eq!(issues.first().unwrap().path, "extra");

        let lenient = ObjectSchema::new().required("id", FieldType::String);
        assert!(lenient.validate(&json!({"id": "1", "extra": true})).is_ok());
    }

    #[test]
    fn test_numeric_string() {
        let schema = ObjectSchema::new().required("id", FieldType::NumericString);
        assert!(schema.validate(&json!({"id": "42"})).is_ok());
        assert!(schema.validate(&json!({"id": "-7"})).is_ok());
        assert!(schema.validate(&json!({"id": "abc"})).is_err());
        assert!(schema.validate(&json!({"id": ""})).is_err());
        assert!(schema.validate(&json!({"id": 42})).is_err());
    }

    #[test]
    fn test_erased_schema_stores_output() {
        let boxed: BoxedSchema = Arc::new(Typed::<u32>::new());
        let value = boxed.validate_erased(&json!(7)).unwrap();
        assert_eq!(value.downcast_ref::<u32>(), Some(&7));
    }

    #[test]
    fn test_issues_serialize_as_array() {
        let issues = Issues::single(Issue::new("id", "bad").with_code("invalid"));
        assert_eq!(
            serde_json::to_value(&issues).unwrap(),
            json!([{"path": "id", "message": "bad", "code": "invalid"}])
        );
    }

    #[test]
    fn test_field_from_serde_message() {
        assert_eq!(
            field_from_serde_message("missing field `name`"),
            Some("name".to_string())
        );
        assert_eq!(field_from_serde_message("invalid type: string"), None);
    }

    #[cfg(feature = "json-schema")]
    #[test]
    fn test_json_schema_adapter() {
        let schema = JsonSchema::compile(&json!({
            "type": "object",
            "required": ["name"],
            "properties": {"name": {"type": "string"}}
        }))
        .unwrap();

        assert!(schema.validate(&json!({"name": "Ada"})).is_ok());
        assert!(!schema.validate(&json!({})).unwrap_err().is_empty());
    }
}
