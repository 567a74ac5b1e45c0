use serde_json::{Map, Value};

use crate::shared::ValidationErrors;

/// A record that can be built from an untyped configuration document.
///
/// Implementations validate and coerce the value found at `path`, recording every violation
/// into `errors` instead of returning on the first one. They return `None` only when at least
/// one violation was recorded.
pub trait FromDocument: Sized {
    fn parse(value: &Value, path: &str, errors: &mut ValidationErrors) -> Option<Self>;

    /// Validating constructor for a standalone value.
    fn from_value(value: &Value) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let parsed = Self::parse(value, "", &mut errors);

        match parsed {
            Some(parsed) if errors.is_empty() => Ok(parsed),
            _ => Err(errors),
        }
    }
}

impl<T> FromDocument for Vec<T>
where
    T: FromDocument,
{
    fn parse(value: &Value, path: &str, errors: &mut ValidationErrors) -> Option<Self> {
        let Value::Array(items) = value else {
            errors.invalid_type(field_path(path), "a sequence", describe(value));
            return None;
        };

        let before = errors.len();
        let parsed: Vec<T> = items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| T::parse(item, &format!("{path}[{index}]"), errors))
            .collect();

        (errors.len() == before).then_some(parsed)
    }
}

/// Joins a parent path and a key into a dotted field path.
pub(crate) fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Field path reported for violations of the value at `path` itself.
pub(crate) fn field_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

/// Short human readable description of a value, used in type errors.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean `{b}`"),
        Value::Number(n) => format!("number `{n}`"),
        Value::String(s) => format!("{s:?}"),
        Value::Array(_) => "a sequence".to_string(),
        Value::Object(_) => "a mapping".to_string(),
    }
}

pub(crate) fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        // YAML turns `nvidia.com/gpu: 1` into a number, quantities are strings.
        Value::Number(n) => Some(n.to_string()),
        // Spelled the way environment overrides deliver them.
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn coerce_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// A mapping node of the document together with its dotted path.
///
/// Accessors treat an explicit `null` the same as a missing key, matching how YAML renders
/// `key:` with nothing after it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Section<'a> {
    path: &'a str,
    map: &'a Map<String, Value>,
}

impl<'a> Section<'a> {
    /// Views `value` as a mapping, recording a type error if it is anything else.
    pub(crate) fn new(
        value: &'a Value,
        path: &'a str,
        errors: &mut ValidationErrors,
    ) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self { path, map }),
            other => {
                errors.invalid_type(field_path(path), "a mapping", describe(other));
                None
            }
        }
    }

    pub(crate) fn path(&self) -> &'a str {
        self.path
    }

    pub(crate) fn field(&self, key: &str) -> String {
        join(self.path, key)
    }

    pub(crate) fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|value| !value.is_null())
    }

    /// Returns `true` if the key is written in the document at all, even as `null`.
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&'a String, &'a Value)> + use<'a> {
        self.map.iter()
    }

    pub(crate) fn required_string(
        &self,
        key: &str,
        errors: &mut ValidationErrors,
    ) -> Option<String> {
        let Some(value) = self.get(key) else {
            errors.missing(self.field(key));
            return None;
        };

        self.string_value(key, value, errors)
    }

    /// Like [`Section::required_string`] but also rejects blank strings.
    pub(crate) fn required_non_empty(
        &self,
        key: &str,
        errors: &mut ValidationErrors,
    ) -> Option<String> {
        let value = self.required_string(key, errors)?;
        if value.trim().is_empty() {
            errors.invalid_value(self.field(key), "must not be empty");
            return None;
        }

        Some(value)
    }

    pub(crate) fn optional_string(
        &self,
        key: &str,
        errors: &mut ValidationErrors,
    ) -> Option<String> {
        let value = self.get(key)?;
        self.string_value(key, value, errors)
    }

    pub(crate) fn string_or(
        &self,
        key: &str,
        default: &str,
        errors: &mut ValidationErrors,
    ) -> String {
        self.optional_string(key, errors)
            .unwrap_or_else(|| default.to_string())
    }

    pub(crate) fn bool_or(&self, key: &str, default: bool, errors: &mut ValidationErrors) -> bool {
        let Some(value) = self.get(key) else {
            return default;
        };

        coerce_bool(value).unwrap_or_else(|| {
            errors.invalid_type(self.field(key), "a boolean", describe(value));
            default
        })
    }

    pub(crate) fn required_integer<T>(&self, key: &str, errors: &mut ValidationErrors) -> Option<T>
    where
        T: TryFrom<i64>,
    {
        let Some(value) = self.get(key) else {
            errors.missing(self.field(key));
            return None;
        };

        self.integer_value(key, value, errors)
    }

    pub(crate) fn integer_or<T>(&self, key: &str, default: T, errors: &mut ValidationErrors) -> T
    where
        T: TryFrom<i64>,
    {
        match self.get(key) {
            Some(value) => self.integer_value(key, value, errors).unwrap_or(default),
            None => default,
        }
    }

    pub(crate) fn required_float(&self, key: &str, errors: &mut ValidationErrors) -> Option<f64> {
        let Some(value) = self.get(key) else {
            errors.missing(self.field(key));
            return None;
        };

        let Some(number) = coerce_float(value) else {
            errors.invalid_type(self.field(key), "a number", describe(value));
            return None;
        };

        if !number.is_finite() {
            errors.invalid_value(self.field(key), "must be a finite number");
            return None;
        }

        Some(number)
    }

    pub(crate) fn string_list_or(
        &self,
        key: &str,
        default: &[&str],
        errors: &mut ValidationErrors,
    ) -> Vec<String> {
        let Some(value) = self.get(key) else {
            return default.iter().map(|item| item.to_string()).collect();
        };

        let items = match value {
            Value::Array(items) => items,
            // Environment overrides deliver lists as `a,b,c`.
            Value::String(list) => {
                return list
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => {
                errors.invalid_type(self.field(key), "a sequence of strings", describe(value));
                return Vec::new();
            }
        };

        let mut list = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match coerce_string(item) {
                Some(item) => list.push(item),
                None => errors.invalid_type(
                    format!("{}[{index}]", self.field(key)),
                    "a string",
                    describe(item),
                ),
            }
        }

        list
    }

    fn string_value(
        &self,
        key: &str,
        value: &Value,
        errors: &mut ValidationErrors,
    ) -> Option<String> {
        let coerced = coerce_string(value);
        if coerced.is_none() {
            errors.invalid_type(self.field(key), "a string", describe(value));
        }

        coerced
    }

    fn integer_value<T>(&self, key: &str, value: &Value, errors: &mut ValidationErrors) -> Option<T>
    where
        T: TryFrom<i64>,
    {
        let Some(integer) = coerce_integer(value) else {
            errors.invalid_type(self.field(key), "an integer", describe(value));
            return None;
        };

        match T::try_from(integer) {
            Ok(integer) => Some(integer),
            Err(_) if integer < 0 => {
                errors.invalid_value(self.field(key), format!("{integer} must not be negative"));
                None
            }
            Err(_) => {
                errors.invalid_value(self.field(key), format!("{integer} is out of range"));
                None
            }
        }
    }
}
