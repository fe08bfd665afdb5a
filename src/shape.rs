//! Per-row result shaping
//!
//! A [`RowShaper`] is a caller-supplied transform applied to each raw row
//! before the result is returned or cached. Shaped results are what the
//! cache stores, so the shaper must be identifiable in the cache key, and
//! closures have no observable identity; every shaper therefore carries an
//! explicit stable token chosen by the caller. Two shapers with different
//! tokens over the same SQL never share a cache entry; reusing a token for a
//! different transform is a caller bug.

use std::fmt;

use serde_json::Value;

/// A named per-row transform.
///
/// # Example
///
/// ```
/// use serde_json::{json, Value};
/// use splitdb::RowShaper;
///
/// let names_only = RowShaper::new("names_only", |row: Value| {
///     json!(row.get("name").cloned().unwrap_or(Value::Null))
/// });
/// assert_eq!(names_only.token(), "names_only");
/// assert_eq!(names_only.apply(json!({"id": 1, "name": "ada"})), json!("ada"));
/// ```
pub struct RowShaper {
    /// Stable identity used in cache keys
    token: String,
    transform: Box<dyn Fn(Value) -> Value>,
}

impl RowShaper {
    /// Create a shaper with the given stable token
    pub fn new(token: impl Into<String>, transform: impl Fn(Value) -> Value + 'static) -> Self {
        Self {
            token: token.into(),
            transform: Box::new(transform),
        }
    }

    /// The shaper's stable token
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Apply the transform to one raw row
    pub fn apply(&self, row: Value) -> Value {
        (self.transform)(row)
    }
}

impl fmt::Debug for RowShaper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowShaper")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_apply_runs_transform() {
        let shaper = RowShaper::new("double", |row: Value| {
            json!(row.get("n").and_then(Value::as_i64).unwrap_or(0) * 2)
        });
        assert_eq!(shaper.apply(json!({"n": 21})), json!(42));
    }

    #[test]
    fn test_debug_shows_token_only() {
        let shaper = RowShaper::new("ident", |row| row);
        let debug = format!("{shaper:?}");
        assert!(debug.contains("ident"));
    }
}
