//! Resource records and helpers for picking them out of listings.

use crate::error::{EnsureError, Result};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// A resource as the API returns or accepts it.
pub type Record = Map<String, Value>;

/// Default separator for nested field paths.
pub const PATH_SEPARATOR: char = '.';

/// Convert a JSON value into a record, if it is an object.
pub fn from_value(value: Value) -> Option<Record> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Render the primary key of a record as an identifier.
///
/// Strings are used as they are, numbers are formatted. Anything else is
/// not a usable key.
pub fn key(record: &Record, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Look up a nested field, `server.hostname` style.
pub fn lookup<'a>(record: &'a Record, path: &str, sep: char) -> Option<&'a Value> {
    let mut segments = path.split(sep);
    let mut value = record.get(segments.next()?)?;
    for segment in segments {
        value = value.as_object()?.get(segment)?;
    }
    Some(value)
}

fn matches(record: &Record, keymap: &IndexMap<String, Value>, strict: bool) -> Result<bool> {
    for (path, expected) in keymap {
        match lookup(record, path, PATH_SEPARATOR) {
            Some(value) if value == expected => {}
            Some(_) => return Ok(false),
            None if strict => return Err(EnsureError::MissingField(path.clone())),
            None => return Ok(false),
        }
    }
    Ok(true)
}

/// Keep the records whose fields match every entry of `keymap`.
///
/// A record lacking one of the paths is an error.
pub fn filter<'a, I>(items: I, keymap: &IndexMap<String, Value>) -> Result<Vec<&'a Record>>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut filtered = Vec::new();
    for item in items {
        if matches(item, keymap, true)? {
            filtered.push(item);
        }
    }
    Ok(filtered)
}

/// Like [`filter`], but a missing path counts as a mismatch.
pub fn lax_filter<'a, I>(items: I, keymap: &IndexMap<String, Value>) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    items
        .into_iter()
        .filter(|item| matches(item, keymap, false).unwrap_or(false))
        .collect()
}

pub fn one<T>(mut items: Vec<T>) -> Result<T> {
    match items.len() {
        0 => Err(EnsureError::NotFound),
        1 => Ok(items.remove(0)),
        n => Err(EnsureError::Ambiguous(n)),
    }
}

pub fn one_or_none<T>(mut items: Vec<T>) -> Result<Option<T>> {
    match items.len() {
        0 => Ok(None),
        1 => Ok(Some(items.remove(0))),
        n => Err(EnsureError::Ambiguous(n)),
    }
}

pub fn filter_one<'a, I>(items: I, keymap: &IndexMap<String, Value>) -> Result<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    one(filter(items, keymap)?)
}

pub fn filter_one_or_none<'a, I>(
    items: I,
    keymap: &IndexMap<String, Value>,
) -> Result<Option<&'a Record>>
where
    I: IntoIterator<Item = &'a Record>,
{
    one_or_none(filter(items, keymap)?)
}

pub fn lax_filter_one<'a, I>(items: I, keymap: &IndexMap<String, Value>) -> Result<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    one(lax_filter(items, keymap))
}

pub fn lax_filter_one_or_none<'a, I>(
    items: I,
    keymap: &IndexMap<String, Value>,
) -> Result<Option<&'a Record>>
where
    I: IntoIterator<Item = &'a Record>,
{
    one_or_none(lax_filter(items, keymap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn servers() -> Vec<Record> {
        [
            json!({"name": "foo", "server": {"id": 1234, "hostname": "host1"}, "loc": 4, "yyy": "zzz"}),
            json!({"name": "bar", "server": {"id": 2345, "hostname": "host2"}, "loc": 3}),
            json!({"name": "baz", "server": {"id": 3456, "hostname": "host3"}, "loc": 4}),
        ]
        .into_iter()
        .filter_map(from_value)
        .collect()
    }

    fn keymap(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn names(items: &[&Record]) -> Vec<String> {
        items.iter().filter_map(|r| key(r, "name")).collect()
    }

    #[test]
    fn filter_by_nested_path() {
        let items = servers();
        let found = filter(&items, &keymap(&[("loc", json!(4))])).unwrap();
        assert_eq!(names(&found), ["foo", "baz"]);

        let found = filter(
            &items,
            &keymap(&[("loc", json!(4)), ("server.hostname", json!("host1"))]),
        )
        .unwrap();
        assert_eq!(names(&found), ["foo"]);

        let found = filter(
            &items,
            &keymap(&[("name", json!("bar")), ("server.hostname", json!("host3"))]),
        )
        .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn strict_filter_rejects_missing_field() {
        let items = servers();
        let err = filter(&items, &keymap(&[("yyy", json!("zzz"))])).unwrap_err();
        assert!(matches!(err, EnsureError::MissingField(path) if path == "yyy"));
    }

    #[test]
    fn lax_filter_treats_missing_as_mismatch() {
        let items = servers();
        let found = lax_filter(&items, &keymap(&[("yyy", json!("zzz"))]));
        assert_eq!(names(&found), ["foo"]);
    }

    #[test]
    fn one_requires_exactly_one() {
        let items = servers();
        assert!(matches!(
            filter_one(&items, &keymap(&[("loc", json!(4))])),
            Err(EnsureError::Ambiguous(2))
        ));
        assert!(matches!(
            filter_one(&items, &keymap(&[("loc", json!(9))])),
            Err(EnsureError::NotFound)
        ));
        assert!(lax_filter_one_or_none(&items, &keymap(&[("loc", json!(9))]))
            .unwrap()
            .is_none());
        let bar = filter_one_or_none(&items, &keymap(&[("loc", json!(3))]))
            .unwrap()
            .unwrap();
        assert_eq!(key(bar, "name").as_deref(), Some("bar"));
    }

    #[test]
    fn keys_render_strings_and_numbers() {
        let record = from_value(json!({"id": 7, "key": "abc", "flag": true})).unwrap();
        assert_eq!(key(&record, "id").as_deref(), Some("7"));
        assert_eq!(key(&record, "key").as_deref(), Some("abc"));
        assert_eq!(key(&record, "flag"), None);
        assert_eq!(key(&record, "missing"), None);
    }
}
