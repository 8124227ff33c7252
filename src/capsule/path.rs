//! Field paths addressing nested payload structure
//!
//! Syntax: dot-separated segments, `\.` for a literal dot. On objects a segment is a
//! key, on arrays a decimal index. `#` on an array maps the rest of the path over every
//! element, or yields the element count when it is the last segment.

use crate::error::{ConduitError, ConduitResult};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Key(String),
    Each,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    pub(crate) fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        if raw.is_empty() {
            return Self {
                raw: String::new(),
                segments,
            };
        }

        let mut current = String::new();
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => current.push('\\'),
                },
                '.' => segments.push(Self::segment(std::mem::take(&mut current))),
                other => current.push(other),
            }
        }
        segments.push(Self::segment(current));

        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    fn segment(text: String) -> Segment {
        if text == "#" {
            Segment::Each
        } else {
            Segment::Key(text)
        }
    }

    pub(crate) fn lookup(&self, value: &Value) -> Value {
        lookup(value, &self.segments)
    }

    /// Writes `new_value` at this path.
    ///
    /// Every failure is detected before the payload is touched: once a missing
    /// intermediate is created, every remaining segment lands in fresh objects.
    pub(crate) fn assign(&self, root: &mut Value, new_value: Value) -> ConduitResult<()> {
        if self.segments.iter().any(|s| *s == Segment::Each) {
            return Err(self.pattern_error("'#' cannot be used to set a value"));
        }
        self.assign_at(root, &self.segments, new_value)
    }

    fn assign_at(
        &self,
        target: &mut Value,
        segments: &[Segment],
        new_value: Value,
    ) -> ConduitResult<()> {
        let Some((head, rest)) = segments.split_first() else {
            *target = new_value;
            return Ok(());
        };

        let key = segment_key(head);
        if target.is_null() {
            *target = Value::Object(Map::new());
        }

        match target {
            Value::Object(map) => {
                if rest.is_empty() {
                    map.insert(key.to_string(), new_value);
                    return Ok(());
                }
                let child = map.entry(key.to_string()).or_insert(Value::Null);
                self.assign_at(child, rest, new_value)
            }
            Value::Array(items) => {
                let appends = key == "-1" || key.parse::<usize>().ok() == Some(items.len());
                if rest.is_empty() && appends {
                    items.push(new_value);
                    return Ok(());
                }
                let index = self.existing_index(key, items.len())?;
                self.assign_at(&mut items[index], rest, new_value)
            }
            scalar => Err(self.pattern_error(&format!(
                "cannot set '{}' on {}",
                key,
                type_name(scalar)
            ))),
        }
    }

    /// Removes the value at this path; a missing path is a no-op
    pub(crate) fn remove(&self, root: &mut Value) -> ConduitResult<Option<Value>> {
        if self.segments.iter().any(|s| *s == Segment::Each) {
            return Err(self.pattern_error("'#' cannot be used to delete a value"));
        }
        if self.segments.is_empty() {
            return Ok(Some(std::mem::take(root)));
        }
        Ok(remove_at(root, &self.segments))
    }

    fn existing_index(&self, key: &str, len: usize) -> ConduitResult<usize> {
        match key.parse::<usize>() {
            Ok(index) if index < len => Ok(index),
            _ => Err(self.pattern_error(&format!(
                "'{}' is not a valid index for an array of length {}",
                key, len
            ))),
        }
    }

    fn pattern_error(&self, reason: &str) -> ConduitError {
        ConduitError::InvalidDataPattern(format!("{}: {}", self.raw, reason))
    }
}

fn segment_key(segment: &Segment) -> &str {
    match segment {
        Segment::Key(key) => key,
        Segment::Each => "#",
    }
}

fn remove_at(target: &mut Value, segments: &[Segment]) -> Option<Value> {
    let (head, rest) = segments.split_first()?;
    let key = segment_key(head);

    match target {
        Value::Object(map) if rest.is_empty() => map.remove(key),
        Value::Object(map) => remove_at(map.get_mut(key)?, rest),
        Value::Array(items) => {
            let index = key.parse::<usize>().ok().filter(|i| *i < items.len())?;
            if rest.is_empty() {
                Some(items.remove(index))
            } else {
                remove_at(&mut items[index], rest)
            }
        }
        _ => None,
    }
}

fn lookup(value: &Value, segments: &[Segment]) -> Value {
    let Some((head, rest)) = segments.split_first() else {
        return value.clone();
    };

    match (value, head) {
        (Value::Array(items), Segment::Each) if rest.is_empty() => Value::from(items.len()),
        (Value::Array(items), Segment::Each) => Value::Array(
            items
                .iter()
                .map(|item| lookup(item, rest))
                .filter(|v| !v.is_null())
                .collect(),
        ),
        (Value::Object(map), Segment::Key(key)) => {
            map.get(key).map_or(Value::Null, |v| lookup(v, rest))
        }
        (Value::Array(items), Segment::Key(key)) => key
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .map_or(Value::Null, |v| lookup(v, rest)),
        _ => Value::Null,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_escaped_dot() {
        let path = FieldPath::parse(r"a\.b.c");
        assert_eq!(
            path.segments,
            vec![Segment::Key("a.b".to_string()), Segment::Key("c".to_string())]
        );
    }

    #[test]
    fn test_lookup_each_and_count() {
        let data = json!({"users": [{"name": "a"}, {"name": "b"}, {"age": 3}]});
        assert_eq!(FieldPath::parse("users.#").lookup(&data), json!(3));
        assert_eq!(FieldPath::parse("users.#.name").lookup(&data), json!(["a", "b"]));
        assert_eq!(FieldPath::parse("users.1.name").lookup(&data), json!("b"));
        assert_eq!(FieldPath::parse("users.9.name").lookup(&data), Value::Null);
    }

    #[test]
    fn test_assign_creates_intermediate_objects() {
        let mut data = json!({});
        FieldPath::parse("a.b.c").assign(&mut data, json!(1)).unwrap();
        assert_eq!(data, json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_assign_array_rules() {
        let mut data = json!({"list": [1, 2]});
        FieldPath::parse("list.0").assign(&mut data, json!(9)).unwrap();
        FieldPath::parse("list.2").assign(&mut data, json!(3)).unwrap();
        FieldPath::parse("list.-1").assign(&mut data, json!(4)).unwrap();
        assert_eq!(data, json!({"list": [9, 2, 3, 4]}));

        let err = FieldPath::parse("list.7").assign(&mut data, json!(0));
        assert!(matches!(err, Err(ConduitError::InvalidDataPattern(_))));
        assert_eq!(data, json!({"list": [9, 2, 3, 4]}));
    }

    #[test]
    fn test_assign_into_scalar_fails_without_mutation() {
        let mut data = json!({"a": {"b": "text"}});
        let result = FieldPath::parse("a.b.c").assign(&mut data, json!(1));
        assert!(matches!(result, Err(ConduitError::InvalidDataPattern(_))));
        assert_eq!(data, json!({"a": {"b": "text"}}));
    }

    #[test]
    fn test_remove() {
        let mut data = json!({"a": {"b": 1, "c": [1, 2, 3]}});
        assert_eq!(FieldPath::parse("a.b").remove(&mut data).unwrap(), Some(json!(1)));
        assert_eq!(FieldPath::parse("a.c.1").remove(&mut data).unwrap(), Some(json!(2)));
        assert_eq!(FieldPath::parse("x.y").remove(&mut data).unwrap(), None);
        assert_eq!(data, json!({"a": {"c": [1, 3]}}));
    }
}
