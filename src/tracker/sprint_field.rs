//! Decoding of the sprint custom field.
//!
//! Depending on the server version the field is an array of objects
//! (`{"id": 1, "name": "Sprint 1", "state": "active"}`) or an array of
//! serialized Java objects
//! (`com.atlassian.greenhopper.service.sprint.Sprint@1a2b[id=1,rapidViewId=4,state=ACTIVE,name=Sprint 1,...]`).
//! Both decode to the same [`SprintRef`].

use anyhow::{bail, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::model::issue::SprintRef;

#[derive(Deserialize)]
#[serde(untagged)]
enum SprintEntry {
    Object(SprintRef),
    Serialized(String),
}

/// The first sprint in the field, or `None` when the field is absent, null or empty.
pub fn first_sprint(field: Option<&Value>) -> Result<Option<SprintRef>> {
    let first = match field {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(entries)) => match entries.first() {
            Some(entry) => entry,
            None => return Ok(None),
        },
        // A few servers return a single entry rather than a list
        Some(other) => other,
    };

    match SprintEntry::deserialize(first) {
        Ok(SprintEntry::Object(sprint)) => Ok(Some(sprint)),
        Ok(SprintEntry::Serialized(raw)) => match parse_serialized(&raw) {
            Some(sprint) => Ok(Some(sprint)),
            None => bail!("Unrecognised sprint field value: {raw}"),
        },
        Err(_) => bail!("Unrecognised sprint field value: {first}"),
    }
}

/// Parse the bracketed `key=value` list of a serialized sprint.
///
/// A comma-separated piece without `=` belongs to the previous value, so
/// names containing commas survive.
pub fn parse_serialized(raw: &str) -> Option<SprintRef> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end <= start {
        return None;
    }

    let mut pairs: Vec<(&str, String)> = Vec::new();
    for piece in raw[start + 1..end].split(',') {
        match piece.split_once('=') {
            Some((key, value)) if is_field_key(key) => pairs.push((key, value.to_string())),
            _ => match pairs.last_mut() {
                Some((_, value)) => {
                    value.push(',');
                    value.push_str(piece);
                }
                None => return None,
            },
        }
    }

    let lookup = |name: &str| {
        pairs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty() && *value != "<null>")
    };

    let name = lookup("name")?.to_string();
    Some(SprintRef {
        id: lookup("id").and_then(|id| id.parse().ok()),
        name,
        state: lookup("state").map(String::from),
    })
}

fn is_field_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric())
}
