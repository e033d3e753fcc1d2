use crate::config::{ENTITY_ID_PATTERN, ENTITY_ID_PREFIX};
use crate::error::SkipReason;
use crate::fields::key_tail;
use crate::models::{ClassifiedRecord, EntityKind};
use crate::sanitize::clean_payload;
use memchr::{memmem, memrchr};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static ENTITY_ID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(ENTITY_ID_PATTERN).unwrap());

/// Splits a dump line into its prefix columns and the trailing JSON payload.
/// A line without any tab is all payload and is also its own prefix.
fn split_payload(line: &str) -> (&str, &str) {
    match memrchr(b'\t', line.as_bytes()) {
        Some(pos) => (&line[..pos], &line[pos + 1..]),
        None => (line, line),
    }
}

/// Cheap pre-filter: the first enabled kind whose type key appears in the prefix columns.
/// The payload is never searched, so free text mentioning a type key cannot promote a line.
fn type_marker(prefix: &str, kinds: &[EntityKind]) -> Option<EntityKind> {
    kinds
        .iter()
        .copied()
        .find(|kind| memmem::find(prefix.as_bytes(), kind.type_key().as_bytes()).is_some())
}

/// `type` is normally `{"key": "/type/edition"}`; some records carry the bare string.
fn declared_type(bag: &Map<String, Value>) -> Option<&str> {
    match bag.get("type")? {
        Value::String(s) => Some(s),
        Value::Object(map) => map.get("key")?.as_str(),
        _ => None,
    }
}

pub fn is_entity_id(candidate: &str) -> bool {
    candidate.starts_with(ENTITY_ID_PREFIX) && ENTITY_ID_REGEX.is_match(candidate)
}

/// Classifies one raw dump line as an entity of one of `kinds`, or says why it was skipped.
///
/// The substring marker only decides whether the line is worth parsing. The decoded
/// `type.key`, when present, is authoritative: it must name an enabled kind and agree
/// with the marker.
pub fn classify(line: &str, kinds: &[EntityKind]) -> Result<ClassifiedRecord, SkipReason> {
    let (prefix, payload) = split_payload(line);
    let marker = type_marker(prefix, kinds).ok_or(SkipReason::NoTypeMarker)?;

    let value: Value = serde_json::from_str(&clean_payload(payload))?;
    let Value::Object(bag) = value else {
        return Err(SkipReason::NotAnObject);
    };

    let kind = match declared_type(&bag) {
        None => marker,
        Some(declared) => match EntityKind::from_type_key(declared) {
            Some(kind) if !kinds.contains(&kind) => {
                return Err(SkipReason::UnsupportedType(declared.to_string()))
            }
            Some(kind) if kind != marker => {
                return Err(SkipReason::TypeMismatch {
                    declared: kind,
                    marker,
                })
            }
            Some(kind) => kind,
            None => return Err(SkipReason::UnsupportedType(declared.to_string())),
        },
    };

    let key = bag
        .get("key")
        .and_then(Value::as_str)
        .ok_or(SkipReason::MissingId)?;
    let id = key_tail(key);
    if !is_entity_id(id) {
        return Err(SkipReason::InvalidId(key.to_string()));
    }
    let id = id.to_string();

    Ok(ClassifiedRecord { kind, id, bag })
}
