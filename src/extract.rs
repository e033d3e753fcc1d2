use crate::config::SERIES_QUALIFIER_MAX_LETTERS;
use crate::fields::{element_text, elements, key_tail, resolve_scalar};
use crate::models::{ClassifiedRecord, Extracted, RelationRow, ScalarRecord};
use crate::schema::{schema_for, ElementRule};
use serde_json::Value;
use tracing::{debug, warn};

/// Flattens a classified record into its scalar row and relation rows using the kind's
/// field table. Field-level failures leave that column empty; the record is always emitted.
pub fn extract(record: &ClassifiedRecord) -> Extracted {
    let schema = schema_for(record.kind);
    let mut field_errors = 0u64;

    let mut columns = Vec::with_capacity(schema.column_count());
    columns.push(record.id.clone());
    for field in schema.scalars {
        match resolve_scalar(&record.bag, field.key) {
            Ok(text) => columns.push(text),
            Err(e) => {
                warn!(id = %record.id, error = %e, "Field extraction failed, leaving column empty");
                field_errors += 1;
                columns.push(String::new());
            }
        }
    }

    let mut relations = Vec::new();
    let mut unresolved_elements = 0u64;
    for (index, field) in schema.relations.iter().enumerate() {
        let items = elements(&record.bag, field.key);
        let mut i = 0;
        while i < items.len() {
            let resolved = resolve_element(field.rule, &items[i]);
            i += 1;

            let Some(mut value) = resolved else {
                debug!(
                    id = %record.id,
                    relation = field.name,
                    element = %items[i - 1],
                    "Unresolvable relation element"
                );
                unresolved_elements += 1;
                continue;
            };

            if field.rule == ElementRule::Series {
                if let Some(next) = items.get(i).and_then(element_text) {
                    if is_volume_qualifier(&next) {
                        value.push(' ');
                        value.push_str(&next);
                        i += 1;
                    }
                }
            }

            if !value.is_empty() {
                relations.push(RelationRow {
                    relation: index,
                    value,
                });
            }
        }
    }

    Extracted {
        scalar: ScalarRecord {
            kind: record.kind,
            columns,
        },
        relations,
        field_errors,
        unresolved_elements,
    }
}

fn resolve_element(rule: ElementRule, element: &Value) -> Option<String> {
    match rule {
        ElementRule::Value | ElementRule::Series => element_text(element),
        ElementRule::Key => key_of(element),
        ElementRule::KeyTail => key_of(element).map(|key| key_tail(&key).to_string()),
        ElementRule::Field(name) => element.get(name).and_then(element_text),
        ElementRule::AuthorRole => {
            let author = element.get("author")?;
            key_of(author).map(|key| key_tail(&key).to_string())
        }
    }
}

/// A reference is either `{"key": "/kind/OL..."}` or, in older records, the bare key string.
fn key_of(element: &Value) -> Option<String> {
    match element {
        Value::String(_) => element_text(element),
        _ => element.get("key").and_then(element_text),
    }
}

/// Series lists sometimes split "Series Name" and "Vol. 3" into adjacent entries; the
/// follower is a qualifier when digits dominate, or when it is one digit and a short word.
pub fn is_volume_qualifier(text: &str) -> bool {
    let digits = text.chars().filter(|c| c.is_ascii_digit()).count();
    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    digits > letters || (digits == 1 && letters < SERIES_QUALIFIER_MAX_LETTERS)
}
