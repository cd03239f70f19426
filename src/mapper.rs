//! Result rows to grid row objects.

use serde_json::{Map, Value as Json};

use crate::source::ResultSet;

/// Map every result row to a JSON object keyed by column alias.
///
/// With `dot_notation`, an alias `a.b.c` becomes `{"a": {"b": {"c": v}}}`.
pub fn map_rows(result: &ResultSet, dot_notation: bool) -> Vec<Map<String, Json>> {
    result
        .records()
        .map(|record| {
            let mut row = Map::with_capacity(record.len());
            for (alias, value) in record {
                if dot_notation && alias.contains('.') {
                    insert_nested(&mut row, alias, value.to_json());
                } else {
                    row.insert(alias.to_string(), value.to_json());
                }
            }
            row
        })
        .collect()
}

fn insert_nested(row: &mut Map<String, Json>, path: &str, value: Json) {
    let mut parts = path.split('.').peekable();
    let mut current = row;
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            current.insert(part.to_string(), value);
            return;
        }
        let slot = current
            .entry(part.to_string())
            .or_insert_with(|| Json::Object(Map::new()));
        if !slot.is_object() {
            *slot = Json::Object(Map::new());
        }
        current = match slot {
            Json::Object(map) => map,
            _ => return,
        };
    }
}
