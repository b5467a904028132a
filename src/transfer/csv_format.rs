//! CSV encoding of row sets.
//!
//! Parsing is quote-aware: quoted fields may contain delimiters, doubled
//! quotes and newlines. Header names are trimmed, data fields are kept as
//! written. Blank lines are skipped and an empty field or the literal `NULL`
//! decodes to null.

use crate::error::{DbError, DbResult};
use crate::models::Row;
use serde_json::Value as JsonValue;

/// Parse a CSV document with a header record into rows keyed by header.
///
/// Rows shorter than the header leave the trailing columns out, so the
/// database default applies to them.
pub fn parse_csv(data: &str) -> DbResult<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data.as_bytes());

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_error)?;
        // A whitespace-only line decodes to one empty field
        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }
        records.push(record);
    }

    if records.len() < 2 {
        return Err(DbError::invalid_input(
            "CSV must have at least header and one data row",
        ));
    }

    let headers: Vec<String> = records[0].iter().map(|h| h.trim().to_string()).collect();
    let rows = records[1..]
        .iter()
        .map(|record| {
            headers
                .iter()
                .zip(record.iter())
                .map(|(header, field)| (header.clone(), field_value(field)))
                .collect::<Row>()
        })
        .collect();
    Ok(rows)
}

/// Render rows as CSV. The header comes from the first row's columns; no rows
/// yields an empty document.
pub fn write_csv(rows: &[Row]) -> DbResult<String> {
    let Some(first) = rows.first() else {
        return Ok(String::new());
    };
    let columns: Vec<&String> = first.keys().collect();

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(&columns).map_err(csv_error)?;
    for row in rows {
        writer
            .write_record(columns.iter().map(|c| field_text(row.get(*c))))
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DbError::internal(format!("Failed to flush CSV: {}", e)))?;
    let mut out = String::from_utf8(bytes)
        .map_err(|e| DbError::internal(format!("CSV output is not UTF-8: {}", e)))?;
    if out.ends_with('\n') {
        out.pop();
    }
    Ok(out)
}

fn field_value(field: &str) -> JsonValue {
    if field.is_empty() || field == "NULL" {
        JsonValue::Null
    } else {
        JsonValue::String(field.to_string())
    }
}

fn field_text(value: Option<&JsonValue>) -> String {
    match value {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn csv_error(err: csv::Error) -> DbError {
    DbError::invalid_input(format!("Invalid CSV: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: JsonValue) -> Row {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_write_quotes_special_fields() {
        let rows = vec![
            row(json!({"id": 1, "name": "Smith, John", "note": "say \"hi\""})),
            row(json!({"id": 2, "name": null, "note": "line1\nline2"})),
        ];
        let csv = write_csv(&rows).unwrap();
        assert_eq!(
            csv,
            "id,name,note\n1,\"Smith, John\",\"say \"\"hi\"\"\"\n2,,\"line1\nline2\""
        );
    }

    #[test]
    fn test_write_empty_and_structured() {
        assert_eq!(write_csv(&[]).unwrap(), "");

        let rows = vec![row(json!({"tags": ["a", "b"], "active": true}))];
        assert_eq!(
            write_csv(&rows).unwrap(),
            "tags,active\n\"[\"\"a\"\",\"\"b\"\"]\",true"
        );
    }

    #[test]
    fn test_parse_quoted_fields() {
        let rows = parse_csv("id,name\r\n1,\"Smith, John\"\r\n2,\"say \"\"hi\"\"\"\r\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], json!("Smith, John"));
        assert_eq!(rows[1]["name"], json!("say \"hi\""));
        assert_eq!(rows[1]["id"], json!("2"));
    }

    #[test]
    fn test_parse_newline_inside_quotes() {
        let rows = parse_csv("id,note\n1,\"first\nsecond\"\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["note"], json!("first\nsecond"));
    }

    #[test]
    fn test_parse_nulls_blank_lines_and_header_trim() {
        let rows = parse_csv("a, b ,c\n\nx,NULL,\n   \n").unwrap();
        assert_eq!(rows.len(), 1);
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, ["a", "b", "c"]);
        assert_eq!(rows[0]["a"], json!("x"));
        assert_eq!(rows[0]["b"], JsonValue::Null);
        assert_eq!(rows[0]["c"], JsonValue::Null);
    }

    #[test]
    fn test_parse_short_row_omits_columns() {
        let rows = parse_csv("a,b,c\n1\n").unwrap();
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0]["a"], json!("1"));
    }

    #[test]
    fn test_parse_requires_header_and_data() {
        for input in ["", "a,b", "a,b\n\n"] {
            let err = parse_csv(input).unwrap_err();
            assert_eq!(
                err.to_string(),
                "CSV must have at least header and one data row"
            );
        }
    }

    #[test]
    fn test_roundtrip_preserves_commas_and_quotes() {
        let rows = vec![
            row(json!({"id": "1", "title": "a, \"quoted\" title"})),
            row(json!({"id": "2", "title": "plain"})),
        ];
        let parsed = parse_csv(&write_csv(&rows).unwrap()).unwrap();
        assert_eq!(parsed, rows);
    }

    #[test]
    fn test_roundtrip_keeps_field_padding() {
        let rows = vec![row(json!({"id": "1", "title": "  padded  ", "note": " x"}))];
        let csv = write_csv(&rows).unwrap();
        assert_eq!(parse_csv(&csv).unwrap(), rows);
    }
}
