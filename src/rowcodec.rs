// Schema-driven row encoding.
//
// Columns are laid out flat in schema order: INT is 8 bytes little-endian
// two's complement; TEXT is a u32 little-endian byte length followed by the
// raw bytes. The same encoding of a single column doubles as the index key
// format, so byte-wise key comparison orders equal-width integers and
// length-prefixed text deterministically.

use crate::catalog::{ColumnType, TableSchema};
use crate::error::{DbError, Result};
use crate::types::Value;

/// Encode a full row. The value list must match the schema's column count
/// and types.
pub fn encode_row(schema: &TableSchema, values: &[Value]) -> Result<Vec<u8>> {
    if values.len() != schema.columns.len() {
        return Err(DbError::TypeMismatch(format!(
            "table {} expects {} values, got {}",
            schema.name,
            schema.columns.len(),
            values.len()
        )));
    }
    let mut buf = Vec::new();
    for (col, value) in schema.columns.iter().zip(values) {
        encode_column(&mut buf, &col.name, col.column_type, value)?;
    }
    Ok(buf)
}

/// Encode a single column's value; used to build index keys.
pub fn encode_value(schema: &TableSchema, col_idx: usize, value: &Value) -> Result<Vec<u8>> {
    let col = schema
        .columns
        .get(col_idx)
        .ok_or_else(|| DbError::ColumnNotFound(format!("column index {col_idx}")))?;
    let mut buf = Vec::new();
    encode_column(&mut buf, &col.name, col.column_type, value)?;
    Ok(buf)
}

fn encode_column(buf: &mut Vec<u8>, name: &str, ty: ColumnType, value: &Value) -> Result<()> {
    match (ty, value) {
        (ColumnType::Int, Value::Int(i)) => {
            buf.extend_from_slice(&i.to_le_bytes());
        }
        (ColumnType::Text, Value::Text(s)) => {
            buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
            buf.extend_from_slice(s.as_bytes());
        }
        _ => {
            return Err(DbError::TypeMismatch(format!(
                "column {} expects {:?}, got {}",
                name,
                ty,
                value.type_name()
            )));
        }
    }
    Ok(())
}

/// Decode a row payload produced by `encode_row`.
pub fn decode_row(schema: &TableSchema, data: &[u8]) -> Result<Vec<Value>> {
    let mut off = 0usize;
    let mut values = Vec::with_capacity(schema.columns.len());
    for col in &schema.columns {
        match col.column_type {
            ColumnType::Int => {
                if off + 8 > data.len() {
                    return Err(DbError::Corrupt(format!(
                        "truncated int for column {}",
                        col.name
                    )));
                }
                let mut b = [0u8; 8];
                b.copy_from_slice(&data[off..off + 8]);
                values.push(Value::Int(i64::from_le_bytes(b)));
                off += 8;
            }
            ColumnType::Text => {
                if off + 4 > data.len() {
                    return Err(DbError::Corrupt(format!(
                        "truncated text length for column {}",
                        col.name
                    )));
                }
                let len = u32::from_le_bytes([
                    data[off],
                    data[off + 1],
                    data[off + 2],
                    data[off + 3],
                ]) as usize;
                off += 4;
                if off + len > data.len() {
                    return Err(DbError::Corrupt(format!(
                        "text length {} for column {} exceeds remaining {} bytes",
                        len,
                        col.name,
                        data.len() - off
                    )));
                }
                let s = String::from_utf8_lossy(&data[off..off + len]).into_owned();
                values.push(Value::Text(s));
                off += len;
            }
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Column;

    fn schema() -> TableSchema {
        TableSchema::new(
            "users",
            vec![
                Column::new("id", ColumnType::Int),
                Column::new("name", ColumnType::Text),
            ],
        )
    }

    #[test]
    fn test_round_trip() {
        let values = vec![Value::Int(1), Value::Text("alice".into())];
        let bytes = encode_row(&schema(), &values).unwrap();
        assert_eq!(decode_row(&schema(), &bytes).unwrap(), values);
    }

    #[test]
    fn test_round_trip_boundaries() {
        let values = vec![Value::Int(i64::MAX), Value::Text(String::new())];
        let bytes = encode_row(&schema(), &values).unwrap();
        // 8 bytes for the int, 4 for the empty text's length prefix.
        assert_eq!(bytes.len(), 12);
        assert_eq!(decode_row(&schema(), &bytes).unwrap(), values);

        let values = vec![Value::Int(i64::MIN), Value::Text("x".repeat(1000))];
        let bytes = encode_row(&schema(), &values).unwrap();
        assert_eq!(decode_row(&schema(), &bytes).unwrap(), values);
    }

    #[test]
    fn test_wrong_arity() {
        let err = encode_row(&schema(), &[Value::Int(1)]).unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch(_)));
    }

    #[test]
    fn test_wrong_value_type() {
        let err = encode_row(
            &schema(),
            &[Value::Text("1".into()), Value::Text("a".into())],
        )
        .unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch(_)));
    }

    #[test]
    fn test_truncated_payload() {
        let values = vec![Value::Int(1), Value::Text("alice".into())];
        let bytes = encode_row(&schema(), &values).unwrap();
        assert!(matches!(
            decode_row(&schema(), &bytes[..7]),
            Err(DbError::Corrupt(_))
        ));
        assert!(matches!(
            decode_row(&schema(), &bytes[..10]),
            Err(DbError::Corrupt(_))
        ));
    }

    #[test]
    fn test_overlong_text_length() {
        let mut bytes = encode_row(&schema(), &[Value::Int(1), Value::Text("ab".into())]).unwrap();
        // Claim the text is far longer than the remaining bytes.
        bytes[8..12].copy_from_slice(&1000u32.to_le_bytes());
        assert!(matches!(
            decode_row(&schema(), &bytes),
            Err(DbError::Corrupt(_))
        ));
    }

    #[test]
    fn test_encode_value_matches_row_layout() {
        let s = schema();
        let row = encode_row(&s, &[Value::Int(5), Value::Text("bob".into())]).unwrap();
        let key = encode_value(&s, 0, &Value::Int(5)).unwrap();
        assert_eq!(&row[..8], key.as_slice());
        let key = encode_value(&s, 1, &Value::Text("bob".into())).unwrap();
        assert_eq!(&row[8..], key.as_slice());
    }
}
