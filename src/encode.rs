//! Binary encoding of [`Value`]s.

use crate::{
    AvroResult,
    error::Error,
    schema::{
        DecimalSchema, EnumSchema, FixedSchema, Names, RecordSchema, Schema, SchemaKind,
        UnionSchema,
    },
    types::{Value, ValueKind},
    util::{zig_i32, zig_i64},
};
use log::error;
use std::io::Write;

/// Encode a `Value` under `schema` into `writer`, returning the number of
/// bytes written.
///
/// The value is assumed to match the schema; use [`Value::validate`] first
/// when that is not known. The schema only guides the encoding of complex
/// values.
pub fn encode<W: Write>(value: &Value, schema: &Schema, writer: &mut W) -> AvroResult<usize> {
    encode_internal(value, schema, &schema.names(), writer)
}

/// Encode a `Value` under `schema` into a fresh buffer.
pub fn encode_to_vec(value: &Value, schema: &Schema) -> AvroResult<Vec<u8>> {
    let mut buffer = Vec::new();
    encode(value, schema, &mut buffer)?;
    Ok(buffer)
}

pub(crate) fn encode_int<W: Write>(i: i32, writer: W) -> AvroResult<usize> {
    zig_i32(i, writer)
}

pub(crate) fn encode_long<W: Write>(i: i64, writer: W) -> AvroResult<usize> {
    zig_i64(i, writer)
}

pub(crate) fn encode_bytes<B: AsRef<[u8]> + ?Sized, W: Write>(
    payload: &B,
    mut writer: W,
) -> AvroResult<usize> {
    let bytes = payload.as_ref();
    let prefix = encode_long(bytes.len() as i64, &mut writer)?;
    writer.write_all(bytes).map_err(Error::WriteBytes)?;
    Ok(prefix + bytes.len())
}

fn write_raw<W: Write>(bytes: &[u8], writer: &mut W) -> AvroResult<usize> {
    writer.write_all(bytes).map_err(Error::WriteBytes)?;
    Ok(bytes.len())
}

fn wrong_schema(value: &Value, supported: &[SchemaKind], schema: &Schema) -> Error {
    error!(
        "cannot encode a value of kind {:?} with schema {schema:?}",
        ValueKind::from(value)
    );
    Error::EncodeValueAsSchemaError {
        value_kind: value.into(),
        supported_schema: supported.to_vec(),
    }
}

pub(crate) fn encode_internal<W: Write>(
    value: &Value,
    schema: &Schema,
    names: &Names,
    writer: &mut W,
) -> AvroResult<usize> {
    if let Schema::Ref { name } = schema {
        let resolved = names
            .get(name)
            .ok_or_else(|| Error::SchemaResolutionError(name.clone()))?;
        return encode_internal(value, &resolved.clone(), names, writer);
    }

    match value {
        Value::Null => match schema {
            Schema::Union(union) => match union.variant_of_kind(SchemaKind::Null) {
                Some(index) => encode_long(index as i64, writer),
                None => Err(wrong_schema(
                    value,
                    &[SchemaKind::Null, SchemaKind::Union],
                    schema,
                )),
            },
            _ => Ok(0),
        },
        Value::Boolean(b) => write_raw(&[u8::from(*b)], writer),
        // Identical wire format by construction.
        Value::Int(i) | Value::Date(i) | Value::TimeMillis(i) => encode_int(*i, writer),
        Value::Long(i)
        | Value::TimeMicros(i)
        | Value::TimestampMillis(i)
        | Value::TimestampMicros(i)
        | Value::LocalTimestampMillis(i)
        | Value::LocalTimestampMicros(i) => encode_long(*i, writer),
        Value::Float(x) => write_raw(&x.to_le_bytes(), writer),
        Value::Double(x) => write_raw(&x.to_le_bytes(), writer),
        Value::Uuid(uuid) => match schema {
            Schema::Uuid | Schema::String => {
                encode_bytes(uuid.as_hyphenated().to_string().as_str(), writer)
            }
            _ => Err(wrong_schema(
                value,
                &[SchemaKind::Uuid, SchemaKind::String],
                schema,
            )),
        },
        Value::Decimal(decimal) => match schema {
            Schema::Decimal(DecimalSchema { inner, .. }) => match inner.as_ref() {
                Schema::Bytes => encode_bytes(&decimal.to_vec()?, writer),
                Schema::Fixed(FixedSchema { size, .. }) => {
                    let bytes = decimal.to_sign_extended_bytes(*size).map_err(|_| {
                        Error::EncodeDecimalAsFixedError(decimal.len(), *size)
                    })?;
                    write_raw(&bytes, writer)
                }
                other => Err(Error::ResolveDecimalSchema(other.into())),
            },
            _ => Err(wrong_schema(value, &[SchemaKind::Decimal], schema)),
        },
        Value::Duration(duration) => {
            let bytes: [u8; 12] = (*duration).into();
            write_raw(&bytes, writer)
        }
        Value::Bytes(bytes) => match schema {
            Schema::Bytes => encode_bytes(bytes, writer),
            Schema::Decimal(DecimalSchema { inner, .. }) => match inner.as_ref() {
                Schema::Bytes => encode_bytes(bytes, writer),
                Schema::Fixed(_) => write_raw(bytes, writer),
                other => Err(Error::ResolveDecimalSchema(other.into())),
            },
            Schema::Fixed { .. } => write_raw(bytes, writer),
            _ => Err(wrong_schema(
                value,
                &[SchemaKind::Bytes, SchemaKind::Fixed],
                schema,
            )),
        },
        Value::String(s) => match schema {
            Schema::String | Schema::Uuid => encode_bytes(s, writer),
            Schema::Enum(EnumSchema { symbols, .. }) => {
                match symbols.iter().position(|symbol| symbol == s) {
                    Some(index) => encode_int(index as i32, writer),
                    None => {
                        error!("invalid symbol string {s:?}");
                        Err(Error::GetEnumSymbol(s.clone()))
                    }
                }
            }
            _ => Err(wrong_schema(
                value,
                &[SchemaKind::String, SchemaKind::Enum],
                schema,
            )),
        },
        Value::Fixed(_, bytes) => write_raw(bytes, writer),
        Value::Enum(index, _) => encode_int(*index as i32, writer),
        Value::Union(index, inner) => match schema {
            Schema::Union(UnionSchema { schemas, .. }) => {
                let variant = schemas.get(*index as usize).ok_or(Error::GetUnionVariant {
                    index: *index as i64,
                    num_variants: schemas.len(),
                })?;
                let mut written = encode_long(*index as i64, &mut *writer)?;
                written += encode_internal(inner, variant, names, writer)?;
                Ok(written)
            }
            _ => Err(wrong_schema(value, &[SchemaKind::Union], schema)),
        },
        Value::Array(items) => match schema {
            Schema::Array(inner) => {
                let mut written = 0;
                if !items.is_empty() {
                    written += encode_long(items.len() as i64, &mut *writer)?;
                    for item in items {
                        written += encode_internal(item, inner, names, writer)?;
                    }
                }
                written += write_raw(&[0u8], writer)?;
                Ok(written)
            }
            _ => Err(wrong_schema(value, &[SchemaKind::Array], schema)),
        },
        Value::Map(entries) => match schema {
            Schema::Map(inner) => {
                let mut written = 0;
                if !entries.is_empty() {
                    written += encode_long(entries.len() as i64, &mut *writer)?;
                    for (key, entry) in entries {
                        written += encode_bytes(key, &mut *writer)?;
                        written += encode_internal(entry, inner, names, writer)?;
                    }
                }
                written += write_raw(&[0u8], writer)?;
                Ok(written)
            }
            _ => Err(wrong_schema(value, &[SchemaKind::Map], schema)),
        },
        Value::Record(record_fields) => match schema {
            Schema::Record(RecordSchema { fields, .. }) => {
                let mut written = 0;
                for field in fields {
                    let entry = record_fields
                        .iter()
                        .find(|(name, _)| {
                            name == &field.name
                                || field
                                    .aliases
                                    .as_ref()
                                    .is_some_and(|aliases| aliases.contains(name))
                        })
                        .map(|(_, value)| value)
                        .ok_or_else(|| Error::GetField(field.name.clone()))?;
                    written += encode_internal(entry, &field.schema, names, writer)?;
                }
                Ok(written)
            }
            _ => Err(wrong_schema(
                value,
                &[SchemaKind::Record, SchemaKind::Union],
                schema,
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn encoded(value: &Value, schema: &Schema) -> Vec<u8> {
        encode_to_vec(value, schema).unwrap()
    }

    #[test]
    fn int_seed_vectors() {
        assert_eq!(encoded(&Value::Int(64), &Schema::Int), [0x80, 0x01]);
        assert_eq!(encoded(&Value::Int(-1), &Schema::Int), [0x01]);
    }

    #[test]
    fn string_seed_vector() {
        assert_eq!(
            encoded(&Value::String("foo".to_string()), &Schema::String),
            [0x06, 0x66, 0x6F, 0x6F]
        );
    }

    #[test]
    fn array_seed_vector() -> TestResult {
        let schema = Schema::parse_str(r#"{"type": "array", "items": "long"}"#)?;
        let value = Value::Array(vec![Value::Long(3), Value::Long(27)]);
        assert_eq!(encoded(&value, &schema), [0x04, 0x06, 0x36, 0x00]);
        Ok(())
    }

    #[test]
    fn union_seed_vectors() -> TestResult {
        let schema = Schema::parse_str(r#"["null", "string"]"#)?;
        assert_eq!(
            encoded(&Value::Union(0, Box::new(Value::Null)), &schema),
            [0x00]
        );
        assert_eq!(
            encoded(
                &Value::Union(1, Box::new(Value::String("a".to_string()))),
                &schema
            ),
            [0x02, 0x02, 0x61]
        );
        Ok(())
    }

    #[test]
    fn empty_containers_are_a_lone_terminator() -> TestResult {
        let array = Schema::parse_str(r#"{"type": "array", "items": "int"}"#)?;
        assert_eq!(encoded(&Value::Array(Vec::new()), &array), [0x00]);
        let map = Schema::parse_str(r#"{"type": "map", "values": "int"}"#)?;
        assert_eq!(encoded(&Value::Map(Default::default()), &map), [0x00]);
        Ok(())
    }

    #[test]
    fn record_fields_in_declaration_order() -> TestResult {
        let schema = Schema::parse_str(
            r#"{
                "type": "record", "name": "test",
                "fields": [
                    {"name": "a", "type": "long"},
                    {"name": "b", "type": "string"}
                ]
            }"#,
        )?;
        // Fields provided out of order still encode in schema order.
        let value = Value::Record(vec![
            ("b".to_string(), Value::String("foo".to_string())),
            ("a".to_string(), Value::Long(27)),
        ]);
        assert_eq!(encoded(&value, &schema), [0x36, 0x06, 0x66, 0x6F, 0x6F]);
        Ok(())
    }

    #[test]
    fn fixed_has_no_length_prefix() -> TestResult {
        let schema = Schema::parse_str(r#"{"type": "fixed", "name": "f", "size": 3}"#)?;
        let value = Value::Fixed(3, vec![1, 2, 3]);
        assert_eq!(encoded(&value, &schema), [1, 2, 3]);
        Ok(())
    }

    #[test]
    fn enum_encodes_its_index() -> TestResult {
        let schema = Schema::parse_str(
            r#"{"type": "enum", "name": "suit", "symbols": ["diamonds", "spades", "clubs"]}"#,
        )?;
        assert_eq!(
            encoded(&Value::Enum(2, "clubs".to_string()), &schema),
            [0x04]
        );
        assert_eq!(encoded(&Value::String("spades".to_string()), &schema), [0x02]);
        Ok(())
    }

    #[test]
    fn uuid_encodes_as_its_text_form() -> TestResult {
        let schema = Schema::parse_str(r#"{"type": "string", "logicalType": "uuid"}"#)?;
        let uuid = uuid::Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000")?;
        let bytes = encoded(&Value::Uuid(uuid), &schema);
        assert_eq!(bytes[0], 72); // zig-zag of 36
        assert_eq!(&bytes[1..], b"550e8400-e29b-41d4-a716-446655440000");
        Ok(())
    }

    #[test]
    fn decimal_fixed_is_sign_extended() -> TestResult {
        let schema = Schema::parse_str(
            r#"{
                "type": "fixed", "name": "money", "size": 4,
                "logicalType": "decimal", "precision": 9, "scale": 2
            }"#,
        )?;
        let value = Value::Decimal(crate::decimal::Decimal::from([0xFF_u8, 0x38]));
        assert_eq!(encoded(&value, &schema), [0xFF, 0xFF, 0xFF, 0x38]);
        Ok(())
    }
}
