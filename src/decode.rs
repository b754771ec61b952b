//! Binary decoding into [`Value`]s.

use crate::{
    AvroResult,
    decimal::Decimal,
    duration::Duration,
    error::Error,
    schema::{
        DecimalSchema, EnumSchema, FixedSchema, Names, RecordSchema, Schema, UnionSchema,
    },
    types::Value,
    util::{safe_len, zag_i32, zag_i64},
};
use std::{collections::HashMap, io::Read, str::FromStr};
use uuid::Uuid;

/// Decode one `Value` of `schema` from `reader`.
pub fn decode<R: Read>(schema: &Schema, reader: &mut R) -> AvroResult<Value> {
    decode_internal(schema, &schema.names(), reader)
}

/// Read a length prefix: a long that must be non-negative and within the
/// configured allocation bound.
pub(crate) fn decode_len<R: Read>(reader: &mut R) -> AvroResult<usize> {
    let len = zag_i64(reader)?;
    if len < 0 {
        return Err(Error::NegativeLength(len));
    }
    safe_len(usize::try_from(len).map_err(|e| Error::ConvertI64ToUsize(e, len))?)
}

/// Read the item count of one array/map block. A negative count is followed
/// by the block's byte size, which is read and discarded.
pub(crate) fn decode_block_count<R: Read>(reader: &mut R) -> AvroResult<usize> {
    let count = zag_i64(reader)?;
    let count = if count < 0 {
        let _size = decode_len(reader)?;
        count.checked_neg().ok_or(Error::NegativeLength(count))?
    } else {
        count
    };
    safe_len(usize::try_from(count).map_err(|e| Error::ConvertI64ToUsize(e, count))?)
}

fn decode_raw_bytes<R: Read>(len: usize, reader: &mut R) -> AvroResult<Vec<u8>> {
    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .map_err(Error::ReadBytes)?;
    Ok(payload)
}

fn decode_string<R: Read>(reader: &mut R) -> AvroResult<String> {
    let len = decode_len(reader)?;
    let payload = decode_raw_bytes(len, reader)?;
    String::from_utf8(payload).map_err(Error::ConvertToUtf8)
}

pub(crate) fn decode_internal<R: Read>(
    schema: &Schema,
    names: &Names,
    reader: &mut R,
) -> AvroResult<Value> {
    match schema {
        Schema::Ref { name } => {
            let resolved = names
                .get(name)
                .ok_or_else(|| Error::SchemaResolutionError(name.clone()))?;
            decode_internal(&resolved.clone(), names, reader)
        }
        Schema::Null => Ok(Value::Null),
        Schema::Boolean => {
            let mut byte = [0u8; 1];
            reader
                .read_exact(&mut byte[..])
                .map_err(Error::ReadBoolean)?;
            match byte[0] {
                0u8 => Ok(Value::Boolean(false)),
                1u8 => Ok(Value::Boolean(true)),
                other => Err(Error::BoolValue(other)),
            }
        }
        Schema::Int => zag_i32(reader).map(Value::Int),
        Schema::Long => zag_i64(reader).map(Value::Long),
        Schema::Float => {
            let mut buf = [0u8; 4];
            reader.read_exact(&mut buf[..]).map_err(Error::ReadFloat)?;
            Ok(Value::Float(f32::from_le_bytes(buf)))
        }
        Schema::Double => {
            let mut buf = [0u8; 8];
            reader
                .read_exact(&mut buf[..])
                .map_err(Error::ReadDouble)?;
            Ok(Value::Double(f64::from_le_bytes(buf)))
        }
        Schema::Bytes => {
            let len = decode_len(reader)?;
            decode_raw_bytes(len, reader).map(Value::Bytes)
        }
        Schema::String => decode_string(reader).map(Value::String),
        Schema::Fixed(FixedSchema { size, .. }) => {
            let mut payload = vec![0u8; *size];
            reader
                .read_exact(&mut payload)
                .map_err(|e| Error::ReadFixed(e, *size))?;
            Ok(Value::Fixed(*size, payload))
        }
        Schema::Array(inner) => {
            let mut items = Vec::new();
            loop {
                let count = decode_block_count(reader)?;
                if count == 0 {
                    break;
                }
                items.reserve(count);
                for _ in 0..count {
                    items.push(decode_internal(inner, names, reader)?);
                }
            }
            Ok(Value::Array(items))
        }
        Schema::Map(inner) => {
            let mut entries = HashMap::new();
            loop {
                let count = decode_block_count(reader)?;
                if count == 0 {
                    break;
                }
                entries.reserve(count);
                for _ in 0..count {
                    let key = decode_string(reader)?;
                    let value = decode_internal(inner, names, reader)?;
                    entries.insert(key, value);
                }
            }
            Ok(Value::Map(entries))
        }
        Schema::Union(UnionSchema { schemas, .. }) => {
            let index = zag_i64(reader)?;
            let variant = usize::try_from(index)
                .ok()
                .and_then(|i| schemas.get(i))
                .ok_or(Error::GetUnionVariant {
                    index,
                    num_variants: schemas.len(),
                })?;
            let value = decode_internal(variant, names, reader)?;
            Ok(Value::Union(index as u32, Box::new(value)))
        }
        Schema::Record(RecordSchema { fields, .. }) => {
            let mut record_fields = Vec::with_capacity(fields.len());
            for field in fields {
                let value = decode_internal(&field.schema, names, reader)?;
                record_fields.push((field.name.clone(), value));
            }
            Ok(Value::Record(record_fields))
        }
        Schema::Enum(EnumSchema { symbols, .. }) => {
            let index = zag_i32(reader)?;
            let symbol = usize::try_from(index)
                .ok()
                .and_then(|i| symbols.get(i))
                .ok_or(Error::GetEnumValue {
                    index: index.max(0) as usize,
                    nsymbols: symbols.len(),
                })?;
            Ok(Value::Enum(index as u32, symbol.clone()))
        }
        Schema::Decimal(DecimalSchema { inner, .. }) => {
            let payload = match inner.as_ref() {
                Schema::Bytes => {
                    let len = decode_len(reader)?;
                    decode_raw_bytes(len, reader)?
                }
                Schema::Fixed(FixedSchema { size, .. }) => {
                    let mut payload = vec![0u8; *size];
                    reader
                        .read_exact(&mut payload)
                        .map_err(|e| Error::ReadFixed(e, *size))?;
                    payload
                }
                other => return Err(Error::ResolveDecimalSchema(other.into())),
            };
            Ok(Value::Decimal(Decimal::from(payload)))
        }
        Schema::Uuid => {
            let text = decode_string(reader)?;
            Uuid::from_str(&text)
                .map(Value::Uuid)
                .map_err(Error::ConvertStrToUuid)
        }
        Schema::Date => zag_i32(reader).map(Value::Date),
        Schema::TimeMillis => zag_i32(reader).map(Value::TimeMillis),
        Schema::TimeMicros => zag_i64(reader).map(Value::TimeMicros),
        Schema::TimestampMillis => zag_i64(reader).map(Value::TimestampMillis),
        Schema::TimestampMicros => zag_i64(reader).map(Value::TimestampMicros),
        Schema::LocalTimestampMillis => zag_i64(reader).map(Value::LocalTimestampMillis),
        Schema::LocalTimestampMicros => zag_i64(reader).map(Value::LocalTimestampMicros),
        Schema::Duration(_) => {
            let mut buf = [0u8; 12];
            reader
                .read_exact(&mut buf)
                .map_err(|e| Error::ReadFixed(e, 12))?;
            Ok(Value::Duration(Duration::from(buf)))
        }
    }
}
