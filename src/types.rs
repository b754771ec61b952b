//! The generic value representation mirroring the schema variants.

use crate::{
    AvroResult,
    decimal::Decimal,
    duration::Duration,
    error::Error,
    schema::{
        DecimalSchema, EnumSchema, FixedSchema, Names, RecordSchema, Schema, SchemaKind,
        UnionSchema,
    },
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use strum_macros::EnumDiscriminants;
use uuid::Uuid;

/// A value of any Avro schema.
///
/// Logical values carry the semantic type next to the underlying
/// representation; union values carry the zero-based index of the member that
/// produced them.
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(ValueKind))]
pub enum Value {
    /// A `null` value.
    Null,
    /// A `boolean` value.
    Boolean(bool),
    /// An `int` value.
    Int(i32),
    /// A `long` value.
    Long(i64),
    /// A `float` value.
    Float(f32),
    /// A `double` value.
    Double(f64),
    /// A `bytes` value.
    Bytes(Vec<u8>),
    /// A `string` value.
    String(String),
    /// A `fixed` value: declared size and payload.
    Fixed(usize, Vec<u8>),
    /// An `enum` value: symbol index and symbol.
    Enum(u32, String),
    /// A `union` value: member index and payload.
    Union(u32, Box<Value>),
    /// An `array` of values.
    Array(Vec<Value>),
    /// A `map` of string keys to values.
    Map(HashMap<String, Value>),
    /// A `record`: field values in declaration order, with their names.
    Record(Vec<(String, Value)>),
    /// A `date` logical value: days since the unix epoch.
    Date(i32),
    /// A `time-millis` logical value.
    TimeMillis(i32),
    /// A `time-micros` logical value.
    TimeMicros(i64),
    /// A `timestamp-millis` logical value.
    TimestampMillis(i64),
    /// A `timestamp-micros` logical value.
    TimestampMicros(i64),
    /// A `local-timestamp-millis` logical value.
    LocalTimestampMillis(i64),
    /// A `local-timestamp-micros` logical value.
    LocalTimestampMicros(i64),
    /// A `uuid` logical value.
    Uuid(Uuid),
    /// A `decimal` logical value.
    Decimal(Decimal),
    /// A `duration` logical value.
    Duration(Duration),
}

macro_rules! from_value {
    ($type:ty, $variant:expr) => {
        impl From<$type> for Value {
            fn from(value: $type) -> Self {
                $variant(value)
            }
        }
    };
}

from_value!(bool, Value::Boolean);
from_value!(i32, Value::Int);
from_value!(i64, Value::Long);
from_value!(f32, Value::Float);
from_value!(f64, Value::Double);
from_value!(String, Value::String);
from_value!(Uuid, Value::Uuid);
from_value!(Decimal, Value::Decimal);
from_value!(Duration, Value::Duration);

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Value::Union(1, Box::new(v.into())),
            None => Value::Union(0, Box::new(Value::Null)),
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<HashMap<String, T>> for Value {
    fn from(values: HashMap<String, T>) -> Self {
        Value::Map(values.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

/// A record value under construction, keyed by a record schema.
///
/// ```
/// # use avro_core::{Schema, types::{Record, Value}};
/// let schema = Schema::parse_str(r#"{
///     "type": "record", "name": "point",
///     "fields": [{"name": "x", "type": "long"}, {"name": "y", "type": "long"}]
/// }"#).unwrap();
/// let mut record = Record::new(&schema).unwrap();
/// record.put("x", 3i64);
/// record.put("y", 4i64);
/// let value: Value = record.into();
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Record<'a> {
    /// Field values, pre-seeded with `Value::Null` in declaration order.
    pub fields: Vec<(String, Value)>,
    schema: &'a RecordSchema,
}

impl<'a> Record<'a> {
    /// Create a `Record` from a record schema; `None` for any other schema.
    pub fn new(schema: &'a Schema) -> Option<Self> {
        match schema {
            Schema::Record(record_schema) => {
                let fields = record_schema
                    .fields
                    .iter()
                    .map(|field| (field.name.clone(), Value::Null))
                    .collect();
                Some(Self {
                    fields,
                    schema: record_schema,
                })
            }
            _ => None,
        }
    }

    /// Set the value of a field; unknown field names are ignored.
    pub fn put<V: Into<Value>>(&mut self, field: &str, value: V) {
        if let Some(&position) = self.schema.lookup.get(field) {
            self.fields[position].1 = value.into();
        }
    }
}

impl From<Record<'_>> for Value {
    fn from(record: Record<'_>) -> Self {
        Value::Record(record.fields)
    }
}

impl Value {
    /// Whether this value can be encoded under `schema`.
    pub fn validate(&self, schema: &Schema) -> bool {
        self.validate_internal(schema, &schema.names()).is_none()
    }

    /// Validate against `schema`, returning the violated constraint.
    pub(crate) fn validate_internal(&self, schema: &Schema, names: &Names) -> Option<String> {
        match (self, schema) {
            (_, Schema::Ref { name }) => match names.get(name) {
                Some(resolved) => self.validate_internal(resolved, names),
                None => Some(format!("unresolved schema reference: {name}")),
            },
            (Value::Null, Schema::Null) => None,
            (Value::Boolean(_), Schema::Boolean) => None,
            (Value::Int(_), Schema::Int) => None,
            (Value::Int(_), Schema::Date | Schema::TimeMillis) => None,
            (Value::Long(_), Schema::Long) => None,
            (
                Value::Long(_),
                Schema::TimeMicros
                | Schema::TimestampMillis
                | Schema::TimestampMicros
                | Schema::LocalTimestampMillis
                | Schema::LocalTimestampMicros,
            ) => None,
            (Value::Date(_), Schema::Date) => None,
            (Value::TimeMillis(_), Schema::TimeMillis) => None,
            (Value::TimeMicros(_), Schema::TimeMicros) => None,
            (Value::TimestampMillis(_), Schema::TimestampMillis) => None,
            (Value::TimestampMicros(_), Schema::TimestampMicros) => None,
            (Value::LocalTimestampMillis(_), Schema::LocalTimestampMillis) => None,
            (Value::LocalTimestampMicros(_), Schema::LocalTimestampMicros) => None,
            (Value::Float(_), Schema::Float) => None,
            (Value::Double(_), Schema::Double) => None,
            (Value::Bytes(_), Schema::Bytes) => None,
            (Value::String(_), Schema::String) => None,
            (Value::String(s), Schema::Uuid) => match Uuid::parse_str(s) {
                Ok(_) => None,
                Err(e) => Some(format!("not a valid uuid: {e}")),
            },
            (Value::Uuid(_), Schema::Uuid) => None,
            (Value::Fixed(n, _), Schema::Fixed(FixedSchema { size, .. })) => {
                if n == size {
                    None
                } else {
                    Some(format!("fixed size mismatch: expected {size}, got {n}"))
                }
            }
            (Value::Bytes(b) | Value::Fixed(_, b), Schema::Decimal(DecimalSchema { inner, .. })) => {
                match inner.as_ref() {
                    Schema::Bytes => None,
                    Schema::Fixed(FixedSchema { size, .. }) if b.len() == *size => None,
                    Schema::Fixed(FixedSchema { size, .. }) => Some(format!(
                        "decimal payload of {} bytes does not fit fixed size {size}",
                        b.len()
                    )),
                    _ => Some("decimal base must be bytes or fixed".to_string()),
                }
            }
            (Value::Decimal(_), Schema::Decimal(_)) => None,
            (Value::Duration(_), Schema::Duration(_)) => None,
            (Value::Fixed(n, _), Schema::Duration(_)) => {
                if *n == 12 {
                    None
                } else {
                    Some(format!("a duration must be a fixed of size 12, got {n}"))
                }
            }
            (Value::Enum(i, symbol), Schema::Enum(EnumSchema { symbols, .. })) => {
                match symbols.get(*i as usize) {
                    Some(ref declared) if declared == &symbol => None,
                    Some(declared) => {
                        Some(format!("enum symbol mismatch at {i}: {declared} != {symbol}"))
                    }
                    None => Some(format!("enum index {i} out of bounds: {}", symbols.len())),
                }
            }
            (Value::String(s), Schema::Enum(EnumSchema { symbols, .. })) => {
                if symbols.contains(s) {
                    None
                } else {
                    Some(format!("{s} is not an enum symbol"))
                }
            }
            (Value::Union(index, inner), Schema::Union(union)) => {
                match union.variants().get(*index as usize) {
                    Some(variant) => inner.validate_internal(variant, names),
                    None => Some(format!(
                        "union index {index} out of bounds: {}",
                        union.variants().len()
                    )),
                }
            }
            (Value::Array(items), Schema::Array(inner)) => items
                .iter()
                .find_map(|item| item.validate_internal(inner, names)),
            (Value::Map(entries), Schema::Map(inner)) => entries
                .values()
                .find_map(|value| value.validate_internal(inner, names)),
            (Value::Record(record_fields), Schema::Record(RecordSchema { fields, lookup, .. })) => {
                for (name, _) in record_fields {
                    if !lookup.contains_key(name) {
                        return Some(format!("unknown field in record value: {name}"));
                    }
                }
                fields.iter().find_map(|field| {
                    let value = record_fields
                        .iter()
                        .find(|(name, _)| {
                            name == &field.name
                                || field
                                    .aliases
                                    .as_ref()
                                    .is_some_and(|aliases| aliases.contains(name))
                        })
                        .map(|(_, value)| value);
                    match value {
                        Some(value) => value.validate_internal(&field.schema, names),
                        None => Some(format!("missing field {} in record value", field.name)),
                    }
                })
            }
            (value, schema) => Some(format!(
                "a value of kind {:?} cannot be encoded as {:?}",
                ValueKind::from(value),
                SchemaKind::from(schema)
            )),
        }
    }

    /// Materialize a JSON default value against a reader field schema.
    ///
    /// For a union schema the default is interpreted against the first member,
    /// per the specification's default rules.
    pub(crate) fn from_json_default(json: &JsonValue, schema: &Schema, names: &Names) -> AvroResult<Value> {
        let mismatch = || Error::GetDefaultValue(json.clone());
        match schema {
            Schema::Ref { name } => {
                let resolved = names
                    .get(name)
                    .ok_or_else(|| Error::SchemaResolutionError(name.clone()))?;
                Value::from_json_default(json, &resolved.clone(), names)
            }
            Schema::Null => match json {
                JsonValue::Null => Ok(Value::Null),
                _ => Err(mismatch()),
            },
            Schema::Boolean => match json {
                JsonValue::Bool(b) => Ok(Value::Boolean(*b)),
                _ => Err(mismatch()),
            },
            Schema::Int => json
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(Value::Int)
                .ok_or_else(mismatch),
            Schema::Date => json
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(Value::Date)
                .ok_or_else(mismatch),
            Schema::TimeMillis => json
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(Value::TimeMillis)
                .ok_or_else(mismatch),
            Schema::Long => json.as_i64().map(Value::Long).ok_or_else(mismatch),
            Schema::TimeMicros => json.as_i64().map(Value::TimeMicros).ok_or_else(mismatch),
            Schema::TimestampMillis => {
                json.as_i64().map(Value::TimestampMillis).ok_or_else(mismatch)
            }
            Schema::TimestampMicros => {
                json.as_i64().map(Value::TimestampMicros).ok_or_else(mismatch)
            }
            Schema::LocalTimestampMillis => json
                .as_i64()
                .map(Value::LocalTimestampMillis)
                .ok_or_else(mismatch),
            Schema::LocalTimestampMicros => json
                .as_i64()
                .map(Value::LocalTimestampMicros)
                .ok_or_else(mismatch),
            Schema::Float => json
                .as_f64()
                .map(|x| Value::Float(x as f32))
                .ok_or_else(mismatch),
            Schema::Double => json.as_f64().map(Value::Double).ok_or_else(mismatch),
            // JSON defaults for bytes and fixed map each code point to a byte.
            Schema::Bytes => match json {
                JsonValue::String(s) => Ok(Value::Bytes(string_to_bytes(s))),
                _ => Err(mismatch()),
            },
            Schema::Fixed(FixedSchema { size, .. }) => match json {
                JsonValue::String(s) => {
                    let bytes = string_to_bytes(s);
                    if bytes.len() == *size {
                        Ok(Value::Fixed(*size, bytes))
                    } else {
                        Err(mismatch())
                    }
                }
                _ => Err(mismatch()),
            },
            Schema::String | Schema::Uuid => match json {
                JsonValue::String(s) => Ok(Value::String(s.clone())),
                _ => Err(mismatch()),
            },
            Schema::Enum(EnumSchema { symbols, .. }) => match json {
                JsonValue::String(s) => symbols
                    .iter()
                    .position(|symbol| symbol == s)
                    .map(|i| Value::Enum(i as u32, s.clone()))
                    .ok_or_else(mismatch),
                _ => Err(mismatch()),
            },
            Schema::Array(inner) => match json {
                JsonValue::Array(items) => items
                    .iter()
                    .map(|item| Value::from_json_default(item, inner, names))
                    .collect::<AvroResult<Vec<_>>>()
                    .map(Value::Array),
                _ => Err(mismatch()),
            },
            Schema::Map(inner) => match json {
                JsonValue::Object(entries) => entries
                    .iter()
                    .map(|(key, value)| {
                        Value::from_json_default(value, inner, names)
                            .map(|value| (key.clone(), value))
                    })
                    .collect::<AvroResult<HashMap<_, _>>>()
                    .map(Value::Map),
                _ => Err(mismatch()),
            },
            Schema::Record(RecordSchema { fields, .. }) => match json {
                JsonValue::Object(entries) => fields
                    .iter()
                    .map(|field| {
                        let value = match entries.get(&field.name) {
                            Some(value) => {
                                Value::from_json_default(value, &field.schema, names)?
                            }
                            None => match &field.default {
                                Some(default) => {
                                    Value::from_json_default(default, &field.schema, names)?
                                }
                                None => return Err(mismatch()),
                            },
                        };
                        Ok((field.name.clone(), value))
                    })
                    .collect::<AvroResult<Vec<_>>>()
                    .map(Value::Record),
                _ => Err(mismatch()),
            },
            Schema::Union(UnionSchema { schemas, .. }) => {
                let first = schemas.first().ok_or(Error::EmptyUnion)?;
                Value::from_json_default(json, first, names)
                    .map(|value| Value::Union(0, Box::new(value)))
            }
            Schema::Decimal(DecimalSchema { inner, .. }) => match json {
                JsonValue::String(s) => {
                    let bytes = string_to_bytes(s);
                    match inner.as_ref() {
                        Schema::Fixed(FixedSchema { size, .. }) if bytes.len() != *size => {
                            Err(mismatch())
                        }
                        _ => Ok(Value::Decimal(Decimal::from(bytes))),
                    }
                }
                _ => Err(mismatch()),
            },
            Schema::Duration(_) => match json {
                JsonValue::String(s) => {
                    let bytes = string_to_bytes(s);
                    let bytes: [u8; 12] = bytes.try_into().map_err(|_| mismatch())?;
                    Ok(Value::Duration(Duration::from(bytes)))
                }
                _ => Err(mismatch()),
            },
        }
    }
}

// JSON string defaults for binary schemas encode one byte per code point.
fn string_to_bytes(s: &str) -> Vec<u8> {
    s.chars().map(|c| c as u8).collect()
}
