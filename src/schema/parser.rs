//! JSON text to [`Schema`] conversion.

use crate::{
    AvroResult,
    error::Error,
    schema::{
        Alias, DecimalSchema, EnumSchema, FixedSchema, Name, Namespace, RecordField,
        RecordFieldOrder, RecordSchema, Schema, UnionSchema,
        name::validate_name_part,
    },
    util::MapHelper,
};
use log::warn;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::Names;

/// Parsing state: the named schemas defined so far, so that later mentions of
/// a fullname become [`Schema::Ref`] back-references.
#[derive(Default)]
pub(crate) struct Parser {
    parsed_names: Names,
}

impl Parser {
    pub(crate) fn parse(
        &mut self,
        value: &JsonValue,
        enclosing: &Namespace,
    ) -> AvroResult<Schema> {
        match value {
            JsonValue::String(t) => self.parse_type_name(t, enclosing),
            JsonValue::Object(map) => self.parse_complex(map, enclosing),
            JsonValue::Array(variants) => self.parse_union(variants, enclosing),
            _ => Err(Error::ParseSchemaFromValidJson),
        }
    }

    fn parse_type_name(&mut self, name: &str, enclosing: &Namespace) -> AvroResult<Schema> {
        if let Some(primitive) = primitive_schema(name) {
            return Ok(primitive);
        }

        // A reference to an already-defined named schema, resolved against the
        // enclosing namespace first and the null namespace as a fallback.
        let qualified = Name::with_enclosing_namespace(name, enclosing)?;
        if self.parsed_names.contains_key(&qualified) {
            return Ok(Schema::Ref { name: qualified });
        }
        let bare = Name::new(name)?;
        if self.parsed_names.contains_key(&bare) {
            return Ok(Schema::Ref { name: bare });
        }
        Err(Error::ParsePrimitive(name.to_string()))
    }

    fn parse_complex(
        &mut self,
        map: &Map<String, JsonValue>,
        enclosing: &Namespace,
    ) -> AvroResult<Schema> {
        let base = self.parse_complex_base(map, enclosing)?;
        match map.get("logicalType").and_then(|lt| lt.as_str()) {
            Some(logical_type) => self.annotate_logical(logical_type, base, map),
            None => Ok(base),
        }
    }

    /// Parse the base shape of a complex type, ignoring any `logicalType`.
    fn parse_complex_base(
        &mut self,
        map: &Map<String, JsonValue>,
        enclosing: &Namespace,
    ) -> AvroResult<Schema> {
        match map.get("type") {
            Some(JsonValue::String(t)) => match t.as_str() {
                "record" => self.parse_record(map, enclosing),
                "enum" => self.parse_enum(map, enclosing),
                "fixed" => self.parse_fixed(map, enclosing),
                "array" => self.parse_array(map, enclosing),
                "map" => self.parse_map(map, enclosing),
                other => self.parse_type_name(other, enclosing),
            },
            Some(nested @ (JsonValue::Object(_) | JsonValue::Array(_))) => {
                self.parse(nested, enclosing)
            }
            Some(other) => Err(Error::GetComplexType(other.clone())),
            None => Err(Error::GetComplexTypeField),
        }
    }

    /// Wrap `base` in the named logical type, falling back to the bare base
    /// schema when the annotation does not apply.
    ///
    /// Unknown logical types never fail: the annotation is ignored.
    fn annotate_logical(
        &mut self,
        logical_type: &str,
        base: Schema,
        map: &Map<String, JsonValue>,
    ) -> AvroResult<Schema> {
        fn expecting(logical_type: &str, base: Schema, expected: &str) -> Schema {
            warn!(
                "Ignoring logicalType {logical_type}: it requires a base type of {expected}, \
                 found {base:?}"
            );
            base
        }

        match logical_type {
            "decimal" => {
                if !matches!(base, Schema::Bytes | Schema::Fixed(_)) {
                    return Err(Error::ResolveDecimalSchema((&base).into()));
                }
                let precision = decimal_metadata(map, "precision")?
                    .ok_or(Error::GetDecimalMetadataFromJson("precision"))?;
                let scale = decimal_metadata(map, "scale")?.unwrap_or(0);
                if precision == 0 {
                    return Err(Error::DecimalPrecisionPositive { precision });
                }
                if precision < scale {
                    return Err(Error::DecimalPrecisionLessThanScale { precision, scale });
                }
                if let Schema::Fixed(FixedSchema { size, .. }) = base {
                    if precision > max_precision_for_fixed(size) {
                        return Err(Error::DecimalPrecisionOverFixedSize { size, precision });
                    }
                }
                Ok(Schema::Decimal(DecimalSchema {
                    precision,
                    scale,
                    inner: Box::new(base),
                }))
            }
            "uuid" => match base {
                Schema::String => Ok(Schema::Uuid),
                other => Ok(expecting(logical_type, other, "string")),
            },
            "date" => match base {
                Schema::Int => Ok(Schema::Date),
                other => Ok(expecting(logical_type, other, "int")),
            },
            "time-millis" => match base {
                Schema::Int => Ok(Schema::TimeMillis),
                other => Ok(expecting(logical_type, other, "int")),
            },
            "time-micros" => match base {
                Schema::Long => Ok(Schema::TimeMicros),
                other => Ok(expecting(logical_type, other, "long")),
            },
            "timestamp-millis" => match base {
                Schema::Long => Ok(Schema::TimestampMillis),
                other => Ok(expecting(logical_type, other, "long")),
            },
            "timestamp-micros" => match base {
                Schema::Long => Ok(Schema::TimestampMicros),
                other => Ok(expecting(logical_type, other, "long")),
            },
            "local-timestamp-millis" => match base {
                Schema::Long => Ok(Schema::LocalTimestampMillis),
                other => Ok(expecting(logical_type, other, "long")),
            },
            "local-timestamp-micros" => match base {
                Schema::Long => Ok(Schema::LocalTimestampMicros),
                other => Ok(expecting(logical_type, other, "long")),
            },
            "duration" => match base {
                Schema::Fixed(fixed) if fixed.size == 12 => {
                    let duration = Schema::Duration(fixed);
                    // refs must resolve to the annotated schema
                    if let Some(name) = duration.name() {
                        self.parsed_names.insert(name.clone(), duration.clone());
                    }
                    Ok(duration)
                }
                other => Ok(expecting(logical_type, other, "a fixed of size 12")),
            },
            unknown => {
                warn!("Ignoring unknown logicalType: {unknown}");
                Ok(base)
            }
        }
    }

    fn parse_record(
        &mut self,
        map: &Map<String, JsonValue>,
        enclosing: &Namespace,
    ) -> AvroResult<Schema> {
        let name = Name::parse(map, enclosing)?;
        self.check_collision(&name)?;
        let aliases = parse_aliases(map, &name.namespace)?;

        // Fields may refer back to the record itself.
        self.parsed_names
            .insert(name.clone(), Schema::Ref { name: name.clone() });

        let field_values = map
            .get("fields")
            .and_then(|fields| fields.as_array())
            .ok_or(Error::GetRecordFieldsJson)?;

        let mut fields = Vec::with_capacity(field_values.len());
        let mut lookup = BTreeMap::new();
        for (position, field_value) in field_values.iter().enumerate() {
            let field = self.parse_field(field_value, &name.namespace, position)?;
            if lookup.insert(field.name.clone(), position).is_some() {
                return Err(Error::FieldNameDuplicate(field.name));
            }
            fields.push(field);
        }

        let record = Schema::Record(RecordSchema {
            name: name.clone(),
            aliases,
            doc: map.doc(),
            fields,
            lookup,
        });
        self.parsed_names.insert(name, record.clone());
        Ok(record)
    }

    fn parse_field(
        &mut self,
        value: &JsonValue,
        record_namespace: &Namespace,
        position: usize,
    ) -> AvroResult<RecordField> {
        let JsonValue::Object(map) = value else {
            return Err(Error::GetRecordFieldsJson);
        };
        let name = map.name().ok_or(Error::GetNameField)?;
        validate_name_part(&name).map_err(|_| Error::FieldName(name.clone()))?;

        let schema = self.parse(
            map.get("type").ok_or(Error::GetComplexTypeField)?,
            record_namespace,
        )?;

        let order = map
            .string("order")
            .and_then(|order| RecordFieldOrder::from_str(&order).ok())
            .unwrap_or(RecordFieldOrder::Ascending);

        Ok(RecordField {
            name,
            doc: map.doc(),
            aliases: map.aliases(),
            default: map.get("default").cloned(),
            schema,
            order,
            position,
        })
    }

    fn parse_enum(
        &mut self,
        map: &Map<String, JsonValue>,
        enclosing: &Namespace,
    ) -> AvroResult<Schema> {
        let name = Name::parse(map, enclosing)?;
        self.check_collision(&name)?;
        let aliases = parse_aliases(map, &name.namespace)?;

        let symbol_values = map
            .get("symbols")
            .and_then(|symbols| symbols.as_array())
            .ok_or(Error::GetEnumSymbolsField)?;
        let mut symbols = Vec::with_capacity(symbol_values.len());
        for symbol_value in symbol_values {
            let symbol = symbol_value
                .as_str()
                .ok_or(Error::GetEnumSymbolsField)?
                .to_string();
            validate_name_part(&symbol).map_err(|_| Error::EnumSymbolName(symbol.clone()))?;
            if symbols.contains(&symbol) {
                return Err(Error::EnumSymbolDuplicate(symbol));
            }
            symbols.push(symbol);
        }

        let default = match map.get("default") {
            Some(JsonValue::String(symbol)) => {
                if !symbols.contains(symbol) {
                    return Err(Error::GetEnumDefault {
                        symbol: symbol.clone(),
                        symbols,
                    });
                }
                Some(symbol.clone())
            }
            Some(other) => return Err(Error::EnumDefaultWrongType(other.clone())),
            None => None,
        };

        let schema = Schema::Enum(EnumSchema {
            name: name.clone(),
            aliases,
            doc: map.doc(),
            symbols,
            default,
        });
        self.parsed_names.insert(name, schema.clone());
        Ok(schema)
    }

    fn parse_fixed(
        &mut self,
        map: &Map<String, JsonValue>,
        enclosing: &Namespace,
    ) -> AvroResult<Schema> {
        let name = Name::parse(map, enclosing)?;
        self.check_collision(&name)?;
        let aliases = parse_aliases(map, &name.namespace)?;

        let size_value = map.get("size").ok_or(Error::GetFixedSizeField)?;
        let size = size_value
            .as_u64()
            .filter(|s| *s > 0)
            .and_then(|s| usize::try_from(s).ok())
            .ok_or_else(|| Error::GetFixedSizeFieldPositive(size_value.clone()))?;

        let schema = Schema::Fixed(FixedSchema {
            name: name.clone(),
            aliases,
            doc: map.doc(),
            size,
        });
        self.parsed_names.insert(name, schema.clone());
        Ok(schema)
    }

    fn parse_array(
        &mut self,
        map: &Map<String, JsonValue>,
        enclosing: &Namespace,
    ) -> AvroResult<Schema> {
        map.get("items")
            .ok_or(Error::GetArrayItemsField)
            .and_then(|items| self.parse(items, enclosing))
            .map(|items| Schema::Array(Box::new(items)))
    }

    fn parse_map(
        &mut self,
        map: &Map<String, JsonValue>,
        enclosing: &Namespace,
    ) -> AvroResult<Schema> {
        map.get("values")
            .ok_or(Error::GetMapValuesField)
            .and_then(|values| self.parse(values, enclosing))
            .map(|values| Schema::Map(Box::new(values)))
    }

    fn parse_union(
        &mut self,
        variants: &[JsonValue],
        enclosing: &Namespace,
    ) -> AvroResult<Schema> {
        let schemas = variants
            .iter()
            .map(|variant| self.parse(variant, enclosing))
            .collect::<AvroResult<Vec<_>>>()?;
        UnionSchema::new(schemas).map(Schema::Union)
    }

    fn check_collision(&self, name: &Name) -> AvroResult<()> {
        if self.parsed_names.contains_key(name) {
            Err(Error::NameCollision(name.fullname()))
        } else {
            Ok(())
        }
    }
}

fn primitive_schema(name: &str) -> Option<Schema> {
    match name {
        "null" => Some(Schema::Null),
        "boolean" => Some(Schema::Boolean),
        "int" => Some(Schema::Int),
        "long" => Some(Schema::Long),
        "float" => Some(Schema::Float),
        "double" => Some(Schema::Double),
        "bytes" => Some(Schema::Bytes),
        "string" => Some(Schema::String),
        _ => None,
    }
}

fn parse_aliases(
    map: &Map<String, JsonValue>,
    enclosing: &Namespace,
) -> AvroResult<Option<Vec<Alias>>> {
    match map.aliases() {
        Some(aliases) => aliases
            .iter()
            .map(|alias| Alias::with_enclosing_namespace(alias, enclosing))
            .collect::<AvroResult<Vec<_>>>()
            .map(Some),
        None => Ok(None),
    }
}

fn decimal_metadata(
    map: &Map<String, JsonValue>,
    key: &'static str,
) -> AvroResult<Option<usize>> {
    match map.get(key) {
        Some(JsonValue::Number(num)) => num
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| Error::GetPrecisionOrScaleFromJson(map[key].clone())),
        Some(other) => Err(Error::GetPrecisionOrScaleFromJson(other.clone())),
        None => Ok(None),
    }
}

/// The largest decimal precision a two's-complement fixed of `size` bytes can
/// hold: `floor(log10(2 ^ (8 * size - 1) - 1))`.
fn max_precision_for_fixed(size: usize) -> usize {
    (((8 * size - 1) as f64) * 2f64.log10()).floor() as usize
}
