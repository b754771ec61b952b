//! The Avro schema AST: construction, JSON parsing, canonical form and
//! fingerprinting.

mod name;
mod parser;

pub use name::{Alias, Aliases, Name, Namespace};

use crate::{AvroResult, error::Error};
use digest::Digest;
use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeSeq},
};
use serde_json::{Map, Value as JsonValue};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    str::FromStr,
};
use strum_macros::{Display, EnumDiscriminants, EnumString};

/// Documentation carried by complex schemas.
pub type Documentation = Option<String>;

/// Lookup table from fullname to definition for the named schemas reachable
/// from a root schema. `Schema::Ref` nodes resolve against this table.
pub type Names = HashMap<Name, Schema>;

/// Any valid Avro schema.
///
/// Logical types are dedicated variants wrapping their base encoding, and
/// recursive schemas refer back to an already-defined named schema through
/// [`Schema::Ref`].
#[derive(Clone, Debug, PartialEq, EnumDiscriminants, Display)]
#[strum_discriminants(name(SchemaKind), derive(Hash, Ord, PartialOrd))]
pub enum Schema {
    /// A `null` schema: encodes to zero bytes.
    Null,
    /// A `boolean` schema.
    Boolean,
    /// An `int` schema: 32-bit signed, zig-zag varint encoded.
    Int,
    /// A `long` schema: 64-bit signed, zig-zag varint encoded.
    Long,
    /// A `float` schema: IEEE-754 binary32, little endian.
    Float,
    /// A `double` schema: IEEE-754 binary64, little endian.
    Double,
    /// A `bytes` schema: length-prefixed byte sequence.
    Bytes,
    /// A `string` schema: length-prefixed UTF-8.
    String,
    /// An `array` schema; all items share one schema.
    Array(Box<Schema>),
    /// A `map` schema; keys are strings, all values share one schema.
    Map(Box<Schema>),
    /// A `union` schema.
    Union(UnionSchema),
    /// A `record` schema.
    Record(RecordSchema),
    /// An `enum` schema.
    Enum(EnumSchema),
    /// A `fixed` schema: exactly `size` raw bytes.
    Fixed(FixedSchema),
    /// The `decimal` logical type over `bytes` or `fixed`.
    Decimal(DecimalSchema),
    /// The `uuid` logical type over `string`.
    Uuid,
    /// The `date` logical type: days since the unix epoch, over `int`.
    Date,
    /// The `time-millis` logical type: milliseconds after midnight, over `int`.
    TimeMillis,
    /// The `time-micros` logical type: microseconds after midnight, over `long`.
    TimeMicros,
    /// The `timestamp-millis` logical type, over `long`.
    TimestampMillis,
    /// The `timestamp-micros` logical type, over `long`.
    TimestampMicros,
    /// The `local-timestamp-millis` logical type, over `long`.
    LocalTimestampMillis,
    /// The `local-timestamp-micros` logical type, over `long`.
    LocalTimestampMicros,
    /// The `duration` logical type: months, days and milliseconds as three
    /// little-endian unsigned 32-bit integers, over `fixed(12)`.
    Duration(FixedSchema),
    /// A back-reference to an already-defined named schema.
    Ref { name: Name },
}

/// A description of a record schema.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordSchema {
    /// The fullname of the record.
    pub name: Name,
    /// Aliases usable for schema resolution.
    pub aliases: Aliases,
    /// Optional documentation.
    pub doc: Documentation,
    /// The fields, in declaration order.
    pub fields: Vec<RecordField>,
    /// Field name to position in `fields`.
    pub lookup: BTreeMap<String, usize>,
}

/// One field of a record schema.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordField {
    /// The field name.
    pub name: String,
    /// Optional documentation.
    pub doc: Documentation,
    /// Aliases under which a writer field may match this field.
    pub aliases: Option<Vec<String>>,
    /// The default value as parsed JSON, materialized during resolution.
    pub default: Option<JsonValue>,
    /// The field schema.
    pub schema: Schema,
    /// Sort order, informational only.
    pub order: RecordFieldOrder,
    /// Position in the declaration order.
    pub position: usize,
}

/// The `order` attribute of a record field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RecordFieldOrder {
    Ascending,
    Descending,
    Ignore,
}

/// A description of an enum schema.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumSchema {
    /// The fullname of the enum.
    pub name: Name,
    /// Aliases usable for schema resolution.
    pub aliases: Aliases,
    /// Optional documentation.
    pub doc: Documentation,
    /// The symbols, in declaration order.
    pub symbols: Vec<String>,
    /// Fallback symbol used when resolving an unknown writer symbol.
    pub default: Option<String>,
}

/// A description of a fixed schema.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedSchema {
    /// The fullname of the fixed.
    pub name: Name,
    /// Aliases usable for schema resolution.
    pub aliases: Aliases,
    /// Optional documentation.
    pub doc: Documentation,
    /// The number of bytes of every value of this schema.
    pub size: usize,
}

/// A description of a decimal logical type.
#[derive(Clone, Debug, PartialEq)]
pub struct DecimalSchema {
    /// Number of digits in the unscaled value.
    pub precision: usize,
    /// Number of digits to the right of the decimal point.
    pub scale: usize,
    /// The base encoding, `bytes` or `fixed`.
    pub inner: Box<Schema>,
}

/// A description of a union schema.
#[derive(Clone, Debug)]
pub struct UnionSchema {
    pub(crate) schemas: Vec<Schema>,
    // Kind to position, for constant-time lookup of unnamed variants.
    variant_index: BTreeMap<SchemaKind, usize>,
}

impl UnionSchema {
    /// Build a union, enforcing the member constraints: no union directly
    /// inside a union, and no two members of the same kind unless both are
    /// named types (which are distinguished by fullname).
    pub fn new(schemas: Vec<Schema>) -> AvroResult<Self> {
        if schemas.is_empty() {
            return Err(Error::EmptyUnion);
        }
        let mut variant_index = BTreeMap::new();
        let mut seen_names = HashSet::new();
        for (i, schema) in schemas.iter().enumerate() {
            if matches!(schema, Schema::Union(_)) {
                return Err(Error::GetNestedUnion);
            }
            match schema.name() {
                Some(name) => {
                    if !seen_names.insert(name.fullname()) {
                        return Err(Error::GetUnionDuplicate);
                    }
                }
                None => {
                    if variant_index.insert(SchemaKind::from(schema), i).is_some() {
                        return Err(Error::GetUnionDuplicate);
                    }
                }
            }
        }
        Ok(Self {
            schemas,
            variant_index,
        })
    }

    /// All member schemas, in declaration order.
    pub fn variants(&self) -> &[Schema] {
        &self.schemas
    }

    /// Whether any member is `null`.
    pub fn is_nullable(&self) -> bool {
        self.schemas.iter().any(|s| matches!(s, Schema::Null))
    }

    pub(crate) fn variant_of_kind(&self, kind: SchemaKind) -> Option<usize> {
        self.variant_index.get(&kind).copied()
    }
}

// variant_index is derived from schemas.
impl PartialEq for UnionSchema {
    fn eq(&self, other: &Self) -> bool {
        self.schemas == other.schemas
    }
}

impl SchemaKind {
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            SchemaKind::Null
                | SchemaKind::Boolean
                | SchemaKind::Int
                | SchemaKind::Long
                | SchemaKind::Float
                | SchemaKind::Double
                | SchemaKind::Bytes
                | SchemaKind::String
        )
    }
}

/// A schema fingerprint, displayed as lowercase hex.
pub struct SchemaFingerprint {
    pub bytes: Vec<u8>,
}

impl fmt::Display for SchemaFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for byte in &self.bytes {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl Schema {
    /// Parse a `Schema` from JSON text.
    pub fn parse_str(input: &str) -> AvroResult<Schema> {
        let value: JsonValue = serde_json::from_str(input).map_err(Error::ParseSchemaJson)?;
        Self::parse(&value)
    }

    /// Parse a `Schema` from an already-parsed JSON value.
    pub fn parse(value: &JsonValue) -> AvroResult<Schema> {
        parser::Parser::default().parse(value, &None)
    }

    /// The name of this schema, if it is a named schema.
    pub fn name(&self) -> Option<&Name> {
        match self {
            Schema::Record(RecordSchema { name, .. })
            | Schema::Enum(EnumSchema { name, .. })
            | Schema::Fixed(FixedSchema { name, .. })
            | Schema::Duration(FixedSchema { name, .. })
            | Schema::Ref { name } => Some(name),
            _ => None,
        }
    }

    /// The aliases of this schema, if it is a named schema.
    pub fn aliases(&self) -> Option<&Vec<Alias>> {
        match self {
            Schema::Record(RecordSchema { aliases, .. })
            | Schema::Enum(EnumSchema { aliases, .. })
            | Schema::Fixed(FixedSchema { aliases, .. })
            | Schema::Duration(FixedSchema { aliases, .. }) => aliases.as_ref(),
            _ => None,
        }
    }

    /// Whether this is a named schema (or a reference to one).
    pub fn is_named(&self) -> bool {
        self.name().is_some()
    }

    /// Collect every named schema reachable from `self` into a lookup table.
    ///
    /// [`Schema::Ref`] nodes are resolved against this table while encoding
    /// and decoding.
    pub(crate) fn names(&self) -> Names {
        let mut names = Names::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, names: &mut Names) {
        match self {
            Schema::Record(record) => {
                names.insert(record.name.clone(), self.clone());
                for field in &record.fields {
                    field.schema.collect_names(names);
                }
            }
            Schema::Enum(EnumSchema { name, .. })
            | Schema::Fixed(FixedSchema { name, .. })
            | Schema::Duration(FixedSchema { name, .. }) => {
                names.insert(name.clone(), self.clone());
            }
            Schema::Array(items) => items.collect_names(names),
            Schema::Map(values) => values.collect_names(names),
            Schema::Union(union) => {
                for variant in union.variants() {
                    variant.collect_names(names);
                }
            }
            Schema::Decimal(DecimalSchema { inner, .. }) => inner.collect_names(names),
            _ => {}
        }
    }

    /// The [Parsing Canonical Form] of this schema.
    ///
    /// [Parsing Canonical Form]:
    /// https://avro.apache.org/docs/++version++/specification/#parsing-canonical-form-for-schemas
    pub fn canonical_form(&self) -> AvroResult<String> {
        let json = serde_json::to_value(self).map_err(Error::SerializeSchemaJson)?;
        let mut defined_names = HashSet::new();
        Ok(parsing_canonical_form(&json, &mut defined_names))
    }

    /// The fingerprint of the canonical form under the digest `D`.
    ///
    /// `D` can be [`crate::rabin::Rabin`] (CRC-64-AVRO), `md5::Md5` or
    /// `sha2::Sha256`.
    pub fn fingerprint<D: Digest>(&self) -> AvroResult<SchemaFingerprint> {
        let mut d = D::new();
        d.update(self.canonical_form()?);
        Ok(SchemaFingerprint {
            bytes: d.finalize().to_vec(),
        })
    }
}

impl FromStr for Schema {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Schema::parse_str(input)
    }
}

fn serialize_named_header<S>(
    map: &mut S::SerializeMap,
    typ: &str,
    name: &Name,
    aliases: &Aliases,
    doc: &Documentation,
) -> Result<(), S::Error>
where
    S: Serializer,
{
    map.serialize_entry("type", typ)?;
    map.serialize_entry("name", &name.name)?;
    if let Some(ref namespace) = name.namespace {
        map.serialize_entry("namespace", namespace)?;
    }
    if let Some(doc) = doc {
        map.serialize_entry("doc", doc)?;
    }
    if let Some(aliases) = aliases {
        map.serialize_entry("aliases", aliases)?;
    }
    Ok(())
}

impl Serialize for Schema {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        fn logical<S: Serializer>(
            serializer: S,
            base: &str,
            logical_type: &str,
        ) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(2))?;
            map.serialize_entry("type", base)?;
            map.serialize_entry("logicalType", logical_type)?;
            map.end()
        }

        match self {
            Schema::Null => serializer.serialize_str("null"),
            Schema::Boolean => serializer.serialize_str("boolean"),
            Schema::Int => serializer.serialize_str("int"),
            Schema::Long => serializer.serialize_str("long"),
            Schema::Float => serializer.serialize_str("float"),
            Schema::Double => serializer.serialize_str("double"),
            Schema::Bytes => serializer.serialize_str("bytes"),
            Schema::String => serializer.serialize_str("string"),
            Schema::Array(items) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "array")?;
                map.serialize_entry("items", items)?;
                map.end()
            }
            Schema::Map(values) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "map")?;
                map.serialize_entry("values", values)?;
                map.end()
            }
            Schema::Union(union) => {
                let mut seq = serializer.serialize_seq(Some(union.variants().len()))?;
                for variant in union.variants() {
                    seq.serialize_element(variant)?;
                }
                seq.end()
            }
            Schema::Record(RecordSchema {
                name,
                aliases,
                doc,
                fields,
                ..
            }) => {
                let mut map = serializer.serialize_map(None)?;
                serialize_named_header::<S>(&mut map, "record", name, aliases, doc)?;
                map.serialize_entry("fields", fields)?;
                map.end()
            }
            Schema::Enum(EnumSchema {
                name,
                aliases,
                doc,
                symbols,
                default,
            }) => {
                let mut map = serializer.serialize_map(None)?;
                serialize_named_header::<S>(&mut map, "enum", name, aliases, doc)?;
                map.serialize_entry("symbols", symbols)?;
                if let Some(default) = default {
                    map.serialize_entry("default", default)?;
                }
                map.end()
            }
            Schema::Fixed(FixedSchema {
                name,
                aliases,
                doc,
                size,
            }) => {
                let mut map = serializer.serialize_map(None)?;
                serialize_named_header::<S>(&mut map, "fixed", name, aliases, doc)?;
                map.serialize_entry("size", size)?;
                map.end()
            }
            Schema::Decimal(DecimalSchema {
                precision,
                scale,
                inner,
            }) => {
                let mut map = serializer.serialize_map(None)?;
                match inner.as_ref() {
                    Schema::Bytes => map.serialize_entry("type", "bytes")?,
                    Schema::Fixed(FixedSchema {
                        name,
                        aliases,
                        doc,
                        size,
                    }) => {
                        serialize_named_header::<S>(&mut map, "fixed", name, aliases, doc)?;
                        map.serialize_entry("size", size)?;
                    }
                    other => {
                        return Err(serde::ser::Error::custom(format!(
                            "decimal base must be bytes or fixed, got {other:?}"
                        )));
                    }
                }
                map.serialize_entry("logicalType", "decimal")?;
                map.serialize_entry("precision", precision)?;
                map.serialize_entry("scale", scale)?;
                map.end()
            }
            Schema::Uuid => logical(serializer, "string", "uuid"),
            Schema::Date => logical(serializer, "int", "date"),
            Schema::TimeMillis => logical(serializer, "int", "time-millis"),
            Schema::TimeMicros => logical(serializer, "long", "time-micros"),
            Schema::TimestampMillis => logical(serializer, "long", "timestamp-millis"),
            Schema::TimestampMicros => logical(serializer, "long", "timestamp-micros"),
            Schema::LocalTimestampMillis => {
                logical(serializer, "long", "local-timestamp-millis")
            }
            Schema::LocalTimestampMicros => {
                logical(serializer, "long", "local-timestamp-micros")
            }
            Schema::Duration(FixedSchema {
                name,
                aliases,
                doc,
                size,
            }) => {
                let mut map = serializer.serialize_map(None)?;
                serialize_named_header::<S>(&mut map, "fixed", name, aliases, doc)?;
                map.serialize_entry("size", size)?;
                map.serialize_entry("logicalType", "duration")?;
                map.end()
            }
            Schema::Ref { name } => serializer.serialize_str(&name.fullname()),
        }
    }
}

impl Serialize for RecordField {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("type", &self.schema)?;
        if let Some(ref doc) = self.doc {
            map.serialize_entry("doc", doc)?;
        }
        if let Some(ref default) = self.default {
            map.serialize_entry("default", default)?;
        }
        if self.order != RecordFieldOrder::Ascending {
            map.serialize_entry("order", &self.order.to_string())?;
        }
        if let Some(ref aliases) = self.aliases {
            map.serialize_entry("aliases", aliases)?;
        }
        map.end()
    }
}

// Attribute inclusion and ordering in the canonical form ([ORDER] rule).
const RESERVED_FIELDS: &[&str] = &[
    "name", "type", "fields", "symbols", "items", "values", "size",
];

fn field_ordering_position(field: &str) -> Option<usize> {
    RESERVED_FIELDS.iter().position(|&f| f == field)
}

/// Render an already-valid schema JSON value into the Parsing Canonical Form.
fn parsing_canonical_form(schema: &JsonValue, defined_names: &mut HashSet<String>) -> String {
    match schema {
        JsonValue::Object(map) => pcf_map(map, defined_names),
        JsonValue::String(s) => pcf_string(s),
        JsonValue::Array(v) => pcf_array(v, defined_names),
        json => unreachable!("not a valid schema JSON value: {json}"),
    }
}

fn pcf_map(schema: &Map<String, JsonValue>, defined_names: &mut HashSet<String>) -> String {
    let typ = schema.get("type").and_then(|v| v.as_str());
    // [FULLNAMES] rule: join namespace and name.
    let fullname = if matches!(typ, Some("record" | "enum" | "fixed")) {
        let namespace = schema.get("namespace").and_then(|v| v.as_str());
        let name = schema.get("name").and_then(|v| v.as_str()).unwrap_or("");
        Some(match namespace {
            Some(ns) => format!("{ns}.{name}"),
            None => name.to_string(),
        })
    } else {
        None
    };

    // A second occurrence of a defined name reduces to the name itself.
    if let Some(ref n) = fullname {
        if !defined_names.insert(n.clone()) {
            return pcf_string(n);
        }
    }

    // [STRIP] rule: drop non-normative attributes.
    let retained: Vec<(&String, &JsonValue)> = schema
        .iter()
        .filter(|(k, _)| field_ordering_position(k).is_some())
        .collect();

    // [PRIMITIVE] rule: an object reduced to a lone `type` string becomes the
    // bare string (this is how logical annotations disappear).
    if let [(k, JsonValue::String(s))] = retained.as_slice() {
        if *k == "type" {
            return pcf_string(s);
        }
    }

    let mut fields = Vec::new();
    for (k, v) in retained {
        let position = field_ordering_position(k).expect("only retained keys reach here");

        if k == "name" {
            if let Some(ref n) = fullname {
                fields.push((position, format!("{}:{}", pcf_string(k), pcf_string(n))));
                continue;
            }
        }

        // [INTEGERS] rule: sizes are numbers, never quoted strings.
        if k == "size" {
            let i = match v.as_str() {
                Some(s) => s.parse::<i64>().expect("only valid schemas reach pcf"),
                None => v.as_i64().expect("only valid schemas reach pcf"),
            };
            fields.push((position, format!("{}:{}", pcf_string(k), i)));
            continue;
        }

        fields.push((
            position,
            format!(
                "{}:{}",
                pcf_string(k),
                parsing_canonical_form(v, defined_names)
            ),
        ));
    }

    // [ORDER] rule.
    fields.sort_unstable_by_key(|(position, _)| *position);
    let inter = fields
        .into_iter()
        .map(|(_, v)| v)
        .collect::<Vec<_>>()
        .join(",");
    format!("{{{inter}}}")
}

fn pcf_array(arr: &[JsonValue], defined_names: &mut HashSet<String>) -> String {
    let inter = arr
        .iter()
        .map(|v| parsing_canonical_form(v, defined_names))
        .collect::<Vec<_>>()
        .join(",");
    format!("[{inter}]")
}

fn pcf_string(s: &str) -> String {
    format!("\"{s}\"")
}
