//! The error type shared by every fallible operation in the crate.

use crate::{
    schema::{Name, Schema, SchemaKind},
    types::{Value, ValueKind},
};

/// Errors reported while parsing schemas, encoding or decoding values, or
/// reading and writing object container files.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    // ---- byte-level reads and writes -------------------------------------
    #[error("Failed to read a variable-length integer: {0}")]
    ReadVariableIntegerBytes(#[source] std::io::Error),

    #[error("Failed to read the boolean byte: {0}")]
    ReadBoolean(#[source] std::io::Error),

    #[error("Failed to read bytes: {0}")]
    ReadBytes(#[source] std::io::Error),

    #[error("Failed to read a float: {0}")]
    ReadFloat(#[source] std::io::Error),

    #[error("Failed to read a double: {0}")]
    ReadDouble(#[source] std::io::Error),

    #[error("Failed to read {1} bytes of fixed data: {0}")]
    ReadFixed(#[source] std::io::Error, usize),

    #[error("Failed to write bytes: {0}")]
    WriteBytes(#[source] std::io::Error),

    #[error("Failed to flush the underlying writer: {0}")]
    FlushWriter(#[source] std::io::Error),

    // ---- malformed data ---------------------------------------------------
    #[error("Invalid byte for boolean: {0}")]
    BoolValue(u8),

    #[error("Variable-length integer is longer than 10 bytes")]
    VarintTooLong,

    #[error("Decoded long {1} does not fit in an int: {0}")]
    ZagI32(#[source] std::num::TryFromIntError, i64),

    #[error("Negative length {0} for bytes or string")]
    NegativeLength(i64),

    #[error("Invalid UTF-8 payload for string")]
    ConvertToUtf8(#[source] std::string::FromUtf8Error),

    #[error("Invalid UTF-8 payload for string")]
    ConvertToUtf8Error(#[source] std::str::Utf8Error),

    #[error("Union index {index} out of bounds: {num_variants}")]
    GetUnionVariant { index: i64, num_variants: usize },

    #[error("Enum index {index} out of bounds: {nsymbols}")]
    GetEnumValue { index: usize, nsymbols: usize },

    #[error("Unable to allocate {desired} bytes (maximum allowed: {maximum})")]
    MemoryAllocation { desired: usize, maximum: usize },

    #[error("Cannot convert length {1} to usize: {0}")]
    ConvertI64ToUsize(#[source] std::num::TryFromIntError, i64),

    #[error("Failed to parse a uuid from a string: {0}")]
    ConvertStrToUuid(#[source] uuid::Error),

    #[error("Fixed size mismatch, expected: {size}, got: {n}")]
    CompareFixedSizes { size: usize, n: usize },

    #[error(
        "Requested {requested} bytes for decimal sign extension, but {needed} bytes are needed"
    )]
    SignExtend { requested: usize, needed: usize },

    // ---- write-time validation ---------------------------------------------
    #[error("Value {value:?} does not match schema {schema:?}: {reason}")]
    Validation {
        value: Box<Value>,
        schema: Box<Schema>,
        reason: String,
    },

    #[error("Cannot encode value of kind {value_kind:?} with a schema of kind {supported_schema:?}")]
    EncodeValueAsSchemaError {
        value_kind: ValueKind,
        supported_schema: Vec<SchemaKind>,
    },

    #[error("Enum symbol not found: {0}")]
    GetEnumSymbol(String),

    #[error("Missing field in record: {0}")]
    GetField(String),

    #[error("Decimal does not fit in a fixed of size {1}: needs {0} bytes")]
    EncodeDecimalAsFixedError(usize, usize),

    // ---- schema resolution --------------------------------------------------
    #[error("Cannot resolve data written with schema {writer:?} against reader schema {reader:?}")]
    SchemaIncompatible {
        writer: Box<Schema>,
        reader: Box<Schema>,
    },

    #[error("Reader field {0} has no writer counterpart and no default value")]
    ResolveRecordField(String),

    #[error("Writer enum symbol {0} is not a reader symbol and the reader declares no default")]
    ResolveEnumSymbol(String),

    #[error("Schema reference {0} cannot be resolved")]
    SchemaResolutionError(Name),

    #[error("JSON default value {0} does not match field schema")]
    GetDefaultValue(serde_json::Value),

    // ---- object container files ---------------------------------------------
    #[error("Failed to read the container file header: {0}")]
    ReadHeader(#[source] std::io::Error),

    #[error("Wrong magic bytes in the container file header")]
    HeaderMagic,

    #[error("The container file header has no metadata map")]
    GetHeaderMetadata,

    #[error("No avro.schema entry in the container file metadata")]
    GetAvroSchemaFromMap,

    #[error("The avro.codec metadata entry is not a byte string")]
    BadCodecMetadata,

    #[error("Codec '{0}' is not supported")]
    CodecNotSupported(String),

    #[error("Failed to read the 16-byte sync marker: {0}")]
    ReadMarker(#[source] std::io::Error),

    #[error("Failed to read a data block: {0}")]
    ReadBlock(#[source] std::io::Error),

    #[error("The block sync marker does not match the file header sync marker")]
    BlockSyncMismatch,

    #[error("Metadata keys starting with 'avro.' are reserved: {0}")]
    InvalidMetadataKey(String),

    #[error("User metadata must be added before the first value is written")]
    MetadataAddedAfterHeader,

    #[error("Failed to decompress a deflate block: {0}")]
    DeflateDecompress(#[source] std::io::Error),

    #[error("Failed to compress a bzip2 block: {0}")]
    Bzip2Compress(#[source] std::io::Error),

    #[error("Failed to decompress a bzip2 block: {0}")]
    Bzip2Decompress(#[source] std::io::Error),

    // ---- single-object encoding ----------------------------------------------
    #[error("Expected the single-object marker [0xC3, 0x01], got {0:?}")]
    SingleObjectMagic([u8; 2]),

    #[error("No schema registered for fingerprint 0x{0:016x}")]
    UnknownFingerprint(u64),

    // ---- schema parsing --------------------------------------------------------
    #[error("Failed to parse schema from JSON")]
    ParseSchemaJson(#[source] serde_json::Error),

    #[error("A schema must be a JSON string, object or array")]
    ParseSchemaFromValidJson,

    #[error("Unknown primitive type: {0}")]
    ParsePrimitive(String),

    #[error("Failed to serialize schema to JSON")]
    SerializeSchemaJson(#[source] serde_json::Error),

    #[error("No `name` field in a named schema")]
    GetNameField,

    #[error("Invalid schema name {0}. It must match the regex '{1}'")]
    InvalidSchemaName(String, &'static str),

    #[error("Invalid namespace {0}. It must match the regex '{1}'")]
    InvalidNamespace(String, &'static str),

    #[error("Two schemas with the same fullname were given: {0}")]
    NameCollision(String),

    #[error("Invalid field name {0}")]
    FieldName(String),

    #[error("Duplicate field name {0}")]
    FieldNameDuplicate(String),

    #[error("Invalid enum symbol name {0}")]
    EnumSymbolName(String),

    #[error("Duplicate enum symbol {0}")]
    EnumSymbolDuplicate(String),

    #[error("Enum default {symbol} is not among the allowed symbols {symbols:?}")]
    GetEnumDefault {
        symbol: String,
        symbols: Vec<String>,
    },

    #[error("Default value for an enum must be a string, got: {0}")]
    EnumDefaultWrongType(serde_json::Value),

    #[error("Unknown complex type: {0}")]
    GetComplexType(serde_json::Value),

    #[error("No `type` field in a complex type")]
    GetComplexTypeField,

    #[error("No `fields` field in a record")]
    GetRecordFieldsJson,

    #[error("No `symbols` field in an enum")]
    GetEnumSymbolsField,

    #[error("No `items` field in an array")]
    GetArrayItemsField,

    #[error("No `values` field in a map")]
    GetMapValuesField,

    #[error("Fixed schema has no `size` field")]
    GetFixedSizeField,

    #[error("Fixed schema `size` must be a positive integer, got: {0}")]
    GetFixedSizeFieldPositive(serde_json::Value),

    #[error("Unions may not directly contain a union")]
    GetNestedUnion,

    #[error("Unions cannot contain duplicate types")]
    GetUnionDuplicate,

    #[error("Union type must not be empty")]
    EmptyUnion,

    #[error("Key {0} is missing from the decimal metadata")]
    GetDecimalMetadataFromJson(&'static str),

    #[error("Invalid JSON value for decimal precision or scale: {0}")]
    GetPrecisionOrScaleFromJson(serde_json::Value),

    #[error("The decimal precision ({precision}) must be a positive number")]
    DecimalPrecisionPositive { precision: usize },

    #[error("The decimal precision ({precision}) must be greater than or equal to the scale ({scale})")]
    DecimalPrecisionLessThanScale { precision: usize, scale: usize },

    #[error("A fixed of {size} bytes cannot hold decimal values of precision {precision}")]
    DecimalPrecisionOverFixedSize { size: usize, precision: usize },

    #[error("A decimal can only annotate bytes or fixed, got a schema of kind {0:?}")]
    ResolveDecimalSchema(SchemaKind),
}

impl Error {
    /// Whether the error wraps an unexpected end of the underlying stream.
    pub fn is_eof(&self) -> bool {
        use Error::*;
        match self {
            ReadVariableIntegerBytes(e) | ReadBoolean(e) | ReadBytes(e) | ReadFloat(e)
            | ReadDouble(e) | ReadFixed(e, _) | ReadHeader(e) | ReadMarker(e) | ReadBlock(e) => {
                e.kind() == std::io::ErrorKind::UnexpectedEof
            }
            _ => false,
        }
    }
}
