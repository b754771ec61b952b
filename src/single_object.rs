//! The single-object encoding: a two-byte marker, the schema's 8-byte
//! CRC-64-AVRO fingerprint in little-endian order, then the plain datum.

use crate::{
    AvroResult,
    decode::decode_internal,
    encode::encode_internal,
    error::Error,
    rabin::Rabin,
    schema::{Names, Schema},
    types::Value,
};
use std::{
    collections::HashMap,
    io::{Read, Write},
};

const SINGLE_OBJECT_MAGIC: [u8; 2] = [0xC3, 0x01];

/// The CRC-64-AVRO fingerprint of a schema as a 64-bit integer.
pub fn schema_fingerprint(schema: &Schema) -> AvroResult<u64> {
    let fingerprint = schema.fingerprint::<Rabin>()?;
    let bytes: [u8; 8] = fingerprint
        .bytes
        .as_slice()
        .try_into()
        .expect("a CRC-64 fingerprint is eight bytes");
    Ok(u64::from_le_bytes(bytes))
}

/// Write `value` in the single-object encoding, after validating it.
///
/// Returns the number of bytes written, including the ten prefix bytes.
pub fn write_single_object<W: Write>(
    value: &Value,
    schema: &Schema,
    writer: &mut W,
) -> AvroResult<usize> {
    let names = schema.names();
    if let Some(reason) = value.validate_internal(schema, &names) {
        return Err(Error::Validation {
            value: Box::new(value.clone()),
            schema: Box::new(schema.clone()),
            reason,
        });
    }

    writer
        .write_all(&SINGLE_OBJECT_MAGIC)
        .map_err(Error::WriteBytes)?;
    writer
        .write_all(&schema_fingerprint(schema)?.to_le_bytes())
        .map_err(Error::WriteBytes)?;
    let written = encode_internal(value, schema, &names, writer)?;
    Ok(SINGLE_OBJECT_MAGIC.len() + 8 + written)
}

/// A set of schemas addressable by CRC-64-AVRO fingerprint, used to decode
/// single-object payloads whose schema is selected by the embedded
/// fingerprint.
#[derive(Default)]
pub struct SchemaStore {
    schemas: HashMap<u64, (Schema, Names)>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, returning its fingerprint.
    pub fn register(&mut self, schema: Schema) -> AvroResult<u64> {
        let fingerprint = schema_fingerprint(&schema)?;
        let names = schema.names();
        self.schemas.insert(fingerprint, (schema, names));
        Ok(fingerprint)
    }

    /// The registered schema with this fingerprint, if any.
    pub fn lookup(&self, fingerprint: u64) -> Option<&Schema> {
        self.schemas.get(&fingerprint).map(|(schema, _)| schema)
    }

    /// Read one single-object-encoded value, selecting the schema by the
    /// fingerprint embedded in the prefix.
    ///
    /// Returns the fingerprint alongside the value so callers can recover the
    /// schema through [`lookup`](SchemaStore::lookup).
    pub fn read_single_object<R: Read>(&self, reader: &mut R) -> AvroResult<(u64, Value)> {
        let mut magic = [0u8; 2];
        reader.read_exact(&mut magic).map_err(Error::ReadHeader)?;
        if magic != SINGLE_OBJECT_MAGIC {
            return Err(Error::SingleObjectMagic(magic));
        }

        let mut fingerprint_bytes = [0u8; 8];
        reader
            .read_exact(&mut fingerprint_bytes)
            .map_err(Error::ReadHeader)?;
        let fingerprint = u64::from_le_bytes(fingerprint_bytes);

        let (schema, names) = self
            .schemas
            .get(&fingerprint)
            .ok_or(Error::UnknownFingerprint(fingerprint))?;
        let value = decode_internal(schema, names, reader)?;
        Ok((fingerprint, value))
    }
}
