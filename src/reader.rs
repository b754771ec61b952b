//! Reading object container files.

use crate::{
    AvroResult,
    codec::Codec,
    decode::{decode_internal, decode_len},
    error::Error,
    resolve::ResolutionPlan,
    schema::{Names, Schema},
    types::Value,
    util::zag_i64,
    writer::CONTAINER_HEADER_MAGIC,
};
use log::warn;
use std::{collections::HashMap, io::Read, str::FromStr};

/// Main interface for reading object container files.
///
/// The header is read eagerly on construction; values are produced by
/// iterating:
///
/// ```no_run
/// # use avro_core::Reader;
/// # let input = std::io::Cursor::new(Vec::<u8>::new());
/// for value in Reader::new(input).unwrap() {
///     println!("{:?}", value.unwrap());
/// }
/// ```
pub struct Reader<'a, R> {
    reader: R,
    writer_schema: Schema,
    names: Names,
    codec: Codec,
    marker: [u8; 16],
    user_metadata: HashMap<String, Vec<u8>>,
    reader_schema: Option<&'a Schema>,
    plan: Option<ResolutionPlan>,
    buf: Vec<u8>,
    buf_idx: usize,
    remaining: usize,
    end_of_file: bool,
}

impl<'a, R: Read> Reader<'a, R> {
    /// Open a container file, decoding values with the writer schema from the
    /// header.
    pub fn new(reader: R) -> AvroResult<Self> {
        Self::new_inner(reader, None)
    }

    /// Open a container file and resolve every value through `schema`.
    pub fn with_schema(schema: &'a Schema, reader: R) -> AvroResult<Self> {
        Self::new_inner(reader, Some(schema))
    }

    fn new_inner(mut reader: R, reader_schema: Option<&'a Schema>) -> AvroResult<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).map_err(Error::ReadHeader)?;
        if magic != CONTAINER_HEADER_MAGIC {
            return Err(Error::HeaderMagic);
        }

        let metadata_schema = Schema::Map(Box::new(Schema::Bytes));
        let metadata = match decode_internal(&metadata_schema, &Names::new(), &mut reader)? {
            Value::Map(metadata) => metadata,
            _ => return Err(Error::GetHeaderMetadata),
        };

        let writer_schema = read_writer_schema(&metadata)?;
        let codec = read_codec(&metadata)?;

        let mut user_metadata = HashMap::new();
        for (key, value) in metadata {
            if key == "avro.schema" || key == "avro.codec" {
                continue;
            }
            if key.starts_with("avro.") {
                warn!("Ignoring unknown metadata key: {key}");
                continue;
            }
            match value {
                Value::Bytes(bytes) => {
                    user_metadata.insert(key, bytes);
                }
                other => warn!("User metadata {key} is not a byte string: {other:?}"),
            }
        }

        let mut marker = [0u8; 16];
        reader.read_exact(&mut marker).map_err(Error::ReadMarker)?;

        // Resolution is only needed when the schemas actually differ.
        let reader_schema = reader_schema.filter(|schema| **schema != writer_schema);
        let plan = reader_schema
            .map(|schema| ResolutionPlan::compile(&writer_schema, schema))
            .transpose()?;

        Ok(Self {
            reader,
            names: writer_schema.names(),
            writer_schema,
            codec,
            marker,
            user_metadata,
            reader_schema,
            plan,
            buf: Vec::new(),
            buf_idx: 0,
            remaining: 0,
            end_of_file: false,
        })
    }

    /// The schema the file was written with.
    pub fn writer_schema(&self) -> &Schema {
        &self.writer_schema
    }

    /// The reader schema, when one was supplied and differs from the writer's.
    pub fn reader_schema(&self) -> Option<&'a Schema> {
        self.reader_schema
    }

    /// The non-reserved metadata entries of the file header.
    pub fn user_metadata(&self) -> &HashMap<String, Vec<u8>> {
        &self.user_metadata
    }

    /// The 16-byte sync marker of the file.
    pub fn sync_marker(&self) -> &[u8; 16] {
        &self.marker
    }

    /// Read the next block header and payload. `Ok(false)` is the clean end
    /// of the file: EOF exactly at a block boundary.
    fn advance_block(&mut self) -> AvroResult<bool> {
        let mut first = [0u8; 1];
        loop {
            match self.reader.read(&mut first) {
                Ok(0) => return Ok(false),
                Ok(_) => break,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::ReadBlock(e)),
            }
        }

        // The first byte is already consumed; chain it back in front.
        let mut chained = (&first[..]).chain(&mut self.reader);
        let count = zag_i64(&mut chained)?;
        if count < 0 {
            return Err(Error::NegativeLength(count));
        }
        let size = decode_len(&mut self.reader)?;

        self.buf.resize(size, 0);
        self.reader
            .read_exact(&mut self.buf)
            .map_err(Error::ReadBlock)?;

        let mut marker = [0u8; 16];
        self.reader
            .read_exact(&mut marker)
            .map_err(Error::ReadMarker)?;
        if marker != self.marker {
            return Err(Error::BlockSyncMismatch);
        }

        self.codec.decompress(&mut self.buf)?;
        self.buf_idx = 0;
        self.remaining = usize::try_from(count).map_err(|e| Error::ConvertI64ToUsize(e, count))?;
        Ok(true)
    }

    fn read_value(&mut self) -> Option<AvroResult<Value>> {
        while self.remaining == 0 {
            if self.end_of_file {
                return None;
            }
            match self.advance_block() {
                Ok(true) => {}
                Ok(false) => {
                    self.end_of_file = true;
                    return None;
                }
                Err(e) => {
                    self.end_of_file = true;
                    return Some(Err(e));
                }
            }
        }

        let mut slice = &self.buf[self.buf_idx..];
        let available = slice.len();
        let result = match &self.plan {
            Some(plan) => plan.read_value(&mut slice),
            None => decode_internal(&self.writer_schema, &self.names, &mut slice),
        };
        match result {
            Ok(value) => {
                self.buf_idx += available - slice.len();
                self.remaining -= 1;
                Some(Ok(value))
            }
            Err(e) => {
                self.end_of_file = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read> Iterator for Reader<'_, R> {
    type Item = AvroResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_value()
    }
}

fn read_writer_schema(metadata: &HashMap<String, Value>) -> AvroResult<Schema> {
    let json = metadata
        .get("avro.schema")
        .and_then(|entry| match entry {
            Value::Bytes(bytes) => serde_json::from_slice(bytes).ok(),
            _ => None,
        })
        .ok_or(Error::GetAvroSchemaFromMap)?;
    Schema::parse(&json)
}

fn read_codec(metadata: &HashMap<String, Value>) -> AvroResult<Codec> {
    match metadata.get("avro.codec") {
        None => Ok(Codec::Null),
        Some(Value::Bytes(bytes)) => {
            let name = std::str::from_utf8(bytes).map_err(Error::ConvertToUtf8Error)?;
            Codec::from_str(name).map_err(|_| Error::CodecNotSupported(name.to_string()))
        }
        Some(_) => Err(Error::BadCodecMetadata),
    }
}

/// Decode a single datum written with `writer_schema`, with no container
/// framing, optionally resolving it through `reader_schema`.
pub fn from_avro_datum<R: Read>(
    writer_schema: &Schema,
    reader: &mut R,
    reader_schema: Option<&Schema>,
) -> AvroResult<Value> {
    match reader_schema.filter(|schema| *schema != writer_schema) {
        Some(schema) => ResolutionPlan::compile(writer_schema, schema)?.read_value(reader),
        None => decode_internal(writer_schema, &writer_schema.names(), reader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Writer;
    use pretty_assertions::assert_eq;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn one_int_container() -> Vec<u8> {
        let schema = Schema::Int;
        let mut writer = Writer::new(&schema, Vec::new());
        writer.append(5).unwrap();
        writer.into_inner().unwrap()
    }

    #[test]
    fn reads_back_a_single_value() -> TestResult {
        let bytes = one_int_container();
        let values = Reader::new(&bytes[..])?.collect::<AvroResult<Vec<_>>>()?;
        assert_eq!(values, vec![Value::Int(5)]);
        Ok(())
    }

    #[test]
    fn corrupted_sync_marker_is_detected() -> TestResult {
        let mut bytes = one_int_container();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let mut reader = Reader::new(&bytes[..])?;
        assert!(matches!(reader.next(), Some(Err(Error::BlockSyncMismatch))));
        assert!(reader.next().is_none());
        Ok(())
    }

    #[test]
    fn empty_container_decodes_to_an_empty_sequence() -> TestResult {
        let schema = Schema::Int;
        let mut writer = Writer::new(&schema, Vec::new());
        writer.flush()?;
        let bytes = writer.into_inner()?;

        let mut reader = Reader::new(&bytes[..])?;
        assert!(reader.next().is_none());
        Ok(())
    }

    #[test]
    fn bad_magic_is_rejected() {
        let bytes = b"NotAvroAtAll....";
        assert!(matches!(
            Reader::new(&bytes[..]),
            Err(Error::HeaderMagic)
        ));
    }

    #[test]
    fn empty_input_is_not_a_container() {
        assert!(Reader::new(&[][..]).is_err());
    }

    #[test]
    fn truncated_block_is_an_error() -> TestResult {
        let bytes = one_int_container();
        // drop the trailing sync and the datum
        let truncated = &bytes[..bytes.len() - 18];
        let mut reader = Reader::new(truncated)?;
        assert!(reader.next().unwrap().is_err());
        Ok(())
    }

    #[test]
    fn unknown_codec_is_rejected() -> TestResult {
        use crate::encode::encode_internal;

        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"Obj\x01");
        let mut metadata = HashMap::new();
        metadata.insert(
            "avro.schema".to_string(),
            Value::Bytes(b"\"int\"".to_vec()),
        );
        metadata.insert(
            "avro.codec".to_string(),
            Value::Bytes(b"snappy".to_vec()),
        );
        encode_internal(
            &Value::Map(metadata),
            &Schema::Map(Box::new(Schema::Bytes)),
            &Names::new(),
            &mut bytes,
        )?;
        bytes.extend_from_slice(&[0u8; 16]);

        assert!(matches!(
            Reader::new(&bytes[..]),
            Err(Error::CodecNotSupported(name)) if name == "snappy"
        ));
        Ok(())
    }

    #[test]
    fn from_avro_datum_decodes_and_resolves() -> TestResult {
        let mut encoded: &[u8] = &[0x36];
        assert_eq!(
            from_avro_datum(&Schema::Int, &mut encoded, None)?,
            Value::Int(27)
        );
        let mut encoded: &[u8] = &[0x36];
        assert_eq!(
            from_avro_datum(&Schema::Int, &mut encoded, Some(&Schema::Long))?,
            Value::Long(27)
        );
        Ok(())
    }

    #[test]
    fn user_metadata_round_trip() -> TestResult {
        let schema = Schema::Int;
        let mut writer = Writer::new(&schema, Vec::new());
        writer.add_user_metadata("origin".to_string(), b"unit-test")?;
        writer.append(1)?;
        let bytes = writer.into_inner()?;

        let reader = Reader::new(&bytes[..])?;
        assert_eq!(
            reader.user_metadata().get("origin"),
            Some(&b"unit-test".to_vec())
        );
        Ok(())
    }
}
