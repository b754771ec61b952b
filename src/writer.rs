//! Writing object container files.

use crate::{
    AvroResult,
    codec::Codec,
    encode::{encode_internal, encode_long, encode_to_vec},
    error::Error,
    schema::{Names, Schema},
    types::Value,
};
use std::{collections::HashMap, io::Write};

/// Flush a block once the encoded buffer grows past this many bytes.
const DEFAULT_BLOCK_SIZE: usize = 16000;
pub(crate) const CONTAINER_HEADER_MAGIC: [u8; 4] = [b'O', b'b', b'j', 1u8];

/// Main interface for writing object container files.
///
/// Values are buffered and written as compressed blocks; call
/// [`flush`](Writer::flush) (or [`into_inner`](Writer::into_inner), which
/// flushes) before dropping the writer, or the last block is lost.
pub struct Writer<'a, W: Write> {
    schema: &'a Schema,
    writer: W,
    names: Names,
    codec: Codec,
    block_size: usize,
    buffer: Vec<u8>,
    num_values: usize,
    marker: [u8; 16],
    has_header: bool,
    user_metadata: HashMap<String, Vec<u8>>,
}

/// Configures and builds a [`Writer`].
pub struct WriterBuilder<'a, W: Write> {
    schema: &'a Schema,
    writer: W,
    codec: Codec,
    block_size: usize,
    marker: Option<[u8; 16]>,
    has_header: bool,
}

impl<'a, W: Write> WriterBuilder<'a, W> {
    /// The compression codec for data blocks. Defaults to [`Codec::Null`].
    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// The buffered-bytes threshold that triggers a block flush.
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Use a specific 16-byte sync marker instead of a random one.
    pub fn marker(mut self, marker: [u8; 16]) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Treat the header as already present in the sink, appending blocks only.
    /// Requires [`marker`](WriterBuilder::marker) to be the existing file's
    /// sync marker.
    pub fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn build(self) -> Writer<'a, W> {
        Writer {
            schema: self.schema,
            writer: self.writer,
            names: self.schema.names(),
            codec: self.codec,
            block_size: self.block_size,
            buffer: Vec::with_capacity(self.block_size),
            num_values: 0,
            marker: self.marker.unwrap_or_else(generate_sync_marker),
            has_header: self.has_header,
            user_metadata: HashMap::new(),
        }
    }
}

impl<'a, W: Write> Writer<'a, W> {
    /// Start building a `Writer` for `schema` over `writer`.
    pub fn builder(schema: &'a Schema, writer: W) -> WriterBuilder<'a, W> {
        WriterBuilder {
            schema,
            writer,
            codec: Codec::Null,
            block_size: DEFAULT_BLOCK_SIZE,
            marker: None,
            has_header: false,
        }
    }

    /// A `Writer` with no compression.
    pub fn new(schema: &'a Schema, writer: W) -> Self {
        Self::builder(schema, writer).build()
    }

    /// A `Writer` with the given compression codec.
    pub fn with_codec(schema: &'a Schema, writer: W, codec: Codec) -> Self {
        Self::builder(schema, writer).codec(codec).build()
    }

    /// A `Writer` that appends blocks to an already-written container file,
    /// using that file's sync `marker`.
    pub fn append_to(schema: &'a Schema, writer: W, codec: Codec, marker: [u8; 16]) -> Self {
        Self::builder(schema, writer)
            .codec(codec)
            .marker(marker)
            .has_header(true)
            .build()
    }

    /// The schema this writer encodes with.
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// The 16-byte sync marker of the file being written.
    pub fn sync_marker(&self) -> &[u8; 16] {
        &self.marker
    }

    /// Attach custom metadata to the file header.
    ///
    /// Only possible before anything is appended; the `avro.` key prefix is
    /// reserved.
    pub fn add_user_metadata<T: AsRef<[u8]>>(&mut self, key: String, value: T) -> AvroResult<()> {
        if self.has_header {
            return Err(Error::MetadataAddedAfterHeader);
        }
        if key.starts_with("avro.") {
            return Err(Error::InvalidMetadataKey(key));
        }
        self.user_metadata.insert(key, value.as_ref().to_vec());
        Ok(())
    }

    /// Append a value, validating it against the schema first.
    ///
    /// Returns the number of bytes written to the underlying sink, which is 0
    /// until a block fills up or [`flush`](Writer::flush) is called.
    pub fn append<T: Into<Value>>(&mut self, value: T) -> AvroResult<usize> {
        let value = value.into();
        self.append_value_ref(&value)
    }

    /// Append a value by reference, validating it against the schema first.
    pub fn append_value_ref(&mut self, value: &Value) -> AvroResult<usize> {
        if let Some(reason) = value.validate_internal(self.schema, &self.names) {
            return Err(Error::Validation {
                value: Box::new(value.clone()),
                schema: Box::new(self.schema.clone()),
                reason,
            });
        }

        let written = self.maybe_write_header()?;
        encode_internal(value, self.schema, &self.names, &mut self.buffer)?;
        self.num_values += 1;

        if self.buffer.len() >= self.block_size {
            return self.flush().map(|flushed| flushed + written);
        }
        Ok(written)
    }

    /// Append every value of an iterator, then flush.
    pub fn extend<I, T>(&mut self, values: I) -> AvroResult<usize>
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let mut written = 0;
        for value in values {
            written += self.append(value)?;
        }
        written += self.flush()?;
        Ok(written)
    }

    /// Write all buffered values out as one block.
    ///
    /// Writes the header first if it has not been written yet. A call with no
    /// buffered values writes no block.
    pub fn flush(&mut self) -> AvroResult<usize> {
        let mut written = self.maybe_write_header()?;
        if self.num_values == 0 {
            return Ok(written);
        }

        self.codec.compress(&mut self.buffer)?;

        written += encode_long(self.num_values as i64, &mut self.writer)?;
        written += encode_long(self.buffer.len() as i64, &mut self.writer)?;
        self.writer
            .write_all(&self.buffer)
            .map_err(Error::WriteBytes)?;
        written += self.buffer.len();
        self.writer
            .write_all(&self.marker)
            .map_err(Error::WriteBytes)?;
        written += self.marker.len();

        self.buffer.clear();
        self.num_values = 0;
        self.writer.flush().map_err(Error::FlushWriter)?;

        Ok(written)
    }

    /// Flush and return the underlying sink.
    pub fn into_inner(mut self) -> AvroResult<W> {
        self.flush()?;
        Ok(self.writer)
    }

    fn maybe_write_header(&mut self) -> AvroResult<usize> {
        if self.has_header {
            return Ok(0);
        }

        let schema_json =
            serde_json::to_string(self.schema).map_err(Error::SerializeSchemaJson)?;
        let mut metadata: HashMap<String, Value> = HashMap::new();
        metadata.insert(
            "avro.schema".to_string(),
            Value::Bytes(schema_json.into_bytes()),
        );
        metadata.insert(
            "avro.codec".to_string(),
            Value::Bytes(<&str>::from(self.codec).as_bytes().to_vec()),
        );
        for (key, value) in &self.user_metadata {
            metadata.insert(key.clone(), Value::Bytes(value.clone()));
        }

        let mut header = Vec::new();
        header.extend_from_slice(&CONTAINER_HEADER_MAGIC);
        encode_internal(
            &Value::Map(metadata),
            &Schema::Map(Box::new(Schema::Bytes)),
            &Names::new(),
            &mut header,
        )?;
        header.extend_from_slice(&self.marker);

        self.writer.write_all(&header).map_err(Error::WriteBytes)?;
        self.has_header = true;
        Ok(header.len())
    }
}

fn generate_sync_marker() -> [u8; 16] {
    rand::random()
}

/// Encode a single value under `schema` with no container framing, after
/// validating it.
pub fn to_avro_datum<T: Into<Value>>(schema: &Schema, value: T) -> AvroResult<Vec<u8>> {
    let value = value.into();
    if let Some(reason) = value.validate_internal(schema, &schema.names()) {
        return Err(Error::Validation {
            value: Box::new(value),
            schema: Box::new(schema.clone()),
            reason,
        });
    }
    encode_to_vec(&value, schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    const MARKER: [u8; 16] = *b"0123456789abcdef";

    #[test]
    fn block_layout_for_a_single_int() -> TestResult {
        let schema = Schema::Int;
        let mut writer = Writer::builder(&schema, Vec::new()).marker(MARKER).build();
        writer.append(5)?;
        let bytes = writer.into_inner()?;

        // header ends with the sync marker, then: count 1, size 1, datum 0x0A, sync
        let header_len = bytes.len() - 19;
        assert_eq!(&bytes[..4], b"Obj\x01");
        assert_eq!(&bytes[header_len - 16..header_len], &MARKER);
        assert_eq!(&bytes[header_len..header_len + 3], &[0x02, 0x02, 0x0A]);
        assert_eq!(&bytes[header_len + 3..], &MARKER);
        Ok(())
    }

    #[test]
    fn validation_runs_before_encoding() {
        let schema = Schema::Int;
        let mut writer = Writer::new(&schema, Vec::new());
        assert!(matches!(
            writer.append("not an int"),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn reserved_metadata_keys_are_rejected() {
        let schema = Schema::Int;
        let mut writer = Writer::new(&schema, Vec::new());
        assert!(matches!(
            writer.add_user_metadata("avro.custom".to_string(), b"x"),
            Err(Error::InvalidMetadataKey(_))
        ));
        assert!(writer.add_user_metadata("custom".to_string(), b"x").is_ok());
    }

    #[test]
    fn flush_without_values_writes_no_block() -> TestResult {
        let schema = Schema::Int;
        let mut writer = Writer::builder(&schema, Vec::new()).marker(MARKER).build();
        writer.flush()?;
        let header_only = writer.into_inner()?;
        let mut writer = Writer::builder(&schema, Vec::new()).marker(MARKER).build();
        writer.flush()?;
        writer.flush()?;
        assert_eq!(writer.into_inner()?, header_only);
        Ok(())
    }

    #[test]
    fn to_avro_datum_validates() {
        assert!(matches!(
            to_avro_datum(&Schema::Long, "nope"),
            Err(Error::Validation { .. })
        ));
        assert_eq!(to_avro_datum(&Schema::Long, 27i64).unwrap(), vec![0x36]);
    }
}
