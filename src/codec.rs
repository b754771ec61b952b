//! Block compression codecs for object container files.
//!
//! The `avro.codec` metadata string is the registry key: [`Codec`] implements
//! `FromStr` over the names defined by the specification, so the container
//! framing never needs to know which codecs exist.

use crate::{AvroResult, error::Error};
use std::io::Read;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// Settings for the deflate codec.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct DeflateSettings {
    compression_level: miniz_oxide::deflate::CompressionLevel,
}

impl DeflateSettings {
    pub fn new(compression_level: miniz_oxide::deflate::CompressionLevel) -> Self {
        Self { compression_level }
    }

    fn compression_level(&self) -> u8 {
        self.compression_level as u8
    }
}

impl Default for DeflateSettings {
    fn default() -> Self {
        Self::new(miniz_oxide::deflate::CompressionLevel::DefaultCompression)
    }
}

/// Settings for the bzip2 codec.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct Bzip2Settings {
    pub compression_level: u8,
}

impl Bzip2Settings {
    pub fn new(compression_level: u8) -> Self {
        Self { compression_level }
    }

    fn compression(&self) -> bzip2::Compression {
        bzip2::Compression::new(self.compression_level as u32)
    }
}

impl Default for Bzip2Settings {
    fn default() -> Self {
        Self::new(bzip2::Compression::best().level() as u8)
    }
}

/// The compression codec applied to the payload of every container-file block.
#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab_case")]
pub enum Codec {
    /// Passes data through uncompressed.
    Null,
    /// Raw RFC 1951 deflate, without any zlib wrapping or checksum.
    Deflate(DeflateSettings),
    /// The bzip2 compression library.
    Bzip2(Bzip2Settings),
}

impl Codec {
    /// Compress a block payload in place.
    pub fn compress(self, stream: &mut Vec<u8>) -> AvroResult<()> {
        match self {
            Codec::Null => (),
            Codec::Deflate(settings) => {
                *stream = miniz_oxide::deflate::compress_to_vec(
                    stream,
                    settings.compression_level(),
                );
            }
            Codec::Bzip2(settings) => {
                let mut encoder =
                    bzip2::read::BzEncoder::new(&stream[..], settings.compression());
                let mut compressed = Vec::new();
                encoder
                    .read_to_end(&mut compressed)
                    .map_err(Error::Bzip2Compress)?;
                *stream = compressed;
            }
        }
        Ok(())
    }

    /// Decompress a block payload in place.
    pub fn decompress(self, stream: &mut Vec<u8>) -> AvroResult<()> {
        *stream = match self {
            Codec::Null => return Ok(()),
            Codec::Deflate(_) => {
                miniz_oxide::inflate::decompress_to_vec(stream).map_err(|e| {
                    use miniz_oxide::inflate::TINFLStatus;
                    let io = match e.status {
                        TINFLStatus::NeedsMoreInput
                        | TINFLStatus::FailedCannotMakeProgress => {
                            std::io::Error::from(std::io::ErrorKind::UnexpectedEof)
                        }
                        _ => std::io::Error::from(std::io::ErrorKind::InvalidData),
                    };
                    Error::DeflateDecompress(io)
                })?
            }
            Codec::Bzip2(_) => {
                let mut decoder = bzip2::read::BzDecoder::new(&stream[..]);
                let mut decompressed = Vec::new();
                decoder
                    .read_to_end(&mut decompressed)
                    .map_err(Error::Bzip2Decompress)?;
                decompressed
            }
        };
        Ok(())
    }
}
