// Copyright 2023 Greptime Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::BTreeMap;
use std::fmt;

use derive_builder::Builder;
use serde::Serialize;
use snafu::ensure;

use crate::error::{InvalidBlobMetadataSnafu, Result, UnsupportedCodecSnafu};

/// Compression codec of a blob payload or the footer payload.
///
/// Both codecs produce a single self-describing frame with the uncompressed
/// content size present in the frame header, so decoders can allocate exact
/// output buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionCodec {
    Lz4,
    Zstd,
}

impl CompressionCodec {
    /// The codec name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            CompressionCodec::Lz4 => "lz4",
            CompressionCodec::Zstd => "zstd",
        }
    }

    /// Resolves a wire codec name. Anything other than `lz4` and `zstd` is
    /// rejected; an absent name means no compression and has no codec.
    pub fn from_name(name: &str) -> Result<CompressionCodec> {
        match name {
            "lz4" => Ok(CompressionCodec::Lz4),
            "zstd" => Ok(CompressionCodec::Zstd),
            _ => UnsupportedCodecSnafu { codec: name }.fail(),
        }
    }
}

impl fmt::Display for CompressionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metadata describing one blob stored in a puffin file.
///
/// Immutable once built. The builder validates the invariants of the format:
/// a non-empty type, at least one input field, a non-negative offset and a
/// positive on-disk length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Builder)]
#[serde(rename_all = "kebab-case")]
#[builder(setter(into), build_fn(validate = "Self::validate", error = "crate::error::Error"))]
pub struct BlobMetadata {
    /// The kind of the blob, interpreted by the application.
    #[serde(rename = "type")]
    pub blob_type: String,

    /// IDs of the source columns the blob was computed from.
    #[serde(rename = "fields")]
    pub input_fields: Vec<i32>,

    /// ID of the snapshot the blob was computed from.
    pub snapshot_id: i64,

    /// Sequence number of the snapshot the blob was computed from.
    pub sequence_number: i64,

    /// Offset of the blob payload from the start of the file.
    pub offset: i64,

    /// On-disk length of the blob payload, after compression.
    pub length: i64,

    /// Compression applied to the payload; `None` means stored as-is.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub compression_codec: Option<CompressionCodec>,

    /// Application-defined properties of the blob.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    #[builder(default)]
    pub properties: BTreeMap<String, String>,
}

impl BlobMetadata {
    pub fn builder() -> BlobMetadataBuilder {
        BlobMetadataBuilder::default()
    }
}

impl BlobMetadataBuilder {
    fn validate(&self) -> Result<()> {
        if let Some(blob_type) = &self.blob_type {
            ensure!(
                !blob_type.is_empty(),
                InvalidBlobMetadataSnafu {
                    reason: "type is empty"
                }
            );
        }
        if let Some(input_fields) = &self.input_fields {
            ensure!(
                !input_fields.is_empty(),
                InvalidBlobMetadataSnafu {
                    reason: "input fields are empty"
                }
            );
        }
        if let Some(offset) = self.offset {
            ensure!(
                offset >= 0,
                InvalidBlobMetadataSnafu {
                    reason: "offset must be non-negative"
                }
            );
        }
        if let Some(length) = self.length {
            ensure!(
                length > 0,
                InvalidBlobMetadataSnafu {
                    reason: "length must be positive"
                }
            );
        }
        Ok(())
    }
}
