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

//! File-level metadata and its canonical JSON form.
//!
//! The footer payload is a single JSON object:
//!
//! ```json
//! {
//!   "blobs": [
//!     {
//!       "type": "some-blob",
//!       "fields": [1],
//!       "snapshot-id": 2,
//!       "sequence-number": 1,
//!       "offset": 4,
//!       "length": 9,
//!       "compression-codec": "zstd",
//!       "properties": {}
//!     }
//!   ],
//!   "properties": {}
//! }
//! ```
//!
//! `compression-codec` and the `properties` objects are omitted when absent or
//! empty. Key order is fixed so that serializing the same metadata twice
//! yields the same bytes. Parsing is strict: a missing or mistyped field is an
//! error, never a default.

use std::collections::BTreeMap;

use derive_builder::Builder;
use serde::Serialize;
use serde_json::Value;
use snafu::{IntoError, OptionExt, ResultExt};

use crate::blob_metadata::{BlobMetadata, CompressionCodec};
use crate::error::{
    BlobsNotArraySnafu, DeserializeJsonSnafu, MalformedFieldSnafu, MissingFieldSnafu,
    NonIntegerFieldIdSnafu, Result, SerializeJsonSnafu, UnexpectedEndOfInputSnafu,
};

/// Reserved file property recording the application that produced the file.
pub const CREATED_BY_PROPERTY: &str = "created-by";

/// Metadata carried by the footer: the blob index plus file-level properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Builder)]
#[builder(build_fn(error = "crate::error::Error"))]
pub struct FileMetadata {
    /// Blob metadata, in file order.
    #[builder(default)]
    pub blobs: Vec<BlobMetadata>,

    /// Application-defined properties of the file.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    #[builder(default)]
    pub properties: BTreeMap<String, String>,
}

impl FileMetadata {
    pub fn builder() -> FileMetadataBuilder {
        FileMetadataBuilder::default()
    }

    /// Serializes to the compact canonical form embedded in footers.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context(SerializeJsonSnafu)
    }

    /// Serializes with 2-space indentation, for humans.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context(SerializeJsonSnafu)
    }

    /// Parses the canonical JSON form.
    pub fn from_json(input: &str) -> Result<FileMetadata> {
        let root: Value = serde_json::from_str(input).map_err(|error| {
            if error.is_eof() {
                UnexpectedEndOfInputSnafu.build()
            } else {
                DeserializeJsonSnafu.into_error(error)
            }
        })?;

        let root = as_object(&root, "metadata")?;

        let blobs_value = root.get("blobs").context(MissingFieldSnafu { field: "blobs" })?;
        let Value::Array(blob_values) = blobs_value else {
            return BlobsNotArraySnafu {
                repr: blobs_value.to_string(),
            }
            .fail();
        };
        let blobs = blob_values
            .iter()
            .map(parse_blob_metadata)
            .collect::<Result<Vec<_>>>()?;

        let properties = match root.get("properties") {
            Some(value) => parse_string_map(value, "properties")?,
            None => BTreeMap::new(),
        };

        let mut builder = FileMetadata::builder();
        builder.blobs(blobs).properties(properties);
        builder.build()
    }
}

fn parse_blob_metadata(value: &Value) -> Result<BlobMetadata> {
    let blob = as_object(value, "blobs entry")?;

    let blob_type = require_string(blob, "type")?;
    let input_fields = parse_input_fields(blob)?;
    let snapshot_id = require_i64(blob, "snapshot-id")?;
    let sequence_number = require_i64(blob, "sequence-number")?;
    let offset = require_i64(blob, "offset")?;
    let length = require_i64(blob, "length")?;

    let compression_codec = match blob.get("compression-codec") {
        Some(value) => {
            let name = value.as_str().context(MalformedFieldSnafu {
                field: "compression-codec",
                expected: "string",
                repr: value.to_string(),
            })?;
            Some(CompressionCodec::from_name(name)?)
        }
        None => None,
    };

    let properties = match blob.get("properties") {
        Some(value) => parse_string_map(value, "properties")?,
        None => BTreeMap::new(),
    };

    let mut builder = BlobMetadata::builder();
    builder
        .blob_type(blob_type)
        .input_fields(input_fields)
        .snapshot_id(snapshot_id)
        .sequence_number(sequence_number)
        .offset(offset)
        .length(length)
        .compression_codec(compression_codec)
        .properties(properties);
    builder.build()
}

fn parse_input_fields(blob: &serde_json::Map<String, Value>) -> Result<Vec<i32>> {
    let value = blob.get("fields").context(MissingFieldSnafu { field: "fields" })?;
    let Value::Array(items) = value else {
        return MalformedFieldSnafu {
            field: "fields",
            expected: "array",
            repr: value.to_string(),
        }
        .fail();
    };
    items
        .iter()
        .map(|item| {
            item.as_i64()
                .and_then(|id| i32::try_from(id).ok())
                .context(NonIntegerFieldIdSnafu {
                    value: item.to_string(),
                })
        })
        .collect()
}

fn as_object<'a>(value: &'a Value, field: &str) -> Result<&'a serde_json::Map<String, Value>> {
    value.as_object().context(MalformedFieldSnafu {
        field,
        expected: "object",
        repr: value.to_string(),
    })
}

fn require_string(object: &serde_json::Map<String, Value>, field: &'static str) -> Result<String> {
    let value = object.get(field).context(MissingFieldSnafu { field })?;
    value
        .as_str()
        .map(str::to_string)
        .context(MalformedFieldSnafu {
            field,
            expected: "string",
            repr: value.to_string(),
        })
}

fn require_i64(object: &serde_json::Map<String, Value>, field: &'static str) -> Result<i64> {
    let value = object.get(field).context(MissingFieldSnafu { field })?;
    value.as_i64().context(MalformedFieldSnafu {
        field,
        expected: "int",
        repr: value.to_string(),
    })
}

fn parse_string_map(value: &Value, field: &str) -> Result<BTreeMap<String, String>> {
    let object = as_object(value, field)?;
    object
        .iter()
        .map(|(key, value)| {
            let value = value.as_str().context(MalformedFieldSnafu {
                field,
                expected: "string",
                repr: value.to_string(),
            })?;
            Ok((key.clone(), value.to_string()))
        })
        .collect()
}
