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

mod file;

use std::collections::BTreeMap;

use snafu::ensure;

pub use file::{PuffinFileWriter, PuffinWriteBuilder};

use crate::blob_metadata::CompressionCodec;
use crate::error::{InvalidBlobSnafu, Result};

/// A blob to be written to a puffin file: an opaque payload plus the
/// descriptive metadata recorded in the footer.
#[derive(Debug, Clone)]
pub struct Blob {
    /// The type of the blob.
    pub(crate) blob_type: String,

    /// IDs of the source columns the blob was computed from.
    pub(crate) input_fields: Vec<i32>,

    /// ID of the snapshot the blob was computed from.
    pub(crate) snapshot_id: i64,

    /// Sequence number of the snapshot the blob was computed from.
    pub(crate) sequence_number: i64,

    /// The uncompressed payload.
    pub(crate) data: Vec<u8>,

    /// Compression to apply; `None` defers to the writer's default.
    pub(crate) compression: Option<CompressionCodec>,

    /// Application-defined properties of the blob.
    pub(crate) properties: BTreeMap<String, String>,
}

impl Blob {
    pub fn new(
        blob_type: impl Into<String>,
        input_fields: Vec<i32>,
        snapshot_id: i64,
        sequence_number: i64,
        data: Vec<u8>,
    ) -> Result<Blob> {
        let blob_type = blob_type.into();
        ensure!(
            !blob_type.is_empty(),
            InvalidBlobSnafu {
                reason: "type is empty"
            }
        );
        ensure!(
            !data.is_empty(),
            InvalidBlobSnafu {
                reason: "blob data is empty"
            }
        );
        Ok(Blob {
            blob_type,
            input_fields,
            snapshot_id,
            sequence_number,
            data,
            compression: None,
            properties: BTreeMap::new(),
        })
    }

    /// Requests a specific compression codec, overriding the writer default.
    pub fn with_compression(mut self, codec: CompressionCodec) -> Self {
        self.compression = Some(codec);
        self
    }

    pub fn with_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.properties = properties;
        self
    }
}
