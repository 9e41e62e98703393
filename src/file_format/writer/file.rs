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

use snafu::{ensure, OptionExt};
use tracing::debug;

use crate::blob_metadata::{BlobMetadata, CompressionCodec};
use crate::compression;
use crate::error::{
    AlreadyFinishedSnafu, FooterPayloadTooLargeSnafu, NotFinishedSnafu, Result,
    StreamNotInitializedSnafu,
};
use crate::file_format::writer::Blob;
use crate::file_format::{Flags, FooterStruct, MAGIC};
use crate::file_metadata::{FileMetadata, CREATED_BY_PROPERTY};
use crate::io::{OutputFile, PositionOutputStream};

/// Fluent configuration collected before a [`PuffinFileWriter`] is built.
pub struct PuffinWriteBuilder<F> {
    output: F,
    properties: BTreeMap<String, String>,
    compress_footer: bool,
    default_blob_compression: Option<CompressionCodec>,
}

impl<F: OutputFile> PuffinWriteBuilder<F> {
    pub fn new(output: F) -> Self {
        Self {
            output,
            properties: BTreeMap::new(),
            compress_footer: false,
            default_blob_compression: None,
        }
    }

    /// Sets one file-level property.
    pub fn set(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(property.into(), value.into());
        self
    }

    /// Sets all given file-level properties.
    pub fn set_all(mut self, properties: BTreeMap<String, String>) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Records the identifier of the producing application.
    pub fn created_by(self, application: impl Into<String>) -> Self {
        self.set(CREATED_BY_PROPERTY, application)
    }

    /// Compresses the footer payload with Zstandard.
    pub fn compress_footer(mut self) -> Self {
        self.compress_footer = true;
        self
    }

    /// Compresses blob payloads with `codec` unless a blob requests otherwise.
    pub fn compress_blobs(mut self, codec: CompressionCodec) -> Self {
        self.default_blob_compression = Some(codec);
        self
    }

    /// Opens the output stream, overwriting any existing contents, and
    /// returns a writer ready to accept blobs.
    pub fn build(self) -> Result<PuffinFileWriter> {
        let stream = self.output.create_or_overwrite()?;
        debug!(location = %self.output.location(), "created puffin file writer");
        Ok(PuffinFileWriter {
            stream: Some(stream),
            properties: self.properties,
            footer_compression: self.compress_footer.then_some(CompressionCodec::Zstd),
            default_blob_compression: self.default_blob_compression,
            blob_metadata: Vec::new(),
            state: State::Open,
            footer_size: None,
            file_size: None,
        })
    }
}

/// Write-side lifecycle. The header magic is emitted lazily, on the first
/// blob or at close for an empty file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    HeaderWritten,
    Finished,
}

/// Append-only writer for a puffin file.
///
/// Blob payloads go down the stream in call order; the footer is the only
/// part of the file that depends on everything before it, so it is emitted
/// once, at [`close`](Self::close).
pub struct PuffinFileWriter {
    /// The output stream; `None` after close releases it.
    stream: Option<Box<dyn PositionOutputStream>>,

    /// File-level properties for the footer.
    properties: BTreeMap<String, String>,

    /// Codec for the footer payload; `None` leaves the JSON uncompressed.
    footer_compression: Option<CompressionCodec>,

    /// Codec applied to blobs that do not request one.
    default_blob_compression: Option<CompressionCodec>,

    /// Metadata of the blobs written so far.
    blob_metadata: Vec<BlobMetadata>,

    state: State,
    footer_size: Option<u64>,
    file_size: Option<u64>,
}

impl PuffinFileWriter {
    /// Compresses and appends one blob, returning the metadata recorded for
    /// it. The returned `offset` and `length` describe the on-disk payload.
    pub fn write_blob(&mut self, blob: Blob) -> Result<BlobMetadata> {
        ensure!(self.state != State::Finished, AlreadyFinishedSnafu);
        self.write_header_if_needed()?;

        let stream = self.stream.as_mut().context(StreamNotInitializedSnafu)?;
        let offset = stream.position()?;

        let codec = blob.compression.or(self.default_blob_compression);
        let data = compression::compress(codec, &blob.data)?;
        stream.write(&data)?;

        let mut builder = BlobMetadata::builder();
        builder
            .blob_type(blob.blob_type)
            .input_fields(blob.input_fields)
            .snapshot_id(blob.snapshot_id)
            .sequence_number(blob.sequence_number)
            .offset(offset as i64)
            .length(data.len() as i64)
            .compression_codec(codec)
            .properties(blob.properties);
        let metadata = builder.build()?;

        self.blob_metadata.push(metadata.clone());
        Ok(metadata)
    }

    /// Writes the footer and releases the stream. Idempotent: closing a
    /// finished writer is a no-op success.
    pub fn close(&mut self) -> Result<()> {
        if self.state == State::Finished {
            return Ok(());
        }
        self.write_header_if_needed()?;

        let mut stream = self.stream.take().context(StreamNotInitializedSnafu)?;
        let result = self.write_footer(stream.as_mut());
        let close_result = stream.close();
        result?;
        close_result?;

        self.state = State::Finished;
        debug!(
            file_size = ?self.file_size,
            footer_size = ?self.footer_size,
            "closed puffin file"
        );
        Ok(())
    }

    /// Total size of the file. Available once closed.
    pub fn file_size(&self) -> Result<u64> {
        self.file_size.context(NotFinishedSnafu { what: "file size" })
    }

    /// Size of the footer, start magic included. Available once closed.
    pub fn footer_size(&self) -> Result<u64> {
        self.footer_size.context(NotFinishedSnafu {
            what: "footer size",
        })
    }

    /// Metadata of the blobs written so far, in write order.
    pub fn written_blobs_metadata(&self) -> &[BlobMetadata] {
        &self.blob_metadata
    }

    fn write_header_if_needed(&mut self) -> Result<()> {
        if self.state == State::Open {
            let stream = self.stream.as_mut().context(StreamNotInitializedSnafu)?;
            stream.write(&MAGIC)?;
            self.state = State::HeaderWritten;
        }
        Ok(())
    }

    // StartMagic FooterPayload FooterStruct
    fn write_footer(&mut self, stream: &mut dyn PositionOutputStream) -> Result<()> {
        let footer_offset = stream.position()?;
        stream.write(&MAGIC)?;

        let mut builder = FileMetadata::builder();
        builder
            .blobs(self.blob_metadata.clone())
            .properties(self.properties.clone());
        let metadata = builder.build()?;

        let json = metadata.to_json()?;
        let payload = compression::compress(self.footer_compression, json.as_bytes())?;
        ensure!(
            payload.len() <= u32::MAX as usize,
            FooterPayloadTooLargeSnafu {
                size: payload.len() as u64
            }
        );
        stream.write(&payload)?;

        let mut flags = Flags::DEFAULT;
        if self.footer_compression.is_some() {
            flags |= Flags::FOOTER_PAYLOAD_COMPRESSED_ZSTD;
        }
        let footer_struct = FooterStruct {
            payload_size: payload.len() as u32,
            flags,
        };
        stream.write(&footer_struct.encode())?;
        stream.flush()?;

        let end = stream.position()?;
        self.footer_size = Some(end - footer_offset);
        self.file_size = Some(end);
        Ok(())
    }
}
