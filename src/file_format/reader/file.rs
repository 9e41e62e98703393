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

use crate::blob_metadata::BlobMetadata;
use crate::error::{
    InvalidFooterSizeSnafu, Result, StreamNotInitializedSnafu, UnexpectedFileSizeSnafu,
};
use crate::file_format::reader::footer::FooterReader;
use crate::file_format::MIN_FOOTER_SIZE;
use crate::file_metadata::FileMetadata;
use crate::io::{read_fully, InputFile, SeekableInputStream};

static EMPTY_PROPERTIES: BTreeMap<String, String> = BTreeMap::new();

/// Random-access reader for a puffin file.
///
/// The footer is located and parsed lazily, on the first operation that needs
/// it, and cached for the lifetime of the reader. Blob payloads are read with
/// an explicit seek per call; nothing is prefetched.
///
/// Construction never fails. A source that cannot be opened, or a footer-size
/// hint that cannot be valid, leaves the reader in a state where every
/// operation reports the same error.
pub struct PuffinFileReader {
    /// Stream over the file contents; `None` once closed or if opening failed.
    stream: Option<Box<dyn SeekableInputStream>>,

    /// Total size of the file in bytes.
    file_size: u64,

    /// Caller-provided footer size, validated before use.
    footer_size_hint: Option<u64>,

    /// Footer size, once discovered or confirmed.
    known_footer_size: Option<u64>,

    /// Parsed footer metadata, once read.
    file_metadata: Option<FileMetadata>,
}

impl PuffinFileReader {
    /// Opens a reader over `input`.
    pub fn open(input: &dyn InputFile) -> Self {
        let (file_size, stream) = match input.length() {
            Ok(file_size) => (file_size, input.new_stream().ok()),
            Err(_) => (0, None),
        };
        Self {
            stream,
            file_size,
            footer_size_hint: None,
            known_footer_size: None,
            file_metadata: None,
        }
    }

    /// Overrides the file size instead of asking the source for it.
    pub fn with_file_size(mut self, file_size: u64) -> Self {
        self.file_size = file_size;
        self
    }

    /// Supplies a known footer size, skipping footer discovery.
    pub fn with_footer_size(mut self, footer_size: u64) -> Self {
        self.footer_size_hint = Some(footer_size);
        self
    }

    /// The metadata of every blob in the file, in file order.
    pub fn get_blobs(&mut self) -> Result<Vec<BlobMetadata>> {
        self.read_file_metadata()?;
        Ok(self
            .file_metadata
            .as_ref()
            .map(|metadata| metadata.blobs.clone())
            .unwrap_or_default())
    }

    /// The parsed footer metadata.
    pub fn file_metadata(&mut self) -> Result<FileMetadata> {
        self.read_file_metadata()?;
        Ok(self.file_metadata.clone().unwrap_or_default())
    }

    /// File-level properties. Empty until the footer has been parsed.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        self.file_metadata
            .as_ref()
            .map(|metadata| &metadata.properties)
            .unwrap_or(&EMPTY_PROPERTIES)
    }

    /// Reads one blob payload and decompresses it according to its metadata.
    pub fn read_blob(&mut self, blob: &BlobMetadata) -> Result<Vec<u8>> {
        self.check_footer_size_hint()?;
        let stream = self.stream.as_mut().context(StreamNotInitializedSnafu)?;

        stream.seek(blob.offset as u64)?;
        let mut data = vec![0u8; blob.length as usize];
        read_fully(stream.as_mut(), &mut data)?;

        match blob.compression_codec {
            Some(codec) => codec.decompress(&data),
            None => Ok(data),
        }
    }

    /// Releases the underlying stream. Subsequent operations fail.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.close()?;
        }
        Ok(())
    }

    fn read_file_metadata(&mut self) -> Result<()> {
        self.check_footer_size_hint()?;
        let stream = self.stream.as_mut().context(StreamNotInitializedSnafu)?;
        if self.file_metadata.is_some() {
            return Ok(());
        }

        let mut footer_reader = FooterReader::new(stream.as_mut(), self.file_size);
        let footer_size = match self.known_footer_size.or(self.footer_size_hint) {
            Some(size) => size,
            None => footer_reader.discover_footer_size()?,
        };
        let metadata = footer_reader.parse(footer_size)?;

        self.known_footer_size = Some(footer_size);
        self.file_metadata = Some(metadata);
        Ok(())
    }

    fn check_footer_size_hint(&self) -> Result<()> {
        if let Some(hint) = self.footer_size_hint {
            ensure!(hint > MIN_FOOTER_SIZE, InvalidFooterSizeSnafu { size: hint });
            ensure!(
                hint <= self.file_size,
                UnexpectedFileSizeSnafu {
                    min: hint,
                    actual: self.file_size,
                }
            );
        }
        Ok(())
    }
}
