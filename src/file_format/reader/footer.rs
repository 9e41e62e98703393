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

use std::borrow::Cow;

use snafu::{ensure, ResultExt};
use tracing::debug;

use crate::blob_metadata::CompressionCodec;
use crate::error::{
    InvalidFooterSizeSnafu, MagicNotMatchedSnafu, NonUtf8FooterPayloadSnafu, Result,
    UnexpectedFileSizeSnafu, UnexpectedFooterPayloadSizeSnafu,
};
use crate::file_format::{
    Flags, FooterStruct, FOOTER_STRUCT_SIZE, MAGIC, MAGIC_SIZE, MIN_FOOTER_SIZE,
};
use crate::file_metadata::FileMetadata;
use crate::io::{read_fully, SeekableInputStream};

/// Locates and parses the footer of a puffin file.
///
/// ```text
/// Footer layout: StartMagic Payload FooterStruct
///                [4]        [?]     [16]
/// ```
///
/// Two short reads from the tail are enough to find the payload: the trailer
/// struct carries the payload size, and the start magic confirms the result.
pub(crate) struct FooterReader<'a> {
    stream: &'a mut dyn SeekableInputStream,
    file_size: u64,
}

impl<'a> FooterReader<'a> {
    pub(crate) fn new(stream: &'a mut dyn SeekableInputStream, file_size: u64) -> Self {
        Self { stream, file_size }
    }

    /// Derives the total footer size from the trailer struct at the end of
    /// the file.
    pub(crate) fn discover_footer_size(&mut self) -> Result<u64> {
        ensure!(
            self.file_size >= FOOTER_STRUCT_SIZE,
            UnexpectedFileSizeSnafu {
                min: FOOTER_STRUCT_SIZE,
                actual: self.file_size,
            }
        );

        let mut trailer = [0u8; FOOTER_STRUCT_SIZE as usize];
        self.stream.seek(self.file_size - FOOTER_STRUCT_SIZE)?;
        read_fully(self.stream, &mut trailer)?;
        let footer_struct = FooterStruct::decode(&trailer)?;

        let footer_size = MAGIC_SIZE + footer_struct.payload_size as u64 + FOOTER_STRUCT_SIZE;
        ensure!(
            footer_size > MIN_FOOTER_SIZE,
            InvalidFooterSizeSnafu { size: footer_size }
        );
        ensure!(
            footer_size <= self.file_size,
            UnexpectedFileSizeSnafu {
                min: footer_size,
                actual: self.file_size,
            }
        );

        let mut magic = [0u8; MAGIC_SIZE as usize];
        self.stream.seek(self.file_size - footer_size)?;
        read_fully(self.stream, &mut magic)?;
        ensure!(magic == MAGIC, MagicNotMatchedSnafu);

        Ok(footer_size)
    }

    /// Reads the `footer_size` bytes at the end of the file and parses them
    /// into a [`FileMetadata`].
    pub(crate) fn parse(&mut self, footer_size: u64) -> Result<FileMetadata> {
        let mut footer = vec![0u8; footer_size as usize];
        self.stream.seek(self.file_size - footer_size)?;
        read_fully(self.stream, &mut footer)?;

        ensure!(footer[..MAGIC.len()] == MAGIC, MagicNotMatchedSnafu);

        let struct_offset = footer.len() - FOOTER_STRUCT_SIZE as usize;
        let footer_struct = FooterStruct::decode(&footer[struct_offset..])?;
        let expected_size = MAGIC_SIZE + footer_struct.payload_size as u64 + FOOTER_STRUCT_SIZE;
        ensure!(
            footer_size == expected_size,
            UnexpectedFooterPayloadSizeSnafu {
                size: footer_struct.payload_size as u64,
            }
        );

        let payload =
            &footer[MAGIC.len()..MAGIC.len() + footer_struct.payload_size as usize];
        let payload = if footer_struct
            .flags
            .contains(Flags::FOOTER_PAYLOAD_COMPRESSED_ZSTD)
        {
            Cow::Owned(CompressionCodec::Zstd.decompress(payload)?)
        } else {
            Cow::Borrowed(payload)
        };

        let json = std::str::from_utf8(&payload).context(NonUtf8FooterPayloadSnafu)?;
        let metadata = FileMetadata::from_json(json)?;
        debug!(
            blobs = metadata.blobs.len(),
            footer_size, "parsed puffin footer"
        );
        Ok(metadata)
    }
}
