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

//! Frame-level compression for blob and footer payloads.
//!
//! Every compressed payload is a single self-describing frame: LZ4 frames are
//! written with the content size recorded in the frame header, and Zstandard
//! frames are produced with the single-shot API so `ZSTD_getFrameContentSize`
//! reports a known value. Interoperating decoders rely on this to allocate
//! exact output buffers.

use std::borrow::Cow;
use std::io::{self, Read, Write};

use snafu::ResultExt;

use crate::blob_metadata::CompressionCodec;
use crate::error::{CompressSnafu, DecompressSnafu, Result};

impl CompressionCodec {
    /// Compresses `data` into a single frame.
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            CompressionCodec::Lz4 => {
                let mut frame_info = lz4_flex::frame::FrameInfo::new();
                frame_info.content_size = Some(data.len() as u64);
                let mut encoder =
                    lz4_flex::frame::FrameEncoder::with_frame_info(frame_info, Vec::new());
                encoder
                    .write_all(data)
                    .context(CompressSnafu { codec: "lz4" })?;
                encoder
                    .finish()
                    .map_err(|error| io::Error::new(io::ErrorKind::Other, error))
                    .context(CompressSnafu { codec: "lz4" })
            }
            CompressionCodec::Zstd => zstd::bulk::compress(data, zstd::DEFAULT_COMPRESSION_LEVEL)
                .context(CompressSnafu { codec: "zstd" }),
        }
    }

    /// Decompresses a single frame produced by [`compress`](Self::compress)
    /// or any conforming encoder.
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            CompressionCodec::Lz4 => {
                let mut decoder = lz4_flex::frame::FrameDecoder::new(data);
                let mut decompressed = Vec::new();
                decoder
                    .read_to_end(&mut decompressed)
                    .context(DecompressSnafu { codec: "lz4" })?;
                Ok(decompressed)
            }
            CompressionCodec::Zstd => {
                zstd::stream::decode_all(data).context(DecompressSnafu { codec: "zstd" })
            }
        }
    }
}

/// Compresses with an optional codec; `None` is the identity and borrows.
pub fn compress(codec: Option<CompressionCodec>, data: &[u8]) -> Result<Cow<'_, [u8]>> {
    match codec {
        Some(codec) => Ok(Cow::Owned(codec.compress(data)?)),
        None => Ok(Cow::Borrowed(data)),
    }
}

/// Decompresses with an optional codec; `None` returns the input unchanged.
pub fn decompress(codec: Option<CompressionCodec>, data: Vec<u8>) -> Result<Vec<u8>> {
    match codec {
        Some(codec) => codec.decompress(&data),
        None => Ok(data),
    }
}
