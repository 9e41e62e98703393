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

//! # Format specification for Puffin files
//!
//! ## File structure
//!
//! Magic Blob₁ Blob₂ ... Blobₙ Footer
//!
//! - `Magic` is four bytes 0x50, 0x46, 0x41, 0x31 ("PFA1"),
//! - `Blobᵢ` is i-th blob contained in the file, to be interpreted by application according to the footer,
//! - `Footer` is defined below.
//!
//! ## Footer structure
//!
//! Magic FooterPayload FooterStruct
//!
//! - `Magic`: four bytes, same as at the beginning of the file
//! - `FooterPayload`: optionally compressed, UTF-8 encoded JSON payload describing the blobs in the file
//! - `FooterStruct`: a fixed 16-byte trailer
//!   * `PayloadSize` at offset 0: length in bytes of the `FooterPayload` (after compression, if compressed), stored as a 4-byte little-endian unsigned integer
//!   * `Flags` at offset 4: 4 bytes for boolean flags
//!     - bit 0 (lowest bit of the first byte): whether `FooterPayload` is compressed with Zstandard
//!     - all other bits are reserved for future use and should be set to 0 on write
//!   * bytes 8..12 are reserved for future use and should be set to 0 on write
//!   * `Magic` at offset 12: four bytes, same as at the beginning of the file
//!
//! ## Footer Payload
//!
//! Footer payload bytes are either uncompressed or Zstd-compressed (as a
//! single Zstandard frame with content size present), UTF-8 encoded JSON
//! representing a single [`FileMetadata`] object.
//!
//! [`FileMetadata`]: ../file_metadata/struct.FileMetadata.html

pub mod reader;
pub mod writer;

use bitflags::bitflags;
use snafu::ensure;

use crate::error::{InvalidFooterSizeSnafu, MagicNotMatchedSnafu, Result};

pub const MAGIC: [u8; 4] = [0x50, 0x46, 0x41, 0x31];

pub const MAGIC_SIZE: u64 = MAGIC.len() as u64;
pub const FOOTER_STRUCT_SIZE: u64 = 16;
pub const FOOTER_STRUCT_PAYLOAD_SIZE_OFFSET: usize = 0;
pub const FOOTER_STRUCT_FLAGS_OFFSET: usize = 4;
pub const FOOTER_STRUCT_MAGIC_OFFSET: usize = 12;

/// Smallest well-formed footer: the start magic followed by the trailer
/// struct, with an empty payload in between.
pub const MIN_FOOTER_SIZE: u64 = MAGIC_SIZE + FOOTER_STRUCT_SIZE;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Flags: u32 {
        const DEFAULT = 0b00000000;

        const FOOTER_PAYLOAD_COMPRESSED_ZSTD = 0b00000001;
    }
}

/// The fixed-size trailer at the very end of every file. Decoding it is all a
/// reader needs to locate the footer payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FooterStruct {
    pub payload_size: u32,
    pub flags: Flags,
}

impl FooterStruct {
    /// Decodes the trailer from its wire form. `bytes` must hold at least
    /// [`FOOTER_STRUCT_SIZE`] bytes, the struct being read from the front.
    /// Unknown flag bits are tolerated for forward compatibility.
    pub fn decode(bytes: &[u8]) -> Result<FooterStruct> {
        ensure!(
            bytes.len() >= FOOTER_STRUCT_SIZE as usize,
            InvalidFooterSizeSnafu {
                size: bytes.len() as u64
            }
        );
        ensure!(
            bytes[FOOTER_STRUCT_MAGIC_OFFSET..FOOTER_STRUCT_MAGIC_OFFSET + MAGIC.len()] == MAGIC,
            MagicNotMatchedSnafu
        );

        let payload_size = read_u32_le(bytes, FOOTER_STRUCT_PAYLOAD_SIZE_OFFSET);
        let flags = Flags::from_bits_truncate(read_u32_le(bytes, FOOTER_STRUCT_FLAGS_OFFSET));
        Ok(FooterStruct {
            payload_size,
            flags,
        })
    }

    /// Encodes the trailer to its wire form. Reserved bytes are zero.
    pub fn encode(&self) -> [u8; FOOTER_STRUCT_SIZE as usize] {
        let mut bytes = [0u8; FOOTER_STRUCT_SIZE as usize];
        bytes[FOOTER_STRUCT_PAYLOAD_SIZE_OFFSET..FOOTER_STRUCT_PAYLOAD_SIZE_OFFSET + 4]
            .copy_from_slice(&self.payload_size.to_le_bytes());
        bytes[FOOTER_STRUCT_FLAGS_OFFSET..FOOTER_STRUCT_FLAGS_OFFSET + 4]
            .copy_from_slice(&self.flags.bits().to_le_bytes());
        bytes[FOOTER_STRUCT_MAGIC_OFFSET..FOOTER_STRUCT_MAGIC_OFFSET + MAGIC.len()]
            .copy_from_slice(&MAGIC);
        bytes
    }
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}
