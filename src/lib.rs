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

//! Reader and writer for Puffin files: a container format storing a sequence
//! of opaque, independently compressed blobs, indexed by a JSON footer.
//!
//! The wire layout is documented in [`file_format`]. Writing is append-only
//! with the footer emitted at close; reading is random-access, bootstrapped
//! from the fixed-size trailer at the end of the file.
//!
//! ```
//! use puffin::io::memory::InMemoryOutputFile;
//! use puffin::io::OutputFile;
//! use puffin::{Blob, PuffinFileReader, PuffinWriteBuilder};
//!
//! # fn main() -> puffin::Result<()> {
//! let output = InMemoryOutputFile::new();
//! let mut writer = PuffinWriteBuilder::new(output.clone())
//!     .created_by("example")
//!     .build()?;
//! writer.write_blob(Blob::new("some-blob", vec![1], 2, 1, b"abcdefghi".to_vec())?)?;
//! writer.close()?;
//!
//! let input = output.to_input_file()?;
//! let mut reader = PuffinFileReader::open(input.as_ref());
//! let blobs = reader.get_blobs()?;
//! assert_eq!(reader.read_blob(&blobs[0])?, b"abcdefghi");
//! reader.close()?;
//! # Ok(())
//! # }
//! ```

pub mod blob_metadata;
pub mod compression;
pub mod error;
pub mod file_format;
pub mod file_metadata;
pub mod io;

#[cfg(test)]
mod tests;

pub use blob_metadata::{BlobMetadata, BlobMetadataBuilder, CompressionCodec};
pub use error::{Error, ErrorKind, Result};
pub use file_format::reader::PuffinFileReader;
pub use file_format::writer::{Blob, PuffinFileWriter, PuffinWriteBuilder};
pub use file_metadata::{FileMetadata, FileMetadataBuilder, CREATED_BY_PROPERTY};
