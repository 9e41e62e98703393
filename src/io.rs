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

//! Byte-source and byte-sink capability traits.
//!
//! Readers and writers are written against these small interfaces rather than
//! a concrete filesystem. [`fs`] provides the local-file implementation,
//! [`memory`] an in-memory one.

pub mod fs;
pub mod memory;

use snafu::ensure;

use crate::error::{IncompleteReadSnafu, Result};

/// A finite, random-access source of bytes.
pub trait InputFile {
    /// Total length of the contents in bytes.
    fn length(&self) -> Result<u64>;

    /// Opens a new independent stream over the contents.
    fn new_stream(&self) -> Result<Box<dyn SeekableInputStream>>;

    /// A display path for diagnostics.
    fn location(&self) -> String;
}

/// A positioned read stream over an [`InputFile`].
pub trait SeekableInputStream {
    /// Reads up to `buf.len()` bytes, returning the count read. Short reads
    /// occur only at end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Moves the stream to an absolute byte offset.
    fn seek(&mut self, position: u64) -> Result<()>;

    /// The current absolute byte offset.
    fn position(&mut self) -> Result<u64>;

    /// Releases the stream. Reading after close is an error.
    fn close(&mut self) -> Result<()>;

    /// Skips `length` bytes forward.
    fn skip(&mut self, length: u64) -> Result<()> {
        let current = self.position()?;
        self.seek(current + length)
    }
}

/// A writable target that tracks how many bytes it has accepted.
pub trait OutputFile {
    /// Opens a stream, failing if the target already exists.
    fn create(&self) -> Result<Box<dyn PositionOutputStream>>;

    /// Opens a stream, truncating any existing contents.
    fn create_or_overwrite(&self) -> Result<Box<dyn PositionOutputStream>>;

    /// Reopens the written contents for reading.
    fn to_input_file(&self) -> Result<Box<dyn InputFile>>;

    /// A display path for diagnostics.
    fn location(&self) -> String;
}

/// An append-only write stream over an [`OutputFile`].
pub trait PositionOutputStream {
    /// Writes all of `buf`.
    fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Cumulative bytes written so far.
    fn position(&mut self) -> Result<u64>;

    /// Pushes buffered bytes down to the backing store.
    fn flush(&mut self) -> Result<()>;

    /// Flushes and releases the stream.
    fn close(&mut self) -> Result<()>;
}

impl std::fmt::Debug for dyn PositionOutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn PositionOutputStream")
    }
}

/// Fills `buf` from the stream, erroring on a short read.
pub fn read_fully(stream: &mut dyn SeekableInputStream, buf: &mut [u8]) -> Result<()> {
    let expected = buf.len() as u64;
    let mut filled = 0;
    while filled < buf.len() {
        let read = stream.read(&mut buf[filled..])?;
        ensure!(
            read > 0,
            IncompleteReadSnafu {
                expected,
                actual: filled as u64,
            }
        );
        filled += read;
    }
    Ok(())
}
