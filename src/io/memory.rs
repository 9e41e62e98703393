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

//! In-memory byte sources and sinks, mainly for tests and demos.

use std::io;
use std::sync::{Arc, Mutex};

use snafu::ResultExt;

use crate::error::{CreateSnafu, Result};
use crate::io::{InputFile, OutputFile, PositionOutputStream, SeekableInputStream};

/// A byte buffer readable through the [`InputFile`] contract. Cheap to clone.
#[derive(Debug, Clone)]
pub struct InMemoryInputFile {
    data: Arc<Vec<u8>>,
}

impl InMemoryInputFile {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Arc::new(data.into()),
        }
    }
}

impl InputFile for InMemoryInputFile {
    fn length(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn new_stream(&self) -> Result<Box<dyn SeekableInputStream>> {
        Ok(Box::new(InMemoryInputStream {
            data: self.data.clone(),
            position: 0,
        }))
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}

struct InMemoryInputStream {
    data: Arc<Vec<u8>>,
    position: u64,
}

impl SeekableInputStream for InMemoryInputStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let start = (self.position as usize).min(self.data.len());
        let count = buf.len().min(self.data.len() - start);
        buf[..count].copy_from_slice(&self.data[start..start + count]);
        self.position += count as u64;
        Ok(count)
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        self.position = position;
        Ok(())
    }

    fn position(&mut self) -> Result<u64> {
        Ok(self.position)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A byte buffer writable through the [`OutputFile`] contract.
///
/// Clones share the same buffer, so the handle used to build a writer can be
/// kept around to inspect the bytes after the writer closes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOutputFile {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl InMemoryOutputFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.buffer.lock().unwrap().clone()
    }
}

impl OutputFile for InMemoryOutputFile {
    fn create(&self) -> Result<Box<dyn PositionOutputStream>> {
        let empty = self.buffer.lock().unwrap().is_empty();
        if !empty {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "in-memory file already written",
            ))
            .context(CreateSnafu);
        }
        Ok(Box::new(InMemoryOutputStream {
            buffer: self.buffer.clone(),
        }))
    }

    fn create_or_overwrite(&self) -> Result<Box<dyn PositionOutputStream>> {
        self.buffer.lock().unwrap().clear();
        Ok(Box::new(InMemoryOutputStream {
            buffer: self.buffer.clone(),
        }))
    }

    fn to_input_file(&self) -> Result<Box<dyn InputFile>> {
        Ok(Box::new(InMemoryInputFile::new(self.contents())))
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}

struct InMemoryOutputStream {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl PositionOutputStream for InMemoryOutputStream {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(())
    }

    fn position(&mut self) -> Result<u64> {
        Ok(self.buffer.lock().unwrap().len() as u64)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::io::read_fully;

    #[test]
    fn test_read_with_seek_and_skip() {
        let input = InMemoryInputFile::new(&b"abcdefghi"[..]);
        assert_eq!(input.length().unwrap(), 9);

        let mut stream = input.new_stream().unwrap();
        let mut buf = [0u8; 3];
        read_fully(stream.as_mut(), &mut buf).unwrap();
        assert_eq!(&buf, b"abc");

        stream.skip(3).unwrap();
        read_fully(stream.as_mut(), &mut buf).unwrap();
        assert_eq!(&buf, b"ghi");

        stream.seek(1).unwrap();
        read_fully(stream.as_mut(), &mut buf).unwrap();
        assert_eq!(&buf, b"bcd");
    }

    #[test]
    fn test_read_past_end_is_incomplete() {
        let input = InMemoryInputFile::new(&b"abc"[..]);
        let mut stream = input.new_stream().unwrap();
        let mut buf = [0u8; 4];
        let err = read_fully(stream.as_mut(), &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompleteRead);
    }

    #[test]
    fn test_output_shares_buffer_with_clones() {
        let output = InMemoryOutputFile::new();
        let mut stream = output.create().unwrap();
        stream.write(b"abc").unwrap();
        assert_eq!(stream.position().unwrap(), 3);
        stream.close().unwrap();

        assert_eq!(output.contents(), b"abc");
        assert!(output.create().is_err());

        let input = output.to_input_file().unwrap();
        assert_eq!(input.length().unwrap(), 3);
    }
}
