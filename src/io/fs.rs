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

//! Local-filesystem byte sources and sinks.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use snafu::{ensure, ResultExt};

use crate::error::{
    CloseSnafu, CreateSnafu, FlushSnafu, IncompleteWriteSnafu, MetadataSnafu, OpenSnafu, ReadSnafu,
    Result, SeekSnafu, WriteSnafu,
};
use crate::io::{InputFile, OutputFile, PositionOutputStream, SeekableInputStream};

/// A file on the local filesystem, opened for reading.
#[derive(Debug, Clone)]
pub struct FsInputFile {
    path: PathBuf,
}

impl FsInputFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl InputFile for FsInputFile {
    fn length(&self) -> Result<u64> {
        let metadata = std::fs::metadata(&self.path).context(MetadataSnafu)?;
        Ok(metadata.len())
    }

    fn new_stream(&self) -> Result<Box<dyn SeekableInputStream>> {
        let file = File::open(&self.path).context(OpenSnafu)?;
        Ok(Box::new(FsInputStream { file }))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

struct FsInputStream {
    file: File,
}

impl SeekableInputStream for FsInputStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.file.read(buf).context(ReadSnafu)
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(position))
            .map(|_| ())
            .context(SeekSnafu)
    }

    fn position(&mut self) -> Result<u64> {
        self.file.stream_position().context(SeekSnafu)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A file on the local filesystem, to be written once.
#[derive(Debug, Clone)]
pub struct FsOutputFile {
    path: PathBuf,
}

impl FsOutputFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OutputFile for FsOutputFile {
    fn create(&self) -> Result<Box<dyn PositionOutputStream>> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .context(CreateSnafu)?;
        Ok(Box::new(FsOutputStream { file, position: 0 }))
    }

    fn create_or_overwrite(&self) -> Result<Box<dyn PositionOutputStream>> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .context(CreateSnafu)?;
        Ok(Box::new(FsOutputStream { file, position: 0 }))
    }

    fn to_input_file(&self) -> Result<Box<dyn InputFile>> {
        Ok(Box::new(FsInputFile::new(self.path.clone())))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

struct FsOutputStream {
    file: File,
    position: u64,
}

impl PositionOutputStream for FsOutputStream {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        let expected = buf.len() as u64;
        let mut remaining = buf;
        while !remaining.is_empty() {
            let written = self.file.write(remaining).context(WriteSnafu)?;
            ensure!(
                written > 0,
                IncompleteWriteSnafu {
                    expected,
                    actual: expected - remaining.len() as u64,
                }
            );
            remaining = &remaining[written..];
        }
        self.position += expected;
        Ok(())
    }

    fn position(&mut self) -> Result<u64> {
        Ok(self.position)
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush().context(FlushSnafu)
    }

    fn close(&mut self) -> Result<()> {
        self.file.flush().context(CloseSnafu)
    }
}
