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

use std::io::Error as IoError;
use std::str::Utf8Error;

use snafu::{Location, Snafu};

/// Coarse error families for programmatic dispatch.
///
/// [`Error`] variants are fine-grained and their display messages may evolve;
/// callers that need to branch on a failure should use [`Error::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidState,

    // File format errors
    InvalidMagic,
    InvalidFooterSize,
    InvalidFooterPayload,
    InvalidFileLength,

    // Stream errors
    StreamNotInitialized,
    StreamSeekError,
    StreamReadError,
    StreamWriteError,
    IncompleteRead,
    IncompleteWrite,

    // Compression errors
    UnknownCodec,
    CompressionError,
    DecompressionError,

    // Other errors
    Unimplemented,
    InternalError,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Failed to open"))]
    Open {
        #[snafu(source)]
        error: IoError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to create"))]
    Create {
        #[snafu(source)]
        error: IoError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to read metadata"))]
    Metadata {
        #[snafu(source)]
        error: IoError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to read"))]
    Read {
        #[snafu(source)]
        error: IoError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to seek"))]
    Seek {
        #[snafu(source)]
        error: IoError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to write"))]
    Write {
        #[snafu(source)]
        error: IoError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to flush"))]
    Flush {
        #[snafu(source)]
        error: IoError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to close"))]
    Close {
        #[snafu(source)]
        error: IoError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Stream is not initialized"))]
    StreamNotInitialized {
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Incomplete read, expected: {expected}, actual: {actual}"))]
    IncompleteRead {
        expected: u64,
        actual: u64,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Incomplete write, expected: {expected}, actual: {actual}"))]
    IncompleteWrite {
        expected: u64,
        actual: u64,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Magic not matched"))]
    MagicNotMatched {
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Invalid footer size: {size}"))]
    InvalidFooterSize {
        size: u64,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Unexpected footer payload size: {size}"))]
    UnexpectedFooterPayloadSize {
        size: u64,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Footer payload too large: {size}"))]
    FooterPayloadTooLarge {
        size: u64,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Unexpected file size, min: {min}, actual: {actual}"))]
    UnexpectedFileSize {
        min: u64,
        actual: u64,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Footer payload is not valid UTF-8"))]
    NonUtf8FooterPayload {
        #[snafu(source)]
        error: Utf8Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to serialize json"))]
    SerializeJson {
        #[snafu(source)]
        error: serde_json::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to deserialize json"))]
    DeserializeJson {
        #[snafu(source)]
        error: serde_json::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Cannot parse metadata: unexpected end-of-input"))]
    UnexpectedEndOfInput {
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Cannot parse missing field: {field}"))]
    MissingField {
        field: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Cannot parse blobs from non-array: {repr}"))]
    BlobsNotArray {
        repr: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Cannot parse integer from non-int value in fields: {value}"))]
    NonIntegerFieldId {
        value: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Cannot parse {field} from non-{expected} value: {repr}"))]
    MalformedField {
        field: String,
        expected: &'static str,
        repr: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Invalid blob: {reason}"))]
    InvalidBlob {
        reason: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Invalid blob metadata: {reason}"))]
    InvalidBlobMetadata {
        reason: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Required field not set: {field}"))]
    UninitializedField {
        field: &'static str,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Writer is already finished"))]
    AlreadyFinished {
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("{what} is not available until the writer is closed"))]
    NotFinished {
        what: &'static str,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Unsupported compression codec: {codec}"))]
    UnsupportedCodec {
        codec: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to compress with {codec}"))]
    Compress {
        codec: &'static str,
        #[snafu(source)]
        error: IoError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to decompress with {codec}"))]
    Decompress {
        codec: &'static str,
        #[snafu(source)]
        error: IoError,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Error {
    /// The error family this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            Open { .. } | Create { .. } | Metadata { .. } | InvalidBlob { .. }
            | InvalidBlobMetadata { .. } => ErrorKind::InvalidArgument,

            AlreadyFinished { .. } | NotFinished { .. } => ErrorKind::InvalidState,

            MagicNotMatched { .. } => ErrorKind::InvalidMagic,

            InvalidFooterSize { .. }
            | UnexpectedFooterPayloadSize { .. }
            | FooterPayloadTooLarge { .. } => ErrorKind::InvalidFooterSize,

            DeserializeJson { .. }
            | UnexpectedEndOfInput { .. }
            | MissingField { .. }
            | BlobsNotArray { .. }
            | NonIntegerFieldId { .. }
            | MalformedField { .. }
            | NonUtf8FooterPayload { .. } => ErrorKind::InvalidFooterPayload,

            UnexpectedFileSize { .. } => ErrorKind::InvalidFileLength,

            StreamNotInitialized { .. } => ErrorKind::StreamNotInitialized,
            Seek { .. } => ErrorKind::StreamSeekError,
            Read { .. } => ErrorKind::StreamReadError,
            Write { .. } | Flush { .. } | Close { .. } => ErrorKind::StreamWriteError,
            IncompleteRead { .. } => ErrorKind::IncompleteRead,
            IncompleteWrite { .. } => ErrorKind::IncompleteWrite,

            UnsupportedCodec { .. } => ErrorKind::UnknownCodec,
            Compress { .. } => ErrorKind::CompressionError,
            Decompress { .. } => ErrorKind::DecompressionError,

            SerializeJson { .. } | UninitializedField { .. } => ErrorKind::InternalError,
        }
    }
}

impl From<derive_builder::UninitializedFieldError> for Error {
    fn from(error: derive_builder::UninitializedFieldError) -> Self {
        UninitializedFieldSnafu {
            field: error.field_name(),
        }
        .build()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
