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

use crate::blob_metadata::CompressionCodec;
use crate::error::ErrorKind;
use crate::file_format::reader::PuffinFileReader;
use crate::file_format::writer::{Blob, PuffinFileWriter, PuffinWriteBuilder};
use crate::file_format::{MAGIC, MIN_FOOTER_SIZE};
use crate::io::fs::{FsInputFile, FsOutputFile};
use crate::io::memory::{InMemoryInputFile, InMemoryOutputFile};

const FIRST_BLOB: &[u8] = b"abcdefghi";
const SECOND_BLOB: &[u8] =
    "some blob \0 binary data 🤯 that is not very very very very very very long, is it?"
        .as_bytes();

fn write_sample_blobs(writer: &mut PuffinFileWriter) {
    writer
        .write_blob(Blob::new("some-blob", vec![1], 2, 1, FIRST_BLOB.to_vec()).unwrap())
        .unwrap();
    writer
        .write_blob(Blob::new("some-other-blob", vec![2], 2, 1, SECOND_BLOB.to_vec()).unwrap())
        .unwrap();
}

#[test]
fn test_empty_file_layout() {
    let output = InMemoryOutputFile::new();
    let mut writer = PuffinWriteBuilder::new(output.clone()).build().unwrap();

    let err = writer.footer_size().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    let err = writer.file_size().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    writer.close().unwrap();
    // footer: start magic (4) + `{"blobs":[]}` (12) + footer struct (16)
    assert_eq!(writer.footer_size().unwrap(), 32);
    assert_eq!(writer.file_size().unwrap(), 36);
    assert!(writer.written_blobs_metadata().is_empty());

    let mut expected = Vec::new();
    expected.extend_from_slice(&MAGIC); // header
    expected.extend_from_slice(&MAGIC); // footer start
    expected.extend_from_slice(br#"{"blobs":[]}"#);
    expected.extend_from_slice(&12u32.to_le_bytes()); // payload size
    expected.extend_from_slice(&0u32.to_le_bytes()); // flags
    expected.extend_from_slice(&[0, 0, 0, 0]); // reserved
    expected.extend_from_slice(&MAGIC);
    assert_eq!(output.contents(), expected);
}

#[test]
fn test_empty_file_round_trip() {
    for footer_compressed in [false, true] {
        let output = InMemoryOutputFile::new();
        let mut builder = PuffinWriteBuilder::new(output.clone()).created_by("Test 1234");
        if footer_compressed {
            builder = builder.compress_footer();
        }
        let mut writer = builder.build().unwrap();
        writer.close().unwrap();

        let input = InMemoryInputFile::new(output.contents());
        let mut reader = PuffinFileReader::open(&input);
        assert!(reader.get_blobs().unwrap().is_empty());
        assert_eq!(
            reader.properties().get("created-by"),
            Some(&"Test 1234".to_string())
        );
    }
}

#[test]
fn test_empty_file_with_footer_size_hint() {
    let output = InMemoryOutputFile::new();
    let mut writer = PuffinWriteBuilder::new(output.clone()).build().unwrap();
    writer.close().unwrap();

    let input = InMemoryInputFile::new(output.contents());
    let mut reader = PuffinFileReader::open(&input).with_footer_size(32);
    assert!(reader.get_blobs().unwrap().is_empty());
    assert!(reader.properties().is_empty());
}

#[test]
fn test_two_blob_uncompressed() {
    let output = InMemoryOutputFile::new();
    let mut writer = PuffinWriteBuilder::new(output.clone())
        .created_by("Test 1234")
        .build()
        .unwrap();
    write_sample_blobs(&mut writer);
    writer.close().unwrap();

    let input = InMemoryInputFile::new(output.contents());
    let mut reader = PuffinFileReader::open(&input);
    let blobs = reader.get_blobs().unwrap();
    assert_eq!(blobs.len(), 2);

    assert_eq!(
        reader.properties().get("created-by"),
        Some(&"Test 1234".to_string())
    );

    assert_eq!(blobs[0].blob_type, "some-blob");
    assert_eq!(blobs[0].input_fields, vec![1]);
    assert_eq!(blobs[0].offset, 4);
    assert_eq!(blobs[0].length, 9);
    assert_eq!(blobs[0].compression_codec, None);

    assert_eq!(blobs[1].blob_type, "some-other-blob");
    assert_eq!(blobs[1].input_fields, vec![2]);
    assert_eq!(blobs[1].offset, 13);
    assert_eq!(blobs[1].length, 83);
    assert_eq!(blobs[1].compression_codec, None);

    assert_eq!(reader.read_blob(&blobs[0]).unwrap(), FIRST_BLOB);
    let second = reader.read_blob(&blobs[1]).unwrap();
    assert_eq!(second.len(), 83);
    assert_eq!(second, SECOND_BLOB);
}

#[test]
fn test_two_blob_zstd() {
    let output = InMemoryOutputFile::new();
    let mut writer = PuffinWriteBuilder::new(output.clone())
        .created_by("Test 1234")
        .compress_blobs(CompressionCodec::Zstd)
        .build()
        .unwrap();
    write_sample_blobs(&mut writer);
    writer.close().unwrap();

    let input = InMemoryInputFile::new(output.contents());
    let mut reader = PuffinFileReader::open(&input);
    let blobs = reader.get_blobs().unwrap();
    assert_eq!(blobs.len(), 2);

    for blob in &blobs {
        assert_eq!(blob.compression_codec, Some(CompressionCodec::Zstd));
    }
    assert_eq!(blobs[1].offset, blobs[0].offset + blobs[0].length);

    assert_eq!(reader.read_blob(&blobs[0]).unwrap(), FIRST_BLOB);
    assert_eq!(reader.read_blob(&blobs[1]).unwrap(), SECOND_BLOB);
}

#[test]
fn test_lz4_blobs_round_trip() {
    let output = InMemoryOutputFile::new();
    let mut writer = PuffinWriteBuilder::new(output.clone())
        .compress_blobs(CompressionCodec::Lz4)
        .build()
        .unwrap();
    write_sample_blobs(&mut writer);
    writer.close().unwrap();

    let input = InMemoryInputFile::new(output.contents());
    let mut reader = PuffinFileReader::open(&input);
    let blobs = reader.get_blobs().unwrap();
    for blob in &blobs {
        assert_eq!(blob.compression_codec, Some(CompressionCodec::Lz4));
    }
    assert_eq!(reader.read_blob(&blobs[0]).unwrap(), FIRST_BLOB);
    assert_eq!(reader.read_blob(&blobs[1]).unwrap(), SECOND_BLOB);
}

#[test]
fn test_per_blob_compression_override() {
    let output = InMemoryOutputFile::new();
    let mut writer = PuffinWriteBuilder::new(output.clone())
        .compress_blobs(CompressionCodec::Zstd)
        .build()
        .unwrap();
    writer
        .write_blob(
            Blob::new("some-blob", vec![1], 2, 1, FIRST_BLOB.to_vec())
                .unwrap()
                .with_compression(CompressionCodec::Lz4),
        )
        .unwrap();
    writer.close().unwrap();

    let input = InMemoryInputFile::new(output.contents());
    let mut reader = PuffinFileReader::open(&input);
    let blobs = reader.get_blobs().unwrap();
    assert_eq!(blobs[0].compression_codec, Some(CompressionCodec::Lz4));
    assert_eq!(reader.read_blob(&blobs[0]).unwrap(), FIRST_BLOB);
}

#[test]
fn test_blob_properties_round_trip() {
    let output = InMemoryOutputFile::new();
    let mut writer = PuffinWriteBuilder::new(output.clone()).build().unwrap();
    writer
        .write_blob(
            Blob::new("some-blob", vec![1], 2, 1, FIRST_BLOB.to_vec())
                .unwrap()
                .with_properties(BTreeMap::from([(
                    "some key".to_string(),
                    "some value".to_string(),
                )])),
        )
        .unwrap();
    writer.close().unwrap();

    let input = InMemoryInputFile::new(output.contents());
    let mut reader = PuffinFileReader::open(&input);
    let blobs = reader.get_blobs().unwrap();
    assert_eq!(
        blobs[0].properties.get("some key"),
        Some(&"some value".to_string())
    );
}

#[test]
fn test_wrong_footer_size_hints() {
    let output = InMemoryOutputFile::new();
    let mut writer = PuffinWriteBuilder::new(output.clone())
        .created_by("Test 1234")
        .compress_footer()
        .compress_blobs(CompressionCodec::Zstd)
        .build()
        .unwrap();
    write_sample_blobs(&mut writer);
    writer.close().unwrap();

    let footer_size = writer.footer_size().unwrap();
    let file_size = writer.file_size().unwrap();
    let contents = output.contents();

    let expect_kind = |hint: u64| {
        if hint <= MIN_FOOTER_SIZE {
            ErrorKind::InvalidFooterSize
        } else if hint > file_size {
            ErrorKind::InvalidFileLength
        } else {
            ErrorKind::InvalidMagic
        }
    };

    let mut hints = vec![
        footer_size - 1,
        footer_size + 1,
        footer_size - 10,
        footer_size + 10,
        footer_size + 10000,
        MIN_FOOTER_SIZE,
        MIN_FOOTER_SIZE - 1,
        file_size + 1,
    ];
    if let Some(hint) = footer_size.checked_sub(10000) {
        hints.push(hint);
    }

    for hint in hints {
        let input = InMemoryInputFile::new(contents.clone());
        let mut reader = PuffinFileReader::open(&input).with_footer_size(hint);
        let err = reader.get_blobs().unwrap_err();
        assert_eq!(err.kind(), expect_kind(hint), "hint: {hint}");
        // the hint poisons every subsequent operation the same way
        let err = reader.get_blobs().unwrap_err();
        assert_eq!(err.kind(), expect_kind(hint), "hint: {hint}");
    }

    // the exact footer size still works
    let input = InMemoryInputFile::new(contents);
    let mut reader = PuffinFileReader::open(&input).with_footer_size(footer_size);
    let blobs = reader.get_blobs().unwrap();
    assert_eq!(blobs.len(), 2);
    assert_eq!(
        reader.properties().get("created-by"),
        Some(&"Test 1234".to_string())
    );
}

#[test]
fn test_byte_exact_rewrite() {
    let output = InMemoryOutputFile::new();
    let mut writer = PuffinWriteBuilder::new(output.clone())
        .created_by("Test 1234")
        .set("writer-version", "1")
        .compress_footer()
        .compress_blobs(CompressionCodec::Zstd)
        .build()
        .unwrap();
    write_sample_blobs(&mut writer);
    writer.close().unwrap();
    let original = output.contents();

    let input = InMemoryInputFile::new(original.clone());
    let mut reader = PuffinFileReader::open(&input);
    let blobs = reader.get_blobs().unwrap();
    let properties = reader.properties().clone();
    let payloads: Vec<Vec<u8>> = blobs
        .iter()
        .map(|blob| reader.read_blob(blob).unwrap())
        .collect();

    let rewritten = InMemoryOutputFile::new();
    let mut writer = PuffinWriteBuilder::new(rewritten.clone())
        .set_all(properties)
        .compress_footer()
        .compress_blobs(CompressionCodec::Zstd)
        .build()
        .unwrap();
    for (blob, payload) in blobs.iter().zip(payloads) {
        writer
            .write_blob(
                Blob::new(
                    blob.blob_type.clone(),
                    blob.input_fields.clone(),
                    blob.snapshot_id,
                    blob.sequence_number,
                    payload,
                )
                .unwrap(),
            )
            .unwrap();
    }
    writer.close().unwrap();

    assert_eq!(rewritten.contents(), original);
}

#[test]
fn test_blob_recovery() {
    let output = InMemoryOutputFile::new();
    let mut writer = PuffinWriteBuilder::new(output.clone()).build().unwrap();

    let payloads: Vec<Vec<u8>> = (1u8..=5)
        .map(|i| (0..i as usize * 17).map(|b| b as u8 ^ i).collect())
        .collect();
    for (i, payload) in payloads.iter().enumerate() {
        writer
            .write_blob(
                Blob::new(format!("blob-{i}"), vec![i as i32 + 1], 2, 1, payload.clone()).unwrap(),
            )
            .unwrap();
    }
    writer.close().unwrap();

    let input = InMemoryInputFile::new(output.contents());
    let mut reader = PuffinFileReader::open(&input);
    let blobs = reader.get_blobs().unwrap();
    assert_eq!(blobs.len(), payloads.len());
    for (blob, payload) in blobs.iter().zip(&payloads) {
        assert_eq!(&reader.read_blob(blob).unwrap(), payload);
    }
}

#[test]
fn test_footer_size_consistency() {
    let output = InMemoryOutputFile::new();
    let mut writer = PuffinWriteBuilder::new(output.clone())
        .created_by("Test 1234")
        .build()
        .unwrap();
    write_sample_blobs(&mut writer);
    writer.close().unwrap();
    let writer_footer_size = writer.footer_size().unwrap();

    // a reader given the writer-reported footer size finds a well-formed
    // footer, so discovery and the writer agree
    let input = InMemoryInputFile::new(output.contents());
    let mut reader = PuffinFileReader::open(&input).with_footer_size(writer_footer_size);
    assert_eq!(reader.get_blobs().unwrap().len(), 2);

    let mut reader = PuffinFileReader::open(&input)
        .with_file_size(writer.file_size().unwrap())
        .with_footer_size(writer_footer_size);
    assert_eq!(reader.get_blobs().unwrap().len(), 2);
}

#[test]
fn test_tampered_files_rejected() {
    let output = InMemoryOutputFile::new();
    let mut writer = PuffinWriteBuilder::new(output.clone())
        .created_by("Test 1234")
        .build()
        .unwrap();
    write_sample_blobs(&mut writer);
    writer.close().unwrap();
    let footer_size = writer.footer_size().unwrap() as usize;
    let contents = output.contents();

    let open = |bytes: Vec<u8>| {
        let input = InMemoryInputFile::new(bytes);
        PuffinFileReader::open(&input)
    };

    // footer start magic
    let mut tampered = contents.clone();
    let footer_start = tampered.len() - footer_size;
    tampered[footer_start] ^= 0xff;
    let err = open(tampered).get_blobs().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidMagic);

    // trailer magic
    let mut tampered = contents.clone();
    let len = tampered.len();
    tampered[len - 1] ^= 0xff;
    let err = open(tampered).get_blobs().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidMagic);

    // payload size field, pointing past the file
    let mut tampered = contents.clone();
    let payload_size_offset = len - 16;
    tampered[payload_size_offset..payload_size_offset + 4]
        .copy_from_slice(&u32::MAX.to_le_bytes());
    let err = open(tampered).get_blobs().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFileLength);

    // payload size field, off by one
    let mut tampered = contents.clone();
    tampered[payload_size_offset] = tampered[payload_size_offset].wrapping_sub(1);
    let err = open(tampered).get_blobs().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidMagic);

    // footer json
    let mut tampered = contents.clone();
    tampered[footer_start + 4] = b'X';
    let err = open(tampered).get_blobs().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFooterPayload);

    // truncation
    let err = open(contents[..10].to_vec()).get_blobs().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFileLength);
}

#[test]
fn test_writer_state_machine() {
    let output = InMemoryOutputFile::new();
    let mut writer = PuffinWriteBuilder::new(output.clone()).build().unwrap();
    write_sample_blobs(&mut writer);
    writer.close().unwrap();

    // closing again is a no-op success
    writer.close().unwrap();
    assert_eq!(writer.written_blobs_metadata().len(), 2);

    let err = writer
        .write_blob(Blob::new("late", vec![1], 2, 1, b"zzz".to_vec()).unwrap())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[test]
fn test_reader_close_releases_stream() {
    let output = InMemoryOutputFile::new();
    let mut writer = PuffinWriteBuilder::new(output.clone()).build().unwrap();
    write_sample_blobs(&mut writer);
    writer.close().unwrap();

    let input = InMemoryInputFile::new(output.contents());
    let mut reader = PuffinFileReader::open(&input);
    let blobs = reader.get_blobs().unwrap();
    reader.close().unwrap();

    let err = reader.read_blob(&blobs[0]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StreamNotInitialized);
    let err = reader.get_blobs().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StreamNotInitialized);
}

#[test]
fn test_fs_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.puffin");

    let mut writer = PuffinWriteBuilder::new(FsOutputFile::new(&path))
        .created_by("Test 1234")
        .compress_blobs(CompressionCodec::Zstd)
        .build()
        .unwrap();
    write_sample_blobs(&mut writer);
    writer.close().unwrap();
    assert_eq!(writer.file_size().unwrap(), std::fs::metadata(&path).unwrap().len());

    let input = FsInputFile::new(&path);
    let mut reader = PuffinFileReader::open(&input);
    let blobs = reader.get_blobs().unwrap();
    assert_eq!(blobs.len(), 2);
    assert_eq!(reader.read_blob(&blobs[0]).unwrap(), FIRST_BLOB);
    assert_eq!(reader.read_blob(&blobs[1]).unwrap(), SECOND_BLOB);
    reader.close().unwrap();
}

#[test]
fn test_reader_over_missing_file_is_poisoned() {
    let dir = tempfile::tempdir().unwrap();
    let input = FsInputFile::new(dir.path().join("missing.puffin"));
    let mut reader = PuffinFileReader::open(&input);
    let err = reader.get_blobs().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StreamNotInitialized);
    assert!(reader.properties().is_empty());
}
