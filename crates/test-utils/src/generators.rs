//! Shard payload generators.
//!
//! Published shards are comma-separated decimal strings, one line per year,
//! optionally gzip-compressed and packed into tar or zip archives.

use std::io::{Cursor, Write};

use flate2::write::GzEncoder;
use flate2::Compression;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Gzip-compress a payload.
pub fn gzip_bytes(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .expect("writing to an in-memory gzip encoder");
    encoder.finish().expect("finishing an in-memory gzip encoder")
}

/// Pack named members into an uncompressed tar archive.
pub fn tar_bytes(members: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, data.as_slice())
            .expect("appending to an in-memory tar archive");
    }
    builder.into_inner().expect("finishing an in-memory tar archive")
}

/// Pack named members into a zip archive, stored without compression.
pub fn zip_bytes(members: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, data) in members {
        writer
            .start_file(*name, options)
            .expect("starting an in-memory zip member");
        writer
            .write_all(data)
            .expect("writing an in-memory zip member");
    }
    writer
        .finish()
        .expect("finishing an in-memory zip archive")
        .into_inner()
}

/// Join values as one comma-separated line.
pub fn text_shard(values: &[&str]) -> String {
    values.join(",")
}

/// Join values into lines of at most `per_line` entries, newline-separated.
pub fn text_shard_lines(values: &[&str], per_line: usize) -> String {
    values
        .chunks(per_line.max(1))
        .map(|chunk| chunk.join(","))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Sequential decimal values `start, start + step, ...` formatted with `decimals` places.
pub fn sequential_values(count: usize, start: f64, step: f64, decimals: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("{:.*}", decimals, start + step * i as f64))
        .collect()
}

/// Little-endian float32 payload.
pub fn f32_le_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}
