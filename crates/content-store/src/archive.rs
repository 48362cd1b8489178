//! Member extraction from gzip, tar and zip payloads.

use std::io::{Cursor, Read};

use flate2::read::GzDecoder;
use zip::result::ZipError;
use zip::ZipArchive;

use dweather_common::{DWeatherError, DWeatherResult};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decompress a gzip payload.
pub fn gunzip(bytes: &[u8]) -> DWeatherResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| DWeatherError::data_malformed(format!("gzip decode failed: {}", e)))?;
    Ok(out)
}

/// Decompress if the payload carries the gzip magic bytes, else return it unchanged.
pub fn maybe_gunzip(bytes: &[u8]) -> DWeatherResult<Vec<u8>> {
    if is_gzip(bytes) {
        gunzip(bytes)
    } else {
        Ok(bytes.to_vec())
    }
}

pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[..2] == GZIP_MAGIC
}

/// Extract one member of a tar archive by name. A leading `./` in member paths is ignored.
pub fn tar_member(bytes: &[u8], name: &str) -> DWeatherResult<Option<Vec<u8>>> {
    let wanted = name.trim_start_matches("./");
    let mut archive = tar::Archive::new(bytes);
    let entries = archive
        .entries()
        .map_err(|e| DWeatherError::data_malformed(format!("tar read failed: {}", e)))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| DWeatherError::data_malformed(format!("tar entry: {}", e)))?;
        let matches = entry
            .path()
            .map(|p| p.to_string_lossy().trim_start_matches("./") == wanted)
            .unwrap_or(false);

        if matches {
            let mut out = Vec::new();
            entry.read_to_end(&mut out).map_err(|e| {
                DWeatherError::data_malformed(format!("tar member {}: {}", name, e))
            })?;
            return Ok(Some(out));
        }
    }

    Ok(None)
}

/// Extract one member of a zip archive by name.
pub fn zip_member(bytes: &[u8], name: &str) -> DWeatherResult<Option<Vec<u8>>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| DWeatherError::data_malformed(format!("zip read failed: {}", e)))?;

    let mut file = match archive.by_name(name.trim_start_matches("./")) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(DWeatherError::data_malformed(format!(
                "zip member {}: {}",
                name, e
            )))
        }
    };

    let mut out = Vec::new();
    file.read_to_end(&mut out)
        .map_err(|e| DWeatherError::data_malformed(format!("zip member {}: {}", name, e)))?;
    Ok(Some(out))
}

/// Extract `member` from the archive file `archive_name`.
///
/// `.zip` files are read as zip archives; anything else as a tar archive, which
/// may itself be gzip-compressed.
pub fn archive_member(
    archive_name: &str,
    bytes: &[u8],
    member: &str,
) -> DWeatherResult<Option<Vec<u8>>> {
    if archive_name.ends_with(".zip") {
        zip_member(bytes, member)
    } else {
        tar_member(&maybe_gunzip(bytes)?, member)
    }
}
