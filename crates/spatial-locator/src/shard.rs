//! Shard addressing inside a snapshot.
//!
//! Chain roots usually hold shards as top-level files. Every later snapshot packs
//! the shards of one latitude row (or one chunk of an irregular grid) into an
//! archive, and the shard is read as a member of that archive. Some datasets
//! archive the root as well.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use dweather_common::Coordinate;

/// Container format of a row archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    /// `{row}.tar`, with `{row}.zip` read when the tar is absent.
    #[default]
    Tar,
    /// `{row}.zip` only.
    Zip,
}

impl ArchiveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::Zip => "zip",
        }
    }
}

/// Location of one shard within a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShardKey {
    /// Archive file holding the shard.
    pub archive: String,
    /// Archive read instead when `archive` does not exist.
    pub fallback: Option<String>,
    /// File name of the shard itself.
    pub member: String,
    /// Whether a chain root stores `member` as a top-level file.
    pub direct_at_root: bool,
}

impl ShardKey {
    pub fn new(archive: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            archive: archive.into(),
            fallback: None,
            member: member.into(),
            direct_at_root: true,
        }
    }

    /// A shard that only ever lives inside its archive.
    pub fn archived(archive: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            direct_at_root: false,
            ..Self::new(archive, member)
        }
    }

    /// Read `{stem}.zip` when a `{stem}.tar` archive is absent.
    pub fn with_zip_fallback(mut self) -> Self {
        self.fallback = self
            .archive
            .strip_suffix(".tar")
            .map(|stem| format!("{}.zip", stem));
        self
    }

    /// Whether to read `member` directly given the snapshot's position in its chain.
    pub fn reads_directly(&self, is_root: bool) -> bool {
        is_root && self.direct_at_root
    }

    /// Archive files to try, in order.
    pub fn archives(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.archive.as_str()).chain(self.fallback.as_deref())
    }
}

impl std::fmt::Display for ShardKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.archive, self.member)
    }
}

/// Payload layout of a gridded shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardEncoding {
    /// Gzip-compressed comma/newline separated text, `{lat}_{lon}.gz`.
    #[default]
    Text,
    /// Uncompressed little-endian float32 values, `{lat}_{lon}`.
    F32,
}

/// Formats snapped coordinates into shard file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardNaming {
    pub precision: u32,
    /// Minimum field width, zero padded, for datasets that publish padded names.
    pub zero_pad: Option<usize>,
    pub encoding: ShardEncoding,
    pub archive: ArchiveFormat,
    /// Whether chain roots pack their shards like every later snapshot.
    pub archived_at_root: bool,
}

impl ShardNaming {
    pub fn new(precision: u32) -> Self {
        Self {
            precision,
            zero_pad: None,
            encoding: ShardEncoding::Text,
            archive: ArchiveFormat::Tar,
            archived_at_root: false,
        }
    }

    pub fn with_zero_pad(mut self, width: Option<usize>) -> Self {
        self.zero_pad = width;
        self
    }

    pub fn with_encoding(mut self, encoding: ShardEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_archive(mut self, format: ArchiveFormat, archived_at_root: bool) -> Self {
        self.archive = format;
        self.archived_at_root = archived_at_root;
        self
    }

    fn format_component(&self, value: f64) -> String {
        let prec = self.precision as usize;
        match self.zero_pad {
            Some(width) => format!("{:0width$.prec$}", value, width = width, prec = prec),
            None => format!("{:.prec$}", value, prec = prec),
        }
    }

    /// Shard key for a snapped grid point.
    pub fn key(&self, snapped: Coordinate) -> ShardKey {
        let lat = self.format_component(snapped.lat);
        let lon = self.format_component(snapped.lon);
        let member = match self.encoding {
            ShardEncoding::Text => format!("{}_{}.gz", lat, lon),
            ShardEncoding::F32 => format!("{}_{}", lat, lon),
        };
        let archive = format!("{}.{}", lat, self.archive.extension());
        let key = if self.archived_at_root {
            ShardKey::archived(archive, member)
        } else {
            ShardKey::new(archive, member)
        };
        key.with_zip_fallback()
    }
}

/// Shard key for one forecast day; forecast shards are always in a zip archive.
pub fn forecast_key(forecast_date: NaiveDate, snapped: Coordinate) -> ShardKey {
    let day = forecast_date.format("%Y%m%d");
    ShardKey::archived(
        format!("{}_{:.2}.zip", day, snapped.lat),
        format!("{}_{:.2}_{:.2}", day, snapped.lat, snapped.lon),
    )
}

/// Member name of an irregular-grid column.
pub fn irregular_member(x: u32, y: u32) -> String {
    format!("{:04}_{:04}.gz", x, y)
}
