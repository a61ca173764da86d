/// Format extractors and dispatch by file extension
///
/// Each extractor wraps one header reader and returns its raw key/value
/// metadata, prefixed with the file name and extension. Dispatch goes through
/// a single extension table; an unknown extension is rejected before the file
/// is opened.

use std::fmt;
use std::path::Path;

use crate::data::raw::RawMetadataRecord;
use crate::data::{czi, lif, nd2};
use crate::error::{ReadmeError, Result};

/// Supported microscope image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Czi,
    Lif,
    Nd2,
}

impl ImageFormat {
    pub fn label(&self) -> &'static str {
        match self {
            ImageFormat::Czi => "Zeiss CZI",
            ImageFormat::Lif => "Leica LIF",
            ImageFormat::Nd2 => "Nikon ND2",
        }
    }

    /// Lower-case extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Czi => "czi",
            ImageFormat::Lif => "lif",
            ImageFormat::Nd2 => "nd2",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub trait MetadataExtractor {
    fn format(&self) -> ImageFormat;

    /// Read the header of `path` and return its raw metadata.
    fn extract(&self, path: &Path) -> Result<RawMetadataRecord>;
}

pub struct CziExtractor;
pub struct LifExtractor;
pub struct Nd2Extractor;

impl MetadataExtractor for CziExtractor {
    fn format(&self) -> ImageFormat {
        ImageFormat::Czi
    }

    fn extract(&self, path: &Path) -> Result<RawMetadataRecord> {
        let record = czi::read_metadata(path).map_err(|e| ReadmeError::extraction(self.format(), e))?;
        Ok(with_file_info(path, self.format(), record))
    }
}

impl MetadataExtractor for LifExtractor {
    fn format(&self) -> ImageFormat {
        ImageFormat::Lif
    }

    fn extract(&self, path: &Path) -> Result<RawMetadataRecord> {
        let record = lif::read_metadata(path).map_err(|e| ReadmeError::extraction(self.format(), e))?;
        Ok(with_file_info(path, self.format(), record))
    }
}

impl MetadataExtractor for Nd2Extractor {
    fn format(&self) -> ImageFormat {
        ImageFormat::Nd2
    }

    fn extract(&self, path: &Path) -> Result<RawMetadataRecord> {
        let record = nd2::read_metadata(path).map_err(|e| ReadmeError::extraction(self.format(), e))?;
        Ok(with_file_info(path, self.format(), record))
    }
}

/// extension → extractor
const EXTENSION_TABLE: &[(&str, &dyn MetadataExtractor)] = &[
    ("czi", &CziExtractor),
    ("lif", &LifExtractor),
    ("nd2", &Nd2Extractor),
];

pub fn supported_extensions() -> impl Iterator<Item = &'static str> {
    EXTENSION_TABLE.iter().map(|(ext, _)| *ext)
}

/// Pick the extractor for a path by its extension (case-insensitive).
pub fn extractor_for(path: &Path) -> Result<&'static dyn MetadataExtractor> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    EXTENSION_TABLE
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, extractor)| *extractor)
        .ok_or_else(|| ReadmeError::UnsupportedFormat {
            extension: if ext.is_empty() {
                "(none)".to_string()
            } else {
                format!(".{}", ext)
            },
        })
}

/// Dispatch and extract in one step.
pub fn extract(path: &Path) -> Result<(ImageFormat, RawMetadataRecord)> {
    let extractor = extractor_for(path)?;
    let format = extractor.format();
    log::info!("Extracting {} metadata from {}", format, path.display());
    let record = extractor.extract(path)?;
    log::info!("Extracted {} metadata entries", record.len());
    Ok((format, record))
}

fn with_file_info(path: &Path, format: ImageFormat, record: RawMetadataRecord) -> RawMetadataRecord {
    let mut out = RawMetadataRecord::new();
    out.insert_present(
        "File Name",
        path.file_name().map(|n| n.to_string_lossy().into_owned()),
    );
    out.insert("File Extension", format!(".{}", format.extension()));
    for (key, value) in record.iter() {
        out.insert(key, value.clone());
    }
    out
}
