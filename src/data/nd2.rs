/// Nikon ND2 header reader (v2/v3 chunked files)
///
/// Every chunk starts with a 16-byte header:
///   u32  magic 0x0ABECEDA
///   u32  name length (bytes)
///   u64  data length
/// followed by the chunk name (ending in '!') and the data. The last 40 bytes
/// of the file are the chunk map signature and the u64 position of the chunk
/// map, which lists `name!` + u64 position + u64 size for every chunk.
///
/// Metadata chunks are stored in the "LV" variant encoding, a tree of typed,
/// UTF-16 named items. Legacy JPEG2000 based ND2 files are not supported.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use super::header::{magic_read_error, read_block, utf16le_to_string, HeaderError};
use super::raw::{format_number, RawMetadataRecord};

pub const CHUNK_MAGIC: u32 = 0x0ABE_CEDA;
/// First four bytes of a JPEG2000 container (legacy ND2)
pub const JP2_MAGIC: [u8; 4] = [0x00, 0x00, 0x00, 0x0C];
pub const CHUNK_MAP_SIGNATURE: &[u8; 32] = b"ND2 CHUNK MAP SIGNATURE 0000001!";

pub const TEXT_INFO: &str = "ImageTextInfoLV!";
pub const ATTRIBUTES: &str = "ImageAttributesLV!";
pub const EXPERIMENT: &str = "ImageMetadataLV!";
pub const FRAME_METADATA: &str = "ImageMetadataSeqLV|0!";

// ────────────────────────────────────────────────────────────────
// LV variant tree
// ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum LvValue {
    Bool(bool),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    Level(Vec<(String, LvValue)>),
}

impl LvValue {
    /// Child of a level, matched on the name without its type prefix
    /// ("uiWidth" matches "Width").
    pub fn get(&self, name: &str) -> Option<&LvValue> {
        match self {
            LvValue::Level(items) => items
                .iter()
                .find(|(k, _)| strip_prefix(k) == name)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// First value named `name` anywhere in the tree, depth first.
    pub fn find(&self, name: &str) -> Option<&LvValue> {
        let items = match self {
            LvValue::Level(items) => items,
            _ => return None,
        };
        for (k, v) in items {
            if strip_prefix(k) == name {
                return Some(v);
            }
            if let Some(found) = v.find(name) {
                return Some(found);
            }
        }
        None
    }

    pub fn children(&self) -> &[(String, LvValue)] {
        match self {
            LvValue::Level(items) => items,
            _ => &[],
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            LvValue::I32(v) => Some(v as f64),
            LvValue::U32(v) => Some(v as f64),
            LvValue::I64(v) => Some(v as f64),
            LvValue::U64(v) => Some(v as f64),
            LvValue::F64(v) if v.is_finite() => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            LvValue::Str(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            LvValue::Bool(b) => Some(b.to_string()),
            LvValue::Bytes(_) | LvValue::Level(_) => None,
            number => number.as_f64().map(format_number),
        }
    }
}

/// Drop the lower-case type prefix Nikon puts in front of item names.
pub fn strip_prefix(name: &str) -> &str {
    name.trim_start_matches(|c: char| c.is_ascii_lowercase())
}

/// Decode an LV encoded chunk into a level holding its top item.
pub fn decode_lv(data: &[u8]) -> Result<LvValue, HeaderError> {
    let mut cursor = Cursor::new(data);
    let items = decode_items(&mut cursor, 1)?;
    Ok(LvValue::Level(items))
}

fn decode_items(cursor: &mut Cursor<&[u8]>, count: usize) -> Result<Vec<(String, LvValue)>, HeaderError> {
    let mut items = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let item_start = cursor.position();
        let data_type = match cursor.read_u8() {
            Ok(t) => t,
            // Writers sometimes over-report level item counts
            Err(_) => break,
        };
        let name_chars = cursor.read_u8()? as usize;
        let mut name_bytes = vec![0u8; name_chars * 2];
        cursor.read_exact(&mut name_bytes)?;
        let name = utf16le_to_string(&name_bytes);

        let value = match data_type {
            1 => LvValue::Bool(cursor.read_u8()? != 0),
            2 => LvValue::I32(cursor.read_i32::<LittleEndian>()?),
            3 => LvValue::U32(cursor.read_u32::<LittleEndian>()?),
            4 => LvValue::I64(cursor.read_i64::<LittleEndian>()?),
            5 | 7 => LvValue::U64(cursor.read_u64::<LittleEndian>()?),
            6 => LvValue::F64(cursor.read_f64::<LittleEndian>()?),
            8 => LvValue::Str(read_utf16z(cursor)?),
            9 => {
                let len = cursor.read_u64::<LittleEndian>()?;
                if len > remaining(cursor) {
                    return Err(HeaderError::Corrupt(format!(
                        "byte array '{}' of {} bytes overruns its chunk",
                        name, len
                    )));
                }
                let mut bytes = vec![0u8; len as usize];
                cursor.read_exact(&mut bytes)?;
                LvValue::Bytes(bytes)
            }
            11 => {
                let child_count = cursor.read_u32::<LittleEndian>()? as usize;
                let length = cursor.read_u64::<LittleEndian>()?;
                let consumed = cursor.position() - item_start;
                let nested_len = length.checked_sub(consumed).ok_or_else(|| {
                    HeaderError::Corrupt(format!("level '{}' has invalid length {}", name, length))
                })?;
                if nested_len > remaining(cursor) {
                    return Err(HeaderError::Corrupt(format!(
                        "level '{}' overruns its chunk",
                        name
                    )));
                }
                let start = cursor.position() as usize;
                let end = start + nested_len as usize;
                let nested = &cursor.get_ref()[start..end];
                let children = decode_items(&mut Cursor::new(nested), child_count)?;
                // Skip the nested data and the per-item offset table
                cursor.set_position(end as u64 + child_count as u64 * 8);
                LvValue::Level(children)
            }
            other => {
                return Err(HeaderError::Unsupported(format!(
                    "LV item '{}' has unknown type {}",
                    name, other
                )))
            }
        };
        items.push((name, value));
    }
    Ok(items)
}

fn remaining(cursor: &Cursor<&[u8]>) -> u64 {
    (cursor.get_ref().len() as u64).saturating_sub(cursor.position())
}

fn read_utf16z(cursor: &mut Cursor<&[u8]>) -> Result<String, HeaderError> {
    let mut units = Vec::new();
    loop {
        let u = cursor.read_u16::<LittleEndian>()?;
        if u == 0 {
            break;
        }
        units.push(u);
    }
    Ok(String::from_utf16_lossy(&units))
}

// ────────────────────────────────────────────────────────────────
// Chunk access
// ────────────────────────────────────────────────────────────────

/// One entry of the chunk map
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkEntry {
    pub name: String,
    pub position: u64,
    pub size: u64,
}

pub struct Nd2Reader<R> {
    reader: R,
    chunks: Vec<ChunkEntry>,
}

impl Nd2Reader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, HeaderError> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> Nd2Reader<R> {
    pub fn new(mut reader: R) -> Result<Self, HeaderError> {
        reader.seek(SeekFrom::Start(0))?;
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|e| magic_read_error("ND2", "file too short", e))?;
        if magic == JP2_MAGIC {
            return Err(HeaderError::Unsupported(
                "legacy JPEG2000 ND2 files cannot be read".to_string(),
            ));
        }
        if u32::from_le_bytes(magic) != CHUNK_MAGIC {
            return Err(HeaderError::BadMagic {
                format: "ND2",
                reason: "missing chunk magic".to_string(),
            });
        }

        let file_len = reader.seek(SeekFrom::End(0))?;
        if file_len < 40 {
            return Err(HeaderError::Corrupt("file has no chunk map".to_string()));
        }
        reader.seek(SeekFrom::Start(file_len - 40))?;
        let mut signature = [0u8; 32];
        reader.read_exact(&mut signature)?;
        if &signature != CHUNK_MAP_SIGNATURE {
            return Err(HeaderError::Corrupt(
                "chunk map signature not found at end of file".to_string(),
            ));
        }
        let map_position = reader.read_u64::<LittleEndian>()?;

        let map_data = read_chunk_at(&mut reader, map_position)?;
        let chunks = parse_chunk_map(&map_data)?;
        log::debug!("ND2 chunk map lists {} chunks", chunks.len());
        Ok(Self { reader, chunks })
    }

    /// Raw data of a named chunk, `None` when the file has no such chunk
    pub fn chunk(&mut self, name: &str) -> Result<Option<Vec<u8>>, HeaderError> {
        let position = match self.chunks.iter().find(|c| c.name == name) {
            Some(entry) => entry.position,
            None => return Ok(None),
        };
        read_chunk_at(&mut self.reader, position).map(Some)
    }

    /// Decoded LV tree of a named chunk
    pub fn lv_chunk(&mut self, name: &str) -> Result<Option<LvValue>, HeaderError> {
        match self.chunk(name)? {
            Some(data) => decode_lv(&data).map(Some),
            None => Ok(None),
        }
    }
}

fn read_chunk_at<R: Read + Seek>(reader: &mut R, position: u64) -> Result<Vec<u8>, HeaderError> {
    reader.seek(SeekFrom::Start(position))?;
    let magic = reader.read_u32::<LittleEndian>()?;
    if magic != CHUNK_MAGIC {
        return Err(HeaderError::Corrupt(format!(
            "no chunk header at offset {}",
            position
        )));
    }
    let name_len = reader.read_u32::<LittleEndian>()? as u64;
    let data_len = reader.read_u64::<LittleEndian>()?;
    read_block(reader, position + 16 + name_len, data_len)
}

fn parse_chunk_map(data: &[u8]) -> Result<Vec<ChunkEntry>, HeaderError> {
    let mut entries = Vec::new();
    let mut i = 0usize;
    while i < data.len() {
        let end = match data[i..].iter().position(|&b| b == b'!') {
            Some(offset) => i + offset + 1,
            None => break,
        };
        let name = &data[i..end];
        if name == CHUNK_MAP_SIGNATURE {
            break;
        }
        if end + 16 > data.len() {
            return Err(HeaderError::Corrupt(format!(
                "chunk map entry '{}' is truncated",
                String::from_utf8_lossy(name)
            )));
        }
        let mut cursor = Cursor::new(&data[end..end + 16]);
        let position = cursor.read_u64::<LittleEndian>()?;
        let size = cursor.read_u64::<LittleEndian>()?;
        entries.push(ChunkEntry {
            name: String::from_utf8_lossy(name).into_owned(),
            position,
            size,
        });
        i = end + 16;
    }
    Ok(entries)
}

// ────────────────────────────────────────────────────────────────
// Summary
// ────────────────────────────────────────────────────────────────

/// Text info slots in the order Nikon numbers them
const TEXT_INFO_ITEMS: &[(&str, &str)] = &[
    ("TextInfoItem_4", "Author"),
    ("TextInfoItem_5", "Description"),
    ("TextInfoItem_6", "Capturing"),
    ("TextInfoItem_9", "Date"),
    ("TextInfoItem_13", "Optics"),
];

/// Older files name the text info items directly
const TEXT_INFO_NAMES: &[(&str, &str)] = &[
    ("Author", "Author"),
    ("Description", "Description"),
    ("Capturing", "Capturing"),
    ("Date", "Date"),
    ("Optics", "Optics"),
    ("AppVersion", "Software Version"),
];

/// Experiment loop types
const LOOP_TIME: f64 = 1.0;
const LOOP_XY: f64 = 2.0;
const LOOP_Z: f64 = 4.0;
const LOOP_NETIME: f64 = 8.0;

pub fn read_metadata(path: &Path) -> Result<RawMetadataRecord, HeaderError> {
    let mut reader = Nd2Reader::open(path)?;
    read_metadata_from(&mut reader)
}

pub fn read_metadata_from<R: Read + Seek>(reader: &mut Nd2Reader<R>) -> Result<RawMetadataRecord, HeaderError> {
    let text_info = reader.lv_chunk(TEXT_INFO)?;
    let attributes = reader.lv_chunk(ATTRIBUTES)?;
    let experiment = reader.lv_chunk(EXPERIMENT)?;
    let frame = reader.lv_chunk(FRAME_METADATA)?;
    Ok(summarize(
        text_info.as_ref(),
        attributes.as_ref(),
        experiment.as_ref(),
        frame.as_ref(),
    ))
}

pub fn summarize(
    text_info: Option<&LvValue>,
    attributes: Option<&LvValue>,
    experiment: Option<&LvValue>,
    frame: Option<&LvValue>,
) -> RawMetadataRecord {
    let mut out = RawMetadataRecord::new();

    if let Some(text_info) = text_info {
        for (item, key) in TEXT_INFO_ITEMS {
            out.insert_present(key, text_info.find(item).and_then(LvValue::as_text));
        }
        for (item, key) in TEXT_INFO_NAMES {
            if !out.contains_key(key) {
                out.insert_present(key, text_info.find(item).and_then(LvValue::as_text));
            }
        }
    }

    if let Some(frame) = frame {
        let text = |name: &str| frame.find(name).and_then(LvValue::as_text);
        let number = |name: &str| frame.find(name).and_then(LvValue::as_f64);

        out.insert_present("Microscope Name", text("MicroscopeName"));
        out.insert_present("Objective Model", text("ObjectiveName"));
        out.insert_present("Objective Magnification", number("ObjectiveMag"));
        out.insert_present("Objective NA", number("ObjectiveNA"));
        out.insert_present("Refractive Index", number("RefractIndex1"));
        out.insert_present("Zoom", number("Zoom"));

        let channels: Vec<String> = frame
            .find("PlaneNew")
            .or_else(|| frame.find("Plane"))
            .map(|planes| {
                planes
                    .children()
                    .iter()
                    .filter_map(|(_, plane)| plane.get("Description").and_then(LvValue::as_text))
                    .collect()
            })
            .unwrap_or_default();
        out.insert_present("Channel Names", Some(channels));
    }

    if let Some(attributes) = attributes {
        out.insert_present("Width", attributes.find("Width").and_then(LvValue::as_f64));
        out.insert_present("Height", attributes.find("Height").and_then(LvValue::as_f64));
        out.insert_present("Components", attributes.find("Comp").and_then(LvValue::as_f64));
        out.insert_present(
            "Sequence Count",
            attributes.find("SequenceCount").and_then(LvValue::as_f64),
        );
        // A file without loops is a single plane
        out.insert("Time Points", 1.0);
        out.insert("Z Slices", 1.0);
    }

    if let Some(experiment) = experiment {
        let mut loops = Vec::new();
        collect_loops(experiment, &mut loops);
        for (loop_type, count) in loops {
            let key = if loop_type == LOOP_TIME || loop_type == LOOP_NETIME {
                "Time Points"
            } else if loop_type == LOOP_Z {
                "Z Slices"
            } else if loop_type == LOOP_XY {
                "XY Positions"
            } else {
                continue;
            };
            out.insert(key, count);
        }
    }

    out
}

/// (loop type, count) for every experiment level, outermost first
fn collect_loops(level: &LvValue, out: &mut Vec<(f64, f64)>) {
    let loop_type = level.get("Type").and_then(LvValue::as_f64);
    let count = level
        .get("LoopPars")
        .and_then(|p| p.get("Count"))
        .and_then(LvValue::as_f64);
    if let (Some(t), Some(c)) = (loop_type, count) {
        out.push((t, c));
    }
    for (_, child) in level.children() {
        if matches!(child, LvValue::Level(_)) {
            collect_loops(child, out);
        }
    }
}
