/// Zeiss CZI header reader
///
/// A CZI file is a sequence of ZISRAW segments. Each segment starts with a
/// 32-byte header (16-byte ASCII id, allocated size, used size). The first
/// segment, `ZISRAWFILE`, stores the absolute position of the
/// `ZISRAWMETADATA` segment, whose payload is a 256-byte block (XML size,
/// attachment size, spare) followed by the UTF-8 XML document that carries
/// every instrument and acquisition setting. Only that document is read;
/// subblocks (pixel data) are never touched.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use super::header::{ascii_id, magic_read_error, read_block, HeaderError};
use super::raw::RawMetadataRecord;
use super::xml::Element;

pub const FILE_SEGMENT_ID: &str = "ZISRAWFILE";
pub const METADATA_SEGMENT_ID: &str = "ZISRAWMETADATA";

/// Size of a segment header (id + allocated size + used size)
const SEGMENT_HEADER_LEN: u64 = 32;
/// Offset of the metadata position inside the ZISRAWFILE payload
const METADATA_POSITION_OFFSET: u64 = 60;
/// Fixed part of the ZISRAWMETADATA payload preceding the XML
const METADATA_HEADER_LEN: u64 = 256;

/// Read the embedded XML metadata document of a CZI file.
pub fn read_metadata_xml(path: &Path) -> Result<String, HeaderError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    read_metadata_xml_from(&mut reader)
}

pub fn read_metadata_xml_from<R: Read + Seek>(reader: &mut R) -> Result<String, HeaderError> {
    reader.seek(SeekFrom::Start(0))?;
    let mut id = [0u8; 16];
    reader
        .read_exact(&mut id)
        .map_err(|e| magic_read_error("CZI", "file shorter than a segment header", e))?;
    let id = ascii_id(&id);
    if id != FILE_SEGMENT_ID {
        return Err(HeaderError::BadMagic {
            format: "CZI",
            reason: format!("first segment is '{}', expected {}", id, FILE_SEGMENT_ID),
        });
    }

    reader.seek(SeekFrom::Start(SEGMENT_HEADER_LEN + METADATA_POSITION_OFFSET))?;
    let metadata_position = reader.read_i64::<LittleEndian>()?;
    if metadata_position <= 0 {
        return Err(HeaderError::Corrupt(
            "file header has no metadata segment".to_string(),
        ));
    }
    let metadata_position = metadata_position as u64;

    reader.seek(SeekFrom::Start(metadata_position))?;
    let mut id = [0u8; 16];
    reader.read_exact(&mut id)?;
    let id = ascii_id(&id);
    if id != METADATA_SEGMENT_ID {
        return Err(HeaderError::Corrupt(format!(
            "segment at {} is '{}', expected {}",
            metadata_position, id, METADATA_SEGMENT_ID
        )));
    }

    reader.seek(SeekFrom::Start(metadata_position + SEGMENT_HEADER_LEN))?;
    let xml_size = reader.read_i32::<LittleEndian>()?;
    if xml_size <= 0 {
        return Err(HeaderError::Corrupt("metadata segment is empty".to_string()));
    }

    let xml_offset = metadata_position + SEGMENT_HEADER_LEN + METADATA_HEADER_LEN;
    let bytes = read_block(reader, xml_offset, xml_size as u64)?;
    String::from_utf8(bytes)
        .map_err(|e| HeaderError::Corrupt(format!("metadata XML is not UTF-8: {}", e)))
}

/// Read a CZI file and summarize its metadata.
pub fn read_metadata(path: &Path) -> Result<RawMetadataRecord, HeaderError> {
    let xml = read_metadata_xml(path)?;
    let root = Element::parse(&xml)?;
    Ok(summarize(&root))
}

/// Pull the instrument, image and channel settings out of the XML tree.
pub fn summarize(root: &Element) -> RawMetadataRecord {
    let mut out = RawMetadataRecord::new();
    let meta = match root.child("Metadata") {
        Some(m) => m,
        None => return out,
    };
    let info = meta.child("Information");
    let image = info.and_then(|i| i.child("Image"));
    let instrument = info.and_then(|i| i.child("Instrument"));

    // ── Document / application ──
    if let Some(info) = info {
        out.insert_present("Document Name", info.text_at(&["Document", "Name"]));
        out.insert_present("Document User Name", info.text_at(&["Document", "UserName"]));
        out.insert_present("Document Creation Date", info.text_at(&["Document", "CreationDate"]));
        out.insert_present("Application Name", info.text_at(&["Application", "Name"]));
        out.insert_present("Application Version", info.text_at(&["Application", "Version"]));
    }

    // ── Microscope ──
    let microscope = instrument.and_then(|i| i.path(&["Microscopes", "Microscope"]));
    let microscope_model = microscope
        .and_then(|m| m.text_at(&["System"]).or_else(|| m.attr("Name")))
        .or_else(|| {
            meta.child("HardwareSetting")
                .and_then(|h| h.find_all("Device").into_iter().find_map(|d| d.attr("Name")))
        });
    out.insert_present("Microscope Model", microscope_model);

    // ── Image ──
    if let Some(image) = image {
        out.insert_present("Pixel Type", image.text_at(&["PixelType"]));
        for (key, tag) in [
            ("Size X", "SizeX"),
            ("Size Y", "SizeY"),
            ("Size Z", "SizeZ"),
            ("Size T", "SizeT"),
        ] {
            out.insert_present(key, image.text_at(&[tag]).and_then(parse_f64));
        }
    }

    let channels: Vec<&Element> = image
        .and_then(|i| i.path(&["Dimensions", "Channels"]))
        .map(|c| c.children_named("Channel").collect())
        .unwrap_or_default();
    if !channels.is_empty() {
        out.insert("Size C", channels.len() as f64);
    } else if let Some(size_c) = image.and_then(|i| i.text_at(&["SizeC"])).and_then(parse_f64) {
        out.insert("Size C", size_c);
    }

    // ── Scaling (metres → microns) ──
    if let Some(items) = meta.path(&["Scaling", "Items"]) {
        for distance in items.children_named("Distance") {
            let axis = match distance.attr("Id") {
                Some(a @ ("X" | "Y" | "Z")) => a,
                _ => continue,
            };
            if let Some(metres) = distance.text_at(&["Value"]).and_then(parse_f64) {
                out.insert(&format!("Pixel Size {} (um)", axis), round3(metres * 1e6));
            }
        }
    }

    // ── Objective ──
    let objective = instrument.and_then(|i| i.path(&["Objectives", "Objective"]));
    if let Some(obj) = objective {
        out.insert_present(
            "Objective Model",
            obj.text_at(&["Manufacturer", "Model"]).or_else(|| obj.attr("Name")),
        );
        out.insert_present("Objective NA", obj.text_at(&["LensNA"]).and_then(parse_f64).map(round3));
        out.insert_present(
            "Objective Magnification",
            obj.text_at(&["NominalMagnification"]).and_then(parse_f64).map(round3),
        );
    }
    let settings = image.and_then(|i| i.child("ObjectiveSettings"));
    out.insert_present(
        "Objective Refractive Index",
        settings
            .and_then(|s| s.text_at(&["RefractiveIndex"]))
            .and_then(parse_f64)
            .map(round3),
    );
    out.insert_present(
        "Immersion",
        settings
            .and_then(|s| s.text_at(&["Medium"]))
            .or_else(|| objective.and_then(|o| o.text_at(&["Immersion"]))),
    );

    // ── Channels ──
    if !channels.is_empty() {
        let collect = |f: &dyn Fn(&Element) -> Option<String>| -> Vec<String> {
            channels
                .iter()
                .map(|&c| f(c).unwrap_or_else(|| "N/A".to_string()))
                .collect()
        };
        let number = |tag: &'static str| {
            move |c: &Element| c.text_at(&[tag]).and_then(parse_f64).map(|v| super::raw::format_number(round3(v)))
        };
        out.insert_present(
            "Acquisition Modes",
            Some(collect(&|c| c.text_at(&["AcquisitionMode"]).map(str::to_string))),
        );
        out.insert_present(
            "Channel Names",
            Some(collect(&|c| c.attr("Name").map(str::to_string))),
        );
        out.insert_present(
            "Dye Names",
            Some(collect(&|c| c.text_at(&["Fluor"]).map(str::to_string))),
        );
        out.insert_present("Excitation Wavelengths", Some(collect(&number("ExcitationWavelength"))));
        out.insert_present("Emission Wavelengths", Some(collect(&number("EmissionWavelength"))));
    }

    out
}

fn parse_f64(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::{Cursor, Write};

    pub(crate) const SAMPLE_XML: &str = r#"<ImageDocument><Metadata>
  <Information>
    <Application><Name>ZEN 2.3 (black)</Name><Version>14.0.18.201</Version></Application>
    <Document><Name>cells_63x</Name><UserName>jdoe</UserName><CreationDate>2019-05-21T14:32:11.5361463+10:00</CreationDate></Document>
    <Image>
      <PixelType>Gray16</PixelType><SizeX>1024</SizeX><SizeY>1024</SizeY><SizeZ>21</SizeZ>
      <ObjectiveSettings><Medium>Oil</Medium><RefractiveIndex>1.518</RefractiveIndex></ObjectiveSettings>
      <Dimensions><Channels>
        <Channel Id="Channel:0" Name="DAPI"><AcquisitionMode>LaserScanningConfocalMicroscopy</AcquisitionMode><Fluor>DAPI</Fluor><ExcitationWavelength>405</ExcitationWavelength></Channel>
        <Channel Id="Channel:1" Name="AF488"><AcquisitionMode>LaserScanningConfocalMicroscopy</AcquisitionMode><Fluor>Alexa Fluor 488</Fluor><ExcitationWavelength>488</ExcitationWavelength></Channel>
      </Channels></Dimensions>
    </Image>
    <Instrument>
      <Microscopes><Microscope Id="Microscope:1" Name="Axio Observer"><System>LSM 880</System></Microscope></Microscopes>
      <Objectives><Objective Id="Objective:1" Name="Plan-Apochromat 63x/1.40 Oil DIC M27"><LensNA>1.4</LensNA><NominalMagnification>63</NominalMagnification></Objective></Objectives>
    </Instrument>
  </Information>
  <Scaling><Items><Distance Id="X"><Value>1.3178822554981574E-07</Value></Distance><Distance Id="Z"><Value>3.5E-07</Value></Distance></Items></Scaling>
</Metadata></ImageDocument>"#;

    /// Assemble a minimal CZI: file header segment, then a metadata segment.
    pub(crate) fn build_czi(xml: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        let metadata_position: i64 = 512;

        let mut id = [0u8; 16];
        id[..FILE_SEGMENT_ID.len()].copy_from_slice(FILE_SEGMENT_ID.as_bytes());
        buf.write_all(&id).unwrap();
        buf.write_i64::<LittleEndian>(480).unwrap();
        buf.write_i64::<LittleEndian>(80).unwrap();
        buf.write_i32::<LittleEndian>(1).unwrap(); // major
        buf.write_i32::<LittleEndian>(0).unwrap(); // minor
        buf.write_all(&[0u8; 8]).unwrap(); // reserved
        buf.write_all(&[0u8; 32]).unwrap(); // guids
        buf.write_i32::<LittleEndian>(0).unwrap(); // file part
        buf.write_i64::<LittleEndian>(0).unwrap(); // directory position
        buf.write_i64::<LittleEndian>(metadata_position).unwrap();
        buf.resize(metadata_position as usize, 0);

        let mut id = [0u8; 16];
        id[..METADATA_SEGMENT_ID.len()].copy_from_slice(METADATA_SEGMENT_ID.as_bytes());
        buf.write_all(&id).unwrap();
        buf.write_i64::<LittleEndian>(256 + xml.len() as i64).unwrap();
        buf.write_i64::<LittleEndian>(256 + xml.len() as i64).unwrap();
        buf.write_i32::<LittleEndian>(xml.len() as i32).unwrap();
        buf.write_i32::<LittleEndian>(0).unwrap();
        buf.write_all(&[0u8; 248]).unwrap();
        buf.write_all(xml.as_bytes()).unwrap();
        buf
    }

    #[test]
    fn test_reads_embedded_xml() {
        let bytes = build_czi("<ImageDocument/>");
        let xml = read_metadata_xml_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(xml, "<ImageDocument/>");
    }

    #[test]
    fn test_rejects_other_files() {
        let err = read_metadata_xml_from(&mut Cursor::new(b"II*\0not a czi file at all".to_vec()))
            .unwrap_err();
        assert!(matches!(err, HeaderError::BadMagic { format: "CZI", .. }));
    }

    #[test]
    fn test_summary_fields() {
        let root = Element::parse(SAMPLE_XML).unwrap();
        let record = summarize(&root);
        let text = |k: &str| record.get(k).map(|v| v.display());

        assert_eq!(text("Document User Name").as_deref(), Some("jdoe"));
        assert_eq!(text("Microscope Model").as_deref(), Some("LSM 880"));
        assert_eq!(text("Immersion").as_deref(), Some("Oil"));
        assert_eq!(
            text("Objective Model").as_deref(),
            Some("Plan-Apochromat 63x/1.40 Oil DIC M27")
        );
        assert_eq!(text("Objective Magnification").as_deref(), Some("63"));
        assert_eq!(text("Size Z").as_deref(), Some("21"));
        assert_eq!(text("Size C").as_deref(), Some("2"));
        assert_eq!(text("Pixel Size X (um)").as_deref(), Some("0.132"));
        assert_eq!(text("Channel Names").as_deref(), Some("DAPI, AF488"));
        assert_eq!(text("Excitation Wavelengths").as_deref(), Some("405, 488"));
        assert!(record.get("Size T").is_none());
    }
}
