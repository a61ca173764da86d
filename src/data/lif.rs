/// Leica LIF header reader
///
/// Layout of the file start:
///   u32  0x70 test code
///   u32  length of the following block
///   u8   0x2A marker
///   u32  number of UTF-16 code units in the XML header
///   ...  XML header, UTF-16LE
///
/// The XML header describes every image ("Element" with an Image data node)
/// of the project, including the hardware settings used to acquire it.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use super::header::{magic_read_error, utf16le_to_string, HeaderError, MAX_METADATA_BYTES};
use super::raw::{format_number, RawMetadataRecord};
use super::xml::Element;

pub const LIF_TEST_CODE: u32 = 0x70;
pub const LIF_MARKER: u8 = 0x2A;

/// Read the UTF-16 XML header of a LIF file.
pub fn read_xml_header(path: &Path) -> Result<String, HeaderError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    read_xml_header_from(&mut reader)
}

pub fn read_xml_header_from<R: Read>(reader: &mut R) -> Result<String, HeaderError> {
    let test_code = reader
        .read_u32::<LittleEndian>()
        .map_err(|e| magic_read_error("LIF", "file too short", e))?;
    if test_code != LIF_TEST_CODE {
        return Err(HeaderError::BadMagic {
            format: "LIF",
            reason: format!("test code 0x{:X}, expected 0x{:X}", test_code, LIF_TEST_CODE),
        });
    }
    let _block_len = reader.read_u32::<LittleEndian>()?;
    let marker = reader.read_u8()?;
    if marker != LIF_MARKER {
        return Err(HeaderError::BadMagic {
            format: "LIF",
            reason: format!("header marker 0x{:X}, expected 0x{:X}", marker, LIF_MARKER),
        });
    }
    let n_chars = reader.read_u32::<LittleEndian>()? as u64;
    let n_bytes = n_chars * 2;
    if n_bytes == 0 || n_bytes > MAX_METADATA_BYTES {
        return Err(HeaderError::Corrupt(format!(
            "implausible XML header length of {} characters",
            n_chars
        )));
    }
    let mut buf = vec![0u8; n_bytes as usize];
    reader.read_exact(&mut buf)?;
    Ok(utf16le_to_string(&buf))
}

/// Read a LIF file and summarize the first image it contains.
pub fn read_metadata(path: &Path) -> Result<RawMetadataRecord, HeaderError> {
    let xml = read_xml_header(path)?;
    let root = Element::parse(&xml)?;
    Ok(summarize(&root))
}

/// Elements of the project tree that hold an image
pub fn image_elements(root: &Element) -> Vec<&Element> {
    root.find_all("Element")
        .into_iter()
        .filter(|e| e.path(&["Data", "Image"]).is_some())
        .collect()
}

pub fn summarize(root: &Element) -> RawMetadataRecord {
    let mut out = RawMetadataRecord::new();
    let images = image_elements(root);
    out.insert("Image Count", images.len() as f64);

    // Project wide attributes, used when the image itself lacks them
    let scope = images.first().copied().unwrap_or(root);
    let attr = |name: &str| scope.find_attr(name).or_else(|| root.find_attr(name));

    out.insert_present("Image Name", images.first().and_then(|e| e.attr("Name")));
    out.insert_present("System Type Name", attr("SystemTypeName"));
    out.insert_present("DataSourceTypeName", attr("DataSourceTypeName"));
    out.insert_present("Document User Name", attr("UserName"));
    out.insert_present(
        "Document Creation Date",
        attr("CreationDate").or_else(|| attr("StartTime")),
    );

    let attachment_attr = |name: &str| {
        root.find_all("Attachment")
            .into_iter()
            .find_map(|a| a.attr(name))
    };
    out.insert_present("Application Name", attachment_attr("Application"));
    out.insert_present("Application Version", attachment_attr("Software"));

    // ── Objective / scan settings ──
    let settings = scope
        .find("ATLConfocalSettingDefinition")
        .or_else(|| scope.find("ATLCameraSettingDefinition"));
    let setting = |name: &str| settings.and_then(|s| s.attr(name)).or_else(|| attr(name));
    out.insert_present("Objective Name", setting("ObjectiveName"));
    out.insert_present("Magnification", setting("Magnification").map(number_text));
    out.insert_present("Numerical Aperture", setting("NumericalAperture").map(number_text));
    out.insert_present("Refractive Index", setting("RefractionIndex").map(number_text));
    out.insert_present("Immersion", setting("Immersion"));
    out.insert_present("Zoom", setting("Zoom").map(number_text));

    // ── Dimensions ──
    if let Some(description) = scope.find("ImageDescription") {
        if let Some(dimensions) = description.child("Dimensions") {
            for dim in dimensions.children_named("DimensionDescription") {
                let axis = match dim.attr("DimID") {
                    Some("1") => "X",
                    Some("2") => "Y",
                    Some("3") => "Z",
                    Some("4") => "T",
                    _ => continue,
                };
                let count = dim
                    .attr("NumberOfElements")
                    .and_then(|v| v.trim().parse::<f64>().ok());
                if let Some(count) = count {
                    out.insert(&format!("Size {}", axis), count);
                }
            }
        }

        let channels: Vec<&Element> = description
            .child("Channels")
            .map(|c| c.children_named("ChannelDescription").collect())
            .unwrap_or_default();
        if !channels.is_empty() {
            out.insert("Size C", channels.len() as f64);
            let names: Vec<String> = channels
                .iter()
                .map(|c| {
                    c.attr("LUTName")
                        .or_else(|| c.attr("ChannelName"))
                        .unwrap_or("N/A")
                        .to_string()
                })
                .collect();
            out.insert_present("Channel Names", Some(names));
        }
    }

    let dyes: Vec<String> = scope
        .find_all("MultiBand")
        .into_iter()
        .filter_map(|m| m.attr("DyeName"))
        .map(str::to_string)
        .collect();
    out.insert_present("Dye Names", Some(dyes));

    out
}

/// Leica writes numbers with many digits ("1.39999997615814")
fn number_text(s: &str) -> String {
    match s.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => format_number(v),
        _ => s.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Cursor;

    pub(crate) const SAMPLE_XML: &str = r#"<LMSDataContainerHeader Version="2">
<Element Name="project.lif">
  <Data><Experiment Path="D:\data\project.lif"/></Data>
  <Children>
    <Element Name="Series001">
      <Data>
        <Image>
          <ImageDescription>
            <Channels>
              <ChannelDescription DataType="0" LUTName="Green" BytesInc="0"/>
              <ChannelDescription DataType="0" LUTName="Red" BytesInc="1"/>
            </Channels>
            <Dimensions>
              <DimensionDescription DimID="1" NumberOfElements="512" Length="2.46e-04" Unit="m"/>
              <DimensionDescription DimID="2" NumberOfElements="512" Length="2.46e-04" Unit="m"/>
              <DimensionDescription DimID="3" NumberOfElements="12" Length="1.1e-05" Unit="m"/>
            </Dimensions>
          </ImageDescription>
          <Attachment Name="HardwareSetting" DataSourceTypeName="Confocal" Application="LAS X" Software="3.5.5">
            <ATLConfocalSettingDefinition SystemTypeName="TCS SP8" UserName="jdoe"
                ObjectiveName="HC PL APO CS2 63x/1.40 OIL" Magnification="63"
                NumericalAperture="1.39999997615814" RefractionIndex="1.518" Immersion="OIL" Zoom="2.5"
                StartTime="5/21/2019 2:32:11 PM">
              <Spectro><MultiBand Channel="1" DyeName="FITC"/><MultiBand Channel="2" DyeName="TRITC"/></Spectro>
            </ATLConfocalSettingDefinition>
          </Attachment>
        </Image>
      </Data>
    </Element>
  </Children>
</Element>
</LMSDataContainerHeader>"#;

    pub(crate) fn build_lif(xml: &str) -> Vec<u8> {
        let units: Vec<u16> = xml.encode_utf16().collect();
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(LIF_TEST_CODE).unwrap();
        buf.write_u32::<LittleEndian>(units.len() as u32 * 2 + 5).unwrap();
        buf.write_u8(LIF_MARKER).unwrap();
        buf.write_u32::<LittleEndian>(units.len() as u32).unwrap();
        for u in units {
            buf.write_u16::<LittleEndian>(u).unwrap();
        }
        buf
    }

    #[test]
    fn test_reads_utf16_header() {
        let bytes = build_lif("<LMSDataContainerHeader Version=\"2\"/>");
        let xml = read_xml_header_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(xml, "<LMSDataContainerHeader Version=\"2\"/>");
    }

    #[test]
    fn test_rejects_wrong_magic() {
        let mut bytes = build_lif("<A/>");
        bytes[0] = 0x71;
        assert!(matches!(
            read_xml_header_from(&mut Cursor::new(bytes)),
            Err(HeaderError::BadMagic { format: "LIF", .. })
        ));
    }

    #[test]
    fn test_summary_of_first_image() {
        let root = Element::parse(SAMPLE_XML).unwrap();
        let record = summarize(&root);
        let text = |k: &str| record.get(k).map(|v| v.display());

        assert_eq!(text("Image Count").as_deref(), Some("1"));
        assert_eq!(text("Image Name").as_deref(), Some("Series001"));
        assert_eq!(text("System Type Name").as_deref(), Some("TCS SP8"));
        assert_eq!(text("DataSourceTypeName").as_deref(), Some("Confocal"));
        assert_eq!(text("Document User Name").as_deref(), Some("jdoe"));
        assert_eq!(text("Numerical Aperture").as_deref(), Some("1.4"));
        assert_eq!(text("Immersion").as_deref(), Some("OIL"));
        assert_eq!(text("Size Z").as_deref(), Some("12"));
        assert_eq!(text("Size C").as_deref(), Some("2"));
        assert_eq!(text("Channel Names").as_deref(), Some("Green, Red"));
        assert_eq!(text("Dye Names").as_deref(), Some("FITC, TRITC"));
        assert_eq!(text("Application Name").as_deref(), Some("LAS X"));
        assert!(record.get("Size T").is_none());
    }
}
