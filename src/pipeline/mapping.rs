/// Field mapping: raw extractor keys → ReadMe form fields
///
/// One fixed rule table per format. A rule names the form field and where
/// its value comes from; fields a record cannot supply are simply not
/// produced, so the form keeps whatever it held before.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::data::form::DATE_TIME_FORMAT;
use crate::data::raw::RawMetadataRecord;
use crate::pipeline::extraction::ImageFormat;

/// One component of a joined value
#[derive(Debug, Clone, Copy)]
pub struct Part {
    pub key: &'static str,
    pub prefix: &'static str,
    pub suffix: &'static str,
}

const fn part(key: &'static str, prefix: &'static str, suffix: &'static str) -> Part {
    Part { key, prefix, suffix }
}

#[derive(Debug, Clone, Copy)]
pub enum Source {
    /// Copy one raw value; lists are joined with ", "
    Key(&'static str),
    /// Several raw values in fixed order. Missing parts are left out, as are
    /// numeric parts whose number an earlier part already shows.
    Join {
        parts: &'static [Part],
        separator: &'static str,
    },
    /// First list item, translated through a vocabulary when it matches
    Term {
        key: &'static str,
        terms: &'static [(&'static str, &'static str)],
    },
    /// Date/time reformatted to `YYYY-MM-DD HH:MM:SS`
    Date(&'static str),
    /// Refractive index → immersion medium
    Immersion(&'static str),
    /// Count → "Yes" when more than one, else "No"
    Series(&'static str),
}

impl Source {
    /// Raw keys this source reads
    pub fn keys(&self) -> Vec<&'static str> {
        match *self {
            Source::Key(k) | Source::Date(k) | Source::Immersion(k) | Source::Series(k) => vec![k],
            Source::Term { key, .. } => vec![key],
            Source::Join { parts, .. } => parts.iter().map(|p| p.key).collect(),
        }
    }

    pub fn resolve(&self, record: &RawMetadataRecord) -> Option<String> {
        let value = match *self {
            Source::Key(key) => record.get_present(key).map(|v| v.display()),
            Source::Join { parts, separator } => {
                let mut pieces: Vec<String> = Vec::new();
                for p in parts {
                    let Some(v) = record.get_present(p.key) else {
                        continue;
                    };
                    // "63x/1.40" in a lens name already gives magnification and NA
                    if v.as_f64().is_some_and(|n| pieces.iter().any(|s| mentions_number(s, n))) {
                        continue;
                    }
                    pieces.push(format!("{}{}{}", p.prefix, v.display(), p.suffix));
                }
                (!pieces.is_empty()).then(|| pieces.join(separator))
            }
            Source::Term { key, terms } => record
                .get_present(key)
                .and_then(|v| v.first())
                .map(|first| translate(&first, terms)),
            Source::Date(key) => record
                .get_present(key)
                .map(|v| v.display())
                .map(|raw| reformat_date(&raw).unwrap_or(raw)),
            Source::Immersion(key) => record.get_present(key).map(|v| match v.as_f64() {
                Some(index) => immersion_from_index(index).to_string(),
                None => v.display(),
            }),
            Source::Series(key) => record
                .get_present(key)
                .and_then(|v| v.as_f64())
                .map(|count| if count > 1.0 { "Yes" } else { "No" }.to_string()),
        };
        value.filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub source: Source,
}

const fn rule(field: &'static str, source: Source) -> FieldRule {
    FieldRule { field, source }
}

// ────────────────────────────────────────────────────────────────
// Vocabularies
// ────────────────────────────────────────────────────────────────

pub const IMAGING_MODE_TERMS: &[(&str, &str)] = &[
    ("LaserScanningConfocalMicroscopy", "Confocal"),
    ("LaserScanningConfocal", "Confocal"),
    ("Confocal", "Confocal"),
    ("SpinningDiskConfocal", "Spinning Disc Confocal"),
    ("SpinningDisk", "Spinning Disc Confocal"),
    ("WideField", "Widefield"),
    ("Camera", "Widefield"),
    ("LightSheet", "Lightsheet"),
    ("SPIM", "Lightsheet"),
];

pub const IMMERSION_TERMS: &[(&str, &str)] = &[
    ("Air", "Air"),
    ("Dry", "Air"),
    ("Water", "Water"),
    ("Glycerol", "Glycerol"),
    ("Glycerin", "Glycerol"),
    ("Silicone", "Silicone"),
    ("Oil", "Oil"),
    ("Oel", "Oil"),
    ("Immersol W", "Immersol W"),
];

fn translate(value: &str, terms: &[(&str, &str)]) -> String {
    terms
        .iter()
        .find(|(raw, _)| raw.eq_ignore_ascii_case(value.trim()))
        .map(|(_, term)| term.to_string())
        .unwrap_or_else(|| value.to_string())
}

/// True when a number written in `text` equals `value`
fn mentions_number(text: &str, value: f64) -> bool {
    text.split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .filter_map(|token| token.trim_matches('.').parse::<f64>().ok())
        .any(|n| (n - value).abs() < 1e-9)
}

/// `< 1.1` Air, `< 1.4` Water, `> 1.5` Oil, otherwise Other
pub fn immersion_from_index(index: f64) -> &'static str {
    if index < 1.1 {
        "Air"
    } else if index < 1.4 {
        "Water"
    } else if index > 1.5 {
        "Oil"
    } else {
        "Other"
    }
}

/// Formats seen in vendor headers, tried in order
const NAIVE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
    "%d/%m/%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

pub fn reformat_date(raw: &str) -> Option<String> {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
        return Some(dt.naive_local().format(DATE_TIME_FORMAT).to_string());
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&text, fmt) {
            return Some(dt.format(DATE_TIME_FORMAT).to_string());
        }
    }
    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.format(DATE_TIME_FORMAT).to_string())
}

// ────────────────────────────────────────────────────────────────
// Tables
// ────────────────────────────────────────────────────────────────

const OBJECTIVE_CZI: &[Part] = &[
    part("Objective Model", "", ""),
    part("Objective Magnification", "", "x"),
    part("Objective NA", "NA ", ""),
];

const OBJECTIVE_LIF: &[Part] = &[
    part("Objective Name", "", ""),
    part("Magnification", "", "x"),
    part("Numerical Aperture", "NA ", ""),
];

const OBJECTIVE_ND2: &[Part] = OBJECTIVE_CZI;

const CZI_RULES: &[FieldRule] = &[
    rule("Date and time", Source::Date("Document Creation Date")),
    rule("Experimenter Name(s)", Source::Key("Document User Name")),
    rule("Microscope", Source::Key("Microscope Model")),
    rule("Objective", Source::Join { parts: OBJECTIVE_CZI, separator: " " }),
    rule("Immersion Media", Source::Term { key: "Immersion", terms: IMMERSION_TERMS }),
    rule("Imaging mode", Source::Term { key: "Acquisition Modes", terms: IMAGING_MODE_TERMS }),
    rule("Channel info", Source::Key("Channel Names")),
    rule("Z-stack", Source::Series("Size Z")),
    rule("Time series", Source::Series("Size T")),
    rule("Image format", Source::Key("File Extension")),
];

const LIF_RULES: &[FieldRule] = &[
    rule("Date and time", Source::Date("Document Creation Date")),
    rule("Experimenter Name(s)", Source::Key("Document User Name")),
    rule("Microscope", Source::Key("System Type Name")),
    rule("Objective", Source::Join { parts: OBJECTIVE_LIF, separator: " " }),
    rule("Immersion Media", Source::Term { key: "Immersion", terms: IMMERSION_TERMS }),
    rule("Imaging mode", Source::Term { key: "DataSourceTypeName", terms: IMAGING_MODE_TERMS }),
    rule("Channel info", Source::Key("Channel Names")),
    rule("Z-stack", Source::Series("Size Z")),
    rule("Time series", Source::Series("Size T")),
    rule("Image format", Source::Key("File Extension")),
];

const ND2_RULES: &[FieldRule] = &[
    rule("Date and time", Source::Date("Date")),
    rule("Experimenter Name(s)", Source::Key("Author")),
    rule("Microscope", Source::Key("Microscope Name")),
    rule("Objective", Source::Join { parts: OBJECTIVE_ND2, separator: " " }),
    rule("Immersion Media", Source::Immersion("Refractive Index")),
    rule("Channel info", Source::Key("Channel Names")),
    rule("Z-stack", Source::Series("Z Slices")),
    rule("Time series", Source::Series("Time Points")),
    rule("Image format", Source::Key("File Extension")),
];

pub fn rules_for(format: ImageFormat) -> &'static [FieldRule] {
    match format {
        ImageFormat::Czi => CZI_RULES,
        ImageFormat::Lif => LIF_RULES,
        ImageFormat::Nd2 => ND2_RULES,
    }
}

/// Result of mapping one raw record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedFields {
    /// (form field, value) in table order
    pub values: Vec<(&'static str, String)>,
    /// Raw keys no rule reads
    pub unmapped: Vec<String>,
}

impl MappedFields {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(f, v)| (*f, v.as_str()))
    }
}

pub fn map_record(format: ImageFormat, record: &RawMetadataRecord) -> MappedFields {
    let rules = rules_for(format);
    let values: Vec<(&'static str, String)> = rules
        .iter()
        .filter_map(|r| r.source.resolve(record).map(|v| (r.field, v)))
        .collect();

    let consumed: Vec<&str> = rules.iter().flat_map(|r| r.source.keys()).collect();
    let unmapped: Vec<String> = record
        .keys()
        .filter(|k| !consumed.contains(k))
        .map(str::to_string)
        .collect();

    log::info!(
        "Mapped {} {} fields, {} raw keys unmapped",
        values.len(),
        format,
        unmapped.len()
    );
    MappedFields { values, unmapped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::form::{self, FormModel};
    use crate::data::raw::RawValue;
    use crate::data::xml::Element;
    use crate::data::{czi, lif, nd2};

    fn record(entries: Vec<(&str, RawValue)>) -> RawMetadataRecord {
        entries.into_iter().collect()
    }

    #[test]
    fn test_tables_name_real_fields() {
        for format in [ImageFormat::Czi, ImageFormat::Lif, ImageFormat::Nd2] {
            for r in rules_for(format) {
                assert!(form::is_field(r.field), "{} maps unknown field {}", format, r.field);
                assert_ne!(r.field, form::NOTES);
            }
        }
    }

    #[test]
    fn test_czi_subset_leaves_other_fields() {
        let raw = record(vec![
            ("Microscope Model", "LSM880".into()),
            ("Immersion", "Oil".into()),
        ]);
        let mapped = map_record(ImageFormat::Czi, &raw);
        assert_eq!(
            mapped.values,
            vec![("Microscope", "LSM880".to_string()), ("Immersion Media", "Oil".to_string())]
        );

        let mut form = FormModel::new();
        form.set("Objective", "kept");
        form.set("Notes", "kept too");
        let before = form.clone();
        form.apply(mapped.pairs());
        for (spec, value) in form.values() {
            match spec.name {
                "Microscope" => assert_eq!(value, "LSM880"),
                "Immersion Media" => assert_eq!(value, "Oil"),
                name => assert_eq!(Some(value), before.get(name)),
            }
        }
    }

    #[test]
    fn test_lif_subset_leaves_other_fields() {
        let raw = record(vec![
            ("System Type Name", "TCS SP8".into()),
            ("Size Z", 12.0.into()),
        ]);
        let mapped = map_record(ImageFormat::Lif, &raw);
        assert_eq!(
            mapped.values,
            vec![("Microscope", "TCS SP8".to_string()), ("Z-stack", "Yes".to_string())]
        );

        let mut form = FormModel::new();
        form.set("Project Name", "Spindle");
        form.set("Microscope", "old scope");
        form.set("Immersion Media", "Water");
        form.set("Channel info", "DAPI");
        let before = form.clone();
        form.apply(mapped.pairs());
        for (spec, value) in form.values() {
            match spec.name {
                "Microscope" => assert_eq!(value, "TCS SP8"),
                "Z-stack" => assert_eq!(value, "Yes"),
                name => assert_eq!(Some(value), before.get(name), "{} changed", name),
            }
        }
    }

    #[test]
    fn test_nd2_subset_leaves_other_fields() {
        let raw = record(vec![
            ("Author", "jdoe".into()),
            ("Refractive Index", 1.515.into()),
        ]);
        let mapped = map_record(ImageFormat::Nd2, &raw);
        assert_eq!(
            mapped.values,
            vec![
                ("Experimenter Name(s)", "jdoe".to_string()),
                ("Immersion Media", "Oil".to_string()),
            ]
        );

        let mut form = FormModel::new();
        form.set("Experimenter Name(s)", "someone else");
        form.set("Objective", "Plan Apo 60x");
        form.set("Time series", "Both");
        form.set("Notes", "keep");
        let before = form.clone();
        form.apply(mapped.pairs());
        for (spec, value) in form.values() {
            match spec.name {
                "Experimenter Name(s)" => assert_eq!(value, "jdoe"),
                "Immersion Media" => assert_eq!(value, "Oil"),
                name => assert_eq!(Some(value), before.get(name), "{} changed", name),
            }
        }
    }

    #[test]
    fn test_blank_values_are_absent() {
        let raw = record(vec![
            ("Microscope Model", "N/A".into()),
            ("Channel Names", RawValue::List(vec!["N/A".into()])),
        ]);
        assert!(map_record(ImageFormat::Czi, &raw).values.is_empty());
    }

    #[test]
    fn test_join_omits_missing_parts() {
        let raw = record(vec![("Objective Magnification", 63.0.into())]);
        assert_eq!(map_record(ImageFormat::Czi, &raw).get("Objective"), Some("63x"));

        let raw = record(vec![
            ("Objective Model", "Plan-Apochromat".into()),
            ("Objective Magnification", 63.0.into()),
            ("Objective NA", 1.4.into()),
        ]);
        assert_eq!(
            map_record(ImageFormat::Nd2, &raw).get("Objective"),
            Some("Plan-Apochromat 63x NA 1.4")
        );
    }

    #[test]
    fn test_join_skips_numbers_the_lens_name_shows() {
        let raw = record(vec![
            ("Objective Model", "EC Plan-Neofluar 40x/1.30 Oil M27".into()),
            ("Objective Magnification", 40.0.into()),
            ("Objective NA", 1.3.into()),
        ]);
        assert_eq!(
            map_record(ImageFormat::Czi, &raw).get("Objective"),
            Some("EC Plan-Neofluar 40x/1.30 Oil M27")
        );

        let raw = record(vec![
            ("Objective Name", "HC PL APO CS2 63x".into()),
            ("Magnification", 63.0.into()),
            ("Numerical Aperture", 1.4.into()),
        ]);
        assert_eq!(
            map_record(ImageFormat::Lif, &raw).get("Objective"),
            Some("HC PL APO CS2 63x NA 1.4")
        );

        assert!(mentions_number("Plan 10x/0.45", 0.45));
        assert!(!mentions_number("Plan 10x/0.45", 0.4));
        assert!(!mentions_number("Plan-Apochromat", 63.0));
    }

    #[test]
    fn test_terms() {
        let raw = record(vec![
            (
                "Acquisition Modes",
                RawValue::List(vec!["WideField".into(), "LaserScanningConfocalMicroscopy".into()]),
            ),
            ("Immersion", "OIL".into()),
        ]);
        let mapped = map_record(ImageFormat::Czi, &raw);
        assert_eq!(mapped.get("Imaging mode"), Some("Widefield"));
        assert_eq!(mapped.get("Immersion Media"), Some("Oil"));

        let raw = record(vec![("DataSourceTypeName", "Multiphoton".into())]);
        assert_eq!(map_record(ImageFormat::Lif, &raw).get("Imaging mode"), Some("Multiphoton"));
    }

    #[test]
    fn test_immersion_from_index() {
        assert_eq!(immersion_from_index(1.0), "Air");
        assert_eq!(immersion_from_index(1.33), "Water");
        assert_eq!(immersion_from_index(1.45), "Other");
        assert_eq!(immersion_from_index(1.515), "Oil");

        let raw = record(vec![("Refractive Index", 1.333.into())]);
        assert_eq!(map_record(ImageFormat::Nd2, &raw).get("Immersion Media"), Some("Water"));
        let raw = record(vec![("Refractive Index", "Glycerol".into())]);
        assert_eq!(map_record(ImageFormat::Nd2, &raw).get("Immersion Media"), Some("Glycerol"));
    }

    #[test]
    fn test_dates() {
        assert_eq!(
            reformat_date("2019-05-21T14:32:11.5361463+10:00").as_deref(),
            Some("2019-05-21 14:32:11")
        );
        assert_eq!(reformat_date("5/21/2019 2:32:11 PM").as_deref(), Some("2019-05-21 14:32:11"));
        assert_eq!(reformat_date("21/05/2019  14:32:11").as_deref(), Some("2019-05-21 14:32:11"));
        assert_eq!(reformat_date("2019-05-21").as_deref(), Some("2019-05-21 00:00:00"));
        assert_eq!(reformat_date("last tuesday"), None);

        let raw = record(vec![("Date", "sometime in May".into())]);
        assert_eq!(map_record(ImageFormat::Nd2, &raw).get("Date and time"), Some("sometime in May"));
    }

    #[test]
    fn test_series() {
        let raw = record(vec![("Size Z", 21.0.into()), ("Size T", 1.0.into())]);
        let mapped = map_record(ImageFormat::Czi, &raw);
        assert_eq!(mapped.get("Z-stack"), Some("Yes"));
        assert_eq!(mapped.get("Time series"), Some("No"));
    }

    #[test]
    fn test_unmapped_keys_reported() {
        let raw = record(vec![
            ("Microscope Model", "LSM880".into()),
            ("Pixel Type", "Gray16".into()),
        ]);
        let mapped = map_record(ImageFormat::Czi, &raw);
        assert_eq!(mapped.unmapped, vec!["Pixel Type".to_string()]);
    }

    #[test]
    fn test_reader_output_maps_end_to_end() {
        let root = Element::parse(czi::tests::SAMPLE_XML).unwrap();
        let mapped = map_record(ImageFormat::Czi, &czi::summarize(&root));
        assert_eq!(mapped.get("Microscope"), Some("LSM 880"));
        assert_eq!(mapped.get("Imaging mode"), Some("Confocal"));
        assert_eq!(mapped.get("Date and time"), Some("2019-05-21 14:32:11"));
        assert_eq!(mapped.get("Objective"), Some("Plan-Apochromat 63x/1.40 Oil DIC M27"));
        assert_eq!(mapped.get("Z-stack"), Some("Yes"));
        assert_eq!(mapped.get("Time series"), None);

        let root = Element::parse(lif::tests::SAMPLE_XML).unwrap();
        let mapped = map_record(ImageFormat::Lif, &lif::summarize(&root));
        assert_eq!(mapped.get("Microscope"), Some("TCS SP8"));
        assert_eq!(mapped.get("Immersion Media"), Some("Oil"));
        assert_eq!(mapped.get("Date and time"), Some("2019-05-21 14:32:11"));

        let mut reader = nd2::Nd2Reader::new(std::io::Cursor::new(nd2::tests::sample_nd2())).unwrap();
        let raw = nd2::read_metadata_from(&mut reader).unwrap();
        let mapped = map_record(ImageFormat::Nd2, &raw);
        assert_eq!(mapped.get("Experimenter Name(s)"), Some("jdoe"));
        assert_eq!(mapped.get("Immersion Media"), Some("Oil"));
        assert_eq!(mapped.get("Time series"), Some("Yes"));
        assert_eq!(mapped.get("Channel info"), Some("DAPI, GFP"));
    }
}
