/// ReadMe document: flat-text writer/parser and JSON export
///
/// Text layout:
///
/// ```text
/// # Generated by ReMInD ReadMe Builder v0.3.0 on 2025-03-14 09:00:00
/// Project Name: Exp1
/// RDM Info: Q1234
/// ...
///
/// Notes: first line
/// further lines, verbatim
///
/// # Extracted Image Metadata
/// Microscope Model: LSM 880
/// ```
///
/// Keys are split at the first ": ". Key names used by older ReMInD versions
/// are read into the current fields. Notes continuation lines that would read
/// as a key line or section header are written with one leading backslash.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::form::{field, FieldSpec, FormModel, DATE_TIME_FORMAT, FORM_FIELDS, NOTES, PROJECT_NAME};
use super::raw::RawMetadataRecord;
use crate::error::{ReadmeError, Result};

pub const APP_NAME: &str = "ReMInD ReadMe Builder";
pub const METADATA_HEADER: &str = "# Extracted Image Metadata";
pub const JSON_METADATA_KEY: &str = "Extracted Image Metadata";
/// Fence around Notes in files written by older versions
const LEGACY_NOTES_FENCE: &str = "---";
const OTHER_SUFFIX: &str = " (Other)";

/// Keys written by older ReMInD versions and the fields they now fill
const LEGACY_FIELD_NAMES: &[(&str, &str)] = &[
    ("Experiment name", PROJECT_NAME),
    ("Experimentor Name(s)", "Experimenter Name(s)"),
    ("Microscope name", "Microscope"),
    ("Immersion", "Immersion Media"),
];

/// Field values of one ReadMe plus the image metadata appended to it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadmeDocument {
    fields: Vec<(&'static str, String)>,
    extracted: Option<RawMetadataRecord>,
}

impl ReadmeDocument {
    pub fn from_form(form: &FormModel) -> Self {
        Self {
            fields: form
                .values()
                .map(|(spec, value)| (spec.name, value.to_string()))
                .collect(),
            extracted: form.extracted().cloned(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Fields present in the document, in document order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn extracted(&self) -> Option<&RawMetadataRecord> {
        self.extracted.as_ref()
    }

    fn set(&mut self, name: &'static str, value: String) {
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Copy the parsed values into the form. Fields the document does not
    /// mention keep their current value.
    pub fn apply_to(&self, form: &mut FormModel) -> usize {
        let n = form.apply(self.fields());
        if let Some(record) = &self.extracted {
            form.set_extracted(Some(record.clone()));
        }
        n
    }

    // ────────────────────────────────────────────────────────────
    // Text
    // ────────────────────────────────────────────────────────────

    /// Render the flat-text ReadMe. `header` becomes a leading `#` line.
    pub fn to_text(&self, header: Option<&str>) -> String {
        let mut out = String::new();
        if let Some(header) = header {
            let _ = writeln!(out, "# {}", single_line(header));
        }

        let mut previous_group = None;
        for spec in FORM_FIELDS {
            if previous_group.is_some_and(|g| g != spec.group) {
                out.push('\n');
            }
            previous_group = Some(spec.group);

            let value = self.get(spec.name).unwrap_or(spec.default);
            if spec.multiline {
                write_multiline(&mut out, spec.name, value);
            } else {
                let _ = writeln!(out, "{}: {}", spec.name, single_line(value));
            }
        }

        if let Some(record) = self.extracted.as_ref().filter(|r| !r.is_empty()) {
            out.push('\n');
            out.push_str(METADATA_HEADER);
            out.push('\n');
            for (key, value) in record.iter() {
                let _ = writeln!(out, "{}: {}", single_line(key), single_line(&value.display()));
            }
        }
        out
    }

    /// Parse a ReadMe (or template) back into field values.
    pub fn parse(text: &str) -> Result<Self> {
        let mut doc = ReadmeDocument::default();
        let mut recognized = 0usize;
        let mut notes: Option<Vec<String>> = None;
        let mut lines = text
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .peekable();

        while let Some(line) = lines.next() {
            if let Some(record) = doc.extracted.as_mut() {
                if line.trim().is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = split_key_line(line) {
                    record.insert(key, value);
                }
                continue;
            }

            if line.trim_end() == METADATA_HEADER {
                doc.finish_notes(notes.take());
                doc.extracted = Some(RawMetadataRecord::new());
                continue;
            }

            if let Some((key, value)) = split_key_line(line) {
                if let Some(spec) = declared_field(key) {
                    recognized += 1;
                    doc.finish_notes(notes.take());
                    if spec.name == NOTES {
                        if value.is_empty() {
                            if let Some(fenced) = read_fenced_notes(&mut lines) {
                                doc.set(NOTES, fenced);
                                continue;
                            }
                        }
                        notes = Some(vec![value.to_string()]);
                    } else {
                        doc.set(spec.name, value.to_string());
                    }
                    continue;
                }
                if let Some(spec) = key.strip_suffix(OTHER_SUFFIX).and_then(declared_field) {
                    recognized += 1;
                    doc.finish_notes(notes.take());
                    if !value.trim().is_empty() {
                        doc.set(spec.name, value.to_string());
                    }
                    continue;
                }
            }

            // Outside Notes: comments, blank lines, unknown text
            if let Some(buf) = notes.as_mut() {
                buf.push(line.strip_prefix('\\').unwrap_or(line).to_string());
            }
        }
        doc.finish_notes(notes);

        if recognized == 0 {
            return Err(ReadmeError::Parse(
                "no recognised field lines found".to_string(),
            ));
        }
        Ok(doc)
    }

    fn finish_notes(&mut self, notes: Option<Vec<String>>) {
        if let Some(mut lines) = notes {
            while lines.len() > 1 && lines.last().is_some_and(|l| l.trim().is_empty()) {
                lines.pop();
            }
            self.set(NOTES, lines.join("\n"));
        }
    }

    // ────────────────────────────────────────────────────────────
    // JSON
    // ────────────────────────────────────────────────────────────

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ReadmeError::Parse(format!("JSON export failed: {}", e)))
    }
}

impl Serialize for ReadmeDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let has_metadata = self.extracted.as_ref().is_some_and(|r| !r.is_empty());
        let len = FORM_FIELDS.len() + usize::from(has_metadata);
        let mut map = serializer.serialize_map(Some(len))?;
        for spec in FORM_FIELDS {
            map.serialize_entry(spec.name, self.get(spec.name).unwrap_or(spec.default))?;
        }
        if let Some(record) = self.extracted.as_ref().filter(|_| has_metadata) {
            map.serialize_entry(JSON_METADATA_KEY, record)?;
        }
        map.end()
    }
}

fn single_line(value: &str) -> String {
    value.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// `Key: value` or `Key:` split; the key is everything before the first ": ".
fn split_key_line(line: &str) -> Option<(&str, &str)> {
    if let Some((key, value)) = line.split_once(": ") {
        return Some((key, value));
    }
    line.strip_suffix(':').map(|key| (key, ""))
}

/// Whether a Notes continuation line would be read as something else.
/// Field named by a key line, under its current or a legacy name
fn declared_field(key: &str) -> Option<&'static FieldSpec> {
    field(key).or_else(|| {
        LEGACY_FIELD_NAMES
            .iter()
            .find(|(old, _)| *old == key)
            .and_then(|(_, current)| field(current))
    })
}

fn needs_escape(line: &str) -> bool {
    if line.starts_with('\\') || line.trim_end() == METADATA_HEADER || line == LEGACY_NOTES_FENCE {
        return true;
    }
    match split_key_line(line) {
        Some((key, _)) => {
            declared_field(key).is_some()
                || key.strip_suffix(OTHER_SUFFIX).and_then(declared_field).is_some()
        }
        None => false,
    }
}

fn write_multiline(out: &mut String, name: &str, value: &str) {
    let mut lines = value.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
    let first = lines.next().unwrap_or("");
    let _ = writeln!(out, "{}: {}", name, first);
    for line in lines {
        if needs_escape(line) {
            out.push('\\');
        }
        out.push_str(line);
        out.push('\n');
    }
}

/// Legacy `Notes:` / `---` / text / `---` block. Consumes the block and
/// returns its content when the next line opens a fence.
fn read_fenced_notes<'a, I>(lines: &mut std::iter::Peekable<I>) -> Option<String>
where
    I: Iterator<Item = &'a str>,
{
    if lines.peek().map(|l| l.trim_end()) != Some(LEGACY_NOTES_FENCE) {
        return None;
    }
    lines.next();
    let mut body = Vec::new();
    for line in lines.by_ref() {
        if line.trim_end() == LEGACY_NOTES_FENCE {
            break;
        }
        body.push(line);
    }
    Some(body.join("\n").trim_end().to_string())
}

// ────────────────────────────────────────────────────────────────
// Files
// ────────────────────────────────────────────────────────────────

/// Keep alphanumerics, space, '-' and '_'; trim trailing whitespace.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    cleaned.trim_end().to_string()
}

pub fn readme_file_name(project: &str) -> String {
    match sanitize_name(project) {
        s if s.is_empty() => "ReadMe.txt".to_string(),
        s => format!("{}_ReadMe.txt", s),
    }
}

pub fn json_file_name(project: &str) -> String {
    match sanitize_name(project) {
        s if s.is_empty() => "metadata.json".to_string(),
        s => format!("{}_metadata.json", s),
    }
}

/// `Generated by ...` line written at the top of saved files
pub fn generator_header(at: NaiveDateTime) -> String {
    format!(
        "Generated by {} v{} on {}",
        APP_NAME,
        env!("CARGO_PKG_VERSION"),
        at.format(DATE_TIME_FORMAT)
    )
}

pub fn write_text(path: &Path, doc: &ReadmeDocument, header: Option<&str>) -> Result<()> {
    fs::write(path, doc.to_text(header)).map_err(|e| ReadmeError::io(path, e))?;
    log::info!("Saved ReadMe to {}", path.display());
    Ok(())
}

pub fn write_json(path: &Path, doc: &ReadmeDocument) -> Result<()> {
    let json = doc.to_json()?;
    fs::write(path, json).map_err(|e| ReadmeError::io(path, e))?;
    log::info!("Exported JSON to {}", path.display());
    Ok(())
}

/// Save the form as `<Project>_ReadMe.txt` in `dir`.
pub fn save_readme(dir: &Path, form: &FormModel, header: Option<&str>) -> Result<PathBuf> {
    let path = dir.join(readme_file_name(form.get(PROJECT_NAME).unwrap_or("")));
    write_text(&path, &ReadmeDocument::from_form(form), header)?;
    Ok(path)
}

/// Read and parse a ReadMe or template file. Invalid UTF-8 is replaced.
pub fn load(path: &Path) -> Result<ReadmeDocument> {
    let bytes = fs::read(path).map_err(|e| ReadmeError::io(path, e))?;
    let doc = ReadmeDocument::parse(&String::from_utf8_lossy(&bytes))?;
    log::info!(
        "Loaded {} fields from {}",
        doc.fields.len(),
        path.display()
    );
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn form_with(values: &[(&str, &str)]) -> FormModel {
        let mut form = FormModel::new();
        for (k, v) in values {
            assert!(form.set(k, *v), "unknown field {}", k);
        }
        form
    }

    #[test]
    fn test_text_layout() {
        let form = form_with(&[("Project Name", "Exp1"), ("Microscope", "LSM880")]);
        let text = ReadmeDocument::from_form(&form).to_text(Some("Generated by test"));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# Generated by test");
        assert_eq!(lines[1], "Project Name: Exp1");
        assert_eq!(lines[2], "RDM Info: ");
        assert!(lines.contains(&"Microscope: LSM880"));
        // Four groups, three separators
        assert_eq!(lines.iter().filter(|l| l.is_empty()).count(), 3);
        assert_eq!(lines.last(), Some(&"Notes: "));
    }

    #[test]
    fn test_single_line_fields_flattened() {
        let form = form_with(&[("Sample Information", "HeLa\nfixed")]);
        let text = ReadmeDocument::from_form(&form).to_text(None);
        assert!(text.contains("Sample Information: HeLa fixed\n"));
    }

    #[test]
    fn test_notes_round_trip_with_escapes() {
        let notes = "first\nMicroscope: not a field\n\\already\n# Extracted Image Metadata\n---\nlast";
        let form = form_with(&[("Microscope", "Real"), ("Notes", notes)]);
        let text = ReadmeDocument::from_form(&form).to_text(None);
        assert!(text.contains("\n\\Microscope: not a field\n"));

        let doc = ReadmeDocument::parse(&text).unwrap();
        assert_eq!(doc.get("Microscope"), Some("Real"));
        assert_eq!(doc.get("Notes"), Some(notes));
    }

    #[test]
    fn test_parse_keeps_colons_in_values() {
        let doc = ReadmeDocument::parse("Date and time: 2025-03-14 09:30:00\nObjective: 63x: oil").unwrap();
        assert_eq!(doc.get("Date and time"), Some("2025-03-14 09:30:00"));
        assert_eq!(doc.get("Objective"), Some("63x: oil"));
    }

    #[test]
    fn test_parse_errors_only_without_any_field() {
        let err = ReadmeDocument::parse("hello\nworld: 1\n# comment\n").unwrap_err();
        assert!(matches!(err, ReadmeError::Parse(_)));

        let doc = ReadmeDocument::parse("junk\nmore: junk\nMicroscope: X\nother\n").unwrap();
        assert_eq!(doc.fields().count(), 1);
        assert_eq!(doc.get("Microscope"), Some("X"));
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        assert!(ReadmeDocument::parse("microscope: X").is_err());
        let doc = ReadmeDocument::parse("Microscope:\r\nObjective: 10x\r\n").unwrap();
        assert_eq!(doc.get("Microscope"), Some(""));
        assert_eq!(doc.get("Objective"), Some("10x"));
    }

    #[test]
    fn test_legacy_layout() {
        let text = "# Generated by ReMInD v2.19 on 2025-01-01 10:00:00\n\
                    Project Name: Old\n\
                    Immersion Media: Other\n\
                    Immersion Media (Other): Honey\n\
                    Imaging mode (Other): \n\
                    Notes:\n---\nline one\nMicroscope: inside fence\n---\n\
                    Microscope: after\n\
                    \n\
                    # Extracted Image Metadata\n\
                    Microscope Model: LSM 880\n\
                    Size Z: 21\n";
        let doc = ReadmeDocument::parse(text).unwrap();
        assert_eq!(doc.get("Immersion Media"), Some("Honey"));
        assert_eq!(doc.get("Imaging mode"), None);
        assert_eq!(doc.get("Notes"), Some("line one\nMicroscope: inside fence"));
        assert_eq!(doc.get("Microscope"), Some("after"));
        let record = doc.extracted().unwrap();
        assert_eq!(record.get("Size Z").map(|v| v.display()).as_deref(), Some("21"));
    }

    #[test]
    fn test_old_key_names() {
        let text = "Experiment name: Spindle\n\
                    Experimentor Name(s): J. Doe\n\
                    Microscope name: LSM880\n\
                    Immersion: Oil-23\n\
                    Notes:\n---\nhello\n---";
        let doc = ReadmeDocument::parse(text).unwrap();
        assert_eq!(doc.get("Project Name"), Some("Spindle"));
        assert_eq!(doc.get("Experimenter Name(s)"), Some("J. Doe"));
        assert_eq!(doc.get("Microscope"), Some("LSM880"));
        assert_eq!(doc.get("Immersion Media"), Some("Oil-23"));
        assert_eq!(doc.get("Notes"), Some("hello"));

        let doc = ReadmeDocument::parse("Immersion: Other\nImmersion (Other): Honey\n").unwrap();
        assert_eq!(doc.get("Immersion Media"), Some("Honey"));
    }

    #[test]
    fn test_notes_escape_old_key_names() {
        let notes = "kept\nMicroscope name: in the notes";
        let form = form_with(&[("Notes", notes)]);
        let text = ReadmeDocument::from_form(&form).to_text(None);
        assert!(text.contains("\n\\Microscope name: in the notes\n"), "{}", text);

        let doc = ReadmeDocument::parse(&text).unwrap();
        assert_eq!(doc.get("Notes"), Some(notes));
        assert_eq!(doc.get("Microscope"), Some(""));
    }

    #[test]
    fn test_absent_fields_keep_form_values() {
        let mut form = form_with(&[("Microscope", "Keep me"), ("Objective", "old")]);
        let doc = ReadmeDocument::parse("Objective: new").unwrap();
        doc.apply_to(&mut form);
        assert_eq!(form.get("Microscope"), Some("Keep me"));
        assert_eq!(form.get("Objective"), Some("new"));
    }

    #[test]
    fn test_metadata_section_round_trip() {
        let mut form = form_with(&[("Project Name", "P")]);
        let mut record = RawMetadataRecord::new();
        record.insert("Microscope Model", "LSM 880");
        record.insert("Channel Names", vec!["DAPI".to_string(), "GFP".to_string()]);
        form.set_extracted(Some(record));

        let text = ReadmeDocument::from_form(&form).to_text(None);
        assert!(text.contains("\n\n# Extracted Image Metadata\nMicroscope Model: LSM 880\nChannel Names: DAPI, GFP\n"));
        let doc = ReadmeDocument::parse(&text).unwrap();
        assert_eq!(doc.get("Notes"), Some(""));
        assert_eq!(doc.extracted().map(|r| r.len()), Some(2));
    }

    #[test]
    fn test_json_export_order() {
        let mut form = form_with(&[("Project Name", "Exp1")]);
        form.set_extracted(Some(vec![("Size Z", 21.0)].into_iter().collect()));
        let json = ReadmeDocument::from_form(&form).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["Project Name"], "Exp1");
        assert_eq!(value[JSON_METADATA_KEY]["Size Z"], 21.0);
        let project = json.find("\"Project Name\"").unwrap();
        let notes = json.find("\"Notes\"").unwrap();
        let metadata = json.find(JSON_METADATA_KEY).unwrap();
        assert!(project < notes && notes < metadata);
    }

    #[test]
    fn test_file_names() {
        assert_eq!(readme_file_name("Exp1"), "Exp1_ReadMe.txt");
        assert_eq!(readme_file_name("My exp: #2 / final  "), "My exp 2  final_ReadMe.txt");
        assert_eq!(readme_file_name("  "), "ReadMe.txt");
        assert_eq!(json_file_name("Exp1"), "Exp1_metadata.json");
        assert_eq!(json_file_name("???"), "metadata.json");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let form = form_with(&[("Project Name", "Exp1"), ("Microscope", "LSM880")]);
        let path = save_readme(dir.path(), &form, Some("Generated by test")).unwrap();
        assert_eq!(path.file_name().unwrap(), "Exp1_ReadMe.txt");

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Microscope: LSM880"));

        let mut reloaded = FormModel::new();
        load(&path).unwrap().apply_to(&mut reloaded);
        assert_eq!(reloaded.get("Microscope"), Some("LSM880"));
        assert_eq!(reloaded.get("Project Name"), Some("Exp1"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, ReadmeError::Io { .. }));
    }

    proptest! {
        #[test]
        fn prop_single_line_values_round_trip(values in proptest::collection::vec("[^\r\n]{0,24}", FORM_FIELDS.len())) {
            let mut form = FormModel::new();
            for (spec, value) in FORM_FIELDS.iter().zip(&values) {
                form.set(spec.name, value.clone());
            }
            let text = ReadmeDocument::from_form(&form).to_text(Some("Generated by proptest"));
            let mut parsed = FormModel::new();
            ReadmeDocument::parse(&text).unwrap().apply_to(&mut parsed);
            for (spec, value) in FORM_FIELDS.iter().zip(&values) {
                prop_assert_eq!(parsed.get(spec.name), Some(value.as_str()));
            }
        }
    }
}
