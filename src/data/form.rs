/// The ReadMe form: static field declarations and the current values.

use chrono::{Local, NaiveDateTime};

use super::raw::RawMetadataRecord;

pub const PROJECT_NAME: &str = "Project Name";
pub const RDM_INFO: &str = "RDM Info";
pub const DATE_AND_TIME: &str = "Date and time";
pub const NOTES: &str = "Notes";

/// Format used by the "Now" button and by date mapping
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Format of the stamps inserted into Notes
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldGroup {
    Experiment,
    Sample,
    Acquisition,
    Notes,
}

impl FieldGroup {
    pub fn label(&self) -> &'static str {
        match self {
            FieldGroup::Experiment => "Experiment",
            FieldGroup::Sample => "Sample",
            FieldGroup::Acquisition => "Acquisition",
            FieldGroup::Notes => "Notes",
        }
    }
}

/// Declaration of one form field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub group: FieldGroup,
    pub default: &'static str,
    pub help: &'static str,
    /// Suggested values; never enforced
    pub choices: &'static [&'static str],
    pub multiline: bool,
}

impl FieldSpec {
    const fn text(name: &'static str, group: FieldGroup, help: &'static str) -> Self {
        Self {
            name,
            group,
            default: "",
            help,
            choices: &[],
            multiline: false,
        }
    }

    const fn choice(
        name: &'static str,
        group: FieldGroup,
        help: &'static str,
        choices: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            group,
            default: "",
            help,
            choices,
            multiline: false,
        }
    }
}

pub const IMMERSION_CHOICES: &[&str] = &[
    "Air", "Water", "Immersol W", "Glycerol", "Silicone", "Oil", "Oil-23", "Oil-37", "Other",
];
pub const IMAGING_MODE_CHOICES: &[&str] =
    &["Confocal", "Widefield", "Spinning Disc Confocal", "Lightsheet", "Other"];
pub const SPECIALIST_CHOICES: &[&str] = &["", "Airyscan", "STED", "FLIM", "2Photon", "TIRF", "Other"];
pub const SERIES_CHOICES: &[&str] = &["Yes", "No", "Both"];

use FieldGroup::{Acquisition, Experiment, Sample};

/// Every field, in display and save order
pub const FORM_FIELDS: &[FieldSpec] = &[
    FieldSpec::text(PROJECT_NAME, Experiment, "Title of the experiment. Also used to name the saved files."),
    FieldSpec::text(
        RDM_INFO,
        Experiment,
        "RDM project or storage location. A list is offered when the RDM gateway is reachable, otherwise type it in.",
    ),
    FieldSpec::text(DATE_AND_TIME, Experiment, "Date and time of acquisition. The Now button fills in the current time."),
    FieldSpec::text("Experimenter Name(s)", Experiment, "Enter your full name."),
    FieldSpec::text("Sample Information", Sample, "e.g. Sample ID, or cell line, animal strain"),
    FieldSpec::text("Genetic Modifications", Sample, "e.g. eGFP- mCherry-y"),
    FieldSpec::text("Antibody or probes", Sample, "e.g. Alexa488-Phalloidin, DAPI, Alexa647-GaM"),
    FieldSpec::text("Fixation / Live Media", Sample, "Fixation method used, or details of live imaging reagents"),
    FieldSpec::text("Sample mounting condition", Sample, "35mm Dish, #1.5 coverslip, chamber slide"),
    FieldSpec::text("Microscope", Acquisition, "e.g. Confocal 5"),
    FieldSpec::text("Objective", Acquisition, "Objective lens details. e.g. Plan Apochromat 63x 1.4NA"),
    FieldSpec::choice("Immersion Media", Acquisition, "Select the immersion used.", IMMERSION_CHOICES),
    FieldSpec::choice("Imaging mode", Acquisition, "Select the imaging mode used.", IMAGING_MODE_CHOICES),
    FieldSpec::choice(
        "Specialist modality",
        Acquisition,
        "Select any specialist imaging modality used.",
        SPECIALIST_CHOICES,
    ),
    FieldSpec::text("Environmental Conditions", Acquisition, "e.g. Temperature and CO2"),
    FieldSpec::text("Channel info", Acquisition, "Channel names, stains or labels used."),
    FieldSpec::choice("Z-stack", Acquisition, "Was a Z-stack acquired?", SERIES_CHOICES),
    FieldSpec::choice("Time series", Acquisition, "Was this a time-lapse series?", SERIES_CHOICES),
    FieldSpec::text("Image format", Acquisition, "Image file format (e.g., .czi, .tif, .lif)."),
    FieldSpec {
        name: NOTES,
        group: FieldGroup::Notes,
        default: "",
        help: "Analysis intent or relevant notes. Timestamp adds the current date and time on a new line.",
        choices: &[],
        multiline: true,
    },
];

pub fn field(name: &str) -> Option<&'static FieldSpec> {
    FORM_FIELDS.iter().find(|f| f.name == name)
}

pub fn is_field(name: &str) -> bool {
    field(name).is_some()
}

fn index_of(name: &str) -> Option<usize> {
    FORM_FIELDS.iter().position(|f| f.name == name)
}

/// Current values of the form plus the metadata of the last imported image
#[derive(Debug, Clone, PartialEq)]
pub struct FormModel {
    values: Vec<String>,
    extracted: Option<RawMetadataRecord>,
    rdm_choices: Vec<String>,
}

impl Default for FormModel {
    fn default() -> Self {
        Self::new()
    }
}

impl FormModel {
    pub fn new() -> Self {
        Self {
            values: FORM_FIELDS.iter().map(|f| f.default.to_string()).collect(),
            extracted: None,
            rdm_choices: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        index_of(name).map(|i| self.values[i].as_str())
    }

    /// Set one field; returns `false` for names the form does not declare.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        match index_of(name) {
            Some(i) => {
                self.values[i] = value.into();
                true
            }
            None => false,
        }
    }

    /// Mutable access for text widgets
    pub fn value_mut(&mut self, name: &str) -> Option<&mut String> {
        index_of(name).map(move |i| &mut self.values[i])
    }

    /// Bulk update, e.g. with mapped image metadata. Returns the number of
    /// fields that were set.
    pub fn apply<'a, I>(&mut self, values: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        values
            .into_iter()
            .filter(|(name, value)| self.set(name, *value))
            .count()
    }

    /// Reset every field to its default and forget the extracted metadata.
    pub fn clear(&mut self) {
        for (value, spec) in self.values.iter_mut().zip(FORM_FIELDS) {
            *value = spec.default.to_string();
        }
        self.extracted = None;
    }

    /// (field, value) pairs in display order
    pub fn values(&self) -> impl Iterator<Item = (&'static FieldSpec, &str)> {
        FORM_FIELDS.iter().zip(self.values.iter().map(String::as_str))
    }

    /// Choice fields holding something outside their vocabulary. Advisory
    /// only, the value is kept as free text.
    pub fn off_vocabulary(&self) -> Vec<&'static str> {
        self.values()
            .filter(|&(spec, value)| {
                let choices = self.choices_for(spec);
                !value.is_empty() && !choices.is_empty() && !choices.iter().any(|c| c == value)
            })
            .map(|(spec, _)| spec.name)
            .collect()
    }

    /// Choices offered for a field. RDM Info uses the gateway's project list.
    pub fn choices_for(&self, spec: &FieldSpec) -> Vec<String> {
        if spec.name == RDM_INFO {
            self.rdm_choices.clone()
        } else {
            spec.choices.iter().map(|c| c.to_string()).collect()
        }
    }

    pub fn set_rdm_choices(&mut self, choices: Vec<String>) {
        self.rdm_choices = choices;
    }

    pub fn extracted(&self) -> Option<&RawMetadataRecord> {
        self.extracted.as_ref()
    }

    pub fn set_extracted(&mut self, record: Option<RawMetadataRecord>) {
        self.extracted = record;
    }

    /// Append `[timestamp]` to Notes on its own line.
    pub fn insert_timestamp(&mut self) {
        self.insert_timestamp_at(Local::now().naive_local());
    }

    pub fn insert_timestamp_at(&mut self, at: NaiveDateTime) {
        let stamp = format!("[{}] ", at.format(TIMESTAMP_FORMAT));
        if let Some(notes) = self.value_mut(NOTES) {
            if !notes.is_empty() && !notes.ends_with('\n') {
                notes.push('\n');
            }
            notes.push_str(&stamp);
        }
    }

    /// Fill "Date and time" with the current local time.
    pub fn set_now(&mut self) {
        self.set_now_at(Local::now().naive_local());
    }

    pub fn set_now_at(&mut self, at: NaiveDateTime) {
        self.set(DATE_AND_TIME, at.format(DATE_TIME_FORMAT).to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_field_names_unique() {
        for (i, a) in FORM_FIELDS.iter().enumerate() {
            for b in &FORM_FIELDS[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
        assert_eq!(FORM_FIELDS.len(), 20);
        assert_eq!(FORM_FIELDS.last().map(|f| f.name), Some(NOTES));
    }

    #[test]
    fn test_set_rejects_unknown_names() {
        let mut form = FormModel::new();
        assert!(form.set("Microscope", "LSM880"));
        assert!(!form.set("Microscope name", "LSM880"));
        assert_eq!(form.get("Microscope"), Some("LSM880"));
        assert_eq!(form.get("Microscope name"), None);
    }

    #[test]
    fn test_apply_and_clear() {
        let mut form = FormModel::new();
        form.set_extracted(Some(RawMetadataRecord::new()));
        let n = form.apply(vec![("Microscope", "LSM880"), ("Bogus", "x"), ("Z-stack", "Yes")]);
        assert_eq!(n, 2);
        form.clear();
        assert_eq!(form.get("Microscope"), Some(""));
        assert!(form.extracted().is_none());
    }

    #[test]
    fn test_off_vocabulary_is_advisory() {
        let mut form = FormModel::new();
        form.set("Immersion Media", "Honey");
        form.set("Imaging mode", "Confocal");
        form.set("Microscope", "anything");
        assert_eq!(form.off_vocabulary(), vec!["Immersion Media"]);
        assert_eq!(form.get("Immersion Media"), Some("Honey"));
    }

    #[test]
    fn test_rdm_choices_feed_rdm_field() {
        let mut form = FormModel::new();
        form.set(RDM_INFO, "Q1234");
        assert!(form.off_vocabulary().is_empty());
        form.set_rdm_choices(vec!["Q0001".into()]);
        assert_eq!(form.off_vocabulary(), vec![RDM_INFO]);
    }

    #[test]
    fn test_timestamps_append() {
        let mut form = FormModel::new();
        form.insert_timestamp_at(at(9, 0, 0));
        assert_eq!(form.get(NOTES), Some("[2025-03-14T09:00:00] "));

        let mut form = FormModel::new();
        form.set(NOTES, "first note");
        form.insert_timestamp_at(at(9, 0, 0));
        form.insert_timestamp_at(at(9, 30, 5));
        assert_eq!(
            form.get(NOTES),
            Some("first note\n[2025-03-14T09:00:00] \n[2025-03-14T09:30:05] ")
        );
    }

    #[test]
    fn test_set_now() {
        let mut form = FormModel::new();
        form.set_now_at(at(14, 32, 11));
        assert_eq!(form.get(DATE_AND_TIME), Some("2025-03-14 14:32:11"));
    }
}
