/// ReadMe template discovery
///
/// Any `*_ReadME_template.txt` (case-insensitive) in the template directory
/// is offered at startup. A template is an ordinary ReadMe and only prefills
/// the form.

use std::fs;
use std::path::{Path, PathBuf};

use crate::data::readme::{self, ReadmeDocument};
use crate::error::{ReadmeError, Result};

pub const TEMPLATE_SUFFIX: &str = "_readme_template.txt";

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// File name without the template suffix
    pub name: String,
    pub path: PathBuf,
}

impl Template {
    pub fn load(&self) -> Result<ReadmeDocument> {
        readme::load(&self.path)
    }
}

/// Template files in `dir`, sorted by name.
pub fn discover(dir: &Path) -> Result<Vec<Template>> {
    let entries = fs::read_dir(dir).map_err(|e| ReadmeError::io(dir, e))?;
    let mut templates: Vec<Template> = entries
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let split = file_name.len().checked_sub(TEMPLATE_SUFFIX.len())?;
            if split == 0
                || !file_name.is_char_boundary(split)
                || !file_name[split..].eq_ignore_ascii_case(TEMPLATE_SUFFIX)
            {
                return None;
            }
            Some(Template {
                name: file_name[..split].to_string(),
                path: entry.path(),
            })
        })
        .collect();
    templates.sort_by(|a, b| a.name.cmp(&b.name));
    log::info!("Found {} ReadMe templates in {}", templates.len(), dir.display());
    Ok(templates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovers_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Confocal5_ReadME_template.txt"), "Microscope: Confocal 5\n").unwrap();
        fs::write(dir.path().join("airyscan_readme_TEMPLATE.txt"), "Specialist modality: Airyscan\n").unwrap();
        fs::write(dir.path().join("Exp1_ReadMe.txt"), "Microscope: other\n").unwrap();
        fs::write(dir.path().join("_ReadME_template.txt"), "Microscope: nameless\n").unwrap();

        let templates = discover(dir.path()).unwrap();
        let names: Vec<&str> = templates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Confocal5", "airyscan"]);

        let doc = templates[0].load().unwrap();
        assert_eq!(doc.get("Microscope"), Some("Confocal 5"));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover(&dir.path().join("absent")),
            Err(ReadmeError::Io { .. })
        ));
    }
}
