/// RDM gateway probe
///
/// The institutional storage gateway is a network share whose top-level
/// folders are RDM projects. Listing it is advisory: when the share is not
/// reachable the RDM field stays free text.

use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum RdmStatus {
    /// No gateway configured; nothing probed
    NotConfigured,
    /// Gateway listed; project folders sorted by name
    Connected(Vec<String>),
    /// Gateway configured but not reachable
    Unavailable(String),
}

impl RdmStatus {
    pub fn projects(&self) -> &[String] {
        match self {
            RdmStatus::Connected(projects) => projects,
            _ => &[],
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, RdmStatus::Connected(_))
    }

    pub fn label(&self) -> String {
        match self {
            RdmStatus::NotConfigured => "RDM gateway not configured".to_string(),
            RdmStatus::Connected(p) => format!("RDM gateway connected ({} projects)", p.len()),
            RdmStatus::Unavailable(reason) => format!("RDM gateway unavailable: {}", reason),
        }
    }
}

/// List the project folders below `gateway`.
pub fn probe(gateway: Option<&Path>) -> RdmStatus {
    let gateway = match gateway {
        Some(g) => g,
        None => return RdmStatus::NotConfigured,
    };

    let entries = match fs::read_dir(gateway) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Could not access RDM gateway {}: {}", gateway.display(), e);
            return RdmStatus::Unavailable(e.to_string());
        }
    };

    let mut projects: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    projects.sort();
    log::info!(
        "RDM gateway {} lists {} projects",
        gateway.display(),
        projects.len()
    );
    RdmStatus::Connected(projects)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_directories_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("Q2001")).unwrap();
        fs::create_dir(dir.path().join("Q1001")).unwrap();
        fs::write(dir.path().join("readme.txt"), "not a project").unwrap();

        let status = probe(Some(dir.path()));
        assert!(status.is_connected());
        assert_eq!(status.projects(), ["Q1001".to_string(), "Q2001".to_string()]);
    }

    #[test]
    fn test_missing_gateway_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let status = probe(Some(&dir.path().join("offline")));
        assert!(matches!(status, RdmStatus::Unavailable(_)));
        assert!(status.projects().is_empty());
        assert_eq!(probe(None), RdmStatus::NotConfigured);
    }
}
