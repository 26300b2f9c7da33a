//! Institution registry
//!
//! The registry is the single owner of the institution records loaded from
//! `banks.json`. Lookups return an index so that the only mutation, replacing
//! an institution's icon, goes back through the owner.

use banklogo_common::{LogoError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// One financial institution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionRecord {
    #[serde(default, deserialize_with = "code_string")]
    pub code: String,

    #[serde(default, deserialize_with = "code_string")]
    pub nip_code: String,

    pub name: String,

    #[serde(default)]
    pub icon: Option<String>,

    /// Fields this tool does not interpret, carried through on save
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl InstitutionRecord {
    pub fn new(
        code: impl Into<String>,
        nip_code: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            nip_code: nip_code.into(),
            name: name.into(),
            icon: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Whether `code` equals either the bank code or the NIP code
    pub fn matches(&self, code: &str) -> bool {
        !code.is_empty() && (self.code == code || self.nip_code == code)
    }
}

/// Codes appear as JSON strings, numbers and nulls in the wild. A null code
/// becomes empty and never matches.
fn code_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCode {
        Text(String),
        Number(u64),
    }

    Ok(match Option::<RawCode>::deserialize(deserializer)? {
        Some(RawCode::Text(text)) => text.trim().to_string(),
        Some(RawCode::Number(number)) => number.to_string(),
        None => String::new(),
    })
}

/// In-memory registry of institutions, in source order
#[derive(Debug, Clone, Default)]
pub struct Registry {
    records: Vec<InstitutionRecord>,
}

impl Registry {
    pub fn new(records: Vec<InstitutionRecord>) -> Self {
        Self { records }
    }

    /// Load the registry from a JSON file
    ///
    /// Failure here is fatal for a run; the caller aborts.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LogoError::registry(format!("cannot read {}: {}", path.display(), e))
        })?;

        let registry = Self::from_json(&raw).map_err(|e| {
            LogoError::registry(format!("cannot parse {}: {}", path.display(), e))
        })?;

        info!(
            path = %path.display(),
            institutions = registry.len(),
            "Registry loaded"
        );

        Ok(registry)
    }

    /// Parse registry JSON (an array of institution records)
    pub fn from_json(raw: &str) -> Result<Self> {
        let records: Vec<InstitutionRecord> = serde_json::from_str(raw)?;
        let registry = Self::new(records);

        for code in registry.duplicate_codes() {
            warn!(code = %code, "Code is claimed by more than one institution, first match wins");
        }
        if registry.is_empty() {
            warn!("Registry contains no institutions, every image will be unmatched");
        }

        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[InstitutionRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&InstitutionRecord> {
        self.records.get(index)
    }

    /// Index of the first record whose code or NIP code equals `code`
    pub fn find(&self, code: &str) -> Option<usize> {
        self.records.iter().position(|record| record.matches(code))
    }

    /// Replace the icon of the record at `index`
    ///
    /// Returns false when the index is out of range.
    pub fn set_icon(&mut self, index: usize, url: impl Into<String>) -> bool {
        match self.records.get_mut(index) {
            Some(record) => {
                let url = url.into();
                debug!(institution = %record.name, url = %url, "Icon updated");
                record.icon = Some(url);
                true
            }
            None => false,
        }
    }

    /// Codes matched by more than one record, sorted
    pub fn duplicate_codes(&self) -> Vec<String> {
        let mut owners: BTreeMap<&str, usize> = BTreeMap::new();
        for record in &self.records {
            let codes: BTreeSet<&str> = [record.code.as_str(), record.nip_code.as_str()]
                .into_iter()
                .filter(|code| !code.is_empty())
                .collect();
            for code in codes {
                *owners.entry(code).or_default() += 1;
            }
        }

        owners
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(code, _)| code.to_string())
            .collect()
    }

    /// All records, with `placeholder` filled in where no icon is set
    pub fn snapshot_with_placeholder(&self, placeholder: &str) -> Vec<InstitutionRecord> {
        self.records
            .iter()
            .cloned()
            .map(|mut record| {
                if record.icon.as_deref().is_none_or(|icon| icon.trim().is_empty()) {
                    record.icon = Some(placeholder.to_string());
                }
                record
            })
            .collect()
    }

    /// Write the registry back as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>, placeholder: &str) -> Result<()> {
        let path = path.as_ref();
        let mut json = serde_json::to_string_pretty(&self.snapshot_with_placeholder(placeholder))?;
        json.push('\n');
        std::fs::write(path, json)?;

        info!(path = %path.display(), institutions = self.len(), "Registry saved");

        Ok(())
    }
}
