//! Installed-application registry model and its XML document encoding.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledAppEntry {
    pub appid: String,
    pub appname: String,
    pub appversion: String,
}

impl InstalledAppEntry {
    /// The XML text decoder drops whitespace next to tags, so stored values
    /// never carry any.
    fn normalized(self) -> Self {
        Self {
            appid: normalize(&self.appid),
            appname: normalize(&self.appname),
            appversion: normalize(&self.appversion),
        }
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_string()
}

/// Ordered collection of installed applications, unique by `appid`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    entries: Vec<InstalledAppEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated { previous_version: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(InstalledAppEntry),
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry document is not valid: {0}")]
    Decode(String),
    #[error("registry document could not be encoded: {0}")]
    Encode(String),
    #[error("registry lists appid '{0}' more than once")]
    DuplicateAppId(String),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "Applications")]
struct RegistryDocument {
    #[serde(rename = "Application", default)]
    applications: Vec<InstalledAppEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from `entries`, trimming surrounding whitespace from
    /// every value.
    pub fn from_entries(entries: Vec<InstalledAppEntry>) -> Result<Self, RegistryError> {
        let entries: Vec<_> = entries.into_iter().map(InstalledAppEntry::normalized).collect();
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.appid.as_str()) {
                return Err(RegistryError::DuplicateAppId(entry.appid.clone()));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[InstalledAppEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, appid: &str) -> Option<&InstalledAppEntry> {
        let appid = appid.trim();
        self.entries.iter().find(|entry| entry.appid == appid)
    }

    /// Insert a new entry, or update the version of an existing one.
    ///
    /// An existing entry keeps its original `appname`; only `appversion`
    /// follows the reinstalled package. Values are stored trimmed.
    pub fn upsert(&mut self, appid: &str, appname: &str, appversion: &str) -> UpsertOutcome {
        let appid = appid.trim();
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.appid == appid) {
            let previous_version = std::mem::replace(&mut entry.appversion, normalize(appversion));
            return UpsertOutcome::Updated { previous_version };
        }
        self.entries.push(InstalledAppEntry {
            appid: appid.to_string(),
            appname: normalize(appname),
            appversion: normalize(appversion),
        });
        UpsertOutcome::Inserted
    }

    pub fn remove(&mut self, appid: &str) -> RemoveOutcome {
        let appid = appid.trim();
        match self.entries.iter().position(|entry| entry.appid == appid) {
            Some(index) => RemoveOutcome::Removed(self.entries.remove(index)),
            None => RemoveOutcome::NotFound,
        }
    }

    /// Decode an `<Applications>` document.
    pub fn decode(contents: &str) -> Result<Self, RegistryError> {
        let document: RegistryDocument = quick_xml::de::from_str(contents)
            .map_err(|err| RegistryError::Decode(err.to_string()))?;
        Self::from_entries(document.applications)
    }

    /// Encode the registry as a complete XML document, declaration included.
    pub fn encode(&self) -> Result<String, RegistryError> {
        let document = RegistryDocument {
            applications: self.entries.clone(),
        };
        let mut body = String::new();
        let mut serializer = quick_xml::se::Serializer::new(&mut body);
        serializer.indent(' ', 2);
        document
            .serialize(serializer)
            .map_err(|err| RegistryError::Encode(err.to_string()))?;
        Ok(format!("{XML_DECLARATION}\n{body}\n"))
    }
}
