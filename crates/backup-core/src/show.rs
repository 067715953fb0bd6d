//! Script sections a run may include.

use std::fmt;
use std::str::FromStr;

use crate::error::BackupError;

/// A category of objects the script can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    /// `CREATE DATABASE` and `USE`.
    Database,
    /// Table drops, creates and foreign keys.
    Tables,
    /// `CREATE OR REPLACE VIEW`.
    Views,
    /// Stored procedures and functions.
    Programs,
    Triggers,
    /// Truncates and row inserts.
    Data,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Database,
        Section::Tables,
        Section::Views,
        Section::Programs,
        Section::Triggers,
        Section::Data,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Database => "DATABASE",
            Section::Tables => "TABLES",
            Section::Views => "VIEWS",
            Section::Programs => "PROGRAMS",
            Section::Triggers => "TRIGGERS",
            Section::Data => "DATA",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Section::ALL
            .into_iter()
            .find(|section| section.as_str() == upper)
            .ok_or_else(|| BackupError::Config(format!("Unknown show section '{}'", s.trim())))
    }
}

/// The set of sections to emit. Empty means every section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowFlags {
    sections: Vec<Section>,
}

impl ShowFlags {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_sections<I: IntoIterator<Item = Section>>(sections: I) -> Self {
        let mut sections: Vec<Section> = sections.into_iter().collect();
        sections.sort();
        sections.dedup();
        Self { sections }
    }

    /// Parse list entries such as `["TABLES", "data"]`.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, BackupError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sections = entries
            .into_iter()
            .filter(|e| !e.as_ref().trim().is_empty())
            .map(|e| e.as_ref().parse())
            .collect::<Result<Vec<Section>, _>>()?;
        Ok(Self::from_sections(sections))
    }

    /// Parse a comma separated list such as `"TABLES,DATA"`.
    pub fn parse(list: &str) -> Result<Self, BackupError> {
        Self::from_entries(list.split(','))
    }

    pub fn shows(&self, section: Section) -> bool {
        self.sections.is_empty() || self.sections.contains(&section)
    }
}
