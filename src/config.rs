//! YAML setup file.
//!
//! ```yaml
//! connection:
//!   host: localhost
//!   database: acme
//!   user: root
//!   password: ""
//! tables: "wp_*,mytable1"     # or a list; a leading "*" excludes the rest
//! show: [TABLES, DATA]         # empty or absent means everything
//! folder: ../backups
//! compress: true
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read setup file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// A list given either as a comma separated string or a YAML sequence.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ListSetting {
    Joined(String),
    Items(Vec<String>),
}

impl ListSetting {
    pub fn entries(&self) -> Vec<String> {
        match self {
            ListSetting::Joined(joined) => joined.split(',').map(str::to_string).collect(),
            ListSetting::Items(items) => items.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSetup {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BackupSetup {
    #[serde(default)]
    pub connection: ConnectionSetup,
    pub tables: Option<ListSetting>,
    pub show: Option<ListSetting>,
    pub name: Option<String>,
    pub folder: Option<PathBuf>,
    pub page_size: Option<u64>,
    pub batch_size: Option<usize>,
    pub compress: Option<bool>,
}

impl BackupSetup {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joined_lists() {
        let setup = BackupSetup::from_yaml(
            r#"
connection:
  host: db
  database: acme
  user: backup
  password: secret
tables: "wp_*,mytable1"
show: "TABLES,DATA"
folder: ../backups
"#,
        )
        .unwrap();

        assert_eq!(setup.connection.host.as_deref(), Some("db"));
        assert_eq!(setup.connection.database.as_deref(), Some("acme"));
        assert_eq!(
            setup.tables.unwrap().entries(),
            vec!["wp_*".to_string(), "mytable1".to_string()]
        );
        assert_eq!(
            setup.show.unwrap().entries(),
            vec!["TABLES".to_string(), "DATA".to_string()]
        );
        assert_eq!(setup.folder, Some(PathBuf::from("../backups")));
    }

    #[test]
    fn test_sequence_lists() {
        let setup = BackupSetup::from_yaml(
            r#"
tables: ["*", "logs_*"]
show: [TABLES]
page_size: 500
batch_size: 50
compress: true
"#,
        )
        .unwrap();

        assert_eq!(
            setup.tables,
            Some(ListSetting::Items(vec!["*".into(), "logs_*".into()]))
        );
        assert_eq!(setup.page_size, Some(500));
        assert_eq!(setup.batch_size, Some(50));
        assert_eq!(setup.compress, Some(true));
        assert_eq!(setup.connection, ConnectionSetup::default());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(matches!(
            BackupSetup::from_yaml("tabels: users"),
            Err(ConfigError::YamlError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            BackupSetup::from_file("/nonexistent/backup.yaml"),
            Err(ConfigError::IoError(_))
        ));
    }
}
