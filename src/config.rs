//! Typed configuration for a conversion run.
//!
//! A [`Config`] is loaded once (TOML by default, JSON when the file ends in `.json`), validated
//! with [`Config::validate`], and then passed by reference into each stage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::{ConvertError, ConvertResult};
use crate::source::FileKind;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = ".tabsql.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// IANA timezone used for spreadsheet time cells and zone-less datetimes. Defaults to UTC.
    pub timezone: Option<String>,
    pub local: LocalConfig,
    pub remote: RemoteConfig,
    pub head: HeadConfig,
    pub body: BodyConfig,
    pub xlsx: XlsxConfig,
    /// Path template → key metadata.
    pub table: BTreeMap<String, TableConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    pub repo: Option<String>,
    /// Branch or tag, e.g. `refs/heads/main`.
    pub refs: Option<String>,
    pub private_key: PrivateKeyConfig,
    pub basic_auth: BasicAuthConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrivateKeyConfig {
    pub file_path: Option<PathBuf>,
    /// Passphrase for an encrypted key.
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BasicAuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Where header (schema) files live and which rows carry names and types.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeadConfig {
    pub path: PathBuf,
    pub ext: String,
    /// 1-based row holding column names.
    pub column_name_row: usize,
    /// 1-based row holding column type tokens.
    pub column_type_row: usize,
}

impl Default for HeadConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            ext: "csv".to_string(),
            column_name_row: 1,
            column_type_row: 2,
        }
    }
}

/// Where body (data) files live and where data starts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BodyConfig {
    pub path: PathBuf,
    pub ext: String,
    /// 1-based row of the first data row.
    pub start_row: usize,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            ext: "csv".to_string(),
            start_row: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct XlsxConfig {
    /// Sheet to read. The first sheet is used when unset.
    pub sheet: Option<String>,
}

/// Key metadata for tables matched by one path template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableConfig {
    pub primary_key: Vec<String>,
    pub unique_keys: Vec<Vec<String>>,
    pub index_keys: Vec<Vec<String>>,
    pub foreign_keys: Vec<ForeignKeyConfig>,
    /// Declared type (`int` or `string`) per template parameter, in order.
    pub shard_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForeignKeyConfig {
    pub column: String,
    pub reference: String,
}

impl Config {
    /// Load a config file. Files ending in `.json` are read as JSON, everything else as TOML.
    pub fn from_path(path: impl AsRef<Path>) -> ConvertResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    /// Load `path` if given, else [`DEFAULT_CONFIG_FILE`] from the working directory if it
    /// exists, else the defaults.
    pub fn load(path: Option<&Path>) -> ConvertResult<Self> {
        match path {
            Some(p) => Self::from_path(p),
            None => {
                let default_path = std::env::current_dir()?.join(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_path(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_toml_str(text: &str) -> ConvertResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> ConvertResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Resolved timezone (UTC when unset).
    pub fn tz(&self) -> ConvertResult<Tz> {
        match self.timezone.as_deref().map(str::trim) {
            None | Some("") => Ok(Tz::UTC),
            Some(name) => name.parse::<Tz>().map_err(|e| ConvertError::Config {
                message: format!("unknown timezone '{name}': {e}"),
            }),
        }
    }

    /// Check row indices, extensions, timezone and source settings.
    pub fn validate(&self) -> ConvertResult<()> {
        if self.head.column_name_row == 0 || self.head.column_type_row == 0 {
            return Err(config_err("head.column_name_row and head.column_type_row are 1-based"));
        }
        if self.body.start_row == 0 {
            return Err(config_err("body.start_row is 1-based"));
        }
        for (key, ext) in [("head.ext", &self.head.ext), ("body.ext", &self.body.ext)] {
            if FileKind::from_extension(ext).is_none() {
                return Err(config_err(&format!(
                    "{key} '{ext}' is not one of xlsx, csv, tsv"
                )));
            }
        }
        self.tz()?;
        if self.local.path.is_none() && self.remote.repo.is_none() {
            return Err(config_err("no source: set local.path or remote.repo"));
        }
        Ok(())
    }
}

fn config_err(message: &str) -> ConvertError {
    ConvertError::Config {
        message: message.to_string(),
    }
}
