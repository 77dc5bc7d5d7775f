use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use k8_apiserver_storage::StorageConfig;
use k8_apiserver_storage::DEFAULT_PREFIX;

use crate::ConfigError;

/// options of an API server serving a single group
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerOptions {
    pub group: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// root of every key the server writes, defaults to `/registry`.
    /// Resources live below it under `<group>/<resource>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etcd_path: Option<String>,
    pub storage: StorageConfig,
}

impl ServerOptions {
    /// options for group with everything else defaulted
    pub fn for_group<S: Into<String>>(group: S) -> Self {
        Self {
            group: group.into(),
            ..Default::default()
        }
    }

    pub fn from_file<T: AsRef<Path>>(path: T) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading server options");
        let file = File::open(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        serde_yaml::from_reader(reader).map_err(ConfigError::Parse)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(ConfigError::Render)
    }

    /// fill in values derived from the group
    pub fn complete(mut self) -> Result<Self, ConfigError> {
        if self.group.is_empty() {
            return Err(ConfigError::NoGroup);
        }

        let etcd_path = match self.etcd_path.take() {
            Some(path) if !path.is_empty() => path,
            _ => DEFAULT_PREFIX.to_owned(),
        };
        self.storage.prefix = etcd_path.clone();
        self.etcd_path = Some(etcd_path);

        if self.name.is_empty() {
            let short = self.group.split('.').next().unwrap_or_default();
            self.name = format!("{}-server", short);
        }
        debug!(group = %self.group, prefix = %self.storage.prefix, "options completed");
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = vec![];

        if self.group.is_empty() {
            errors.push("group must not be empty".to_owned());
        } else if !self.group.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-'
        }) {
            errors.push(format!("group '{}' is not a valid DNS subdomain", self.group));
        }

        if !self.storage.prefix.starts_with('/') {
            errors.push(format!(
                "storage prefix '{}' must be an absolute path",
                self.storage.prefix
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}
