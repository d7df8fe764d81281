use crate::kind::ResourceKind;
use crate::policy::FieldPolicy;
use crate::record::Record;
use anyhow::Context;
use serde::de::{Error, MapAccess};
use serde::{de, Deserialize, Deserializer};
use std::fmt::{self, Formatter};
use std::fs;
use std::fs::File;
use std::path::Path;

/// Desired state, reconciled entry by entry in file order.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub resources: Vec<Entry>,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub kind: ResourceKind,
    /// Delete existing resources not asked for
    #[serde(default)]
    pub purge: bool,
    /// Wait for created resources to become ready
    #[serde(default = "default_wait")]
    pub wait: bool,
    /// Replaces the kind's default policy
    #[serde(default)]
    pub policy: Option<FieldPolicy>,
    #[serde(default)]
    pub embed: Vec<String>,
    #[serde(default)]
    pub items: Vec<Record>,
}

fn default_wait() -> bool {
    true
}

impl Entry {
    pub fn policy(&self) -> FieldPolicy {
        self.policy
            .clone()
            .unwrap_or_else(|| self.kind.default_policy())
    }
}

/// A secret given inline, or read from a file.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StringOrFile;

        #[derive(serde::Deserialize)]
        struct File {
            path: String,
        }

        impl<'de> de::Visitor<'de> for StringOrFile {
            type Value = Secret;

            fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
                write!(
                    formatter,
                    "Expected either string content, or an object with a path field"
                )
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                Ok(Secret(v.to_string()))
            }

            fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let file: File =
                    Deserialize::deserialize(de::value::MapAccessDeserializer::new(map))?;
                let content = fs::read_to_string(&file.path).map_err(|e| {
                    Error::custom(format!(
                        "failed to load content from external source ({}): {e}",
                        file.path
                    ))
                })?;
                Ok(Secret(content.trim().to_string()))
            }
        }

        deserializer.deserialize_any(StringOrFile)
    }
}

pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Manifest> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open manifest {}", path.display()))?;
    serde_yaml::from_reader(file).with_context(|| format!("parse manifest {}", path.display()))
}
