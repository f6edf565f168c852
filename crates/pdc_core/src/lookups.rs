//! Fixed value sets referenced by releases, variants and repos.
//!
//! Each lookup is a closed enum; the string form is the wire name.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator};

/// Common behaviour of the closed value sets.
pub trait Lookup: Copy + AsRef<str> + FromStr + IntoEnumIterator + 'static {
    fn description(&self) -> &'static str;

    /// Quoted, comma separated wire names in declaration order.
    fn allowed() -> String {
        Self::iter()
            .map(|v| format!("'{}'", v.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Parse a wire name, producing the field error message on failure.
    fn parse_choice(value: &str) -> Result<Self, String> {
        value.parse().map_err(|_| {
            format!(
                "'{value}' is not allowed value. Use one of {}.",
                Self::allowed()
            )
        })
    }

    fn entries() -> Vec<LookupEntry> {
        Self::iter()
            .map(|v| LookupEntry {
                name: v.as_ref().to_string(),
                description: v.description().to_string(),
            })
            .collect()
    }
}

/// Wire shape of a lookup value in list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupEntry {
    pub name: String,
    pub description: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Service {
    Rhn,
    Pulp,
    Ftp,
}

impl Lookup for Service {
    fn description(&self) -> &'static str {
        match self {
            Self::Rhn => "Red Hat Network",
            Self::Pulp => "Pulp (CDN)",
            Self::Ftp => "FTP",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RepoFamily {
    Dist,
    Beta,
    Htb,
}

impl Lookup for RepoFamily {
    fn description(&self) -> &'static str {
        match self {
            Self::Dist => "Production repositories",
            Self::Beta => "Beta (pre-production) repositories",
            Self::Htb => "Repositories for High Touch Beta (HTB) customers",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentFormat {
    Rpm,
    Iso,
    Kickstart,
    Comps,
}

impl Lookup for ContentFormat {
    fn description(&self) -> &'static str {
        match self {
            Self::Rpm => "RPM packages",
            Self::Iso => "ISO images",
            Self::Kickstart => "Kickstart trees",
            Self::Comps => "Comps XML",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentCategory {
    Binary,
    Debug,
    Source,
}

impl Lookup for ContentCategory {
    fn description(&self) -> &'static str {
        match self {
            Self::Binary => "Binary",
            Self::Debug => "Debug",
            Self::Source => "Source",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum VariantType {
    Variant,
    Optional,
    Addon,
    LayeredProduct,
}

impl Lookup for VariantType {
    fn description(&self) -> &'static str {
        match self {
            Self::Variant => "Variant",
            Self::Optional => "Optional",
            Self::Addon => "Addon",
            Self::LayeredProduct => "Layered product",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReleaseType {
    Ga,
    Updates,
    Eus,
    Aus,
    Els,
    Fast,
}

impl Lookup for ReleaseType {
    fn description(&self) -> &'static str {
        match self {
            Self::Ga => "Release",
            Self::Updates => "Updates",
            Self::Eus => "Extended Update Support",
            Self::Aus => "Advanced Update Support",
            Self::Els => "Extended Life-cycle Support",
            Self::Fast => "FAST",
        }
    }
}
