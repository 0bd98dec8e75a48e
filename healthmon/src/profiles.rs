//! Connection profiles: read-only JSON mapping of profile name -> { url, tls_ca }
//! Stored under XDG config dir: $XDG_CONFIG_HOME/healthmon/profiles.json (fallback ~/.config/healthmon/profiles.json)

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProfileEntry {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_ca: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfilesFile {
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileEntry>,
    #[serde(default)]
    pub version: u32,
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("healthmon")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("healthmon")
    }
}

pub fn profiles_path() -> PathBuf {
    config_dir().join("profiles.json")
}

// A missing or unreadable file behaves like an empty one.
pub fn load_profiles() -> ProfilesFile {
    let path = profiles_path();
    match fs::read_to_string(&path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
        Err(_) => ProfilesFile::default(),
    }
}

#[derive(Debug, PartialEq)]
pub enum ResolveProfile {
    /// Use the provided runtime inputs. (url, tls_ca)
    Direct(String, Option<String>),
    /// Loaded from existing profile entry (url, tls_ca)
    Loaded(String, Option<String>),
    /// Named profile does not exist
    Missing(String),
    /// Nothing given; caller falls back to its configured base
    None,
}

pub struct ProfileRequest {
    pub profile_name: Option<String>,
    pub url: Option<String>,
    pub tls_ca: Option<String>,
}

impl ProfileRequest {
    pub fn resolve(self, pf: &ProfilesFile) -> ResolveProfile {
        // An explicit URL always wins over a stored profile
        if let Some(u) = self.url {
            return ResolveProfile::Direct(u, self.tls_ca);
        }
        match self.profile_name {
            Some(name) => match pf.profiles.get(&name) {
                Some(entry) => ResolveProfile::Loaded(
                    entry.url.clone(),
                    self.tls_ca.or_else(|| entry.tls_ca.clone()),
                ),
                None => ResolveProfile::Missing(name),
            },
            None => ResolveProfile::None,
        }
    }
}
