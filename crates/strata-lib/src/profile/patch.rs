use std::collections::{BTreeMap, BTreeSet};

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Severity of a recoverable issue found while decoding a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProblemSeverity {
    Warning,
    Error,
}

/// A recoverable issue accumulated on a patch instead of aborting its
/// decode, so a whole load can be diagnosed in one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    pub severity: ProblemSeverity,
    pub message: String,
}

/// Placement hint for a library artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryHint {
    /// Resolved from a local storage prefix instead of downloaded.
    Local,
    AlwaysStale,
    ForgePackXz,
}

impl LibraryHint {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "local" => Some(LibraryHint::Local),
            "always-stale" => Some(LibraryHint::AlwaysStale),
            "forge-pack-xz" => Some(LibraryHint::ForgePackXz),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LibraryHint::Local => "local",
            LibraryHint::AlwaysStale => "always-stale",
            LibraryHint::ForgePackXz => "forge-pack-xz",
        }
    }
}

/// Download metadata for one artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One library required by a patch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryRef {
    /// Maven coordinates: group:artifact:version[:classifier].
    pub name: String,

    /// Custom repository base URL.
    pub url: Option<String>,

    pub hint: Option<LibraryHint>,

    /// Direct download override, bypassing repository resolution.
    pub absolute_url: Option<String>,

    /// Local storage root for `local`-hinted libraries. Runtime-only, never
    /// serialized.
    pub storage_prefix: Option<String>,

    pub downloads: Option<DownloadInfo>,
}

impl LibraryRef {
    pub fn new(name: impl Into<String>) -> Self {
        LibraryRef {
            name: name.into(),
            ..LibraryRef::default()
        }
    }

    /// A `local`-hinted library must know its storage prefix before it can
    /// be resolved.
    pub fn is_resolvable(&self) -> bool {
        self.hint != Some(LibraryHint::Local) || self.storage_prefix.is_some()
    }
}

/// A jar-level modification carried by a patch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JarMod {
    pub name: String,
    pub original_name: Option<String>,
}

/// One layered contribution (vanilla, pack, user) to an effective version
/// definition. Recreated wholesale on every load; owned exclusively by the
/// profile that loaded it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    pub uid: String,
    pub name: String,
    pub version: String,

    /// Declared Minecraft dependency.
    pub minecraft_version: String,

    /// Explicit merge priority; lower sorts first. Ties break by insertion
    /// order.
    pub order: i32,

    pub main_class: Option<String>,
    pub applet_class: Option<String>,
    pub minecraft_arguments: Option<String>,
    pub assets: Option<String>,
    pub release_type: Option<String>,

    /// ISO-8601 release time, kept verbatim.
    pub release_time: Option<String>,

    /// Named artifact downloads ("client", "server", ...).
    pub downloads: BTreeMap<String, DownloadInfo>,

    pub libraries: Vec<LibraryRef>,
    pub main_jar: Option<LibraryRef>,
    pub jar_mods: Vec<JarMod>,
    pub tweakers: Vec<String>,
    pub traits: BTreeSet<String>,

    pub problems: Vec<Problem>,
}

impl Patch {
    pub fn add_problem(&mut self, severity: ProblemSeverity, message: impl Into<String>) {
        self.problems.push(Problem {
            severity,
            message: message.into(),
        });
    }

    /// Highest severity among accumulated problems, if any.
    pub fn problem_severity(&self) -> Option<ProblemSeverity> {
        self.problems.iter().map(|p| p.severity).max()
    }

    /// The declared release time as an epoch timestamp, when present and
    /// parseable.
    pub fn release_epoch(&self) -> Option<i64> {
        let raw = self.release_time.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.timestamp())
    }
}
