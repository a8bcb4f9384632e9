use std::collections::BTreeMap;

/// Release classification of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseType {
    Release,
    Snapshot,
    Other(String),
}

impl ReleaseType {
    pub fn parse(s: &str) -> Self {
        match s {
            "release" => ReleaseType::Release,
            "snapshot" => ReleaseType::Snapshot,
            other => ReleaseType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReleaseType::Release => "release",
            ReleaseType::Snapshot => "snapshot",
            ReleaseType::Other(s) => s,
        }
    }
}

impl std::fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which descriptor fields a merge touched, so the owning catalog can emit
/// precisely scoped change notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergedFields {
    pub time: bool,
    pub version_type: bool,
    pub requires: bool,
}

impl MergedFields {
    pub fn any(&self) -> bool {
        self.time || self.version_type || self.requires
    }
}

/// Metadata record for one available version in a catalog.
///
/// Created by the index codec, or synthesized as an empty placeholder on
/// first lookup by id. Mutated only through [`VersionDescriptor::merge`],
/// which the owning catalog drives; external holders never write to it.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionDescriptor {
    uid: String,
    version: String,
    version_type: Option<ReleaseType>,
    release_time: i64,
    requires: BTreeMap<String, String>,
}

impl VersionDescriptor {
    /// An empty placeholder for a version that hasn't been loaded yet.
    pub fn new(uid: &str, version: &str) -> Self {
        VersionDescriptor {
            uid: uid.to_string(),
            version: version.to_string(),
            version_type: None,
            release_time: 0,
            requires: BTreeMap::new(),
        }
    }

    pub fn with_metadata(
        uid: &str,
        version: &str,
        version_type: Option<ReleaseType>,
        release_time: i64,
        requires: BTreeMap<String, String>,
    ) -> Self {
        VersionDescriptor {
            uid: uid.to_string(),
            version: version.to_string(),
            version_type,
            release_time,
            requires,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// The version string, unique within the owning catalog.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn version_type(&self) -> Option<&ReleaseType> {
        self.version_type.as_ref()
    }

    pub fn is_release(&self) -> bool {
        self.version_type == Some(ReleaseType::Release)
    }

    /// Raw epoch timestamp. Descending order is newest-first.
    pub fn release_time(&self) -> i64 {
        self.release_time
    }

    /// Dependency id -> required version string.
    pub fn requires(&self) -> &BTreeMap<String, String> {
        &self.requires
    }

    /// Fold a freshly loaded snapshot of the same version into this
    /// descriptor. Incoming non-empty values win per field; the dependency
    /// mapping is unioned. Returns which fields actually changed.
    pub(crate) fn merge(&mut self, other: &VersionDescriptor) -> MergedFields {
        let mut changed = MergedFields::default();

        if let Some(incoming) = &other.version_type {
            if self.version_type.as_ref() != Some(incoming) {
                self.version_type = Some(incoming.clone());
                changed.version_type = true;
            }
        }

        if other.release_time != 0 && other.release_time != self.release_time {
            self.release_time = other.release_time;
            changed.time = true;
        }

        for (dep, required) in &other.requires {
            if self.requires.get(dep) != Some(required) {
                self.requires.insert(dep.clone(), required.clone());
                changed.requires = true;
            }
        }

        changed
    }
}
