use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::meta::catalog::VersionCatalog;
use crate::meta::version::{ReleaseType, VersionDescriptor};

/// Highest index document format version this build understands.
const CURRENT_FORMAT_VERSION: u64 = 1;

/// On-the-wire shape of a catalog index document (`<uid>/index.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogIndex {
    #[serde(default)]
    pub format_version: u64,

    pub uid: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_uid: Option<String>,

    #[serde(default)]
    pub versions: Vec<CatalogIndexEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogIndexEntry {
    pub version: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub release_type: Option<String>,

    pub release_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requires: BTreeMap<String, String>,
}

/// Decode an index document into a fresh catalog, ready to be merged into a
/// long-lived one.
pub fn parse_catalog(text: &str, source_label: &str) -> Result<VersionCatalog, FormatError> {
    if text.trim().is_empty() {
        return Err(FormatError::EmptyDocument {
            source_label: source_label.to_string(),
        });
    }
    let index: CatalogIndex =
        serde_json::from_str(text).map_err(|source| FormatError::Malformed {
            source_label: source_label.to_string(),
            source,
        })?;
    if index.format_version > CURRENT_FORMAT_VERSION {
        return Err(FormatError::UnsupportedFormatVersion {
            source_label: source_label.to_string(),
            version: index.format_version,
        });
    }

    let mut catalog = VersionCatalog::new(&index.uid);
    if index.name.is_some() {
        catalog.set_name(index.name.clone());
    }
    if index.parent_uid.is_some() {
        catalog.set_parent_uid(index.parent_uid.clone());
    }
    let entries = index
        .versions
        .iter()
        .map(|entry| {
            VersionDescriptor::with_metadata(
                &index.uid,
                &entry.version,
                entry.release_type.as_deref().map(ReleaseType::parse),
                entry.release_time.timestamp(),
                entry.requires.clone(),
            )
        })
        .collect();
    catalog.set_entries(entries);
    Ok(catalog)
}

/// Inverse of [`parse_catalog`] for the catalog's current visible entries.
pub fn catalog_index(catalog: &VersionCatalog) -> CatalogIndex {
    CatalogIndex {
        format_version: CURRENT_FORMAT_VERSION,
        uid: catalog.uid().to_string(),
        name: catalog.name().map(str::to_string),
        parent_uid: catalog.parent_uid().map(str::to_string),
        versions: catalog
            .entries()
            .map(|version| CatalogIndexEntry {
                version: version.version().to_string(),
                release_type: version.version_type().map(|t| t.as_str().to_string()),
                release_time: DateTime::<Utc>::from_timestamp(version.release_time(), 0)
                    .unwrap_or_default(),
                requires: version.requires().clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"{
        "formatVersion": 1,
        "uid": "net.minecraftforge",
        "name": "Forge",
        "parentUid": "net.minecraft",
        "versions": [
            {
                "version": "14.23.5.2860",
                "type": "release",
                "releaseTime": "2018-09-15T12:00:00Z",
                "requires": { "net.minecraft": "1.12.2" }
            },
            {
                "version": "25.0.9",
                "type": "snapshot",
                "releaseTime": "2019-01-20T12:00:00Z"
            }
        ]
    }"#;

    #[test]
    fn parses_index_into_sorted_catalog() {
        let catalog = parse_catalog(INDEX, "net.minecraftforge/index.json").unwrap();
        assert_eq!(catalog.uid(), "net.minecraftforge");
        assert_eq!(catalog.name(), Some("Forge"));
        assert_eq!(catalog.parent_uid(), Some("net.minecraft"));
        assert_eq!(catalog.len(), 2);
        // Newest first.
        assert_eq!(catalog.at(0).unwrap().version(), "25.0.9");
        assert_eq!(
            catalog
                .at(1)
                .unwrap()
                .requires()
                .get("net.minecraft")
                .unwrap(),
            "1.12.2"
        );
        assert_eq!(catalog.recommended().unwrap().version(), "14.23.5.2860");
    }

    #[test]
    fn round_trips_through_index_shape() {
        let catalog = parse_catalog(INDEX, "net.minecraftforge/index.json").unwrap();
        let text = serde_json::to_string(&catalog_index(&catalog)).unwrap();
        let again = parse_catalog(&text, "round-trip").unwrap();
        assert_eq!(again.len(), catalog.len());
        assert_eq!(
            again.at(0).unwrap().release_time(),
            catalog.at(0).unwrap().release_time()
        );
    }

    #[test]
    fn rejects_unknown_format_version() {
        let text = r#"{ "formatVersion": 99, "uid": "net.minecraft" }"#;
        let err = parse_catalog(text, "net.minecraft/index.json").unwrap_err();
        assert!(matches!(
            err,
            FormatError::UnsupportedFormatVersion { version: 99, .. }
        ));
    }

    #[test]
    fn rejects_empty_document() {
        assert!(matches!(
            parse_catalog("   ", "index.json").unwrap_err(),
            FormatError::EmptyDocument { .. }
        ));
    }
}
