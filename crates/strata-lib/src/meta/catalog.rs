use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc::{self, Receiver, Sender};

use chrono::{DateTime, Utc};

use crate::meta::version::{ReleaseType, VersionDescriptor};

/// Handle into a catalog's descriptor arena.
///
/// Handles stay valid across [`VersionCatalog::merge`] and
/// [`VersionCatalog::sort_versions`]; a full [`VersionCatalog::set_entries`]
/// replace invalidates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionHandle(usize);

/// Descriptor attributes a change notification can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionAttr {
    Time,
    Type,
    Requires,
    Recommended,
    Name,
    ParentUid,
}

/// Change notification emitted by a catalog. Row ranges are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    /// The whole collection was replaced or re-sorted.
    Reset,
    RowsInserted {
        first: usize,
        last: usize,
    },
    DataChanged {
        first: usize,
        last: usize,
        attrs: Vec<VersionAttr>,
    },
    /// Catalog-level metadata (name, parent uid) changed.
    MetadataChanged {
        attrs: Vec<VersionAttr>,
    },
}

/// Attribute roles the presentation layer can query per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogRole {
    Version,
    VersionId,
    ParentVersion,
    Type,
    Uid,
    Time,
    Requires,
    Sort,
    Recommended,
}

/// Value returned by a role lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum RoleValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    Requires(BTreeMap<String, String>),
}

/// Observable, sorted collection of version descriptors for one logical
/// version family.
///
/// Descriptors live in a single owning arena; the visible row order and the
/// version-string index hold handles into it. Lazily created placeholders
/// (see [`VersionCatalog::get`]) sit in the arena and index only, and are
/// promoted to visible rows when a merge delivers them.
#[derive(Debug)]
pub struct VersionCatalog {
    uid: String,
    name: Option<String>,
    parent_uid: Option<String>,
    slots: Vec<VersionDescriptor>,
    rows: Vec<usize>,
    index: HashMap<String, usize>,
    recommended: Option<usize>,
    subscribers: Vec<Sender<CatalogEvent>>,
}

impl VersionCatalog {
    pub fn new(uid: &str) -> Self {
        VersionCatalog {
            uid: uid.to_string(),
            name: None,
            parent_uid: None,
            slots: Vec::new(),
            rows: Vec::new(),
            index: HashMap::new(),
            recommended: None,
            subscribers: Vec::new(),
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
        self.emit(CatalogEvent::MetadataChanged {
            attrs: vec![VersionAttr::Name],
        });
    }

    pub fn parent_uid(&self) -> Option<&str> {
        self.parent_uid.as_deref()
    }

    pub fn set_parent_uid(&mut self, parent_uid: Option<String>) {
        self.parent_uid = parent_uid;
        self.emit(CatalogEvent::MetadataChanged {
            attrs: vec![VersionAttr::ParentUid],
        });
    }

    /// Where this catalog's index document lives, relative to the meta root.
    pub fn local_filename(&self) -> String {
        format!("{}/index.json", self.uid)
    }

    pub fn human_readable(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.uid)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Descriptor at a visible row, newest first.
    pub fn at(&self, row: usize) -> Option<&VersionDescriptor> {
        self.rows.get(row).map(|&slot| &self.slots[slot])
    }

    /// Visible descriptors in row order.
    pub fn entries(&self) -> impl Iterator<Item = &VersionDescriptor> {
        self.rows.iter().map(move |&slot| &self.slots[slot])
    }

    pub fn recommended(&self) -> Option<&VersionDescriptor> {
        self.recommended.map(|slot| &self.slots[slot])
    }

    /// Subscribe to change notifications. Dropped receivers are pruned on
    /// the next emit.
    pub fn subscribe(&mut self) -> Receiver<CatalogEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: CatalogEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Look up a descriptor by version string, creating an empty placeholder
    /// if it isn't known yet. Placeholders support forward dependency
    /// references before their catalog data arrives; they keep their
    /// identity when a later merge fills them in.
    pub fn get(&mut self, version: &str) -> VersionHandle {
        if let Some(&slot) = self.index.get(version) {
            return VersionHandle(slot);
        }
        let slot = self.slots.len();
        self.slots.push(VersionDescriptor::new(&self.uid, version));
        self.index.insert(version.to_string(), slot);
        VersionHandle(slot)
    }

    pub fn descriptor(&self, handle: VersionHandle) -> Option<&VersionDescriptor> {
        self.slots.get(handle.0)
    }

    /// Replace the whole collection. Sorts newest-first, rebuilds the index,
    /// recomputes the recommended entry and emits a single full reset.
    pub fn set_entries(&mut self, entries: Vec<VersionDescriptor>) {
        self.slots = entries;
        self.rows = (0..self.slots.len()).collect();
        self.sort_rows();
        self.index = self
            .rows
            .iter()
            .map(|&slot| (self.slots[slot].version().to_string(), slot))
            .collect();
        self.recompute_recommended();
        self.emit(CatalogEvent::Reset);
    }

    /// Re-sort the visible rows, newest first, ties broken by version id.
    /// Stable for entries with equal timestamps and ids.
    pub fn sort_versions(&mut self) {
        self.sort_rows();
        self.emit(CatalogEvent::Reset);
    }

    fn sort_rows(&mut self) {
        let slots = &self.slots;
        self.rows.sort_by(|&a, &b| {
            slots[b]
                .release_time()
                .cmp(&slots[a].release_time())
                .then_with(|| slots[a].version().cmp(slots[b].version()))
        });
    }

    fn recompute_recommended(&mut self) {
        self.recommended = self
            .rows
            .iter()
            .copied()
            .find(|&slot| self.slots[slot].is_release());
    }

    /// Fold a freshly loaded catalog snapshot into this one.
    ///
    /// Catalog-level metadata is overwritten only when it differs. A catalog
    /// with no descriptors at all behaves as [`VersionCatalog::set_entries`];
    /// otherwise each incoming descriptor either merges into the existing
    /// entry with the same version id, or is appended with a row-scoped
    /// insertion notification. Idempotent.
    pub fn merge(&mut self, other: &VersionCatalog) {
        if self.name != other.name {
            self.set_name(other.name.clone());
        }
        if self.parent_uid != other.parent_uid {
            self.set_parent_uid(other.parent_uid.clone());
        }

        // Placeholders count as existing descriptors; only a truly empty
        // arena takes the wholesale path, so placeholder identity survives.
        if self.slots.is_empty() {
            self.set_entries(other.entries().cloned().collect());
            return;
        }

        for incoming in other.entries() {
            match self.index.get(incoming.version()).copied() {
                Some(slot) => {
                    if let Some(row) = self.rows.iter().position(|&s| s == slot) {
                        let changed = self.slots[slot].merge(incoming);
                        if changed.any() {
                            let mut attrs = Vec::new();
                            if changed.time {
                                attrs.push(VersionAttr::Time);
                            }
                            if changed.version_type {
                                attrs.push(VersionAttr::Type);
                            }
                            if changed.requires {
                                attrs.push(VersionAttr::Requires);
                            }
                            self.emit(CatalogEvent::DataChanged {
                                first: row,
                                last: row,
                                attrs,
                            });
                        }
                    } else {
                        // A placeholder created by get(); fill it in and
                        // promote it to a visible row.
                        self.slots[slot].merge(incoming);
                        let row = self.rows.len();
                        self.rows.push(slot);
                        self.emit(CatalogEvent::RowsInserted {
                            first: row,
                            last: row,
                        });
                        self.maybe_update_recommended(slot);
                    }
                }
                None => {
                    let slot = self.slots.len();
                    self.slots.push(incoming.clone());
                    self.index.insert(incoming.version().to_string(), slot);
                    let row = self.rows.len();
                    self.rows.push(slot);
                    self.emit(CatalogEvent::RowsInserted {
                        first: row,
                        last: row,
                    });
                    self.maybe_update_recommended(slot);
                }
            }
        }
    }

    /// Opportunistic recommended update after an append: only a release
    /// entry newer than the current recommendation (or the first release
    /// seen) takes over.
    fn maybe_update_recommended(&mut self, slot: usize) {
        if !self.slots[slot].is_release() {
            return;
        }
        let newer = match self.recommended {
            None => true,
            Some(current) => {
                self.slots[slot].release_time() > self.slots[current].release_time()
            }
        };
        if newer {
            self.recommended = Some(slot);
            let last = self.rows.len().saturating_sub(1);
            self.emit(CatalogEvent::DataChanged {
                first: 0,
                last,
                attrs: vec![VersionAttr::Recommended],
            });
        }
    }

    /// Role-based attribute lookup for the presentation layer.
    pub fn data(&self, row: usize, role: CatalogRole) -> Option<RoleValue> {
        let &slot = self.rows.get(row)?;
        let version = &self.slots[slot];
        match role {
            CatalogRole::Version | CatalogRole::VersionId => {
                Some(RoleValue::Text(version.version().to_string()))
            }
            CatalogRole::ParentVersion => {
                let parent_uid = self.parent_uid.as_deref()?;
                version
                    .requires()
                    .get(parent_uid)
                    .map(|v| RoleValue::Text(v.clone()))
            }
            CatalogRole::Type => version
                .version_type()
                .map(|t| RoleValue::Text(t.as_str().to_string())),
            CatalogRole::Uid => Some(RoleValue::Text(version.uid().to_string())),
            CatalogRole::Time => DateTime::<Utc>::from_timestamp(version.release_time(), 0)
                .map(|time| RoleValue::Text(time.to_rfc3339())),
            CatalogRole::Requires => Some(RoleValue::Requires(version.requires().clone())),
            CatalogRole::Sort => Some(RoleValue::Integer(version.release_time())),
            CatalogRole::Recommended => Some(RoleValue::Bool(self.recommended == Some(slot))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::version::ReleaseType;
    use std::collections::BTreeMap;

    fn descriptor(version: &str, type_: Option<&str>, time: i64) -> VersionDescriptor {
        VersionDescriptor::with_metadata(
            "net.minecraft",
            version,
            type_.map(ReleaseType::parse),
            time,
            BTreeMap::new(),
        )
    }

    fn drain(rx: &Receiver<CatalogEvent>) -> Vec<CatalogEvent> {
        rx.try_iter().collect()
    }

    fn catalog_with(entries: Vec<VersionDescriptor>) -> VersionCatalog {
        let mut incoming = VersionCatalog::new("net.minecraft");
        incoming.set_entries(entries);
        incoming
    }

    #[test]
    fn set_entries_sorts_newest_first_and_emits_reset() {
        let mut catalog = VersionCatalog::new("net.minecraft");
        let rx = catalog.subscribe();
        catalog.set_entries(vec![
            descriptor("1.11", Some("release"), 100),
            descriptor("1.12.2", Some("release"), 300),
            descriptor("17w50a", Some("snapshot"), 200),
        ]);

        assert_eq!(drain(&rx), vec![CatalogEvent::Reset]);
        assert_eq!(catalog.at(0).unwrap().version(), "1.12.2");
        assert_eq!(catalog.at(1).unwrap().version(), "17w50a");
        assert_eq!(catalog.at(2).unwrap().version(), "1.11");
        assert_eq!(catalog.recommended().unwrap().version(), "1.12.2");
    }

    #[test]
    fn merge_into_empty_behaves_as_set_entries() {
        let incoming = catalog_with(vec![descriptor("1.12.2", Some("release"), 300)]);
        let mut catalog = VersionCatalog::new("net.minecraft");
        catalog.merge(&incoming);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.recommended().unwrap().version(), "1.12.2");
    }

    #[test]
    fn merge_is_idempotent() {
        let incoming = catalog_with(vec![
            descriptor("1.12.2", Some("release"), 300),
            descriptor("17w50a", Some("snapshot"), 400),
        ]);
        let mut catalog = VersionCatalog::new("net.minecraft");
        catalog.merge(&incoming);

        let rx = catalog.subscribe();
        catalog.merge(&incoming);

        assert_eq!(drain(&rx), vec![]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.recommended().unwrap().version(), "1.12.2");
    }

    #[test]
    fn merge_appends_with_row_scoped_notification() {
        let mut catalog = catalog_with(vec![descriptor("1.11", Some("release"), 100)]);
        let rx = catalog.subscribe();

        catalog.merge(&catalog_with(vec![
            descriptor("1.11", Some("release"), 100),
            descriptor("1.12.2", Some("release"), 300),
        ]));

        let events = drain(&rx);
        assert!(events.contains(&CatalogEvent::RowsInserted { first: 1, last: 1 }));
        // A newer release also takes over the recommendation, over the full
        // row range.
        assert!(events.iter().any(|e| matches!(
            e,
            CatalogEvent::DataChanged { first: 0, last: 1, attrs } if attrs == &vec![VersionAttr::Recommended]
        )));
        assert_eq!(catalog.recommended().unwrap().version(), "1.12.2");
    }

    #[test]
    fn inserting_a_non_release_never_changes_recommended() {
        let mut catalog = catalog_with(vec![descriptor("1.12.2", Some("release"), 300)]);
        catalog.merge(&catalog_with(vec![
            descriptor("1.12.2", Some("release"), 300),
            descriptor("18w01a", Some("snapshot"), 500),
        ]));
        assert_eq!(catalog.recommended().unwrap().version(), "1.12.2");

        // Even with no recommendation yet, a snapshot doesn't become one.
        let mut empty = VersionCatalog::new("net.minecraft");
        empty.get("placeholder");
        empty.merge(&catalog_with(vec![descriptor("18w01a", Some("snapshot"), 500)]));
        assert!(empty.recommended().is_none());
    }

    #[test]
    fn merge_updates_existing_entry_in_place_with_scoped_attrs() {
        let mut catalog = catalog_with(vec![descriptor("1.12.2", None, 300)]);
        let rx = catalog.subscribe();

        catalog.merge(&catalog_with(vec![descriptor(
            "1.12.2",
            Some("release"),
            300,
        )]));

        assert_eq!(
            drain(&rx),
            vec![CatalogEvent::DataChanged {
                first: 0,
                last: 0,
                attrs: vec![VersionAttr::Type],
            }]
        );
    }

    #[test]
    fn get_returns_placeholder_and_merge_preserves_identity() {
        let mut catalog = VersionCatalog::new("net.minecraft");
        let handle = catalog.get("1.12.2");

        let placeholder = catalog.descriptor(handle).unwrap();
        assert_eq!(placeholder.version(), "1.12.2");
        assert!(placeholder.requires().is_empty());
        assert_eq!(catalog.len(), 0);

        let mut incoming_requires = BTreeMap::new();
        incoming_requires.insert("org.lwjgl".to_string(), "2.9.4".to_string());
        let incoming = catalog_with(vec![VersionDescriptor::with_metadata(
            "net.minecraft",
            "1.12.2",
            Some(ReleaseType::Release),
            300,
            incoming_requires,
        )]);
        catalog.merge(&incoming);

        // The same handle now sees the filled-in descriptor.
        let filled = catalog.descriptor(handle).unwrap();
        assert_eq!(filled.requires().get("org.lwjgl").unwrap(), "2.9.4");
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("1.12.2"), handle);
    }

    #[test]
    fn sort_is_stable_for_equal_timestamps() {
        let mut catalog = catalog_with(vec![
            descriptor("a", None, 100),
            descriptor("b", None, 100),
            descriptor("c", None, 100),
        ]);
        let first: Vec<String> = catalog.entries().map(|v| v.version().to_string()).collect();
        catalog.sort_versions();
        catalog.sort_versions();
        let second: Vec<String> = catalog.entries().map(|v| v.version().to_string()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn role_lookup_mirrors_descriptor_fields() {
        let mut requires = BTreeMap::new();
        requires.insert("net.minecraft".to_string(), "1.12.2".to_string());
        let mut catalog = VersionCatalog::new("net.minecraftforge");
        catalog.set_parent_uid(Some("net.minecraft".to_string()));
        catalog.set_entries(vec![VersionDescriptor::with_metadata(
            "net.minecraftforge",
            "14.23.5",
            Some(ReleaseType::Release),
            1_500_000_000,
            requires,
        )]);

        assert_eq!(
            catalog.data(0, CatalogRole::Version),
            Some(RoleValue::Text("14.23.5".to_string()))
        );
        assert_eq!(
            catalog.data(0, CatalogRole::ParentVersion),
            Some(RoleValue::Text("1.12.2".to_string()))
        );
        assert_eq!(
            catalog.data(0, CatalogRole::Sort),
            Some(RoleValue::Integer(1_500_000_000))
        );
        assert_eq!(
            catalog.data(0, CatalogRole::Recommended),
            Some(RoleValue::Bool(true))
        );
        assert_eq!(catalog.data(1, CatalogRole::Version), None);
    }
}
