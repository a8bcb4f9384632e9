use crate::error::FormatError;
use crate::profile::format;
use crate::profile::patch::{JarMod, LibraryHint, LibraryRef, Patch, Problem};

/// Reserved order for the vanilla base patch; strictly below any user patch.
pub const VANILLA_ORDER: i32 = -2;
/// Reserved order for a pack overlay; above vanilla, below ordinary user
/// patches.
pub const PACK_OVERLAY_ORDER: i32 = 1;

pub const VANILLA_UID: &str = "net.minecraft";
pub const PACK_UID: &str = "org.strata.pack";
const JAR_MODS_UID: &str = "org.strata.jarmods";

/// Lifecycle of a profile between loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileState {
    Empty,
    Loading,
    Assembled,
    Error,
}

/// How a profile's patches are sourced and which mutations it supports.
/// A closed set: the supported formats are fixed and externally known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStrategy {
    /// Locally managed instance: vanilla base plus user patches, fully
    /// mutable.
    Local,
    /// Instance layered from an externally managed pack: vanilla base plus
    /// a mandatory pack overlay, read-only.
    PackOverlay,
}

/// One raw patch document handed over by the source enumerator.
#[derive(Debug, Clone)]
pub struct PatchText {
    pub label: String,
    pub text: String,
}

impl PatchText {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        PatchText {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// Enumerates raw patch documents for a load, in load order. The profile
/// core performs no I/O itself.
pub trait PatchSource {
    /// The builtin vanilla descriptor. `None` when absent, which is fatal.
    fn vanilla(&self) -> Option<PatchText>;

    /// The pack overlay descriptor, mandatory for the pack-overlay strategy.
    fn pack_overlay(&self) -> Option<PatchText> {
        None
    }

    /// Display name of the pack, used to label the overlay patch.
    fn pack_name(&self) -> Option<String> {
        None
    }

    /// Fallback version string for an overlay that doesn't declare one.
    fn pack_version(&self) -> Option<String> {
        None
    }

    /// Storage root for libraries tracked locally by the pack.
    fn library_storage_prefix(&self) -> Option<String> {
        None
    }

    /// User patches, in load order.
    fn user_patches(&self) -> Vec<PatchText>;
}

/// Persistence for strategies that support saving, keyed by patch identity.
pub trait PatchSink {
    fn persist(&mut self, uid: &str, text: &str) -> anyhow::Result<()>;
    fn remove(&mut self, uid: &str) -> anyhow::Result<()>;
    fn save_order(&mut self, order: &[String]) -> anyhow::Result<()>;
    fn reset_order(&mut self) -> anyhow::Result<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("missing mandatory version source: {source_label}")]
    MissingVersion { source_label: String },

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// The layered profile of version patches for one instance.
///
/// Patches are recreated wholesale on every [`Profile::load`]; effective
/// field lists are plain concatenations in merge order, with duplicates left
/// visible to the caller.
pub struct Profile {
    strategy: ProfileStrategy,
    patches: Vec<Patch>,
    state: ProfileState,
}

impl Profile {
    pub fn new(strategy: ProfileStrategy) -> Self {
        Profile {
            strategy,
            patches: Vec::new(),
            state: ProfileState::Empty,
        }
    }

    pub fn strategy(&self) -> ProfileStrategy {
        self.strategy
    }

    pub fn state(&self) -> ProfileState {
        self.state
    }

    /// Clear and reload all patches from the source, then sort by order.
    /// The sort is stable, so equal orders keep their insertion order.
    pub fn load(&mut self, source: &dyn PatchSource) -> Result<(), LoadError> {
        self.patches.clear();
        self.state = ProfileState::Empty;
        match self.collect(source) {
            Ok(()) => {
                self.patches.sort_by_key(|p| p.order);
                self.state = ProfileState::Assembled;
                Ok(())
            }
            Err(e) => {
                self.patches.clear();
                self.state = ProfileState::Error;
                Err(e)
            }
        }
    }

    fn collect(&mut self, source: &dyn PatchSource) -> Result<(), LoadError> {
        self.load_builtin_patches(source)?;
        self.load_user_patches(source)?;
        Ok(())
    }

    fn load_builtin_patches(&mut self, source: &dyn PatchSource) -> Result<(), LoadError> {
        let vanilla = source.vanilla().ok_or_else(|| LoadError::MissingVersion {
            source_label: VANILLA_UID.to_string(),
        })?;
        let mut patch = format::decode_patch(&vanilla.text, &vanilla.label, false)?;
        patch.uid = VANILLA_UID.to_string();
        if patch.version.is_empty() {
            patch.version = patch.minecraft_version.clone();
        }
        patch.order = VANILLA_ORDER;
        match self.strategy {
            ProfileStrategy::Local => {
                if patch.name.is_empty() {
                    patch.name = "Minecraft".to_string();
                }
            }
            ProfileStrategy::PackOverlay => {
                // The pack ships these libraries; track them locally.
                patch.name = "Minecraft (tracked)".to_string();
                track_locally(&mut patch.libraries, source.library_storage_prefix());
            }
        }
        self.append(patch);

        if self.strategy == ProfileStrategy::PackOverlay {
            let overlay = source
                .pack_overlay()
                .ok_or_else(|| LoadError::MissingVersion {
                    source_label: PACK_UID.to_string(),
                })?;
            let mut patch = format::decode_patch(&overlay.text, &overlay.label, false)?;
            // The pack file format carries vanilla leftovers that the base
            // patch already provides.
            patch.minecraft_version.clear();
            patch.main_jar = None;
            track_locally(&mut patch.libraries, source.library_storage_prefix());
            patch.uid = PACK_UID.to_string();
            if let Some(pack_name) = source.pack_name() {
                patch.name = format!("{} (pack)", pack_name);
            }
            if patch.version.is_empty() {
                patch.version = source
                    .pack_version()
                    .unwrap_or_else(|| "Unknown".to_string());
            }
            patch.order = PACK_OVERLAY_ORDER;
            self.append(patch);
        }
        Ok(())
    }

    fn load_user_patches(&mut self, source: &dyn PatchSource) -> Result<(), LoadError> {
        for raw in source.user_patches() {
            let patch = format::decode_patch(&raw.text, &raw.label, true)?;
            self.append(patch);
        }
        Ok(())
    }

    fn append(&mut self, patch: Patch) {
        self.patches.push(patch);
        self.state = ProfileState::Loading;
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn patch(&self, uid: &str) -> Option<&Patch> {
        self.patches.iter().find(|p| p.uid == uid)
    }

    /// Effective libraries: concatenation in merge order, duplicates kept.
    pub fn libraries(&self) -> Vec<&LibraryRef> {
        self.patches.iter().flat_map(|p| &p.libraries).collect()
    }

    pub fn jar_mods(&self) -> Vec<&JarMod> {
        self.patches.iter().flat_map(|p| &p.jar_mods).collect()
    }

    pub fn tweakers(&self) -> Vec<&str> {
        self.patches
            .iter()
            .flat_map(|p| p.tweakers.iter().map(String::as_str))
            .collect()
    }

    pub fn traits(&self) -> Vec<&str> {
        self.patches
            .iter()
            .flat_map(|p| p.traits.iter().map(String::as_str))
            .collect()
    }

    /// The main jar contributed by the highest-order patch that sets one.
    pub fn main_jar(&self) -> Option<&LibraryRef> {
        self.patches.iter().rev().find_map(|p| p.main_jar.as_ref())
    }

    /// Accumulated problems across all patches, labelled by patch uid.
    pub fn problems(&self) -> Vec<(&str, &Problem)> {
        self.patches
            .iter()
            .flat_map(|p| p.problems.iter().map(move |problem| (p.uid.as_str(), problem)))
            .collect()
    }

    fn is_builtin(patch: &Patch) -> bool {
        patch.uid == VANILLA_UID || patch.uid == PACK_UID
    }

    fn supports_mutation(&self) -> bool {
        self.strategy == ProfileStrategy::Local
    }

    /// Persist the current user-patch order. Returns `Ok(false)` when the
    /// strategy doesn't support reordering.
    pub fn save_order(&self, sink: &mut dyn PatchSink) -> anyhow::Result<bool> {
        if !self.supports_mutation() {
            return Ok(false);
        }
        let order: Vec<String> = self
            .patches
            .iter()
            .filter(|p| !Self::is_builtin(p))
            .map(|p| p.uid.clone())
            .collect();
        sink.save_order(&order)?;
        Ok(true)
    }

    pub fn reset_order(&self, sink: &mut dyn PatchSink) -> anyhow::Result<bool> {
        if !self.supports_mutation() {
            return Ok(false);
        }
        sink.reset_order()?;
        Ok(true)
    }

    /// Add jar mods as a persisted user patch, creating or extending the
    /// dedicated jar-mods patch.
    pub fn install_jar_mods(
        &mut self,
        sink: &mut dyn PatchSink,
        names: &[String],
    ) -> anyhow::Result<bool> {
        if !self.supports_mutation() {
            return Ok(false);
        }
        let mut patch = match self.patch(JAR_MODS_UID) {
            Some(existing) => existing.clone(),
            None => {
                let mut patch = Patch {
                    uid: JAR_MODS_UID.to_string(),
                    name: "Jar mods".to_string(),
                    ..Patch::default()
                };
                patch.order = self
                    .patches
                    .iter()
                    .map(|p| p.order)
                    .max()
                    .unwrap_or(0)
                    .max(0)
                    + 1;
                patch
            }
        };
        for name in names {
            patch.jar_mods.push(JarMod {
                name: name.clone(),
                original_name: None,
            });
        }
        sink.persist(JAR_MODS_UID, &format::encode_patch(&patch, true).to_string())?;

        self.patches.retain(|p| p.uid != JAR_MODS_UID);
        self.patches.push(patch);
        self.patches.sort_by_key(|p| p.order);
        Ok(true)
    }

    /// Turn a builtin patch into an editable user copy.
    pub fn customize_patch(&self, sink: &mut dyn PatchSink, uid: &str) -> anyhow::Result<bool> {
        if !self.supports_mutation() {
            return Ok(false);
        }
        let Some(patch) = self.patch(uid) else {
            return Ok(false);
        };
        sink.persist(uid, &format::encode_patch(patch, true).to_string())?;
        Ok(true)
    }

    /// Drop the user copy of a patch, falling back to the builtin on the
    /// next load.
    pub fn revert_patch(&self, sink: &mut dyn PatchSink, uid: &str) -> anyhow::Result<bool> {
        if !self.supports_mutation() {
            return Ok(false);
        }
        sink.remove(uid)?;
        Ok(true)
    }
}

/// Re-hint libraries as locally stored. Without a storage prefix they are
/// left untouched, since a `local` hint without one can't be resolved.
fn track_locally(libraries: &mut [LibraryRef], storage_prefix: Option<String>) {
    let Some(prefix) = storage_prefix else {
        return;
    };
    for lib in libraries {
        lib.hint = Some(LibraryHint::Local);
        lib.storage_prefix = Some(prefix.clone());
    }
}
