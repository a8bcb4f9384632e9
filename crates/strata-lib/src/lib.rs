pub mod error;
pub mod meta;
pub mod profile;

// Re-export commonly used types
pub use error::FormatError;
pub use meta::catalog::{
    CatalogEvent, CatalogRole, RoleValue, VersionAttr, VersionCatalog, VersionHandle,
};
pub use meta::index_format::parse_catalog;
pub use meta::version::{ReleaseType, VersionDescriptor};
pub use profile::assembler::{
    LoadError, PatchSink, PatchSource, PatchText, Profile, ProfileState, ProfileStrategy,
};
pub use profile::format::{decode_patch, encode_patch};
pub use profile::patch::{
    DownloadInfo, JarMod, LibraryHint, LibraryRef, Patch, Problem, ProblemSeverity,
};
