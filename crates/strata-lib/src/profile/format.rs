use serde_json::{Map, Value};

use crate::error::FormatError;
use crate::profile::patch::{
    DownloadInfo, JarMod, LibraryHint, LibraryRef, Patch, ProblemSeverity,
};

/// Fields that used to be part of the format and are now rejected with an
/// error-severity problem instead of being silently dropped.
const REMOVED_FIELDS: &[&str] = &[
    "tweakers",
    "-libraries",
    "-tweakers",
    "-minecraftArguments",
    "+minecraftArguments",
];

/// Hardcoded Mojang jar location predating the downloads table.
pub(crate) fn legacy_jar_url(version: &str) -> String {
    format!(
        "https://s3.amazonaws.com/Minecraft.Download/versions/{0}/{0}.jar",
        version
    )
}

fn opt_string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn require_array<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    source_label: &str,
) -> Result<&'a Vec<Value>, FormatError> {
    obj.get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| FormatError::invalid_field(source_label, key))
}

fn require_object<'a>(
    value: &'a Value,
    source_label: &str,
    field: &str,
) -> Result<&'a Map<String, Value>, FormatError> {
    value
        .as_object()
        .ok_or_else(|| FormatError::invalid_field(source_label, field))
}

/// Decode one patch document.
///
/// Structural failures (empty input, not JSON, not an object) are fatal to
/// this call. Field-level issues accumulate on the returned patch as
/// problems so the caller can report them all after a single pass. A
/// missing `order` under `require_order` is logged and defaults to 0.
pub fn decode_patch(
    text: &str,
    source_label: &str,
    require_order: bool,
) -> Result<Patch, FormatError> {
    if text.trim().is_empty() {
        return Err(FormatError::EmptyDocument {
            source_label: source_label.to_string(),
        });
    }
    let doc: Value = serde_json::from_str(text).map_err(|source| FormatError::Malformed {
        source_label: source_label.to_string(),
        source,
    })?;
    let Value::Object(root) = doc else {
        return Err(FormatError::NotAnObject {
            source_label: source_label.to_string(),
        });
    };

    let mut patch = Patch::default();

    if require_order {
        if root.contains_key("order") {
            patch.order = root
                .get("order")
                .and_then(Value::as_i64)
                .ok_or_else(|| FormatError::invalid_field(source_label, "order"))?
                as i32;
        } else {
            log::error!("{} doesn't contain an order field", source_label);
        }
    }

    patch.name = opt_string(&root, "name").unwrap_or_default();
    patch.uid = opt_string(&root, "uid")
        .or_else(|| opt_string(&root, "fileId"))
        .unwrap_or_default();
    patch.version = opt_string(&root, "version").unwrap_or_default();
    patch.minecraft_version = opt_string(&root, "mcVersion").unwrap_or_default();

    patch.main_class = opt_string(&root, "mainClass");
    patch.minecraft_arguments = opt_string(&root, "minecraftArguments");
    patch.release_type = opt_string(&root, "type");
    patch.release_time = opt_string(&root, "releaseTime");
    patch.assets = opt_string(&root, "assets");
    // Legacy Minecraft window embedding.
    patch.applet_class = opt_string(&root, "appletClass");

    if let Some(value) = root.get("downloads") {
        let downloads = require_object(value, source_label, "downloads")?;
        for (side, entry) in downloads {
            let info: DownloadInfo =
                serde_json::from_value(entry.clone()).map_err(|source| {
                    FormatError::Malformed {
                        source_label: source_label.to_string(),
                        source,
                    }
                })?;
            patch.downloads.insert(side.clone(), info);
        }
    }

    if root.contains_key("+tweakers") {
        for value in require_array(&root, "+tweakers", source_label)? {
            let tweaker = value
                .as_str()
                .ok_or_else(|| FormatError::invalid_field(source_label, "+tweakers"))?;
            patch.tweakers.push(tweaker.to_string());
        }
    }

    if root.contains_key("+traits") {
        for value in require_array(&root, "+traits", source_label)? {
            let trait_ = value
                .as_str()
                .ok_or_else(|| FormatError::invalid_field(source_label, "+traits"))?;
            patch.traits.insert(trait_.to_string());
        }
    }

    if root.contains_key("+jarMods") {
        for value in require_array(&root, "+jarMods", source_label)? {
            let obj = require_object(value, source_label, "+jarMods")?;
            let jar_mod = jar_mod_from_json(obj, source_label, &patch.name)?;
            patch.jar_mods.push(jar_mod);
        }
    }

    let has_plus_libs = root.contains_key("+libraries");
    let has_libs = root.contains_key("libraries");
    if has_plus_libs && has_libs {
        patch.add_problem(
            ProblemSeverity::Warning,
            "Version file has both '+libraries' and 'libraries'. This is no longer supported.",
        );
    }
    for key in ["libraries", "+libraries"] {
        if !root.contains_key(key) {
            continue;
        }
        for value in require_array(&root, key, source_label)? {
            let obj = require_object(value, source_label, key)?;
            let lib = library_from_json(obj, source_label, &mut patch)?;
            patch.libraries.push(lib);
        }
    }

    if let Some(value) = root.get("mainJar") {
        let obj = require_object(value, source_label, "mainJar")?;
        patch.main_jar = Some(library_from_json(obj, source_label, &mut patch)?);
    } else if !patch.minecraft_version.is_empty() {
        // Reconstruct the main jar from the declared Minecraft version.
        let mut lib = LibraryRef::new(format!(
            "com.mojang:minecraft:{}:client",
            patch.minecraft_version
        ));
        if let Some(client) = patch.downloads.get("client") {
            lib.downloads = Some(client.clone());
        } else {
            lib.absolute_url = Some(legacy_jar_url(&patch.minecraft_version));
        }
        patch.main_jar = Some(lib);
    }

    for key in REMOVED_FIELDS {
        if root.contains_key(*key) {
            patch.add_problem(
                ProblemSeverity::Error,
                format!("Version file contains unsupported element '{}'", key),
            );
        }
    }

    Ok(patch)
}

fn library_from_json(
    obj: &Map<String, Value>,
    source_label: &str,
    patch: &mut Patch,
) -> Result<LibraryRef, FormatError> {
    let name = opt_string(obj, "name").ok_or_else(|| FormatError::LibraryMissingName {
        source_label: source_label.to_string(),
    })?;
    let mut lib = LibraryRef::new(name);
    lib.url = opt_string(obj, "url");

    if let Some(downloads) = obj.get("downloads") {
        let downloads = require_object(downloads, source_label, "downloads")?;
        if let Some(artifact) = downloads.get("artifact") {
            let info: DownloadInfo =
                serde_json::from_value(artifact.clone()).map_err(|source| {
                    FormatError::Malformed {
                        source_label: source_label.to_string(),
                        source,
                    }
                })?;
            lib.downloads = Some(info);
        }
    }

    // Two historical spellings; the canonical one wins when both appear.
    lib.absolute_url = opt_string(obj, "MMC-absuluteUrl");
    if let Some(url) = opt_string(obj, "MMC-absoluteUrl") {
        lib.absolute_url = Some(url);
    }

    if let Some(hint) = opt_string(obj, "MMC-hint") {
        match LibraryHint::parse(&hint) {
            Some(parsed) => lib.hint = Some(parsed),
            None => patch.add_problem(
                ProblemSeverity::Warning,
                format!("Library '{}' has unknown hint '{}'", lib.name, hint),
            ),
        }
    }

    Ok(lib)
}

fn jar_mod_from_json(
    obj: &Map<String, Value>,
    source_label: &str,
    patch_name: &str,
) -> Result<JarMod, FormatError> {
    let name = opt_string(obj, "name").ok_or_else(|| FormatError::JarModMissingName {
        source_label: source_label.to_string(),
    })?;
    let original_name = opt_string(obj, "originalName")
        .or_else(|| Some(patch_name.replace(" (jar mod)", "")).filter(|s| !s.is_empty()));
    Ok(JarMod {
        name,
        original_name,
    })
}

fn write_string(root: &mut Map<String, Value>, key: &str, value: &str) {
    if !value.is_empty() {
        root.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn write_opt_string(root: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        write_string(root, key, value);
    }
}

fn download_to_json(info: &DownloadInfo) -> Value {
    let mut obj = Map::new();
    if let Some(sha1) = &info.sha1 {
        obj.insert("sha1".to_string(), Value::String(sha1.clone()));
    }
    if let Some(size) = info.size {
        obj.insert("size".to_string(), Value::from(size));
    }
    if let Some(url) = &info.url {
        obj.insert("url".to_string(), Value::String(url.clone()));
    }
    Value::Object(obj)
}

fn library_to_json(lib: &LibraryRef) -> Value {
    let mut obj = Map::new();
    write_string(&mut obj, "name", &lib.name);
    write_opt_string(&mut obj, "url", &lib.url);
    if let Some(downloads) = &lib.downloads {
        let mut wrapper = Map::new();
        wrapper.insert("artifact".to_string(), download_to_json(downloads));
        obj.insert("downloads".to_string(), Value::Object(wrapper));
    }
    // Only the canonical spelling is ever written back.
    write_opt_string(&mut obj, "MMC-absoluteUrl", &lib.absolute_url);
    if let Some(hint) = lib.hint {
        obj.insert(
            "MMC-hint".to_string(),
            Value::String(hint.as_str().to_string()),
        );
    }
    Value::Object(obj)
}

fn jar_mod_to_json(jar_mod: &JarMod) -> Value {
    let mut obj = Map::new();
    write_string(&mut obj, "name", &jar_mod.name);
    write_opt_string(&mut obj, "originalName", &jar_mod.original_name);
    Value::Object(obj)
}

/// Encode a patch back to its document form. Removed fields are never
/// re-emitted; `order` is written only when the caller tracks ordering in
/// the document itself rather than externally.
pub fn encode_patch(patch: &Patch, include_order: bool) -> Value {
    let mut root = Map::new();
    if include_order {
        root.insert("order".to_string(), Value::from(patch.order));
    }
    write_string(&mut root, "name", &patch.name);
    // Both identity spellings, for older readers.
    write_string(&mut root, "uid", &patch.uid);
    write_string(&mut root, "fileId", &patch.uid);
    write_string(&mut root, "version", &patch.version);
    write_string(&mut root, "mcVersion", &patch.minecraft_version);
    write_opt_string(&mut root, "mainClass", &patch.main_class);
    write_opt_string(&mut root, "minecraftArguments", &patch.minecraft_arguments);
    write_opt_string(&mut root, "type", &patch.release_type);
    write_opt_string(&mut root, "releaseTime", &patch.release_time);
    write_opt_string(&mut root, "assets", &patch.assets);
    write_opt_string(&mut root, "appletClass", &patch.applet_class);

    if !patch.downloads.is_empty() {
        let mut downloads = Map::new();
        for (side, info) in &patch.downloads {
            downloads.insert(side.clone(), download_to_json(info));
        }
        root.insert("downloads".to_string(), Value::Object(downloads));
    }

    if !patch.tweakers.is_empty() {
        root.insert(
            "+tweakers".to_string(),
            Value::Array(
                patch
                    .tweakers
                    .iter()
                    .map(|t| Value::String(t.clone()))
                    .collect(),
            ),
        );
    }
    if !patch.traits.is_empty() {
        root.insert(
            "+traits".to_string(),
            Value::Array(
                patch
                    .traits
                    .iter()
                    .map(|t| Value::String(t.clone()))
                    .collect(),
            ),
        );
    }
    if !patch.libraries.is_empty() {
        root.insert(
            "+libraries".to_string(),
            Value::Array(patch.libraries.iter().map(library_to_json).collect()),
        );
    }
    if !patch.jar_mods.is_empty() {
        root.insert(
            "+jarMods".to_string(),
            Value::Array(patch.jar_mods.iter().map(jar_mod_to_json).collect()),
        );
    }
    if let Some(main_jar) = &patch.main_jar {
        root.insert("mainJar".to_string(), library_to_json(main_jar));
    }

    Value::Object(root)
}
