use std::path::{Component, Path};

use crate::kernel::constants::SOURCE_ROOTS;

/// Convert a lower-case hyphen-separated name into camelCase.
///
/// `"spring-security-core"` becomes `"springSecurityCore"`. Names without a
/// hyphen are returned unchanged.
pub fn normalize_plugin_name(name: &str) -> String {
    let name = name.trim();
    if !name.contains('-') {
        return name.to_string();
    }

    let mut result = String::with_capacity(name.len());
    for (i, part) in name.split('-').filter(|p| !p.is_empty()).enumerate() {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            if i == 0 {
                result.extend(first.to_lowercase());
            } else {
                result.extend(first.to_uppercase());
            }
            result.push_str(chars.as_str());
        }
    }
    result
}

/// Convert a camelCase plugin name into lower-case hyphen-separated form.
///
/// `"springSecurityCore"` becomes `"spring-security-core"`.
pub fn hyphenate_plugin_name(name: &str) -> String {
    let name = name.trim();
    let mut result = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 && !result.ends_with('-') {
                result.push('-');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

/// Last segment of a dotted or `::`-separated class identifier
pub fn simple_class_name(class_id: &str) -> &str {
    let after_path = class_id.rsplit("::").next().unwrap_or(class_id);
    after_path.rsplit('.').next().unwrap_or(after_path)
}

/// Whether the class identifier carries a package prefix
pub fn has_package(class_id: &str) -> bool {
    simple_class_name(class_id) != class_id
}

/// Dotted class identifier for a source file below a source root.
///
/// `/proj/src/com/acme/BookController.rs` maps to `com.acme.BookController`.
/// Returns `None` when the path has no source-root component or nothing
/// below it.
pub fn class_name_for_path(path: &Path) -> Option<String> {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let root = parts
        .iter()
        .rposition(|p| SOURCE_ROOTS.contains(&p.as_str()))?;
    let rest = &parts[root + 1..];
    let (file, packages) = rest.split_last()?;

    let stem = Path::new(file).file_stem()?.to_string_lossy().into_owned();
    let mut segments: Vec<&str> = packages.iter().map(String::as_str).collect();
    segments.push(&stem);
    Some(segments.join("."))
}

/// Relative file path of a dotted class identifier, without extension
pub fn class_path_for_name(class_id: &str) -> String {
    class_id.replace("::", "/").replace('.', "/")
}
