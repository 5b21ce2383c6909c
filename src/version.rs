//! Version resolution from the root build description.

use std::fs;
use std::path::Path;

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::RecipeError;
use crate::SimmerResult;

static PROJECT_VERSION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"project\(.*VERSION ([0-9a-zA-Z.-]+)[ )]").unwrap());

/// Extract the version declared by a `project(... VERSION x.y.z ...)`
/// statement.
///
/// This is a pattern scan, not a grammar: the `VERSION` keyword and its token
/// must sit on one line inside the `project(...)` statement, so reformatted
/// input will not match. Absence of a version is a hard failure — downstream
/// packaging depends on it for artifact naming.
pub fn resolve_version(text: &str) -> SimmerResult<String> {
    PROJECT_VERSION_REGEX
        .captures(text)
        .map(|captures| captures[1].to_string())
        .ok_or_else(|| RecipeError::VersionNotFound.into())
}

/// Resolve the version from a build-description file on disk.
pub fn resolve_version_file(path: &Path) -> SimmerResult<String> {
    let text = fs::read_to_string(path).map_err(|source| RecipeError::FileRead {
        file: path.to_path_buf(),
        source,
    })?;
    resolve_version(&text).with_context(|| format!("in {}", path.display()))
}
