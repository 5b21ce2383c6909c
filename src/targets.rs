//! Discovery of buildable executables from build-description files.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::RecipeError;
use crate::SimmerResult;

/// File name of the build description consumed by the external build tool.
pub const BUILD_DESCRIPTION_FILE: &str = "CMakeLists.txt";

static ADD_EXECUTABLE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"add_executable\((\S+)").unwrap());

/// Enumerate the executables declared under each of `subdirs`, in
/// (subdirectory, declaration) order.
///
/// Each `add_executable(<name> ...)` statement in
/// `<source_root>/<subdir>/CMakeLists.txt` yields `<build_root>/bin/<name>`.
/// The declared names are never checked against what the build tool actually
/// produced, and the result is recomputed from disk on every call.
pub fn enumerate_targets(
    source_root: &Path,
    build_root: &Path,
    subdirs: &[&str],
) -> SimmerResult<Vec<PathBuf>> {
    let mut programs = Vec::new();
    for subdir in subdirs {
        let file = source_root.join(subdir).join(BUILD_DESCRIPTION_FILE);
        let text = fs::read_to_string(&file).map_err(|source| RecipeError::FileRead {
            file: file.clone(),
            source,
        })?;
        programs.extend(
            ADD_EXECUTABLE_REGEX
                .captures_iter(&text)
                .map(|captures| build_root.join("bin").join(&captures[1])),
        );
    }
    Ok(programs)
}
