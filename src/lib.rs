//! Build, package, and install orchestration for a header-only library:
//! resolve the package version from the build description, drive the external
//! build tool, and install the artifacts into a package layout.

pub mod cmake;
pub mod environment;
pub mod errors;
pub mod recipe;
pub mod settings;
pub mod targets;
pub mod version;

pub type SimmerResult<T> = anyhow::Result<T>;
