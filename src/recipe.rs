//! Recipe lifecycle for a header-only package.
//!
//! The hosting dependency manager drives the hooks strictly sequentially:
//! version detection at load, then [`Recipe::build`], [`Recipe::package`],
//! [`Recipe::package_identity`], and [`Recipe::package_info`]. Every step
//! that touches the build tool runs inside the scoped toolchain environment,
//! and any failure aborts the current hook — there is no partial-success
//! path.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;
use tracing::{debug, info};

use crate::cmake::CMake;
use crate::environment::with_build_environment;
use crate::errors::RecipeError;
use crate::settings::Settings;
use crate::targets::{enumerate_targets, BUILD_DESCRIPTION_FILE};
use crate::version::resolve_version_file;
use crate::SimmerResult;

/// Boolean-like environment flag requesting that sample and test targets be
/// enabled in the build configuration. Absence means false.
pub const RUN_TESTS_ENV: &str = "SIMMER_RUN_TESTS";

/// Subdirectories scanned for runnable programs, in order.
const PROGRAM_SUBDIRS: &[&str] = &["tests", "samples"];

#[derive(Debug, Clone)]
pub struct Metadata {
    pub name: String,
    pub description: String,
    pub homepage: String,
    pub license: String,
    pub topics: Vec<String>,
}

/// Directory layout supplied by the host: where the sources live, where the
/// build tool works, and where the package is installed.
#[derive(Debug, Clone)]
pub struct Folders {
    pub source: PathBuf,
    pub build: PathBuf,
    pub package: PathBuf,
}

/// Whether discovered test and sample binaries are executed after a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPrograms {
    #[default]
    Disabled,
    Enabled,
}

/// The package's binary-compatibility key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageIdentity {
    /// One interchangeable artifact regardless of the consumer's compiler,
    /// build type, or architecture.
    HeaderOnly,
}

impl std::fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageIdentity::HeaderOnly => write!(f, "header-only"),
        }
    }
}

/// Metadata advertised to downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    /// Include-path contributions, relative to the install root.
    pub include_dirs: Vec<PathBuf>,
}

pub struct Recipe {
    metadata: Metadata,
    settings: Settings,
    folders: Folders,
    run_programs: RunPrograms,
    version: String,
    cmake_program: PathBuf,
    cmake: Option<CMake>,
}

impl Recipe {
    /// Load the recipe, resolving the package version from the root build
    /// description. A missing version aborts before any build step runs.
    pub fn load(
        metadata: Metadata,
        settings: Settings,
        folders: Folders,
        run_programs: RunPrograms,
    ) -> SimmerResult<Self> {
        let version = resolve_version_file(&folders.source.join(BUILD_DESCRIPTION_FILE))?;
        debug!(name = %metadata.name, %version, "loaded recipe");
        Ok(Recipe {
            metadata,
            settings,
            folders,
            run_programs,
            version,
            cmake_program: PathBuf::from("cmake"),
            cmake: None,
        })
    }

    /// Use a different `cmake` executable for every tool invocation.
    pub fn with_cmake_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.cmake_program = program.into();
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The configured build-tool handle, creating and configuring it on
    /// first use. Subsequent calls return the same handle without touching
    /// the tool again, so `build` and `package` can be invoked in any
    /// combination with exactly one configure per process.
    fn configured_cmake(&mut self) -> SimmerResult<&CMake> {
        let cmake = match self.cmake.take() {
            Some(cmake) => cmake,
            None => {
                let mut cmake = CMake::new(
                    &self.settings,
                    self.folders.source.clone(),
                    self.folders.build.clone(),
                )
                .with_program(&self.cmake_program);
                cmake.define(
                    "CMAKE_INSTALL_PREFIX",
                    self.folders.package.display().to_string(),
                );
                if run_tests_requested() {
                    let prefix = self.feature_prefix();
                    cmake.define(format!("{prefix}_SAMPLES"), "ON");
                    cmake.define(format!("{prefix}_TESTS"), "ON");
                }
                cmake.configure()?;
                cmake
            }
        };
        Ok(self.cmake.insert(cmake))
    }

    /// Upper-cased package name, as used to prefix feature definitions.
    fn feature_prefix(&self) -> String {
        self.metadata
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Paths of the test and sample executables declared by the build
    /// description, relative to the build folder. Recomputed from disk on
    /// every call.
    pub fn test_programs(&self) -> SimmerResult<Vec<PathBuf>> {
        enumerate_targets(&self.folders.source, &self.folders.build, PROGRAM_SUBDIRS)
    }

    /// Configure (if not yet configured), build the default target, then the
    /// source-package target, and finally — only when enabled — run every
    /// discovered test and sample binary.
    pub fn build(&mut self) -> SimmerResult<()> {
        let settings = self.settings.clone();
        with_build_environment(&settings, || self.build_steps())
    }

    fn build_steps(&mut self) -> SimmerResult<()> {
        let cmake = self.configured_cmake()?;
        cmake.build(None)?;
        cmake.build(Some("package_source"))?;

        if self.run_programs == RunPrograms::Enabled {
            for program in self.test_programs()? {
                self.run_program(&program)?;
            }
        }
        Ok(())
    }

    /// Install the build artifacts into the package folder. Callable without
    /// a prior [`Recipe::build`] in the same process — the handle is
    /// configured lazily on first use.
    pub fn package(&mut self) -> SimmerResult<()> {
        let settings = self.settings.clone();
        with_build_environment(&settings, || {
            let cmake = self.configured_cmake()?;
            cmake.install()
        })
    }

    /// Declares the binary-compatibility key: a header-only package produces
    /// one interchangeable artifact, whatever the consuming settings are.
    pub fn package_identity(&self) -> PackageIdentity {
        PackageIdentity::HeaderOnly
    }

    /// The include-path contribution downstream consumers must add to their
    /// include search path, relative to the install root.
    pub fn package_info(&self) -> PackageInfo {
        PackageInfo {
            include_dirs: vec![
                PathBuf::from("include"),
                Path::new("include").join(&self.metadata.name),
            ],
        }
    }

    fn run_program(&self, program: &Path) -> SimmerResult<()> {
        info!(program = %program.display(), "running program");
        let status = Command::new(program)
            .status()
            .with_context(|| format!("unable to run '{}'", program.display()))?;
        if !status.success() {
            return Err(RecipeError::ToolFailed {
                program: program.display().to_string(),
                status,
            }
            .into());
        }
        Ok(())
    }
}

fn run_tests_requested() -> bool {
    match std::env::var(RUN_TESTS_ENV) {
        Ok(value) => !matches!(value.as_str(), "" | "0" | "false" | "False"),
        Err(_) => false,
    }
}
