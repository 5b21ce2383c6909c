//! Handle for the external CMake build tool.
//!
//! The handle only shells out: configure generates the native build system
//! on disk, build and install delegate to `cmake --build`. Compilation and
//! linking are entirely the tool's business.

use std::path::PathBuf;
use std::process::Command;

use anyhow::Context;
use tracing::info;

use crate::errors::RecipeError;
use crate::settings::{Compiler, Settings};
use crate::SimmerResult;

/// Generator override for toolchains that cannot use the tool's default
/// generator selection. The IDE-integrated toolchain gets a command-line
/// generator instead of its IDE project format.
pub fn generator_for(settings: &Settings) -> Option<&'static str> {
    match settings.compiler {
        Compiler::VisualStudio => Some("NMake Makefiles"),
        _ => None,
    }
}

#[derive(Debug)]
pub struct CMake {
    program: PathBuf,
    generator: Option<String>,
    definitions: Vec<(String, String)>,
    source_dir: PathBuf,
    build_dir: PathBuf,
}

impl CMake {
    pub fn new(settings: &Settings, source_dir: PathBuf, build_dir: PathBuf) -> Self {
        CMake {
            program: PathBuf::from("cmake"),
            generator: generator_for(settings).map(String::from),
            definitions: vec![(
                "CMAKE_BUILD_TYPE".to_string(),
                settings.build_type.as_str().to_string(),
            )],
            source_dir,
            build_dir,
        }
    }

    /// Point the handle at a different `cmake` executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Add a `-D<key>=<value>` definition. Only meaningful before
    /// [`CMake::configure`] — the tool bakes definitions into the generated
    /// build system.
    pub fn define(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.definitions.push((key.into(), value.into()));
    }

    pub fn generator(&self) -> Option<&str> {
        self.generator.as_deref()
    }

    pub fn definitions(&self) -> &[(String, String)] {
        &self.definitions
    }

    /// Generate the native build system in the build directory.
    ///
    /// There is no reconfiguration path: callers own the once-per-process
    /// discipline by memoizing the handle after this call succeeds.
    pub fn configure(&self) -> SimmerResult<()> {
        std::fs::create_dir_all(&self.build_dir)
            .with_context(|| format!("unable to create {}", self.build_dir.display()))?;

        let mut cmd = Command::new(&self.program);
        if let Some(generator) = &self.generator {
            cmd.arg("-G").arg(generator);
        }
        for (key, value) in &self.definitions {
            cmd.arg(format!("-D{key}={value}"));
        }
        cmd.arg(&self.source_dir).current_dir(&self.build_dir);
        self.run(cmd)
    }

    /// Build the default target, or the named one.
    pub fn build(&self, target: Option<&str>) -> SimmerResult<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--build").arg(&self.build_dir);
        if let Some(target) = target {
            cmd.arg("--target").arg(target);
        }
        self.run(cmd)
    }

    /// Install the build artifacts under the configured install prefix.
    pub fn install(&self) -> SimmerResult<()> {
        self.build(Some("install"))
    }

    fn run(&self, mut cmd: Command) -> SimmerResult<()> {
        info!(command = ?cmd, "invoking build tool");
        let status = cmd
            .status()
            .with_context(|| format!("unable to run '{}'", self.program.display()))?;
        if !status.success() {
            return Err(RecipeError::ToolFailed {
                program: self.program.display().to_string(),
                status,
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::BuildType;
    use pretty_assertions::assert_eq;

    fn settings(compiler: Compiler) -> Settings {
        Settings {
            os: crate::settings::Os::host(),
            arch: crate::settings::Arch::host(),
            compiler,
            compiler_version: "16".to_string(),
            build_type: BuildType::Release,
        }
    }

    #[test]
    fn visual_studio_selects_nmake() {
        assert_eq!(
            generator_for(&settings(Compiler::VisualStudio)),
            Some("NMake Makefiles")
        );
    }

    #[test]
    fn other_compilers_use_the_tool_default() {
        assert_eq!(generator_for(&settings(Compiler::Gcc)), None);
        assert_eq!(generator_for(&settings(Compiler::Clang)), None);
        assert_eq!(generator_for(&settings(Compiler::AppleClang)), None);
    }

    #[test]
    fn build_type_is_always_defined() {
        let cmake = CMake::new(
            &settings(Compiler::Gcc),
            PathBuf::from("/src"),
            PathBuf::from("/build"),
        );
        assert_eq!(
            cmake.definitions(),
            [("CMAKE_BUILD_TYPE".to_string(), "Release".to_string())]
        );
    }

    #[cfg(unix)]
    mod invocations {
        use super::*;
        use pretty_assertions::assert_eq;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;
        use tempfile::TempDir;

        /// Stand-in build tool that appends its argv to a log file.
        fn recording_tool(dir: &Path, log: &Path) -> PathBuf {
            let program = dir.join("cmake-stub");
            fs::write(
                &program,
                format!("#!/bin/sh\necho \"$@\" >> {}\n", log.display()),
            )
            .unwrap();
            fs::set_permissions(&program, fs::Permissions::from_mode(0o755)).unwrap();
            program
        }

        fn logged_lines(log: &Path) -> Vec<String> {
            fs::read_to_string(log)
                .unwrap_or_default()
                .lines()
                .map(String::from)
                .collect()
        }

        #[test_log::test]
        fn configure_passes_generator_and_definitions() {
            let dir = TempDir::new().unwrap();
            let log = dir.path().join("log");
            let mut cmake = CMake::new(
                &settings(Compiler::VisualStudio),
                PathBuf::from("/src"),
                dir.path().join("build"),
            )
            .with_program(recording_tool(dir.path(), &log));
            cmake.define("ACME_TESTS", "ON");

            cmake.configure().unwrap();

            assert_eq!(
                logged_lines(&log),
                vec!["-G NMake Makefiles -DCMAKE_BUILD_TYPE=Release -DACME_TESTS=ON /src".to_string()]
            );
        }

        #[test]
        fn configure_creates_the_build_directory() {
            let dir = TempDir::new().unwrap();
            let log = dir.path().join("log");
            let build_dir = dir.path().join("build");
            let cmake = CMake::new(
                &settings(Compiler::Gcc),
                PathBuf::from("/src"),
                build_dir.clone(),
            )
            .with_program(recording_tool(dir.path(), &log));

            cmake.configure().unwrap();
            assert!(build_dir.is_dir());
        }

        #[test]
        fn build_names_the_target_when_given() {
            let dir = TempDir::new().unwrap();
            let log = dir.path().join("log");
            let build_dir = dir.path().join("build");
            let cmake = CMake::new(
                &settings(Compiler::Gcc),
                PathBuf::from("/src"),
                build_dir.clone(),
            )
            .with_program(recording_tool(dir.path(), &log));

            cmake.build(None).unwrap();
            cmake.build(Some("package_source")).unwrap();
            cmake.install().unwrap();

            let build_dir = build_dir.display();
            assert_eq!(
                logged_lines(&log),
                vec![
                    format!("--build {build_dir}"),
                    format!("--build {build_dir} --target package_source"),
                    format!("--build {build_dir} --target install"),
                ]
            );
        }

        #[test]
        fn nonzero_exit_is_a_tool_failure() {
            let dir = TempDir::new().unwrap();
            let program = dir.path().join("cmake-stub");
            fs::write(&program, "#!/bin/sh\nexit 7\n").unwrap();
            fs::set_permissions(&program, fs::Permissions::from_mode(0o755)).unwrap();

            let cmake = CMake::new(
                &settings(Compiler::Gcc),
                PathBuf::from("/src"),
                dir.path().join("build"),
            )
            .with_program(&program);

            let err = cmake.build(None).unwrap_err();
            match err.downcast_ref::<RecipeError>() {
                Some(RecipeError::ToolFailed { status, .. }) => {
                    assert_eq!(status.code(), Some(7));
                }
                other => panic!("expected ToolFailed, got {other:?}"),
            }
        }
    }
}
