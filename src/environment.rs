//! Scoped activation of toolchain environment variables.
//!
//! The IDE-integrated toolchain locates its compiler, linker, and include
//! paths through ambient environment variables. Every step that invokes the
//! external build tool runs inside [`with_build_environment`]: the overlay is
//! applied on entry and reverted on every exit path — normal return, error,
//! or unwind — so activation never bleeds into unrelated steps or leaks into
//! the parent process. Other toolchains get a no-op passthrough.

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;

use scopeguard::guard;
use tracing::debug;

use crate::settings::Settings;
use crate::SimmerResult;

/// Transient key-value mapping applied to the process environment for the
/// duration of one scoped operation.
pub type EnvOverlay = BTreeMap<String, String>;

/// The overlay required to activate the toolchain named by `settings`.
/// Empty for toolchains that need none.
pub fn activation_overlay(settings: &Settings) -> SimmerResult<EnvOverlay> {
    if settings.compiler.needs_environment_activation() {
        developer_environment(settings)
    } else {
        Ok(EnvOverlay::new())
    }
}

/// Run `f` with `overlay` applied, restoring the prior environment on every
/// exit path.
pub fn with_overlay<T>(
    overlay: &EnvOverlay,
    f: impl FnOnce() -> SimmerResult<T>,
) -> SimmerResult<T> {
    let saved: Vec<(String, Option<OsString>)> = Vec::with_capacity(overlay.len());
    let mut restore = guard(saved, |saved| {
        for (key, prior) in saved {
            match prior {
                Some(value) => env::set_var(&key, value),
                None => env::remove_var(&key),
            }
        }
    });

    for (key, value) in overlay {
        restore.push((key.clone(), env::var_os(key)));
        env::set_var(key, value);
    }

    f()
}

/// Run `f` inside the environment scope for `settings`.
pub fn with_build_environment<T>(
    settings: &Settings,
    f: impl FnOnce() -> SimmerResult<T>,
) -> SimmerResult<T> {
    let overlay = activation_overlay(settings)?;
    if !overlay.is_empty() {
        debug!(variables = overlay.len(), "activating toolchain environment");
    }
    with_overlay(&overlay, f)
}

/// Capture the developer-environment overlay by running the toolchain's
/// activation script and diffing the resulting variables against the current
/// environment, the way a developer command prompt would have set them.
#[cfg(windows)]
fn developer_environment(settings: &Settings) -> SimmerResult<EnvOverlay> {
    use std::ffi::OsStr;
    use std::path::PathBuf;
    use std::process::Command;

    use anyhow::Context;

    use crate::errors::RecipeError;
    use crate::settings::Arch;

    fn locate_vcvarsall() -> SimmerResult<PathBuf> {
        // Set inside an already-activated developer prompt.
        if let Some(dir) = env::var_os("VSINSTALLDIR") {
            let candidate = PathBuf::from(dir).join(r"VC\Auxiliary\Build\vcvarsall.bat");
            if candidate.exists() {
                return Ok(candidate);
            }
        }

        let program_files = env::var_os("ProgramFiles(x86)")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Program Files (x86)"));
        let vswhere = program_files.join(r"Microsoft Visual Studio\Installer\vswhere.exe");
        let output = Command::new(&vswhere)
            .args(["-latest", "-property", "installationPath"])
            .output()
            .context("unable to run vswhere")?;
        if !output.status.success() {
            return Err(RecipeError::ToolFailed {
                program: vswhere.display().to_string(),
                status: output.status,
            }
            .into());
        }
        let installation = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(PathBuf::from(installation).join(r"VC\Auxiliary\Build\vcvarsall.bat"))
    }

    let script_arch = match settings.arch {
        Arch::X86 => "x86",
        Arch::Armv8 => "arm64",
        _ => "x64",
    };

    let vcvarsall = locate_vcvarsall()?;
    let output = Command::new("cmd")
        .args(["/s", "/c"])
        .arg(format!("\"{}\" {script_arch} && set", vcvarsall.display()))
        .output()
        .context("unable to run the developer environment script")?;
    if !output.status.success() {
        return Err(RecipeError::ToolFailed {
            program: vcvarsall.display().to_string(),
            status: output.status,
        }
        .into());
    }

    let mut overlay = EnvOverlay::new();
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        if let Some((key, value)) = line.split_once('=') {
            let unchanged = env::var_os(key).is_some_and(|prior| prior == OsStr::new(value));
            if !unchanged {
                overlay.insert(key.to_string(), value.to_string());
            }
        }
    }
    Ok(overlay)
}

#[cfg(not(windows))]
fn developer_environment(_settings: &Settings) -> SimmerResult<EnvOverlay> {
    // The activation script only exists on Windows hosts.
    tracing::warn!("toolchain environment activation is unavailable on this host");
    Ok(EnvOverlay::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Arch, BuildType, Compiler, Os};
    use anyhow::anyhow;
    use serial_test::serial;

    fn overlay(pairs: &[(&str, &str)]) -> EnvOverlay {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn gcc_settings() -> Settings {
        Settings {
            os: Os::Linux,
            arch: Arch::X86_64,
            compiler: Compiler::Gcc,
            compiler_version: "13".to_string(),
            build_type: BuildType::Release,
        }
    }

    #[test]
    #[serial]
    fn overlay_is_applied_inside_the_scope() {
        temp_env::with_var_unset("SIMMER_TEST_APPLIED", || {
            with_overlay(&overlay(&[("SIMMER_TEST_APPLIED", "yes")]), || {
                assert_eq!(env::var("SIMMER_TEST_APPLIED").unwrap(), "yes");
                Ok(())
            })
            .unwrap();
            assert!(env::var_os("SIMMER_TEST_APPLIED").is_none());
        });
    }

    #[test]
    #[serial]
    fn prior_value_is_restored_on_success() {
        temp_env::with_var("SIMMER_TEST_PRIOR", Some("before"), || {
            with_overlay(&overlay(&[("SIMMER_TEST_PRIOR", "during")]), || {
                assert_eq!(env::var("SIMMER_TEST_PRIOR").unwrap(), "during");
                Ok(())
            })
            .unwrap();
            assert_eq!(env::var("SIMMER_TEST_PRIOR").unwrap(), "before");
        });
    }

    #[test]
    #[serial]
    fn environment_is_reverted_on_error() {
        temp_env::with_var_unset("SIMMER_TEST_ERR", || {
            let result: SimmerResult<()> =
                with_overlay(&overlay(&[("SIMMER_TEST_ERR", "x")]), || {
                    Err(anyhow!("step failed"))
                });
            assert!(result.is_err());
            assert!(env::var_os("SIMMER_TEST_ERR").is_none());
        });
    }

    #[test]
    #[serial]
    fn environment_is_reverted_on_unwind() {
        temp_env::with_var("SIMMER_TEST_PANIC", Some("before"), || {
            let caught = std::panic::catch_unwind(|| {
                let _: SimmerResult<()> =
                    with_overlay(&overlay(&[("SIMMER_TEST_PANIC", "during")]), || {
                        panic!("interrupted mid-step")
                    });
            });
            assert!(caught.is_err());
            assert_eq!(env::var("SIMMER_TEST_PANIC").unwrap(), "before");
        });
    }

    #[test]
    #[serial]
    fn multiple_variables_restore_independently() {
        temp_env::with_vars(
            [
                ("SIMMER_TEST_A", Some("kept")),
                ("SIMMER_TEST_B", None::<&str>),
            ],
            || {
                with_overlay(
                    &overlay(&[("SIMMER_TEST_A", "a"), ("SIMMER_TEST_B", "b")]),
                    || {
                        assert_eq!(env::var("SIMMER_TEST_A").unwrap(), "a");
                        assert_eq!(env::var("SIMMER_TEST_B").unwrap(), "b");
                        Ok(())
                    },
                )
                .unwrap();
                assert_eq!(env::var("SIMMER_TEST_A").unwrap(), "kept");
                assert!(env::var_os("SIMMER_TEST_B").is_none());
            },
        );
    }

    #[test]
    #[serial]
    fn non_activating_toolchains_get_an_empty_overlay() {
        let overlay = activation_overlay(&gcc_settings()).unwrap();
        assert!(overlay.is_empty());
    }

    #[test]
    #[serial]
    fn build_environment_scope_is_a_passthrough_for_gcc() {
        let before: Vec<(String, String)> = env::vars().collect();
        with_build_environment(&gcc_settings(), || Ok(())).unwrap();
        let after: Vec<(String, String)> = env::vars().collect();
        assert_eq!(before, after);
    }
}
