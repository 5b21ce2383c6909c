//! Host-supplied package settings.
//!
//! The (os, arch, compiler, build type) tuple is read-only input from the
//! invoking dependency manager. Only the compiler identity is ever branched
//! on: it decides generator selection and environment activation.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Os {
    Linux,
    Macos,
    Windows,
    Other(String),
}

impl Os {
    /// Operating system of the running host.
    pub fn host() -> Self {
        if cfg!(target_os = "windows") {
            Os::Windows
        } else if cfg!(target_os = "macos") {
            Os::Macos
        } else {
            Os::Linux
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Os::Linux => "Linux",
            Os::Macos => "Macos",
            Os::Windows => "Windows",
            Os::Other(name) => name,
        }
    }
}

impl FromStr for Os {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "linux" => Os::Linux,
            "macos" | "darwin" => Os::Macos,
            "windows" => Os::Windows,
            _ => Os::Other(s.to_string()),
        })
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arch {
    X86,
    X86_64,
    Armv8,
    Other(String),
}

impl Arch {
    /// CPU architecture of the running host.
    pub fn host() -> Self {
        if cfg!(target_arch = "x86_64") {
            Arch::X86_64
        } else if cfg!(target_arch = "aarch64") {
            Arch::Armv8
        } else if cfg!(target_arch = "x86") {
            Arch::X86
        } else {
            Arch::Other(std::env::consts::ARCH.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Armv8 => "armv8",
            Arch::Other(name) => name,
        }
    }
}

impl FromStr for Arch {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "x86" => Arch::X86,
            "x86_64" | "amd64" => Arch::X86_64,
            "armv8" | "aarch64" | "arm64" => Arch::Armv8,
            _ => Arch::Other(s.to_string()),
        })
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compiler {
    VisualStudio,
    Gcc,
    Clang,
    AppleClang,
    Other(String),
}

impl Compiler {
    /// Default compiler identity for the running host.
    pub fn host_default() -> Self {
        if cfg!(target_os = "windows") {
            Compiler::VisualStudio
        } else if cfg!(target_os = "macos") {
            Compiler::AppleClang
        } else {
            Compiler::Gcc
        }
    }

    /// Whether this toolchain needs ambient environment variables established
    /// before the build tool can locate its compiler and linker.
    pub fn needs_environment_activation(&self) -> bool {
        matches!(self, Compiler::VisualStudio)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Compiler::VisualStudio => "Visual Studio",
            Compiler::Gcc => "gcc",
            Compiler::Clang => "clang",
            Compiler::AppleClang => "apple-clang",
            Compiler::Other(name) => name,
        }
    }
}

impl FromStr for Compiler {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "visual studio" | "visual-studio" | "msvc" => Compiler::VisualStudio,
            "gcc" => Compiler::Gcc,
            "clang" => Compiler::Clang,
            "apple-clang" => Compiler::AppleClang,
            _ => Compiler::Other(s.to_string()),
        })
    }
}

impl fmt::Display for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildType {
    Debug,
    #[default]
    Release,
    RelWithDebInfo,
    MinSizeRel,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "Debug",
            BuildType::Release => "Release",
            BuildType::RelWithDebInfo => "RelWithDebInfo",
            BuildType::MinSizeRel => "MinSizeRel",
        }
    }
}

impl FromStr for BuildType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(BuildType::Debug),
            "release" => Ok(BuildType::Release),
            "relwithdebinfo" => Ok(BuildType::RelWithDebInfo),
            "minsizerel" => Ok(BuildType::MinSizeRel),
            _ => Err(format!("unknown build type '{s}'")),
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub os: Os,
    pub arch: Arch,
    pub compiler: Compiler,
    pub compiler_version: String,
    pub build_type: BuildType,
}

impl Settings {
    /// Settings describing the running host with the given compiler.
    pub fn host(compiler: Compiler, compiler_version: impl Into<String>) -> Self {
        Settings {
            os: Os::host(),
            arch: Arch::host(),
            compiler,
            compiler_version: compiler_version.into(),
            build_type: BuildType::default(),
        }
    }
}
