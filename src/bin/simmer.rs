use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use itertools::Itertools;
use tracing_subscriber::EnvFilter;

use simmer::recipe::{Folders, Metadata, Recipe, RunPrograms};
use simmer::settings::{Arch, BuildType, Compiler, Os, Settings};

/// Build, package, and install a header-only library
#[derive(Parser)]
#[command(version)]
struct Opts {
    #[command(flatten)]
    recipe: RecipeOpts,

    #[command(subcommand)]
    subcmd: SubCommand,
}

#[derive(Args)]
struct RecipeOpts {
    /// Package name
    #[arg(long)]
    name: String,

    /// One-line package description
    #[arg(long, default_value = "")]
    description: String,

    /// Project homepage
    #[arg(long, default_value = "")]
    homepage: String,

    /// License identifier
    #[arg(long, default_value = "")]
    license: String,

    /// Topic tag (repeatable)
    #[arg(long = "topic")]
    topics: Vec<String>,

    /// Folder containing the root build description
    #[arg(long, default_value = ".")]
    source_folder: PathBuf,

    /// Folder the build tool works in
    #[arg(long, default_value = "build")]
    build_folder: PathBuf,

    /// Folder the package is installed into
    #[arg(long, default_value = "package")]
    package_folder: PathBuf,

    /// Target operating system
    #[arg(long, default_value_t = Os::host())]
    os: Os,

    /// Target CPU architecture
    #[arg(long, default_value_t = Arch::host())]
    arch: Arch,

    /// Compiler identity
    #[arg(long, default_value_t = Compiler::host_default())]
    compiler: Compiler,

    /// Compiler version
    #[arg(long, default_value = "")]
    compiler_version: String,

    /// Build type passed to the build tool
    #[arg(long, default_value_t = BuildType::Release)]
    build_type: BuildType,

    /// Run the discovered test and sample binaries after building
    #[arg(long)]
    run_programs: bool,
}

#[derive(Subcommand)]
enum SubCommand {
    /// Print the version resolved from the build description
    Version,
    /// Configure and build, including the source-package target
    Build,
    /// Install the build artifacts into the package folder
    Package,
    /// Print the package's binary-compatibility identity
    PackageId,
    /// Print the metadata advertised to consumers
    PackageInfo,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let RecipeOpts {
        name,
        description,
        homepage,
        license,
        topics,
        source_folder,
        build_folder,
        package_folder,
        os,
        arch,
        compiler,
        compiler_version,
        build_type,
        run_programs,
    } = opts.recipe;

    let metadata = Metadata {
        name,
        description,
        homepage,
        license,
        topics,
    };
    let settings = Settings {
        os,
        arch,
        compiler,
        compiler_version,
        build_type,
    };
    let folders = Folders {
        source: source_folder,
        build: build_folder,
        package: package_folder,
    };
    let run_programs = if run_programs {
        RunPrograms::Enabled
    } else {
        RunPrograms::Disabled
    };

    let mut recipe = Recipe::load(metadata, settings, folders, run_programs)?;

    match opts.subcmd {
        SubCommand::Version => println!("{}", recipe.version()),
        SubCommand::Build => recipe.build()?,
        SubCommand::Package => recipe.package()?,
        SubCommand::PackageId => println!("{}", recipe.package_identity()),
        SubCommand::PackageInfo => {
            let info = recipe.package_info();
            println!(
                "includedirs: {}",
                info.include_dirs
                    .iter()
                    .map(|dir| dir.display().to_string())
                    .join(", ")
            );
        }
    }
    Ok(())
}
