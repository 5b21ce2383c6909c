use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecipeError {
    #[error("could not extract version from the build description")]
    VersionNotFound,

    #[error("unable to read {}: {source}", .file.display())]
    FileRead {
        file: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' failed: {status}")]
    ToolFailed { program: String, status: ExitStatus },
}
