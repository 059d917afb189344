//! Command template and output naming
//!
//! Every invocation has the shape `<compiler> <flags...> -o <output> <file>`.
//! Output artifacts are derived from the input file so that concurrent
//! invocations never write to the same path:
//!
//! - `WorkDir::FileParent`: `<name>.out` beside the source, where `<name>` is
//!   the file name with the suffix stripped.
//! - `WorkDir::Invoker`: the same stem under [`INVOKER_OUTPUT_DIR`], mirroring
//!   the file's location relative to the root.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use super::config::{BatchConfig, OutputMode, WorkDir};
use super::discovery::strip_name_suffix;

/// Directory (relative to the invoking process) that holds artifacts in `WorkDir::Invoker` mode
pub const INVOKER_OUTPUT_DIR: &str = "batchc-out";
/// Extension appended to derived output names
pub const OUTPUT_EXTENSION: &str = "out";

/// One planned compiler launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Source file as discovered
    pub source: PathBuf,
    pub program: PathBuf,
    /// Full argument vector, file last
    pub args: Vec<OsString>,
    /// `None` inherits this process's working directory
    pub current_dir: Option<PathBuf>,
    /// Artifact location as seen from this process
    pub output: PathBuf,
}

impl Invocation {
    /// Build the invocation for `file` under `config`.
    pub fn plan(file: &Path, config: &BatchConfig) -> Self {
        let (current_dir, file_arg, output_arg, output) = match config.workdir {
            WorkDir::FileParent => {
                let parent = file.parent().unwrap_or(Path::new(".")).to_path_buf();
                let file_name = file.file_name().map(OsString::from).unwrap_or_else(|| file.into());
                let output_name = match &config.output {
                    OutputMode::PerFile => PathBuf::from(artifact_name(file, &config.suffix)),
                    OutputMode::Fixed(name) => PathBuf::from(name),
                };
                let output = parent.join(&output_name);
                (Some(parent), file_name, output_name, output)
            }
            WorkDir::Invoker => {
                let output = match &config.output {
                    OutputMode::PerFile => output_path(file, &config.root, &config.suffix),
                    OutputMode::Fixed(name) => PathBuf::from(name),
                };
                (None, file.as_os_str().to_os_string(), output.clone(), output)
            }
        };

        let mut args: Vec<OsString> = config.flags.iter().map(OsString::from).collect();
        args.push(OsString::from("-o"));
        args.push(output_arg.into_os_string());
        args.push(file_arg);

        Self {
            source: file.to_path_buf(),
            program: config.compiler.clone(),
            args,
            current_dir,
            output,
        }
    }

    /// File name of the source, for short progress lines
    pub fn display_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dir) = &self.current_dir {
            write!(f, "(cd {} && ", dir.display())?;
        }
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        if self.current_dir.is_some() {
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Artifact file name for a source: its name with `suffix` stripped, plus `.out`.
///
/// Works on the raw file name, so distinct sources always map to distinct artifacts.
pub fn artifact_name(file: &Path, suffix: &str) -> OsString {
    let name = file.file_name().unwrap_or_default();
    let mut artifact = strip_name_suffix(name, suffix).unwrap_or(name).to_os_string();
    artifact.push(".");
    artifact.push(OUTPUT_EXTENSION);
    artifact
}

/// Artifact path for `WorkDir::Invoker` mode, mirrored under [`INVOKER_OUTPUT_DIR`].
///
/// Files outside `root` fall back to their bare artifact name.
pub fn output_path(file: &Path, root: &Path, suffix: &str) -> PathBuf {
    let relative = file.strip_prefix(root).unwrap_or_else(|_| Path::new(""));
    let mut out = PathBuf::from(INVOKER_OUTPUT_DIR);
    if let Some(parent) = relative.parent() {
        out.push(parent);
    }
    out.push(artifact_name(file, suffix));
    out
}
