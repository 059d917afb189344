//! Batch run configuration
//!
//! Defaults reproduce the reference compile script: `rustc` over `./outRust`,
//! MIR opt-level 4 plus `-Copt-level=3`, a 30 second budget per file, one
//! worker, and the compiler running inside each file's own directory.

use std::path::PathBuf;
use std::time::Duration;

use super::errors::{BatchError, BatchResult};
use super::invocation::OUTPUT_EXTENSION;

/// Default compiler executable (resolved through `PATH`)
pub const DEFAULT_COMPILER: &str = "rustc";
/// Default root directory to scan
pub const DEFAULT_ROOT: &str = "./outRust";
/// Default file-name suffix
pub const DEFAULT_SUFFIX: &str = ".rs";
/// Default per-invocation timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default compiler flags, placed before `-o <output> <file>`
pub const DEFAULT_FLAGS: &[&str] = &["-Zmir-opt-level=4", "-Copt-level=3"];

/// Where the compiler process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkDir {
    /// Inside the source file's parent directory; the compiler receives the bare file name.
    #[default]
    FileParent,
    /// In this process's working directory; the compiler receives the path as discovered.
    Invoker,
}

/// How the `-o` artifact is named
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Unique per input file (see [`super::invocation::output_path`]).
    #[default]
    PerFile,
    /// One fixed name for every invocation. Concurrent workers will clobber each other.
    Fixed(String),
}

/// Configuration for one batch run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Compiler executable
    pub compiler: PathBuf,
    /// Directory to scan recursively
    pub root: PathBuf,
    /// File-name suffix to match
    pub suffix: String,
    /// Fixed flags, in order
    pub flags: Vec<String>,
    /// Wall-clock budget per invocation
    pub timeout: Duration,
    /// Worker count; `1` runs strictly sequentially
    pub jobs: usize,
    pub workdir: WorkDir,
    pub output: OutputMode,
    /// Discard compiler stdout/stderr instead of inheriting them
    pub quiet_compiler: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            compiler: PathBuf::from(DEFAULT_COMPILER),
            root: PathBuf::from(DEFAULT_ROOT),
            suffix: DEFAULT_SUFFIX.to_string(),
            flags: DEFAULT_FLAGS.iter().map(|f| f.to_string()).collect(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            jobs: 1,
            workdir: WorkDir::default(),
            output: OutputMode::default(),
            quiet_compiler: false,
        }
    }
}

impl BatchConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compiler(mut self, compiler: impl Into<PathBuf>) -> Self {
        self.compiler = compiler.into();
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Replace the flag list
    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the worker count (clamped to at least 1)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_workdir(mut self, workdir: WorkDir) -> Self {
        self.workdir = workdir;
        self
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn with_quiet_compiler(mut self, quiet: bool) -> Self {
        self.quiet_compiler = quiet;
        self
    }

    /// Whether invocations run one at a time
    pub fn is_sequential(&self) -> bool {
        self.jobs <= 1
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> BatchResult<()> {
        if self.compiler.as_os_str().is_empty() {
            return Err(BatchError::InvalidConfig("compiler path is empty".to_string()));
        }
        if self.suffix.is_empty() {
            return Err(BatchError::InvalidConfig("file suffix is empty".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(BatchError::InvalidConfig("timeout must be greater than zero".to_string()));
        }
        if self.output == OutputMode::PerFile && artifacts_match_suffix(&self.suffix) {
            return Err(BatchError::InvalidConfig(format!(
                "suffix '{}' would match derived '.{}' artifacts; use --output-name or another suffix",
                self.suffix, OUTPUT_EXTENSION
            )));
        }
        if let OutputMode::Fixed(name) = &self.output {
            if name.is_empty() {
                return Err(BatchError::InvalidConfig("fixed output name is empty".to_string()));
            }
            if !self.is_sequential() {
                tracing::warn!(
                    output = %name,
                    jobs = self.jobs,
                    "fixed output name with concurrent workers; artifacts will overwrite each other"
                );
            }
        }
        Ok(())
    }
}

/// Whether a derived `<stem>.out` artifact can itself end with `suffix`, which would
/// let an invocation overwrite its own source or another file's.
fn artifacts_match_suffix(suffix: &str) -> bool {
    let extension = format!(".{}", OUTPUT_EXTENSION);
    extension.ends_with(suffix) || suffix.ends_with(&extension)
}
