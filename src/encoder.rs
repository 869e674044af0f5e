//! External ASTC encoder (astcenc) invocation
//!
//! Invocation contract, positional:
//! `<encoder> -cl <input> <output> <block> <quality>`
//!
//! Exit code 0 is success; otherwise stderr is reported verbatim.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{JobError, ParseError, PreflightError};
use crate::textures::BlockSize;

/// Default bound on a single encoder run
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Encoder effort level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    #[default]
    Fast,
    Medium,
    Thorough,
    Exhaustive,
}

impl Quality {
    pub const ALL: [Quality; 4] = [Quality::Fast, Quality::Medium, Quality::Thorough, Quality::Exhaustive];

    /// Command-line token (`-fast`)
    pub fn token(&self) -> &'static str {
        match self {
            Quality::Fast => "-fast",
            Quality::Medium => "-medium",
            Quality::Thorough => "-thorough",
            Quality::Exhaustive => "-exhaustive",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Quality {
    type Err = ParseError;

    /// Accepts the token with or without the leading dash
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().trim_start_matches('-').to_lowercase();
        Quality::ALL
            .into_iter()
            .find(|q| q.token()[1..] == key)
            .ok_or_else(|| ParseError::Quality(s.to_string()))
    }
}

/// Resolve the encoder executable.
///
/// Paths are used as given; a bare name (`astcenc`) is looked up on PATH.
/// Either way the result must be an existing file.
pub fn resolve_encoder(path: &Path) -> Result<PathBuf, PreflightError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }

    let is_bare_name = path.components().count() == 1 && !path.as_os_str().is_empty();
    if is_bare_name {
        if let Ok(found) = which::which(path) {
            debug!("Resolved encoder {} -> {}", path.display(), found.display());
            return Ok(found);
        }
    }

    Err(PreflightError::EncoderNotFound(path.to_path_buf()))
}

/// A configured encoder executable
#[derive(Debug, Clone)]
pub struct Encoder {
    path: PathBuf,
    timeout: Duration,
}

impl Encoder {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Arguments after the executable, in contract order
    pub fn args(input: &Path, output: &Path, block: BlockSize, quality: Quality) -> Vec<OsString> {
        vec![
            OsString::from("-cl"),
            input.as_os_str().to_owned(),
            output.as_os_str().to_owned(),
            OsString::from(block.token()),
            OsString::from(quality.token()),
        ]
    }

    /// Run the encoder once, bounded by the timeout.
    ///
    /// On timeout the child is killed when its future is dropped.
    pub async fn encode(
        &self,
        input: &Path,
        output: &Path,
        block: BlockSize,
        quality: Quality,
    ) -> Result<(), JobError> {
        let mut cmd = Command::new(&self.path);
        cmd.args(Self::args(input, output, block, quality))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            // CREATE_NO_WINDOW
            cmd.creation_flags(0x0800_0000);
        }

        debug!("Running {} {:?}", self.path.display(), Self::args(input, output, block, quality));

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => return Err(JobError::Timeout(self.timeout)),
            Ok(Err(e)) => return Err(JobError::Spawn(format!("{}: {}", self.path.display(), e))),
            Ok(Ok(output)) => output,
        };

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() {
            match output.status.code() {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            }
        } else {
            stderr
        };

        Err(JobError::EncoderError(detail))
    }
}
