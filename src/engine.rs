use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use log::debug;

use crate::{
    error::{AniError, Result, MISSING_TOOL_HINT},
    types::BlockPair,
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const STDERR_TAIL_LINES: usize = 20;

/// Something that compares every genome of a query list against every genome of a
/// reference list and writes tab-separated rows to `output`.
pub trait SimilarityEngine {
    fn name(&self) -> &str;

    fn compare(
        &self,
        pair: BlockPair,
        query_list: &Path,
        reference_list: &Path,
        output: &Path,
        threads: usize,
    ) -> Result<()>;
}

/// Resolves `program` on PATH, or checks it directly when it contains a path separator.
pub fn locate(program: &str) -> Result<PathBuf> {
    which::which(program).map_err(|_| AniError::ToolNotFound {
        program: program.to_string(),
        hint: MISSING_TOOL_HINT,
    })
}

pub struct FastAni {
    executable: PathBuf,
    timeout: Option<Duration>,
}

impl FastAni {
    pub fn new(program: &str) -> Result<Self> {
        let executable = locate(program)?;
        debug!("Using {}", executable.display());
        Ok(Self {
            executable,
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(
        &self,
        query_list: &Path,
        reference_list: &Path,
        output: &Path,
        threads: usize,
    ) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("--ql")
            .arg(query_list)
            .arg("--rl")
            .arg(reference_list)
            .arg("-o")
            .arg(output)
            .arg("-t")
            .arg(threads.to_string());
        cmd
    }
}

impl SimilarityEngine for FastAni {
    fn name(&self) -> &str {
        "fastANI"
    }

    fn compare(
        &self,
        pair: BlockPair,
        query_list: &Path,
        reference_list: &Path,
        output: &Path,
        threads: usize,
    ) -> Result<()> {
        let mut cmd = self.command(query_list, reference_list, output, threads);
        debug!("Running {:?}", cmd);

        let scratch_dir = output.parent().unwrap_or_else(|| Path::new("."));
        let io_err = |source| AniError::ToolIo { pair, source };

        // stderr goes to an unlinked file so a chatty tool cannot block on a full pipe
        let mut stderr_log = tempfile::tempfile_in(scratch_dir).map_err(io_err)?;
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_log.try_clone().map_err(io_err)?));

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(io_err)?;
        let status = match self.timeout {
            Some(timeout) => match wait_timeout(&mut child, timeout).map_err(io_err)? {
                Some(status) => status,
                None => return Err(AniError::ToolTimeout { pair, timeout }),
            },
            None => child.wait().map_err(io_err)?,
        };
        debug!(
            "{} on block pair {} finished in {:.1}s",
            self.name(),
            pair,
            start.elapsed().as_secs_f64()
        );

        if !status.success() {
            return Err(AniError::ToolFailed {
                pair,
                status,
                stderr: stderr_tail(&mut stderr_log),
            });
        }
        if !output.exists() {
            return Err(AniError::MissingOutput {
                pair,
                path: output.to_path_buf(),
            });
        }
        Ok(())
    }
}

/// Waits for `child` up to `timeout`; kills it and returns `None` when time runs out.
fn wait_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            child.kill()?;
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn stderr_tail(log: &mut File) -> String {
    let mut content = String::new();
    if log.seek(SeekFrom::Start(0)).is_err() || log.read_to_string(&mut content).is_err() {
        return String::new();
    }
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
