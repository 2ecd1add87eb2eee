//! Reading the profile log: once to the end, or following it while the
//! evaluator is still writing.
//!
//! Both modes share [`consume_lines`]. In follow mode a trailing line without
//! a newline is left unread so the next poll picks it up whole.

pub mod signal;

pub use signal::UpdateSignal;

use crate::Result;
use crate::diagnostics;
use crate::log::{LineParser, Record, RecordError};
use crate::model::ProgramRun;

use anyhow::{Context, anyhow, bail};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// The model shared between the poller and readers of the report.
pub type SharedRun = Arc<Mutex<ProgramRun>>;

#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Pause between file checks in follow mode.
    pub poll_interval: Duration,
    /// Keep following the file after the initial pass.
    pub follow: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            follow: false,
        }
    }
}

/// What to do with a last line that has no newline yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fragment {
    Consume,
    Leave,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Progress {
    bytes: u64,
    lines: usize,
}

/// Feed complete lines to `on_line`, returning how much was consumed.
fn consume_lines<R: BufRead>(
    reader: &mut R,
    fragment: Fragment,
    mut on_line: impl FnMut(&str) -> Result<()>,
) -> Result<Progress> {
    let mut progress = Progress::default();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break;
        }
        if fragment == Fragment::Leave && buf.last() != Some(&b'\n') {
            break;
        }

        on_line(&String::from_utf8_lossy(&buf))?;
        progress.bytes += n as u64;
        progress.lines += 1;
    }
    Ok(progress)
}

/// Parse one line and apply it to the model under the lock.
fn dispatch_line(run: &Mutex<ProgramRun>, parser: &LineParser, line: &str) -> Result<()> {
    match parser.parse_line(line) {
        Some(record) => apply_record(run, &record),
        None => Ok(()),
    }
}

fn apply_record(run: &Mutex<ProgramRun>, record: &Record) -> Result<()> {
    let mut model = run
        .lock()
        .map_err(|_| anyhow!(diagnostics::error_message("profile model lock poisoned")))?;
    model
        .process(record)
        .with_context(|| diagnostics::error_message(format!("invalid log record: {}", record.raw)))
}

/// Loads a profile log into a [`ProgramRun`] and optionally follows it.
pub struct Reader {
    path: PathBuf,
    run: SharedRun,
    parser: LineParser,
    config: ReaderConfig,
    loaded: bool,
    cursor: u64,
}

impl Reader {
    pub fn new(path: impl Into<PathBuf>, config: ReaderConfig) -> Result<Self> {
        Self::with_run(path, Arc::new(Mutex::new(ProgramRun::new())), config)
    }

    pub fn with_run(path: impl Into<PathBuf>, run: SharedRun, config: ReaderConfig) -> Result<Self> {
        Ok(Self {
            path: path.into(),
            run,
            parser: LineParser::new()?,
            config,
            loaded: false,
            cursor: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run(&self) -> SharedRun {
        Arc::clone(&self.run)
    }

    #[cfg(test)]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Byte offset just past the last line consumed.
    #[cfg(test)]
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Read the file to its current end. Failures are logged and leave the
    /// reader not loaded; records applied before the failure stay applied.
    pub fn load(&mut self) -> bool {
        match self.read_to_end() {
            Ok(progress) => {
                self.cursor = progress.bytes;
                self.loaded = true;
                info!(
                    path = %self.path.display(),
                    lines = progress.lines,
                    bytes = progress.bytes,
                    "profile log loaded"
                );
            }
            Err(e) => {
                self.loaded = false;
                let not_found = e
                    .downcast_ref::<io::Error>()
                    .is_some_and(|io| io.kind() == io::ErrorKind::NotFound);
                if not_found {
                    warn!(path = %self.path.display(), "profile log not found");
                } else {
                    error!("{:#}", e);
                }
            }
        }
        self.loaded
    }

    fn read_to_end(&self) -> Result<Progress> {
        let file = File::open(&self.path)
            .with_context(|| diagnostics::error_message(format!("open {}", self.path.display())))?;
        let mut reader = BufReader::new(file);
        let fragment = if self.config.follow {
            Fragment::Leave
        } else {
            Fragment::Consume
        };
        consume_lines(&mut reader, fragment, |line| {
            dispatch_line(&self.run, &self.parser, line)
        })
    }

    /// A poller resuming where the initial pass stopped.
    pub fn poller(&self) -> Result<Poller> {
        if !self.loaded {
            bail!(
                "{}",
                diagnostics::error_message(format!(
                    "cannot follow {}: initial load did not complete",
                    self.path.display()
                ))
            );
        }
        if !self.config.follow {
            bail!(
                "{}",
                diagnostics::error_message("reader was not configured to follow the log")
            );
        }
        Ok(Poller {
            path: self.path.clone(),
            cursor: self.cursor,
            parser: self.parser.clone(),
            run: self.run(),
            last_line: None,
        })
    }

    /// Start following the file on a background thread.
    pub fn follow(&self) -> Result<LiveTail> {
        LiveTail::spawn(self.poller()?, self.config.poll_interval)
    }
}

/// Incremental reader for a growing log file.
pub struct Poller {
    path: PathBuf,
    cursor: u64,
    parser: LineParser,
    run: SharedRun,
    last_line: Option<String>,
}

impl Poller {
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// The last event record handed to the model, for diagnostics.
    pub fn last_line(&self) -> Option<&str> {
        self.last_line.as_deref()
    }

    /// Check the file once and ingest any complete new lines.
    ///
    /// Returns the number of lines consumed. A shrunken file moves the cursor
    /// back to the new end; a missing file counts as empty.
    pub fn poll(&mut self) -> Result<usize> {
        let len = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => {
                return Err(e).with_context(|| {
                    diagnostics::error_message(format!("stat {}", self.path.display()))
                });
            }
        };

        if len < self.cursor {
            debug!(from = self.cursor, to = len, "profile log shrank");
            self.cursor = len;
            return Ok(0);
        }
        if len == self.cursor {
            return Ok(0);
        }

        let mut file = File::open(&self.path)
            .with_context(|| diagnostics::error_message(format!("open {}", self.path.display())))?;
        file.seek(SeekFrom::Start(self.cursor))?;
        let mut reader = BufReader::new(file);

        let Self {
            run,
            parser,
            last_line,
            ..
        } = self;
        let progress = consume_lines(&mut reader, Fragment::Leave, |line| {
            let Some(record) = parser.parse_line(line) else {
                return Ok(());
            };
            *last_line = Some(record.raw.clone());
            match apply_record(run, &record) {
                // A bad record is dropped; the poller keeps going.
                Err(e) if e.downcast_ref::<RecordError>().is_some() => {
                    error!("{:#}", e);
                    Ok(())
                }
                other => other,
            }
        })?;

        self.cursor += progress.bytes;
        Ok(progress.lines)
    }
}

/// Handle to a running background poller.
///
/// Dropping the handle stops the poller and waits for it to exit.
pub struct LiveTail {
    running: Arc<AtomicBool>,
    signal: Arc<UpdateSignal>,
    handle: Option<JoinHandle<()>>,
}

impl LiveTail {
    fn spawn(mut poller: Poller, interval: Duration) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let signal = Arc::new(UpdateSignal::new());

        let handle = thread::Builder::new()
            .name("profile-tail".to_string())
            .spawn({
                let running = Arc::clone(&running);
                let signal = Arc::clone(&signal);
                move || poll_loop(&mut poller, interval, &running, &signal)
            })
            .context(diagnostics::error_message("spawn profile log poller"))?;

        Ok(Self {
            running,
            signal,
            handle: Some(handle),
        })
    }

    /// True while new data has not been acknowledged.
    pub fn is_updated(&self) -> bool {
        self.signal.is_updated()
    }

    pub fn acknowledge(&self) {
        self.signal.acknowledge();
    }

    /// False once stopped or after the poller gave up on an error.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("profile log poller panicked");
            }
        }
    }
}

impl Drop for LiveTail {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn poll_loop(poller: &mut Poller, interval: Duration, running: &AtomicBool, signal: &UpdateSignal) {
    while running.load(Ordering::Acquire) {
        thread::sleep(interval);
        if !running.load(Ordering::Acquire) {
            break;
        }

        match poller.poll() {
            Ok(0) => {}
            Ok(lines) => {
                debug!(lines, cursor = poller.cursor(), "ingested profile log lines");
                signal.notify();
            }
            Err(e) => {
                error!(
                    last_record = poller.last_line().unwrap_or("<none>"),
                    "profile log poller stopped: {:#}", e
                );
                running.store(false, Ordering::Release);
                break;
            }
        }
    }
}
