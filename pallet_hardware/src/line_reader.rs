//! Tag reader fed by text lines, one UID per line.
//!
//! Serial NFC bridges and the CLI's `--tags-from` both deliver UIDs this
//! way. A background thread does the blocking reads and forwards each
//! non-empty line, so `poll` itself never waits longer than its timeout.
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use pallet_traits::{BoxError, TagReader, normalize_tag_id};

use crate::error::HwError;

const QUEUE_DEPTH: usize = 16;

pub struct LineTagReader {
    rx: Receiver<String>,
    shutdown: Arc<AtomicBool>,
    closed: bool,
    _join: Option<JoinHandle<()>>,
}

impl LineTagReader {
    pub fn spawn<R>(source: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = bounded::<String>(QUEUE_DEPTH);
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = shutdown.clone();
        let join = std::thread::Builder::new()
            .name("tag-lines".into())
            .spawn(move || {
                for line in source.lines() {
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    let line = match line {
                        Ok(l) => l,
                        Err(e) => {
                            tracing::warn!(error = %e, "tag line read failed");
                            break;
                        }
                    };
                    let id = normalize_tag_id(&line);
                    if id.is_empty() || id.starts_with('#') {
                        continue;
                    }
                    if tx.send(id).is_err() {
                        break;
                    }
                }
                tracing::debug!("tag line source closed");
            })
            .ok();
        if join.is_none() {
            tracing::error!("failed to spawn tag line reader thread");
        }
        Self {
            rx,
            shutdown,
            closed: false,
            _join: join,
        }
    }

    /// Read UIDs from a file or a character device (e.g. a serial bridge).
    pub fn open(path: &Path) -> Result<Self, HwError> {
        let file = std::fs::File::open(path)?;
        Ok(Self::spawn(std::io::BufReader::new(file)))
    }

    pub fn stdin() -> Self {
        Self::spawn(std::io::BufReader::new(std::io::stdin()))
    }
}

impl TagReader for LineTagReader {
    fn poll(&mut self, timeout: Duration) -> Result<Option<String>, BoxError> {
        if self.closed {
            return Ok(None);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(id) => Ok(Some(id)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                // Report the end of input once, then behave like an idle reader.
                self.closed = true;
                Err(Box::new(HwError::Disconnected))
            }
        }
    }
}

impl Drop for LineTagReader {
    fn drop(&mut self) {
        // The worker may be parked in a blocking read; it exits on its next
        // line or at EOF, so it is detached rather than joined.
        self.shutdown.store(true, Ordering::Relaxed);
    }
}
