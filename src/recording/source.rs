use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc::Sender,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, info};

use crate::SpeedRecorderError;

use super::LocationFix;

pub const DEFAULT_REPLAY_INTERVAL_MS: u64 = 1000;

/// Interface to the location service that feeds a recording session.
///
/// A source delivers fixes through the `Sender` it receives in [`SampleSource::start_updating`],
/// in the order it observed them, from any thread. It must stop sending once
/// [`SampleSource::stop_updating`] returns, and must accept any number of start/stop cycles.
pub trait SampleSource {
    /// Begin emitting fixes into `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying service cannot be started, for example because it is
    /// already running.
    fn start_updating(&mut self, sink: Sender<LocationFix>) -> Result<(), SpeedRecorderError>;

    /// Stop emitting fixes. Stopping a source that is not running is not an error.
    fn stop_updating(&mut self) -> Result<(), SpeedRecorderError>;

    /// Whether the source may still deliver fixes
    fn is_updating(&self) -> bool;
}

/// Replays a fixed list of fixes at a steady cadence on a background thread.
///
/// Stands in for the platform location service when running from a recorded trace. Progress is
/// kept across start/stop cycles, so a stopped replay resumes where it left off.
pub struct ReplaySampleSource {
    fixes: Arc<Vec<LocationFix>>,
    cursor: Arc<AtomicUsize>,
    interval: Duration,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ReplaySampleSource {
    pub fn from_fixes(fixes: Vec<LocationFix>) -> Self {
        Self {
            fixes: Arc::new(fixes),
            cursor: Arc::new(AtomicUsize::new(0)),
            interval: Duration::from_millis(DEFAULT_REPLAY_INTERVAL_MS),
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Load fixes from a JSON Lines file, one [`LocationFix`] per line.
    pub fn from_file(file: &Path) -> Result<Self, SpeedRecorderError> {
        if !file.is_file() {
            return Err(SpeedRecorderError::InvalidSampleFile {
                path: format!("{:?}", file),
            });
        }
        let fixes = serde_jsonlines::json_lines(file)
            .map_err(|e| SpeedRecorderError::SampleLoaderError { source: e })?
            .collect::<Result<Vec<LocationFix>, std::io::Error>>()
            .map_err(|e| SpeedRecorderError::SampleLoaderError { source: e })?;
        info!("Loaded {} location fixes from {:?}", fixes.len(), file);
        Ok(Self::from_fixes(fixes))
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    /// Timestamp of the next fix to be delivered, the natural start time of a replayed session
    pub fn next_timestamp(&self) -> Option<f64> {
        self.fixes
            .get(self.cursor.load(Ordering::SeqCst))
            .map(|fix| fix.timestamp_s)
    }

    /// Number of fixes not yet delivered
    pub fn remaining(&self) -> usize {
        self.fixes
            .len()
            .saturating_sub(self.cursor.load(Ordering::SeqCst))
    }
}

impl SampleSource for ReplaySampleSource {
    fn start_updating(&mut self, sink: Sender<LocationFix>) -> Result<(), SpeedRecorderError> {
        if self.is_updating() {
            return Err(SpeedRecorderError::SourceStartError {
                description: "replay is already running".to_string(),
            });
        }
        // reap a worker that ran out of fixes on its own
        self.stop_updating()?;

        let stop_flag = Arc::new(AtomicBool::new(false));
        self.stop_flag = stop_flag.clone();
        let fixes = self.fixes.clone();
        let cursor = self.cursor.clone();
        let interval = self.interval;

        let worker = thread::Builder::new()
            .name("replay-source".to_string())
            .spawn(move || replay(&fixes, &cursor, interval, &stop_flag, sink))
            .map_err(|e| SpeedRecorderError::SourceStartError {
                description: e.to_string(),
            })?;
        self.worker = Some(worker);
        Ok(())
    }

    fn stop_updating(&mut self) -> Result<(), SpeedRecorderError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        self.stop_flag.store(true, Ordering::SeqCst);
        worker.thread().unpark();
        worker
            .join()
            .map_err(|_| SpeedRecorderError::SourceStopError {
                description: "replay thread panicked".to_string(),
            })
    }

    fn is_updating(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }
}

impl Drop for ReplaySampleSource {
    fn drop(&mut self) {
        let _ = self.stop_updating();
    }
}

fn replay(
    fixes: &[LocationFix],
    cursor: &AtomicUsize,
    interval: Duration,
    stop_flag: &AtomicBool,
    sink: Sender<LocationFix>,
) {
    loop {
        if stop_flag.load(Ordering::SeqCst) {
            return;
        }
        let idx = cursor.load(Ordering::SeqCst);
        let Some(fix) = fixes.get(idx) else {
            debug!("Replay finished after {} fixes", fixes.len());
            return;
        };
        if sink.send(*fix).is_err() {
            debug!("Replay receiver dropped, stopping");
            return;
        }
        cursor.store(idx + 1, Ordering::SeqCst);

        let deadline = Instant::now() + interval;
        loop {
            if stop_flag.load(Ordering::SeqCst) {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::park_timeout(deadline - now);
        }
    }
}
