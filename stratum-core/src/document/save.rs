//! # Saving
//!
//! Writing happens on a background pool. The document captures what to write on its own thread,
//! then gets on with other work while a [`PendingSave`] waits for the outcome, which it hands
//! back to [`Document::finish_save`].
//!
//! Two writes to the same file never overlap: a second save of a path that's still being written
//! is refused.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hashbrown::HashSet;
use image::RgbaImage;
use parking_lot::Mutex;

use super::Document;
use crate::layer::Layer;

#[derive(thiserror::Error, Debug)]
pub enum SaveError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Encode(#[from] image::ImageError),
    #[error(transparent)]
    OutOfMemory(#[from] crate::raster::AllocError),
    #[error("{0} can't store this document")]
    Unsupported(String),
    #[error("save was interrupted")]
    Interrupted,
}

/// What gets written, captured when the save starts.
pub enum SavePayload {
    Composite(Arc<RgbaImage>),
    Layers {
        canvas: [u32; 2],
        layers: Vec<Layer>,
    },
}

/// Encodes a document to a file. Runs on the IO pool.
pub trait DocumentWriter: Send + Sync + 'static {
    /// Whether this writer stores layers separately, rather than just the composite.
    fn wants_layers(&self) -> bool {
        false
    }
    /// # Errors
    /// If encoding or writing fails. The file may be left partially written.
    fn write(&self, payload: &SavePayload, path: &Path) -> Result<(), SaveError>;
}

type InFlight = Arc<Mutex<HashSet<PathBuf>>>;

/// Thread pool for file IO, tracking which paths are being written.
pub struct IoTasks {
    pool: rayon::ThreadPool,
    in_flight: InFlight,
}
impl IoTasks {
    /// # Errors
    /// If the threads can't be spawned.
    pub fn new(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|idx| format!("stratum-io-{idx}"))
            .build()?;
        Ok(Self {
            pool,
            in_flight: InFlight::default(),
        })
    }
    /// Whether a write to `path` is still running.
    #[must_use]
    pub fn is_processing(&self, path: &Path) -> bool {
        self.in_flight.lock().contains(&absolute(path))
    }
    fn claim(&self, path: PathBuf) -> Option<PathGuard> {
        if !self.in_flight.lock().insert(path.clone()) {
            return None;
        }
        Some(PathGuard {
            path,
            in_flight: self.in_flight.clone(),
        })
    }
}

/// Marks a path busy until dropped.
struct PathGuard {
    path: PathBuf,
    in_flight: InFlight,
}
impl Drop for PathGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.path);
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_owned();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_owned(),
    }
}

/// A save running in the background.
pub struct PendingSave {
    path: PathBuf,
    was_dirty: bool,
    receiver: crossbeam::channel::Receiver<Result<(), SaveError>>,
}
impl PendingSave {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
    /// The outcome, if the write is done.
    #[must_use]
    pub fn try_outcome(&self) -> Option<Result<(), SaveError>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(crossbeam::channel::TryRecvError::Empty) => None,
            Err(crossbeam::channel::TryRecvError::Disconnected) => {
                Some(Err(SaveError::Interrupted))
            }
        }
    }
    /// Block until the write is done.
    ///
    /// # Errors
    /// The write's error.
    pub fn wait(&self) -> Result<(), SaveError> {
        self.receiver.recv().unwrap_or(Err(SaveError::Interrupted))
    }
}

impl Document {
    /// Start writing this document to `path` in the background.
    ///
    /// The document counts as clean from here on, and [`Document::finish_save`] makes it dirty
    /// again if the write fails. Returns `None`, changing nothing, if `path` is already being
    /// written.
    pub fn save_async(
        &mut self,
        path: impl AsRef<Path>,
        writer: Arc<dyn DocumentWriter>,
        tasks: &IoTasks,
    ) -> Option<PendingSave> {
        let path = absolute(path.as_ref());
        let Some(guard) = tasks.claim(path.clone()) else {
            log::warn!("{} is still being written, not saving again", path.display());
            return None;
        };
        let was_dirty = self.dirty;
        self.dirty = false;
        let payload = if writer.wants_layers() {
            SavePayload::Layers {
                canvas: self.canvas.size(),
                layers: self.layers.clone(),
            }
        } else {
            SavePayload::Composite(self.composite())
        };

        log::debug!("saving {:?} to {}", self.name, path.display());
        let (sender, receiver) = crossbeam::channel::bounded(1);
        let job_path = path.clone();
        tasks.pool.spawn(move || {
            let outcome = writer.write(&payload, &job_path);
            drop(guard);
            if sender.send(outcome).is_err() {
                log::warn!("nobody waiting for the save of {}", job_path.display());
            }
        });
        Some(PendingSave {
            path,
            was_dirty,
            receiver,
        })
    }
    /// Apply the outcome of a background save. On success the document now belongs to the saved
    /// file.
    ///
    /// # Errors
    /// The outcome's error, after making the document dirty again if it was before the save.
    pub fn finish_save(
        &mut self,
        pending: PendingSave,
        outcome: Result<(), SaveError>,
    ) -> Result<(), SaveError> {
        match outcome {
            Ok(()) => {
                log::info!("saved {}", pending.path.display());
                self.set_file(pending.path);
                Ok(())
            }
            Err(err) => {
                log::error!("saving {} failed: {err}", pending.path.display());
                self.dirty |= pending.was_dirty;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::test::red_document;

    /// Remembers what it was given.
    #[derive(Default)]
    struct Recorder {
        written: Mutex<Vec<(PathBuf, [u32; 2])>>,
    }
    impl DocumentWriter for Recorder {
        fn write(&self, payload: &SavePayload, path: &Path) -> Result<(), SaveError> {
            let SavePayload::Composite(image) = payload else {
                return Err(SaveError::Unsupported("recorder".to_owned()));
            };
            self.written
                .lock()
                .push((path.to_owned(), [image.width(), image.height()]));
            Ok(())
        }
    }
    struct Failing;
    impl DocumentWriter for Failing {
        fn write(&self, _: &SavePayload, _: &Path) -> Result<(), SaveError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read only").into())
        }
    }
    /// Doesn't finish until told to.
    struct Blocked(crossbeam::channel::Receiver<()>);
    impl DocumentWriter for Blocked {
        fn write(&self, _: &SavePayload, _: &Path) -> Result<(), SaveError> {
            self.0.recv().map_err(|_| SaveError::Interrupted)
        }
    }

    #[test]
    fn success_takes_file() {
        let tasks = IoTasks::new(1).unwrap();
        let mut document = red_document(3, 2);
        document.set_dirty(true);
        let recorder = Arc::new(Recorder::default());
        let pending = document
            .save_async("out.png", recorder.clone(), &tasks)
            .unwrap();
        assert!(!document.is_dirty());
        let outcome = pending.wait();
        document.finish_save(pending, outcome).unwrap();
        assert_eq!(document.name(), "out.png");
        assert!(document.file().unwrap().is_absolute());
        let written = recorder.written.lock();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].1, [3, 2]);
    }
    #[test]
    fn failure_restores_dirty() {
        let tasks = IoTasks::new(1).unwrap();
        let mut document = red_document(3, 2);
        document.set_dirty(true);
        let pending = document
            .save_async("nope.png", Arc::new(Failing), &tasks)
            .unwrap();
        let outcome = pending.wait();
        assert!(matches!(
            document.finish_save(pending, outcome),
            Err(SaveError::Io(_))
        ));
        assert!(document.is_dirty());
        assert!(document.file().is_none());
    }
    #[test]
    fn one_write_per_path() {
        let tasks = IoTasks::new(2).unwrap();
        let mut document = red_document(3, 2);
        let (release, wait) = crossbeam::channel::bounded(1);
        let pending = document
            .save_async("busy.png", Arc::new(Blocked(wait)), &tasks)
            .unwrap();
        assert!(tasks.is_processing(Path::new("busy.png")));
        assert!(pending.try_outcome().is_none());
        assert!(document
            .save_async("busy.png", Arc::new(Failing), &tasks)
            .is_none());

        release.send(()).unwrap();
        pending.wait().unwrap();
        // The guard is released before the outcome is sent.
        assert!(!tasks.is_processing(Path::new("busy.png")));
    }
}
