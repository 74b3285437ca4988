use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::converter::{Converter, FfmpegEngine, MediaEngine};
use crate::error::{ConvertError, Result};
use crate::format::AppVariant;
use crate::job::ConversionJob;
use crate::progress::{
    COMPLETED, COMPLETED_LINGER, ProgressReporter, StatusSender, StatusUpdate, TICK_INTERVAL,
};
use crate::settings::SettingsStore;

/// Application state behind the "Convert" and "Settings" buttons
pub struct Session<E: MediaEngine + 'static = FfmpegEngine> {
    converter: Arc<Converter<E>>,
    store: SettingsStore,
    variant: AppVariant,
    status: StatusSender,
    tick: Duration,
    linger: Duration,
}

impl<E: MediaEngine + 'static> Session<E> {
    pub fn new(engine: E, variant: AppVariant, status: StatusSender) -> Self {
        Self {
            converter: Arc::new(Converter::new(engine)),
            store: SettingsStore::default(),
            variant,
            status,
            tick: TICK_INTERVAL,
            linger: COMPLETED_LINGER,
        }
    }

    /// Override the animation interval and how long the completion message stays up
    pub fn with_timing(mut self, tick: Duration, linger: Duration) -> Self {
        self.tick = tick;
        self.linger = linger;
        self
    }

    pub fn variant(&self) -> AppVariant {
        self.variant
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.store
    }

    pub fn settings_mut(&mut self) -> &mut SettingsStore {
        &mut self.store
    }

    /// Validate a selection against the current settings without starting anything
    pub fn prepare(
        &self,
        input: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Result<ConversionJob> {
        ConversionJob::prepare(input, output_dir, self.store.gif_target(), self.variant)
            .inspect_err(|e| log::warn!("Input Error: {}", e))
    }

    /// Start a conversion in the background.
    ///
    /// Selection and file-type problems are returned here and no thread is
    /// started. Everything after that is reported through the status channel
    /// and the returned [`JobHandle`].
    pub fn convert(
        &self,
        input: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Result<JobHandle> {
        let job = self.prepare(input, output_dir)?;
        self.start(job)
    }

    /// Run an already validated job with the settings in effect right now
    pub fn start(&self, job: ConversionJob) -> Result<JobHandle> {
        let settings = self.store.current();

        let active = Arc::new(AtomicBool::new(true));
        let reporter = ProgressReporter::spawn(active.clone(), self.status.clone(), self.tick)?;

        let stop_flag = Arc::clone(&active);
        let converter = Arc::clone(&self.converter);
        let status = self.status.clone();
        let linger = self.linger;

        let spawned = thread::Builder::new()
            .name("conversion".to_string())
            .spawn(move || {
                let result = converter.run(&job, &settings);

                ProgressReporter::stop(&active, reporter);
                status.clear();

                match &result {
                    Ok(_) => {
                        status.text(COMPLETED);
                        status.post(StatusUpdate::ClearAfter(linger));
                    }
                    Err(e) => {
                        log::debug!("Job failed: {}", e);
                        status.text(e.to_string());
                        status.clear();
                    }
                }
                result
            });

        match spawned {
            Ok(handle) => Ok(JobHandle { handle }),
            Err(e) => {
                stop_flag.store(false, Ordering::SeqCst);
                Err(ConvertError::Io(e))
            }
        }
    }
}

/// Waits for a running conversion
pub struct JobHandle {
    handle: JoinHandle<Result<PathBuf>>,
}

impl JobHandle {
    /// Block until the job ends and return the written file
    pub fn wait(self) -> Result<PathBuf> {
        self.handle
            .join()
            .unwrap_or_else(|_| Err(ConvertError::Engine("conversion task panicked".to_string())))
    }
}
