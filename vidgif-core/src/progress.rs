//! Status reporting while a conversion runs.
//!
//! Background threads never touch the display. They post [`StatusUpdate`]s
//! through a [`StatusSender`]; a single [`StatusDisplay`] owns the
//! [`StatusSink`] and applies updates in arrival order.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const PROCESSING: &str = "Processing";
pub const COMPLETED: &str = "Conversion completed.";

/// Dot suffixes cycled by the reporter
pub const FRAMES: [&str; 4] = ["", ".", "..", "..."];

pub const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// How long "Conversion completed." stays visible
pub const COMPLETED_LINGER: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Text(String),
    Clear,
    /// Clear after a delay unless newer text arrives first
    ClearAfter(Duration),
}

/// Whatever shows the status string to the user
pub trait StatusSink {
    fn set_text(&mut self, text: &str);
}

/// Cloneable handle for posting status from any thread
#[derive(Debug, Clone)]
pub struct StatusSender(Sender<StatusUpdate>);

impl StatusSender {
    /// Post an update. A closed display is not an error for the poster.
    pub fn post(&self, update: StatusUpdate) {
        if self.0.send(update).is_err() {
            log::trace!("Status display is gone, dropping update");
        }
    }

    pub fn text(&self, text: impl Into<String>) {
        self.post(StatusUpdate::Text(text.into()));
    }

    pub fn clear(&self) {
        self.post(StatusUpdate::Clear);
    }
}

/// Create a sender and the display that drains it into `sink`
pub fn status_channel<S: StatusSink>(sink: S) -> (StatusSender, StatusDisplay<S>) {
    let (tx, rx) = mpsc::channel();
    (StatusSender(tx), StatusDisplay { sink, rx })
}

/// The only writer of the visible status
pub struct StatusDisplay<S> {
    sink: S,
    rx: Receiver<StatusUpdate>,
}

impl<S: StatusSink> StatusDisplay<S> {
    /// Apply updates until every sender is dropped, then clear and hand back the sink
    pub fn run(mut self) -> S {
        let mut clear_at: Option<Instant> = None;

        loop {
            let update = match clear_at {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        self.sink.set_text("");
                        clear_at = None;
                        continue;
                    }
                    match self.rx.recv_timeout(deadline - now) {
                        Ok(update) => update,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match self.rx.recv() {
                    Ok(update) => update,
                    Err(_) => break,
                },
            };

            match update {
                StatusUpdate::Text(text) => {
                    clear_at = None;
                    self.sink.set_text(&text);
                }
                StatusUpdate::Clear => {
                    clear_at = None;
                    self.sink.set_text("");
                }
                StatusUpdate::ClearAfter(delay) => clear_at = Some(Instant::now() + delay),
            }
        }

        self.sink.set_text("");
        self.sink
    }
}

/// The "Processing..." animation
pub struct ProgressReporter;

impl ProgressReporter {
    /// Start ticking on a new thread until `active` is cleared.
    ///
    /// Clearing the flag and unparking the returned thread stops it promptly.
    pub fn spawn(
        active: Arc<AtomicBool>,
        status: StatusSender,
        interval: Duration,
    ) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("progress".to_string())
            .spawn(move || {
                let mut counter = 0;
                while active.load(Ordering::SeqCst) {
                    status.text(format!("{}{}", PROCESSING, FRAMES[counter]));
                    counter = (counter + 1) % FRAMES.len();
                    thread::park_timeout(interval);
                }
            })
    }

    /// Clear the flag and wait for the ticker to finish its current frame
    pub fn stop(active: &AtomicBool, handle: JoinHandle<()>) {
        active.store(false, Ordering::SeqCst);
        handle.thread().unpark();
        if handle.join().is_err() {
            log::warn!("Progress reporter thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct History(Vec<String>);

    impl StatusSink for History {
        fn set_text(&mut self, text: &str) {
            self.0.push(text.to_string());
        }
    }

    #[test]
    fn display_applies_in_order_and_clears_on_close() {
        let (tx, display) = status_channel(History::default());
        tx.text("one");
        tx.clear();
        tx.text("two");
        drop(tx);

        let history = display.run();
        assert_eq!(history.0, vec!["one", "", "two", ""]);
    }

    #[test]
    fn clear_after_fires_while_senders_live() {
        let (tx, display) = status_channel(History::default());
        let worker = thread::spawn(move || {
            tx.text(COMPLETED);
            tx.post(StatusUpdate::ClearAfter(Duration::from_millis(20)));
            thread::sleep(Duration::from_millis(200));
            tx.text("later");
        });

        let history = display.run();
        worker.join().unwrap();
        assert_eq!(history.0, vec![COMPLETED, "", "later", ""]);
    }

    #[test]
    fn reporter_cycles_frames_until_stopped() {
        let (tx, display) = status_channel(History::default());
        let active = Arc::new(AtomicBool::new(true));
        let handle = ProgressReporter::spawn(active.clone(), tx, Duration::from_millis(5)).unwrap();

        thread::sleep(Duration::from_millis(100));
        ProgressReporter::stop(&active, handle);

        let history = display.run();
        let frames: Vec<&str> = history
            .0
            .iter()
            .map(String::as_str)
            .filter(|t| !t.is_empty())
            .collect();
        assert!(frames.len() >= 4, "got {:?}", frames);
        assert_eq!(
            &frames[..4],
            &["Processing", "Processing.", "Processing..", "Processing..."]
        );
        assert_eq!(history.0.last().map(String::as_str), Some(""));
    }

    #[test]
    fn reporter_stops_without_waiting_full_interval() {
        let (tx, _display) = status_channel(History::default());
        let active = Arc::new(AtomicBool::new(true));
        let handle = ProgressReporter::spawn(active.clone(), tx, Duration::from_secs(30)).unwrap();

        let started = Instant::now();
        ProgressReporter::stop(&active, handle);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
