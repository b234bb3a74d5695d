//! Background execution with progress events and cooperative cancellation

use crate::BrowserOutcome;
use marksync_codec::BookmarkCodec;
use marksync_core::{Browser, Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Started { browser: Browser },
    Finished { browser: Browser, ok: bool },
    Note(String),
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a running operation reports to and hears from its caller
#[derive(Debug, Clone, Default)]
pub struct Control {
    progress: Option<mpsc::UnboundedSender<Progress>>,
    cancel: CancelToken,
}

impl Control {
    /// No listener, never cancelled
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(progress: mpsc::UnboundedSender<Progress>, cancel: CancelToken) -> Self {
        Self {
            progress: Some(progress),
            cancel,
        }
    }

    pub fn emit(&self, event: Progress) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(event);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

pub struct TaskHandle<T> {
    /// Closes once the job returns
    pub progress: mpsc::UnboundedReceiver<Progress>,
    pub cancel: CancelToken,
    join: tokio::task::JoinHandle<Result<T>>,
}

impl<T> TaskHandle<T> {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn join(self) -> Result<T> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(Error::Io(std::io::Error::other(format!(
                "background task failed: {e}"
            )))),
        }
    }
}

/// Run a blocking operation on the runtime's blocking pool
pub fn spawn<T, F>(job: F) -> TaskHandle<T>
where
    F: FnOnce(Control) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancelToken::new();
    let control = Control::new(tx, cancel.clone());

    let join = tokio::task::spawn_blocking(move || job(control));

    TaskHandle {
        progress: rx,
        cancel,
        join,
    }
}

/// Run `step` for each codec in turn, isolating failures per browser
///
/// Cancellation is checked before each browser starts; a browser already
/// in progress always runs to completion.
pub(crate) fn each_browser<T, F>(
    codecs: &[Arc<dyn BookmarkCodec>],
    control: &Control,
    mut step: F,
) -> Vec<BrowserOutcome<T>>
where
    F: FnMut(&dyn BookmarkCodec) -> Result<T>,
{
    let mut outcomes = Vec::with_capacity(codecs.len());

    for codec in codecs {
        let browser = codec.browser();
        if control.is_cancelled() {
            outcomes.push(BrowserOutcome {
                browser,
                result: Err(Error::Cancelled),
            });
            continue;
        }

        control.emit(Progress::Started { browser });
        let result = step(codec.as_ref());
        match &result {
            Ok(_) => info!("{} done", browser),
            Err(e) => warn!("{} failed: {}", browser, e),
        }
        control.emit(Progress::Finished {
            browser,
            ok: result.is_ok(),
        });
        outcomes.push(BrowserOutcome { browser, result });
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use marksync_codec::ChromiumCodec;

    fn codecs() -> Vec<Arc<dyn BookmarkCodec>> {
        [Browser::Chrome, Browser::Edge]
            .into_iter()
            .map(|b| {
                Arc::new(ChromiumCodec::new(b, "/nonexistent/Bookmarks", Arc::new(|_: Browser| false)))
                    as Arc<dyn BookmarkCodec>
            })
            .collect()
    }

    #[tokio::test]
    async fn test_spawn_reports_progress_and_result() {
        let mut task = spawn(|control| {
            control.emit(Progress::Note("working".into()));
            Ok(42)
        });

        let mut events = Vec::new();
        while let Some(event) = task.progress.recv().await {
            events.push(event);
        }
        assert_eq!(events, vec![Progress::Note("working".into())]);
        assert_eq!(task.join().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_cancel_stops_before_next_browser() {
        let codecs = codecs();
        let task = spawn(move |control| {
            let outcomes = each_browser(&codecs, &control, |codec| {
                // Cancelling mid-step does not interrupt this browser
                control.cancel.cancel();
                Ok(codec.browser())
            });
            Ok(outcomes)
        });

        let outcomes = task.join().await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].result.as_ref().unwrap(), &Browser::Chrome);
        assert!(matches!(outcomes[1].result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_failures_stay_per_browser() {
        let control = Control::none();
        let outcomes = each_browser(&codecs(), &control, |codec| match codec.browser() {
            Browser::Chrome => Err(Error::validation("broken file")),
            other => Ok(other),
        });
        assert!(outcomes[0].result.is_err());
        assert_eq!(outcomes[1].result.as_ref().unwrap(), &Browser::Edge);
    }
}
