use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use tokio::sync::watch;
use tracing::warn;

use crate::error::{ClientError, SharedError};

/// Lifecycle of a [`PageStream`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Created, nothing delivered yet
    Pending,

    /// At least one batch delivered
    Active,

    /// Terminated normally
    Completed,

    /// Terminated by an error
    Errored,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        matches!(self, StreamState::Completed | StreamState::Errored)
    }
}

impl std::fmt::Display for StreamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamState::Pending => write!(f, "pending"),
            StreamState::Active => write!(f, "active"),
            StreamState::Completed => write!(f, "completed"),
            StreamState::Errored => write!(f, "errored"),
        }
    }
}

type BatchCallback<T> = Box<dyn FnMut(&[T]) + Send>;
type ErrorCallback = Box<dyn FnMut(&SharedError) + Send>;
type CompletedCallback = Box<dyn FnMut() + Send>;

type Outcome = std::result::Result<(), SharedError>;

struct Core<T> {
    state: StreamState,
    on_batch: Vec<BatchCallback<T>>,
    on_error: Vec<ErrorCallback>,
    on_completed: Vec<CompletedCallback>,
}

impl<T> Core<T> {
    /// Callbacks are never invoked again once terminal; dropping them also
    /// releases whatever they captured.
    fn release_callbacks(&mut self) {
        self.on_batch.clear();
        self.on_error.clear();
        self.on_completed.clear();
    }
}

struct Shared<T> {
    core: Mutex<Core<T>>,
    /// Held for the whole delivery of one event, so events reach the
    /// callbacks one at a time and in order. Reentrant so a callback can
    /// emit on its own stream.
    delivery: ReentrantMutex<()>,
    outcome: watch::Sender<Option<Outcome>>,
}

/// Push-based stream of item batches.
///
/// The producer (the retrieval engine) calls [`write_batch`](Self::write_batch)
/// zero or more times, then exactly one of [`complete`](Self::complete) or
/// [`fail`](Self::fail). Consumers register callbacks with `on_item_batch`,
/// `on_error` and `on_completed`; each event is delivered to the callbacks
/// registered at the time it fires, in registration order. Nothing is
/// buffered, so register before handing the stream to the engine.
///
/// Once terminal, further producer calls are ignored and logged, and newly
/// registered callbacks are dropped.
///
/// Callbacks run outside the stream's state lock, so they may query the
/// stream, register further callbacks or terminate it. A callback registered
/// while an event is being delivered first sees the next event. A batch
/// written from inside a batch callback skips the callbacks currently running.
///
/// # Example
///
/// ```ignore
/// let stream = PageStream::<Device>::new();
/// stream.on_item_batch(|devices| println!("{} devices", devices.len()));
/// client.retrieve_all_pages(&stream, &endpoints.devices, FetchOptions::new(), "devices");
/// stream.wait().await?;
/// ```
pub struct PageStream<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for PageStream<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for PageStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for PageStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageStream")
            .field("state", &self.state())
            .finish()
    }
}

impl<T> PageStream<T> {
    /// Create an empty, pending stream
    pub fn new() -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(Core {
                    state: StreamState::Pending,
                    on_batch: Vec::new(),
                    on_error: Vec::new(),
                    on_completed: Vec::new(),
                }),
                delivery: ReentrantMutex::new(()),
                outcome,
            }),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> StreamState {
        self.shared.core.lock().state
    }

    /// Whether `completed` or `error` has already fired
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Register a callback for every delivered batch
    pub fn on_item_batch<F>(&self, callback: F) -> &Self
    where
        F: FnMut(&[T]) + Send + 'static,
    {
        let mut core = self.shared.core.lock();
        if !core.state.is_terminal() {
            core.on_batch.push(Box::new(callback));
        }
        drop(core);
        self
    }

    /// Register a callback for the terminal error
    pub fn on_error<F>(&self, callback: F) -> &Self
    where
        F: FnMut(&SharedError) + Send + 'static,
    {
        let mut core = self.shared.core.lock();
        if !core.state.is_terminal() {
            core.on_error.push(Box::new(callback));
        }
        drop(core);
        self
    }

    /// Register a callback for normal termination
    pub fn on_completed<F>(&self, callback: F) -> &Self
    where
        F: FnMut() + Send + 'static,
    {
        let mut core = self.shared.core.lock();
        if !core.state.is_terminal() {
            core.on_completed.push(Box::new(callback));
        }
        drop(core);
        self
    }

    /// Deliver one batch to the subscribers
    pub fn write_batch(&self, items: Vec<T>) {
        let len = items.len();
        if let Err(state) = self.try_write_batch(items) {
            warn!(
                state = %state,
                items = len,
                "Batch written to a terminated stream, dropping it"
            );
        }
    }

    /// Terminate the stream with an error
    pub fn fail(&self, error: impl Into<SharedError>) {
        let error = error.into();
        if let Err(state) = self.try_fail(Arc::clone(&error)) {
            warn!(state = %state, error = %error, "Failure reported on a terminated stream, ignoring it");
        }
    }

    /// Terminate the stream normally
    pub fn complete(&self) {
        if let Err(state) = self.try_complete() {
            warn!(state = %state, "Completion reported on a terminated stream, ignoring it");
        }
    }

    /// Deliver a batch unless the stream is terminal.
    ///
    /// For producers sharing a stream with others, where losing the race to
    /// a terminal event is expected. Returns the terminal state otherwise.
    pub fn try_write_batch(&self, items: Vec<T>) -> std::result::Result<(), StreamState> {
        let _delivery = self.shared.delivery.lock();
        let mut callbacks = {
            let mut core = self.shared.core.lock();
            if core.state.is_terminal() {
                return Err(core.state);
            }
            core.state = StreamState::Active;
            std::mem::take(&mut core.on_batch)
        };

        for callback in callbacks.iter_mut() {
            callback(&items);
        }

        let mut core = self.shared.core.lock();
        if !core.state.is_terminal() {
            // keep registration order: callbacks added during delivery go last
            callbacks.append(&mut core.on_batch);
            core.on_batch = callbacks;
        }
        Ok(())
    }

    /// Fail the stream unless it is already terminal
    pub fn try_fail(&self, error: impl Into<SharedError>) -> std::result::Result<(), StreamState> {
        let error = error.into();
        let _delivery = self.shared.delivery.lock();
        let mut callbacks = {
            let mut core = self.shared.core.lock();
            if core.state.is_terminal() {
                return Err(core.state);
            }
            core.state = StreamState::Errored;
            let callbacks = std::mem::take(&mut core.on_error);
            core.release_callbacks();
            callbacks
        };

        for callback in callbacks.iter_mut() {
            callback(&error);
        }
        self.shared.outcome.send_replace(Some(Err(error)));
        Ok(())
    }

    /// Complete the stream unless it is already terminal
    pub fn try_complete(&self) -> std::result::Result<(), StreamState> {
        let _delivery = self.shared.delivery.lock();
        let mut callbacks = {
            let mut core = self.shared.core.lock();
            if core.state.is_terminal() {
                return Err(core.state);
            }
            core.state = StreamState::Completed;
            let callbacks = std::mem::take(&mut core.on_completed);
            core.release_callbacks();
            callbacks
        };

        for callback in callbacks.iter_mut() {
            callback();
        }
        self.shared.outcome.send_replace(Some(Ok(())));
        Ok(())
    }

    /// Wait for the terminal event.
    ///
    /// Resolves immediately if the stream already terminated. Batches are not
    /// returned here; subscribe with [`on_item_batch`](Self::on_item_batch).
    pub async fn wait(&self) -> std::result::Result<(), SharedError> {
        let mut rx = self.shared.outcome.subscribe();
        let outcome = rx.wait_for(Option::is_some).await.map(|o| (*o).clone());
        match outcome {
            Ok(Some(result)) => result,
            _ => Err(Arc::new(ClientError::StreamClosed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Recorded, Recorder};

    #[test]
    fn test_state_machine() {
        let stream = PageStream::<u32>::new();
        assert_eq!(stream.state(), StreamState::Pending);

        stream.write_batch(vec![1, 2]);
        assert_eq!(stream.state(), StreamState::Active);

        stream.complete();
        assert_eq!(stream.state(), StreamState::Completed);
        assert!(stream.is_terminal());
    }

    #[test]
    fn test_events_in_order() {
        let stream = PageStream::<u32>::new();
        let recorder = Recorder::attach(&stream);

        stream.write_batch(vec![1, 2]);
        stream.write_batch(vec![3]);
        stream.complete();

        assert_eq!(
            recorder.events(),
            vec![
                Recorded::Batch(vec![1, 2]),
                Recorded::Batch(vec![3]),
                Recorded::Completed,
            ]
        );
    }

    #[test]
    fn test_all_callbacks_fire_in_registration_order() {
        let stream = PageStream::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        stream.on_item_batch(move |_| first.lock().push("first"));
        let second = Arc::clone(&seen);
        stream.on_item_batch(move |_| second.lock().push("second"));

        stream.write_batch(vec![1]);
        assert_eq!(*seen.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_writes_after_complete_are_ignored() {
        let stream = PageStream::<u32>::new();
        let recorder = Recorder::attach(&stream);

        stream.complete();
        stream.write_batch(vec![9]);
        stream.fail(ClientError::StreamClosed);
        stream.complete();

        assert_eq!(recorder.events(), vec![Recorded::Completed]);
        assert_eq!(stream.state(), StreamState::Completed);
    }

    #[test]
    fn test_batches_before_error_are_kept() {
        let stream = PageStream::<u32>::new();
        let recorder = Recorder::attach(&stream);

        stream.write_batch(vec![1]);
        stream.fail(ClientError::StreamClosed);
        stream.write_batch(vec![2]);
        stream.complete();

        assert_eq!(
            recorder.events(),
            vec![
                Recorded::Batch(vec![1]),
                Recorded::Error("Stream closed".to_string()),
            ]
        );
        assert_eq!(stream.state(), StreamState::Errored);
    }

    #[test]
    fn test_late_subscriber_misses_earlier_batches() {
        let stream = PageStream::<u32>::new();
        stream.write_batch(vec![1]);

        let recorder = Recorder::attach(&stream);
        stream.write_batch(vec![2]);
        stream.complete();

        assert_eq!(recorder.batches(), vec![vec![2]]);
    }

    #[test]
    fn test_try_variants_report_terminal_state() {
        let stream = PageStream::<u32>::new();
        assert_eq!(stream.try_write_batch(vec![1]), Ok(()));
        assert_eq!(stream.try_fail(ClientError::StreamClosed), Ok(()));
        assert_eq!(stream.try_complete(), Err(StreamState::Errored));
        assert_eq!(stream.try_write_batch(vec![2]), Err(StreamState::Errored));
    }

    #[test]
    fn test_callbacks_may_use_their_own_stream() {
        let stream = PageStream::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner = stream.clone();
        let states = Arc::clone(&seen);
        stream.on_item_batch(move |_| {
            states.lock().push(inner.state());
            // registered mid-delivery, so only sees the next batch
            let late = Arc::clone(&states);
            inner.on_item_batch(move |_| late.lock().push(StreamState::Pending));
        });
        let inner = stream.clone();
        let states = Arc::clone(&seen);
        stream.on_completed(move || states.lock().push(inner.state()));

        stream.write_batch(vec![1]);
        stream.write_batch(vec![2]);
        stream.complete();

        assert_eq!(
            *seen.lock(),
            vec![
                StreamState::Active,
                StreamState::Active,
                StreamState::Pending,
                StreamState::Completed,
            ]
        );
    }

    #[test]
    fn test_batch_callback_can_complete_the_stream() {
        let stream = PageStream::<u32>::new();
        let recorder = Recorder::attach(&stream);
        let inner = stream.clone();
        stream.on_item_batch(move |items| {
            if items.contains(&0) {
                inner.complete();
            }
        });

        stream.write_batch(vec![3, 0]);
        stream.write_batch(vec![4]);

        assert_eq!(
            recorder.events(),
            vec![Recorded::Batch(vec![3, 0]), Recorded::Completed]
        );
        assert_eq!(stream.state(), StreamState::Completed);
    }

    #[tokio::test]
    async fn test_terminal_event_reaches_waiter_when_callback_queries_stream() {
        let stream = PageStream::<u32>::new();
        let inner = stream.clone();
        stream.on_item_batch(move |_| {
            assert!(!inner.is_terminal());
        });

        let producer = stream.clone();
        tokio::task::spawn_blocking(move || {
            producer.write_batch(vec![1]);
            producer.complete();
        });

        let outcome = tokio::time::timeout(std::time::Duration::from_secs(5), stream.wait()).await;
        assert!(matches!(outcome, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_wait_after_completion() {
        let stream = PageStream::<u32>::new();
        stream.complete();
        assert!(stream.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_observes_failure_from_another_task() {
        let stream = PageStream::<u32>::new();
        let producer = stream.clone();
        tokio::spawn(async move {
            producer.write_batch(vec![1]);
            producer.fail(ClientError::Decode {
                url: "http://localhost/devices".into(),
                message: "bad".into(),
            });
        });

        let err = stream.wait().await.unwrap_err();
        assert!(matches!(*err, ClientError::Decode { .. }));
    }
}
