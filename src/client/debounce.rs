//! Trailing-edge debouncing of user input.
//!
//! A [`DebounceController`] owns a background task holding the pending value
//! and the quiet-window timer. Values are pushed with
//! [`input`](DebounceController::input) and settled values come out of the
//! receiver returned by [`spawn`](DebounceController::spawn).
//!
//! # Guarantees
//!
//! - Only the most recent input at window expiry is emitted
//! - No leading-edge emission
//! - A settled value equal to the previous emission is not emitted again
//! - [`reset`](DebounceController::reset) drops the pending value and forgets
//!   the previous emission
//! - After [`teardown`](DebounceController::teardown) (or drop) nothing is
//!   emitted and the receiver closes

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Quiet window used by the search view.
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

enum Signal<T> {
    Input(T),
    Reset,
}

/// Handle to a running debounce task.
pub struct DebounceController<T> {
    inputs: mpsc::UnboundedSender<Signal<T>>,
    task: JoinHandle<()>,
    delay: Duration,
}

impl<T> DebounceController<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    /// Starts a debounce task with the given quiet window.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(delay: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (inputs, input_receiver) = mpsc::unbounded_channel();
        let (output, settled) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(delay, input_receiver, output));

        (
            Self {
                inputs,
                task,
                delay,
            },
            settled,
        )
    }

    /// Records a new input and restarts the quiet window.
    ///
    /// Inputs after teardown are ignored.
    pub fn input(&self, value: T) {
        self.signal(Signal::Input(value));
    }

    /// Cancels the pending value without emitting it.
    ///
    /// The next settled value is emitted even when it equals the one emitted
    /// before the reset.
    pub fn reset(&self) {
        self.signal(Signal::Reset);
    }

    fn signal(&self, signal: Signal<T>) {
        if self.inputs.send(signal).is_err() {
            tracing::trace!("Debounce input after teardown ignored");
        }
    }
}

impl<T> DebounceController<T> {
    /// Cancels the pending timer. No value is emitted afterwards.
    pub fn teardown(&self) {
        self.task.abort();
    }

    /// Returns the quiet window.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }
}

impl<T> Drop for DebounceController<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<T>(
    delay: Duration,
    mut inputs: mpsc::UnboundedReceiver<Signal<T>>,
    output: mpsc::UnboundedSender<T>,
) where
    T: Clone + PartialEq,
{
    let mut last_emitted: Option<T> = None;
    let mut pending: Option<T> = None;

    loop {
        let signal = match pending.take() {
            None => inputs.recv().await,
            Some(value) => match tokio::time::timeout(delay, inputs.recv()).await {
                Ok(signal) => signal,
                Err(_) => {
                    if last_emitted.as_ref() != Some(&value) {
                        if output.send(value.clone()).is_err() {
                            return;
                        }
                        last_emitted = Some(value);
                    }
                    continue;
                }
            },
        };

        match signal {
            Some(Signal::Input(value)) => pending = Some(value),
            Some(Signal::Reset) => last_emitted = None,
            // Controller gone: the pending value is dropped.
            None => return,
        }
    }
}
