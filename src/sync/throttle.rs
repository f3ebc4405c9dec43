//! Trailing-edge throttle for high-frequency outbound events.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;

struct ThrottleState<T> {
    pending: Option<T>,
    timer: Option<AbortHandle>,
}

/// Emits at most one value per window: the latest one submitted, when the
/// window that the first submission opened ends.
pub struct Throttle<T> {
    window: Duration,
    state: Arc<Mutex<ThrottleState<T>>>,
    emit: Arc<dyn Fn(T) + Send + Sync>,
}

impl<T: Send + 'static> Throttle<T> {
    pub fn new<F>(window: Duration, emit: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            window,
            state: Arc::new(Mutex::new(ThrottleState {
                pending: None,
                timer: None,
            })),
            emit: Arc::new(emit),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace the pending value, opening a window if none is open.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, value: T) {
        let mut state = self.state.lock();
        state.pending = Some(value);
        if state.timer.is_some() {
            return;
        }

        let shared = Arc::clone(&self.state);
        let emit = Arc::clone(&self.emit);
        let window = self.window;
        let task = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let value = {
                let mut state = shared.lock();
                state.timer = None;
                state.pending.take()
            };
            if let Some(value) = value {
                emit(value);
            }
        });
        state.timer = Some(task.abort_handle());
    }

    /// Drop the pending value without emitting it
    pub fn cancel(&self) -> bool {
        let mut state = self.state.lock();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.pending.take().is_some()
    }

    pub fn has_pending(&self) -> bool {
        self.state.lock().pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_throttle(window_ms: u64) -> (Throttle<u32>, Arc<Mutex<Vec<u32>>>) {
        let emitted = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&emitted);
        let throttle = Throttle::new(Duration::from_millis(window_ms), move |v| {
            sink.lock().push(v)
        });
        (throttle, emitted)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_emits_latest_once() {
        let (throttle, emitted) = recording_throttle(1000);

        throttle.submit(1);
        tokio::time::sleep(Duration::from_millis(100)).await;
        throttle.submit(2);
        tokio::time::sleep(Duration::from_millis(100)).await;
        throttle.submit(3);

        tokio::time::sleep(Duration::from_millis(799)).await;
        assert!(emitted.lock().is_empty());
        assert!(throttle.has_pending());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(*emitted.lock(), vec![3]);
        assert!(!throttle.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_window_emits_once() {
        let (throttle, emitted) = recording_throttle(1000);

        throttle.submit(1);
        tokio::time::sleep(Duration::from_millis(1001)).await;
        throttle.submit(2);
        throttle.submit(3);
        tokio::time::sleep(Duration::from_millis(1001)).await;

        assert_eq!(*emitted.lock(), vec![1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending() {
        let (throttle, emitted) = recording_throttle(1000);

        throttle.submit(1);
        assert!(throttle.cancel());
        assert!(!throttle.cancel());

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert!(emitted.lock().is_empty());

        // A new window opens normally after a cancel
        throttle.submit(4);
        tokio::time::sleep(Duration::from_millis(1001)).await;
        assert_eq!(*emitted.lock(), vec![4]);
    }
}
