//! Circuit breaker for command protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: command assumed broken, calls fail fast
//! - Half-Open: a single trial call is testing recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= max_failures
//! Open → Half-Open: next call after reset_timeout
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails (or is abandoned)
//! ```
//!
//! # Design Decisions
//! - Independent of what the wrapped operation does
//! - Fail fast in Open state (operation never invoked, no state mutation)
//! - Single trial in Half-Open; concurrent callers are rejected meanwhile
//! - State-change notifications go through a bounded queue drained by one
//!   observer task, so a slow observer can never stall `execute`

use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

/// Capacity of the state-change notification queue.
const NOTIFY_QUEUE_CAPACITY: usize = 64;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    HalfOpen,
    Open,
}

impl CircuitState {
    /// Numeric encoding used for metrics (0 closed, 1 half-open, 2 open).
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
            CircuitState::Open => write!(f, "OPEN"),
        }
    }
}

/// A single state transition, as delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub name: String,
    pub from: CircuitState,
    pub to: CircuitState,
}

/// Receives state transitions out-of-band.
///
/// Errors are logged and swallowed; they never reach `execute` callers.
pub trait StateObserver: Send + Sync + 'static {
    fn on_state_change(&self, change: &StateChange) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Error returned by [`CircuitBreaker::execute`].
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// The breaker rejected the call; the operation was not invoked.
    #[error("circuit breaker is open")]
    Open,
    /// The operation ran and failed.
    #[error(transparent)]
    Inner(E),
}

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub name: String,
    pub max_failures: u32,
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            name: "circuit-breaker".to_string(),
            max_failures: 5,
            reset_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failures: u32,
    last_failure: Option<Instant>,
    trial_in_flight: bool,
}

/// How a finished call should be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    /// Neither success nor failure (e.g. the caller was cancelled).
    Ignored,
}

/// Failure-gating state machine around any fallible async operation.
pub struct CircuitBreaker {
    name: String,
    max_failures: u32,
    reset_timeout: Duration,
    inner: RwLock<Inner>,
    notify_tx: Option<mpsc::Sender<StateChange>>,
}

impl CircuitBreaker {
    /// Create a breaker without an observer.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            name: config.name,
            max_failures: config.max_failures.max(1),
            reset_timeout: config.reset_timeout,
            inner: RwLock::new(Inner {
                state: CircuitState::Closed,
                failures: 0,
                last_failure: None,
                trial_in_flight: false,
            }),
            notify_tx: None,
        }
    }

    /// Create a breaker whose transitions are delivered to `observer`.
    ///
    /// Spawns the observer task, so this must be called inside a Tokio runtime.
    pub fn with_observer(config: CircuitBreakerConfig, observer: Arc<dyn StateObserver>) -> Self {
        let (tx, mut rx) = mpsc::channel::<StateChange>(NOTIFY_QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(change) = rx.recv().await {
                if let Err(e) = observer.on_state_change(&change) {
                    tracing::warn!(
                        breaker = %change.name,
                        from = %change.from,
                        to = %change.to,
                        error = %e,
                        "State observer failed"
                    );
                }
            }
        });

        Self {
            notify_tx: Some(tx),
            ..Self::new(config)
        }
    }

    /// Run `op` if the breaker allows it, recording every error as a failure.
    pub async fn execute<T, E, F, Fut>(&self, op: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_classified(op, |_| Outcome::Failure).await
    }

    /// Run `op` if the breaker allows it; `classify` decides how errors count.
    pub async fn execute_classified<T, E, F, Fut, C>(&self, op: F, classify: C) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: FnOnce(&E) -> Outcome,
    {
        let Some(mut guard) = self.admit() else {
            return Err(CircuitBreakerError::Open);
        };

        let result = op().await;
        let outcome = match &result {
            Ok(_) => Outcome::Success,
            Err(e) => classify(e),
        };
        guard.finish(outcome);

        result.map_err(CircuitBreakerError::Inner)
    }

    /// Decide whether a call may run; claims the trial slot when half-opening.
    fn admit(&self) -> Option<CallGuard<'_>> {
        let mut inner = self.write();
        let state = inner.state;
        match state {
            CircuitState::Closed => Some(CallGuard { breaker: self, trial: false, finished: false }),
            CircuitState::Open => {
                if !self.reset_elapsed(&inner) {
                    return None;
                }
                self.transition(&mut inner, CircuitState::HalfOpen);
                inner.trial_in_flight = true;
                Some(CallGuard { breaker: self, trial: true, finished: false })
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    return None;
                }
                inner.trial_in_flight = true;
                Some(CallGuard { breaker: self, trial: true, finished: false })
            }
        }
    }

    fn record(&self, outcome: Outcome, trial: bool) {
        let mut inner = self.write();
        if trial {
            inner.trial_in_flight = false;
        }

        match outcome {
            Outcome::Success => {
                inner.failures = 0;
                if trial && inner.state == CircuitState::HalfOpen {
                    self.transition(&mut inner, CircuitState::Closed);
                }
            }
            Outcome::Failure => {
                inner.failures = inner.failures.saturating_add(1);
                inner.last_failure = Some(Instant::now());
                let tripped = inner.failures >= self.max_failures;
                let state = inner.state;
                match state {
                    CircuitState::Closed if tripped => {
                        self.transition(&mut inner, CircuitState::Open);
                    }
                    CircuitState::HalfOpen if trial => self.transition(&mut inner, CircuitState::Open),
                    _ => {}
                }
            }
            Outcome::Ignored => {
                // An abandoned trial leaves the reset timer elapsed, so the
                // next caller gets to try again.
                if trial && inner.state == CircuitState::HalfOpen {
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;

        tracing::debug!(breaker = %self.name, %from, %to, "Circuit breaker transition");

        if let Some(tx) = &self.notify_tx {
            let change = StateChange { name: self.name.clone(), from, to };
            if let Err(e) = tx.try_send(change) {
                tracing::warn!(breaker = %self.name, error = %e, "Dropped circuit breaker notification");
            }
        }
    }

    fn reset_elapsed(&self, inner: &Inner) -> bool {
        inner
            .last_failure
            .map_or(true, |at| at.elapsed() >= self.reset_timeout)
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// True if a call made now would be rejected without running.
    pub fn rejects_calls(&self) -> bool {
        let inner = self.read();
        match inner.state {
            CircuitState::Closed => false,
            CircuitState::Open => !self.reset_elapsed(&inner),
            CircuitState::HalfOpen => inner.trial_in_flight,
        }
    }

    /// Force Closed, zero the counter and forget the last failure.
    pub fn reset(&self) {
        let mut inner = self.write();
        inner.failures = 0;
        inner.last_failure = None;
        inner.trial_in_flight = false;
        self.transition(&mut inner, CircuitState::Closed);
    }

    pub fn state(&self) -> CircuitState {
        self.read().state
    }

    pub fn failures(&self) -> u32 {
        self.read().failures
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    pub fn is_half_open(&self) -> bool {
        self.state() == CircuitState::HalfOpen
    }

    pub fn is_closed(&self) -> bool {
        self.state() == CircuitState::Closed
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &inner.state)
            .field("failures", &inner.failures)
            .field("max_failures", &self.max_failures)
            .field("reset_timeout", &self.reset_timeout)
            .finish()
    }
}

/// Records the call's outcome; a dropped (cancelled) call counts as ignored.
struct CallGuard<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    finished: bool,
}

impl CallGuard<'_> {
    fn finish(&mut self, outcome: Outcome) {
        self.finished = true;
        self.breaker.record(outcome, self.trial);
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.breaker.record(Outcome::Ignored, self.trial);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn breaker(max_failures: u32, reset_timeout: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            name: "test".to_string(),
            max_failures,
            reset_timeout,
        })
    }

    async fn fail(cb: &CircuitBreaker) -> Result<(), CircuitBreakerError<&'static str>> {
        cb.execute(|| async { Err::<(), _>("boom") }).await
    }

    async fn succeed(cb: &CircuitBreaker) -> Result<(), CircuitBreakerError<&'static str>> {
        cb.execute(|| async { Ok::<_, &'static str>(()) }).await
    }

    #[tokio::test]
    async fn test_new_breaker_is_closed() {
        let cb = breaker(3, Duration::from_secs(1));
        assert!(cb.is_closed());
        assert_eq!(cb.failures(), 0);
        assert_eq!(cb.name(), "test");
    }

    #[tokio::test]
    async fn test_success_keeps_closed() {
        let cb = breaker(3, Duration::from_secs(1));
        let value = cb.execute(|| async { Ok::<_, &'static str>(42) }).await.unwrap();
        assert_eq!(value, 42);
        assert!(cb.is_closed());
    }

    #[tokio::test]
    async fn test_opens_after_threshold_and_rejects_without_invoking() {
        for n in 1..=5u32 {
            let cb = breaker(n, Duration::from_secs(60));
            for _ in 0..n {
                assert!(matches!(fail(&cb).await, Err(CircuitBreakerError::Inner("boom"))));
            }
            assert!(cb.is_open(), "should open after {n} failures");

            let calls = AtomicU32::new(0);
            let res = cb
                .execute(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, &'static str>(())
                })
                .await;
            assert!(matches!(res, Err(CircuitBreakerError::Open)));
            assert_eq!(calls.load(Ordering::SeqCst), 0);
            assert_eq!(cb.failures(), n, "rejection must not mutate state");
        }
    }

    #[tokio::test]
    async fn test_success_resets_failure_counter() {
        let cb = breaker(3, Duration::from_secs(60));
        fail(&cb).await.unwrap_err();
        fail(&cb).await.unwrap_err();
        assert_eq!(cb.failures(), 2);
        succeed(&cb).await.unwrap();
        assert_eq!(cb.failures(), 0);
        assert!(cb.is_closed());
    }

    #[tokio::test]
    async fn test_recovers_after_reset_timeout() {
        let cb = breaker(3, Duration::from_millis(50));
        for _ in 0..3 {
            fail(&cb).await.unwrap_err();
        }
        assert!(cb.is_open());
        assert!(cb.rejects_calls());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!cb.rejects_calls());

        succeed(&cb).await.unwrap();
        assert!(cb.is_closed());
        assert_eq!(cb.failures(), 0);
    }

    #[tokio::test]
    async fn test_trial_failure_reopens() {
        let cb = breaker(2, Duration::from_millis(30));
        fail(&cb).await.unwrap_err();
        fail(&cb).await.unwrap_err();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(matches!(fail(&cb).await, Err(CircuitBreakerError::Inner(_))));
        assert!(cb.is_open());
        assert!(matches!(succeed(&cb).await, Err(CircuitBreakerError::Open)));
    }

    #[tokio::test]
    async fn test_half_open_admits_single_trial() {
        let cb = Arc::new(breaker(1, Duration::from_millis(20)));
        fail(&cb).await.unwrap_err();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let trial = {
            let cb = cb.clone();
            tokio::spawn(async move {
                cb.execute(|| async move {
                    let _ = release_rx.await;
                    Ok::<_, &'static str>(())
                })
                .await
            })
        };

        // Wait until the trial holds the half-open slot.
        while !cb.is_half_open() {
            tokio::task::yield_now().await;
        }
        assert!(matches!(succeed(&cb).await, Err(CircuitBreakerError::Open)));

        release_tx.send(()).unwrap();
        trial.await.unwrap().unwrap();
        assert!(cb.is_closed());
    }

    #[tokio::test]
    async fn test_abandoned_trial_returns_to_open() {
        let cb = breaker(1, Duration::from_millis(20));
        fail(&cb).await.unwrap_err();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let pending = cb.execute(|| std::future::pending::<Result<(), &'static str>>());
        let _ = tokio::time::timeout(Duration::from_millis(10), pending).await;

        assert!(cb.is_open());
        // Reset timer is still elapsed, so the next call is the new trial.
        succeed(&cb).await.unwrap();
        assert!(cb.is_closed());
    }

    #[tokio::test]
    async fn test_ignored_outcome_does_not_count() {
        let cb = breaker(1, Duration::from_secs(60));
        let res = cb
            .execute_classified(|| async { Err::<(), _>("cancelled") }, |_| Outcome::Ignored)
            .await;
        assert!(res.is_err());
        assert!(cb.is_closed());
        assert_eq!(cb.failures(), 0);
    }

    #[tokio::test]
    async fn test_reset_forces_closed() {
        let cb = breaker(1, Duration::from_secs(60));
        fail(&cb).await.unwrap_err();
        assert!(cb.is_open());

        cb.reset();
        assert!(cb.is_closed());
        assert_eq!(cb.failures(), 0);
        succeed(&cb).await.unwrap();
    }

    struct Recorder {
        changes: Mutex<Vec<(CircuitState, CircuitState)>>,
    }

    impl StateObserver for Recorder {
        fn on_state_change(&self, change: &StateChange) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.changes.lock().unwrap().push((change.from, change.to));
            Ok(())
        }
    }

    struct Failing;

    impl StateObserver for Failing {
        fn on_state_change(&self, _change: &StateChange) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("observer down".into())
        }
    }

    #[tokio::test]
    async fn test_observer_receives_transitions() {
        let recorder = Arc::new(Recorder { changes: Mutex::new(Vec::new()) });
        let cb = CircuitBreaker::with_observer(
            CircuitBreakerConfig {
                name: "observed".to_string(),
                max_failures: 1,
                reset_timeout: Duration::from_millis(20),
            },
            recorder.clone(),
        );

        fail(&cb).await.unwrap_err();
        tokio::time::sleep(Duration::from_millis(30)).await;
        succeed(&cb).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let changes = recorder.changes.lock().unwrap().clone();
        assert_eq!(
            changes,
            vec![
                (CircuitState::Closed, CircuitState::Open),
                (CircuitState::Open, CircuitState::HalfOpen),
                (CircuitState::HalfOpen, CircuitState::Closed),
            ]
        );
    }

    #[tokio::test]
    async fn test_observer_errors_are_swallowed() {
        let cb = CircuitBreaker::with_observer(
            CircuitBreakerConfig {
                name: "failing".to_string(),
                max_failures: 1,
                reset_timeout: Duration::from_secs(60),
            },
            Arc::new(Failing),
        );

        assert!(matches!(fail(&cb).await, Err(CircuitBreakerError::Inner("boom"))));
        assert!(cb.is_open());
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        let cb = Arc::new(breaker(1000, Duration::from_secs(60)));
        let mut handles = Vec::new();
        for i in 0..50 {
            let cb = cb.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    let _ = fail(&cb).await;
                } else {
                    let _ = cb.state();
                    let _ = cb.failures();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(cb.failures(), 25);
        assert!(cb.is_closed());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CircuitState::Closed.to_string(), "CLOSED");
        assert_eq!(CircuitState::HalfOpen.to_string(), "HALF_OPEN");
        assert_eq!(CircuitState::Open.to_string(), "OPEN");
    }
}
