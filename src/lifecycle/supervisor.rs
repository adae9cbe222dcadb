//! Supervised background tasks.
//!
//! # Responsibilities
//! - Run a named background unit
//! - Log a returned error with the unit's name
//!
//! # Design Decisions
//! - Failure is signalled through `Result`, not by unwinding
//! - A failed unit is not restarted; the rest of the process keeps running

use std::fmt::Display;
use std::future::Future;

use tokio::task::JoinHandle;

/// Spawn `fut`, logging its error if it returns one.
///
/// The handle resolves to `true` if the unit finished cleanly.
pub fn spawn_supervised<F, E>(name: &'static str, fut: F) -> JoinHandle<bool>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        tracing::debug!(task = name, "Background task started");
        match fut.await {
            Ok(()) => {
                tracing::debug!(task = name, "Background task finished");
                true
            }
            Err(e) => {
                tracing::error!(task = name, error = %e, "Background task failed");
                false
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clean_exit() {
        let handle = spawn_supervised("ok", async { Ok::<(), String>(()) });
        assert!(handle.await.unwrap());
    }

    #[tokio::test]
    async fn test_error_is_contained() {
        let handle = spawn_supervised("failing", async { Err::<(), _>("disk on fire".to_string()) });
        assert!(!handle.await.unwrap());
    }
}
