//! Service-specific tests
//!
//! Each service has its own test file with dedicated fixtures and helpers.


// Common test utilities for services
pub mod common {
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio::time::timeout;

    /// Upper bound for any single wait in the service tests
    pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Helper to run async operations with timeout
    pub async fn with_timeout<T, F>(future: F) -> Result<T, tokio::time::error::Elapsed>
    where
        F: std::future::Future<Output = T>,
    {
        timeout(TEST_TIMEOUT, future).await
    }

    /// Wait for the next value on `rx`, failing the test on timeout or close
    pub async fn next<T>(rx: &mut mpsc::Receiver<T>) -> T {
        with_timeout(rx.recv())
            .await
            .expect("Timed out waiting for notification")
            .expect("Notification channel closed")
    }
}
