//! Arithmetic plug-in for exercising the manager without a remote service.
//!
//! The manager is generic over the request type, so a trivial add-two-ints
//! "service" can stand in for the feature store in tests: each issued
//! request records its sum, making submission order observable.

use std::time::Duration;

use async_trait::async_trait;
use featurebench_core::BenchResult;
use parking_lot::Mutex;

use crate::caller::Caller;

/// One addition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerPair {
    pub lhs: i64,
    pub rhs: i64,
}

impl IntegerPair {
    #[must_use]
    pub fn new(lhs: i64, rhs: i64) -> Self {
        Self { lhs, rhs }
    }
}

/// Caller that computes sums and records them in issue order.
#[derive(Default)]
pub struct CalculatorCaller {
    delay: Option<Duration>,
    sums: Mutex<Vec<i64>>,
}

impl CalculatorCaller {
    /// A caller that answers instantly.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A caller that simulates `delay` of service latency per request.
    #[must_use]
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            sums: Mutex::new(Vec::new()),
        }
    }

    /// Every computed sum so far, in completion order.
    #[must_use]
    pub fn sums(&self) -> Vec<i64> {
        self.sums.lock().clone()
    }
}

#[async_trait]
impl Caller<IntegerPair> for CalculatorCaller {
    async fn issue(&self, request: &IntegerPair) -> BenchResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sums.lock().push(request.lhs + request.rhs);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_sums_in_issue_order() {
        let caller = CalculatorCaller::new();
        caller.issue(&IntegerPair::new(1, 2)).await.unwrap();
        caller.issue(&IntegerPair::new(40, 2)).await.unwrap();
        assert_eq!(caller.sums(), vec![3, 42]);
    }
}
