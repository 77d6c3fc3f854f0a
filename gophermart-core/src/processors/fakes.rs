//! Scripted collaborators for pipeline tests.

use crate::accrual::{AccrualError, AccrualLookup, LookupOutcome};
use crate::events::AccrualResolved;
use async_trait::async_trait;
use gophermart_sdk::objects::AccrualStatus;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Answers lookups from a per-order script. An exhausted script answers
/// `NotRegistered`.
#[derive(Default)]
pub struct ScriptedLookup {
    script: Mutex<HashMap<String, VecDeque<Result<LookupOutcome, AccrualError>>>>,
    calls: Mutex<Vec<(String, Instant)>>,
    latency: Duration,
}

impl ScriptedLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every lookup takes `latency` before it answers.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn push(&self, number: &str, outcome: LookupOutcome) {
        self.push_result(number, Ok(outcome));
    }

    pub fn push_result(&self, number: &str, result: Result<LookupOutcome, AccrualError>) {
        self.script
            .lock()
            .unwrap()
            .entry(number.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn resolved(number: &str, status: AccrualStatus, accrual: i64) -> LookupOutcome {
        LookupOutcome::Resolved(AccrualResolved {
            number: number.to_string(),
            status,
            accrual: Decimal::from(accrual),
        })
    }

    /// Instants at which `number` was looked up.
    pub fn calls_for(&self, number: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| n == number)
            .map(|(_, at)| *at)
            .collect()
    }
}

#[async_trait]
impl AccrualLookup for ScriptedLookup {
    async fn lookup(&self, number: &str) -> Result<LookupOutcome, AccrualError> {
        self.calls
            .lock()
            .unwrap()
            .push((number.to_string(), Instant::now()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self
            .script
            .lock()
            .unwrap()
            .get_mut(number)
            .and_then(VecDeque::pop_front);
        next.unwrap_or(Ok(LookupOutcome::NotRegistered))
    }
}
