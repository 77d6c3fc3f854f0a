use super::{AccrualError, AccrualLookup, LookupOutcome};
use crate::events::AccrualResolved;
use crate::utils::money;
use async_trait::async_trait;
use gophermart_sdk::objects::{AccrualResponse, AccrualStatus};
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use rust_decimal::Decimal;
use std::time::Duration;
use url::Url;

/// Talks to `GET {base}/api/orders/{number}`.
#[derive(Debug, Clone)]
pub struct HttpAccrualClient {
    base: Url,
    http_client: reqwest::Client,
}

impl HttpAccrualClient {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, AccrualError> {
        if base.cannot_be_a_base() {
            return Err(AccrualError::InvalidBaseUrl);
        }
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Ok(Self { base, http_client })
    }

    fn order_url(&self, number: &str) -> Result<Url, AccrualError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| AccrualError::InvalidBaseUrl)?
            .pop_if_empty()
            .extend(["api", "orders", number]);
        Ok(url)
    }
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Check the body against the order asked for and normalize the amount.
fn resolve(expected: &str, body: &[u8]) -> Result<AccrualResolved, AccrualError> {
    let response: AccrualResponse =
        serde_json::from_slice(body).map_err(|e| AccrualError::Malformed(e.to_string()))?;
    if response.order != expected {
        return Err(AccrualError::OrderMismatch {
            expected: expected.to_string(),
            got: response.order,
        });
    }
    let accrual = match response.status {
        AccrualStatus::Processed => money::normalize(response.accrual.unwrap_or_default()),
        _ => Decimal::ZERO,
    };
    if accrual < Decimal::ZERO {
        return Err(AccrualError::Malformed(format!("negative accrual {accrual}")));
    }
    if accrual > money::MAX_AMOUNT {
        return Err(AccrualError::Malformed(format!("accrual {accrual} out of range")));
    }
    Ok(AccrualResolved {
        number: response.order,
        status: response.status,
        accrual,
    })
}

#[async_trait]
impl AccrualLookup for HttpAccrualClient {
    async fn lookup(&self, number: &str) -> Result<LookupOutcome, AccrualError> {
        let url = self.order_url(number)?;
        let response = self.http_client.get(url).send().await?;
        match response.status() {
            StatusCode::OK => {
                let body = response.bytes().await?;
                resolve(number, &body).map(LookupOutcome::Resolved)
            }
            StatusCode::NO_CONTENT => Ok(LookupOutcome::NotRegistered),
            StatusCode::TOO_MANY_REQUESTS => Ok(LookupOutcome::RateLimited {
                retry_after: retry_after(response.headers()),
            }),
            other => Err(AccrualError::UnexpectedStatus(other.as_u16())),
        }
    }
}
