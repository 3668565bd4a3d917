use std::collections::{BTreeMap, BTreeSet};

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{BaselineError, Result};
use crate::grouping::GroupKey;

use super::retry::{is_retryable_status, retry_with_backoff, AttemptError, RetryPolicy};
use super::source::ReferenceEpochSource;
use super::ReferenceEpochs;

/// Reference-epoch service reached over HTTP.
///
/// Sends `{"group_keys": [fcqfid, ...]}` as a POST body and expects
/// `{"epochs": {"<fcqfid>": end_mjd, ...}}` back.
#[derive(Debug)]
pub struct HttpReferenceEpochs {
    client: Client,
    endpoint: String,
    policy: RetryPolicy,
}

#[derive(Serialize)]
struct EpochRequest {
    group_keys: Vec<u64>,
}

#[derive(Deserialize)]
struct EpochResponse {
    #[serde(default)]
    epochs: BTreeMap<String, f64>,
}

impl HttpReferenceEpochs {
    pub fn new(endpoint: impl Into<String>, policy: RetryPolicy) -> Result<Self> {
        let client = Client::builder().timeout(policy.deadline).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            policy,
        })
    }

    fn post_once(
        &self,
        body: &EpochRequest,
        remaining: std::time::Duration,
    ) -> std::result::Result<EpochResponse, AttemptError> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(remaining)
            .json(body)
            .send()
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    AttemptError::Retryable(e.to_string())
                } else {
                    AttemptError::Fatal(e.into())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            response
                .json::<EpochResponse>()
                .map_err(|e| AttemptError::Fatal(e.into()))
        } else if is_retryable_status(status.as_u16()) {
            Err(AttemptError::Retryable(format!("HTTP {status}")))
        } else {
            Err(AttemptError::Fatal(BaselineError::ReferenceService(format!(
                "HTTP {status} from {}",
                self.endpoint
            ))))
        }
    }
}

impl ReferenceEpochSource for HttpReferenceEpochs {
    fn name(&self) -> &str {
        &self.endpoint
    }

    fn end_epochs(&self, keys: &BTreeSet<GroupKey>) -> Result<ReferenceEpochs> {
        if keys.is_empty() {
            return Ok(ReferenceEpochs::new());
        }
        let body = EpochRequest {
            group_keys: keys.iter().map(GroupKey::fcqfid).collect(),
        };
        debug!(
            endpoint = %self.endpoint,
            keys = body.group_keys.len(),
            "Requesting reference epochs"
        );

        let response = retry_with_backoff(&self.policy, |remaining| {
            self.post_once(&body, remaining)
        })?;

        let mut epochs = ReferenceEpochs::new();
        for (raw_key, mjd) in response.epochs {
            match raw_key.parse::<u64>().map_err(|e| e.to_string()).and_then(|k| {
                GroupKey::from_fcqfid(k).map_err(|e| e.to_string())
            }) {
                Ok(key) if keys.contains(&key) => {
                    epochs.insert(key, mjd);
                }
                Ok(key) => debug!(group = %key, "Ignoring unrequested reference epoch"),
                Err(e) => warn!(key = %raw_key, error = %e, "Ignoring malformed group key"),
            }
        }
        Ok(epochs)
    }
}
