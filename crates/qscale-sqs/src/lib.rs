//! qscale-sqs — approximate backlog of an SQS queue.
//!
//! Reads the `ApproximateNumberOfMessages` queue attribute. Credentials
//! and region come from the AWS SDK default provider chain unless the
//! configuration names a region or endpoint explicitly.

use std::collections::HashMap;

use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::QueueAttributeName;
use thiserror::Error;
use tracing::{debug, info};

use qscale_core::{BoxFuture, MetricFetchError, QueueConfig, QueueDepthSource};

const DEPTH_ATTRIBUTE: &str = "ApproximateNumberOfMessages";

/// The SQS client could not be set up at startup.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("no AWS region configured (set --aws-region or AWS_REGION)")]
    MissingRegion,

    #[error("no AWS credentials provider configured")]
    MissingCredentials,

    #[error("failed to load AWS credentials: {0}")]
    Credentials(String),
}

/// [`QueueDepthSource`] for one SQS queue.
#[derive(Debug, Clone)]
pub struct SqsQueueSource {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsQueueSource {
    /// Build an SQS client from the SDK defaults plus any region/endpoint
    /// overrides in `config`.
    ///
    /// Credentials are resolved once here so a missing or broken chain
    /// fails startup instead of every tick.
    pub async fn connect(config: &QueueConfig) -> Result<Self, ConnectError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        let region = require_region(&sdk_config)?;

        sdk_config
            .credentials_provider()
            .ok_or(ConnectError::MissingCredentials)?
            .provide_credentials()
            .await
            .map_err(|e| ConnectError::Credentials(DisplayErrorContext(&e).to_string()))?;

        info!(queue = %config.url, %region, "SQS client initialized");

        Ok(Self::new(aws_sdk_sqs::Client::new(&sdk_config), config.url.clone()))
    }

    pub fn new(client: aws_sdk_sqs::Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }
}

fn require_region(sdk_config: &SdkConfig) -> Result<Region, ConnectError> {
    sdk_config.region().cloned().ok_or(ConnectError::MissingRegion)
}

impl QueueDepthSource for SqsQueueSource {
    fn approximate_depth(&self) -> BoxFuture<'_, Result<u64, MetricFetchError>> {
        Box::pin(async move {
            let output = self
                .client
                .get_queue_attributes()
                .queue_url(&self.queue_url)
                .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
                .send()
                .await
                .map_err(|e| MetricFetchError::Request {
                    queue: self.queue_url.clone(),
                    message: DisplayErrorContext(&e).to_string(),
                })?;

            let depth = parse_depth(&self.queue_url, output.attributes())?;
            debug!(queue = %self.queue_url, depth, "sampled queue depth");
            Ok(depth)
        })
    }
}

/// Pull the message count out of a `GetQueueAttributes` response.
fn parse_depth(
    queue: &str,
    attributes: Option<&HashMap<QueueAttributeName, String>>,
) -> Result<u64, MetricFetchError> {
    let value = attributes
        .and_then(|attrs| attrs.get(&QueueAttributeName::ApproximateNumberOfMessages))
        .ok_or_else(|| MetricFetchError::MissingAttribute {
            queue: queue.to_string(),
            attribute: DEPTH_ATTRIBUTE,
        })?;

    value
        .trim()
        .parse::<u64>()
        .map_err(|_| MetricFetchError::InvalidValue {
            queue: queue.to_string(),
            attribute: DEPTH_ATTRIBUTE,
            value: value.clone(),
        })
}
