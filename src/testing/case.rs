//! Test case abstraction and shared run state

use std::time::Instant;

use async_trait::async_trait;

use super::result::TestResult;
use super::store::RecordStore;
use crate::api::ApiClient;
use crate::common::config::RunConfig;
use crate::common::Result;

/// State shared by every case of one run
pub struct TestContext {
    pub client: ApiClient,
    pub config: RunConfig,
    pub store: RecordStore,
}

impl TestContext {
    pub fn new(config: RunConfig) -> Result<Self> {
        Ok(Self {
            client: ApiClient::new(&config)?,
            config,
            store: RecordStore::new(),
        })
    }
}

/// A single end-to-end check against the service
#[async_trait]
pub trait TestCase: Send {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Run the check. Service failures are reported through the result,
    /// never as an error.
    async fn execute(&mut self, ctx: &mut TestContext) -> TestResult;
}

/// Wall clock started when a case begins
pub(crate) struct Stopwatch(Instant);

impl Stopwatch {
    pub(crate) fn start() -> Self {
        Self(Instant::now())
    }

    pub(crate) fn elapsed(&self) -> std::time::Duration {
        self.0.elapsed()
    }
}
