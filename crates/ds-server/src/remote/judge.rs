use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ds_core::selector::{Judge, Verdict};
use ds_core::BoxError;
use serde::Serialize;
use super::WorkerClient;

#[derive(Debug, Serialize)]
struct JudgeRequest {
    reference: String,
    candidates: [String; 2],
}

/// Pairwise quality judge reachable over HTTP.
pub struct RemoteJudge {
    client: WorkerClient,
}

impl RemoteJudge {
    pub fn new(client: WorkerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Judge for RemoteJudge {
    async fn judge(
        &self,
        reference: &[u8],
        first: &[u8],
        second: &[u8],
    ) -> Result<Verdict, BoxError> {
        let request = JudgeRequest {
            reference: STANDARD.encode(reference),
            candidates: [STANDARD.encode(first), STANDARD.encode(second)],
        };
        Ok(self.client.post_json("/judge", &request).await?)
    }
}
