//! Object storage over `/storage/v1`.

use async_trait::async_trait;
use reqwest::Method;
use tracing::instrument;

use super::RestGateway;
use crate::gateway::{GatewayError, ObjectStorage};

#[async_trait]
impl ObjectStorage for RestGateway {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), GatewayError> {
        let request = self
            .request(Method::POST, &format!("storage/v1/object/{bucket}/{path}"))
            .await
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes);
        self.execute_empty(request).await
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.endpoint(&format!("storage/v1/object/public/{bucket}/{path}"))
    }
}
