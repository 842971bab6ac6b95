use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::document::Document;
use crate::error::{Result, SubmitError};
use crate::http::pool::{create_http_client, HttpSettings};

/// Header carrying the caller-provided document signature.
pub const SIGNATURE_HEADER: &str = "Signature";

/// Delivers one document to the remote registry.
///
/// Called concurrently by every admitted caller, so implementations must be
/// safe to share across tasks.
#[async_trait]
pub trait DocumentSubmitter: Send + Sync {
    async fn send(&self, document: &Document, signature: &str) -> std::result::Result<(), SubmitError>;
}

#[async_trait]
impl<T: DocumentSubmitter + ?Sized> DocumentSubmitter for Arc<T> {
    async fn send(&self, document: &Document, signature: &str) -> std::result::Result<(), SubmitError> {
        (**self).send(document, signature).await
    }
}

#[derive(Debug, Clone)]
pub struct HttpDocumentSubmitter {
    client: Client,
    endpoint: Url,
}

impl HttpDocumentSubmitter {
    pub fn new(endpoint: Url, settings: &HttpSettings) -> Result<Self> {
        let client = create_http_client(settings)?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl DocumentSubmitter for HttpDocumentSubmitter {
    async fn send(&self, document: &Document, signature: &str) -> std::result::Result<(), SubmitError> {
        let response = self.client.post(self.endpoint.clone())
            .header(SIGNATURE_HEADER, signature)
            .json(document)
            .send()
            .await?;

        // The registry answers 200 on acceptance; anything else is a rejection.
        let status = response.status();
        if status != StatusCode::OK {
            let body = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to read rejection body for document {}: {}", document.doc_id, e);
                    format!("<unreadable body: {}>", e)
                }
            };
            return Err(SubmitError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Document {} accepted by {}", document.doc_id, self.endpoint);
        Ok(())
    }
}
