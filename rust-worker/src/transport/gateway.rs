//! HTTP client for an external messaging session gateway.
//!
//! The gateway owns the authenticated session and exposes:
//! - `POST {base}/messages` (multipart): `to`, `kind`, `text` or `caption`,
//!   and for media `mimetype`, `fileName` and a `file` part
//! - `GET {base}/health`: 2xx while the session is connected

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Body, Client, RequestBuilder,
};

use super::{Transport, TransportError};
use crate::message::OutgoingMessage;
use crate::recipient::NormalizedAddress;

/// Longest response body kept in a rejection error.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct GatewayTransport {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GatewayTransport {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, token))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            token,
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn build_form(to: &NormalizedAddress, message: &OutgoingMessage) -> Result<Form, TransportError> {
        let form = Form::new()
            .text("to", to.to_string())
            .text("kind", message.kind());

        let form = match message {
            OutgoingMessage::Text { text } => form.text("text", text.clone()),
            OutgoingMessage::Image(media)
            | OutgoingMessage::Video(media)
            | OutgoingMessage::Document(media) => {
                let part = Part::stream_with_length(Body::from(media.bytes.clone()), media.bytes.len() as u64)
                    .file_name(media.file_name.clone())
                    .mime_str(&media.mime_type)?;

                form.text("caption", media.caption.clone())
                    .text("mimetype", media.mime_type.clone())
                    .text("fileName", media.file_name.clone())
                    .part("file", part)
            }
        };

        Ok(form)
    }
}

#[async_trait]
impl Transport for GatewayTransport {
    async fn send(&self, to: &NormalizedAddress, message: &OutgoingMessage) -> Result<(), TransportError> {
        let form = Self::build_form(to, message)?;
        let request = self
            .client
            .post(format!("{}/messages", self.base_url))
            .multipart(form);

        let response = self.authorize(request).send().await?;
        let status = response.status();

        if status.is_success() {
            tracing::debug!(to = %to, status_code = status.as_u16(), "gateway_send_accepted");
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        body.truncate(MAX_ERROR_BODY);
        Err(TransportError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    async fn health_check(&self) -> Result<(), TransportError> {
        let request = self.client.get(format!("{}/health", self.base_url));
        let response = self.authorize(request).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Unavailable(format!(
                "gateway health returned {}",
                status.as_u16()
            )))
        }
    }

    fn name(&self) -> &'static str {
        "gateway"
    }
}
