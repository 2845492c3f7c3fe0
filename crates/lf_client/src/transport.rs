use std::time::Duration;

use lf_protocol::{CommandKind, IndexResponse, PollResponse};
use thiserror::Error;

use crate::index_sync::IndexTransport;
use crate::poller::CommandTransport;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {status}")]
    Status { status: u16 },
}

/// Talks to the Lightfield server over HTTP.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, TransportError> {
        let response = self.client.get(self.url(path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

impl CommandTransport for HttpTransport {
    async fn query(&self, since: i64) -> Result<PollResponse, TransportError> {
        Ok(self.get(&format!("command/{since}")).await?.json().await?)
    }

    async fn clear(&self, kind: CommandKind, uuid: &str) -> Result<(), TransportError> {
        self.get(&format!("command/{kind}/{uuid}/clear")).await?;
        Ok(())
    }
}

impl IndexTransport for HttpTransport {
    async fn index(&self, since: i64) -> Result<IndexResponse, TransportError> {
        Ok(self.get(&format!("drawingindex/{since}")).await?.json().await?)
    }

    async fn image(&self, uuid: &str) -> Result<Vec<u8>, TransportError> {
        let bytes = self
            .get(&format!("img/drawings/approved/{uuid}.png"))
            .await?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}
