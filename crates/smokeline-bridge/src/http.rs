//! HTTP durable ingest client

use async_trait::async_trait;
use reqwest::{Client, Method, Response, Url};
use serde::de::DeserializeOwned;
use smokeline_core::{
    CloudConfig, CookingSession, DurableIngest, IngestError, ProbeNames, TempRecord,
};
use tracing::debug;

/// [`DurableIngest`] over the backend's JSON API.
#[derive(Debug, Clone)]
pub struct HttpIngestClient {
    client: Client,
    base: Url,
}

impl HttpIngestClient {
    /// Client for `config.api_url`. Paths resolve relative to it.
    pub fn new(config: &CloudConfig) -> Result<Self, IngestError> {
        let mut raw = config.api_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw).map_err(|e| IngestError::Transport {
            reason: format!("invalid API URL {raw:?}: {e}"),
        })?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| IngestError::Transport {
                reason: e.to_string(),
            })?;
        Ok(Self { client, base })
    }

    /// Absolute URL for an API path.
    pub fn endpoint(&self, path: &str) -> Result<Url, IngestError> {
        self.base.join(path).map_err(|e| IngestError::Transport {
            reason: format!("invalid endpoint {path:?}: {e}"),
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&[TempRecord]>,
    ) -> Result<Response, IngestError> {
        let url = self.endpoint(path)?;
        let mut request = self.client.request(method.clone(), url);
        if let Some(records) = body {
            request = request.json(records);
        }

        let response = request.send().await.map_err(|e| IngestError::Transport {
            reason: format!("{method} {path}: {e}"),
        })?;
        let status = response.status();
        debug!(%method, path, status = status.as_u16(), "Durable API call");
        if !status.is_success() {
            return Err(IngestError::Status {
                status: status.as_u16(),
                endpoint: path.to_string(),
            });
        }
        Ok(response)
    }

    async fn json<T>(&self, method: Method, path: &str) -> Result<T, IngestError>
    where
        T: DeserializeOwned,
    {
        self.send(method, path, None)
            .await?
            .json()
            .await
            .map_err(|e| IngestError::Decode {
                reason: format!("{path}: {e}"),
            })
    }
}

#[async_trait]
impl DurableIngest for HttpIngestClient {
    async fn post_batch(&self, records: &[TempRecord]) -> Result<(), IngestError> {
        self.send(Method::POST, "temps/batch", Some(records)).await?;
        Ok(())
    }

    async fn current_history(&self) -> Result<Vec<TempRecord>, IngestError> {
        self.json(Method::GET, "temps").await
    }

    async fn history_by_id(&self, id: &str) -> Result<Vec<TempRecord>, IngestError> {
        self.json(Method::GET, &format!("temps/{id}")).await
    }

    async fn toggle_smoking(&self) -> Result<CookingSession, IngestError> {
        self.json(Method::PUT, "state/toggleSmoking").await
    }

    async fn session(&self) -> Result<CookingSession, IngestError> {
        self.json(Method::GET, "state").await
    }

    async fn current_probe_names(&self) -> Result<ProbeNames, IngestError> {
        self.json(Method::GET, "smokeProfile/current").await
    }
}
