//! RestEntityFetcher - EntityFetcher over the agency REST API.
//!
//! Routes, relative to the configured base URL:
//!
//! | Operation     | Request                                   |
//! |---------------|-------------------------------------------|
//! | `fetch_one`   | `GET    /{plural}/{id}`                   |
//! | `fetch_list`  | `GET    /{plural}?agencyId=..&<filters>`  |
//! | `fetch_stats` | `GET    /{plural}/stats?agencyId=..`      |
//! | `create`      | `POST   /{plural}`                        |
//! | `update`      | `PUT    /{plural}/{id}`                   |
//! | `delete`      | `DELETE /{plural}/{id}`                   |
//!
//! Responses may be the bare JSON value or wrapped as `{"data": ...}`.
//! Every request carries `Authorization: Bearer <token>` when the auth
//! provider has one.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::domain::entity::{EntityRecord, QueryFilters, StatsSnapshot};
use crate::domain::foundation::{EntityId, OwnerScope};
use crate::ports::{AuthTokenProvider, EntityFetcher, FetchError};

/// Query parameter carrying the owner scope.
const OWNER_PARAM: &str = "agencyId";

#[derive(Deserialize)]
#[serde(untagged)]
enum Body<V> {
    Wrapped { data: V },
    Bare(V),
}

impl<V> Body<V> {
    fn into_inner(self) -> V {
        match self {
            Body::Wrapped { data } => data,
            Body::Bare(value) => value,
        }
    }
}

pub struct RestEntityFetcher<T> {
    client: Client,
    base_url: Url,
    auth: Arc<dyn AuthTokenProvider>,
    _record: PhantomData<fn() -> T>,
}

impl<T: EntityRecord> RestEntityFetcher<T> {
    pub fn new(
        base_url: Url,
        timeout: Duration,
        auth: Arc<dyn AuthTokenProvider>,
    ) -> Result<Self, FetchError> {
        if base_url.cannot_be_a_base() {
            return Err(FetchError::Network(format!("invalid base URL {}", base_url)));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            auth,
            _record: PhantomData,
        })
    }

    /// `{base}/{plural}/{segments...}`
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(T::KIND.plural());
            path.extend(segments);
        }
        url
    }

    fn entity_url(&self, id: &EntityId) -> Url {
        self.endpoint(&[&id.to_string()])
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, FetchError> {
        let token = self.auth.auth_token().await.map_err(|e| {
            tracing::warn!(error = %e, "Auth token lookup failed");
            FetchError::Unauthorized
        })?;
        Ok(match token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, FetchError> {
        let response = self
            .authorized(request)
            .await?
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Network(format!("Request timed out: {}", e))
                } else if e.is_connect() {
                    FetchError::Network(format!("Connection failed: {}", e))
                } else {
                    FetchError::Network(e.to_string())
                }
            })?;
        check_status(response).await
    }

    async fn decode<V: DeserializeOwned>(response: Response) -> Result<V, FetchError> {
        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        serde_json::from_str::<Body<V>>(&text)
            .map(Body::into_inner)
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

async fn check_status(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::NOT_FOUND => Err(FetchError::NotFound),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(FetchError::Unauthorized),
        _ => Err(FetchError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        }),
    }
}

/// Pulls `message`/`error` out of a JSON error body, else returns the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl<T: EntityRecord> EntityFetcher<T> for RestEntityFetcher<T> {
    async fn fetch_one(&self, id: &EntityId) -> Result<Option<T>, FetchError> {
        let request = self.client.get(self.entity_url(id));
        match self.send(request).await {
            Ok(response) => Self::decode(response).await.map(Some),
            Err(FetchError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn fetch_list(&self, owner: &OwnerScope, filters: &QueryFilters) -> Result<Vec<T>, FetchError> {
        let mut url = self.endpoint(&[]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(OWNER_PARAM, owner.as_str());
            for (key, value) in filters.iter() {
                query.append_pair(key, value);
            }
        }
        let entities: Vec<T> = Self::decode(self.send(self.client.get(url)).await?).await?;
        tracing::debug!(kind = %T::KIND, owner = %owner, count = entities.len(), "Fetched list");
        Ok(entities)
    }

    async fn fetch_stats(&self, owner: &OwnerScope) -> Result<StatsSnapshot, FetchError> {
        let mut url = self.endpoint(&["stats"]);
        url.query_pairs_mut().append_pair(OWNER_PARAM, owner.as_str());
        let value: serde_json::Value = Self::decode(self.send(self.client.get(url)).await?).await?;
        StatsSnapshot::from_value(value)
            .ok_or_else(|| FetchError::Decode("stats response is not an object".to_string()))
    }

    async fn create(&self, entity: &T) -> Result<T, FetchError> {
        let request = self.client.post(self.endpoint(&[])).json(entity);
        Self::decode(self.send(request).await?).await
    }

    async fn update(&self, entity: &T) -> Result<T, FetchError> {
        let request = self.client.put(self.entity_url(&entity.entity_id())).json(entity);
        Self::decode(self.send(request).await?).await
    }

    async fn delete(&self, id: &EntityId) -> Result<(), FetchError> {
        self.send(self.client.delete(self.entity_url(id))).await?;
        Ok(())
    }
}
