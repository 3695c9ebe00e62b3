use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::models::{Project, RewrittenTicket, Ticket, UpdateOutcome, UpdateTicketsRequest};

/// The four calls the screen makes against the rewrite backend.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn list_projects(&self) -> ApiResult<Vec<Project>>;
    async fn list_issues(&self, project_key: &str) -> ApiResult<Vec<Ticket>>;
    async fn rewrite_tickets(&self, tickets: &[Ticket]) -> ApiResult<Vec<RewrittenTicket>>;
    async fn update_tickets(&self, tickets: &[RewrittenTicket]) -> ApiResult<UpdateOutcome>;
}

pub struct HttpBackend {
    http: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> ApiResult<Self> {
        let base_url =
            Url::parse(base_url.trim()).map_err(|err| ApiError::InvalidUrl(format!("{base_url}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read response>".to_string());
            return Err(ApiError::Status { status, body });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|err| ApiError::Malformed(err.to_string()))
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn list_projects(&self) -> ApiResult<Vec<Project>> {
        let url = self.endpoint(&["projects"])?;
        debug!(%url, "listing projects");
        let projects: Vec<Project> = Self::decode(self.http.get(url).send().await?).await?;
        ensure_unique_keys(projects.iter().map(|p| p.key.as_str()), "project")?;
        Ok(projects)
    }

    async fn list_issues(&self, project_key: &str) -> ApiResult<Vec<Ticket>> {
        let url = self.endpoint(&["projects", project_key, "issues"])?;
        debug!(%url, "listing issues");
        let tickets: Vec<Ticket> = Self::decode(self.http.get(url).send().await?).await?;
        ensure_unique_keys(tickets.iter().map(|t| t.key.as_str()), "ticket")?;
        Ok(tickets)
    }

    async fn rewrite_tickets(&self, tickets: &[Ticket]) -> ApiResult<Vec<RewrittenTicket>> {
        let url = self.endpoint(&["rewrite-tickets"])?;
        debug!(%url, count = tickets.len(), "requesting rewrite");
        let rewritten: Vec<RewrittenTicket> =
            Self::decode(self.http.post(url).json(tickets).send().await?).await?;
        ensure_unique_keys(rewritten.iter().map(|t| t.key.as_str()), "rewritten ticket")?;

        let requested: HashSet<&str> = tickets.iter().map(|t| t.key.as_str()).collect();
        for draft in &rewritten {
            if !requested.contains(draft.key.as_str()) {
                warn!(key = %draft.key, "backend rewrote a ticket that was not requested");
            }
        }
        Ok(rewritten)
    }

    async fn update_tickets(&self, tickets: &[RewrittenTicket]) -> ApiResult<UpdateOutcome> {
        let url = self.endpoint(&["update-tickets"])?;
        debug!(%url, count = tickets.len(), "pushing updates");
        let body = UpdateTicketsRequest { tickets };
        Self::decode(self.http.put(url).json(&body).send().await?).await
    }
}

fn ensure_unique_keys<'a>(keys: impl Iterator<Item = &'a str>, kind: &str) -> ApiResult<()> {
    let mut seen = HashSet::new();
    for key in keys {
        if key.trim().is_empty() {
            return Err(ApiError::Malformed(format!("{kind} with an empty key")));
        }
        if !seen.insert(key) {
            return Err(ApiError::Malformed(format!("duplicate {kind} key {key}")));
        }
    }
    Ok(())
}
