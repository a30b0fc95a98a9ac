use async_trait::async_trait;
use linode_common::{
    Account, Instance, InstanceTransfer, LinodeError, NodeBalancer, Page, Result, Ticket,
};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;

use crate::api::LinodeApi;

pub const DEFAULT_API_URL: &str = "https://api.linode.com/v4/";

const PAGE_SIZE: u32 = 500;

/// Linode v4 REST client authenticated with a personal access token.
pub struct HttpLinodeClient {
    base_url: Url,
    client: reqwest::Client,
    debug: bool,
}

impl HttpLinodeClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        let mut base_url = Url::parse(api_url).map_err(|err| {
            LinodeError::InvalidArgument(format!("invalid linode api url {api_url}: {err}"))
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut authorization = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            LinodeError::InvalidArgument(
                "linode api token contains characters not allowed in a header".to_string(),
            )
        })?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("linode-exporter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| {
                LinodeError::InvalidArgument(format!("failed to build http client: {err}"))
            })?;

        Ok(Self {
            base_url,
            client,
            debug: false,
        })
    }

    /// Log every request and response status at debug level.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.base_url.join(path).map_err(|err| {
            LinodeError::InvalidArgument(format!("invalid linode api path {path}: {err}"))
        })?;
        if self.debug {
            debug!(%url, ?query, "linode api request");
        }

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|err| transport_error(path, &err))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| transport_error(path, &err))?;

        if self.debug {
            debug!(path, status = status.as_u16(), bytes = body.len(), "linode api response");
        }

        if !status.is_success() {
            return Err(LinodeError::Api {
                path: path.to_string(),
                status: status.as_u16(),
                message: error_message(&body)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string()),
            });
        }

        serde_json::from_slice(&body).map_err(|err| LinodeError::Decode {
            path: path.to_string(),
            message: err.to_string(),
        })
    }

    async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1_u32;

        loop {
            let current: Page<T> = self
                .get_json(
                    path,
                    &[("page", page.to_string()), ("page_size", PAGE_SIZE.to_string())],
                )
                .await?;
            items.extend(current.data);

            page += 1;
            if page > current.pages {
                break;
            }
        }

        Ok(items)
    }
}

#[async_trait]
impl LinodeApi for HttpLinodeClient {
    async fn list_instances(&self) -> Result<Vec<Instance>> {
        self.get_all("linode/instances").await
    }

    async fn get_instance_transfer(&self, instance_id: u64) -> Result<InstanceTransfer> {
        self.get_json(&format!("linode/instances/{instance_id}/transfer"), &[])
            .await
    }

    async fn get_account(&self) -> Result<Account> {
        self.get_json("account", &[]).await
    }

    async fn list_nodebalancers(&self) -> Result<Vec<NodeBalancer>> {
        self.get_all("nodebalancers").await
    }

    async fn list_tickets(&self) -> Result<Vec<Ticket>> {
        self.get_all("support/tickets").await
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorReason>,
}

#[derive(Deserialize)]
struct ErrorReason {
    reason: String,
}

fn error_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    let reasons = parsed
        .errors
        .into_iter()
        .map(|error| error.reason)
        .collect::<Vec<_>>();

    if reasons.is_empty() {
        None
    } else {
        Some(reasons.join("; "))
    }
}

fn transport_error(path: &str, err: &reqwest::Error) -> LinodeError {
    LinodeError::Transport {
        path: path.to_string(),
        message: err.to_string(),
    }
}
