use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{redirect, Body, Client, Method, Response, StatusCode, Url};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::hdfs::{FileStatus, FileStore};
use crate::settings::HdfsConfig;

/// HDFS access over the WebHDFS REST API.
pub struct WebHdfsClient {
    client: Client,
    base_url: Url,
    user: String,
}

#[derive(Debug, Deserialize)]
struct FileStatusResponse {
    #[serde(rename = "FileStatus")]
    file_status: FileStatus,
}

#[derive(Debug, Deserialize)]
struct BooleanResponse {
    boolean: bool,
}

#[derive(Debug, Deserialize)]
struct RemoteExceptionResponse {
    #[serde(rename = "RemoteException")]
    remote_exception: RemoteException,
}

#[derive(Debug, Deserialize)]
struct RemoteException {
    exception: String,
    message: String,
}

impl WebHdfsClient {
    pub fn new(config: &HdfsConfig) -> Result<Self> {
        let base_url = Url::parse(&config.namenode_url)
            .with_context(|| format!("Invalid namenode URL {}", config.namenode_url))?;

        // CREATE answers with a datanode redirect that must be followed by hand
        // so the file body is only sent once.
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build WebHDFS HTTP client")?;

        Ok(Self {
            client,
            base_url,
            user: config.user.clone(),
        })
    }

    fn op_url(&self, path: &str, op: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            // The filesystem root is addressed as `/webhdfs/v1/`.
            segments.push("");
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Namenode URL {} cannot be a base", self.base_url))?
            .pop_if_empty()
            .extend(["webhdfs", "v1"])
            .extend(segments);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("op", op).append_pair("user.name", &self.user);
            for (k, v) in params {
                query.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url) -> Result<Response> {
        debug!(%method, %url, "WebHDFS request");
        self.client
            .request(method, url)
            .send()
            .await
            .context("Failed to send request to WebHDFS")
    }
}

/// Turns a non-success response into an error carrying the server's
/// `RemoteException` message when one is present.
async fn remote_error(response: Response) -> anyhow::Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<RemoteExceptionResponse>(&body) {
        Ok(err) => anyhow!(
            "WebHDFS error ({}): {}: {}",
            status,
            err.remote_exception.exception,
            err.remote_exception.message
        ),
        Err(_) => anyhow!("WebHDFS error ({}): {}", status, body),
    }
}

#[async_trait]
impl FileStore for WebHdfsClient {
    async fn status(&self, path: &str) -> Result<Option<FileStatus>> {
        let url = self.op_url(path, "GETFILESTATUS", &[])?;
        let response = self.send(Method::GET, url).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let body: FileStatusResponse = response
                    .json()
                    .await
                    .context("Failed to decode GETFILESTATUS response")?;
                Ok(Some(body.file_status))
            }
            _ => Err(remote_error(response).await),
        }
    }

    async fn mkdirs(&self, path: &str, permission: Option<&str>) -> Result<()> {
        let params: Vec<(&str, &str)> = permission.map(|p| ("permission", p)).into_iter().collect();
        let url = self.op_url(path, "MKDIRS", &params)?;
        let response = self.send(Method::PUT, url).await?;

        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }
        let body: BooleanResponse = response
            .json()
            .await
            .context("Failed to decode MKDIRS response")?;
        if !body.boolean {
            bail!("WebHDFS refused to create directory {}", path);
        }
        Ok(())
    }

    async fn upload(&self, local: &Path, remote: &str, overwrite: bool) -> Result<()> {
        let file = File::open(local)
            .await
            .with_context(|| format!("Local file {} does not exist or is unreadable", local.display()))?;
        let length = file
            .metadata()
            .await
            .with_context(|| format!("Failed to stat {}", local.display()))?
            .len();

        let overwrite = if overwrite { "true" } else { "false" };
        let url = self.op_url(remote, "CREATE", &[("overwrite", overwrite)])?;
        let response = self.send(Method::PUT, url).await?;

        if response.status() != StatusCode::TEMPORARY_REDIRECT {
            return Err(remote_error(response).await);
        }
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| anyhow!("WebHDFS CREATE redirect has no Location header"))?;
        let location = Url::parse(location)
            .with_context(|| format!("Invalid datanode location {}", location))?;

        debug!(%location, bytes = length, "Streaming file to datanode");
        let response = self
            .client
            .put(location)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, length)
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .context("Failed to send file to datanode")?;

        if response.status() != StatusCode::CREATED {
            return Err(remote_error(response).await);
        }
        Ok(())
    }
}
