//! YouTube Data API v3 resumable upload.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{Body, Client};
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, instrument, warn};

use super::{TransportError, UploadMetadata, UploadOutcome, UploadRequest, UploadTransport};

const UPLOAD_URL: &str = "https://www.googleapis.com/upload/youtube/v3/videos";

/// Uploads videos with the two-step resumable protocol: create a session,
/// then stream the whole file to the session URI.
#[derive(Debug, Clone)]
pub struct YouTubeTransport {
    client: Client,
    upload_url: String,
}

impl YouTubeTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            upload_url: UPLOAD_URL.to_string(),
        }
    }

    /// Point uploads at another endpoint (tests, proxies).
    pub fn with_upload_url(mut self, url: impl Into<String>) -> Self {
        self.upload_url = url.into();
        self
    }

    /// `videos.insert` resource body.
    fn resource(metadata: &UploadMetadata) -> serde_json::Value {
        json!({
            "snippet": {
                "title": metadata.title,
                "description": metadata.description,
                "tags": metadata.tags,
            },
            "status": {
                "privacyStatus": metadata.privacy_status,
            },
        })
    }

    /// Start a resumable session and return its URI.
    async fn create_session(&self, request: &UploadRequest, size: u64) -> Result<String, TransportError> {
        let response = self
            .client
            .post(&self.upload_url)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .header(AUTHORIZATION, request.token.bearer())
            .header("X-Upload-Content-Length", size)
            .header("X-Upload-Content-Type", "video/*")
            .json(&Self::resource(&request.metadata))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::from_response(status, &body));
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(TransportError::MissingSessionUri)
    }

    /// Stream the file body, counting bytes into the request's progress counter.
    async fn send_file(
        &self,
        session_uri: &str,
        request: &UploadRequest,
        file: tokio::fs::File,
        size: u64,
    ) -> Result<(), TransportError> {
        let progress = request.progress.clone();
        let stream = ReaderStream::new(file).inspect_ok(move |chunk| progress.add(chunk.len() as u64));

        let response = self
            .client
            .put(session_uri)
            .header(AUTHORIZATION, request.token.bearer())
            .header(CONTENT_LENGTH, size)
            .header(CONTENT_TYPE, "video/*")
            .body(Body::wrap_stream(stream))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(TransportError::from_response(status, &body));
        }

        if let Ok(video) = serde_json::from_str::<serde_json::Value>(&body) {
            if let Some(id) = video.get("id").and_then(|v| v.as_str()) {
                debug!(video_id = %id, "Video resource created");
            }
        }
        Ok(())
    }

    async fn try_upload(&self, request: &UploadRequest) -> Result<(), TransportError> {
        let file = tokio::fs::File::open(request.job.path()).await?;
        let size = file.metadata().await?.len();

        let session_uri = self.create_session(request, size).await?;
        debug!(attempt = %request.attempt, "Resumable session created");

        self.send_file(&session_uri, request, file, size).await
    }
}

#[async_trait]
impl UploadTransport for YouTubeTransport {
    #[instrument(skip_all, fields(attempt = %request.attempt, path = %request.job))]
    async fn upload(&self, request: &UploadRequest) -> UploadOutcome {
        match self.try_upload(request).await {
            Ok(()) => {
                info!(title = %request.metadata.title, "Upload finished");
                UploadOutcome::Succeeded
            }
            Err(e) => {
                warn!(error = %e, quota = e.is_quota_exhausted(), "Upload failed");
                e.into_outcome()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{post, put};
    use chrono::{Duration, Utc};
    use parking_lot::Mutex;

    use super::*;
    use crate::credentials::AccessToken;
    use crate::domain::{AttemptId, ProgressCounter, VideoJob};
    use crate::upload::PRIVACY_STATUS;

    #[derive(Default)]
    struct Recorded {
        resource: Option<serde_json::Value>,
        body_len: usize,
        auth: Option<String>,
    }

    async fn serve(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn request(path: &std::path::Path) -> UploadRequest {
        UploadRequest {
            attempt: AttemptId(1),
            job: VideoJob::new(path),
            token: AccessToken::new("ya29.test", Utc::now() + Duration::hours(1)),
            metadata: UploadMetadata {
                title: "clip".to_string(),
                description: "desc".to_string(),
                tags: vec!["clip".to_string()],
                privacy_status: PRIVACY_STATUS,
            },
            progress: ProgressCounter::new(),
        }
    }

    #[test]
    fn test_resource_shape() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(&dir.path().join("clip.mp4"));
        let resource = YouTubeTransport::resource(&request.metadata);
        assert_eq!(resource["snippet"]["title"], "clip");
        assert_eq!(resource["status"]["privacyStatus"], "private");
        assert_eq!(resource["snippet"]["tags"][0], "clip");
    }

    #[tokio::test]
    async fn test_successful_upload_counts_bytes() {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let addr_cell = Arc::new(Mutex::new(None::<SocketAddr>));

        let session_state = (recorded.clone(), addr_cell.clone());
        let put_state = recorded.clone();
        let router = Router::new()
            .route(
                "/upload",
                post(move |headers: HeaderMap, body: Bytes| {
                    let (recorded, addr_cell) = session_state.clone();
                    async move {
                        let mut rec = recorded.lock();
                        rec.resource = serde_json::from_slice(&body).ok();
                        rec.auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        let addr = (*addr_cell.lock()).expect("addr set");
                        (
                            StatusCode::OK,
                            [("location", format!("http://{}/session/1", addr))],
                        )
                            .into_response()
                    }
                }),
            )
            .route(
                "/session/1",
                put(move |body: Bytes| {
                    let recorded = put_state.clone();
                    async move {
                        recorded.lock().body_len = body.len();
                        (StatusCode::OK, r#"{"id":"abc123"}"#).into_response()
                    }
                }),
            );
        let addr = serve(router).await;
        *addr_cell.lock() = Some(addr);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, vec![7u8; 200_000]).unwrap();

        let transport = YouTubeTransport::new(crate::utils::http_client::build_client().unwrap())
            .with_upload_url(format!("http://{}/upload", addr));
        let request = request(&path);
        let outcome = transport.upload(&request).await;

        assert_eq!(outcome, UploadOutcome::Succeeded);
        assert_eq!(request.progress.get(), 200_000);
        let rec = recorded.lock();
        assert_eq!(rec.body_len, 200_000);
        assert_eq!(rec.auth.as_deref(), Some("Bearer ya29.test"));
        assert_eq!(
            rec.resource.as_ref().unwrap()["status"]["privacyStatus"],
            "private"
        );
    }

    #[tokio::test]
    async fn test_quota_failure_on_session_creation() {
        let router = Router::new().route(
            "/upload",
            post(|| async {
                (
                    StatusCode::FORBIDDEN,
                    r#"{"error":{"code":403,"message":"quota","errors":[{"reason":"quotaExceeded"}]}}"#,
                )
            }),
        );
        let addr = serve(router).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"data").unwrap();

        let transport = YouTubeTransport::new(crate::utils::http_client::build_client().unwrap())
            .with_upload_url(format!("http://{}/upload", addr));
        assert_eq!(
            transport.upload(&request(&path)).await,
            UploadOutcome::FailedQuota
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_other_failure() {
        let dir = tempfile::tempdir().unwrap();
        let transport = YouTubeTransport::new(crate::utils::http_client::build_client().unwrap())
            .with_upload_url("http://127.0.0.1:9/upload");
        let outcome = transport.upload(&request(&dir.path().join("missing.mp4"))).await;
        assert!(matches!(outcome, UploadOutcome::FailedOther(_)));
    }
}
