use crate::config::AppConfig;
use crate::documents::DocumentTreeService;
use crate::error::{AppError, AppResult};
use crate::media::{image_files, validate_upload, MediaStore, MediaUpload};
use crate::models::{
    validate_display_name, Document, DocumentPatch, MediaImage, NewDocument, ProfileUpdate,
    UploadedMedia, UserSummary,
};
use crate::storage::{clear_session, load_token, save_token};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
struct MediaListResponse {
    #[serde(default)]
    images: Vec<MediaImage>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct ProfileUpdateResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<UserSummary>,
}

/// HTTP client for the document backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
    pub(crate) base_url: String,
    pub(crate) token: Option<String>,
    max_upload_bytes: u64,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            max_upload_bytes: AppConfig::default().max_upload_bytes,
        }
    }

    /// Client for the configured backend, with any persisted session token.
    pub fn from_config(config: &AppConfig) -> Self {
        let base_url = if config.api_url.is_empty() {
            // reqwest needs absolute URLs; an unset base means the page's own origin.
            web_sys::window()
                .and_then(|w| w.location().origin().ok())
                .unwrap_or_default()
        } else {
            config.api_url.clone()
        };
        let mut client = Self::new(base_url);
        client.token = load_token();
        client.max_upload_bytes = config.max_upload_bytes;
        client
    }

    pub fn set_token(&mut self, token: String) {
        save_token(&token);
        self.token = Some(token);
    }

    pub fn logout(&mut self) {
        self.token = None;
        clear_session();
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn document_path(id: &str) -> String {
        format!("/api/documents/{}", urlencoding::encode(id))
    }

    fn with_auth_headers(&self, mut req: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        req
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = reqwest::Client::new().request(method, self.url(path));
        self.with_auth_headers(req)
    }

    /// Send and map non-success statuses onto [`AppError`].
    async fn send(&self, req: RequestBuilder, path: &str, context: &str) -> AppResult<Response> {
        let res = req
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        let status = res.status().as_u16();
        if res.status().is_success() {
            return Ok(res);
        }

        let body = res.text().await.unwrap_or_default();
        let err = error_for_status(status, body, path, context);
        warn!(%path, status, error = %err, "request failed");
        Err(err)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        path: &str,
        context: &str,
    ) -> AppResult<T> {
        self.send(req, path, context)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Parse(e.to_string()))
    }

    pub async fn update_profile(&self, name: &str) -> AppResult<ProfileUpdateResponse> {
        let name = validate_display_name(name)?;
        let path = "/api/user/update";
        let req = self
            .request(Method::PUT, path)
            .json(&ProfileUpdate { name });
        self.send_json(req, path, "Update profile").await
    }
}

pub(crate) fn error_for_status(status: u16, body: String, path: &str, context: &str) -> AppError {
    match status {
        401 => AppError::Unauthorized,
        404 => AppError::NotFound(path.to_string()),
        400 => AppError::Validation(server_message(&body).unwrap_or(body)),
        _ => AppError::Http {
            status,
            body,
            context: context.to_string(),
        },
    }
}

/// `{"error": ..}` or `{"message": ..}` bodies carry a user-facing message.
fn server_message(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    v.get("error")
        .or_else(|| v.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

/// Content from the wire is checked before it reaches the editor.
pub(crate) fn validated(document: Document) -> AppResult<Document> {
    if let Some(content) = &document.content {
        content.validate()?;
    }
    Ok(document)
}

#[async_trait(?Send)]
impl DocumentTreeService for ApiClient {
    async fn list(&self) -> AppResult<Vec<Document>> {
        // An empty `parentId` selects every level; omitting it selects roots only.
        let path = "/api/documents?parentId=";
        self.send_json(self.request(Method::GET, path), path, "Load documents")
            .await
    }

    async fn list_children(&self, parent_id: Option<&str>) -> AppResult<Vec<Document>> {
        let path = match parent_id {
            Some(id) => format!("/api/documents?parentId={}", urlencoding::encode(id)),
            None => "/api/documents".to_string(),
        };
        self.send_json(self.request(Method::GET, &path), &path, "Load documents")
            .await
    }

    async fn create(&self, new: NewDocument) -> AppResult<Document> {
        let path = "/api/documents";
        let req = self.request(Method::POST, path).json(&new);
        let doc = self.send_json(req, path, "Create document").await?;
        validated(doc)
    }

    async fn get(&self, id: &str) -> AppResult<Document> {
        let path = Self::document_path(id);
        let doc: Document = self
            .send_json(self.request(Method::GET, &path), &path, "Load document")
            .await?;
        if doc.is_archived {
            return Err(AppError::NotFound(path));
        }
        validated(doc)
    }

    async fn update(&self, id: &str, patch: DocumentPatch) -> AppResult<Document> {
        let path = Self::document_path(id);
        let req = self.request(Method::PATCH, &path).json(&patch);
        let doc = self.send_json(req, &path, "Update document").await?;
        validated(doc)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let path = Self::document_path(id);
        self.send(self.request(Method::DELETE, &path), &path, "Delete document")
            .await?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl MediaStore for ApiClient {
    async fn list_media(&self) -> AppResult<Vec<MediaImage>> {
        let path = "/api/media";
        let res: MediaListResponse = self
            .send_json(self.request(Method::GET, path), path, "Load media")
            .await?;
        Ok(image_files(res.images))
    }

    async fn upload(&self, upload: MediaUpload) -> AppResult<UploadedMedia> {
        validate_upload(&upload, self.max_upload_bytes)?;

        let part = reqwest::multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)
            .map_err(|e| AppError::validation(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let path = "/api/upload";
        let req = self.request(Method::POST, path).multipart(form);
        self.send_json(req, path, "Upload image").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentNode;
    use futures::executor::block_on;
    use serde_json::json;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            error_for_status(401, String::new(), "/api/documents", "Load documents"),
            AppError::Unauthorized
        );
        assert_eq!(
            error_for_status(404, String::new(), "/api/documents/x", "Load document"),
            AppError::NotFound("/api/documents/x".into())
        );
        assert_eq!(
            error_for_status(500, "boom".into(), "/api/documents/x", "Update document"),
            AppError::Http {
                status: 500,
                body: "boom".into(),
                context: "Update document".into(),
            }
        );
    }

    #[test]
    fn test_bad_request_surfaces_server_message() {
        let body = json!({"error": "File too large. Maximum size is 10MB."}).to_string();
        assert_eq!(
            error_for_status(400, body, "/api/upload", "Upload image"),
            AppError::Validation("File too large. Maximum size is 10MB.".into())
        );
        assert_eq!(
            error_for_status(400, "plain".into(), "/api/user/update", "Update profile"),
            AppError::Validation("plain".into())
        );
    }

    #[test]
    fn test_urls_and_ids_are_encoded() {
        let client = ApiClient::new("http://api.test/");
        assert_eq!(client.url("/api/media"), "http://api.test/api/media");
        assert_eq!(ApiClient::document_path("a b/c"), "/api/documents/a%20b%2Fc");
    }

    #[test]
    fn test_malformed_content_is_rejected_on_load() {
        let mut doc: Document =
            serde_json::from_value(json!({"id": "d1", "title": "T"})).expect("parse");
        assert!(validated(doc.clone()).is_ok());

        doc.content = Some(ContentNode::paragraph(vec![]));
        assert!(matches!(validated(doc), Err(AppError::Content(_))));
    }

    #[test]
    fn test_invalid_upload_fails_before_any_request() {
        // Unroutable base: reaching the network would surface as `Network`.
        let client = ApiClient::new("http://127.0.0.1:9");
        let upload = MediaUpload {
            file_name: "doc.pdf".into(),
            content_type: "application/pdf".into(),
            bytes: vec![1, 2, 3],
        };
        assert!(matches!(
            block_on(client.upload(upload)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_blank_profile_name_fails_before_any_request() {
        let client = ApiClient::new("http://127.0.0.1:9");
        assert!(matches!(
            block_on(client.update_profile("   ")),
            Err(AppError::Validation(_))
        ));
    }
}
