// Backend module: the `StorageBackend` seam used by the session and a
// small blocking HTTP client that implements it against the Drive v3
// REST API. The client holds a reqwest blocking client, the API base
// URLs and the bearer token obtained when the session was opened.

use crate::config::Config;
use crate::error::BackendError;
use crate::model::{Media, NewObject, RemoteObject};
use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::io::{Cursor, Read};
use uuid::Uuid;

const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, size)";
const OBJECT_FIELDS: &str = "id, name, mimeType, size";
const PAGE_SIZE: &str = "1000";

/// Operations the core needs from an object-storage backend.
pub trait StorageBackend {
    /// All objects whose parent is `folder_id`.
    fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteObject>, BackendError>;

    /// Create an object from `metadata` and stream `media` as its content.
    fn create_object(&self, metadata: &NewObject, media: Media)
        -> Result<RemoteObject, BackendError>;

    /// Open the content stream of an object.
    fn get_media(&self, object_id: &str) -> Result<Box<dyn Read + Send>, BackendError>;

    fn delete_object(&self, object_id: &str) -> Result<(), BackendError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    files: Vec<RemoteObject>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Drive v3 client bound to one access token.
#[derive(Clone)]
pub struct DriveBackend {
    client: Client,
    api_base: String,
    upload_base: String,
    token: String,
}

/// Build the HTTP client used for the token exchange and all requests.
pub fn build_client(config: &Config) -> Result<Client, BackendError> {
    Ok(Client::builder().timeout(config.timeout).build()?)
}

impl DriveBackend {
    pub fn new(client: Client, config: &Config, token: impl Into<String>) -> Self {
        DriveBackend {
            client,
            api_base: config.api_base.clone(),
            upload_base: config.upload_base.clone(),
            token: token.into(),
        }
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.token)
    }

    fn object_url(&self, object_id: &str) -> String {
        format!("{}/files/{}", self.api_base, object_id)
    }
}

/// Turn a non-success response into `BackendError::Status`, using the
/// backend's error message when it sent one.
fn check(res: Response) -> Result<Response, BackendError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().unwrap_or_default();
    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.is_empty() => status.canonical_reason().unwrap_or("").to_string(),
        Err(_) => body,
    };
    Err(BackendError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Quote a value for use inside a Drive query string literal.
pub fn quote_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

pub fn parent_filter(folder_id: &str) -> String {
    format!("'{}' in parents", quote_query_value(folder_id))
}

/// Body of a `multipart/related` upload: JSON metadata part followed by
/// the media part. Returns the reader and its exact length.
fn multipart_related(
    boundary: &str,
    metadata: &[u8],
    media: Media,
) -> (impl Read + Send + 'static, u64) {
    let mut head = Vec::with_capacity(metadata.len() + 160);
    head.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n")
            .as_bytes(),
    );
    head.extend_from_slice(metadata);
    head.extend_from_slice(
        format!(
            "\r\n--{boundary}\r\nContent-Type: {}\r\n\r\n",
            media.mime_type
        )
        .as_bytes(),
    );
    let tail = format!("\r\n--{boundary}--\r\n").into_bytes();
    let len = head.len() as u64 + media.len + tail.len() as u64;
    let reader = Cursor::new(head)
        .chain(media.reader)
        .chain(Cursor::new(tail));
    (reader, len)
}

impl StorageBackend for DriveBackend {
    fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteObject>, BackendError> {
        let query = parent_filter(folder_id);
        let url = format!("{}/files", self.api_base);
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self.client.get(&url).query(&[
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", PAGE_SIZE),
            ]);
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token.as_str())]);
            }
            let page: FileList = check(self.authorized(req).send()?)?.json()?;
            objects.extend(page.files);
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }
        Ok(objects)
    }

    fn create_object(
        &self,
        metadata: &NewObject,
        media: Media,
    ) -> Result<RemoteObject, BackendError> {
        let boundary = format!("drivefolder-{}", Uuid::new_v4().simple());
        let metadata_json = serde_json::to_vec(metadata)?;
        let (reader, len) = multipart_related(&boundary, &metadata_json, media);

        let url = format!("{}/files", self.upload_base);
        let req = self
            .client
            .post(&url)
            .query(&[("uploadType", "multipart"), ("fields", OBJECT_FIELDS)])
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(Body::sized(reader, len));
        let created: RemoteObject = check(self.authorized(req).send()?)?.json()?;
        Ok(created)
    }

    fn get_media(&self, object_id: &str) -> Result<Box<dyn Read + Send>, BackendError> {
        let req = self
            .client
            .get(self.object_url(object_id))
            .query(&[("alt", "media")]);
        let res = check(self.authorized(req).send()?)?;
        Ok(Box::new(res))
    }

    fn delete_object(&self, object_id: &str) -> Result<(), BackendError> {
        let req = self.client.delete(self.object_url(object_id));
        check(self.authorized(req).send()?)?;
        Ok(())
    }
}
