//! HTTP handlers for file operations.
//!
//! Method checks happen in the router before any of these run; mutating
//! handlers are additionally wrapped by the auth gate. Bodies are streamed in
//! both directions rather than buffered.

use crate::{
    errors::AppError,
    models::{
        auth::TransferRequest,
        object::{FileEntry, ObjectMeta},
    },
    routes::key::ObjectKey,
    services::object_store::{ByteStream, StorageError, StoredObject, ensure_key_valid},
    state::AppState,
};
use axum::{
    Json,
    body::{Body, Bytes},
    extract::{
        Query, State,
        rejection::{BytesRejection, QueryRejection},
    },
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use serde_json::json;
use std::io;

/// Characters left as-is in download filenames (same set as JavaScript's
/// `encodeURIComponent`).
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub path: Option<String>,
}

/// GET `/api/files?path=` — list objects, optionally filtered by key prefix.
pub async fn list_files(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(q) = query?;
    let prefix = q.path.as_deref().filter(|p| !p.is_empty());
    let files: Vec<FileEntry> = state
        .store
        .list(prefix)
        .await?
        .into_iter()
        .map(FileEntry::from)
        .collect();

    Ok(Json(json!({ "files": files })))
}

/// GET `/api/details/{*key}` — metadata only.
pub async fn file_details(
    State(state): State<AppState>,
    ObjectKey(key): ObjectKey,
) -> Result<impl IntoResponse, AppError> {
    let meta = state
        .store
        .head(&key)
        .await?
        .ok_or_else(|| AppError::not_found("File not found"))?;

    Ok(Json(json!({ "object": meta })))
}

/// GET `/api/files/{*key}` — stream the object inline.
pub async fn serve_file(
    State(state): State<AppState>,
    ObjectKey(key): ObjectKey,
) -> Result<Response, AppError> {
    let object = fetch_object(&state, &key).await?;
    Ok(object_response(object, false))
}

/// GET `/api/download/{*key}` — stream the object as an attachment.
pub async fn download_file(
    State(state): State<AppState>,
    ObjectKey(key): ObjectKey,
) -> Result<Response, AppError> {
    let object = fetch_object(&state, &key).await?;
    Ok(object_response(object, true))
}

/// POST `/api/files/{*key}` — store the raw request body under `key`.
pub async fn upload_file(
    State(state): State<AppState>,
    ObjectKey(key): ObjectKey,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, AppError> {
    ensure_key_valid(&key)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.to_string())
        .ok_or_else(|| AppError::bad_request("Missing content-type header"))?;

    let stream = body
        .into_data_stream()
        .map(|chunk| chunk.map_err(io::Error::other))
        .boxed();
    let stream = match non_empty(stream).await {
        Ok(Some(stream)) => stream,
        Ok(None) => return Err(AppError::bad_request("Empty file content")),
        Err(err) => {
            tracing::warn!("failed reading upload body for `{}`: {}", key, err);
            return Err(AppError::bad_request("Failed to read request body"));
        }
    };

    let meta = match state.store.put(&key, Some(content_type), stream).await {
        Ok(meta) => meta,
        Err(err @ StorageError::InvalidKey(_)) => return Err(err.into()),
        Err(err) => {
            tracing::error!("upload of `{}` failed: {}", key, err);
            return Err(AppError::internal("Failed to upload file"));
        }
    };

    tracing::info!("uploaded `{}` ({} bytes)", meta.key, meta.size);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "File uploaded successfully",
            "key": meta.key,
            "etag": meta.etag,
        })),
    )
        .into_response())
}

/// DELETE `/api/files/{*key}`
pub async fn delete_file(
    State(state): State<AppState>,
    ObjectKey(key): ObjectKey,
) -> Result<impl IntoResponse, AppError> {
    ensure_key_valid(&key)?;
    if state.store.head(&key).await?.is_none() {
        return Err(AppError::not_found("File not found"));
    }

    match state.store.delete(&key).await {
        Ok(()) => {}
        // removed by someone else between the two calls
        Err(StorageError::NotFound(_)) => return Err(AppError::not_found("File not found")),
        Err(err) => return Err(err.into()),
    }

    tracing::info!("deleted `{}`", key);
    Ok(Json(json!({
        "message": "File deleted successfully",
        "key": key,
    })))
}

/// POST `/api/move/{*key}` with `{"destination": "..."}`.
pub async fn move_file(
    State(state): State<AppState>,
    ObjectKey(key): ObjectKey,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, AppError> {
    transfer(&state, key, &body?, Transfer::Move).await
}

/// POST `/api/copy/{*key}` with `{"destination": "..."}`.
pub async fn copy_file(
    State(state): State<AppState>,
    ObjectKey(key): ObjectKey,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, AppError> {
    transfer(&state, key, &body?, Transfer::Copy).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    Move,
    Copy,
}

/// Copy `source` to the requested destination, then (for moves) delete the
/// source.
///
/// The two store calls are not atomic. The source is only deleted after the
/// destination write succeeded; if that delete fails the destination stays in
/// place and the caller gets a 500.
async fn transfer(
    state: &AppState,
    source: String,
    body: &[u8],
    mode: Transfer,
) -> Result<Json<serde_json::Value>, AppError> {
    let request: TransferRequest = if body.is_empty() {
        TransferRequest::default()
    } else {
        serde_json::from_slice(body).map_err(|_| AppError::bad_request("Invalid JSON body"))?
    };
    let destination = request
        .destination
        .map(|d| d.trim_start_matches('/').to_string())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AppError::bad_request("Destination is required"))?;

    if mode == Transfer::Move && destination == source {
        return Err(AppError::bad_request("Destination must differ from source"));
    }

    let object = fetch_object(state, &source).await?;
    let content_type = object.meta.content_type.clone();

    let written = match state.store.put(&destination, content_type, object.body).await {
        Ok(meta) => meta,
        Err(StorageError::InvalidKey(_)) => {
            return Err(AppError::bad_request("Invalid destination key"));
        }
        Err(err) => {
            tracing::error!("writing `{}` from `{}` failed: {}", destination, source, err);
            return Err(AppError::internal(match mode {
                Transfer::Move => "Failed to move file",
                Transfer::Copy => "Failed to copy file",
            }));
        }
    };

    if mode == Transfer::Move {
        if let Err(err) = state.store.delete(&source).await {
            tracing::error!(
                "moved `{}` to `{}` but could not delete the source: {}",
                source,
                destination,
                err
            );
            return Err(AppError::internal("Failed to remove source after move"));
        }
    }

    let message = match mode {
        Transfer::Move => "File moved successfully",
        Transfer::Copy => "File copied successfully",
    };
    tracing::info!("{:?} `{}` -> `{}`", mode, source, destination);

    Ok(Json(json!({
        "message": message,
        "from": source,
        "to": destination,
        "etag": written.etag,
    })))
}

async fn fetch_object(state: &AppState, key: &str) -> Result<StoredObject, AppError> {
    state
        .store
        .get(key)
        .await?
        .ok_or_else(|| AppError::not_found("File not found"))
}

/// Skip leading empty chunks; `None` if the stream carries no bytes at all.
async fn non_empty(mut stream: ByteStream) -> io::Result<Option<ByteStream>> {
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if !chunk.is_empty() {
            let head = futures::stream::once(futures::future::ready(Ok(chunk)));
            return Ok(Some(head.chain(stream).boxed()));
        }
    }
    Ok(None)
}

fn object_response(object: StoredObject, attachment: bool) -> Response {
    let mut response = Response::new(Body::from_stream(object.body));
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &object.meta);

    if attachment {
        let disposition = format!(
            "attachment; filename=\"{}\"",
            utf8_percent_encode(object.meta.filename(), FILENAME_ENCODE_SET)
        );
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            response
                .headers_mut()
                .insert(header::CONTENT_DISPOSITION, value);
        }
    }

    response
}

fn set_object_headers(headers: &mut HeaderMap, meta: &ObjectMeta) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(meta.content_type_or_default())
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(meta.size));

    let quoted = format!("\"{}\"", meta.etag);
    if let Ok(value) = HeaderValue::from_str(&quoted) {
        headers.insert(header::ETAG, value);
    }

    let last_modified = meta
        .uploaded
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();
    if let Ok(value) = HeaderValue::from_str(&last_modified) {
        headers.insert(header::LAST_MODIFIED, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::object_store::bytes_stream;
    use chrono::{TimeZone, Utc};

    fn stored(key: &str, content_type: Option<&str>) -> StoredObject {
        StoredObject {
            meta: ObjectMeta {
                key: key.into(),
                size: 12,
                content_type: content_type.map(Into::into),
                etag: "abc123".into(),
                uploaded: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            },
            body: bytes_stream("test content"),
        }
    }

    #[test]
    fn download_headers() {
        let response = object_response(stored("docs/test.txt", Some("text/plain")), true);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
        assert_eq!(headers[header::CONTENT_LENGTH], "12");
        assert_eq!(headers[header::ETAG], "\"abc123\"");
        assert_eq!(headers[header::LAST_MODIFIED], "Mon, 01 Jan 2024 00:00:00 GMT");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"test.txt\""
        );
    }

    #[test]
    fn inline_has_no_disposition_and_default_type() {
        let response = object_response(stored("blob", None), false);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
        assert!(response.headers().get(header::CONTENT_DISPOSITION).is_none());
    }

    #[test]
    fn disposition_filename_is_percent_encoded() {
        let response = object_response(stored("a/résumé \"v2\".pdf", None), true);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"r%C3%A9sum%C3%A9%20%22v2%22.pdf\""
        );
    }

    #[tokio::test]
    async fn non_empty_skips_leading_empty_chunks() {
        let stream = futures::stream::iter(vec![
            Ok(Bytes::new()),
            Ok(Bytes::from_static(b"ab")),
            Ok(Bytes::from_static(b"c")),
        ])
        .boxed();
        let stream = non_empty(stream).await.unwrap().unwrap();
        let bytes = crate::services::object_store::collect_bytes(stream).await.unwrap();
        assert_eq!(bytes.as_ref(), b"abc");

        let empty = futures::stream::iter(vec![Ok(Bytes::new())]).boxed();
        assert!(non_empty(empty).await.unwrap().is_none());
    }
}
