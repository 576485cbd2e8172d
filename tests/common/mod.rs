//! Shared fixtures for the HTTP tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use file_api::{
    AppState,
    models::object::ObjectMeta,
    services::{
        credential_service::StaticCredentials,
        memory_store::MemoryStore,
        object_store::{ByteStream, ObjectStore, StorageError, StorageResult, StoredObject},
        token_service::TokenService,
    },
};
use http_body_util::BodyExt;
use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use tower::ServiceExt;

pub const SECRET: &str = "test_secret_key_at_least_32_bytes";

/// `MemoryStore` wrapper that counts calls and can be told to fail writes or
/// deletes.
#[derive(Default)]
pub struct SpyStore {
    inner: MemoryStore,
    pub lists: AtomicUsize,
    pub heads: AtomicUsize,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub deletes: AtomicUsize,
    pub fail_puts: AtomicBool,
    pub fail_deletes: AtomicBool,
}

impl SpyStore {
    pub fn calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
            + self.heads.load(Ordering::SeqCst)
            + self.gets.load(Ordering::SeqCst)
            + self.puts.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }

    pub fn mutations(&self) -> usize {
        self.puts.load(Ordering::SeqCst) + self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for SpyStore {
    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<ObjectMeta>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list(prefix).await
    }

    async fn head(&self, key: &str) -> StorageResult<Option<ObjectMeta>> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Option<StoredObject>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put(
        &self,
        key: &str,
        content_type: Option<String>,
        body: ByteStream,
    ) -> StorageResult<ObjectMeta> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::Io(io::Error::other("injected write failure")));
        }
        self.inner.put(key, content_type, body).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Io(io::Error::other("injected delete failure")));
        }
        self.inner.delete(key).await
    }
}

pub struct TestApp {
    pub store: Arc<SpyStore>,
    pub tokens: TokenService,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(SpyStore::default());
        let tokens = TokenService::new(SECRET);
        let credentials = StaticCredentials::new([("alice", "wonderland")]);
        let state = AppState::new(store.clone(), Arc::new(credentials), tokens.clone());
        Self {
            store,
            tokens: tokens.clone(),
            router: file_api::routes(state),
        }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.tokens.issue("alice").unwrap())
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Upload through the API with a valid token.
    pub async fn upload(&self, key: &str, content_type: &str, body: &'static [u8]) {
        let response = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/files/{key}"))
                    .header("Authorization", self.bearer())
                    .header("Content-Type", content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn assert_cors(response: &Response<Body>) {
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(
        headers["access-control-allow-methods"],
        "GET, POST, PUT, DELETE, OPTIONS"
    );
    assert_eq!(
        headers["access-control-allow-headers"],
        "Content-Type, Authorization"
    );
}
