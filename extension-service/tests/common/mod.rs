//! Shared helpers for extension-service integration tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use extension_service::config::Settings;
use extension_service::extensions::wikipedia::cleanup::CleanupPipeline;
use extension_service::services::page_source::mock::MockPageSource;
use extension_service::services::providers::mock::MockChatProvider;
use extension_service::services::SessionMemoryStore;
use extension_service::startup::build_router_with_store;
use extension_service::AppState;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const CHAT_HOST: &str = "gemini.google.com";
pub const WIKI_HOST: &str = "en.wikipedia.org";

pub struct TestApp {
    pub router: Router,
    pub chat: Arc<MockChatProvider>,
    pub pages: Arc<MockPageSource>,
    pub sessions: SessionMemoryStore,
}

impl TestApp {
    pub fn new(chat: MockChatProvider, pages: MockPageSource) -> Self {
        Self::with_settings(Settings::for_tests(), chat, pages)
    }

    pub fn with_settings(settings: Settings, chat: MockChatProvider, pages: MockPageSource) -> Self {
        let chat = Arc::new(chat);
        let pages = Arc::new(pages);
        let state = AppState::new(
            settings,
            chat.clone(),
            pages.clone(),
            CleanupPipeline::standard().expect("cleanup rules compile"),
        );

        let sessions = SessionMemoryStore::default();

        Self {
            router: build_router_with_store(state, sessions.clone()),
            chat,
            pages,
            sessions,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");

        TestResponse {
            status,
            cookie,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, host: &str, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri).header(header::HOST, host);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_chat(&self, command: &str, model: &str, cookie: Option<&str>) -> TestResponse {
        let form = format!(
            "command={}&model={}",
            urlencoding::encode(command),
            urlencoding::encode(model)
        );
        let mut builder = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::HOST, CHAT_HOST)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(form)).unwrap()).await
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub cookie: Option<String>,
    pub body: String,
}

/// Count rendered chat lines in a page.
pub fn rendered_lines(body: &str) -> usize {
    body.matches("<b>User:</b>").count() + body.matches("<b>Gemini:</b>").count()
}
