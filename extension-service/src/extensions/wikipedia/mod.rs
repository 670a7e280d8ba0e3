//! Encyclopedia extension: simplified Wikipedia articles.
//!
//! `/` and `/wiki/` show a search form (or look up `?search=`), `/wiki/<title>`
//! fetches the article and runs it through the [`cleanup`] pipeline.

pub mod cleanup;

use askama::Template;
use axum::{
    extract::{Query, State},
    http::{Method, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Router,
};

use crate::services::metrics::record_wiki_fetch;
use crate::services::page_source::{FetchError, PageSource};
use crate::AppState;
use cleanup::CleanupPipeline;

pub const DOMAIN: &str = "wikipedia.org";

const SEARCH_PAGE_TITLE: &str = "Wikipedia, the free encyclopedia";
const ERROR_PAGE_TITLE: &str = "Error - Wikipedia";

#[derive(Template)]
#[template(path = "wikipedia_search.html")]
pub struct SearchFormTemplate {}

#[derive(Template)]
#[template(path = "wikipedia_page.html")]
pub struct PageTemplate<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

/// An HTML body with its status code.
pub type Rendered = (StatusCode, String);

pub fn router() -> Router<AppState> {
    Router::new().fallback(handle_request)
}

async fn handle_request(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let (status, body) = handle(state.page_source.as_ref(), &state.cleanup, &method, &uri).await;

    (status, Html(body)).into_response()
}

/// Route one request: search form, search lookup, or article.
pub async fn handle(
    source: &dyn PageSource,
    pipeline: &CleanupPipeline,
    method: &Method,
    uri: &Uri,
) -> Rendered {
    if *method != Method::GET {
        return method_not_allowed();
    }

    let path = uri.path().trim_start_matches('/');

    if path.is_empty() || path == "wiki/" {
        return match search_param(uri).filter(|s| !s.is_empty()) {
            Some(query) => wiki_page(source, pipeline, &query).await,
            None => search_form(),
        };
    }

    match path.strip_prefix("wiki/") {
        Some(encoded) => {
            let title = decode_title(encoded);
            wiki_page(source, pipeline, &title).await
        }
        None => method_not_allowed(),
    }
}

/// First `search` value in the query string. Repeated or malformed pairs never reject the request.
fn search_param(uri: &Uri) -> Option<String> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri).ok()?;
    pairs
        .into_iter()
        .find(|(key, _)| key == "search")
        .map(|(_, value)| value)
}

fn method_not_allowed() -> Rendered {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
}

fn decode_title(encoded: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(encoded.as_bytes())).into_owned()
}

fn search_form() -> Rendered {
    match (SearchFormTemplate {}).render() {
        Ok(form) => (StatusCode::OK, document(SEARCH_PAGE_TITLE, &form)),
        Err(e) => internal_error(&e.to_string()),
    }
}

async fn wiki_page(source: &dyn PageSource, pipeline: &CleanupPipeline, title: &str) -> Rendered {
    let html = match source.fetch_page(title).await {
        Ok(html) => {
            record_wiki_fetch("ok");
            html
        }
        Err(FetchError::NotFound) => {
            record_wiki_fetch(FetchError::NotFound.kind());
            tracing::info!(%title, "Encyclopedia page not found");
            return (
                StatusCode::NOT_FOUND,
                document(ERROR_PAGE_TITLE, "<p>Page not found.</p>"),
            );
        }
        Err(e) => {
            record_wiki_fetch(e.kind());
            tracing::error!(%title, error = %e, "Failed to fetch encyclopedia page");
            return internal_error(&e.to_string());
        }
    };

    let page = pipeline.clean(&html);
    let page_title = page
        .title
        .unwrap_or_else(|| title.replace('_', " "));
    let escaped_title = html_escape::encode_text(&page_title);

    let body = match page.content {
        Some(content) => format!("<b>{}</b><hr>{}", escaped_title, content),
        None => {
            tracing::warn!(%title, "Encyclopedia page has no content region");
            format!("<h1>{}</h1><p>Content not found.</p>", escaped_title)
        }
    };

    (
        StatusCode::OK,
        document(&format!("{} - Wikipedia", page_title), &body),
    )
}

fn internal_error(message: &str) -> Rendered {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        document(
            ERROR_PAGE_TITLE,
            &format!("<p>Error: {}</p>", html_escape::encode_text(message)),
        ),
    )
}

/// Wrap `body` in a minimal HTML document. Underscores in the title become spaces.
fn document(title: &str, body: &str) -> String {
    let title = title.replace('_', " ");
    PageTemplate {
        title: &title,
        body,
    }
    .render()
    .unwrap_or_else(|_| format!("<html><body>{}</body></html>", body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::page_source::mock::{MockPage, MockPageSource};

    const ARTICLE: &str = r#"<html><body>
        <h1><span class="mw-page-title-main">Rust (programming language)</span></h1>
        <div id="mw-content-text"><p><i>Rust</i> is a language.</p></div>
        </body></html>"#;

    async fn request(source: &MockPageSource, method: Method, uri: &str) -> Rendered {
        let pipeline = CleanupPipeline::standard().unwrap();
        let uri: Uri = uri.parse().unwrap();
        handle(source, &pipeline, &method, &uri).await
    }

    async fn get(source: &MockPageSource, uri: &str) -> Rendered {
        request(source, Method::GET, uri).await
    }

    #[tokio::test]
    async fn non_get_is_rejected() {
        let source = MockPageSource::new();
        let (status, body) = request(&source, Method::POST, "/wiki/Rust").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, "Method not allowed");
        assert!(source.requests().is_empty());
    }

    #[tokio::test]
    async fn non_get_with_repeated_search_is_still_405() {
        let source = MockPageSource::new();
        let (status, _) =
            request(&source, Method::POST, "/wiki/X?search=a&search=b").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn bare_paths_show_search_form_without_fetching() {
        let source = MockPageSource::new();
        for uri in ["/", "/wiki/", "/wiki/?search="] {
            let (status, body) = get(&source, uri).await;
            assert_eq!(status, StatusCode::OK);
            assert!(body.contains(r#"<form action="/wiki/" method="get">"#));
            assert!(body.contains("<title>Wikipedia, the free encyclopedia</title>"));
        }
        assert!(source.requests().is_empty());
    }

    #[tokio::test]
    async fn search_parameter_fetches_title() {
        let source = MockPageSource::new().with_page("Rust", ARTICLE);
        let (status, body) = get(&source, "/wiki/?search=Rust").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(source.requests(), vec!["Rust"]);
        assert!(body.contains("<b>Rust (programming language)</b><hr>"));
        assert!(body.contains("<title>Rust (programming language) - Wikipedia</title>"));
        assert!(body.contains("<p>Rust is a language.</p>"));
    }

    #[tokio::test]
    async fn first_search_value_wins() {
        let source = MockPageSource::new().with_page("Rust", ARTICLE);
        let (status, _) = get(&source, "/wiki/?search=Rust&search=Go").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(source.requests(), vec!["Rust"]);
    }

    #[tokio::test]
    async fn search_value_is_form_decoded() {
        let source = MockPageSource::new().with_page("Rust language", ARTICLE);
        let (status, _) = get(&source, "/?search=Rust+language").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(source.requests(), vec!["Rust language"]);
    }

    #[tokio::test]
    async fn path_title_is_percent_decoded() {
        let source = MockPageSource::new().with_page("Rust (programming language)", ARTICLE);
        let (status, _) = get(&source, "/wiki/Rust%20(programming%20language)").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(source.requests(), vec!["Rust (programming language)"]);
    }

    #[tokio::test]
    async fn remote_404_maps_to_404() {
        let source = MockPageSource::new();
        let (status, body) = get(&source, "/wiki/Nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("<p>Page not found.</p>"));
        assert!(body.contains("<title>Error - Wikipedia</title>"));
    }

    #[tokio::test]
    async fn other_failures_map_to_500_with_message() {
        let source = MockPageSource::new()
            .with_response("Down", MockPage::Status(503))
            .with_response("Broken", MockPage::Transport("connection <reset>".into()));

        let (status, body) = get(&source, "/wiki/Down").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("<p>Error: 503 Service Unavailable for url:"));

        let (status, body) = get(&source, "/wiki/Broken").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("<p>Error: connection &lt;reset&gt;</p>"));
    }

    #[tokio::test]
    async fn missing_content_region_is_soft_failure() {
        let source = MockPageSource::new().with_page("Empty_page", "<html><body></body></html>");
        let (status, body) = get(&source, "/wiki/Empty_page").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<h1>Empty page</h1><p>Content not found.</p>"));
        assert!(body.contains("<title>Empty page - Wikipedia</title>"));
    }

    #[tokio::test]
    async fn unknown_get_path_is_method_not_allowed() {
        let source = MockPageSource::new();
        let (status, _) = get(&source, "/w/index.php").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
