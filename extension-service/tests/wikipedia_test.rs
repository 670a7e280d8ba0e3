mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{TestApp, WIKI_HOST};
use extension_service::services::page_source::mock::{MockPage, MockPageSource};
use extension_service::services::providers::mock::MockChatProvider;

const ARTICLE: &str = r#"<html><head><title>Ferris - Wikipedia</title></head><body>
<h1 id="firstHeading"><span class="mw-page-title-main">Ferris the Crab</span></h1>
<div id="mw-content-text"><div class="mw-parser-output">
<div class="shortdescription">Unofficial mascot</div>
<table class="infobox"><tr><td>Species: crab</td></tr></table>
<p><i>Ferris</i> is a crab.<sup class="reference">[1]</sup></p>
<figure><img src="ferris.png"></figure>
<div class="mw-heading mw-heading2"><h2 id="History">History</h2><span class="mw-editsection">[edit]</span></div>
<p>Drawn in 2015.</p>
<p>Part of the crab&nbsp;family.</p>
<div class="mw-heading mw-heading2"><h2 id="References">References</h2></div>
<div class="reflist"><ol><li>A citation</li></ol></div>
<p>Trailing reference prose.</p>
<div class="mw-heading mw-heading2"><h2 id="Legacy">Legacy</h2></div>
<p>Still popular.</p>
<div class="navbox">Navigation</div>
</div></div>
<div id="catlinks">Categories</div>
</body></html>"#;

fn app_with(pages: MockPageSource) -> TestApp {
    TestApp::new(MockChatProvider::echo(), pages)
}

#[tokio::test]
async fn search_form_is_served_without_remote_contact() {
    let app = app_with(MockPageSource::new());

    for uri in ["/", "/wiki/"] {
        let response = app.get(WIKI_HOST, uri, None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response
            .body
            .contains(r#"<form action="/wiki/" method="get">"#));
        assert!(response
            .body
            .contains("<title>Wikipedia, the free encyclopedia</title>"));
    }

    assert!(app.pages.requests().is_empty());
}

#[tokio::test]
async fn article_is_simplified() {
    let app = app_with(MockPageSource::new().with_page("Ferris", ARTICLE));

    let response = app.get(WIKI_HOST, "/wiki/Ferris", None).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = &response.body;
    assert!(body.contains("<title>Ferris the Crab - Wikipedia</title>"));
    assert!(body.contains("<b>Ferris the Crab</b><hr>"));
    assert!(body.contains("Ferris is a crab."));
    assert!(body.contains("<div><br><br><b>History</b><hr></div>"));
    assert!(body.contains("Drawn in 2015."));
    assert!(body.contains("<b>Legacy</b>"));
    assert!(body.contains("Still popular."));
    assert!(body.contains("crab&nbsp;family"));

    for removed in [
        "Unofficial mascot",
        "Species: crab",
        "[1]",
        "<img",
        "<figure",
        "[edit]",
        "References",
        "A citation",
        "Trailing reference prose.",
        "Navigation",
        "Categories",
        "<i>",
        "<h2",
    ] {
        assert!(!body.contains(removed), "{removed:?} should be removed");
    }
}

#[tokio::test]
async fn search_query_fetches_article() {
    let app = app_with(MockPageSource::new().with_page("Ferris crab", ARTICLE));

    let response = app
        .get(WIKI_HOST, "/wiki/?search=Ferris%20crab", None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.pages.requests(), vec!["Ferris crab"]);
    assert!(response.body.contains("<b>Ferris the Crab</b><hr>"));
}

#[tokio::test]
async fn repeated_search_uses_first_value() {
    let app = app_with(MockPageSource::new().with_page("Ferris", ARTICLE));

    let response = app
        .get(WIKI_HOST, "/wiki/?search=Ferris&search=Corro", None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.pages.requests(), vec!["Ferris"]);
}

#[tokio::test]
async fn missing_article_is_not_found() {
    let app = app_with(MockPageSource::new());

    let response = app.get(WIKI_HOST, "/wiki/Does_not_exist", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.body.contains("<p>Page not found.</p>"));
    assert_eq!(app.pages.requests(), vec!["Does_not_exist"]);
}

#[tokio::test]
async fn upstream_failure_is_internal_error() {
    let app = app_with(
        MockPageSource::new().with_response("Flaky", MockPage::Transport("timed out".into())),
    );

    let response = app.get(WIKI_HOST, "/wiki/Flaky", None).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body.contains("<p>Error: timed out</p>"));
}

#[tokio::test]
async fn non_get_requests_are_rejected() {
    let app = app_with(MockPageSource::new().with_page("Ferris", ARTICLE));

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/wiki/Ferris")
                .header(header::HOST, WIKI_HOST)
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(app.pages.requests().is_empty());

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/wiki/Ferris?search=a&search=b")
                .header(header::HOST, WIKI_HOST)
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
}
