//! HTTP routes.

use askama::Template;
use axum::Router;
use axum::http::{StatusCode, Uri};
use axum::response::Html;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use super::WebError;
use super::templates::{COMMANDS, FeaturesPage, HelpPage, IndexPage, NotFoundPage, nav_links};

/// Builds the front-end router.
pub fn router() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/features", get(features))
        .route("/help", get(help))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
}

fn render(page: &impl Template) -> Result<Html<String>, WebError> {
    Ok(Html(page.render()?))
}

async fn index() -> Result<Html<String>, WebError> {
    render(&IndexPage { nav: nav_links("/") })
}

async fn features() -> Result<Html<String>, WebError> {
    render(&FeaturesPage {
        nav: nav_links("/features"),
    })
}

async fn help() -> Result<Html<String>, WebError> {
    render(&HelpPage {
        nav: nav_links("/help"),
        commands: &COMMANDS,
    })
}

async fn health() -> &'static str {
    "ok"
}

async fn not_found(uri: Uri) -> Result<(StatusCode, Html<String>), WebError> {
    let page = NotFoundPage {
        nav: nav_links(uri.path()),
        path: uri.path().to_owned(),
    };
    Ok((StatusCode::NOT_FOUND, render(&page)?))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    async fn get_page(path: &str) -> (StatusCode, String) {
        let response = router()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn active_links(html: &str) -> Vec<&str> {
        html.match_indices("class=\"nav-link active\"")
            .filter_map(|(i, _)| {
                let tail = &html[i..];
                let start = tail.find("href=\"")? + 6;
                let end = tail[start..].find('"')?;
                Some(&tail[start..start + end])
            })
            .collect()
    }

    #[tokio::test]
    async fn test_pages_render_with_active_nav() {
        for (path, title) in [("/", "Home"), ("/features", "Features"), ("/help", "Help")] {
            let (status, html) = get_page(path).await;
            assert_eq!(status, StatusCode::OK, "{path}");
            assert!(html.contains(&format!("<title>{title} | Anonymous Chat Bot</title>")));
            assert_eq!(active_links(&html), vec![path]);
        }
    }

    #[tokio::test]
    async fn test_help_shows_command_table() {
        let (_, html) = get_page("/help").await;
        assert!(html.contains("<code>/reveal</code>"));
        assert!(html.contains("Pairing pool"));
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(get_page("/health").await, (StatusCode::OK, "ok".to_owned()));
    }

    #[tokio::test]
    async fn test_unknown_path_is_404_without_active_link() {
        let (status, html) = get_page("/help/extra").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(html.contains("/help/extra"));
        assert!(active_links(&html).is_empty());
    }
}
