//! TMDB API client tests
//!
//! Tests search, discovery, details, and error handling against a mock server.

use mockito::{Matcher, Server};
use std::time::Duration;
use streamverse::api::{Catalog, CatalogError, TmdbClient};

// =============================================================================
// Search Tests
// =============================================================================

#[tokio::test]
async fn test_search_parses_results() {
    let mut server = Server::new_async().await;

    let mock_response = r#"{
        "page": 1,
        "results": [
            {
                "id": 76,
                "title": "Before Sunrise",
                "release_date": "1995-01-27",
                "poster_path": "/kf1Jb1c2JAOqjuzA3H4oDM263uB.jpg",
                "genre_ids": [18, 10749],
                "vote_average": 7.7
            },
            {
                "id": 80,
                "title": "Before Sunset",
                "release_date": "",
                "poster_path": null,
                "genre_ids": [18]
            }
        ],
        "total_results": 2,
        "total_pages": 1
    }"#;

    let mock = server
        .mock("GET", "/search/movie")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("api_key".into(), "test_key".into()),
            Matcher::UrlEncoded("query".into(), "before sun".into()),
            Matcher::UrlEncoded("page".into(), "1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(mock_response)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let page = client.search("before sun", 1).await.unwrap();

    mock.assert_async().await;

    assert_eq!(page.total_pages, 1);
    assert_eq!(page.results.len(), 2);

    let first = &page.results[0];
    assert_eq!(first.id, 76);
    assert_eq!(first.title, "Before Sunrise");
    assert_eq!(first.year(), Some(1995));
    assert!(first.has_poster());
    assert!(first.has_genre(10749));

    // Empty strings and nulls become None
    let second = &page.results[1];
    assert!(second.release_date.is_none());
    assert!(!second.has_poster());
    assert_eq!(second.to_string(), "Before Sunset (N/A)");
}

#[tokio::test]
async fn test_search_empty_results() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/search/movie")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"page": 1, "results": [], "total_pages": 0}"#)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let page = client.search("xyznonexistent", 1).await.unwrap();

    mock.assert_async().await;
    assert!(page.results.is_empty());
}

// =============================================================================
// Discover & Popular Tests
// =============================================================================

#[tokio::test]
async fn test_discover_passes_filter_spec() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/discover/movie")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("with_genres".into(), "10749".into()),
            Matcher::UrlEncoded("sort_by".into(), "popularity.desc".into()),
            Matcher::UrlEncoded("page".into(), "2".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"page": 2, "total_pages": 40, "results": [
                {"id": 1, "title": "Notting Hill", "genre_ids": [10749, 35]}
            ]}"#,
        )
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let page = client
        .discover("with_genres=10749&sort_by=popularity.desc", 2)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(page.total_pages, 40);
    assert_eq!(page.results[0].title, "Notting Hill");
}

#[tokio::test]
async fn test_popular_page() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/movie/popular")
        .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
        .with_status(200)
        .with_body(r#"{"page": 1, "total_pages": 500, "results": [{"id": 7, "title": "Heat"}]}"#)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let page = client.popular(1).await.unwrap();

    mock.assert_async().await;
    assert_eq!(page.results.len(), 1);
    assert!(page.results[0].genre_ids.is_empty());
}

// =============================================================================
// Detail Tests
// =============================================================================

#[tokio::test]
async fn test_detail_has_external_id() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/movie/76")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"{
                "id": 76,
                "imdb_id": "tt0112471",
                "title": "Before Sunrise",
                "release_date": "1995-01-27",
                "poster_path": "/kf1Jb1c2JAOqjuzA3H4oDM263uB.jpg",
                "genres": [{"id": 18, "name": "Drama"}, {"id": 10749, "name": "Romance"}],
                "runtime": 101
            }"#,
        )
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let detail = client.detail(76).await.unwrap();

    mock.assert_async().await;
    assert_eq!(detail.external_id.as_deref(), Some("tt0112471"));
    assert_eq!(detail.summary.title, "Before Sunrise");
    assert!(detail.summary.has_genre(10749));
}

#[tokio::test]
async fn test_detail_without_external_id() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/movie/99")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"id": 99, "imdb_id": "", "title": "Home Video"}"#)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let detail = client.detail(99).await.unwrap();

    assert!(detail.external_id.is_none());
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[tokio::test]
async fn test_not_found() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/movie/999999999")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"status_code": 34, "status_message": "The resource you requested could not be found."}"#)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let err = client.detail(999999999).await.unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_server_error() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/movie/popular")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let err = client.popular(1).await.unwrap_err();

    assert!(matches!(err, CatalogError::ServerError(500)));
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_invalid_json() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/search/movie")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let err = client.search("heat", 1).await.unwrap_err();

    assert!(matches!(err, CatalogError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_rate_limit_retries_then_gives_up() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/movie/popular")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_header("Retry-After", "0")
        .expect_at_least(2)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url("test_key", server.url());
    let err = client.popular(1).await.unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, CatalogError::RateLimited));
}

#[tokio::test]
async fn test_request_timeout_is_enforced() {
    // Accepts connections but never answers
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let client = TmdbClient::with_base_url("test_key", format!("http://{}", addr))
        .with_timeout(Duration::from_millis(200));
    assert_eq!(client.timeout(), Duration::from_millis(200));

    let started = std::time::Instant::now();
    let err = client.popular(1).await.unwrap_err();

    assert!(matches!(err, CatalogError::RequestFailed(ref e) if e.is_timeout()));
    assert!(started.elapsed() < Duration::from_secs(5));
    server.abort();
}
