mod common;

use common::{Harness, Reply, bearer};
use serde_json::json;
use sitekit_client::{ApiError, Method, ReportFilter, ReportsService, filter_reports, sort_newest_first};

fn reports_payload() -> serde_json::Value {
    json!([
        { "id": 1, "title": "Retail Pulse", "category": "Market Research", "tags": ["retail"],
          "published_at": "2024-03-01T00:00:00Z" },
        { "id": "r-2", "title": "Freight Index", "category": "Logistics", "tags": ["shipping"],
          "published_at": "2024-06-01T00:00:00Z" },
        { "id": 3, "title": "Draft notes" }
    ])
}

#[tokio::test]
async fn anonymous_listing_sends_no_token() {
    let h = Harness::new();
    h.transport.on(Method::Get, "/reports", Reply::Json(200, reports_payload()));

    let reports = ReportsService::new(h.api.clone()).list().await.unwrap();

    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0].id, "1");
    assert_eq!(reports[1].id, "r-2");
    assert!(reports[2].tags.is_empty());
    assert_eq!(bearer(&h.transport.calls()[0]), None);
}

#[tokio::test]
async fn signed_in_listing_uses_token_and_refresh() {
    let h = Harness::signed_in("stale", "ref-1");
    h.transport
        .on(Method::Get, "/reports", Reply::Empty(401))
        .on(Method::Get, "/reports", Reply::Json(200, json!({ "data": reports_payload() })))
        .on(Method::Post, "/refresh", Reply::Json(200, json!({ "access_token": "fresh" })));

    let reports = ReportsService::new(h.api.clone()).list().await.unwrap();

    assert_eq!(reports.len(), 3);
    let calls = h.transport.calls_to("/reports");
    assert_eq!(bearer(&calls[1]), Some("Bearer fresh"));
}

#[tokio::test]
async fn get_encodes_the_identifier() {
    let h = Harness::new();
    h.transport.on(
        Method::Get,
        "/reports/q1%2F2024",
        Reply::Json(200, json!({ "data": { "id": "q1/2024", "title": "Quarterly" } })),
    );

    let report = ReportsService::new(h.api.clone()).get("q1/2024").await.unwrap();

    assert_eq!(report.title, "Quarterly");
}

#[tokio::test]
async fn missing_report_is_http_404() {
    let h = Harness::new();

    let err = ReportsService::new(h.api.clone()).get("nope").await.unwrap_err();

    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn categories_get_slugs() {
    let h = Harness::new();
    h.transport.on(
        Method::Get,
        "/categories",
        Reply::Json(
            200,
            json!({ "items": [
                { "id": 1, "name": "Market Research" },
                { "id": 2, "name": "Logistics", "slug": "freight" }
            ] }),
        ),
    );

    let categories = ReportsService::new(h.api.clone()).categories().await.unwrap();

    assert_eq!(categories[0].slug, "market-research");
    assert_eq!(categories[1].slug, "freight");
}

#[tokio::test]
async fn unexpected_list_shape_is_invalid_response() {
    let h = Harness::new();
    h.transport
        .on(Method::Get, "/reports", Reply::Json(200, json!({ "count": 3 })));

    let err = ReportsService::new(h.api.clone()).list().await.unwrap_err();

    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn list_then_filter_from_query_string() {
    let h = Harness::new();
    h.transport.on(Method::Get, "/reports", Reply::Json(200, reports_payload()));

    let mut reports = ReportsService::new(h.api.clone()).list().await.unwrap();
    sort_newest_first(&mut reports);
    let filter = ReportFilter::from_query_string("?category=market-research&q=pulse");
    let shown = filter_reports(&reports, &filter);

    assert_eq!(
        reports.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
        vec!["r-2", "1", "3"]
    );
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title, "Retail Pulse");
}
