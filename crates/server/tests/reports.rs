mod common;

use axum::http::StatusCode;
use common::{report_body, TestApp};
use serde_json::json;

#[tokio::test]
async fn create_without_token_is_unowned() {
    let app = TestApp::new().await;

    let report = app
        .create_report(None, report_body("Pothole", "ROADS"))
        .await;

    assert_eq!(report["status"], "NEW");
    assert_eq!(report["upvotes"], 0);
    assert!(report["userId"].is_null());
    assert!(report["user"].is_null());
}

#[tokio::test]
async fn create_with_token_links_author_unless_anonymous() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register("author@example.com").await;

    let owned = app
        .create_report(Some(&token), report_body("Broken lamp", "LIGHTING"))
        .await;
    assert_eq!(owned["userId"], user_id.as_str());
    assert_eq!(owned["user"]["email"], "author@example.com");

    let mut body = report_body("Dumped sofa", "WASTE");
    body["anonymous"] = json!(true);
    let anonymous = app.create_report(Some(&token), body).await;
    assert_eq!(anonymous["anonymous"], true);
    assert!(anonymous["userId"].is_null());
}

#[tokio::test]
async fn create_validates_fields() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/reports/create",
            None,
            json!({ "title": "No place", "description": "x", "category": "ROADS" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");

    let (status, body) = app
        .post("/api/reports/create", None, report_body("Odd", "PARKING"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid category");

    let mut far = report_body("Far away", "OTHER");
    far["lat"] = json!(123.0);
    let (status, _) = app.post("/api/reports/create", None, far).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_accepts_the_equator() {
    let app = TestApp::new().await;
    let mut body = report_body("Null island", "OTHER");
    body["lat"] = json!(0.0);
    body["lng"] = json!(0.0);
    let report = app.create_report(None, body).await;
    assert_eq!(report["lat"], 0.0);
}

#[tokio::test]
async fn get_unknown_report_is_404() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/reports/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Report not found");
}

#[tokio::test]
async fn toggling_upvote_twice_restores_count() {
    let app = TestApp::new().await;
    let (token, _) = app.register("voter@example.com").await;
    let report = app.create_report(None, report_body("Pothole", "ROADS")).await;
    let id = report["id"].as_str().unwrap();
    let uri = format!("/api/reports/{id}/upvote");

    let (status, first) = app.post(&uri, Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, json!({ "upvoted": true, "upvotes": 1 }));

    let (_, detail) = app.get(&format!("/api/reports/{id}"), Some(&token)).await;
    assert_eq!(detail["hasUpvoted"], true);
    assert_eq!(detail["upvotes"], 1);

    let (_, second) = app.post(&uri, Some(&token), json!({})).await;
    assert_eq!(second, json!({ "upvoted": false, "upvotes": 0 }));

    let (_, detail) = app.get(&format!("/api/reports/{id}"), Some(&token)).await;
    assert_eq!(detail["hasUpvoted"], false);
    assert_eq!(detail["upvotes"], 0);
}

#[tokio::test]
async fn upvote_counter_tracks_distinct_users() {
    let app = TestApp::new().await;
    let (a, _) = app.register("a@example.com").await;
    let (b, _) = app.register("b@example.com").await;
    let report = app.create_report(None, report_body("Pothole", "ROADS")).await;
    let uri = format!("/api/reports/{}/upvote", report["id"].as_str().unwrap());

    app.post(&uri, Some(&a), json!({})).await;
    let (_, body) = app.post(&uri, Some(&b), json!({})).await;
    assert_eq!(body["upvotes"], 2);

    let rows = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM upvotes")
        .fetch_one(&app.state.db.pool)
        .await
        .unwrap();
    assert_eq!(rows, 2);
}

#[tokio::test]
async fn upvote_requires_auth_and_existing_report() {
    let app = TestApp::new().await;
    let (token, _) = app.register("voter@example.com").await;

    let (status, _) = app
        .post("/api/reports/missing/upvote", None, json!({}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post("/api/reports/missing/upvote", Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_are_attached_newest_first() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register("talker@example.com").await;
    let report = app.create_report(None, report_body("Pothole", "ROADS")).await;
    let id = report["id"].as_str().unwrap();
    let uri = format!("/api/reports/{id}/comment");

    let (status, body) = app.post(&uri, Some(&token), json!({ "text": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Comment text required");

    let (status, first) = app
        .post(&uri, Some(&token), json!({ "text": "First!" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["userId"], user_id.as_str());
    assert_eq!(first["user"]["email"], "talker@example.com");

    app.post(&uri, Some(&token), json!({ "text": "Second" }))
        .await;

    let (_, detail) = app.get(&format!("/api/reports/{id}"), None).await;
    let comments = detail["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["text"], "Second");
    assert_eq!(comments[1]["text"], "First!");
    assert_eq!(detail["hasUpvoted"], false);
}

#[tokio::test]
async fn comment_on_unknown_report_is_404() {
    let app = TestApp::new().await;
    let (token, _) = app.register("talker@example.com").await;
    let (status, _) = app
        .post(
            "/api/reports/missing/comment",
            Some(&token),
            json!({ "text": "hello" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_by_category_status_and_search() {
    let app = TestApp::new().await;
    let (admin, _) = app.admin("admin@example.com").await;
    let pothole = app
        .create_report(None, report_body("Pothole on Main", "ROADS"))
        .await;
    app.create_report(None, report_body("Dark corner", "LIGHTING"))
        .await;
    app.create_report(None, report_body("Overflowing bin", "WASTE"))
        .await;

    let (_, roads) = app.get("/api/reports?category=ROADS", None).await;
    let roads = roads.as_array().unwrap();
    assert_eq!(roads.len(), 1);
    assert_eq!(roads[0]["id"], pothole["id"]);

    let (_, found) = app.get("/api/reports?search=POTHOLE", None).await;
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (_, found) = app.get("/api/reports?search=attention", None).await;
    assert_eq!(found.as_array().unwrap().len(), 3);

    app.put(
        &format!("/api/reports/{}/status", pothole["id"].as_str().unwrap()),
        Some(&admin),
        json!({ "status": "RESOLVED" }),
    )
    .await;
    let (_, resolved) = app.get("/api/reports?status=RESOLVED", None).await;
    assert_eq!(resolved.as_array().unwrap().len(), 1);

    let (status, _) = app.get("/api/reports?status=DONE", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_sorts_by_upvotes_and_distance() {
    let app = TestApp::new().await;
    let (token, _) = app.register("voter@example.com").await;

    let mut near = report_body("Near", "ROADS");
    near["lat"] = json!(51.5007);
    near["lng"] = json!(-0.1246);
    let near = app.create_report(None, near).await;

    let mut far = report_body("Far", "ROADS");
    far["lat"] = json!(48.8584);
    far["lng"] = json!(2.2945);
    let far = app.create_report(None, far).await;

    // Newest first by default
    let (_, newest) = app.get("/api/reports", None).await;
    assert_eq!(newest[0]["id"], far["id"]);

    app.post(
        &format!("/api/reports/{}/upvote", near["id"].as_str().unwrap()),
        Some(&token),
        json!({}),
    )
    .await;
    let (_, by_votes) = app.get("/api/reports?sortBy=upvotes", None).await;
    assert_eq!(by_votes[0]["id"], near["id"]);

    let (_, nearest) = app
        .get("/api/reports?sortBy=nearest&lat=51.5&lng=-0.12", None)
        .await;
    assert_eq!(nearest[0]["id"], near["id"]);

    let (_, nearest) = app
        .get("/api/reports?sortBy=nearest&lat=48.85&lng=2.29", None)
        .await;
    assert_eq!(nearest[0]["id"], far["id"]);
}

#[tokio::test]
async fn list_marks_viewer_upvotes() {
    let app = TestApp::new().await;
    let (token, _) = app.register("voter@example.com").await;
    let report = app.create_report(None, report_body("Pothole", "ROADS")).await;
    app.post(
        &format!("/api/reports/{}/upvote", report["id"].as_str().unwrap()),
        Some(&token),
        json!({}),
    )
    .await;

    let (_, mine) = app.get("/api/reports", Some(&token)).await;
    assert_eq!(mine[0]["hasUpvoted"], true);

    let (_, anonymous) = app.get("/api/reports", None).await;
    assert_eq!(anonymous[0]["hasUpvoted"], false);
}

#[tokio::test]
async fn invalid_token_on_public_routes_is_ignored() {
    let app = TestApp::new().await;
    app.create_report(None, report_body("Pothole", "ROADS")).await;

    let (status, body) = app.get("/api/reports", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let report = app
        .create_report(Some("not-a-jwt"), report_body("Lamp", "LIGHTING"))
        .await;
    assert!(report["userId"].is_null());
}

#[tokio::test]
async fn nearest_without_coordinates_falls_back_to_newest() {
    let app = TestApp::new().await;
    let older = app.create_report(None, report_body("Older", "ROADS")).await;
    let newer = app.create_report(None, report_body("Newer", "ROADS")).await;

    let (status, body) = app.get("/api/reports?sortBy=nearest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], newer["id"]);
    assert_eq!(body[1]["id"], older["id"]);

    let (status, body) = app.get("/api/reports?sortBy=nearest&lat=51.5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], newer["id"]);
}

#[tokio::test]
async fn search_ignores_case_for_accented_letters() {
    let app = TestApp::new().await;
    let lamp = app
        .create_report(None, report_body("Éclairage en panne", "LIGHTING"))
        .await;
    app.create_report(None, report_body("Nid de poule", "ROADS"))
        .await;

    let (status, found) = app.get("/api/reports?search=%C3%A9clairage", None).await;
    assert_eq!(status, StatusCode::OK);
    let found = found.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], lamp["id"]);
}

#[tokio::test]
async fn malformed_query_is_a_json_400() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/reports?includeArchived=1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app.get("/api/reports?lat=north", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
