#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use gxr_farming::api::server::build_router;
    use gxr_farming::{EntityStore, FarmingService, MemoryStore, Notifier, RewardConfig, SeedData};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn setup_app() -> Router {
        let store = Arc::new(MemoryStore::new());
        store.seed(&SeedData::default()).await.unwrap();
        let service = Arc::new(FarmingService::new(
            store,
            Notifier::new(),
            RewardConfig::default(),
        ));
        build_router(service)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = send(app, method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn user_id_for(app: &Router, telegram_id: &str) -> i64 {
        let uri = format!("/api/users/me/{}", telegram_id);
        let (status, body) = send_json(app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        body["user"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = setup_app().await;
        let (status, body) = send(&app, Method::GET, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_first_contact_claim_and_task() {
        let app = setup_app().await;

        let (status, stats) = send_json(&app, Method::GET, "/api/users/me/999", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["user"]["points"], 0);
        assert_eq!(stats["user"]["telegramId"], "999");
        assert_eq!(stats["user"]["username"], "User999");
        assert_eq!(stats["evolLevel"], 1);
        assert_eq!(stats["evolName"], "Evol 1 – Rookie");
        assert_eq!(stats["canClaim"], true);
        assert_eq!(stats["timeUntilNextClaim"], 0);
        let user_id = stats["user"]["id"].as_i64().unwrap();

        let (status, stats) =
            send_json(&app, Method::POST, &format!("/api/users/{}/claim", user_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["user"]["points"], 250);
        assert_eq!(stats["canClaim"], false);
        let remaining = stats["timeUntilNextClaim"].as_i64().unwrap();
        assert!(remaining > 21_590_000 && remaining <= 21_600_000);

        let (status, tasks) = send_json(&app, Method::GET, "/api/tasks", None).await;
        assert_eq!(status, StatusCode::OK);
        let task_id = tasks
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["reward"] == 100)
            .and_then(|t| t["id"].as_i64())
            .unwrap();

        let (status, response) = send_json(
            &app,
            Method::POST,
            &format!("/api/users/{}/tasks/{}/complete", user_id, task_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["userStats"]["user"]["points"], 350);
        let completed = response["tasks"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["id"] == task_id)
            .unwrap();
        assert_eq!(completed["completed"], true);
    }

    #[tokio::test]
    async fn test_second_claim_reports_cooldown() {
        let app = setup_app().await;
        let user_id = user_id_for(&app, "12345").await;
        let uri = format!("/api/users/{}/claim", user_id);

        let (status, _) = send_json(&app, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send_json(&app, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_state");
        let remaining = body["timeUntilNextClaim"].as_i64().unwrap();
        assert!(remaining > 0 && remaining <= 21_600_000);
    }

    #[tokio::test]
    async fn test_claim_unknown_user() {
        let app = setup_app().await;
        let (status, body) = send_json(&app, Method::POST, "/api/users/404/claim", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_complete_task_twice() {
        let app = setup_app().await;
        let user_id = user_id_for(&app, "1").await;
        let uri = format!("/api/users/{}/tasks/1/complete", user_id);

        let (status, _) = send_json(&app, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send_json(&app, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "already_completed");
    }

    #[tokio::test]
    async fn test_task_category_filter() {
        let app = setup_app().await;

        let (status, tasks) =
            send_json(&app, Method::GET, "/api/tasks?category=partner", None).await;
        assert_eq!(status, StatusCode::OK);
        let tasks = tasks.as_array().unwrap();
        assert_eq!(tasks.len(), 3);
        assert!(tasks.iter().all(|t| t["category"] == "partnership"));

        let (status, body) = send_json(&app, Method::GET, "/api/tasks?category=nope", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_referral_flow() {
        let app = setup_app().await;
        let referrer_id = user_id_for(&app, "100").await;
        let referee_id = user_id_for(&app, "200").await;
        let uri = format!("/api/users/{}/referral", referee_id);

        let (status, body) = send_json(
            &app,
            Method::POST,
            &uri,
            Some(json!({"referralCode": format!("REF{}", referrer_id)})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Referral applied successfully");

        let (_, referee) = send_json(&app, Method::GET, "/api/users/me/200", None).await;
        assert_eq!(referee["user"]["points"], 50);
        assert_eq!(referee["user"]["refApplied"], true);
        assert_eq!(referee["user"]["referredBy"], "100");
        let (_, referrer) = send_json(&app, Method::GET, "/api/users/me/100", None).await;
        assert_eq!(referrer["user"]["points"], 50);
        assert_eq!(referrer["user"]["totalReferrals"], 1);

        let (status, body) = send_json(
            &app,
            Method::POST,
            &uri,
            Some(json!({"referralCode": format!("REF{}", referrer_id)})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "already_applied");
    }

    #[tokio::test]
    async fn test_referral_rejections() {
        let app = setup_app().await;
        let user_id = user_id_for(&app, "300").await;
        let uri = format!("/api/users/{}/referral", user_id);

        let (status, body) = send_json(&app, Method::POST, &uri, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");

        let (status, body) =
            send_json(&app, Method::POST, &uri, Some(json!({"referralCode": "REF9999"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "invalid_code");

        let (status, body) = send_json(
            &app,
            Method::POST,
            &uri,
            Some(json!({"referralCode": format!("REF{}", user_id)})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "self_referral");

        let (status, body) = send(&app, Method::POST, &uri, Some(json!("not an object"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "bad_request");
    }

    #[tokio::test]
    async fn test_connect_wallet() {
        let app = setup_app().await;
        let user_id = user_id_for(&app, "400").await;
        let uri = format!("/api/users/{}/wallet", user_id);

        let (status, user) =
            send_json(&app, Method::POST, &uri, Some(json!({"wallet": "gxr1abcdef"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["wallet"], "gxr1abcdef");

        let (status, body) =
            send_json(&app, Method::POST, &uri, Some(json!({"wallet": "0xabcdef"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_leaderboard() {
        let app = setup_app().await;
        let low = user_id_for(&app, "500").await;
        let high = user_id_for(&app, "600").await;
        send_json(&app, Method::POST, &format!("/api/users/{}/claim", high), None).await;

        let (status, board) = send_json(&app, Method::GET, "/api/leaderboard", None).await;
        assert_eq!(status, StatusCode::OK);
        let board = board.as_array().unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0]["user"]["id"], high);
        assert_eq!(board[0]["rank"], 1);
        assert_eq!(board[0]["evolName"], "Evol 2 – Charger");
        assert_eq!(board[1]["user"]["id"], low);
        assert_eq!(board[1]["rank"], 2);

        let uri = "/api/leaderboard?evolLevel=1&limit=10";
        let (_, rookies) = send_json(&app, Method::GET, uri, None).await;
        let rookies = rookies.as_array().unwrap();
        assert_eq!(rookies.len(), 1);
        assert_eq!(rookies[0]["user"]["id"], low);
        assert_eq!(rookies[0]["rank"], 1);

        let (status, body) =
            send_json(&app, Method::GET, "/api/leaderboard?evolLevel=9", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_admin_stats_and_export() {
        let app = setup_app().await;
        let user_id = user_id_for(&app, "700").await;
        send_json(&app, Method::POST, &format!("/api/users/{}/claim", user_id), None).await;

        let (status, stats) = send_json(&app, Method::GET, "/api/admin/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["totalUsers"], 1);
        assert_eq!(stats["totalDistributed"], 250);
        assert_eq!(stats["poolUsagePercentage"], 0);
        assert_eq!(stats["evolPools"].as_array().unwrap().len(), 7);
        assert_eq!(stats["evolPools"][0]["usedPool"], 250);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/admin/export")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"gxr_users.csv\""
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let csv = String::from_utf8(body.to_vec()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("User ID,Telegram ID,Username,Points,Wallet,Referrals,Created At")
        );
        assert!(lines
            .next()
            .unwrap()
            .starts_with(&format!("{},700,User700,250,,0,", user_id)));
    }

    #[tokio::test]
    async fn test_user_tasks_listing() {
        let app = setup_app().await;
        let user_id = user_id_for(&app, "800").await;

        let (status, tasks) =
            send_json(&app, Method::GET, &format!("/api/users/{}/tasks", user_id), None).await;
        assert_eq!(status, StatusCode::OK);
        let tasks = tasks.as_array().unwrap();
        assert_eq!(tasks.len(), 10);
        assert!(tasks.iter().all(|t| t["completed"] == false));

        let (status, _) = send_json(&app, Method::GET, "/api/users/404/tasks", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_path_and_query_are_structured() {
        let app = setup_app().await;
        let requests = [
            (Method::GET, "/api/leaderboard?limit=abc"),
            (Method::GET, "/api/leaderboard?limit=-1"),
            (Method::GET, "/api/leaderboard?evolLevel=x"),
            (Method::POST, "/api/users/abc/claim"),
            (Method::GET, "/api/users/abc/tasks"),
            (Method::POST, "/api/users/1/tasks/xyz/complete"),
        ];

        for (method, uri) in requests {
            let (status, body) = send_json(&app, method, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["error"], "bad_request", "{}", uri);
            assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
        }

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/users/abc/referral",
            Some(json!({"referralCode": "REF1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
    }
}
