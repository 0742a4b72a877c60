use actix_http::Method;
use actix_web::{test::init_service, web};
use anyhow::Result;
use donation_tracker::{
    auth::JwtToken,
    create_web_app,
    setting::{SessionStorage, Setting},
    AppState,
};
use sea_orm::ConnectionTrait;
use serde_json::json;
use util::{auth, call, create_test_state, get_req, login, post_req, SECRET};

mod util;

#[actix_rt::test]
async fn info() -> Result<()> {
    let (state, _dir) = create_test_state().await?;
    let app = init_service(create_web_app(web::Data::new(state))).await;

    let (val, status) = util::get(&app, "/v1/info").await?;
    assert_eq!(status, 200);
    assert!(val["version"].is_string());
    assert_eq!(val["store"]["configured"], json!(true));
    assert_eq!(val["store"]["connected"], json!(true));
    Ok(())
}

#[actix_rt::test]
async fn degraded() -> Result<()> {
    let mut setting = Setting::default();
    setting.session.storage = SessionStorage::Memory;
    let state = AppState::from_setting(setting).await?;
    let app = init_service(create_web_app(web::Data::new(state))).await;

    let (val, status) = util::get(&app, "/v1/info").await?;
    assert_eq!(status, 200);
    assert_eq!(val["store"]["configured"], json!(false));
    assert_eq!(val["store"]["connected"], json!(false));

    let token = JwtToken::new(1, "user", "a@example.com", 60).encode(SECRET.as_bytes())?;
    let (val, status) = util::post(&app, "/v1/session", json!({ "access_token": token })).await?;
    assert_eq!(status, 503);
    assert_eq!(val["error"], json!(true));

    // guarded routes report the missing configuration, not a bad token
    let (val, status) = call(auth(get_req("/v1/donations"), &token), &app).await?;
    assert_eq!(status, 503);
    assert_eq!(val["error"], json!(true));
    Ok(())
}

#[actix_rt::test]
async fn session() -> Result<()> {
    let (state, _dir) = create_test_state().await?;
    let app = init_service(create_web_app(web::Data::new(state))).await;

    // no token
    let (val, status) = util::get(&app, "/v1/donations").await?;
    assert_eq!(status, 401);
    assert_eq!(val["error"], json!(true));

    // signed but never logged in
    let token = util::token(1, "user")?;
    let (_, status) = call(auth(get_req("/v1/donations"), &token), &app).await?;
    assert_eq!(status, 401);

    // bad signature
    let forged = JwtToken::new(1, "user", "a@example.com", 60).encode(b"other")?;
    let (_, status) = util::post(&app, "/v1/session", json!({ "access_token": forged })).await?;
    assert_eq!(status, 401);

    // expired
    let mut claims = JwtToken::new(1, "user", "a@example.com", 0);
    claims.exp -= 10;
    let expired = claims.encode(SECRET.as_bytes())?;
    let (val, status) = util::post(&app, "/v1/session", json!({ "access_token": expired })).await?;
    assert_eq!(status, 401);
    assert_eq!(val["message"], json!("Session token is expired"));

    let token = login(&app, 1, "user").await?;
    let (val, status) = call(auth(get_req("/v1/session"), &token), &app).await?;
    assert_eq!(status, 200);
    assert_eq!(val["accessToken"], json!(token));
    assert_eq!(val["role"], json!("user"));
    assert_eq!(val["id"], json!(1));
    assert_eq!(val["email"], json!("alice@example.com"));

    let (_, status) = call(auth(get_req("/v1/donations"), &token), &app).await?;
    assert_eq!(status, 200);

    let (val, status) = call(
        auth(get_req("/v1/session").method(Method::DELETE), &token),
        &app,
    )
    .await?;
    assert_eq!(status, 200);
    assert_eq!(val["success"], json!(true));

    let (_, status) = call(auth(get_req("/v1/donations"), &token), &app).await?;
    assert_eq!(status, 401);
    Ok(())
}

#[actix_rt::test]
async fn role() -> Result<()> {
    let (state, _dir) = create_test_state().await?;
    let app = init_service(create_web_app(web::Data::new(state))).await;

    let token = login(&app, 2, "guest").await?;
    let (val, status) = call(auth(get_req("/v1/donations"), &token), &app).await?;
    assert_eq!(status, 403);
    assert_eq!(val["error"], json!(true));

    let token = login(&app, 3, "admin").await?;
    let (_, status) = call(auth(get_req("/v1/donations"), &token), &app).await?;
    assert_eq!(status, 200);
    Ok(())
}

#[actix_rt::test]
async fn donations() -> Result<()> {
    let (state, _dir) = create_test_state().await?;
    let app = init_service(create_web_app(web::Data::new(state))).await;
    let token = login(&app, 1, "user").await?;

    let (val, status) = call(
        auth(
            post_req("/v1/donations", json!({"donor_name": "Alice", "amount": 50})),
            &token,
        ),
        &app,
    )
    .await?;
    assert_eq!(status, 201);
    assert_eq!(val["status"], json!("Pending"));
    assert_eq!(val["donor_name"], json!("Alice"));
    assert_eq!(val["created_at"], val["updated_at"]);
    let id = val["id"].as_i64().unwrap();

    let (_, status) = call(
        auth(
            post_req("/v1/donations", json!({"donor_name": "Bob", "amount": 0})),
            &token,
        ),
        &app,
    )
    .await?;
    assert_eq!(status, 400);

    let (val, status) = call(
        auth(
            post_req("/v1/donations", json!({"donor_name": "Bob", "amount": "ten"})),
            &token,
        ),
        &app,
    )
    .await?;
    assert_eq!(status, 400);
    assert_eq!(val["error"], json!(true));

    let (val, status) = call(
        auth(
            post_req("/v1/donations", json!({"donor_name": "Bob Johnson", "amount": 75.5})),
            &token,
        ),
        &app,
    )
    .await?;
    assert_eq!(status, 201);
    let bob = val["id"].as_i64().unwrap();

    let (val, status) = call(
        auth(
            post_req(
                &format!("/v1/donations/{}/status", id),
                json!({"status": "Completed"}),
            )
            .method(Method::PUT),
            &token,
        ),
        &app,
    )
    .await?;
    assert_eq!(status, 200);
    assert_eq!(val["status"], json!("Completed"));

    let (_, status) = call(
        auth(
            post_req(
                &format!("/v1/donations/{}/status", id),
                json!({"status": "Lost"}),
            )
            .method(Method::PUT),
            &token,
        ),
        &app,
    )
    .await?;
    assert_eq!(status, 400);

    let (val, status) = call(
        auth(
            post_req(&format!("/v1/donations/{}", bob), json!({"amount": 80})).method(Method::PATCH),
            &token,
        ),
        &app,
    )
    .await?;
    assert_eq!(status, 200);
    assert_eq!(val["amount"], json!(80.0));
    assert_eq!(val["donor_name"], json!("Bob Johnson"));

    let (val, status) = call(auth(get_req(&format!("/v1/donations/{}", id)), &token), &app).await?;
    assert_eq!(status, 200);
    assert_eq!(val["status"], json!("Completed"));

    let (val, _) = call(auth(get_req("/v1/donations"), &token), &app).await?;
    assert_eq!(val.as_array().unwrap().len(), 2);

    let (val, _) = call(auth(get_req("/v1/donations?q=JOHN"), &token), &app).await?;
    assert_eq!(val.as_array().unwrap().len(), 1);
    assert_eq!(val[0]["id"], json!(bob));

    let (val, _) = call(auth(get_req("/v1/donations?status=Completed"), &token), &app).await?;
    assert_eq!(val.as_array().unwrap().len(), 1);
    assert_eq!(val[0]["id"], json!(id));

    let (_, status) = call(
        auth(get_req("/v1/donations?q=a&status=Pending"), &token),
        &app,
    )
    .await?;
    assert_eq!(status, 400);

    let (val, status) = call(auth(get_req("/v1/summary?q=bob"), &token), &app).await?;
    assert_eq!(status, 200);
    assert_eq!(val["summary"]["count"], json!(2));
    assert_eq!(val["summary"]["total_amount"], json!(130.0));
    assert_eq!(val["summary"]["completed"], json!(1));
    assert_eq!(val["summary"]["pending"], json!(1));
    assert_eq!(val["filtered"]["count"], json!(1));
    assert_eq!(val["filtered"]["total_amount"], json!(80.0));

    let (val, status) = call(
        auth(get_req(&format!("/v1/donations/{}", id)).method(Method::DELETE), &token),
        &app,
    )
    .await?;
    assert_eq!(status, 200);
    assert_eq!(val["success"], json!(true));

    let (val, status) = call(auth(get_req(&format!("/v1/donations/{}", id)), &token), &app).await?;
    assert_eq!(status, 404);
    assert_eq!(val["error"], json!(true));

    let (_, status) = call(
        auth(get_req(&format!("/v1/donations/{}", id)).method(Method::DELETE), &token),
        &app,
    )
    .await?;
    assert_eq!(status, 404);
    Ok(())
}

#[actix_rt::test]
async fn bad_path() -> Result<()> {
    let (state, _dir) = create_test_state().await?;
    let app = init_service(create_web_app(web::Data::new(state))).await;
    let token = login(&app, 1, "user").await?;

    for path in ["/v1/donations/abc", "/v1/donations/99999999999"] {
        let (val, status) = call(auth(get_req(path), &token), &app).await?;
        assert_eq!(status, 400, "{}", path);
        assert_eq!(val["error"], json!(true));
        assert_eq!(val["status_code"], json!(400));
    }
    let (val, status) = call(
        auth(
            post_req("/v1/donations/abc/status", json!({"status": "Failed"})).method(Method::PUT),
            &token,
        ),
        &app,
    )
    .await?;
    assert_eq!(status, 400);
    assert_eq!(val["error"], json!(true));
    Ok(())
}

#[actix_rt::test]
async fn store_failure() -> Result<()> {
    let (state, _dir) = create_test_state().await?;
    let state = web::Data::new(state);
    let app = init_service(create_web_app(state.clone())).await;
    let token = login(&app, 1, "user").await?;

    state
        .service
        .db()?
        .execute_unprepared("DROP TABLE donations")
        .await?;
    let (val, status) = call(auth(get_req("/v1/donations"), &token), &app).await?;
    assert_eq!(status, 500);
    assert_eq!(val["error"], json!(true));
    assert!(val["message"].as_str().map_or(false, |m| !m.is_empty()));
    Ok(())
}
