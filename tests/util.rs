#![allow(unused)]

use actix_http::{body::MessageBody, header::AUTHORIZATION, Method, Request};
use actix_web::{
    dev::{Service, ServiceResponse},
    test::{call_service, read_body, TestRequest},
};
use anyhow::Result;
use donation_tracker::{
    auth::JwtToken,
    setting::{SessionStorage, Setting},
    AppState,
};
use migration::{Migrator, MigratorTrait};
use serde_json::{json, Value};
use tempfile::{Builder, TempDir};

pub const SECRET: &str = "test-secret";

/// Fresh sqlite database in a temp dir, sessions kept in memory.
/// The dir is removed when the returned guard drops.
pub async fn create_test_state() -> Result<(AppState, TempDir)> {
    let dir = Builder::new().prefix("donation-tracker-test").tempdir()?;
    let path = dir.path().join("donations.sqlite");
    let mut setting = Setting::default();
    setting.db_url = Some(format!("sqlite://{}?mode=rwc", path.display()));
    setting.auth.secret = Some(SECRET.to_owned());
    setting.session.storage = SessionStorage::Memory;
    let state = AppState::from_setting(setting).await?;
    Migrator::fresh(state.service.db()?).await?;
    Ok((state, dir))
}

pub fn token(id: i64, role: &str) -> Result<String> {
    Ok(JwtToken::new(id, role, "alice@example.com", 3600).encode(SECRET.as_bytes())?)
}

pub fn get_req(path: &str) -> TestRequest {
    TestRequest::with_uri(path)
}

pub fn post_req(path: &str, data: Value) -> TestRequest {
    TestRequest::with_uri(path)
        .method(Method::POST)
        .set_json(data)
}

pub fn auth(req: TestRequest, token: &str) -> TestRequest {
    req.insert_header((AUTHORIZATION, format!("Bearer {}", token)))
}

pub async fn call<S, B>(req: TestRequest, app: &S) -> Result<(Value, u16)>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let res = call_service(app, req.to_request()).await;
    let status = res.status().as_u16();
    let body = read_body(res).await;
    Ok((serde_json::from_slice(&body).unwrap_or(Value::Null), status))
}

pub async fn get<S, B>(app: &S, path: &str) -> Result<(Value, u16)>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    call(get_req(path), app).await
}

pub async fn post<S, B>(app: &S, path: &str, data: Value) -> Result<(Value, u16)>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    call(post_req(path, data), app).await
}

/// Sign in and return the access token.
pub async fn login<S, B>(app: &S, id: i64, role: &str) -> Result<String>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let token = token(id, role)?;
    let (val, status) = post(app, "/v1/session", json!({ "access_token": token })).await?;
    assert_eq!(status, 200, "{}", val);
    Ok(token)
}
