//! http api

use crate::{
    auth::{AuthedUser, JwtToken, SessionUser},
    service::{DonationPatch, NewDonation},
    view::{filter_by_donor, Summary},
    AppState, Error, Result,
};
use actix_web::{delete, get, patch, post, put, web, HttpResponse, Responder, Scope};
use entity::donation::Status;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

pub const CARGO_PKG_VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

fn version() -> String {
    CARGO_PKG_VERSION.map(ToOwned::to_owned).unwrap_or_default()
}

pub fn scope() -> Scope {
    web::scope("/v1")
        .service(info)
        .service(login)
        .service(session)
        .service(logout)
        .service(list_donations)
        .service(create_donation)
        .service(get_donation)
        .service(update_donation_status)
        .service(update_donation)
        .service(delete_donation)
        .service(summary)
}

#[get("/info")]
pub async fn info(state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let store = state.service.check().await;
    Ok(HttpResponse::Ok().json(json!({
        "version": version(),
        "store": store,
    })))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoginReq {
    access_token: String,
}

/// sign in with an access token issued by the auth backend
#[post("/session")]
pub async fn login(
    state: web::Data<AppState>,
    data: web::Json<LoginReq>,
) -> Result<impl Responder, Error> {
    let secret = state
        .setting
        .auth
        .secret
        .as_ref()
        .ok_or(Error::Unavailable)?;
    let claims = JwtToken::from_str(&data.access_token, secret.as_bytes())?;
    let user = SessionUser::new(data.into_inner().access_token, claims);
    state.sessions.login(&user)?;
    info!(id = user.id, role = user.role.as_str(), "User signed in");
    Ok(web::Json(user))
}

#[get("/session")]
pub async fn session(authed: AuthedUser) -> Result<impl Responder, Error> {
    Ok(web::Json(authed.user))
}

#[delete("/session")]
pub async fn logout(
    state: web::Data<AppState>,
    authed: AuthedUser,
) -> Result<impl Responder, Error> {
    state.sessions.logout(authed.user.id)?;
    info!(id = authed.user.id, "User signed out");
    Ok(web::Json(json!({"success": true})))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ListReq {
    /// donor name search term
    q: Option<String>,
    status: Option<Status>,
}

#[get("/donations")]
pub async fn list_donations(
    state: web::Data<AppState>,
    _user: AuthedUser,
    query: web::Query<ListReq>,
) -> Result<impl Responder, Error> {
    let donations = match (&query.q, query.status) {
        (Some(_), Some(_)) => {
            return Err(Error::InvalidParam(
                "Search by donor name and by status cannot be combined".to_owned(),
            ))
        }
        (Some(q), None) => state.service.search(q).await?,
        (None, Some(status)) => state.service.list_by_status(status).await?,
        (None, None) => state.service.list().await?,
    };
    Ok(web::Json(donations))
}

#[post("/donations")]
pub async fn create_donation(
    state: web::Data<AppState>,
    _user: AuthedUser,
    data: web::Json<NewDonation>,
) -> Result<impl Responder, Error> {
    let donation = state.service.create(data.into_inner()).await?;
    Ok(HttpResponse::Created().json(donation))
}

#[get("/donations/{id}")]
pub async fn get_donation(
    state: web::Data<AppState>,
    _user: AuthedUser,
    path: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let id = path.into_inner();
    let donation = state
        .service
        .get(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Donation {} not found", id)))?;
    Ok(web::Json(donation))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusReq {
    status: Status,
}

#[put("/donations/{id}/status")]
pub async fn update_donation_status(
    state: web::Data<AppState>,
    _user: AuthedUser,
    path: web::Path<i32>,
    data: web::Json<UpdateStatusReq>,
) -> Result<impl Responder, Error> {
    let donation = state
        .service
        .update_status(path.into_inner(), data.status)
        .await?;
    Ok(web::Json(donation))
}

#[patch("/donations/{id}")]
pub async fn update_donation(
    state: web::Data<AppState>,
    _user: AuthedUser,
    path: web::Path<i32>,
    data: web::Json<DonationPatch>,
) -> Result<impl Responder, Error> {
    let donation = state
        .service
        .update(path.into_inner(), data.into_inner())
        .await?;
    Ok(web::Json(donation))
}

#[delete("/donations/{id}")]
pub async fn delete_donation(
    state: web::Data<AppState>,
    _user: AuthedUser,
    path: web::Path<i32>,
) -> Result<impl Responder, Error> {
    state.service.delete(path.into_inner()).await?;
    Ok(web::Json(json!({"success": true})))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SummaryReq {
    q: String,
}

/// totals over all donations, and over those matching `q`
#[get("/summary")]
pub async fn summary(
    state: web::Data<AppState>,
    _user: AuthedUser,
    query: web::Query<SummaryReq>,
) -> Result<impl Responder, Error> {
    let donations = state.service.list().await?;
    let filtered = filter_by_donor(&donations, &query.q)
        .into_iter()
        .cloned()
        .collect::<Vec<_>>();
    Ok(web::Json(json!({
        "summary": Summary::from_donations(&donations),
        "filtered": Summary::from_donations(&filtered),
    })))
}
