use crate::{Error, Result};
use chrono::Utc;
use entity::donation::{self, Status};
use sea_orm::{
    sea_query::{Expr, Func, SimpleExpr},
    ActiveModelTrait, ColumnTrait, DbConn, DbErr, EntityTrait, NotSet, QueryFilter, QueryOrder,
    Select, Set,
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Create donation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewDonation {
    pub donor_name: String,
    pub amount: f64,
}

/// Partial update, absent fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DonationPatch {
    pub donor_name: Option<String>,
    pub amount: Option<f64>,
    pub status: Option<Status>,
}

/// Result of probing the data store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreStatus {
    pub configured: bool,
    pub connected: bool,
    pub message: String,
}

pub fn validate_donor_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidParam(
            "The donor name cannot be empty".to_owned(),
        ));
    }
    Ok(name.to_owned())
}

pub fn validate_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidParam(
            "The amount must be a positive number".to_owned(),
        ));
    }
    Ok(amount)
}

/// Escape LIKE wildcards with `!` so the term matches literally.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '!') {
            pattern.push('!');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// `LOWER(donor_name) LIKE LOWER(pattern)`, both sides folded by the store.
fn donor_name_like(term: &str) -> SimpleExpr {
    Expr::cust_with_exprs(
        "? LIKE ? ESCAPE '!'",
        [
            SimpleExpr::from(Func::lower(Expr::col(donation::Column::DonorName))),
            SimpleExpr::from(Func::lower(Expr::val(like_pattern(term)))),
        ],
    )
}

/// Log a store failure and normalize it.
fn remote(action: &str, err: DbErr) -> Error {
    error!(error = err.to_string(), "Error {}", action);
    Error::from(err)
}

fn not_found(id: i32) -> Error {
    Error::NotFound(format!("Donation {} not found", id))
}

/// Donation access layer over the hosted store.
/// Holds no data between calls.
pub struct Service {
    conn: Option<DbConn>,
}

impl Service {
    pub fn new(conn: DbConn) -> Self {
        Self { conn: Some(conn) }
    }

    /// A service without a store, every operation fails with [`Error::Unavailable`].
    pub fn unavailable() -> Self {
        Self { conn: None }
    }

    pub fn db(&self) -> Result<&DbConn> {
        self.conn.as_ref().ok_or(Error::Unavailable)
    }

    fn newest_first(select: Select<donation::Entity>) -> Select<donation::Entity> {
        select
            .order_by_desc(donation::Column::CreatedAt)
            .order_by_desc(donation::Column::Id)
    }

    pub async fn check(&self) -> StoreStatus {
        match &self.conn {
            None => StoreStatus {
                configured: false,
                connected: false,
                message: Error::Unavailable.to_string(),
            },
            Some(conn) => match conn.ping().await {
                Ok(()) => StoreStatus {
                    configured: true,
                    connected: true,
                    message: "Database access successful".to_owned(),
                },
                Err(e) => {
                    error!(error = e.to_string(), "Database access test failed");
                    StoreStatus {
                        configured: true,
                        connected: false,
                        message: e.to_string(),
                    }
                }
            },
        }
    }

    pub async fn list(&self) -> Result<Vec<donation::Model>> {
        Self::newest_first(donation::Entity::find())
            .all(self.db()?)
            .await
            .map_err(|e| remote("fetching donations", e))
    }

    pub async fn get(&self, id: i32) -> Result<Option<donation::Model>> {
        donation::Entity::find_by_id(id)
            .one(self.db()?)
            .await
            .map_err(|e| remote("fetching donation", e))
    }

    pub async fn create(&self, data: NewDonation) -> Result<donation::Model> {
        let donor_name = validate_donor_name(&data.donor_name)?;
        let amount = validate_amount(data.amount)?;
        let db = self.db()?;
        let now = Utc::now();
        donation::ActiveModel {
            id: NotSet,
            donor_name: Set(donor_name),
            amount: Set(amount),
            status: Set(Status::Pending),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(|e| remote("creating donation", e))
    }

    pub async fn update_status(&self, id: i32, status: Status) -> Result<donation::Model> {
        self.update(
            id,
            DonationPatch {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn update(&self, id: i32, patch: DonationPatch) -> Result<donation::Model> {
        let mut model = donation::ActiveModel {
            id: Set(id),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Some(name) = &patch.donor_name {
            model.donor_name = Set(validate_donor_name(name)?);
        }
        if let Some(amount) = patch.amount {
            model.amount = Set(validate_amount(amount)?);
        }
        if let Some(status) = patch.status {
            model.status = Set(status);
        }

        match model.update(self.db()?).await {
            Ok(m) => Ok(m),
            Err(DbErr::RecordNotUpdated) | Err(DbErr::RecordNotFound(_)) => Err(not_found(id)),
            Err(e) => Err(remote("updating donation", e)),
        }
    }

    pub async fn delete(&self, id: i32) -> Result<()> {
        let res = donation::Entity::delete_by_id(id)
            .exec(self.db()?)
            .await
            .map_err(|e| remote("deleting donation", e))?;
        if res.rows_affected == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    /// Case-insensitive substring match on the donor name.
    pub async fn search(&self, term: &str) -> Result<Vec<donation::Model>> {
        Self::newest_first(donation::Entity::find().filter(donor_name_like(term)))
            .all(self.db()?)
            .await
            .map_err(|e| remote("searching donations", e))
    }

    pub async fn list_by_status(&self, status: Status) -> Result<Vec<donation::Model>> {
        Self::newest_first(donation::Entity::find().filter(donation::Column::Status.eq(status)))
            .all(self.db()?)
            .await
            .map_err(|e| remote("fetching donations by status", e))
    }
}
