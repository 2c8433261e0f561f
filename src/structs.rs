use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::session::Authenticatable;

/// A registered seller. `password_hash` is an Argon2 PHC string and is never
/// serialized.
#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct Seller {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

impl Authenticatable for Seller {
    fn identity_key(&self) -> String {
        self.id.to_string()
    }
}

/// A product listing. Price is in the smallest currency unit.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub quantity: i64,
    pub seller_id: i64,
    pub created_at: String,
    pub updated_at: String,
}
