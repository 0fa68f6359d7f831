use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Capability carried by an access token and accepted by a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Admin,
    Supplier,
    Customer,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Admin => "admin",
            Scope::Supplier => "supplier",
            Scope::Customer => "customer",
        }
    }
}

/// The single effective role of a user.
///
/// Users keep three independent flags in storage; every decision that depends
/// on the role goes through [`Role::from_flags`] so the precedence is applied
/// in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Supplier,
    Customer,
}

impl Role {
    /// Admin wins over supplier, supplier over customer.
    pub fn from_flags(is_admin: bool, is_supplier: bool, is_customer: bool) -> Option<Self> {
        if is_admin {
            Some(Role::Admin)
        } else if is_supplier {
            Some(Role::Supplier)
        } else if is_customer {
            Some(Role::Customer)
        } else {
            None
        }
    }

    pub fn scope(self) -> Scope {
        match self {
            Role::Admin => Scope::Admin,
            Role::Supplier => Scope::Supplier,
            Role::Customer => Scope::Customer,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub role: Option<Role>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i32>,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: i64,
    pub image_url: Option<String>,
    pub stock: i32,
    pub supplier_id: Option<i32>,
    pub category_id: Option<i32>,
    pub rating: f64,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Rating {
    pub id: i32,
    pub grade: f64,
    pub user_id: Option<i32>,
    pub product_id: Option<i32>,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: i32,
    pub user_id: Option<i32>,
    pub product_id: Option<i32>,
    pub rating_id: i32,
    pub comment: String,
    pub comment_date: DateTime<Utc>,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_takes_precedence_over_supplier() {
        let role = Role::from_flags(true, true, false);
        assert_eq!(role, Some(Role::Admin));
        assert_eq!(role.map(Role::scope), Some(Scope::Admin));
    }

    #[test]
    fn supplier_takes_precedence_over_customer() {
        assert_eq!(Role::from_flags(false, true, true), Some(Role::Supplier));
    }

    #[test]
    fn no_flags_means_no_role() {
        assert_eq!(Role::from_flags(false, false, false), None);
    }

    #[test]
    fn scopes_serialize_lowercase() {
        let json = serde_json::to_string(&[Scope::Admin, Scope::Customer]).unwrap();
        assert_eq!(json, r#"["admin","customer"]"#);
    }
}
