//! The authenticated caller, as seen by the services.

use common::UserId;

/// Role carried in the caller's token.
///
/// Labels are matched case-insensitively; anything unrecognised is kept as
/// `Other` so it can be logged and refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Admin,
    /// `VENDEDOR`
    Seller,
    /// `TENDERO`
    Shopkeeper,
    Other(String),
}

impl Role {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Role::Admin,
            "VENDEDOR" => Role::Seller,
            "TENDERO" => Role::Shopkeeper,
            _ => Role::Other(label.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "ADMIN",
            Role::Seller => "VENDEDOR",
            Role::Shopkeeper => "TENDERO",
            Role::Other(label) => label,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is calling: email from `sub`, role, and the auth service's user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub email: String,
    pub role: Role,
    pub user_id: Option<UserId>,
}

impl Actor {
    pub fn new(email: impl Into<String>, role: Role, user_id: Option<UserId>) -> Self {
        Self {
            email: email.into(),
            role,
            user_id,
        }
    }
}
