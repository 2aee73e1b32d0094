//! Closed set of roles a principal can hold.

use serde::{Deserialize, Serialize};

/// The role claimed by a bearer token.
///
/// End-user roles are assigned at registration. `Service` is reserved for
/// tokens minted by a service to call its peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A shopper placing and paying for their own orders.
    User,

    /// Operator with access to every order.
    Admin,

    /// A merchant who owns catalog products.
    Seller,

    /// Another service in the system acting on its own behalf.
    Service,
}

impl Role {
    /// Returns the wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Seller => "seller",
            Role::Service => "service",
        }
    }

    /// Parses a wire name, returning `None` for anything outside the closed set.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            "seller" => Some(Role::Seller),
            "service" => Some(Role::Service),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_only_known_roles() {
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("seller"), Some(Role::Seller));
        assert_eq!(Role::parse("service"), Some(Role::Service));
        assert_eq!(Role::parse("Admin"), None);
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Role::Seller).unwrap();
        assert_eq!(json, "\"seller\"");
    }
}
