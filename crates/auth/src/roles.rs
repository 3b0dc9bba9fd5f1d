use core::str::FromStr;

use serde::{Deserialize, Serialize};

use storefront_core::DomainError;

/// Role of a user account.
///
/// A closed set: policy code matches on it exhaustively. Variants are declared
/// in increasing order of privilege, so `Ord` follows
/// `Guest < User < UserPremium < Admin < SuperAdmin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Guest,
    User,
    UserPremium,
    Admin,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Guest,
        Role::User,
        Role::UserPremium,
        Role::Admin,
        Role::SuperAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "GUEST",
            Role::User => "USER",
            Role::UserPremium => "USER_PREMIUM",
            Role::Admin => "ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "GUEST" => Ok(Role::Guest),
            "USER" => Ok(Role::User),
            "USER_PREMIUM" | "PREMIUM" => Ok(Role::UserPremium),
            "ADMIN" => Ok(Role::Admin),
            "SUPER_ADMIN" | "SUPERADMIN" => Ok(Role::SuperAdmin),
            _ => Err(DomainError::validation(format!("unknown role '{s}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_ordered_by_privilege() {
        let mut sorted = Role::ALL;
        sorted.sort();
        assert_eq!(sorted, Role::ALL);
        assert!(Role::UserPremium < Role::Admin);
    }

    #[test]
    fn parses_loose_spellings() {
        assert_eq!("user_premium".parse::<Role>().unwrap(), Role::UserPremium);
        assert_eq!("premium".parse::<Role>().unwrap(), Role::UserPremium);
        assert_eq!(" super-admin ".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&Role::UserPremium).unwrap();
        assert_eq!(json, "\"USER_PREMIUM\"");
    }
}
