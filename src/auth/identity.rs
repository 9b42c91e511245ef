use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Merchant,
    Customer,
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "merchant" => Ok(Role::Merchant),
            "customer" => Ok(Role::Customer),
            _ => Err(()),
        }
    }
}

/// Authenticated caller, decoded from the access token.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden(
                "You are not allowed to perform this action",
            ))
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Role::SuperAdmin).unwrap(),
            "\"super_admin\""
        );
        assert_eq!(
            serde_json::from_str::<Role>("\"merchant\"").unwrap(),
            Role::Merchant
        );
    }

    #[test]
    fn role_parses_from_form_values() {
        assert_eq!("customer".parse::<Role>(), Ok(Role::Customer));
        assert_eq!("super_admin".parse::<Role>(), Ok(Role::SuperAdmin));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn require_role_checks_membership() {
        let merchant = Identity {
            user_id: Uuid::new_v4(),
            role: Role::Merchant,
        };
        assert!(merchant
            .require_role(&[Role::Merchant, Role::SuperAdmin])
            .is_ok());
        assert!(merchant.require_role(&[Role::SuperAdmin]).is_err());
    }
}
