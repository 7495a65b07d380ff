use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A staff account. Role flags are not exclusive; an admin may also be a
/// physician. The audit trail records the label from `role_label`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub full_name: String,
    pub roles: UserRoles,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoles {
    pub admin: bool,
    pub physician: bool,
    pub nurse: bool,
}

impl User {
    /// Most privileged role flag, used for audit entries.
    pub fn role_label(&self) -> &'static str {
        if self.roles.admin {
            "admin"
        } else if self.roles.physician {
            "physician"
        } else if self.roles.nurse {
            "nurse"
        } else {
            "staff"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(roles: UserRoles) -> User {
        User {
            username: "t".into(),
            full_name: "Test User".into(),
            roles,
            created_at: chrono::NaiveDateTime::default(),
        }
    }

    #[test]
    fn role_label_prefers_admin() {
        let u = user_with(UserRoles { admin: true, physician: true, nurse: true });
        assert_eq!(u.role_label(), "admin");
    }

    #[test]
    fn role_label_falls_back_to_staff() {
        let u = user_with(UserRoles::default());
        assert_eq!(u.role_label(), "staff");
    }

    #[test]
    fn role_label_physician_over_nurse() {
        let u = user_with(UserRoles { admin: false, physician: true, nurse: true });
        assert_eq!(u.role_label(), "physician");
    }
}
