use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(TriageLevel {
    Level1 => "1",
    Level2 => "2",
    Level3 => "3",
    Level4 => "4",
    Level5 => "5",
});

impl TriageLevel {
    /// Severity rank for board ordering. Level 1 is most severe.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Level1 => 1,
            Self::Level2 => 2,
            Self::Level3 => 3,
            Self::Level4 => 4,
            Self::Level5 => 5,
        }
    }
}

str_enum!(CiStatus {
    NotDone => "not done",
    Done => "done",
});

str_enum!(StudyStatus {
    NotOrdered => "not ordered",
    AwaitingResults => "awaiting results",
    ResultsComplete => "results complete",
});

str_enum!(InterconsultStatus {
    NotOpened => "not opened",
    Opened => "opened",
    Completed => "completed",
});

str_enum!(RevaluationStatus {
    NotDone => "not done",
    Done => "done",
});

str_enum!(Disposition {
    Hospitalization => "hospitalization",
    Observation => "observation",
    Discharged => "discharged",
});

str_enum!(AuditAction {
    Create => "create",
    Update => "update",
    Delete => "delete",
    RoleChange => "role_change",
    CredentialChange => "credential_change",
});
