//! Integer identifiers assigned by the backend, one newtype per entity so a
//! task id can never be passed where a résumé id is expected.

use serde::{Deserialize, Serialize};

macro_rules! backend_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

backend_id!(
    /// Signed-in account.
    UserId
);
backend_id!(
    /// Stored résumé (`resumes.id`).
    ResumeId
);
backend_id!(
    /// Stored job description (`job_descriptions.id`).
    JdId
);
backend_id!(
    /// Learning task (`user_tasks.id`).
    TaskId
);
