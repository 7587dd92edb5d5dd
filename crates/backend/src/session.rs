use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trackhub_core::UserId;

/// An authenticated (possibly anonymous) identity.
///
/// Created once per successful sign-in and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    uid: UserId,
    anonymous: bool,
    signed_in_at: DateTime<Utc>,
}

impl Session {
    pub fn anonymous(uid: UserId, signed_in_at: DateTime<Utc>) -> Self {
        Self {
            uid,
            anonymous: true,
            signed_in_at,
        }
    }

    pub fn uid(&self) -> UserId {
        self.uid
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    pub fn signed_in_at(&self) -> DateTime<Utc> {
        self.signed_in_at
    }
}
