use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Creation and last modification time of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timestamps {
    pub fn now() -> Timestamps {
        let now = utc_now_millis();
        Timestamps {
            created_at: now,
            updated_at: now,
        }
    }
}

/// Identities (e-mail addresses) of whoever created and last changed an entity.
/// Empty when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTracking {
    pub created_by: String,
    pub updated_by: String,
}

impl UserTracking {
    pub fn created_by(user: impl Into<String>) -> UserTracking {
        UserTracking {
            created_by: user.into(),
            updated_by: String::new(),
        }
    }
}

/// Entities carrying `Timestamps` and `UserTracking`.
pub trait Tracked {
    fn timestamps_mut(&mut self) -> &mut Timestamps;
    fn user_tracking_mut(&mut self) -> &mut UserTracking;

    /// Records a modification by `user` at the current time.
    fn touch(&mut self, user: &str) {
        self.timestamps_mut().updated_at = utc_now_millis();
        self.user_tracking_mut().updated_by = user.to_owned();
    }
}

/// Current time truncated to milliseconds, the resolution timestamps are kept at.
pub fn utc_now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
