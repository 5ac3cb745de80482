use serde::{Deserialize, Serialize};

/// An available donor and the device token stored on their profile.
///
/// The token is whatever the profile holds; it may be missing, empty or
/// truncated and is filtered before any push is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorContact {
    pub user_id: String,
    pub fcm_token: Option<String>,
}

impl DonorContact {
    pub fn new(user_id: impl Into<String>, fcm_token: Option<&str>) -> Self {
        Self {
            user_id: user_id.into(),
            fcm_token: fcm_token.map(str::to_string),
        }
    }
}
