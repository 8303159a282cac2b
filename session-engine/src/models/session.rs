use serde::{Deserialize, Serialize};

/// Profile details for the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Advisory only; real authorization goes through the permission cache.
    #[serde(default)]
    pub role: Option<String>,
}

/// Observable session state.
///
/// `authenticated == true` implies a non-expired access token is held in
/// the session store; any transition to `false` also clears the stored
/// token pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
    pub user: Option<UserDetails>,
}

impl Session {
    pub fn authenticated(user: Option<UserDetails>) -> Self {
        Self {
            authenticated: true,
            user,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}
