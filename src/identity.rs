//! Current-user identity. Its presence gates every mark-as-read write.
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::{Arc, RwLock};

/// Signed-in user, carrying the bearer token for API calls.
///
/// The token never appears in `Debug` output.
pub struct UserIdentity {
    login: Option<String>,
    token: SecretString,
}

impl UserIdentity {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            login: None,
            token: SecretString::from(token.into()),
        }
    }

    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }

    pub fn login(&self) -> Option<&str> {
        self.login.as_deref()
    }

    /// Value for the `Authorization` header.
    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }

    /// True if both identities carry the same login and token.
    pub fn same_user(&self, other: &UserIdentity) -> bool {
        self.login == other.login && self.token.expose_secret() == other.token.expose_secret()
    }
}

impl fmt::Debug for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserIdentity")
            .field("login", &self.login)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Shared slot for the signed-in user.
///
/// Sections and the HTTP transport hold clones of the same slot, so a user
/// switch changes both the read-marking gate and the bearer token sent.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser {
    slot: Arc<RwLock<Option<Arc<UserIdentity>>>>,
}

impl CurrentUser {
    pub fn new(user: Option<Arc<UserIdentity>>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(user)),
        }
    }

    pub fn get(&self) -> Option<Arc<UserIdentity>> {
        self.slot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the user, returning the previous one.
    pub fn replace(&self, user: Option<Arc<UserIdentity>>) -> Option<Arc<UserIdentity>> {
        let mut slot = self
            .slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *slot, user)
    }

    pub fn is_signed_in(&self) -> bool {
        self.get().is_some()
    }
}

impl From<Option<Arc<UserIdentity>>> for CurrentUser {
    fn from(user: Option<Arc<UserIdentity>>) -> Self {
        Self::new(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_masks_token() {
        let identity = UserIdentity::new("super-secret-token").with_login("volunteer");
        let debug_output = format!("{:?}", identity);
        assert!(!debug_output.contains("super-secret-token"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("volunteer"));
    }

    #[test]
    fn test_same_user() {
        let a = UserIdentity::new("t1").with_login("alice");
        assert!(a.same_user(&UserIdentity::new("t1").with_login("alice")));
        assert!(!a.same_user(&UserIdentity::new("t2").with_login("alice")));
        assert!(!a.same_user(&UserIdentity::new("t1")));
    }

    #[test]
    fn test_current_user_is_shared_between_clones() {
        let session = CurrentUser::new(Some(Arc::new(UserIdentity::new("t1"))));
        let transport = session.clone();

        let previous = session.replace(Some(Arc::new(UserIdentity::new("t2"))));
        assert_eq!(previous.unwrap().bearer(), "Bearer t1");
        assert_eq!(transport.get().unwrap().bearer(), "Bearer t2");

        session.replace(None);
        assert!(!transport.is_signed_in());
    }

    #[test]
    fn test_bearer_header() {
        assert_eq!(UserIdentity::new("abc").bearer(), "Bearer abc");
    }
}
