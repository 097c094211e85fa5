use log::{info, warn};

use crate::api::IdentityApi;
use crate::error::{Error, Result};
use crate::models::{Credentials, User};
use crate::voting::Viewer;

/// Authenticated identity for the lifetime of the process.
///
/// Created empty at start-up, filled by [`Session::initialize`] or
/// [`Session::login`], emptied by [`Session::logout`].
#[derive(Debug, Default)]
pub struct Session {
    user: Option<User>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the stored bearer token into a user. An invalid token is
    /// discarded rather than reported.
    pub async fn initialize(&mut self, identity: &dyn IdentityApi) {
        self.user = None;
        if !identity.has_credentials() {
            return;
        }
        match identity.current_user().await {
            Ok(user) => {
                info!("Session restored for {}", user.username);
                self.user = Some(user);
            }
            Err(e) => {
                warn!("Stored token rejected, signing out: {}", e);
                identity.sign_out();
            }
        }
    }

    pub async fn login(
        &mut self,
        identity: &dyn IdentityApi,
        credentials: &Credentials,
    ) -> Result<&User> {
        self.user = None;
        identity.sign_in(credentials).await?;
        let user = match identity.current_user().await {
            Ok(user) => user,
            Err(e) => {
                identity.sign_out();
                return Err(e);
            }
        };
        info!("Signed in as {}", user.username);
        Ok(self.user.insert(user))
    }

    pub fn logout(&mut self, identity: &dyn IdentityApi) {
        identity.sign_out();
        if let Some(user) = self.user.take() {
            info!("Signed out {}", user.username);
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_staff)
    }

    pub fn viewer(&self) -> Viewer {
        match &self.user {
            None => Viewer::Guest,
            Some(user) if user.is_staff => Viewer::Admin,
            Some(_) => Viewer::Member,
        }
    }

    pub fn require_user(&self) -> Result<&User> {
        self.user.as_ref().ok_or_else(|| {
            Error::Unauthenticated("Sign in first with `login <username> <password>`".to_string())
        })
    }

    pub fn require_admin(&self) -> Result<&User> {
        let user = self.require_user()?;
        if !user.is_staff {
            return Err(Error::Unauthorized(
                "Only administrators can perform this action".to_string(),
            ));
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{FakeApi, user};

    fn credentials(password: &str) -> Credentials {
        Credentials {
            username: "esi".to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn starts_as_guest_without_token() {
        let api = FakeApi::sample();
        let mut session = Session::new();
        session.initialize(&api).await;
        assert!(!session.is_authenticated());
        assert_eq!(session.viewer(), Viewer::Guest);
    }

    #[tokio::test]
    async fn restores_user_from_stored_token() {
        let api = FakeApi::sample();
        api.sign_in_as(user(7, "admin", true));
        let mut session = Session::new();
        session.initialize(&api).await;
        assert!(session.is_admin());
        assert_eq!(session.viewer(), Viewer::Admin);
    }

    #[tokio::test]
    async fn rejected_token_is_dropped() {
        let api = FakeApi::sample();
        api.sign_in_as(user(7, "esi", false));
        api.set_offline(true);
        let mut session = Session::new();
        session.initialize(&api).await;
        assert!(!session.is_authenticated());
        assert!(!api.has_credentials());
    }

    #[tokio::test]
    async fn login_and_logout() {
        let api = FakeApi::sample();
        let mut session = Session::new();

        let err = session.login(&api, &credentials("wrong")).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated(_)));
        assert!(!session.is_authenticated());

        let user = session.login(&api, &credentials("correct-horse")).await.unwrap();
        assert_eq!(user.username, "esi");
        assert_eq!(session.viewer(), Viewer::Member);
        assert!(matches!(session.require_admin(), Err(Error::Unauthorized(_))));

        session.logout(&api);
        assert!(!session.is_authenticated());
        assert!(!api.has_credentials());
    }
}
