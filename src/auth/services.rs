use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::dto::UpdateProfileRequest;
use crate::auth::jwt::TokenKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::error::AccountError;
use crate::users::repo::UserStore;
use crate::users::repo_types::{MembershipLevel, ProfileUpdate, User};

const MIN_PASSWORD_LEN: usize = 6;

/// Digits, spaces, +, - and parentheses only.
pub(crate) fn is_valid_phone(phone: &str) -> bool {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^[0-9+\-() ]+$").unwrap();
    }
    PHONE_RE.is_match(phone)
}

/// Composition root: registration, login and profile management over the
/// store, the credential codec and the token keys.
#[derive(Clone)]
pub struct AccountService {
    store: UserStore,
    keys: TokenKeys,
}

impl AccountService {
    pub fn new(store: UserStore, keys: TokenKeys) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(String, User), AccountError> {
        if email.is_empty() {
            warn!("register with empty email");
            return Err(AccountError::InvalidInput("email"));
        }
        if password.len() < MIN_PASSWORD_LEN {
            warn!("register password too short");
            return Err(AccountError::InvalidInput("password"));
        }
        let hash = hash_password(password)?;
        let user = self.store.create_user(email, &hash).await?;
        let token = self.keys.issue(user.id, &user.email)?;
        info!(user_id = %user.id, "user registered");
        Ok((token, user))
    }

    /// Unknown email and wrong password produce the same error.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(String, User), AccountError> {
        let user = match self.store.find_by_email(email).await? {
            Some(u) => u,
            None => {
                warn!("login with unknown email");
                return Err(AccountError::InvalidCredentials);
            }
        };
        if !verify_password(password, &user.password_hash) {
            warn!(user_id = %user.id, "login with invalid password");
            return Err(AccountError::InvalidCredentials);
        }
        let token = self.keys.issue(user.id, &user.email)?;
        info!(user_id = %user.id, "user logged in");
        Ok((token, user))
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<User, AccountError> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or(AccountError::NotFound)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<User, AccountError> {
        let membership_level = match request.membership_level.as_deref() {
            Some(level) => match MembershipLevel::parse(level) {
                Some(parsed) => Some(parsed),
                None => {
                    warn!(level = %level, "unknown membership level");
                    return Err(AccountError::InvalidInput("membershipLevel"));
                }
            },
            None => None,
        };
        if matches!(request.points, Some(p) if p < 0) {
            return Err(AccountError::InvalidInput("points"));
        }
        if let Some(phone) = request.phone.as_deref() {
            if !is_valid_phone(phone) {
                return Err(AccountError::InvalidInput("phone"));
            }
        }
        let update = ProfileUpdate {
            first_name: request.first_name,
            last_name: request.last_name,
            phone: request.phone,
            membership_level,
            points: request.points,
        };
        let user = self
            .store
            .update_profile(user_id, &update)
            .await?
            .ok_or(AccountError::NotFound)?;
        info!(user_id = %user.id, "profile updated");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_service() -> AccountService {
        let dir = std::env::temp_dir().join(format!("memberbase-test-{}", Uuid::new_v4()));
        let store = UserStore::open(&dir).await.expect("open store");
        AccountService::new(store, TokenKeys::new("test-secret"))
    }

    #[tokio::test]
    async fn register_then_login_roundtrip() {
        let service = test_service().await;
        let (token, registered) = service
            .register("a@x.com", "secret1")
            .await
            .expect("register");
        let claims = service.keys().verify(&token).expect("token verifies");
        assert_eq!(claims.sub, registered.id);
        assert_eq!(claims.email, "a@x.com");

        let (fresh, logged_in) = service.login("a@x.com", "secret1").await.expect("login");
        assert_eq!(logged_in.id, registered.id);
        assert_eq!(
            service.keys().verify(&fresh).expect("fresh token").sub,
            registered.id
        );
    }

    #[tokio::test]
    async fn register_validates_input() {
        let service = test_service().await;
        assert!(matches!(
            service.register("", "secret1").await,
            Err(AccountError::InvalidInput("email"))
        ));
        assert!(matches!(
            service.register("a@x.com", "short").await,
            Err(AccountError::InvalidInput("password"))
        ));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let service = test_service().await;
        service
            .register("a@x.com", "secret1")
            .await
            .expect("register");
        let wrong_password = service.login("a@x.com", "wrong-pass").await;
        let unknown_email = service.login("nobody@x.com", "secret1").await;
        assert!(matches!(
            wrong_password,
            Err(AccountError::InvalidCredentials)
        ));
        assert!(matches!(
            unknown_email,
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn concurrent_registration_has_one_winner() {
        let service = test_service().await;
        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.register("race@x.com", "secret1").await
            }));
        }
        let mut created = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.expect("task completes") {
                Ok(_) => created += 1,
                Err(AccountError::DuplicateEmail) => duplicates += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(duplicates, 7);
    }

    #[tokio::test]
    async fn update_profile_validates_fields() {
        let service = test_service().await;
        let (_, user) = service
            .register("a@x.com", "secret1")
            .await
            .expect("register");

        let bad_level = service
            .update_profile(
                user.id,
                UpdateProfileRequest {
                    membership_level: Some("Diamond".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(
            bad_level,
            Err(AccountError::InvalidInput("membershipLevel"))
        ));

        let bad_points = service
            .update_profile(
                user.id,
                UpdateProfileRequest {
                    points: Some(-1),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(
            bad_points,
            Err(AccountError::InvalidInput("points"))
        ));

        let bad_phone = service
            .update_profile(
                user.id,
                UpdateProfileRequest {
                    phone: Some("call me maybe".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(
            bad_phone,
            Err(AccountError::InvalidInput("phone"))
        ));
    }

    #[tokio::test]
    async fn update_profile_of_unknown_user_is_not_found() {
        let service = test_service().await;
        let missing = service
            .update_profile(Uuid::new_v4(), UpdateProfileRequest::default())
            .await;
        assert!(matches!(missing, Err(AccountError::NotFound)));
        assert!(matches!(
            service.profile(Uuid::new_v4()).await,
            Err(AccountError::NotFound)
        ));
    }

    #[tokio::test]
    async fn register_duplicate_then_login_then_update_scenario() {
        let service = test_service().await;

        let (token, user) = service
            .register("a@x.com", "secret1")
            .await
            .expect("register");
        assert!(!token.is_empty());
        assert_eq!(user.membership_level, MembershipLevel::Bronze);
        assert_eq!(user.points, 0);

        assert!(matches!(
            service.register("a@x.com", "secret2").await,
            Err(AccountError::DuplicateEmail)
        ));
        assert!(matches!(
            service.login("a@x.com", "wrong").await,
            Err(AccountError::InvalidCredentials)
        ));

        let (fresh, _) = service.login("a@x.com", "secret1").await.expect("login");
        assert_eq!(service.keys().verify(&fresh).expect("fresh token").sub, user.id);

        let updated = service
            .update_profile(
                user.id,
                UpdateProfileRequest {
                    points: Some(100),
                    membership_level: Some("Gold".into()),
                    ..Default::default()
                },
            )
            .await
            .expect("update profile");
        assert_eq!(updated.points, 100);
        assert_eq!(updated.membership_level, MembershipLevel::Gold);

        let profile = service.profile(user.id).await.expect("profile");
        assert_eq!(profile.points, 100);
        assert_eq!(profile.membership_level, MembershipLevel::Gold);
    }

    #[test]
    fn phone_pattern_is_permissive_but_bounded() {
        assert!(is_valid_phone("+1 (555) 010-2030"));
        assert!(is_valid_phone("5550102030"));
        assert!(!is_valid_phone("555-CALL-NOW"));
        assert!(!is_valid_phone(""));
    }
}
