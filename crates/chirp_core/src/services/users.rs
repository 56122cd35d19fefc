//! crates/chirp_core/src/services/users.rs
//!
//! Accounts, profiles and the follow graph.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Follow, NewNotification, NewUser, User, UserChanges, UserSummary};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::{CredentialHasher, DatabaseService, PortError};

pub const MIN_PASSWORD_CHARS: usize = 6;

static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("username pattern is valid"));

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// A registration payload with the password still in clear text.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub display_name: Option<String>,
    pub password: String,
}

/// A profile edit with the password (if any) still in clear text.
#[derive(Debug, Clone, Default)]
pub struct ProfileEdit {
    pub email: Option<String>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
    pub banner_image_url: Option<String>,
}

pub fn validate_email(email: &str) -> ServiceResult<()> {
    if EMAIL.is_match(email) {
        Ok(())
    } else {
        Err(ServiceError::bad_request("email must be an email"))
    }
}

pub fn validate_username(username: &str) -> ServiceResult<()> {
    if USERNAME.is_match(username) {
        Ok(())
    } else {
        Err(ServiceError::bad_request(
            "Username can only contain letters, numbers, and underscores",
        ))
    }
}

pub fn validate_password(password: &str) -> ServiceResult<()> {
    if password.chars().count() >= MIN_PASSWORD_CHARS {
        Ok(())
    } else {
        Err(ServiceError::bad_request(format!(
            "password must be longer than or equal to {MIN_PASSWORD_CHARS} characters"
        )))
    }
}

#[derive(Clone)]
pub struct UserService {
    db: Arc<dyn DatabaseService>,
    hasher: Arc<dyn CredentialHasher>,
}

impl UserService {
    pub fn new(db: Arc<dyn DatabaseService>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { db, hasher }
    }

    //=====================================================================================
    // Accounts
    //=====================================================================================

    pub async fn register(&self, registration: Registration) -> ServiceResult<User> {
        validate_email(&registration.email)?;
        validate_username(&registration.username)?;
        validate_password(&registration.password)?;

        self.ensure_email_free(&registration.email, None).await?;
        self.ensure_username_free(&registration.username, None).await?;

        let hashed_password = self.hasher.hash(&registration.password)?;
        let user = self
            .db
            .create_user(NewUser {
                email: registration.email,
                username: registration.username,
                display_name: registration.display_name,
                hashed_password,
            })
            .await
            .map_err(conflict_as_taken)?;
        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Email and password must both match; either mismatch reads the same to the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<User> {
        let invalid = || ServiceError::Unauthorized("Invalid credentials".to_string());
        let credentials = match self.db.get_credentials_by_email(email).await {
            Ok(credentials) => credentials,
            Err(PortError::NotFound(_)) => return Err(invalid()),
            Err(other) => return Err(other.into()),
        };
        if !self.hasher.verify(password, &credentials.hashed_password)? {
            warn!(user_id = %credentials.user.id, "Rejected login with a wrong password");
            return Err(invalid());
        }
        Ok(credentials.user)
    }

    async fn ensure_email_free(&self, email: &str, owner: Option<Uuid>) -> ServiceResult<()> {
        match self.db.find_user_by_email(email).await? {
            Some(existing) if Some(existing.id) != owner => {
                Err(ServiceError::Conflict("Email already exists".to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn ensure_username_free(&self, username: &str, owner: Option<Uuid>) -> ServiceResult<()> {
        match self.db.find_user_by_username(username).await? {
            Some(existing) if Some(existing.id) != owner => {
                Err(ServiceError::Conflict("Username already exists".to_string()))
            }
            _ => Ok(()),
        }
    }

    //=====================================================================================
    // Profiles
    //=====================================================================================

    pub async fn find_all(&self) -> ServiceResult<Vec<User>> {
        Ok(self.db.list_users().await?)
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> ServiceResult<User> {
        self.db.get_user(user_id).await.map_err(|e| match e {
            PortError::NotFound(_) => {
                ServiceError::not_found(format!("User with ID {user_id} not found"))
            }
            other => other.into(),
        })
    }

    pub async fn find_by_username(&self, username: &str) -> ServiceResult<User> {
        self.db
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(format!("User with username {username} not found"))
            })
    }

    /// Users may only edit their own profile.
    pub async fn update(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        edit: ProfileEdit,
    ) -> ServiceResult<User> {
        if actor_id != user_id {
            return Err(ServiceError::Forbidden(
                "You can only update your own profile".to_string(),
            ));
        }
        self.find_by_id(user_id).await?;

        if let Some(email) = &edit.email {
            validate_email(email)?;
            self.ensure_email_free(email, Some(user_id)).await?;
        }
        if let Some(username) = &edit.username {
            validate_username(username)?;
            self.ensure_username_free(username, Some(user_id)).await?;
        }
        let hashed_password = match &edit.password {
            Some(password) => {
                validate_password(password)?;
                Some(self.hasher.hash(password)?)
            }
            None => None,
        };

        let changes = UserChanges {
            email: edit.email,
            username: edit.username,
            display_name: edit.display_name,
            hashed_password,
            bio: edit.bio,
            profile_image_url: edit.profile_image_url,
            banner_image_url: edit.banner_image_url,
        };
        let user = self
            .db
            .update_user(user_id, changes)
            .await
            .map_err(conflict_as_taken)?;
        info!(user_id = %user_id, "Profile updated");
        Ok(user)
    }

    pub async fn remove(&self, actor_id: Uuid, user_id: Uuid) -> ServiceResult<()> {
        if actor_id != user_id {
            return Err(ServiceError::Forbidden(
                "You can only delete your own profile".to_string(),
            ));
        }
        self.find_by_id(user_id).await?;
        self.db.delete_user(user_id).await?;
        info!(user_id = %user_id, "User deleted");
        Ok(())
    }

    //=====================================================================================
    // Follow Graph
    //=====================================================================================

    pub async fn followers(&self, user_id: Uuid) -> ServiceResult<Vec<UserSummary>> {
        self.find_by_id(user_id).await?;
        Ok(self.db.list_followers(user_id).await?)
    }

    pub async fn following(&self, user_id: Uuid) -> ServiceResult<Vec<UserSummary>> {
        self.find_by_id(user_id).await?;
        Ok(self.db.list_following(user_id).await?)
    }

    /// Writes the edge and the FOLLOW notification for `following_id` together.
    pub async fn follow(&self, follower_id: Uuid, following_id: Uuid) -> ServiceResult<Follow> {
        if follower_id == following_id {
            return Err(ServiceError::bad_request("You cannot follow yourself"));
        }
        self.find_by_id(follower_id).await?;
        self.find_by_id(following_id).await?;

        let follow = self
            .db
            .insert_follow(
                follower_id,
                following_id,
                NewNotification::follow(following_id, follower_id),
            )
            .await
            .map_err(|e| match e {
                PortError::Conflict(_) => {
                    ServiceError::Conflict("Already following this user".to_string())
                }
                other => other.into(),
            })?;
        info!(follower_id = %follower_id, following_id = %following_id, "User followed");
        Ok(follow)
    }

    pub async fn unfollow(&self, follower_id: Uuid, following_id: Uuid) -> ServiceResult<()> {
        self.find_by_id(follower_id).await?;
        self.find_by_id(following_id).await?;
        if !self.db.delete_follow(follower_id, following_id).await? {
            return Err(ServiceError::not_found("Not following this user"));
        }
        info!(follower_id = %follower_id, following_id = %following_id, "User unfollowed");
        Ok(())
    }
}

/// A storage-level uniqueness failure that slipped past the pre-checks.
fn conflict_as_taken(err: PortError) -> ServiceError {
    match err {
        PortError::Conflict(_) => {
            ServiceError::Conflict("Email or username already exists".to_string())
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_allow_word_characters_only() {
        assert!(validate_username("john_doe42").is_ok());
        assert!(validate_username("john.doe").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username("jöhn").is_err());
    }

    #[test]
    fn emails_need_a_domain() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("user@example").is_err());
        assert!(validate_email("user example.com").is_err());
    }

    #[test]
    fn passwords_need_six_characters() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }
}
