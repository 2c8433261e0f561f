use crate::{
    db::{is_unique_violation, Repository},
    errors::AppError,
    structs::Seller,
    utils::{self, MAX_PASSWORD_LEN},
};

/// Registration and password checks on top of the seller table.
pub struct CredentialStore<'a> {
    repo: &'a Repository,
}

impl<'a> CredentialStore<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        CredentialStore { repo }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<Seller, AppError> {
        utils::require_non_blank("Username", username)?;
        if password.is_empty() {
            return Err(AppError::validation("Password is required"));
        }
        if password.chars().count() > MAX_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "Password must be at most {} characters long",
                MAX_PASSWORD_LEN
            )));
        }

        if self.repo.find_seller_by_username(username).await?.is_some() {
            log::info!("Registration rejected, username taken: {}", username);
            return Err(AppError::DuplicateUsername);
        }

        let password = password.to_owned();
        let pwd_hash =
            tokio::task::spawn_blocking(move || utils::hash_password(&password)).await??;

        match self.repo.insert_seller(username, &pwd_hash).await {
            Ok(seller) => Ok(seller),
            // lost a race with a concurrent registration of the same name
            Err(e) if is_unique_violation(&e) => Err(AppError::DuplicateUsername),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the seller when the password matches. Unknown usernames and
    /// wrong passwords both yield `AuthenticationFailure`.
    pub async fn verify(&self, username: &str, password: &str) -> Result<Seller, AppError> {
        let Some(seller) = self.repo.find_seller_by_username(username).await? else {
            log::info!("Login failed for unknown username: {}", username);
            return Err(AppError::AuthenticationFailure);
        };

        let provided = password.to_owned();
        let stored = seller.password_hash.clone();
        let matches =
            tokio::task::spawn_blocking(move || utils::verify_password(&provided, &stored))
                .await??;

        if matches {
            log::info!("Login succeeded for {}", seller.username);
            Ok(seller)
        } else {
            log::info!("Login failed for {}", seller.username);
            Err(AppError::AuthenticationFailure)
        }
    }
}
