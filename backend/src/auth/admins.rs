use uuid::Uuid;

use super::models::Admin;
use super::password::{self, PasswordError};
use crate::db::repository::{Collection, FreshnessRepository, RepositoryError};

const GENERATED_PASSWORD_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Failed to hash admin password: {0}")]
    Hashing(PasswordError),
    #[error("Stored password hash for {email} is unusable: {source}")]
    StoredHash {
        email: String,
        source: PasswordError,
    },
}

pub fn new_admin_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("ADM{}", &id[..8])
}

/// Creates the first admin account when the admins collection is empty.
///
/// Returns the created admin, or `None` when admins already exist.
pub async fn seed_default_admin(
    repo: &dyn FreshnessRepository,
    email: &str,
    password: Option<&str>,
) -> Result<Option<Admin>, AdminError> {
    if repo.count(Collection::Admins).await? > 0 {
        log::debug!("Admins present, skipping default admin creation");
        return Ok(None);
    }

    let password = match password {
        Some(password) => password.to_string(),
        None => {
            let generated = password::generate_password(GENERATED_PASSWORD_LEN);
            log::warn!(
                "DEFAULT_ADMIN_PASSWORD not set; generated password for {}: {}",
                email,
                generated
            );
            generated
        }
    };

    let admin = Admin {
        admin_id: new_admin_id(),
        email: email.to_string(),
        password_hash: password::hash_password(&password).map_err(AdminError::Hashing)?,
    };
    repo.insert_admin(&admin).await?;
    log::info!("Default admin account created: {} ({})", admin.email, admin.admin_id);
    Ok(Some(admin))
}

/// Looks up an admin by email and checks the password against the stored bcrypt hash.
pub async fn authenticate(
    repo: &dyn FreshnessRepository,
    email: &str,
    password: &str,
) -> Result<Option<Admin>, AdminError> {
    let Some(admin) = repo.find_admin_by_email(email).await? else {
        return Ok(None);
    };
    let matches = password::verify_password(password, &admin.password_hash).map_err(|source| {
        AdminError::StoredHash {
            email: admin.email.clone(),
            source,
        }
    })?;
    Ok(matches.then_some(admin))
}
