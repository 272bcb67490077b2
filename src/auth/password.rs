use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::config::PasswordConfig;

pub fn hash_password(cfg: &PasswordConfig, plain: &str) -> anyhow::Result<String> {
    let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None).map_err(|e| {
        error!(error = %e, "argon2 params error");
        anyhow::anyhow!(e.to_string())
    })?;
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Cost parameters are read back from the stored hash.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Runs [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(cfg: PasswordConfig, plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&cfg, &plain)).await?
}

/// Runs [`verify_password`] on the blocking pool.
pub async fn verify_password_blocking(plain: String, hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash)).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn cfg() -> PasswordConfig {
        AppConfig::for_tests().password
    }

    #[test]
    fn hash_is_argon2id_phc_with_configured_cost() {
        let hash = hash_password(&cfg(), "budget-2024").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$m=8,t=1,p=1$"));
        assert!(verify_password("budget-2024", &hash).unwrap());
    }

    #[test]
    fn wrong_password_is_false_not_error() {
        let hash = hash_password(&cfg(), "budget-2024").unwrap();
        assert!(!verify_password("budget-2025", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password(&cfg(), "pw").unwrap();
        let b = hash_password(&cfg(), "pw").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        assert!(verify_password("anything", "plaintext-in-db").is_err());
    }

    #[tokio::test]
    async fn blocking_wrappers_agree() {
        let hash = hash_password_blocking(cfg(), "pw".into()).await.unwrap();
        assert!(verify_password_blocking("pw".into(), hash).await.unwrap());
    }
}
