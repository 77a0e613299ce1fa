use argon2::{
    password_hash::{rand_core::OsRng, Result as HashResult, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use tracing::debug;

pub(crate) fn hash_password(password: &str) -> HashResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string();
    Ok(password_hash)
}

pub(crate) fn verify_password(password: &str, password_hash: &str) -> HashResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)?;
    let res = Argon2::default().verify_password(password.as_bytes(), &parsed_hash);
    if let Err(e) = res {
        debug!("Invalid password, error {e}");
    }
    Ok(res.is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_roundtrip() {
        let hash = hash_password("opensesame").unwrap();
        assert!(verify_password("opensesame", &hash).unwrap());
        assert!(!verify_password("closesesame", &hash).unwrap());
    }
}
