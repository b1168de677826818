//! Password policy and hashing.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::Rng;
use std::sync::LazyLock;

const MIN_PASSWORD_CHARS: usize = 12;
const MAX_PASSWORD_CHARS: usize = 128;
const SPECIAL_CHARS: [char; 3] = ['$', '&', '!'];

/// Verified in place of a real hash when a login names no account, so an
/// unknown username costs the same argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("coachhub-unknown-account").ok());

/// Check the password policy. Returns the first unmet requirement.
pub fn check_password_requirements(password: &str) -> Result<(), &'static str> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_CHARS..=MAX_PASSWORD_CHARS).contains(&len) {
        return Err("The password length needs to be in between 12 and 128 characters.");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("The password needs at least one digit.");
    }
    if !password.chars().any(char::is_uppercase) {
        return Err("The password needs at least one uppercase letter.");
    }
    if !password.chars().any(char::is_lowercase) {
        return Err("The password needs at least one lowercase letter.");
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(&c)) {
        return Err("The password needs at least one of these characters: \"$\", \"&\", \"!\"");
    }
    Ok(())
}

/// Hash a password into a PHC string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)?;
    let phc = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(phc.to_string())
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Burn one verification against the dummy hash. Always false.
pub fn verify_dummy(password: &str) -> bool {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(hash, password);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_password_accepted() {
        assert_eq!(check_password_requirements("Str0ngPassw0rd!"), Ok(()));
    }

    #[test]
    fn test_length_bounds() {
        assert!(check_password_requirements("Sh0rt!a").is_err());
        assert!(check_password_requirements("Abcdefgh1$jk").is_ok());
        let long = format!("Aa1!{}", "x".repeat(125));
        assert_eq!(long.chars().count(), 129);
        assert!(check_password_requirements(&long).is_err());
    }

    #[test]
    fn test_each_requirement_reported() {
        assert_eq!(
            check_password_requirements("NoDigitsHere!!"),
            Err("The password needs at least one digit.")
        );
        assert_eq!(
            check_password_requirements("nouppercase12!"),
            Err("The password needs at least one uppercase letter.")
        );
        assert_eq!(
            check_password_requirements("NOLOWERCASE12!"),
            Err("The password needs at least one lowercase letter.")
        );
        assert!(
            check_password_requirements("NoSpecialChar12")
                .unwrap_err()
                .contains("at least one of these characters")
        );
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Str0ngPassw0rd!").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "Str0ngPassw0rd!"));
        assert!(!verify_password(&hash, "Str0ngPassw0rd?"));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("Str0ngPassw0rd!").unwrap();
        let b = hash_password("Str0ngPassw0rd!").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_dummy_hash_matches_real_cost() {
        let dummy = DUMMY_HASH.as_deref().unwrap();
        let real = hash_password("Str0ngPassw0rd!").unwrap();
        let dummy = PasswordHash::new(dummy).unwrap();
        let real = PasswordHash::new(&real).unwrap();
        assert_eq!(dummy.algorithm.as_str(), real.algorithm.as_str());
        assert_eq!(dummy.version, real.version);
        assert_eq!(dummy.params.to_string(), real.params.to_string());
    }

    #[test]
    fn test_dummy_verification_always_fails() {
        assert!(!verify_dummy("Str0ngPassw0rd!"));
        assert!(!verify_dummy("coachhub-unknown-account"));
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!verify_password("not-a-phc-string", "anything"));
    }
}
