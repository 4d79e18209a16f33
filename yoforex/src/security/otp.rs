use chrono::{DateTime, Utc};
use rand::Rng;

use crate::errors::{AppError, AppResult};
use crate::models::User;

/// A fresh four digit code.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(1000..=9999).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Valid,
    /// Wrong code; the caller records the failed attempt.
    Mismatch,
}

/// Checks `submitted` against the user's pending code.
///
/// Expiry and attempt exhaustion are errors; a wrong code is reported as
/// [`OtpCheck::Mismatch`] so the attempt counter can be bumped before the
/// caller rejects the request.
pub fn check(
    user: &User,
    submitted: &str,
    max_attempts: i32,
    now: DateTime<Utc>,
) -> AppResult<OtpCheck> {
    let (Some(code), Some(expiry)) = (user.otp_code.as_deref(), user.otp_expiry) else {
        return Err(AppError::BadRequest("No OTP pending.".to_string()));
    };

    if user.otp_attempts >= max_attempts {
        return Err(AppError::TooManyRequests(
            "Too many invalid OTP attempts. Request a new code.".to_string(),
        ));
    }

    if now > expiry {
        return Err(AppError::BadRequest("OTP expired.".to_string()));
    }

    if submitted.trim() != code {
        return Ok(OtpCheck::Mismatch);
    }

    Ok(OtpCheck::Valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user_with_otp(code: Option<&str>, expires_in: i64, attempts: i32) -> User {
        let now = Utc::now();
        User {
            id: 1,
            name: "Trader".into(),
            email: "t@example.com".into(),
            phone: "+10000000000".into(),
            password_hash: String::new(),
            is_verified: false,
            otp_code: code.map(str::to_string),
            otp_expiry: code.map(|_| now + Duration::minutes(expires_in)),
            otp_attempts: attempts,
            created_at: now,
        }
    }

    #[test]
    fn codes_have_four_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 4);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }

    #[test]
    fn accepts_matching_code() {
        let user = user_with_otp(Some("1234"), 10, 0);
        assert_eq!(check(&user, "1234", 5, Utc::now()).unwrap(), OtpCheck::Valid);
        assert_eq!(check(&user, "4321", 5, Utc::now()).unwrap(), OtpCheck::Mismatch);
    }

    #[test]
    fn rejects_expired_code() {
        let user = user_with_otp(Some("1234"), -1, 0);
        let err = check(&user, "1234", 5, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "OTP expired."));
    }

    #[test]
    fn locks_after_max_attempts() {
        let user = user_with_otp(Some("1234"), 10, 5);
        assert!(matches!(
            check(&user, "1234", 5, Utc::now()),
            Err(AppError::TooManyRequests(_))
        ));
    }

    #[test]
    fn requires_pending_code() {
        let user = user_with_otp(None, 10, 0);
        assert!(matches!(
            check(&user, "1234", 5, Utc::now()),
            Err(AppError::BadRequest(_))
        ));
    }
}
