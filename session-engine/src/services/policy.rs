//! Client-side password policy checks.
//!
//! Mirrors the backend's policy so doomed submissions are rejected before
//! a network call is made.

const PASSWORD_MIN_LENGTH: usize = 8;

/// Errors related to password policy validation.
#[derive(Debug, Clone)]
pub enum PolicyError {
    PasswordTooShort {
        min_length: usize,
        actual_length: usize,
    },
    PasswordMissingUppercase,
    PasswordMissingNumber,
    PasswordMissingSpecial,
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyError::PasswordTooShort {
                min_length,
                actual_length,
            } => {
                write!(
                    f,
                    "Password must be at least {} characters (got {})",
                    min_length, actual_length
                )
            }
            PolicyError::PasswordMissingUppercase => {
                write!(f, "Password must contain at least one uppercase letter")
            }
            PolicyError::PasswordMissingNumber => {
                write!(f, "Password must contain at least one number")
            }
            PolicyError::PasswordMissingSpecial => {
                write!(f, "Password must contain at least one special character")
            }
        }
    }
}

impl std::error::Error for PolicyError {}

/// Validate a password against the default policy. Returns the first
/// violation found.
pub fn validate_password(password: &str) -> Result<(), PolicyError> {
    if password.len() < PASSWORD_MIN_LENGTH {
        return Err(PolicyError::PasswordTooShort {
            min_length: PASSWORD_MIN_LENGTH,
            actual_length: password.len(),
        });
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PolicyError::PasswordMissingUppercase);
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PolicyError::PasswordMissingNumber);
    }

    if !password.chars().any(|c| {
        matches!(
            c,
            '!' | '@'
                | '#'
                | '$'
                | '%'
                | '^'
                | '&'
                | '*'
                | '('
                | ')'
                | '-'
                | '_'
                | '='
                | '+'
                | '['
                | ']'
                | '{'
                | '}'
        )
    }) {
        return Err(PolicyError::PasswordMissingSpecial);
    }

    Ok(())
}

/// OTP codes are exactly six ASCII digits.
pub fn is_valid_otp(code: &str) -> bool {
    code.len() == 6 && code.chars().all(|c| c.is_ascii_digit())
}
