//! Password strength policy applied at registration.

pub const MIN_PASSWORD_LENGTH: usize = 12;

/// Errors related to password policy validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// Password is too short.
    PasswordTooShort {
        min_length: usize,
        actual_length: usize,
    },
    PasswordMissingUppercase,
    PasswordMissingLowercase,
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
            PolicyError::PasswordMissingLowercase => {
                write!(f, "Password must contain at least one lowercase letter")
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

#[derive(Debug, Clone)]
pub struct PolicyService;

impl PolicyService {
    /// Returns the first rule the password breaks, if any.
    pub fn validate_password(password: &str) -> Result<(), PolicyError> {
        let length = password.chars().count();
        if length < MIN_PASSWORD_LENGTH {
            return Err(PolicyError::PasswordTooShort {
                min_length: MIN_PASSWORD_LENGTH,
                actual_length: length,
            });
        }

        if !password.chars().any(|c| c.is_uppercase()) {
            return Err(PolicyError::PasswordMissingUppercase);
        }

        if !password.chars().any(|c| c.is_lowercase()) {
            return Err(PolicyError::PasswordMissingLowercase);
        }

        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(PolicyError::PasswordMissingNumber);
        }

        if !password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
            return Err(PolicyError::PasswordMissingSpecial);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_strong_password() {
        assert!(PolicyService::validate_password("Forklift#2024").is_ok());
    }

    #[test]
    fn reports_first_failing_rule() {
        assert_eq!(
            PolicyService::validate_password("Sh0rt!"),
            Err(PolicyError::PasswordTooShort {
                min_length: 12,
                actual_length: 6
            })
        );
        assert_eq!(
            PolicyService::validate_password("forklift#2024"),
            Err(PolicyError::PasswordMissingUppercase)
        );
        assert_eq!(
            PolicyService::validate_password("FORKLIFT#2024"),
            Err(PolicyError::PasswordMissingLowercase)
        );
        assert_eq!(
            PolicyService::validate_password("Forklift#Crane"),
            Err(PolicyError::PasswordMissingNumber)
        );
        assert_eq!(
            PolicyService::validate_password("Forklift2024x"),
            Err(PolicyError::PasswordMissingSpecial)
        );
    }
}
