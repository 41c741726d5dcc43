//! # Validation Module
//!
//! Input validation for store actions and the offline address check.
//!
//! ## Usage
//! ```rust
//! use hearth_core::validation::{validate_address_basic, validate_message_content};
//!
//! assert!(validate_address_basic("12 King Street, London").is_ok());
//! assert!(validate_address_basic("abc").is_err());
//! assert!(validate_message_content("Is the stew spicy?").is_ok());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::MAX_MESSAGE_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Address Heuristic
// =============================================================================

/// Shortest text accepted as an address.
const MIN_ADDRESS_LENGTH: usize = 5;

/// Words that mark a street line. Matched per token, case-insensitive.
const STREET_WORDS: &[&str] = &[
    "street", "st", "road", "rd", "avenue", "ave", "lane", "ln", "drive", "dr", "boulevard",
    "blvd", "way", "court", "ct", "place", "pl", "close", "crescent", "terrace", "square", "sq",
    "highway", "hwy", "parkway", "pkwy", "row", "mews", "grove", "gardens", "hill", "walk",
];

fn has_street_word(text: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .any(|token| {
            let token = token.to_lowercase();
            STREET_WORDS.contains(&token.as_str())
        })
}

/// Offline address check, used when the geocoder cannot be reached.
///
/// ## Rules
/// - At least 5 characters after trimming
/// - Contains at least one letter
/// - Contains a digit (house number, postcode) or a street word
///
/// ## Example
/// ```rust
/// use hearth_core::validation::validate_address_basic;
///
/// assert!(validate_address_basic("Baker Street").is_ok());
/// assert!(validate_address_basic("221B").is_err()); // too short
/// assert!(validate_address_basic("somewhere nice").is_err());
/// ```
pub fn validate_address_basic(address: &str) -> ValidationResult<()> {
    let address = address.trim();

    if address.is_empty() {
        return Err(ValidationError::Required {
            field: "address".to_string(),
        });
    }

    if address.chars().count() < MIN_ADDRESS_LENGTH {
        return Err(ValidationError::TooShort {
            field: "address".to_string(),
            min: MIN_ADDRESS_LENGTH,
        });
    }

    if !address.chars().any(char::is_alphabetic) {
        return Err(ValidationError::InvalidFormat {
            field: "address".to_string(),
            reason: "must contain a street or place name".to_string(),
        });
    }

    let has_digit = address.chars().any(|c| c.is_ascii_digit());
    if !has_digit && !has_street_word(address) {
        return Err(ValidationError::InvalidFormat {
            field: "address".to_string(),
            reason: "must include a house number or street name".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Messaging
// =============================================================================

/// Validates chat message content.
///
/// ## Returns
/// The trimmed content.
pub fn validate_message_content(content: &str) -> ValidationResult<String> {
    let content = content.trim();

    if content.is_empty() {
        return Err(ValidationError::Required {
            field: "content".to_string(),
        });
    }

    if content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "content".to_string(),
            max: MAX_MESSAGE_LENGTH,
        });
    }

    Ok(content.to_string())
}

// =============================================================================
// Money
// =============================================================================

/// Validates a payment or top-up amount.
pub fn validate_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Verification Targets
// =============================================================================

/// Validates an email address shape: `local@domain.tld`, no spaces.
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    let (local, domain) = email.split_once('@').ok_or_else(|| invalid("missing @"))?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid("malformed local part"));
    }

    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && tld.len() >= 2 => Ok(email.to_lowercase()),
        _ => Err(invalid("malformed domain")),
    }
}

/// Validates a phone number and returns it in `+digits` form.
///
/// Spaces, dashes, dots and parentheses are stripped; 7 to 15 digits remain.
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    let (plus, rest) = match phone.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, phone),
    };

    let mut digits = String::with_capacity(rest.len());
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => {
                return Err(ValidationError::InvalidFormat {
                    field: "phone".to_string(),
                    reason: format!("unexpected character '{}'", c),
                })
            }
        }
    }

    if !(7..=15).contains(&digits.len()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must have between 7 and 15 digits".to_string(),
        });
    }

    Ok(if plus { format!("+{}", digits) } else { digits })
}
