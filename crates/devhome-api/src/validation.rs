use devhome_types::api::SignupRequest;

use crate::error::ApiError;

const MIN_AGE: i64 = 18;
const MIN_PASSWORD_LEN: usize = 8;
const GENDERS: [&str; 3] = ["male", "female", "others"];

pub fn validate_signup(req: &SignupRequest) -> Result<(), ApiError> {
    if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
        return Err(ApiError::bad_request("Name is not valid!"));
    }
    if !is_valid_email(&req.email_id) {
        return Err(ApiError::bad_request("Email is not valid!"));
    }
    if !is_strong_password(&req.password) {
        return Err(ApiError::bad_request("Please enter a strong password!"));
    }
    if let Some(age) = req.age {
        validate_age(age)?;
    }
    if let Some(gender) = &req.gender {
        normalize_gender(gender)?;
    }
    Ok(())
}

/// Emails are matched case-insensitively and stored trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && !domain.contains('@')
        && domain
            .split('.')
            .all(|label| !label.is_empty())
        && domain.contains('.')
}

/// At least eight characters with a lowercase letter, an uppercase letter, a digit and a symbol.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_alphanumeric())
}

pub fn validate_age(age: i64) -> Result<i64, ApiError> {
    if age < MIN_AGE {
        return Err(ApiError::bad_request(format!("Age must be at least {MIN_AGE}")));
    }
    Ok(age)
}

pub fn normalize_gender(gender: &str) -> Result<String, ApiError> {
    let gender = gender.trim().to_lowercase();
    if GENDERS.contains(&gender.as_str()) {
        Ok(gender)
    } else {
        Err(ApiError::bad_request("Gender data is not valid"))
    }
}

pub fn validate_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Name is not valid!"));
    }
    Ok(name.to_string())
}
