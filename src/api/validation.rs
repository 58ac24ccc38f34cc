use lettre::Address;

use crate::domain::{FieldErrors, NON_FIELD_ERRORS};
use crate::services::{ProfileUpdate, Registration};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const PASSWORDS_DONT_MATCH: &str = "Passwords don't match";
pub const MAX_CONTACT_LENGTH: usize = 32;
pub const MAX_NAME_LENGTH: usize = 255;

/// Raw registration fields as they arrived in the request body.
#[derive(Debug, Default)]
pub struct RegistrationInput<'a> {
    pub email: Option<&'a str>,
    pub name: Option<&'a str>,
    pub contact: Option<&'a str>,
    pub password: Option<&'a str>,
    pub password2: Option<&'a str>,
}

/// Lowercases the domain part, keeps the local part as typed.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Accepts whatever `lettre` can address a message to.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    email.parse::<Address>().is_ok()
}

fn required<'a>(errors: &mut FieldErrors, field: &str, value: Option<&'a str>) -> Option<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            errors.add(field, REQUIRED);
            None
        }
    }
}

/// Passwords are not trimmed.
fn required_password<'a>(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&'a str>,
) -> Option<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            errors.add(field, REQUIRED);
            None
        }
    }
}

fn check_contact(errors: &mut FieldErrors, contact: &str) {
    if contact.chars().count() > MAX_CONTACT_LENGTH {
        errors.add(
            "contact",
            format!("Ensure this field has no more than {MAX_CONTACT_LENGTH} characters."),
        );
    }
}

fn check_name(errors: &mut FieldErrors, name: &str) {
    if name.chars().count() > MAX_NAME_LENGTH {
        errors.add(
            "name",
            format!("Ensure this field has no more than {MAX_NAME_LENGTH} characters."),
        );
    }
}

pub fn validate_registration(
    input: &RegistrationInput<'_>,
    min_password_length: usize,
) -> Result<Registration, FieldErrors> {
    let mut errors = FieldErrors::new();

    let email = required(&mut errors, "email", input.email).map(normalize_email);
    if let Some(email) = &email
        && !is_valid_email(email)
    {
        errors.add("email", INVALID_EMAIL);
    }

    let name = required(&mut errors, "name", input.name);
    if let Some(name) = name {
        check_name(&mut errors, name);
    }

    let contact = input.contact.map(str::trim).unwrap_or_default();
    check_contact(&mut errors, contact);

    let password = required_password(&mut errors, "password", input.password);
    let password2 = required_password(&mut errors, "password2", input.password2);

    if let Some(password) = password
        && password.chars().count() < min_password_length
    {
        errors.add(
            "password",
            format!("Ensure this field has at least {min_password_length} characters."),
        );
    }

    if let (Some(a), Some(b)) = (password, password2)
        && a != b
    {
        errors.add(NON_FIELD_ERRORS, PASSWORDS_DONT_MATCH);
    }

    match (email, name, password) {
        (Some(email), Some(name), Some(password)) if errors.is_empty() => Ok(Registration {
            email,
            name: name.to_string(),
            contact: contact.to_string(),
            password: password.to_string(),
        }),
        _ => Err(errors),
    }
}

/// Returns the normalized email and the password.
pub fn validate_login<'a>(
    email: Option<&'a str>,
    password: Option<&'a str>,
) -> Result<(String, &'a str), FieldErrors> {
    let mut errors = FieldErrors::new();
    let email = required(&mut errors, "email", email).map(normalize_email);
    let password = required_password(&mut errors, "password", password);

    match (email, password) {
        (Some(email), Some(password)) => Ok((email, password)),
        _ => Err(errors),
    }
}

pub fn validate_profile_update(
    name: Option<&str>,
    contact: Option<&str>,
) -> Result<ProfileUpdate, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = name.map(str::trim);
    if let Some(name) = name {
        if name.is_empty() {
            errors.add("name", "This field may not be blank.");
        } else {
            check_name(&mut errors, name);
        }
    }

    let contact = contact.map(str::trim);
    if let Some(contact) = contact {
        check_contact(&mut errors, contact);
    }

    errors.into_result()?;

    Ok(ProfileUpdate {
        name: name.map(str::to_string),
        contact: contact.map(str::to_string),
    })
}
