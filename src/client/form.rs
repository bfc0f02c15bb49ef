//! Sign-in / sign-up form state and validation.
//!
//! Validation is a pure function of a field snapshot and the mode. Each pass
//! replaces the whole error map; nothing is patched in place, so errors from
//! the other mode can never linger.

use regex::Regex;
use std::{collections::BTreeMap, fmt};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const PHONE_DIGITS: usize = 10;
pub const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

const EMAIL_PATTERN: &str = r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#;

pub const MSG_EMAIL_REQUIRED: &str = "Email is required";
pub const MSG_EMAIL_INVALID: &str = "Please enter a valid email";
pub const MSG_PHONE_REQUIRED: &str = "Mobile number is required";
pub const MSG_PHONE_INVALID: &str = "Please enter a valid 10-digit mobile number";
pub const MSG_PASSWORD_REQUIRED: &str = "Password is required";
pub const MSG_PASSWORD_LENGTH: &str = "Password must be at least 8 characters";
pub const MSG_PASSWORD_CLASSES: &str =
    "Password must include uppercase, lowercase, a number, and a special character";
pub const MSG_PASSWORD_MISMATCH: &str = "Passwords do not match";
pub const MSG_NAME_REQUIRED: &str = "Name is required";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormMode {
    #[default]
    Login,
    Signup,
}

impl FormMode {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Login => Self::Signup,
            Self::Signup => Self::Login,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field {
    Name,
    Email,
    Phone,
    Password,
    ConfirmPassword,
}

impl Field {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Password => "password",
            Self::ConfirmPassword => "confirmPassword",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
}

impl fmt::Debug for FormFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormFields")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("password", &"[REDACTED]")
            .field("confirm_password", &"[REDACTED]")
            .finish()
    }
}

impl FormFields {
    /// Email as submitted to the provider.
    #[must_use]
    pub fn normalized_email(&self) -> &str {
        self.email.trim()
    }
}

/// Field → message map produced by one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    fn insert(&mut self, field: Field, message: &str) {
        self.0.insert(field, message.to_string());
    }
}

/// Conventional `local@domain.tld` grammar, case-insensitive.
#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(EMAIL_PATTERN).is_ok_and(|regex| regex.is_match(&email.to_lowercase()))
}

#[must_use]
pub fn valid_phone(phone: &str) -> bool {
    phone.len() == PHONE_DIGITS && phone.bytes().all(|byte| byte.is_ascii_digit())
}

/// Which password character classes are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct PasswordStrength {
    pub min_length: bool,
    pub upper: bool,
    pub lower: bool,
    pub digit: bool,
    pub special: bool,
}

impl PasswordStrength {
    #[must_use]
    pub fn of(password: &str) -> Self {
        Self {
            min_length: password.chars().count() >= MIN_PASSWORD_LENGTH,
            upper: password.chars().any(|c| c.is_ascii_uppercase()),
            lower: password.chars().any(|c| c.is_ascii_lowercase()),
            digit: password.chars().any(|c| c.is_ascii_digit()),
            special: password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c)),
        }
    }

    #[must_use]
    pub const fn has_all_classes(self) -> bool {
        self.upper && self.lower && self.digit && self.special
    }
}

/// Run every rule for `mode` against `fields`.
#[must_use]
pub fn validate(mode: FormMode, fields: &FormFields) -> FieldErrors {
    let mut errors = FieldErrors::default();
    let signup = mode == FormMode::Signup;

    let email = fields.normalized_email();
    if email.is_empty() {
        errors.insert(Field::Email, MSG_EMAIL_REQUIRED);
    } else if !valid_email(email) {
        errors.insert(Field::Email, MSG_EMAIL_INVALID);
    }

    if fields.phone.is_empty() {
        if signup {
            errors.insert(Field::Phone, MSG_PHONE_REQUIRED);
        }
    } else if !valid_phone(&fields.phone) {
        errors.insert(Field::Phone, MSG_PHONE_INVALID);
    }

    if fields.password.is_empty() {
        errors.insert(Field::Password, MSG_PASSWORD_REQUIRED);
    } else if signup {
        let strength = PasswordStrength::of(&fields.password);
        if !strength.min_length {
            errors.insert(Field::Password, MSG_PASSWORD_LENGTH);
        } else if !strength.has_all_classes() {
            errors.insert(Field::Password, MSG_PASSWORD_CLASSES);
        }
    }

    if signup && fields.password != fields.confirm_password {
        errors.insert(Field::ConfirmPassword, MSG_PASSWORD_MISMATCH);
    }

    if signup && fields.name.is_empty() {
        errors.insert(Field::Name, MSG_NAME_REQUIRED);
    }

    errors
}

/// Live form: mode, current values, last validation result.
#[derive(Debug, Clone, Default)]
pub struct Form {
    mode: FormMode,
    fields: FormFields,
    errors: FieldErrors,
    show_password: bool,
}

impl Form {
    #[must_use]
    pub fn new(mode: FormMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Pre-filled form, as when values arrive from somewhere other than typing.
    #[must_use]
    pub fn with_fields(mode: FormMode, fields: FormFields) -> Self {
        Self {
            mode,
            fields,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn mode(&self) -> FormMode {
        self.mode
    }

    #[must_use]
    pub const fn fields(&self) -> &FormFields {
        &self.fields
    }

    #[must_use]
    pub const fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    #[must_use]
    pub const fn show_password(&self) -> bool {
        self.show_password
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Name => self.fields.name = value,
            Field::Email => self.fields.email = value,
            Field::Phone => self.fields.phone = value,
            Field::Password => self.fields.password = value,
            Field::ConfirmPassword => self.fields.confirm_password = value,
        }
    }

    pub fn toggle_show_password(&mut self) {
        self.show_password = !self.show_password;
    }

    /// Login ↔ Signup. Always clears values and errors.
    pub fn switch_mode(&mut self) {
        self.set_mode(self.mode.toggled());
    }

    pub fn set_mode(&mut self, mode: FormMode) {
        self.mode = mode;
        self.clear();
    }

    pub fn clear(&mut self) {
        self.fields = FormFields::default();
        self.errors = FieldErrors::default();
        self.show_password = false;
    }

    /// Recompute the error map from the current snapshot. Returns `true` when
    /// the form may be submitted.
    pub fn validate(&mut self) -> bool {
        self.errors = validate(self.mode, &self.fields);
        self.errors.is_empty()
    }
}
