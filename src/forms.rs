//! Form bodies posted by the HTML pages, with their validation rules.

use chrono::NaiveDate;
use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::booking::GuestDetails;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 150, message = "Username must be 1-150 characters"))]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "The two password fields didn't match"))]
    pub password_confirm: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BookingForm {
    #[validate(length(min = 1, max = 100, message = "Guest name must be 1-100 characters"))]
    pub guest_name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(custom(function = "phone_number"))]
    pub phone_number: String,
    pub check_in: String,
    pub check_out: String,
}

impl BookingForm {
    pub fn dates(&self) -> Result<(NaiveDate, NaiveDate), String> {
        Ok((
            parse_date(&self.check_in, "check-in")?,
            parse_date(&self.check_out, "check-out")?,
        ))
    }

    pub fn guest(&self) -> GuestDetails {
        GuestDetails {
            guest_name: self.guest_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone_number: non_empty(&self.phone_number),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileForm {
    #[serde(default)]
    #[validate(custom(function = "phone_number"))]
    pub phone_number: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: String,
    #[serde(default)]
    pub date_of_birth: String,
}

impl ProfileForm {
    pub fn date_of_birth(&self) -> Result<Option<NaiveDate>, String> {
        if self.date_of_birth.trim().is_empty() {
            return Ok(None);
        }
        parse_date(&self.date_of_birth, "date of birth").map(Some)
    }
}

/// Query string of the room search and availability pages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateQuery {
    #[serde(default)]
    pub check_in: Option<String>,
    #[serde(default)]
    pub check_out: Option<String>,
}

impl DateQuery {
    /// Both dates, when both were given and parse.
    pub fn dates(&self) -> Option<Result<(NaiveDate, NaiveDate), String>> {
        let check_in = self.check_in.as_deref().filter(|s| !s.trim().is_empty())?;
        let check_out = self.check_out.as_deref().filter(|s| !s.trim().is_empty())?;
        Some(
            parse_date(check_in, "check-in")
                .and_then(|a| parse_date(check_out, "check-out").map(|b| (a, b))),
        )
    }
}

pub fn parse_date(value: &str, label: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| format!("Enter a valid {} date (YYYY-MM-DD)", label))
}

pub fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Optional phone number: leading `+`, digits, spaces and dashes, with
/// 7 to 15 digits in total. An empty value passes.
pub fn phone_number(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }

    let rest = value.strip_prefix('+').unwrap_or(value);
    let allowed = rest
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '-');
    let digits = rest.chars().filter(|c| c.is_ascii_digit()).count();

    if allowed && (7..=15).contains(&digits) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone_number");
        err.message = Some("Enter a valid phone number".into());
        Err(err)
    }
}

/// Flatten validation errors into messages, sorted by field name.
pub fn error_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid {}", field))
            })
        })
        .collect()
}
