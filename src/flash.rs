//! One-shot messages carried across a redirect in a short-lived cookie.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::accounts::session::cookie_value;

pub const FLASH_COOKIE: &str = "hotell_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Warning,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Level::Success),
            "warning" => Some(Level::Warning),
            "error" => Some(Level::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: Level,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    pub fn css_class(&self) -> &'static str {
        self.level.as_str()
    }
}

pub fn encode(flashes: &[Flash]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for flash in flashes {
        serializer.append_pair(flash.level.as_str(), &flash.message);
    }
    serializer.finish()
}

pub fn decode(value: &str) -> Vec<Flash> {
    url::form_urlencoded::parse(value.as_bytes())
        .filter_map(|(level, message)| {
            Some(Flash {
                level: Level::parse(&level)?,
                message: message.into_owned(),
            })
        })
        .collect()
}

/// Messages left by the previous response.
#[derive(Debug, Clone, Default)]
pub struct Flashes(pub Vec<Flash>);

impl<S: Send + Sync> FromRequestParts<S> for Flashes {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Flashes(
            cookie_value(&parts.headers, FLASH_COOKIE)
                .map(decode)
                .unwrap_or_default(),
        ))
    }
}

fn flash_cookie(flashes: &[Flash]) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age=60",
        FLASH_COOKIE,
        encode(flashes)
    )
}

pub fn clear_flash_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", FLASH_COOKIE)
}

/// 303 to `to`, leaving `flashes` for the next page.
pub fn redirect_with(to: &str, flashes: &[Flash]) -> Response {
    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, to.to_string()),
            (header::SET_COOKIE, flash_cookie(flashes)),
        ],
    )
        .into_response()
}

/// Render `page`, dropping the flash cookie once its messages are shown.
pub fn consume(flashes: &Flashes, page: impl IntoResponse) -> Response {
    if flashes.0.is_empty() {
        page.into_response()
    } else {
        ([(header::SET_COOKIE, clear_flash_cookie())], page).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_keeps_order_and_text() {
        let flashes = vec![
            Flash::success("Booking confirmed; see you soon!"),
            Flash::warning("We could not send the confirmation email & will retry"),
        ];
        assert_eq!(decode(&encode(&flashes)), flashes);
    }

    #[test]
    fn encoded_value_is_cookie_safe() {
        let value = encode(&[Flash::error("a; b, c=d")]);
        assert!(!value.contains(';'));
        assert!(!value.contains(' '));
        assert!(!value.contains(','));
    }

    #[test]
    fn unknown_levels_are_dropped() {
        assert_eq!(decode("debug=x&success=ok"), vec![Flash::success("ok")]);
    }

    #[test]
    fn redirect_sets_location_and_cookie() {
        let response = redirect_with("/bookings", &[Flash::success("Done")]);
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/bookings");
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("hotell_flash=success=Done"));
    }
}
