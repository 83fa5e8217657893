use axum::http::{header, HeaderMap};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::User;

/// Create a new session for a user. Returns the session token.
pub fn create_session(conn: &Connection, user_id: &str, hours: u64) -> rusqlite::Result<String> {
    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Delete a session by token.
pub fn delete_session(conn: &Connection, token: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// The active user behind an unexpired session token.
pub fn user_for_token(conn: &Connection, token: &str) -> rusqlite::Result<Option<User>> {
    let columns = User::COLUMNS
        .split(", ")
        .map(|c| format!("u.{}", c))
        .collect::<Vec<_>>()
        .join(", ");
    conn.query_row(
        &format!(
            "SELECT {} FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token = ?1 AND s.expires_at > datetime('now') AND u.is_active = 1",
            columns
        ),
        params![token],
        User::from_row,
    )
    .optional()
}

pub fn purge_expired(conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM sessions WHERE expires_at <= datetime('now')",
        [],
    )
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// -- Cookie helpers --

pub fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

pub fn clear_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_conn;
    use axum::http::HeaderValue;

    fn insert_user(conn: &Connection, id: &str, active: bool) {
        conn.execute(
            "INSERT INTO users (id, email, username, password_hash, is_active)
             VALUES (?1, ?2, ?1, 'x', ?3)",
            params![id, format!("{}@example.com", id), active],
        )
        .unwrap();
    }

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        let t1 = generate_token();
        let t2 = generate_token();
        assert_ne!(t1, t2);
    }

    #[test]
    fn session_resolves_to_its_user_until_deleted() {
        let conn = test_conn();
        insert_user(&conn, "u1", true);

        let token = create_session(&conn, "u1", 1).unwrap();
        let user = user_for_token(&conn, &token).unwrap().unwrap();
        assert_eq!(user.id, "u1");

        delete_session(&conn, &token).unwrap();
        assert!(user_for_token(&conn, &token).unwrap().is_none());
    }

    #[test]
    fn expired_sessions_are_ignored_and_purged() {
        let conn = test_conn();
        insert_user(&conn, "u1", true);
        conn.execute(
            "INSERT INTO sessions (id, user_id, token, expires_at)
             VALUES ('s1', 'u1', 'old', datetime('now', '-1 hours'))",
            [],
        )
        .unwrap();

        assert!(user_for_token(&conn, "old").unwrap().is_none());
        assert_eq!(purge_expired(&conn).unwrap(), 1);
    }

    #[test]
    fn inactive_users_have_no_session() {
        let conn = test_conn();
        insert_user(&conn, "u1", false);
        let token = create_session(&conn, "u1", 1).unwrap();
        assert!(user_for_token(&conn, &token).unwrap().is_none());
    }

    #[test]
    fn cookie_value_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; hotell_session=abc123; other=1"),
        );
        assert_eq!(cookie_value(&headers, "hotell_session"), Some("abc123"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn cookies_carry_name_and_lifetime() {
        assert_eq!(
            session_cookie("hotell_session", "tok", 2),
            "hotell_session=tok; HttpOnly; SameSite=Lax; Path=/; Max-Age=7200"
        );
        assert!(clear_cookie("hotell_session").contains("Max-Age=0"));
    }
}
