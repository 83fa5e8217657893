use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use validator::Validate;

use super::password::{hash_password, verify_password};
use super::AccountError;
use crate::db::is_constraint_violation;
use crate::db::models::{Profile, User};
use crate::forms::{non_empty, ProfileForm, RegisterForm};

pub fn find_user(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", User::COLUMNS),
        params![user_id],
        User::from_row,
    )
    .optional()
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE email = ?1", User::COLUMNS),
        params![email.trim()],
        User::from_row,
    )
    .optional()
}

/// Create a guest account with an empty profile.
pub fn register(conn: &mut Connection, form: &RegisterForm) -> Result<User, AccountError> {
    form.validate()?;
    insert_user(conn, &form.email, &form.username, &form.password, false)
}

/// Create an account with staff and superuser rights.
pub fn create_superuser(
    conn: &mut Connection,
    email: &str,
    username: &str,
    password: &str,
) -> Result<User, AccountError> {
    let form = RegisterForm {
        email: email.to_string(),
        username: username.to_string(),
        password: password.to_string(),
        password_confirm: password.to_string(),
    };
    form.validate()?;
    insert_user(conn, email, username, password, true)
}

fn insert_user(
    conn: &mut Connection,
    email: &str,
    username: &str,
    password: &str,
    superuser: bool,
) -> Result<User, AccountError> {
    let email = email.trim();
    let password_hash = hash_password(password)?;
    let id = uuid::Uuid::now_v7().to_string();

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO users (id, email, username, password_hash, is_staff, is_superuser)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![id, email, username.trim(), password_hash, superuser],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            AccountError::EmailTaken
        } else {
            AccountError::Database(e)
        }
    })?;
    tx.execute(
        "INSERT INTO profiles (user_id) VALUES (?1)",
        params![id],
    )?;
    let user = find_user(&tx, &id)?.ok_or(AccountError::NotFound)?;
    tx.commit()?;

    tracing::info!(user_id = %user.id, staff = superuser, "Account created");
    Ok(user)
}

/// The user for a correct email and password. Inactive accounts never
/// authenticate.
pub fn authenticate(
    conn: &Connection,
    email: &str,
    password: &str,
) -> rusqlite::Result<Option<User>> {
    let user = find_user_by_email(conn, email)?;
    Ok(user.filter(|u| u.is_active && verify_password(password, &u.password_hash)))
}

pub fn get_profile(conn: &Connection, user_id: &str) -> rusqlite::Result<Profile> {
    let profile = conn
        .query_row(
            "SELECT user_id, phone_number, address, date_of_birth FROM profiles WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(Profile {
                    user_id: row.get(0)?,
                    phone_number: row.get(1)?,
                    address: row.get(2)?,
                    date_of_birth: row.get(3)?,
                })
            },
        )
        .optional()?;

    Ok(profile.unwrap_or_else(|| Profile {
        user_id: user_id.to_string(),
        ..Profile::default()
    }))
}

pub fn update_profile(
    conn: &Connection,
    user_id: &str,
    form: &ProfileForm,
    today: NaiveDate,
) -> Result<Profile, AccountError> {
    form.validate()?;
    let date_of_birth = form.date_of_birth().map_err(AccountError::Invalid)?;
    if date_of_birth.is_some_and(|dob| dob > today) {
        return Err(AccountError::Invalid(
            "Date of birth cannot be in the future".to_string(),
        ));
    }

    conn.execute(
        "INSERT INTO profiles (user_id, phone_number, address, date_of_birth)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(user_id) DO UPDATE SET
             phone_number = excluded.phone_number,
             address = excluded.address,
             date_of_birth = excluded.date_of_birth",
        params![
            user_id,
            non_empty(&form.phone_number),
            non_empty(&form.address),
            date_of_birth,
        ],
    )?;

    Ok(get_profile(conn, user_id)?)
}
