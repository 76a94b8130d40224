//! Explicit session context threaded through command handlers: established
//! from the profiles table, dropped at process exit. No global auth state.

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use crate::model::{Role, UserProfile};
use crate::util::sha256_hex;

#[derive(Debug, Clone)]
pub struct Session {
    pub profile: UserProfile,
}

impl Session {
    pub fn establish(connection: &Connection, email: &str) -> Result<Self> {
        let profile = load_profile(connection, email)?
            .with_context(|| format!("no profile found for {email}"))?;

        info!(
            email = %profile.email,
            role = profile.role.as_str(),
            "session established"
        );

        Ok(Self { profile })
    }

    pub fn role(&self) -> Role {
        self.profile.role
    }

    pub fn require_writer(&self) -> Result<()> {
        if self.role() == Role::ReadOnly {
            bail!(
                "profile {} has the Read-only role and cannot modify data",
                self.profile.email
            );
        }
        Ok(())
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.role() != Role::Admin {
            bail!(
                "profile {} has role {} but Admin is required",
                self.profile.email,
                self.role().as_str()
            );
        }
        Ok(())
    }
}

/// Establishes a session when an acting profile was named; commands run
/// unauthenticated otherwise (local single-user mode).
pub fn establish_optional(connection: &Connection, email: Option<&str>) -> Result<Option<Session>> {
    email
        .map(|value| Session::establish(connection, value))
        .transpose()
}

pub fn establish_required(
    connection: &Connection,
    email: Option<&str>,
    reason: &str,
) -> Result<Session> {
    let email = email.with_context(|| reason.to_string())?;
    Session::establish(connection, email)
}

/// Stable profile id derived from the email address.
pub fn profile_id_for(email: &str) -> String {
    let digest = sha256_hex(email.trim().to_lowercase().as_bytes());
    format!("u-{}", &digest[..16])
}

pub fn load_profile(connection: &Connection, email: &str) -> Result<Option<UserProfile>> {
    let mut statement = connection.prepare(
        "SELECT user_id, name, email, role, created_at, photo_url
         FROM profiles WHERE email = ?1",
    )?;

    let raw = statement
        .query_row([email], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })
        .optional()?;

    let Some((user_id, name, email, role, created_at, photo_url)) = raw else {
        return Ok(None);
    };

    Ok(Some(UserProfile {
        user_id,
        name,
        email,
        role: Role::from_db(&role)?,
        created_at,
        photo_url,
    }))
}

pub fn save_profile(connection: &Connection, profile: &UserProfile) -> Result<()> {
    connection
        .execute(
            "INSERT INTO profiles(user_id, name, email, role, created_at, photo_url)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id) DO UPDATE SET
               name=excluded.name,
               email=excluded.email,
               role=excluded.role,
               photo_url=excluded.photo_url",
            params![
                profile.user_id,
                profile.name,
                profile.email,
                profile.role.as_str(),
                profile.created_at,
                profile.photo_url
            ],
        )
        .with_context(|| format!("failed to save profile for {}", profile.email))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_database;
    use crate::util::now_utc_string;

    fn test_profile(email: &str, role: Role) -> UserProfile {
        UserProfile {
            user_id: profile_id_for(email),
            name: "Test User".to_string(),
            email: email.to_string(),
            role,
            created_at: now_utc_string(),
            photo_url: None,
        }
    }

    #[test]
    fn profile_round_trips_through_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let connection = open_database(&dir.path().join("db.sqlite")).expect("open");

        let profile = test_profile("ana@example.com", Role::Qa);
        save_profile(&connection, &profile).expect("save");

        let loaded = load_profile(&connection, "ana@example.com")
            .expect("load")
            .expect("profile present");
        assert_eq!(loaded.user_id, profile.user_id);
        assert_eq!(loaded.role, Role::Qa);
        assert!(load_profile(&connection, "nobody@example.com")
            .expect("load")
            .is_none());
    }

    #[test]
    fn session_gates_by_role() {
        let dir = tempfile::tempdir().expect("tempdir");
        let connection = open_database(&dir.path().join("db.sqlite")).expect("open");

        save_profile(&connection, &test_profile("ro@example.com", Role::ReadOnly)).expect("save");
        save_profile(&connection, &test_profile("qa@example.com", Role::Qa)).expect("save");

        let read_only = Session::establish(&connection, "ro@example.com").expect("session");
        assert!(read_only.require_writer().is_err());

        let qa = Session::establish(&connection, "qa@example.com").expect("session");
        assert!(qa.require_writer().is_ok());
        assert!(qa.require_admin().is_err());
    }

    #[test]
    fn establish_fails_fast_for_unknown_profile() {
        let dir = tempfile::tempdir().expect("tempdir");
        let connection = open_database(&dir.path().join("db.sqlite")).expect("open");
        assert!(Session::establish(&connection, "ghost@example.com").is_err());
    }

    #[test]
    fn profile_ids_are_stable_and_case_insensitive() {
        assert_eq!(profile_id_for("A@x.com"), profile_id_for("a@x.com"));
        assert_ne!(profile_id_for("a@x.com"), profile_id_for("b@x.com"));
    }
}
