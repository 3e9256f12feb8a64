//! Registration, login and the current-session record.

use crate::messages::{Messages, OutcomeKind};
use crate::records;
use crate::store::{KeyValueStore, CURRENT_USER_KEY, USERS_KEY};
use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A registered user, as persisted under the `users` key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Creation timestamp in milliseconds, unique across users
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Stored and compared in plaintext
    pub password: String,
    /// Older records may omit it; absent reads as `false`
    #[serde(default)]
    pub is_admin: bool,
}

impl User {
    /// Project to the session record, dropping the password
    pub fn to_session_user(&self) -> SessionUser {
        SessionUser {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            is_admin: self.is_admin,
        }
    }
}

/// The logged-in user, as persisted under the `currentUser` key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

/// Result of a register or login attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip)]
    pub kind: OutcomeKind,
}

impl AuthOutcome {
    fn new(kind: OutcomeKind, messages: &Messages) -> Self {
        Self {
            success: kind.is_success(),
            message: messages.get(kind).to_string(),
            kind,
        }
    }
}

/// Admin rights follow from the name alone
pub fn is_admin_name(name: &str) -> bool {
    name.to_lowercase() == "admin"
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Session manager over a borrowed store
pub struct SessionManager<'a, S: KeyValueStore + ?Sized> {
    store: &'a mut S,
    messages: Messages,
    clock: fn() -> i64,
}

impl<'a, S: KeyValueStore + ?Sized> SessionManager<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self {
            store,
            messages: Messages::default(),
            clock: now_millis,
        }
    }

    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    /// Replace the millisecond clock used for new user ids
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Registered users that decode as [`User`]; records of another shape
    /// are skipped, and a corrupt collection reads as empty
    pub fn users(&self) -> Vec<User> {
        records::load_list(&*self.store, USERS_KEY)
    }

    /// Register a new user.
    ///
    /// The new record is appended to the stored collection as-is, so records
    /// that do not decode as [`User`] are written back untouched.
    pub fn register(&mut self, name: &str, email: &str, password: &str) -> Result<AuthOutcome> {
        let mut stored = records::load_values(&*self.store, USERS_KEY);

        if stored
            .iter()
            .any(|u| u.get("email").and_then(Value::as_str) == Some(email))
        {
            return Ok(AuthOutcome::new(OutcomeKind::EmailTaken, &self.messages));
        }

        let user = User {
            id: self.next_id(&stored),
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            is_admin: is_admin_name(name),
        };
        stored.push(serde_json::to_value(&user)?);
        records::save(&mut *self.store, USERS_KEY, &stored)?;

        Ok(AuthOutcome::new(OutcomeKind::Registered, &self.messages))
    }

    /// Log in with an exact email and password match.
    ///
    /// Unknown email and wrong password yield the same outcome.
    pub fn login(&mut self, email: &str, password: &str) -> Result<AuthOutcome> {
        let users = self.users();
        let Some(user) = users
            .iter()
            .find(|u| u.email == email && u.password == password)
        else {
            return Ok(AuthOutcome::new(OutcomeKind::BadCredentials, &self.messages));
        };

        records::save(&mut *self.store, CURRENT_USER_KEY, &user.to_session_user())?;
        Ok(AuthOutcome::new(OutcomeKind::LoginOk, &self.messages))
    }

    /// Clear the current session; a no-op when nobody is logged in
    pub fn logout(&mut self) -> Result<()> {
        self.store.remove(CURRENT_USER_KEY)
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        records::load(&*self.store, CURRENT_USER_KEY)
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_user().is_some()
    }

    // Millisecond timestamp, bumped past the highest existing id so that two
    // registrations within the same millisecond stay distinct.
    fn next_id(&self, stored: &[Value]) -> i64 {
        let now = (self.clock)();
        let highest = stored
            .iter()
            .filter_map(|u| u.get("id").and_then(Value::as_i64))
            .max();
        match highest {
            Some(max) if max >= now => max + 1,
            _ => now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MessageOverrides;
    use crate::store::MemoryStore;

    fn fixed_clock() -> i64 {
        1_700_000_000_000
    }

    #[test]
    fn test_register_persists_user() {
        let mut store = MemoryStore::new();
        let mut sessions = SessionManager::new(&mut store).with_clock(fixed_clock);

        let outcome = sessions.register("Ana", "ana@example.com", "secret").unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.message, "Usuario registrado correctamente");

        let users = sessions.users();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, fixed_clock());
        assert_eq!(users[0].name, "Ana");
        assert_eq!(users[0].password, "secret");
        assert!(!users[0].is_admin);
    }

    #[test]
    fn test_register_duplicate_email() {
        let mut store = MemoryStore::new();
        let mut sessions = SessionManager::new(&mut store);

        assert!(sessions.register("Ana", "ana@example.com", "a").unwrap().success);
        let outcome = sessions.register("Other", "ana@example.com", "b").unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.kind, OutcomeKind::EmailTaken);
        assert_eq!(outcome.message, "El email ya está registrado");
        assert_eq!(sessions.users().len(), 1);
    }

    #[test]
    fn test_register_email_match_is_case_sensitive() {
        let mut store = MemoryStore::new();
        let mut sessions = SessionManager::new(&mut store);

        sessions.register("Ana", "ana@example.com", "a").unwrap();
        let outcome = sessions.register("Ana", "ANA@example.com", "a").unwrap();
        assert!(outcome.success);
        assert_eq!(sessions.users().len(), 2);
    }

    #[test]
    fn test_register_admin_name_any_case() {
        let mut store = MemoryStore::new();
        let mut sessions = SessionManager::new(&mut store);

        sessions.register("Admin", "a@x.com", "p").unwrap();
        sessions.register("ADMIN", "b@x.com", "p").unwrap();
        sessions.register("administrator", "c@x.com", "p").unwrap();

        let users = sessions.users();
        assert!(users[0].is_admin);
        assert!(users[1].is_admin);
        assert!(!users[2].is_admin);
    }

    #[test]
    fn test_register_ids_stay_unique_within_same_millisecond() {
        let mut store = MemoryStore::new();
        let mut sessions = SessionManager::new(&mut store).with_clock(fixed_clock);

        sessions.register("A", "a@x.com", "p").unwrap();
        sessions.register("B", "b@x.com", "p").unwrap();

        let users = sessions.users();
        assert_eq!(users[0].id, fixed_clock());
        assert_eq!(users[1].id, fixed_clock() + 1);
    }

    #[test]
    fn test_login_stores_session_without_password() {
        let mut store = MemoryStore::new();
        {
            let mut sessions = SessionManager::new(&mut store).with_clock(fixed_clock);
            sessions.register("Ana", "ana@example.com", "secret").unwrap();

            let outcome = sessions.login("ana@example.com", "secret").unwrap();
            assert!(outcome.success);
            assert_eq!(outcome.message, "Inicio de sesión exitoso");
            assert!(sessions.is_logged_in());

            let current = sessions.current_user().unwrap();
            assert_eq!(current.id, fixed_clock());
            assert_eq!(current.email, "ana@example.com");
        }

        let raw = store.get(CURRENT_USER_KEY).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.get("password").is_none());
        assert_eq!(value["isAdmin"], serde_json::json!(false));
        assert_eq!(value["name"], serde_json::json!("Ana"));
    }

    #[test]
    fn test_login_failures_are_indistinguishable() {
        let mut store = MemoryStore::new();
        let mut sessions = SessionManager::new(&mut store);
        sessions.register("Ana", "ana@example.com", "secret").unwrap();

        let wrong_password = sessions.login("ana@example.com", "nope").unwrap();
        let unknown_email = sessions.login("bob@example.com", "secret").unwrap();

        assert!(!wrong_password.success);
        assert_eq!(wrong_password, unknown_email);
        assert_eq!(wrong_password.message, "Email o contraseña incorrectos");
        assert!(!sessions.is_logged_in());
    }

    #[test]
    fn test_logout_is_idempotent() {
        let mut store = MemoryStore::new();
        let mut sessions = SessionManager::new(&mut store);
        sessions.register("Ana", "ana@example.com", "secret").unwrap();
        sessions.login("ana@example.com", "secret").unwrap();

        sessions.logout().unwrap();
        assert!(!sessions.is_logged_in());
        assert!(sessions.current_user().is_none());

        sessions.logout().unwrap();
        assert!(!sessions.is_logged_in());
    }

    #[test]
    fn test_corrupt_records_read_as_absent() {
        let mut store = MemoryStore::new();
        store.set(USERS_KEY, "{broken").unwrap();
        store.set(CURRENT_USER_KEY, "[1, 2]").unwrap();

        let mut sessions = SessionManager::new(&mut store);
        assert!(sessions.users().is_empty());
        assert!(!sessions.is_logged_in());

        // Registering over a corrupt collection starts a fresh one
        assert!(sessions.register("Ana", "ana@example.com", "p").unwrap().success);
        assert_eq!(sessions.users().len(), 1);
    }

    #[test]
    fn test_user_without_admin_flag_can_log_in() {
        let mut store = MemoryStore::new();
        store
            .set(
                USERS_KEY,
                r#"[{"id":1,"name":"Old","email":"old@x.com","password":"p"}]"#,
            )
            .unwrap();

        let mut sessions = SessionManager::new(&mut store);
        assert_eq!(sessions.users().len(), 1);
        assert!(!sessions.users()[0].is_admin);
        assert!(sessions.login("old@x.com", "p").unwrap().success);
    }

    #[test]
    fn test_register_keeps_records_it_cannot_decode() {
        let mut store = MemoryStore::new();
        let legacy = serde_json::json!({
            "id": "legacy-1",
            "name": "Legacy",
            "email": "legacy@x.com",
            "password": "p",
            "avatar": "cat.png"
        });
        let existing = serde_json::json!([
            legacy,
            { "id": 2, "name": "Ok", "email": "ok@x.com", "password": "p", "isAdmin": false }
        ]);
        store.set(USERS_KEY, &existing.to_string()).unwrap();

        {
            let mut sessions = SessionManager::new(&mut store).with_clock(fixed_clock);
            assert_eq!(sessions.users().len(), 1);
            assert!(sessions.login("ok@x.com", "p").unwrap().success);

            assert!(sessions.register("New", "new@x.com", "p").unwrap().success);
            // Emails of undecodable records still count as taken
            let taken = sessions.register("Again", "legacy@x.com", "p").unwrap();
            assert_eq!(taken.kind, OutcomeKind::EmailTaken);

            assert!(sessions.login("ok@x.com", "p").unwrap().success);
            assert_eq!(sessions.users().len(), 2);
        }

        let raw: Vec<Value> = serde_json::from_str(&store.get(USERS_KEY).unwrap()).unwrap();
        assert_eq!(raw.len(), 3);
        assert_eq!(raw[0], legacy);
        assert_eq!(raw[1]["email"], "ok@x.com");
        assert_eq!(raw[2]["email"], "new@x.com");
        assert_eq!(raw[2]["id"], fixed_clock());
    }

    #[test]
    fn test_configured_messages_are_used() {
        let overrides = MessageOverrides {
            bad_credentials: Some("Invalid email or password".to_string()),
            ..Default::default()
        };
        let mut store = MemoryStore::new();
        let mut sessions =
            SessionManager::new(&mut store).with_messages(Messages::with_overrides(&overrides));

        let outcome = sessions.login("nobody@example.com", "x").unwrap();
        assert_eq!(outcome.message, "Invalid email or password");
    }

    #[test]
    fn test_works_through_trait_object() {
        let mut store = MemoryStore::new();
        let dyn_store: &mut dyn KeyValueStore = &mut store;
        let mut sessions = SessionManager::new(dyn_store);
        assert!(sessions.register("Ana", "a@x.com", "p").unwrap().success);
    }
}
