//! User-facing outcome messages.

use serde::{Deserialize, Serialize};

/// Outcome of a register or login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    EmailTaken,
    Registered,
    LoginOk,
    BadCredentials,
}

impl OutcomeKind {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Registered | Self::LoginOk)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailTaken => "email_taken",
            Self::Registered => "registered",
            Self::LoginOk => "login_ok",
            Self::BadCredentials => "bad_credentials",
        }
    }
}

/// Optional per-outcome overrides, as read from the `[messages]` config table
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MessageOverrides {
    #[serde(default)]
    pub email_taken: Option<String>,
    #[serde(default)]
    pub registered: Option<String>,
    #[serde(default)]
    pub login_ok: Option<String>,
    #[serde(default)]
    pub bad_credentials: Option<String>,
}

impl MessageOverrides {
    /// Merge another set of overrides into this one (other takes priority)
    pub fn merge(&mut self, other: MessageOverrides) {
        if other.email_taken.is_some() {
            self.email_taken = other.email_taken;
        }
        if other.registered.is_some() {
            self.registered = other.registered;
        }
        if other.login_ok.is_some() {
            self.login_ok = other.login_ok;
        }
        if other.bad_credentials.is_some() {
            self.bad_credentials = other.bad_credentials;
        }
    }

    pub(crate) fn entries(&self) -> [(OutcomeKind, Option<&str>); 4] {
        [
            (OutcomeKind::EmailTaken, self.email_taken.as_deref()),
            (OutcomeKind::Registered, self.registered.as_deref()),
            (OutcomeKind::LoginOk, self.login_ok.as_deref()),
            (OutcomeKind::BadCredentials, self.bad_credentials.as_deref()),
        ]
    }
}

/// Message table keyed by [`OutcomeKind`]
#[derive(Debug, Clone)]
pub struct Messages {
    email_taken: String,
    registered: String,
    login_ok: String,
    bad_credentials: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            email_taken: "El email ya está registrado".to_string(),
            registered: "Usuario registrado correctamente".to_string(),
            login_ok: "Inicio de sesión exitoso".to_string(),
            bad_credentials: "Email o contraseña incorrectos".to_string(),
        }
    }
}

impl Messages {
    /// Default table with any configured overrides applied
    pub fn with_overrides(overrides: &MessageOverrides) -> Self {
        let mut messages = Self::default();
        for (kind, text) in overrides.entries() {
            if let Some(text) = text {
                *messages.slot_mut(kind) = text.to_string();
            }
        }
        messages
    }

    pub fn get(&self, kind: OutcomeKind) -> &str {
        match kind {
            OutcomeKind::EmailTaken => &self.email_taken,
            OutcomeKind::Registered => &self.registered,
            OutcomeKind::LoginOk => &self.login_ok,
            OutcomeKind::BadCredentials => &self.bad_credentials,
        }
    }

    fn slot_mut(&mut self, kind: OutcomeKind) -> &mut String {
        match kind {
            OutcomeKind::EmailTaken => &mut self.email_taken,
            OutcomeKind::Registered => &mut self.registered,
            OutcomeKind::LoginOk => &mut self.login_ok,
            OutcomeKind::BadCredentials => &mut self.bad_credentials,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_messages() {
        let messages = Messages::default();
        assert_eq!(
            messages.get(OutcomeKind::EmailTaken),
            "El email ya está registrado"
        );
        assert_eq!(
            messages.get(OutcomeKind::BadCredentials),
            "Email o contraseña incorrectos"
        );
    }

    #[test]
    fn test_overrides_replace_only_set_entries() {
        let overrides = MessageOverrides {
            login_ok: Some("Welcome back".to_string()),
            ..Default::default()
        };
        let messages = Messages::with_overrides(&overrides);
        assert_eq!(messages.get(OutcomeKind::LoginOk), "Welcome back");
        assert_eq!(
            messages.get(OutcomeKind::Registered),
            "Usuario registrado correctamente"
        );
    }

    #[test]
    fn test_merge_overrides() {
        let mut base = MessageOverrides {
            registered: Some("ok".to_string()),
            login_ok: Some("hi".to_string()),
            ..Default::default()
        };
        base.merge(MessageOverrides {
            login_ok: Some("hello".to_string()),
            ..Default::default()
        });
        assert_eq!(base.registered.as_deref(), Some("ok"));
        assert_eq!(base.login_ok.as_deref(), Some("hello"));
    }

    #[test]
    fn test_outcome_success() {
        assert!(OutcomeKind::Registered.is_success());
        assert!(OutcomeKind::LoginOk.is_success());
        assert!(!OutcomeKind::EmailTaken.is_success());
        assert!(!OutcomeKind::BadCredentials.is_success());
    }
}
