use std::collections::HashSet;

use super::AuthError;

/// Decides whether a verified identity may use the service.
pub trait AccessPolicy: Send + Sync {
    fn check(&self, email: &str) -> Result<(), AuthError>;
}

/// Admits exactly the configured e-mail addresses, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    emails: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

impl AccessPolicy for AllowList {
    fn check(&self, email: &str) -> Result<(), AuthError> {
        if self.emails.contains(&email.trim().to_lowercase()) {
            Ok(())
        } else {
            Err(AuthError::NotAllowed(email.to_string()))
        }
    }
}
