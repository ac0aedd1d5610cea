//! Email allow-list used to gate access to the admin panel.
//!
//! An entry is either a full address (`alice@example.com`) or a domain
//! wildcard (`@example.com`). Wildcards are matched as a suffix that includes
//! the `@`, so `@example.com` never matches `userexample.com`.

/// Check `email` against an allow-list of raw entries.
///
/// Builds an [`AllowList`] on every call; keep one around when the list comes
/// from configuration and is checked repeatedly.
pub fn is_authorized<S: AsRef<str>>(email: &str, allow_list: &[S]) -> bool {
    AllowList::new(allow_list.iter()).is_authorized(email)
}

fn entry_matches(email: &str, entry: &str) -> bool {
    if entry.starts_with('@') {
        email.ends_with(entry)
    } else {
        email == entry
    }
}

/// Normalized allow-list loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    entries: Vec<String>,
}

impl AllowList {
    /// Build a list from individual entries, normalizing each one.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|e| e.as_ref().trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { entries }
    }

    /// Parse a comma-separated configuration value such as
    /// `"@acme.com, Bob@Other.com"`.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    /// Read and parse an environment variable. A missing variable yields an
    /// empty list, which denies everyone.
    pub fn from_env(var: &str) -> Self {
        match std::env::var(var) {
            Ok(raw) => Self::parse(&raw),
            Err(_) => Self::default(),
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decide whether `email` may access the admin panel.
    pub fn is_authorized(&self, email: &str) -> bool {
        if self.entries.is_empty() {
            tracing::warn!("No authorized emails configured");
            return false;
        }

        let email = email.to_lowercase();
        self.entries.iter().any(|entry| entry_matches(&email, entry))
    }
}
