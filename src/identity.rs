//! Contributor identity normalization.
//!
//! People commit under several spellings of their name and from several
//! email addresses. The [`Normalizer`] folds those onto one canonical display
//! name using a static alias table loaded once per run.

use std::collections::HashMap;

/// Returned when neither a name nor an email is available.
pub const UNRESOLVED: &str = "Unknown";

/// Immutable alias table: email → canonical name and name → canonical name.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    emails: HashMap<String, String>,
    names: HashMap<String, String>,
    names_lower: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(alias, canonical)` pairs. Aliases containing `@` are
    /// email aliases and match case-insensitively.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut table = Self::new();
        for (alias, canonical) in pairs {
            let alias = alias.as_ref().trim();
            let canonical = canonical.into();
            if alias.is_empty() {
                continue;
            }
            if alias.contains('@') {
                table.emails.insert(alias.to_lowercase(), canonical);
            } else {
                table.names.insert(alias.to_string(), canonical.clone());
                table.names_lower.insert(alias.to_lowercase(), canonical);
            }
        }
        table
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.emails.len() + self.names.len()
    }

    fn by_email(&self, email: &str) -> Option<&str> {
        self.emails.get(&email.to_lowercase()).map(String::as_str)
    }

    fn by_name(&self, name: &str) -> Option<&str> {
        self.names
            .get(name)
            .or_else(|| self.names_lower.get(&name.to_lowercase()))
            .map(String::as_str)
    }
}

/// Append-only email → platform user id cache, scoped to one run.
///
/// Entries are never overwritten: the first id recorded for an email wins.
#[derive(Debug, Clone, Default)]
pub struct IdentityCache {
    ids: HashMap<String, u64>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an id for `email`, returning the id that is now cached.
    pub fn record(&mut self, email: &str, id: u64) -> u64 {
        if email.is_empty() {
            return id;
        }
        *self.ids.entry(email.to_lowercase()).or_insert(id)
    }

    pub fn get(&self, email: &str) -> Option<u64> {
        self.ids.get(&email.to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Resolves raw author strings to canonical contributor names.
#[derive(Debug)]
pub struct Normalizer<'a> {
    aliases: &'a AliasTable,
    cache: IdentityCache,
}

impl<'a> Normalizer<'a> {
    pub fn new(aliases: &'a AliasTable) -> Self {
        Self::with_cache(aliases, IdentityCache::new())
    }

    pub fn with_cache(aliases: &'a AliasTable, cache: IdentityCache) -> Self {
        Self { aliases, cache }
    }

    /// Resolve `(name, email)` to a canonical name. Never fails.
    ///
    /// Order: email alias, name alias (exact then case-insensitive), email
    /// local-part alias, the "email starts with the name" heuristic, and
    /// finally the raw name.
    pub fn normalize(&self, name: &str, email: &str) -> String {
        let name = name.trim();
        let email = email.trim();

        if name.is_empty() && email.is_empty() {
            return UNRESOLVED.to_string();
        }

        if !email.is_empty() {
            if let Some(canonical) = self.aliases.by_email(email) {
                return canonical.to_string();
            }
        }

        if !name.is_empty() {
            if let Some(canonical) = self.aliases.by_name(name) {
                return canonical.to_string();
            }
        }

        if !email.is_empty() {
            let local = email.split('@').next().unwrap_or_default();
            if let Some(canonical) = self.aliases.by_name(local) {
                return canonical.to_string();
            }

            if !name.is_empty() && local_part_matches_name(local, name) {
                return name.to_string();
            }
        }

        if name.is_empty() {
            email.to_string()
        } else {
            name.to_string()
        }
    }

    /// Remember the platform id seen for an email.
    pub fn remember_id(&mut self, email: &str, id: u64) -> u64 {
        self.cache.record(email, id)
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    pub fn into_cache(self) -> IdentityCache {
        self.cache
    }
}

/// `jane.smith@…` or `janesmith@…` for the name "Jane Smith".
fn local_part_matches_name(local: &str, name: &str) -> bool {
    let local = local.to_lowercase();
    let name = name.to_lowercase();
    local.starts_with(&name.replace(' ', ".")) || local.starts_with(&name.replace(' ', ""))
}
