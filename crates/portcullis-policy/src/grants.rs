//! The deduplicated, precompiled set of granted permission keys.
//!
//! `PermissionSet` is built either from the policies an identity source
//! returns, or from the key strings a previous session persisted. Each
//! distinct key is parsed and its object pattern compiled once, so
//! `permits()` never re-parses grants.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use portcullis_contracts::policy::Policy;

use crate::key::{build_key, PermissionKey};
use crate::pattern::ObjectPattern;

#[derive(Debug, Clone)]
struct Grant {
    key: PermissionKey,
    pattern: ObjectPattern,
}

impl Grant {
    fn compile(stored: &str) -> Self {
        let key = PermissionKey::parse(stored);
        let pattern = ObjectPattern::compile(&key.object);
        Self { key, pattern }
    }

    fn covers(&self, required: &PermissionKey) -> bool {
        (self.key.is_any_action() || self.key.action == required.action)
            && self.pattern.matches(&required.object)
    }
}

/// A set of granted permission keys, ready for matching.
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    grants: BTreeMap<String, Grant>,
}

impl PermissionSet {
    /// An empty set: denies everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the canonical key of every policy and keep the distinct ones.
    ///
    /// Policies with an empty action cannot name anything and are skipped.
    pub fn from_policies<'a, I>(policies: I) -> Self
    where
        I: IntoIterator<Item = &'a Policy>,
    {
        let mut set = Self::new();
        for policy in policies {
            if policy.action.trim().is_empty() {
                warn!(
                    role = %policy.role,
                    object = %policy.object,
                    "dropping policy with empty action"
                );
                continue;
            }
            set.insert(build_key(&policy.action, &policy.object));
        }
        debug!(grants = set.len(), "built permission set from policies");
        set
    }

    /// Rebuild a set from previously persisted key strings.
    ///
    /// Keys are kept exactly as stored; malformed ones parse to the sentinel.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for key in keys {
            set.insert(key.into());
        }
        set
    }

    /// Add one key. Duplicates are ignored.
    pub fn insert(&mut self, key: String) {
        if !self.grants.contains_key(&key) {
            let grant = Grant::compile(&key);
            self.grants.insert(key, grant);
        }
    }

    /// True if any grant covers the `required` permission key.
    pub fn permits(&self, required: &str) -> bool {
        let required = PermissionKey::parse(required);
        self.grants.values().any(|grant| grant.covers(&required))
    }

    /// The stored key strings, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.grants.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}
