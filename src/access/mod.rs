use std::{
    collections::{
        HashMap,
        HashSet,
    },
    fmt,
    sync::{
        Mutex,
        MutexGuard,
        PoisonError,
    },
};

use chrono::{
    DateTime,
    Utc,
};
use serde::Serialize;
use subtle::ConstantTimeEq;

use crate::core::Identity;

const DENIED_LOG_LIMIT: usize = 200;
const DENIED_LOG_KEEP: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    NotAuthenticated,
    WrongCode,
    Blocked,
    HeldByAnother,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DenyReason::NotAuthenticated => "not authenticated",
            DenyReason::WrongCode => "wrong code",
            DenyReason::Blocked => "blocked",
            DenyReason::HeldByAnother => "another identity is authorized",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeniedAttempt {
    pub identity: Identity,
    pub at: DateTime<Utc>,
    pub input: String,
    pub reason: DenyReason,
}

#[derive(Debug, Default)]
struct AccessRecord {
    authorized: Option<Identity>,
    failures: HashMap<Identity, u32>,
    blocked: HashSet<Identity>,
    denied: Vec<DeniedAttempt>,
}

impl AccessRecord {
    fn log_denied(&mut self, identity: &Identity, input: &str, reason: DenyReason) {
        log::warn!("Access denied for {} ({}): {:?}", identity, reason, input);
        self.denied.push(DeniedAttempt {
            identity: identity.clone(),
            at: Utc::now(),
            input: input.to_string(),
            reason,
        });
        if self.denied.len() > DENIED_LOG_LIMIT {
            let excess = self.denied.len() - DENIED_LOG_KEEP;
            self.denied.drain(..excess);
        }
    }
}

/// Snapshot for the security report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessStatus {
    pub authorized: Option<Identity>,
    pub blocked: Vec<Identity>,
    /// Denied attempts per identity, most attempts first.
    pub denied_counts: Vec<(Identity, usize)>,
    pub recent_denied: Vec<DeniedAttempt>,
}

/// Gate in front of everything else. At most one identity is ever authorized.
pub struct AccessGuard {
    auth_code: Option<String>,
    max_attempts: u32,
    record: Mutex<AccessRecord>,
}

impl AccessGuard {
    pub fn new(auth_code: Option<String>, max_attempts: u32, preseeded: Option<Identity>) -> Self {
        if auth_code.is_none() && preseeded.is_none() {
            log::warn!("No auth code configured; nobody will be able to authenticate");
        }
        let record = AccessRecord { authorized: preseeded, ..AccessRecord::default() };
        Self {
            auth_code: auth_code.filter(|c| !c.is_empty()),
            max_attempts,
            record: Mutex::new(record),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AccessRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn code_matches(&self, code: &str) -> bool {
        match &self.auth_code {
            Some(expected) => bool::from(expected.as_bytes().ct_eq(code.trim().as_bytes())),
            None => false,
        }
    }

    /// Decides whether `identity` may go on. `code` is only looked at while nobody holds
    /// authorization. `input` is what ends up in the denied log.
    pub fn authorize(&self, identity: &Identity, code: Option<&str>, input: &str) -> AccessDecision {
        let mut record = self.lock();

        match record.authorized.as_ref().map(|holder| holder == identity) {
            Some(true) => return AccessDecision::Allow,
            Some(false) => {
                record.log_denied(identity, input, DenyReason::HeldByAnother);
                return AccessDecision::Deny;
            }
            None => {}
        }

        if record.blocked.contains(identity) {
            record.log_denied(identity, input, DenyReason::Blocked);
            return AccessDecision::Deny;
        }

        let Some(code) = code else {
            record.log_denied(identity, input, DenyReason::NotAuthenticated);
            return AccessDecision::Deny;
        };

        if self.code_matches(code) {
            log::info!("{} authenticated", identity);
            record.authorized = Some(identity.clone());
            record.failures.remove(identity);
            return AccessDecision::Allow;
        }

        let failures = {
            let counter = record.failures.entry(identity.clone()).or_insert(0);
            *counter += 1;
            *counter
        };
        record.log_denied(identity, input, DenyReason::WrongCode);
        if failures >= self.max_attempts {
            log::warn!("{} blocked after {} failed attempts", identity, failures);
            record.blocked.insert(identity.clone());
        }
        AccessDecision::Deny
    }

    pub fn is_authorized(&self, identity: &Identity) -> bool {
        self.lock().authorized.as_ref() == Some(identity)
    }

    pub fn authorized_identity(&self) -> Option<Identity> {
        self.lock().authorized.clone()
    }

    pub fn is_blocked(&self, identity: &Identity) -> bool {
        self.lock().blocked.contains(identity)
    }

    /// Clears authorization. Only the current holder can do this.
    pub fn revoke(&self, identity: &Identity) -> bool {
        let mut record = self.lock();
        if record.authorized.as_ref() != Some(identity) {
            return false;
        }
        record.authorized = None;
        log::info!("{} revoked their access", identity);
        true
    }

    pub fn status(&self) -> AccessStatus {
        let record = self.lock();

        let mut counts: HashMap<&Identity, usize> = HashMap::new();
        for attempt in &record.denied {
            *counts.entry(&attempt.identity).or_default() += 1;
        }
        let mut denied_counts: Vec<(Identity, usize)> =
            counts.into_iter().map(|(identity, count)| (identity.clone(), count)).collect();
        denied_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut blocked: Vec<Identity> = record.blocked.iter().cloned().collect();
        blocked.sort();

        AccessStatus {
            authorized: record.authorized.clone(),
            blocked,
            denied_counts,
            recent_denied: record.denied.iter().rev().take(5).cloned().collect(),
        }
    }
}
