//! Client-side state shared by the façades.
//!
//! # Design
//! `ClientContext` is created once by the host and passed by reference to
//! every façade call. It holds the current session and profile, the cookies
//! the session backend set, and the last fetched page of records.
//!
//! State sits behind a `std::sync::RwLock` that is only held for short
//! copies in and out, never across an `.await`. Overlapping writers are
//! last-writer-wins by completion order.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::types::{LocationRecordSet, Profile, Session};

/// Name of the cookie whose value is echoed as `X-XSRF-TOKEN` on logout.
pub const XSRF_COOKIE: &str = "XSRF-TOKEN";

#[derive(Debug, Default)]
struct State {
    session: Option<Session>,
    profile: Option<Profile>,
    cookies: BTreeMap<String, String>,
    records: LocationRecordSet,
}

#[derive(Debug, Default)]
pub struct ClientContext {
    state: RwLock<State>,
}

impl ClientContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<Session> {
        self.read().session.clone()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.read().profile.clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.read().session.is_some()
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.read().cookies.get(name).cloned()
    }

    /// `Cookie` request header value for everything in the jar.
    pub fn cookie_header(&self) -> Option<String> {
        let state = self.read();
        if state.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = state
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        Some(pairs.join("; "))
    }

    /// The last page returned by `fetch_records`.
    pub fn records(&self) -> LocationRecordSet {
        self.read().records.clone()
    }

    pub(crate) fn establish(&self, session: Session, profile: Profile, cookies: Vec<(String, String)>) {
        let mut state = self.write();
        state.session = Some(session);
        state.profile = Some(profile);
        state.cookies.extend(cookies);
    }

    pub(crate) fn set_profile(&self, profile: Profile) {
        self.write().profile = Some(profile);
    }

    pub(crate) fn store_cookies(&self, cookies: Vec<(String, String)>) {
        self.write().cookies.extend(cookies);
    }

    pub(crate) fn clear_session(&self) {
        let mut state = self.write();
        state.session = None;
        state.profile = None;
        state.cookies.clear();
    }

    pub(crate) fn replace_records(&self, records: LocationRecordSet) {
        self.write().records = records;
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Extract `name=value` from a `Set-Cookie` header, ignoring attributes.
pub(crate) fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().trim_matches('"').to_string()))
}
