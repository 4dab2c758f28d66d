//! Domain types for sessions, profiles and location records.
//!
//! # Design
//! `LocationRecord` is valid by construction: every field the record
//! backend requires is non-optional. User input arrives as a
//! `LocationDraft` whose fields are all optional and only becomes a record
//! through [`LocationDraft::validate`]. Wire names (`uniqueKey`, `objectId`,
//! `mediaURL`) stay in the serde attributes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Authenticated identity issued by the session backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The backend's `session.id`.
    pub session_token: String,
    /// The backend's `account.key`.
    pub subject_id: String,
}

/// Public profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// One user's posted location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    #[serde(rename = "uniqueKey")]
    pub owner_key: String,
    pub first_name: String,
    pub last_name: String,
    pub map_string: String,
    pub latitude: f64,
    pub longitude: f64,
    /// `None` when no link was posted; JSON `null` decodes to `None`.
    #[serde(rename = "mediaURL", default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(rename = "objectId", default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// A location as entered by the user, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationDraft {
    pub owner_key: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub map_string: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub media_url: Option<String>,
}

impl LocationDraft {
    /// Pre-fill the owner and names from a signed-in session.
    pub fn for_user(session: &Session, profile: &Profile) -> Self {
        Self {
            owner_key: Some(session.subject_id.clone()),
            first_name: Some(profile.first_name.clone()),
            last_name: Some(profile.last_name.clone()),
            ..Self::default()
        }
    }

    pub fn with_place(mut self, map_string: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        self.map_string = Some(map_string.into());
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_media_url(mut self, media_url: impl Into<String>) -> Self {
        self.media_url = Some(media_url.into());
        self
    }

    /// Check the submission invariant and produce a record ready to post.
    ///
    /// Blank strings count as absent. Fields are checked in the order
    /// `ownerKey`, `firstName`, `lastName`, `mapString`, `latitude`,
    /// `longitude`; the first missing one is reported.
    pub fn validate(&self) -> Result<LocationRecord, ApiError> {
        let owner_key = required_text(&self.owner_key, "ownerKey")?;
        let first_name = required_text(&self.first_name, "firstName")?;
        let last_name = required_text(&self.last_name, "lastName")?;
        let map_string = required_text(&self.map_string, "mapString")?;
        let latitude = required_coordinate(self.latitude, "latitude")?;
        let longitude = required_coordinate(self.longitude, "longitude")?;
        let media_url = self
            .media_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(LocationRecord {
            owner_key,
            first_name,
            last_name,
            map_string,
            latitude,
            longitude,
            media_url,
            record_id: None,
            created_at: None,
            updated_at: None,
        })
    }
}

fn required_text(value: &Option<String>, field: &'static str) -> Result<String, ApiError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::IncompleteRecord(field))
}

fn required_coordinate(value: Option<f64>, field: &'static str) -> Result<f64, ApiError> {
    value.filter(|v| v.is_finite()).ok_or(ApiError::IncompleteRecord(field))
}

/// An ordered page of records, most recently updated first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationRecordSet {
    records: Vec<LocationRecord>,
}

impl LocationRecordSet {
    pub fn new(records: Vec<LocationRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LocationRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[LocationRecord] {
        &self.records
    }
}

impl IntoIterator for LocationRecordSet {
    type Item = LocationRecord;
    type IntoIter = std::vec::IntoIter<LocationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a LocationRecordSet {
    type Item = &'a LocationRecord;
    type IntoIter = std::slice::Iter<'a, LocationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Paging and ordering for a record fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub limit: u32,
    pub skip: u32,
    pub order: String,
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            skip: 0,
            order: "-updatedAt".to_string(),
        }
    }
}

/// Identifiers the record backend assigns on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRecord {
    pub record_id: String,
    pub created_at: String,
}

/// Confirmation that the session backend ended a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndedSession {
    pub session_id: String,
}

impl fmt::Display for EndedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session {} ended", self.session_id)
    }
}
