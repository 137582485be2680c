//! Core ledger types for Graveyard

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::Error;

macro_rules! ledger_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(Arc::from(s.into()))
            }

            /// Fresh random identifier (UUID v4 text).
            pub fn generate() -> Self {
                Self::new(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                String::deserialize(deserializer).map(Self::new)
            }
        }
    };
}

ledger_id!(
    /// User identifier - cheaply cloneable
    UserId
);
ledger_id!(
    /// Project identifier - cheaply cloneable
    ProjectId
);
ledger_id!(RevivalId);
ledger_id!(NoteId);

/// Account role
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Project category
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Code,
    Business,
    Content,
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Code => "code",
            Category::Business => "business",
            Category::Content => "content",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "code" => Ok(Category::Code),
            "business" => Ok(Category::Business),
            "content" => Ok(Category::Content),
            "other" => Ok(Category::Other),
            other => Err(Error::validation(format!("unknown category: {}", other))),
        }
    }
}

/// Project lifecycle status.
///
/// `OnHold` is a valid value but the engine never transitions into or out of it.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProjectStatus {
    #[default]
    #[serde(rename = "abandoned")]
    Abandoned,
    #[serde(rename = "on-hold")]
    OnHold,
    #[serde(rename = "revived")]
    Revived,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Abandoned => "abandoned",
            ProjectStatus::OnHold => "on-hold",
            ProjectStatus::Revived => "revived",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abandoned" => Ok(ProjectStatus::Abandoned),
            "on-hold" => Ok(ProjectStatus::OnHold),
            "revived" => Ok(ProjectStatus::Revived),
            other => Err(Error::validation(format!("unknown status: {}", other))),
        }
    }
}

/// A registered account
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    /// Normalized (trimmed, lower-case); unique across users.
    pub email: String,
    pub role: Role,
    /// Denormalized count of revival events authored by this user.
    pub revival_count: u64,
    pub created_at: DateTime<Utc>,
}

/// An abandoned project card
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: ProjectStatus,
    pub started_on: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abandoned_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch_asset: Option<String>,
    /// Users credited with reviving this project; no duplicates, never the owner.
    #[serde(default)]
    pub revived_by: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.owner_id == user
    }

    pub fn is_revived_by(&self, user: &UserId) -> bool {
        self.revived_by.contains(user)
    }
}

/// Audit record backing one entry of `Project::revived_by`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RevivalEvent {
    pub id: RevivalId,
    pub project_id: ProjectId,
    pub reviver_id: UserId,
    #[serde(default)]
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A comment attached to a project.
///
/// The author is always stored; whether it may be shown is decided at projection time.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub project_id: ProjectId,
    pub author_id: UserId,
    pub body: String,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
}

/// Authenticated identity handed in by the API layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self { id: id.into(), role }
    }

    pub fn user(id: impl Into<UserId>) -> Self {
        Self::new(id, Role::User)
    }

    pub fn admin(id: impl Into<UserId>) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<&User> for Caller {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            role: user.role,
        }
    }
}

/// Sign-up payload
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub display_name: String,
    pub email: String,
}

/// Project creation payload. Required fields are optional here so that
/// missing input surfaces as a validation error rather than a decode error.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewProject {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub started_on: Option<NaiveDate>,
    pub abandoned_on: Option<NaiveDate>,
    pub link: Option<String>,
    pub pitch_asset: Option<String>,
}

/// Descriptive fields an owner may change. Status is deliberately absent.
///
/// Optional fields take `Some(None)` to clear the value; in JSON an explicit
/// `null` clears and an absent key leaves the field alone.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_on: Option<NaiveDate>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    pub abandoned_on: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    pub link: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    pub pitch_asset: Option<Option<String>>,
}

/// A present key (even `null`) becomes `Some(..)`; serde's default covers absence.
fn clearable<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.started_on.is_none()
            && self.abandoned_on.is_none()
            && self.link.is_none()
            && self.pitch_asset.is_none()
    }

    /// Apply the set fields onto `project`. A blank link or asset clears it.
    /// Leaves status and revivers untouched.
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(title) = &self.title {
            project.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            project.description = description.trim().to_string();
        }
        if let Some(category) = self.category {
            project.category = category;
        }
        if let Some(started_on) = self.started_on {
            project.started_on = started_on;
        }
        if let Some(abandoned_on) = self.abandoned_on {
            project.abandoned_on = abandoned_on;
        }
        if let Some(link) = &self.link {
            project.link = link.as_deref().map(str::trim).filter(|l| !l.is_empty()).map(String::from);
        }
        if let Some(asset) = &self.pitch_asset {
            project.pitch_asset = asset.as_deref().map(str::trim).filter(|a| !a.is_empty()).map(String::from);
        }
    }
}

/// Project listing filter; unset fields match everything
#[derive(Clone, Debug, Default)]
pub struct ProjectFilter {
    pub owner: Option<UserId>,
    pub status: Option<ProjectStatus>,
    pub category: Option<Category>,
}

impl ProjectFilter {
    pub fn owned_by(owner: UserId) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }

    pub fn matches(&self, project: &Project) -> bool {
        self.owner.as_ref().map_or(true, |o| &project.owner_id == o)
            && self.status.map_or(true, |s| project.status == s)
            && self.category.map_or(true, |c| project.category == c)
    }
}

/// Author identity as seen by readers.
///
/// `Anonymous` carries nothing, so an anonymous author id cannot leak through serialization.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NoteAuthor {
    Public { user_id: UserId },
    Anonymous,
}

impl NoteAuthor {
    pub fn of(note: &Note) -> Self {
        if note.is_anonymous {
            NoteAuthor::Anonymous
        } else {
            NoteAuthor::Public {
                user_id: note.author_id.clone(),
            }
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            NoteAuthor::Public { user_id } => Some(user_id),
            NoteAuthor::Anonymous => None,
        }
    }
}
