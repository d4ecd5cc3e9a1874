//! Person domain model.
//!
//! # Responsibility
//! - Define the canonical `Person` record and its creation draft.
//! - Define the projected read model returned by filtered/sorted queries.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused for another person.
//! - `name` is non-empty (after trimming) at creation and on every rewrite.
//! - `favorite_foods` keeps caller order; duplicates are allowed.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Store-assigned identifier of a person document.
pub type PersonId = Uuid;

/// Validation failures for person writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonValidationError {
    /// `name` is missing or whitespace only.
    EmptyName,
}

impl Display for PersonValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "person name is required"),
        }
    }
}

impl Error for PersonValidationError {}

/// Stored person document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub age: Option<i64>,
    /// Serialized as `favoriteFoods` to match external document naming.
    #[serde(rename = "favoriteFoods")]
    pub favorite_foods: Vec<String>,
}

impl Person {
    /// Validates fields that must hold before a full rewrite.
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        validate_name(&self.name)
    }
}

/// Draft used to create a person. The store assigns the id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPerson {
    pub name: String,
    pub age: Option<i64>,
    #[serde(rename = "favoriteFoods", default)]
    pub favorite_foods: Vec<String>,
}

impl NewPerson {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age: None,
            favorite_foods: Vec::new(),
        }
    }

    pub fn with_age(mut self, age: i64) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_favorite_foods<I, S>(mut self, foods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.favorite_foods = foods.into_iter().map(Into::into).collect();
        self
    }

    /// Validates fields required at creation.
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        validate_name(&self.name)
    }

    /// Binds this draft to a store-assigned id.
    pub fn into_person(self, id: PersonId) -> Person {
        Person {
            id,
            name: self.name,
            age: self.age,
            favorite_foods: self.favorite_foods,
        }
    }
}

/// Person read model with the `age` field projected out.
///
/// Serialized output carries no `age` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonSummary {
    pub id: PersonId,
    pub name: String,
    #[serde(rename = "favoriteFoods")]
    pub favorite_foods: Vec<String>,
}

impl From<Person> for PersonSummary {
    fn from(value: Person) -> Self {
        Self {
            id: value.id,
            name: value.name,
            favorite_foods: value.favorite_foods,
        }
    }
}

/// Parses a caller-supplied id string.
///
/// Returns `None` for malformed input, surrounding whitespace included;
/// callers decide how to report it.
pub fn parse_person_id(value: &str) -> Option<PersonId> {
    Uuid::parse_str(value).ok()
}

fn validate_name(name: &str) -> Result<(), PersonValidationError> {
    if name.trim().is_empty() {
        return Err(PersonValidationError::EmptyName);
    }
    Ok(())
}
