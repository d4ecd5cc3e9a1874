//! Person use-case service.
//!
//! # Responsibility
//! - Expose the ten person operations as stable entry points.
//! - Translate caller-facing ids (text) into typed ids.
//! - Delegate persistence to repository implementations.
//!
//! # Invariants
//! - Not-found is `Ok(None)` or an empty list everywhere except
//!   `find_edit_then_save`, which reports `RepoError::NotFound`.
//! - The first error observed is returned unchanged; nothing is retried.
//! - `find_edit_then_save` is read-modify-write and not atomic; concurrent
//!   callers on the same id are last-writer-wins.

use crate::model::person::{parse_person_id, NewPerson, Person, PersonId, PersonSummary};
use crate::repo::person_repo::{
    DeleteSummary, PersonFilter, PersonQuery, PersonRepository, RepoError, RepoResult, SortOrder,
};
use log::debug;

/// Food appended by `find_edit_then_save`.
pub const FOOD_TO_ADD: &str = "hamburger";
/// Age written by `find_and_update_age`.
pub const AGE_TO_SET: i64 = 20;
/// Name used by the tutorial flow for bulk removal.
pub const NAME_TO_REMOVE: &str = "Mary";
/// Food used by the tutorial flow for the chained query.
pub const FOOD_TO_SEARCH: &str = "burrito";
/// Maximum rows returned by `query_chain`.
pub const QUERY_CHAIN_LIMIT: u32 = 2;

/// Canonical draft used by the create-and-save exercise.
pub fn sample_person() -> NewPerson {
    NewPerson::new("John Doe")
        .with_age(25)
        .with_favorite_foods(["pizza", "burgers"])
}

/// Use-case service over a person repository.
pub struct PersonService<R: PersonRepository> {
    repo: R,
}

impl<R: PersonRepository> PersonService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one person and returns it with its assigned id.
    pub fn create_person(&self, draft: &NewPerson) -> RepoResult<Person> {
        self.repo.insert_person(draft)
    }

    /// Creates every draft, or none when any of them fails.
    pub fn create_people(&self, drafts: &[NewPerson]) -> RepoResult<Vec<Person>> {
        self.repo.insert_people(drafts)
    }

    /// Returns all people with exactly this name, in insertion order.
    pub fn find_people_by_name(&self, name: &str) -> RepoResult<Vec<Person>> {
        self.repo
            .find_people(&PersonQuery::new(PersonFilter::by_name(name)))
    }

    /// Returns the first person whose favorites include `food`.
    pub fn find_one_by_food(&self, food: &str) -> RepoResult<Option<Person>> {
        self.repo
            .find_one_person(&PersonFilter::by_favorite_food(food))
    }

    /// Gets one person by id.
    ///
    /// A well-formed id with no match is `Ok(None)`; a malformed id is
    /// `RepoError::InvalidId`.
    pub fn find_person_by_id(&self, id: &str) -> RepoResult<Option<Person>> {
        self.repo.get_person(parse_id(id)?)
    }

    /// Loads a person, appends [`FOOD_TO_ADD`] and writes the whole document
    /// back.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when no person has this id; no write happens.
    pub fn find_edit_then_save(&self, id: &str) -> RepoResult<Person> {
        let id = parse_id(id)?;
        let Some(mut person) = self.repo.get_person(id)? else {
            debug!("event=person_edit_then_save module=service status=not_found id={id}");
            return Err(RepoError::NotFound(id));
        };

        person.favorite_foods.push(FOOD_TO_ADD.to_string());
        self.repo.save_person(&person)?;
        Ok(person)
    }

    /// Sets age to [`AGE_TO_SET`] on the first person with this name.
    ///
    /// Returns the post-update document, or `None` when nobody matched.
    pub fn find_and_update_age(&self, name: &str) -> RepoResult<Option<Person>> {
        self.repo
            .find_one_and_set_age(&PersonFilter::by_name(name), AGE_TO_SET)
    }

    /// Deletes one person by id and returns what was removed.
    ///
    /// Deleting an id that is already gone returns `Ok(None)`.
    pub fn remove_by_id(&self, id: &str) -> RepoResult<Option<Person>> {
        self.repo.delete_person(parse_id(id)?)
    }

    /// Deletes every person with this name.
    pub fn remove_many_people(&self, name: &str) -> RepoResult<DeleteSummary> {
        self.repo.delete_people(&PersonFilter::by_name(name))
    }

    /// People who like `food`: name ascending, at most
    /// [`QUERY_CHAIN_LIMIT`], age omitted.
    pub fn query_chain(&self, food: &str) -> RepoResult<Vec<PersonSummary>> {
        let query = PersonQuery::new(PersonFilter::by_favorite_food(food))
            .sort_by_name(SortOrder::Ascending)
            .limit(QUERY_CHAIN_LIMIT);
        self.repo.find_summaries(&query)
    }

    /// Every stored person ordered by name; equal names keep insertion order.
    pub fn list_people(&self, order: SortOrder) -> RepoResult<Vec<Person>> {
        self.repo
            .find_people(&PersonQuery::default().sort_by_name(order))
    }

    /// Total number of stored people.
    pub fn count_people(&self) -> RepoResult<u64> {
        self.repo.count_people(&PersonFilter::default())
    }
}

fn parse_id(value: &str) -> RepoResult<PersonId> {
    parse_person_id(value).ok_or_else(|| RepoError::InvalidId(value.to_string()))
}
