use personbook_core::db::migrations::latest_version;
use personbook_core::db::open_db_in_memory;
use personbook_core::{
    NewPerson, PersonFilter, PersonQuery, PersonRepository, RepoError, SortOrder,
    SqlitePersonRepository,
};
use rusqlite::{params, Connection};
use uuid::Uuid;

#[test]
fn insert_and_get_roundtrip_preserves_food_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();

    let draft = NewPerson::new("Ann").with_favorite_foods(["tacos", "soup", "tacos"]);
    let stored = repo.insert_person(&draft).unwrap();

    let loaded = repo.get_person(stored.id).unwrap().unwrap();
    assert_eq!(loaded.name, "Ann");
    assert_eq!(loaded.age, None);
    assert_eq!(loaded.favorite_foods, vec!["tacos", "soup", "tacos"]);
}

#[test]
fn save_person_rewrites_whole_document() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();

    let mut person = repo
        .insert_person(&NewPerson::new("Ann").with_age(3).with_favorite_foods(["milk"]))
        .unwrap();
    person.name = "Annie".to_string();
    person.age = None;
    person.favorite_foods = vec!["cake".to_string(), "pie".to_string()];
    repo.save_person(&person).unwrap();

    let loaded = repo.get_person(person.id).unwrap().unwrap();
    assert_eq!(loaded, person);
    assert!(repo
        .find_one_person(&PersonFilter::by_favorite_food("milk"))
        .unwrap()
        .is_none());
}

#[test]
fn save_person_not_found_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();

    let ghost = NewPerson::new("Ghost")
        .with_favorite_foods(["air"])
        .into_person(Uuid::new_v4());
    let err = repo.save_person(&ghost).unwrap_err();

    assert!(matches!(err, RepoError::NotFound(id) if id == ghost.id));
    let food_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM person_favorite_foods;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(food_rows, 0);
}

#[test]
fn save_person_rejects_blank_name() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();

    let mut person = repo.insert_person(&NewPerson::new("Ann")).unwrap();
    person.name = " ".to_string();

    let err = repo.save_person(&person).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(repo.get_person(person.id).unwrap().unwrap().name, "Ann");
}

#[test]
fn store_rejects_blank_name_written_directly() {
    let conn = open_db_in_memory().unwrap();

    let result = conn.execute(
        "INSERT INTO persons (id, name) VALUES (?1, ?2);",
        params![Uuid::new_v4().to_string(), "   "],
    );
    assert!(result.is_err());
}

#[test]
fn unsorted_find_keeps_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();
    for name in ["Cy", "Ann", "Ben"] {
        repo.insert_person(&NewPerson::new(name)).unwrap();
    }

    let all = repo.find_people(&PersonQuery::default()).unwrap();
    let names: Vec<_> = all.iter().map(|person| person.name.as_str()).collect();
    assert_eq!(names, vec!["Cy", "Ann", "Ben"]);

    let first_two = repo
        .find_people(&PersonQuery::default().limit(2))
        .unwrap();
    assert_eq!(first_two.len(), 2);
    assert_eq!(first_two[1].name, "Ann");
}

#[test]
fn zero_limit_returns_every_match() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();
    repo.insert_people(&[NewPerson::new("Ann"), NewPerson::new("Ben")])
        .unwrap();

    let everyone = repo.find_people(&PersonQuery::default().limit(0)).unwrap();
    assert_eq!(everyone.len(), 2);

    let query = PersonQuery::default()
        .sort_by_name(SortOrder::Ascending)
        .limit(0);
    let summaries = repo.find_summaries(&query).unwrap();
    assert_eq!(summaries.len(), 2);
}

#[test]
fn name_sort_supports_both_directions_with_stable_ties() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();
    repo.insert_people(&[
        NewPerson::new("Ben").with_age(1),
        NewPerson::new("Ann"),
        NewPerson::new("Ben").with_age(2),
        NewPerson::new("Cy"),
    ])
    .unwrap();

    let ascending = repo
        .find_people(&PersonQuery::default().sort_by_name(SortOrder::Ascending))
        .unwrap();
    let summary: Vec<_> = ascending
        .iter()
        .map(|person| (person.name.as_str(), person.age))
        .collect();
    assert_eq!(
        summary,
        vec![("Ann", None), ("Ben", Some(1)), ("Ben", Some(2)), ("Cy", None)]
    );

    let descending = repo
        .find_people(&PersonQuery::default().sort_by_name(SortOrder::Descending))
        .unwrap();
    assert_eq!(descending[0].name, "Cy");
    assert_eq!(descending[3].name, "Ann");
}

#[test]
fn filter_conditions_combine() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();
    repo.insert_people(&[
        NewPerson::new("Ann").with_favorite_foods(["soup"]),
        NewPerson::new("Ann").with_favorite_foods(["bread"]),
        NewPerson::new("Ben").with_favorite_foods(["soup"]),
    ])
    .unwrap();

    let filter = PersonFilter {
        name: Some("Ann".to_string()),
        favorite_food: Some("soup".to_string()),
    };
    let found = repo.find_people(&PersonQuery::new(filter.clone())).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].favorite_foods, vec!["soup"]);
    assert_eq!(repo.count_people(&filter).unwrap(), 1);
    assert_eq!(repo.count_people(&PersonFilter::default()).unwrap(), 3);
}

#[test]
fn food_filter_is_exact_membership() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();
    repo.insert_person(&NewPerson::new("Ann").with_favorite_foods(["burritos"]))
        .unwrap();

    assert!(repo
        .find_one_person(&PersonFilter::by_favorite_food("burrito"))
        .unwrap()
        .is_none());
}

#[test]
fn find_one_and_set_age_with_food_filter() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();
    repo.insert_person(&NewPerson::new("Ann").with_age(9)).unwrap();
    let target = repo
        .insert_person(&NewPerson::new("Ben").with_favorite_foods(["kale"]))
        .unwrap();

    let updated = repo
        .find_one_and_set_age(&PersonFilter::by_favorite_food("kale"), 77)
        .unwrap()
        .unwrap();
    assert_eq!(updated.id, target.id);
    assert_eq!(updated.age, Some(77));
    assert_eq!(updated.favorite_foods, vec!["kale"]);

    let ann = repo
        .find_one_person(&PersonFilter::by_name("Ann"))
        .unwrap()
        .unwrap();
    assert_eq!(ann.age, Some(9));
}

#[test]
fn delete_person_cascades_food_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();
    let person = repo
        .insert_person(&NewPerson::new("Ann").with_favorite_foods(["a", "b"]))
        .unwrap();

    let removed = repo.delete_person(person.id).unwrap().unwrap();
    assert_eq!(removed.favorite_foods, vec!["a", "b"]);

    let food_rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM person_favorite_foods WHERE person_id = ?1;",
            [person.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(food_rows, 0);
}

#[test]
fn delete_people_with_empty_filter_clears_collection() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();
    repo.insert_people(&[NewPerson::new("Ann"), NewPerson::new("Ben")])
        .unwrap();

    let summary = repo.delete_people(&PersonFilter::default()).unwrap();
    assert_eq!(summary.deleted_count, 2);
    assert_eq!(repo.count_people(&PersonFilter::default()).unwrap(), 0);
}

#[test]
fn stale_full_rewrite_overwrites_concurrent_append() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();
    let person = repo
        .insert_person(&NewPerson::new("Ann").with_favorite_foods(["soup"]))
        .unwrap();

    let mut first = repo.get_person(person.id).unwrap().unwrap();
    let mut second = repo.get_person(person.id).unwrap().unwrap();
    first.favorite_foods.push("bread".to_string());
    second.favorite_foods.push("jam".to_string());
    repo.save_person(&first).unwrap();
    repo.save_person(&second).unwrap();

    let loaded = repo.get_person(person.id).unwrap().unwrap();
    assert_eq!(loaded.favorite_foods, vec!["soup", "jam"]);
}

#[test]
fn summaries_follow_query_modifiers() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();
    repo.insert_people(&[
        NewPerson::new("Cy").with_age(1).with_favorite_foods(["x"]),
        NewPerson::new("Ann").with_age(2).with_favorite_foods(["x"]),
        NewPerson::new("Ben").with_age(3),
    ])
    .unwrap();

    let query = PersonQuery::new(PersonFilter::by_favorite_food("x"))
        .sort_by_name(SortOrder::Descending)
        .limit(5);
    let summaries = repo.find_summaries(&query).unwrap();
    let names: Vec<_> = summaries.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, vec!["Cy", "Ann"]);
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqlitePersonRepository::try_new(&conn);
    match result {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_persons_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqlitePersonRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("persons"))
    ));
}

#[test]
fn repository_rejects_connection_missing_age_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE persons (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL
        );
        CREATE TABLE person_favorite_foods (
            person_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            food TEXT NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqlitePersonRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "persons",
            column: "age"
        })
    ));
}
