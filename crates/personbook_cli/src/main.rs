//! Personbook command-line entry point.
//!
//! # Responsibility
//! - Own the process-wide store connection and logging lifecycle.
//! - Construct the person service explicitly and run the tutorial flow,
//!   printing each step's result as one JSON line.

use log::{error, info};
use personbook_core::db::{open_db, open_db_in_memory};
use personbook_core::{
    core_version, init_logging, load_dotenv, sample_person, AppConfig, NewPerson,
    PersonService, SortOrder, SqlitePersonRepository, FOOD_TO_SEARCH, NAME_TO_REMOVE,
};
use serde::Serialize;
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("personbook: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    load_dotenv()?;
    let config = AppConfig::from_env()?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(config.log_level, log_dir)?;
    }

    let conn = match config.db_path.as_deref() {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    }?;
    info!(
        "event=store_connect module=cli status=ok version={} persistent={}",
        core_version(),
        config.db_path.is_some()
    );

    let service = PersonService::new(SqlitePersonRepository::try_new(&conn)?);

    let john = service.create_person(&sample_person())?;
    print_step("create_person", &john)?;

    let people = service.create_people(&tutorial_people())?;
    print_step("create_people", &people)?;

    print_step(
        "find_people_by_name",
        &service.find_people_by_name(&john.name)?,
    )?;
    print_step("find_one_by_food", &service.find_one_by_food("pizza")?)?;

    let john_id = john.id.to_string();
    print_step("find_person_by_id", &service.find_person_by_id(&john_id)?)?;
    print_step(
        "find_edit_then_save",
        &service.find_edit_then_save(&john_id)?,
    )?;
    print_step(
        "find_and_update_age",
        &service.find_and_update_age(&john.name)?,
    )?;
    print_step("query_chain", &service.query_chain(FOOD_TO_SEARCH)?)?;
    print_step("list_people", &service.list_people(SortOrder::Descending)?)?;
    print_step("remove_by_id", &service.remove_by_id(&john_id)?)?;
    print_step(
        "remove_many_people",
        &service.remove_many_people(NAME_TO_REMOVE)?,
    )?;
    print_step("count_people", &service.count_people()?)?;

    Ok(())
}

fn tutorial_people() -> Vec<NewPerson> {
    vec![
        NewPerson::new("Mary")
            .with_age(31)
            .with_favorite_foods(["burrito", "salad"]),
        NewPerson::new("Carl")
            .with_age(44)
            .with_favorite_foods(["burrito"]),
        NewPerson::new("Mary")
            .with_age(19)
            .with_favorite_foods(["sushi"]),
        NewPerson::new("Ann")
            .with_age(27)
            .with_favorite_foods(["burrito", "tacos"]),
    ]
}

fn print_step<T: Serialize>(step: &str, value: &T) -> Result<(), serde_json::Error> {
    println!("{step} {}", serde_json::to_string(value)?);
    Ok(())
}
