use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use people_app::{driver, modules, NewPerson, PersonRepository};
use people_db::Backend;
use people_kernel::settings::Settings;
use people_kernel::{InitCtx, ModuleRegistry};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "people-cli", version, about = "Manage person records in a document store")]
struct Cli {
    /// Store backend, overriding configuration
    #[arg(long, value_enum, global = true)]
    backend: Option<BackendArg>,

    /// MongoDB connection string, overriding configuration
    #[arg(long, global = true)]
    uri: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Mongodb,
    Memory,
}

impl From<BackendArg> for Backend {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::Mongodb => Backend::Mongodb,
            BackendArg::Memory => Backend::Memory,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Insert one person
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: Option<i32>,
        /// Favorite food; repeat for several
        #[arg(long = "food")]
        foods: Vec<String>,
    },
    /// Insert every person from a JSON array file
    AddMany { path: PathBuf },
    /// List people with exactly this name
    FindByName { name: String },
    /// Show the first person who likes this food
    FindByFood { food: String },
    /// Show a person by id
    Get { id: String },
    /// Append a favorite food (load, modify, save)
    AddFood { id: String, food: String },
    /// Atomically set the age of the first person with this name
    SetAge { name: String, age: i32 },
    /// Delete a person by id
    Remove { id: String },
    /// Delete every person with this name
    RemoveByName { name: String },
    /// People who like this food, sorted by name, at most two, without age
    QueryChain { food: String },
    /// Run the full walkthrough
    Demo,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render result")?;
    println!("{rendered}");
    Ok(())
}

async fn execute(command: Command, repo: &PersonRepository) -> anyhow::Result<()> {
    match command {
        Command::Add { name, age, foods } => {
            let mut person = NewPerson::new(name).with_foods(foods);
            person.age = age;
            print_json(&repo.insert_one(person).await?)
        }
        Command::AddMany { path } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let people: Vec<NewPerson> = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            print_json(&repo.insert_many(people).await?)
        }
        Command::FindByName { name } => print_json(&repo.find_by_name(&name).await?),
        Command::FindByFood { food } => {
            print_json(&repo.find_one_by_favorite_food(&food).await?)
        }
        Command::Get { id } => print_json(&repo.find_by_id(&id).await?),
        Command::AddFood { id, food } => {
            print_json(&repo.append_favorite_food_and_save(&id, &food).await?)
        }
        Command::SetAge { name, age } => print_json(&repo.update_age_by_name(&name, age).await?),
        Command::Remove { id } => print_json(&repo.delete_by_id(&id).await?),
        Command::RemoveByName { name } => {
            let deleted = repo.delete_many_by_name(&name).await?;
            print_json(&serde_json::json!({ "deletedCount": deleted }))
        }
        Command::QueryChain { food } => print_json(&repo.query_chain(&food).await?),
        Command::Demo => {
            for report in driver::run(repo).await? {
                match report.error {
                    None => println!("{}: ok", report.step),
                    Some(error) => println!("{}: failed: {}", report.step, error),
                }
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load settings")?;
    if let Some(backend) = cli.backend {
        settings.database.backend = backend.into();
    }
    settings.apply_mongo_uri(cli.uri);
    people_telemetry::init(&settings.telemetry)?;

    tracing::debug!(command = ?cli.command, backend = %settings.database.backend, "people-cli");

    let store = people_db::connect(&settings.database)
        .await
        .with_context(|| "failed to connect to the document store")?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry);
    let ctx = InitCtx {
        settings: &settings,
        store: &store,
    };
    let repo = PersonRepository::new(store.clone());
    let repo = &repo;
    let command = cli.command;

    // Modules stop and the store closes even when startup fails.
    registry.run(&ctx, move || execute(command, repo)).await
}
