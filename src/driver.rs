//! Walkthrough of every repository operation against a live store.
//!
//! After the first save, each operation runs as its own task. Completion
//! order is whatever the store yields; each task reports its own outcome and
//! a failure in one leaves the others running.

use std::future::Future;

use tokio::task::JoinSet;

use crate::modules::people::{NewPerson, PersonRepository, RepoResult};

/// Outcome of one walkthrough step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: &'static str,
    pub error: Option<String>,
}

impl StepReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

pub fn sample_people() -> Vec<NewPerson> {
    vec![
        NewPerson::new("Alice").with_age(25).with_foods(["Sushi", "Pasta"]),
        NewPerson::new("Bob").with_age(35).with_foods(["Burger", "Steak"]),
        NewPerson::new("Charlie").with_age(40).with_foods(["Pizza", "Tacos"]),
    ]
}

fn spawn_step<F, T>(tasks: &mut JoinSet<StepReport>, step: &'static str, operation: F)
where
    F: Future<Output = RepoResult<T>> + Send + 'static,
    T: std::fmt::Debug + Send + 'static,
{
    tasks.spawn(async move {
        match operation.await {
            Ok(value) => {
                tracing::info!(step, result = ?value, "step completed");
                StepReport { step, error: None }
            }
            Err(err) => {
                tracing::error!(step, not_found = err.is_not_found(), error = %err, "step failed");
                StepReport {
                    step,
                    error: Some(err.to_string()),
                }
            }
        }
    });
}

/// Steps that need the id assigned by the first save.
const ID_STEPS: [&str; 3] = ["find_by_id", "append_favorite_food_and_save", "delete_by_id"];

/// Run the walkthrough and return one report per step. The first save is
/// reported first; the rest follow in completion order.
///
/// A failed first save only skips the steps that need its id.
pub async fn run(repo: &PersonRepository) -> anyhow::Result<Vec<StepReport>> {
    let mut reports = Vec::new();

    let john = NewPerson::new("John Doe")
        .with_age(30)
        .with_foods(["Pizza", "Burger"]);
    let john_id = match repo.insert_one(john).await {
        Ok(person) => {
            tracing::info!(step = "insert_one", result = ?person, "step completed");
            reports.push(StepReport {
                step: "insert_one",
                error: None,
            });
            Some(person.id.to_hex())
        }
        Err(err) => {
            tracing::error!(step = "insert_one", error = %err, "step failed");
            reports.push(StepReport {
                step: "insert_one",
                error: Some(err.to_string()),
            });
            None
        }
    };

    let mut tasks = JoinSet::new();

    let r = repo.clone();
    spawn_step(&mut tasks, "insert_many", async move {
        r.insert_many(sample_people()).await
    });

    let r = repo.clone();
    spawn_step(&mut tasks, "find_by_name", async move {
        r.find_by_name("Alice").await
    });

    let r = repo.clone();
    spawn_step(&mut tasks, "find_one_by_favorite_food", async move {
        r.find_one_by_favorite_food("Pizza").await
    });

    let r = repo.clone();
    spawn_step(&mut tasks, "update_age_by_name", async move {
        r.update_age_by_name("Alice", 20).await
    });

    let r = repo.clone();
    spawn_step(&mut tasks, "delete_many_by_name", async move {
        r.delete_many_by_name("Mary").await
    });

    let r = repo.clone();
    spawn_step(&mut tasks, "query_chain", async move {
        r.query_chain("Burritos").await
    });

    match john_id {
        Some(john_id) => {
            let (r, id) = (repo.clone(), john_id.clone());
            spawn_step(&mut tasks, "find_by_id", async move { r.find_by_id(&id).await });

            let (r, id) = (repo.clone(), john_id.clone());
            spawn_step(&mut tasks, "append_favorite_food_and_save", async move {
                r.append_favorite_food_and_save(&id, "Hamburger").await
            });

            let (r, id) = (repo.clone(), john_id);
            spawn_step(&mut tasks, "delete_by_id", async move { r.delete_by_id(&id).await });
        }
        None => {
            for step in ID_STEPS {
                tracing::warn!(step, "step skipped; no saved person id");
                reports.push(StepReport {
                    step,
                    error: Some("skipped: the first save did not return an id".to_string()),
                });
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        reports.push(joined?);
    }

    let failed = reports.iter().filter(|report| !report.succeeded()).count();
    tracing::info!(steps = reports.len(), failed, "walkthrough finished");

    Ok(reports)
}
