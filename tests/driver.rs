mod common;

use std::collections::HashSet;
use std::sync::Arc;

use people_app::driver;
use people_app::PersonRepository;
use people_db::MemoryStore;

const STEPS: [&str; 10] = [
    "insert_one",
    "insert_many",
    "find_by_name",
    "find_one_by_favorite_food",
    "find_by_id",
    "append_favorite_food_and_save",
    "update_age_by_name",
    "delete_by_id",
    "delete_many_by_name",
    "query_chain",
];

#[tokio::test]
async fn walkthrough_reports_every_step_once() {
    let repo = PersonRepository::new(Arc::new(MemoryStore::new()));

    let reports = driver::run(&repo).await.unwrap();

    assert_eq!(reports.len(), STEPS.len());
    assert_eq!(reports[0].step, "insert_one");
    let seen: HashSet<&str> = reports.iter().map(|r| r.step).collect();
    let expected: HashSet<&str> = STEPS.into_iter().collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn walkthrough_steps_without_ordering_hazards_succeed() {
    let repo = PersonRepository::new(Arc::new(MemoryStore::new()));

    let reports = driver::run(&repo).await.unwrap();

    // Steps touching John's id race the delete; the rest never fail.
    for step in [
        "insert_one",
        "insert_many",
        "find_by_name",
        "find_one_by_favorite_food",
        "delete_many_by_name",
        "query_chain",
    ] {
        let report = reports.iter().find(|r| r.step == step).unwrap();
        assert!(report.succeeded(), "{step} failed: {:?}", report.error);
    }

    // The batch insert always completes, whatever else interleaved.
    assert_eq!(repo.find_by_name("Bob").await.unwrap().len(), 1);
    assert_eq!(repo.find_by_name("Charlie").await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_first_save_only_skips_id_steps() {
    let store = Arc::new(common::StrictStore::failing_insert_one());
    let repo = PersonRepository::new(store.clone());

    let reports = driver::run(&repo).await.unwrap();

    assert_eq!(reports.len(), STEPS.len());
    assert_eq!(reports[0].step, "insert_one");
    assert!(!reports[0].succeeded());

    for step in ["find_by_id", "append_favorite_food_and_save", "delete_by_id"] {
        let report = reports.iter().find(|r| r.step == step).unwrap();
        assert!(!report.succeeded(), "{step} should be skipped");
    }
    for step in [
        "insert_many",
        "find_by_name",
        "find_one_by_favorite_food",
        "delete_many_by_name",
        "query_chain",
    ] {
        let report = reports.iter().find(|r| r.step == step).unwrap();
        assert!(report.succeeded(), "{step} failed: {:?}", report.error);
    }

    // Only the batch insert wrote anything.
    assert_eq!(store.inner().count("people").await, 3);
    assert!(repo.find_by_name("John Doe").await.unwrap().is_empty());
}
