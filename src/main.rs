use anyhow::Context;
use people_app::{driver, modules, PersonRepository};
use people_kernel::settings::Settings;
use people_kernel::{InitCtx, ModuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load settings")?;
    people_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        backend = %settings.database.backend,
        "people-app bootstrap starting"
    );

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

    // Modules stop and the store closes even when startup fails.
    let reports = registry.run(&ctx, move || driver::run(repo)).await?;
    tracing::info!(steps = reports.len(), "people-app finished");
    Ok(())
}
