mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use people_app::modules;
use people_db::DocumentStore;
use people_kernel::settings::Settings;
use people_kernel::{InitCtx, Module, ModuleRegistry};

struct RefusesToStart;

#[async_trait]
impl Module for RefusesToStart {
    fn name(&self) -> &'static str {
        "gate"
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        anyhow::bail!("listener unavailable")
    }
}

#[tokio::test]
async fn store_closes_when_a_module_fails_to_start() {
    let store = Arc::new(common::StrictStore::new());
    let handle: Arc<dyn DocumentStore> = store.clone();
    let settings = Settings::default();

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry);
    registry.register(Arc::new(RefusesToStart));

    let ctx = InitCtx {
        settings: &settings,
        store: &handle,
    };
    let ran = AtomicBool::new(false);
    let ran = &ran;
    let err = registry
        .run(&ctx, move || async move {
            ran.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();

    assert!(err.to_string().contains("'gate'"));
    assert!(!ran.load(Ordering::SeqCst));
    assert!(store.is_closed());
}

#[tokio::test]
async fn store_closes_after_work_completes() {
    let store = Arc::new(common::StrictStore::new());
    let handle: Arc<dyn DocumentStore> = store.clone();
    let settings = Settings::default();

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry);

    let ctx = InitCtx {
        settings: &settings,
        store: &handle,
    };
    let value = registry.run(&ctx, || async { Ok("done") }).await.unwrap();

    assert_eq!(value, "done");
    assert!(store.is_closed());
    assert_eq!(
        store.inner().indexes("people").await,
        vec!["name".to_string()]
    );
}
