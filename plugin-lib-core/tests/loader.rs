//! Integration tests for PluginLoader
//!
//! Plugins are statically registered recorders that write every hook call
//! to a shared journal. Plugin directories are laid out in a TempDir.

use std::path::Path;
use std::sync::{Arc, Mutex};

use plugin_lib_api::{
    Application, LoadPhase, Logger, Plugin, PluginContext, PluginError, PluginState, async_trait,
};
use plugin_lib_core::plugins::{Hook, RejectReason};
use plugin_lib_core::{PluginHostConfig, PluginHostError, PluginLoader, StaticResolver};
use serde_json::json;
use tempfile::TempDir;

type Journal = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
struct RecordingLogger {
    lines: Mutex<Vec<String>>,
}

impl RecordingLogger {
    fn errors(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter_map(|l| l.strip_prefix("ERROR ").map(str::to_string))
            .collect()
    }
}

impl Logger for RecordingLogger {
    fn error(&self, message: &str) {
        self.lines.lock().unwrap().push(format!("ERROR {message}"));
    }
    fn warn(&self, message: &str) {
        self.lines.lock().unwrap().push(format!("WARN {message}"));
    }
    fn info(&self, message: &str) {
        self.lines.lock().unwrap().push(format!("INFO {message}"));
    }
    fn debug(&self, message: &str) {
        self.lines.lock().unwrap().push(format!("DEBUG {message}"));
    }
    fn trace(&self, _message: &str) {}
}

#[derive(Default)]
struct TestApplication {
    logger: RecordingLogger,
}

impl Application for TestApplication {
    fn name(&self) -> &str {
        "test-app"
    }

    fn logger(&self) -> &dyn Logger {
        &self.logger
    }
}

/// Plugin that journals `<name>.<hook>` and can be told to fail a hook
struct Recorder {
    journal: Journal,
    fail_on: Option<&'static str>,
}

impl Recorder {
    fn record(&self, ctx: &PluginContext, hook: &'static str) -> Result<(), PluginError> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}.{hook}", ctx.plugin_name()));
        if self.fail_on == Some(hook) {
            return Err(PluginError::custom(format!("{hook} refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl Plugin for Recorder {
    async fn on_load(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        // Give other work a chance to interleave if ordering were broken
        tokio::task::yield_now().await;
        self.record(ctx, "load")
    }

    async fn on_enable(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        self.record(ctx, "enable")
    }

    async fn on_disable(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        self.record(ctx, "disable")
    }
}

struct Fixture {
    root: TempDir,
    journal: Journal,
    app: Arc<TestApplication>,
    resolver: StaticResolver,
}

impl Fixture {
    fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
            journal: Arc::default(),
            app: Arc::new(TestApplication::default()),
            resolver: StaticResolver::new(),
        }
    }

    /// Lay out a plugin directory named `name` whose entry is `<name>.so`
    fn plugin(&mut self, name: &str, depends: &[&str], phase: u8) -> &mut Self {
        self.plugin_failing(name, depends, phase, None)
    }

    fn plugin_failing(
        &mut self,
        name: &str,
        depends: &[&str],
        phase: u8,
        fail_on: Option<&'static str>,
    ) -> &mut Self {
        let entry = format!("{name}.so");
        write_descriptor(
            &self.root.path().join(name),
            json!({
                "name": name,
                "version": "1.0.0",
                "main": entry,
                "plugin-lib$load": phase,
                "plugin-lib$depends": depends,
            }),
        );

        let journal = self.journal.clone();
        self.resolver.register(entry, move || {
            Box::new(Recorder {
                journal: journal.clone(),
                fail_on,
            }) as Box<dyn Plugin>
        });
        self
    }

    fn loader(&self) -> PluginLoader {
        PluginLoader::new(
            self.app.clone(),
            Arc::new(self.resolver.clone()),
            PluginHostConfig {
                plugin_dir: self.root.path().to_path_buf(),
                ..PluginHostConfig::default()
            },
        )
    }

    fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    fn errors(&self) -> Vec<String> {
        self.app.logger.errors()
    }
}

fn write_descriptor(dir: &Path, descriptor: serde_json::Value) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join("package.json"), descriptor.to_string()).unwrap();
}

#[tokio::test]
async fn loads_dependencies_first_and_skips_missing() {
    let mut fx = Fixture::new();
    fx.plugin("b", &["a"], 0)
        .plugin("a", &[], 0)
        .plugin("c", &["d"], 0);

    let mut loader = fx.loader();
    let report = loader.load_plugins(fx.root.path()).await.unwrap();

    assert_eq!(report.loaded, vec!["a", "b"]);
    assert!(matches!(
        report.failure("c"),
        Some(PluginHostError::MissingDependency { dependency, .. }) if dependency == "d"
    ));
    assert!(loader.get_plugin("c").is_none());
    assert_eq!(fx.journal(), vec!["a.load", "b.load"]);

    let about_c: Vec<String> = fx
        .errors()
        .into_iter()
        .filter(|l| l.contains("'c'"))
        .collect();
    assert_eq!(about_c.len(), 1, "missing dependency logged once: {about_c:?}");
}

#[tokio::test]
async fn mutual_dependency_is_rejected_as_cycle() {
    let mut fx = Fixture::new();
    fx.plugin("e", &["f"], 0).plugin("f", &["e"], 0);

    let mut loader = fx.loader();
    let report = loader.load_plugins(fx.root.path()).await.unwrap();

    assert!(report.loaded.is_empty());
    for name in ["e", "f"] {
        assert!(matches!(
            report.failure(name),
            Some(PluginHostError::CyclicDependency { cycle, .. }) if cycle.len() == 3
        ));
    }
    assert!(fx.journal().is_empty());
}

#[tokio::test]
async fn failure_propagates_to_transitive_dependents() {
    let mut fx = Fixture::new();
    fx.plugin_failing("base", &[], 0, Some("load"))
        .plugin("middle", &["base"], 0)
        .plugin("top", &["middle"], 0)
        .plugin("other", &[], 0);

    let mut loader = fx.loader();
    let report = loader.load_plugins(fx.root.path()).await.unwrap();

    assert_eq!(report.loaded, vec!["other"]);
    assert!(matches!(
        report.failure("base"),
        Some(PluginHostError::Hook { hook: Hook::Load, .. })
    ));
    assert!(matches!(
        report.failure("middle"),
        Some(PluginHostError::DependencyFailed { dependency, .. }) if dependency == "base"
    ));
    assert!(matches!(
        report.failure("top"),
        Some(PluginHostError::DependencyFailed { dependency, .. }) if dependency == "middle"
    ));
    assert!(loader.get_plugin("base").is_none());
    assert_eq!(loader.plugin_count(), 1);
    assert_eq!(fx.journal(), vec!["base.load", "other.load"]);
}

#[tokio::test]
async fn invalid_descriptors_are_skipped() {
    let mut fx = Fixture::new();
    fx.plugin("good", &[], 0);
    std::fs::create_dir_all(fx.root.path().join("empty")).unwrap();
    let broken = fx.root.path().join("broken");
    std::fs::create_dir_all(&broken).unwrap();
    std::fs::write(broken.join("package.json"), "{ nope").unwrap();
    write_descriptor(&fx.root.path().join("nameless"), json!({ "main": "x.so" }));
    write_descriptor(
        &fx.root.path().join("phase9"),
        json!({ "name": "phase9", "main": "x.so", "plugin-lib$load": 9 }),
    );

    let mut loader = fx.loader();
    let report = loader.load_plugins(fx.root.path()).await.unwrap();

    assert_eq!(report.loaded, vec!["good"]);
    assert!(matches!(
        report.failure("empty"),
        Some(PluginHostError::InvalidDescription { .. })
    ));
    assert!(matches!(
        report.failure("broken"),
        Some(PluginHostError::InvalidDescription { .. })
    ));
    assert!(matches!(
        report.failure("nameless"),
        Some(PluginHostError::MissingName { .. })
    ));
    assert!(matches!(
        report.failure("phase9"),
        Some(PluginHostError::InvalidDescription { .. })
    ));
}

#[tokio::test]
async fn null_descriptor_fields_fall_back_to_defaults() {
    let mut fx = Fixture::new();
    fx.plugin("nulldeps", &[], 0);
    write_descriptor(
        &fx.root.path().join("nulldeps"),
        json!({ "name": "nulldeps", "main": "nulldeps.so", "plugin-lib$depends": null }),
    );
    write_descriptor(
        &fx.root.path().join("nullname"),
        json!({ "name": null, "main": "x.so" }),
    );

    let mut loader = fx.loader();
    let report = loader.load_plugins(fx.root.path()).await.unwrap();

    assert_eq!(report.loaded, vec!["nulldeps"]);
    assert!(matches!(
        report.failure("nullname"),
        Some(PluginHostError::MissingName { .. })
    ));
}

#[tokio::test]
async fn duplicate_names_keep_the_first_directory() {
    let mut fx = Fixture::new();
    fx.plugin("dup", &[], 0);
    write_descriptor(
        &fx.root.path().join("zz-dup-copy"),
        json!({ "name": "dup", "main": "dup.so" }),
    );

    let mut loader = fx.loader();
    let report = loader.load_plugins(fx.root.path()).await.unwrap();

    assert_eq!(report.loaded, vec!["dup"]);
    assert!(matches!(
        report.failure("dup"),
        Some(PluginHostError::DuplicatePlugin { path, .. }) if path.ends_with("zz-dup-copy")
    ));
    assert!(loader.get_plugin("dup").unwrap().file().ends_with("dup"));
}

#[tokio::test]
async fn unresolvable_entry_point_only_fails_that_plugin() {
    let mut fx = Fixture::new();
    fx.plugin("known", &[], 0);
    write_descriptor(
        &fx.root.path().join("unknown"),
        json!({ "name": "unknown", "main": "unregistered.so" }),
    );

    let mut loader = fx.loader();
    let report = loader.load_plugins(fx.root.path()).await.unwrap();

    assert_eq!(report.loaded, vec!["known"]);
    assert!(matches!(
        report.failure("unknown"),
        Some(PluginHostError::EntryPointNotFound { .. })
    ));
}

#[tokio::test]
async fn second_batch_can_depend_on_first() {
    let mut fx = Fixture::new();
    fx.plugin("core", &[], 0);
    let first = TempDir::new().unwrap();
    std::fs::rename(fx.root.path().join("core"), first.path().join("core")).unwrap();
    fx.plugin("addon", &["core"], 0);

    let mut loader = fx.loader();
    let report = loader.load_plugins(first.path()).await.unwrap();
    assert_eq!(report.loaded, vec!["core"]);

    let report = loader.load_plugins(fx.root.path()).await.unwrap();
    assert_eq!(report.loaded, vec!["addon"]);
    assert!(report.is_clean());
}

#[tokio::test]
async fn load_plugin_requires_registered_dependencies() {
    let mut fx = Fixture::new();
    fx.plugin("a", &[], 0).plugin("b", &["a"], 0);
    let mut loader = fx.loader();

    let result = loader.load_plugin(&fx.root.path().join("b")).await;
    assert!(matches!(
        result,
        Err(PluginHostError::UnknownDependency { ref dependency, .. }) if dependency == "a"
    ));
    assert!(fx.errors().is_empty(), "direct load failures are not logged");

    loader.load_plugin(&fx.root.path().join("a")).await.unwrap();
    loader.load_plugin(&fx.root.path().join("b")).await.unwrap();
    assert_eq!(loader.get_plugin("b").unwrap().state(), PluginState::Disabled);
}

#[tokio::test]
async fn phases_enable_only_their_plugins() {
    let mut fx = Fixture::new();
    fx.plugin("early", &[], 0).plugin("late", &["early"], 1);

    let mut loader = fx.loader();
    loader.load_plugins(fx.root.path()).await.unwrap();

    let report = loader.enable_plugins(LoadPhase::Startup).await;
    assert_eq!(report.changed, vec!["early"]);
    assert!(loader.get_plugin("early").unwrap().is_enabled());
    assert!(!loader.get_plugin("late").unwrap().is_enabled());

    let report = loader.enable_plugins(LoadPhase::PostStart).await;
    assert_eq!(report.changed, vec!["late"]);

    // Second pass is a no-op
    let report = loader.enable_plugins(LoadPhase::Startup).await;
    assert!(report.changed.is_empty());

    let report = loader.disable_plugins(LoadPhase::PostStart).await;
    assert_eq!(report.changed, vec!["late"]);
    assert_eq!(
        fx.journal(),
        vec![
            "early.load",
            "late.load",
            "early.enable",
            "late.enable",
            "late.disable"
        ]
    );
}

#[tokio::test]
async fn failing_enable_does_not_stop_the_phase() {
    let mut fx = Fixture::new();
    fx.plugin_failing("grumpy", &[], 0, Some("enable"))
        .plugin("happy", &[], 0);

    let mut loader = fx.loader();
    loader.load_plugins(fx.root.path()).await.unwrap();

    let report = loader.enable_plugins(LoadPhase::Startup).await;
    assert_eq!(report.changed, vec!["happy"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].plugin, "grumpy");
    assert!(!loader.get_plugin("grumpy").unwrap().is_enabled());
    assert!(
        fx.errors()
            .iter()
            .any(|l| l.contains("enabling grumpy in phase STARTUP"))
    );
}

#[tokio::test]
async fn enable_and_disable_by_name_are_idempotent() {
    let mut fx = Fixture::new();
    fx.plugin("solo", &[], 1);

    let mut loader = fx.loader();
    loader.load_plugins(fx.root.path()).await.unwrap();

    loader.enable_plugin("solo").await.unwrap();
    loader.enable_plugin("solo").await.unwrap();
    loader.disable_plugin("solo").await.unwrap();
    loader.disable_plugin("solo").await.unwrap();

    assert_eq!(
        fx.journal(),
        vec!["solo.load", "solo.enable", "solo.disable"]
    );
    // Disabled plugins stay resolvable
    let solo = loader.get_plugin("solo").unwrap();
    assert_eq!(solo.state(), PluginState::Disabled);
    assert_eq!(solo.to_string(), "solo<enabled: false>");
}

#[tokio::test]
async fn disable_hook_failure_is_surfaced() {
    let mut fx = Fixture::new();
    fx.plugin_failing("sticky", &[], 0, Some("disable"));

    let mut loader = fx.loader();
    loader.load_plugins(fx.root.path()).await.unwrap();
    loader.enable_plugin("sticky").await.unwrap();

    let result = loader.disable_plugin("sticky").await;
    assert!(matches!(
        result,
        Err(PluginHostError::Hook { hook: Hook::Disable, .. })
    ));
    assert!(loader.get_plugin("sticky").unwrap().is_enabled());

    // Unload refuses to drop a plugin it could not disable
    assert!(loader.unload_plugin("sticky").await.is_err());
    assert_eq!(loader.plugin_count(), 1);
}

#[tokio::test]
async fn unload_disables_then_removes() {
    let mut fx = Fixture::new();
    fx.plugin("temp", &[], 0);

    let mut loader = fx.loader();
    loader.load_all().await.unwrap();
    loader.enable_plugins(LoadPhase::Startup).await;

    loader.unload_plugin("temp").await.unwrap();
    assert!(loader.get_plugin("temp").is_none());
    assert_eq!(fx.journal(), vec!["temp.load", "temp.enable", "temp.disable"]);
}

#[tokio::test]
async fn reloading_an_enabled_plugin_disables_it_first() {
    let mut fx = Fixture::new();
    fx.plugin("svc", &[], 0);

    let mut loader = fx.loader();
    loader.load_all().await.unwrap();
    loader.enable_plugin("svc").await.unwrap();

    loader.load_plugin(&fx.root.path().join("svc")).await.unwrap();

    assert_eq!(
        fx.journal(),
        vec!["svc.load", "svc.enable", "svc.disable", "svc.load"]
    );
    assert_eq!(loader.plugin_count(), 1);
    assert_eq!(loader.get_plugin("svc").unwrap().state(), PluginState::Disabled);
}

#[tokio::test]
async fn failed_reload_keeps_the_previous_instance() {
    let mut fx = Fixture::new();
    fx.plugin("svc", &[], 0);
    let journal = fx.journal.clone();
    fx.resolver.register("svc-broken.so", move || {
        Box::new(Recorder {
            journal: journal.clone(),
            fail_on: Some("load"),
        }) as Box<dyn Plugin>
    });

    let mut loader = fx.loader();
    loader.load_all().await.unwrap();
    loader.enable_plugin("svc").await.unwrap();

    let dir = fx.root.path().join("svc");
    write_descriptor(
        &dir,
        json!({ "name": "svc", "version": "2.0.0", "main": "svc-broken.so" }),
    );
    let err = loader.load_plugin(&dir).await.unwrap_err();

    assert!(matches!(err, PluginHostError::Hook { hook: Hook::Load, .. }));
    assert_eq!(
        fx.journal(),
        vec!["svc.load", "svc.enable", "svc.disable", "svc.load"]
    );
    let svc = loader.get_plugin("svc").unwrap();
    assert_eq!(svc.description().version.as_deref(), Some("1.0.0"));
    assert_eq!(svc.state(), PluginState::Disabled);

    // The restored instance is still usable
    loader.enable_plugin("svc").await.unwrap();
    assert_eq!(fx.journal().last().map(String::as_str), Some("svc.enable"));
}

#[tokio::test]
async fn plugin_config_is_loaded_into_context() {
    let mut fx = Fixture::new();
    fx.plugin("configured", &[], 0);
    std::fs::write(
        fx.root.path().join("configured").join("config.toml"),
        "greeting = \"hi\"\n",
    )
    .unwrap();

    let mut loader = fx.loader();
    loader.load_all().await.unwrap();

    let context = loader.get_plugin("configured").unwrap().context();
    assert_eq!(context.config_get::<String>("greeting").as_deref(), Some("hi"));
    assert_eq!(context.application().name(), "test-app");
}

#[tokio::test]
async fn list_plugins_reports_state() {
    let mut fx = Fixture::new();
    fx.plugin("one", &[], 0).plugin("two", &["one"], 1);

    let mut loader = fx.loader();
    loader.load_all().await.unwrap();
    loader.enable_plugins(LoadPhase::Startup).await;

    let infos = loader.list_plugins();
    let summary: Vec<(&str, PluginState)> =
        infos.iter().map(|i| (i.name.as_str(), i.state)).collect();
    assert_eq!(
        summary,
        vec![("one", PluginState::Enabled), ("two", PluginState::Disabled)]
    );
    assert_eq!(infos[1].descriptor.depends, vec!["one"]);
}

#[tokio::test]
async fn discovery_plan_matches_load_order() {
    let mut fx = Fixture::new();
    fx.plugin("z", &[], 0)
        .plugin("y", &["z"], 0)
        .plugin("x", &["y", "w"], 0);

    let loader = fx.loader();
    let discovery = loader.discover(fx.root.path()).await.unwrap();
    let resolution = discovery.plan(|_| false);

    assert_eq!(resolution.order, vec!["z", "y"]);
    assert_eq!(
        resolution.rejection("x").map(|r| &r.reason),
        Some(&RejectReason::MissingDependency {
            dependency: "w".to_string()
        })
    );
    assert_eq!(loader.plugin_count(), 0);
}
