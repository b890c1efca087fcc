// tests/common/mod.rs

//! Shared test utilities: fake collaborators and a harness wiring an
//! orchestrator against a temp install root.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use chocolatier::coordinator::Services;
use chocolatier::info::JsonPackageInfoStore;
use chocolatier::notify::Randomizer;
use chocolatier::services::{
    ConfigTransformService, DefaultAutoUninstaller, DefaultFilesService, Event, EventBus,
    InteractivePrompt, NoopShims, ProcessState, QuickXmlListParser, RegistryService,
    ScriptingHost, XorArgumentCipher,
};
use chocolatier::snapshot::{EnvironmentSnapshot, InstallerKey, RegistrySnapshot};
use chocolatier::sources::ResultSink;
use chocolatier::{
    Configuration, Error, InstallLayout, Orchestrator, PackageResult, Result, SourceDispatcher,
    SourceRunner,
};

// ---------------------------------------------------------------------------
// Process state
// ---------------------------------------------------------------------------

/// In-memory process state; clones share storage so tests can observe
/// writes made through the orchestrator.
#[derive(Clone, Default)]
pub struct FakeProcessState {
    env: Arc<Mutex<HashMap<String, String>>>,
    exit_code: Arc<AtomicI32>,
}

impl FakeProcessState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_env(&self, name: &str, value: &str) {
        self.env
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }
}

impl ProcessState for FakeProcessState {
    fn env_var(&self, name: &str) -> Option<String> {
        self.env.lock().unwrap().get(name).cloned()
    }

    fn set_env_var(&self, name: &str, value: &str) {
        self.seed_env(name, value);
    }

    fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::SeqCst)
    }

    fn set_exit_code(&self, code: i32) {
        self.exit_code.store(code, Ordering::SeqCst);
    }

    fn reset_environment(&self, _config: &Configuration) {}
}

// ---------------------------------------------------------------------------
// Registry + scripting host sharing one system image
// ---------------------------------------------------------------------------

/// Mutable "system" the fakes agree on: installer keys and environment
/// variables as the registry would report them.
#[derive(Clone, Default)]
pub struct SystemImage {
    state: Arc<Mutex<(RegistrySnapshot, EnvironmentSnapshot)>>,
}

impl SystemImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_installer_key(&self, key: InstallerKey) {
        self.state.lock().unwrap().0.keys.push(key);
    }

    pub fn set_env(&self, snapshot: EnvironmentSnapshot) {
        self.state.lock().unwrap().1 = snapshot;
    }
}

pub struct FakeRegistry(pub SystemImage);

impl RegistryService for FakeRegistry {
    fn installer_keys(&self) -> Result<RegistrySnapshot> {
        Ok(self.0.state.lock().unwrap().0.clone())
    }

    fn environment_values(&self) -> Result<EnvironmentSnapshot> {
        Ok(self.0.state.lock().unwrap().1.clone())
    }
}

/// Scripting host that pretends the package script ran, optionally
/// mutating the system image the way a real installer would.
pub struct FakeScriptHost {
    system: SystemImage,
    installs_key: Mutex<Option<InstallerKey>>,
    ran: Arc<AtomicI32>,
}

impl FakeScriptHost {
    pub fn new(system: SystemImage, installs_key: Option<InstallerKey>) -> Self {
        Self {
            system,
            installs_key: Mutex::new(installs_key),
            ran: Arc::new(AtomicI32::new(0)),
        }
    }
}

impl ScriptingHost for FakeScriptHost {
    fn install(&self, _config: &Configuration, _result: &mut PackageResult) -> Result<bool> {
        self.ran.fetch_add(1, Ordering::SeqCst);
        if let Some(key) = self.installs_key.lock().unwrap().take() {
            self.system.add_installer_key(key);
        }
        Ok(true)
    }

    fn uninstall(&self, _config: &Configuration, _result: &mut PackageResult) -> Result<bool> {
        self.ran.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    fn before_modify(&self, _config: &Configuration, _result: &mut PackageResult) -> Result<bool> {
        Ok(true)
    }

    fn install_noop(&self, _config: &Configuration, _result: &PackageResult) {}

    fn uninstall_noop(&self, _config: &Configuration, _result: &PackageResult) {}
}

// ---------------------------------------------------------------------------
// Prompt, events, randomness
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AnswerPrompt {
    answer: Arc<Mutex<&'static str>>,
    calls: Arc<AtomicI32>,
}

impl AnswerPrompt {
    pub fn new(answer: &'static str) -> Self {
        Self {
            answer: Arc::new(Mutex::new(answer)),
            calls: Arc::new(AtomicI32::new(0)),
        }
    }

    pub fn set_answer(&self, answer: &'static str) {
        *self.answer.lock().unwrap() = answer;
    }

    pub fn call_count(&self) -> i32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InteractivePrompt for AnswerPrompt {
    fn prompt_for_confirmation(&self, _: &str, _: &[&str], _: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.lock().unwrap().to_string())
    }
}

#[derive(Clone, Default)]
pub struct CollectingEventBus {
    events: Arc<Mutex<Vec<Event>>>,
}

impl CollectingEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed_packages(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| match e {
                Event::HandlePackageResultCompleted { name, .. } => name.clone(),
            })
            .collect()
    }
}

impl EventBus for CollectingEventBus {
    fn publish(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Never triggers the notifier
pub struct QuietRandomizer;

impl Randomizer for QuietRandomizer {
    fn roll(&mut self, _sides: u32) -> u32 {
        1
    }
}

pub struct NoTransforms;

impl ConfigTransformService for NoTransforms {
    fn run(&self, _result: &PackageResult, _config: &Configuration) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scripted source runner
// ---------------------------------------------------------------------------

/// Shared template map the harness can fill after construction
#[derive(Clone, Default)]
pub struct ResultScript {
    templates: Arc<Mutex<BTreeMap<String, PackageResult>>>,
}

impl ResultScript {
    pub fn add(&self, result: PackageResult) {
        self.templates
            .lock()
            .unwrap()
            .insert(result.name.clone(), result);
    }

    fn take_for(&self, name: &str) -> PackageResult {
        self.templates
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| PackageResult::failure(name, "no scripted result"))
    }

    fn all(&self) -> BTreeMap<String, PackageResult> {
        self.templates.lock().unwrap().clone()
    }
}

/// Runner that replays pre-built results per package name
pub struct ScriptedRunner {
    script: ResultScript,
}

impl ScriptedRunner {
    pub fn new(script: ResultScript) -> Self {
        Self { script }
    }
}

impl SourceRunner for ScriptedRunner {
    fn source_type(&self) -> &'static str {
        "normal"
    }

    fn ensure_source_app_installed(&self, _: &Configuration) -> Result<()> {
        Ok(())
    }

    fn count_run(&self, _: &Configuration) -> Result<usize> {
        Ok(self.script.all().len())
    }

    fn list_run(&self, _: &Configuration) -> Result<Vec<PackageResult>> {
        Ok(self.script.all().into_values().collect())
    }

    fn list_noop(&self, _: &Configuration) -> Result<()> {
        Ok(())
    }

    fn install_run(
        &self,
        config: &Configuration,
        on_result: ResultSink,
    ) -> Result<BTreeMap<String, PackageResult>> {
        let mut results = BTreeMap::new();
        for name in config.split_package_names() {
            let mut result = self.script.take_for(&name);
            on_result(&mut result, config)?;
            results.insert(name, result);
        }
        Ok(results)
    }

    fn install_noop(&self, _: &Configuration) -> Result<()> {
        Ok(())
    }

    fn upgrade_run(
        &self,
        config: &Configuration,
        on_result: ResultSink,
        before_modify: ResultSink,
    ) -> Result<BTreeMap<String, PackageResult>> {
        let mut results = BTreeMap::new();
        for name in config.split_package_names() {
            let mut result = self.script.take_for(&name);
            before_modify(&mut result, config)?;
            on_result(&mut result, config)?;
            results.insert(name, result);
        }
        Ok(results)
    }

    fn upgrade_noop(&self, _: &Configuration) -> Result<()> {
        Ok(())
    }

    fn uninstall_run(
        &self,
        config: &Configuration,
        on_result: ResultSink,
        before_modify: ResultSink,
    ) -> Result<BTreeMap<String, PackageResult>> {
        let mut results = BTreeMap::new();
        for name in config.split_package_names() {
            let mut result = self.script.take_for(&name);
            before_modify(&mut result, config)?;
            match on_result(&mut result, config) {
                Ok(()) => {}
                // The pipeline raises on a failed uninstall so this
                // runner halts that package's removal; the command
                // continues with the rest.
                Err(Error::OperationFailed(_)) => {}
                Err(e) => return Err(e),
            }
            results.insert(name, result);
        }
        Ok(results)
    }

    fn uninstall_noop(&self, _: &Configuration) -> Result<()> {
        Ok(())
    }

    fn get_outdated(&self, _: &Configuration) -> Result<BTreeMap<String, PackageResult>> {
        Ok(self.script.all())
    }

    fn remove_rollback_directory_if_exists(&self, _: &str) {}
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub temp: TempDir,
    pub layout: InstallLayout,
    pub script: ResultScript,
    pub process: FakeProcessState,
    pub events: CollectingEventBus,
    pub prompt: AnswerPrompt,
    pub system: SystemImage,
    pub orchestrator: Orchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_installer_key(None)
    }

    /// Harness whose script host reports `installer_key` as newly
    /// installed when the first install script runs.
    pub fn with_installer_key(installer_key: Option<InstallerKey>) -> Self {
        let temp = TempDir::new().unwrap();
        let layout = InstallLayout::new(temp.path().to_path_buf());
        layout.ensure_base_dirs().unwrap();

        let script = ResultScript::default();
        let process = FakeProcessState::new();
        let events = CollectingEventBus::new();
        let prompt = AnswerPrompt::new("yes");
        let system = SystemImage::new();

        let services = Services {
            scripts: Box::new(FakeScriptHost::new(system.clone(), installer_key)),
            shims: Box::new(NoopShims),
            files: Box::new(DefaultFilesService),
            transforms: Box::new(NoTransforms),
            registry: Box::new(FakeRegistry(system.clone())),
            info: Box::new(JsonPackageInfoStore::new(layout.package_info_root())),
            auto_uninstaller: Box::new(DefaultAutoUninstaller),
            list_documents: Box::new(QuickXmlListParser),
            prompt: Box::new(prompt.clone()),
            events: Box::new(events.clone()),
            process: Box::new(process.clone()),
            cipher: Box::new(XorArgumentCipher::default()),
            randomizer: Mutex::new(Box::new(QuietRandomizer)),
        };

        let dispatcher =
            SourceDispatcher::new(vec![Box::new(ScriptedRunner::new(script.clone()))]);
        let orchestrator = Orchestrator::new(layout.clone(), dispatcher, services);

        Self {
            temp,
            layout,
            script,
            process,
            events,
            prompt,
            system,
            orchestrator,
        }
    }

    /// Base configuration targeting this harness; Windows semantics on so
    /// the full pipeline runs.
    pub fn config(&self, packages: &str) -> Configuration {
        let mut config = Configuration {
            package_names: packages.to_string(),
            source: "https://feed.example/api/v2".to_string(),
            ..Default::default()
        };
        config.machine.is_windows = true;
        config.machine.is_64bit = true;
        config
    }

    /// Script a successful result whose payload lives under this
    /// harness's packages root.
    pub fn script_installed(&self, name: &str, version: &str) -> PackageResult {
        let result = installed_result(&self.layout, name, version);
        self.script.add(result.clone());
        result
    }

    pub fn info_store(&self) -> JsonPackageInfoStore {
        JsonPackageInfoStore::new(self.layout.package_info_root())
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// A successful result with a payload directory under the packages root
pub fn installed_result(layout: &InstallLayout, name: &str, version: &str) -> PackageResult {
    let mut result = PackageResult::new(name, version);
    let location = layout.package_path(name);
    std::fs::create_dir_all(&location).unwrap();
    std::fs::write(location.join("payload.txt"), b"data").unwrap();
    result.install_location = Some(location);
    result
}

pub fn sample_installer_key(name: &str, quiet: bool) -> InstallerKey {
    InstallerKey {
        key_path: format!("HKLM\\Software\\Uninstall\\{}", name),
        display_name: name.to_string(),
        display_version: "1.0".to_string(),
        uninstall_command: if quiet {
            format!("\"C:\\Program Files\\{}\\unins.exe\" /SILENT", name)
        } else {
            format!("\"C:\\Program Files\\{}\\unins.exe\"", name)
        },
        install_location: Some(format!("C:\\Program Files\\{}", name)),
        has_quiet_uninstall: quiet,
    }
}
