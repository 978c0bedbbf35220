use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use pounder_config::{ContentConfig, GateConfig, PounderConfig};
use pounder_gateway::{build_gateway, StorageGateway};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, instrument};

use crate::cancel::CancellationToken;
use crate::error::EngineError;
use crate::ops::{self, OpKind};
use crate::report::Report;
use crate::shadow::ShadowModel;
use crate::stats::Collector;

/// Everything an operation may read or mutate.
///
/// Owned by the loop and handed to each operation by `&mut`, so a single
/// operation can be exercised without the rest of the engine.
pub struct EngineState {
    pub shadow: ShadowModel,
    pub collector: Collector,
    pub rng: ChaCha8Rng,
    pub gates: GateConfig,
    pub content: ContentConfig,
}

impl EngineState {
    pub fn new(root: PathBuf, rng: ChaCha8Rng, gates: GateConfig, content: ContentConfig) -> Self {
        EngineState {
            shadow: ShadowModel::with_recent_capacity(root, content.recent_capacity),
            collector: Collector::new(),
            rng,
            gates,
            content,
        }
    }
}

/// Loop tuning that does not depend on which gateway is in use.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// `None` draws a seed from OS entropy.
    pub seed: Option<u64>,
    pub gates: GateConfig,
    pub content: ContentConfig,
    pub status_interval: u64,
    pub max_iterations: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions::from(&PounderConfig::default())
    }
}

impl From<&PounderConfig> for EngineOptions {
    fn from(config: &PounderConfig) -> Self {
        EngineOptions {
            seed: config.seed,
            gates: config.gates,
            content: config.content.clone(),
            status_interval: config.status_interval,
            max_iterations: config.max_iterations,
        }
    }
}

/// The scheduler loop plus the state and gateway it drives.
pub struct Engine {
    root: PathBuf,
    seed: u64,
    gateway: Box<dyn StorageGateway>,
    state: EngineState,
    status_interval: u64,
    max_iterations: Option<u64>,
    iterations: u64,
}

impl Engine {
    /// Build an engine from configuration, resolving the root against `cwd`.
    ///
    /// Fails if the configuration is invalid or the root is not an existing
    /// directory.
    pub fn new(config: &PounderConfig, cwd: &Path) -> Result<Self, EngineError> {
        config.validate_or_err()?;
        let config = config.effective(cwd);
        let root = config.root_path(cwd);

        match fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(EngineError::RootNotADirectory(root)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(EngineError::RootNotFound(root))
            }
            Err(e) => return Err(pounder_gateway::GatewayError::from_io(e, &root).into()),
        }

        let gateway = build_gateway(config.gateway, &config.retry);
        Self::with_gateway(root, gateway, EngineOptions::from(&config))
    }

    /// Build an engine over an already constructed gateway.
    ///
    /// The root must exist as a directory according to `gateway`.
    pub fn with_gateway(
        root: impl Into<PathBuf>,
        gateway: Box<dyn StorageGateway>,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        let root = root.into();
        if !gateway.exists(&root)? {
            return Err(EngineError::RootNotFound(root));
        }
        if !gateway.is_directory(&root)? {
            return Err(EngineError::RootNotADirectory(root));
        }

        let seed = options.seed.unwrap_or_else(rand::random);
        let rng = ChaCha8Rng::seed_from_u64(seed);
        let state = EngineState::new(root.clone(), rng, options.gates, options.content);

        info!(root = %root.display(), gateway = gateway.name(), seed, "engine ready");
        Ok(Engine {
            root,
            seed,
            gateway,
            state,
            status_interval: options.status_interval,
            max_iterations: options.max_iterations,
            iterations: 0,
        })
    }

    /// One loop iteration: pick an operation uniformly and run it.
    pub fn step(&mut self) -> OpKind {
        self.iterations += 1;
        if self.status_interval > 0 && self.iterations % self.status_interval == 0 {
            info!(iteration = self.iterations, "{}", self.state.collector.summary());
        }

        let kind = OpKind::random(&mut self.state.rng);
        ops::dispatch(kind, &mut self.state, self.gateway.as_ref());
        kind
    }

    /// Run until `token` is cancelled or the iteration cap is reached.
    ///
    /// The token is checked only between operations, so the operation in
    /// flight always finishes.
    #[instrument(skip_all, fields(root = %self.root.display(), seed = self.seed))]
    pub fn run(&mut self, token: &CancellationToken) -> Report {
        let started_at = Utc::now();
        loop {
            if token.is_cancelled() {
                info!(iterations = self.iterations, "cancelled");
                break;
            }
            if self.max_iterations.is_some_and(|max| self.iterations >= max) {
                info!(iterations = self.iterations, "iteration limit reached");
                break;
            }
            self.step();
        }
        self.report(started_at)
    }

    /// Run exactly `n` more iterations.
    pub fn run_iterations(&mut self, n: u64) -> Report {
        let started_at = Utc::now();
        for _ in 0..n {
            self.step();
        }
        self.report(started_at)
    }

    fn report(&self, started_at: chrono::DateTime<Utc>) -> Report {
        Report {
            seed: self.seed,
            gateway: self.gateway.name().to_string(),
            root: self.root.clone(),
            started_at,
            finished_at: Utc::now(),
            iterations: self.iterations,
            stats: self.state.collector.stats,
            errors: self.state.collector.errors().to_vec(),
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut EngineState {
        &mut self.state
    }

    pub fn gateway(&self) -> &dyn StorageGateway {
        self.gateway.as_ref()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use std::sync::{Arc, Mutex};

    use pounder_gateway::MemoryGateway;
    use tempfile::TempDir;
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    fn options(seed: u64) -> EngineOptions {
        EngineOptions {
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let config = PounderConfig {
            root: Some(tmp.path().join("nope").to_string_lossy().into_owned()),
            ..Default::default()
        };
        assert!(matches!(
            Engine::new(&config, tmp.path()),
            Err(EngineError::RootNotFound(_))
        ));
    }

    #[test]
    fn test_file_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();
        let config = PounderConfig {
            root: Some(file.to_string_lossy().into_owned()),
            ..Default::default()
        };
        assert!(matches!(
            Engine::new(&config, tmp.path()),
            Err(EngineError::RootNotADirectory(_))
        ));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let mut config = PounderConfig::default();
        config.gates.pop_directory = 12;
        assert!(matches!(
            Engine::new(&config, tmp.path()),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_root_defaults_to_cwd() {
        let tmp = TempDir::new().unwrap();
        let engine = Engine::new(&PounderConfig::default(), tmp.path()).unwrap();
        assert_eq!(engine.root(), tmp.path());
        assert_eq!(engine.gateway().name(), "standard");
    }

    #[test]
    fn test_memory_root_must_exist() {
        let gw = Box::new(MemoryGateway::new("/pound"));
        assert!(matches!(
            Engine::with_gateway("/elsewhere", gw, options(1)),
            Err(EngineError::RootNotFound(_))
        ));
    }

    #[test]
    fn test_memory_root_must_be_directory() {
        let mem = MemoryGateway::new("/pound");
        mem.write_text(Path::new("/pound/plain.txt"), "x").unwrap();
        assert!(matches!(
            Engine::with_gateway("/pound/plain.txt", Box::new(mem), options(1)),
            Err(EngineError::RootNotADirectory(_))
        ));
    }

    #[test]
    fn test_precancelled_token_runs_nothing() {
        let gw = Box::new(MemoryGateway::new("/pound"));
        let mut engine = Engine::with_gateway("/pound", gw, options(1)).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let report = engine.run(&token);
        assert_eq!(report.iterations, 0);
        assert!(report.is_clean());
    }

    #[test]
    fn test_iteration_cap_stops_run() {
        let gw = Box::new(MemoryGateway::new("/pound"));
        let mut engine = Engine::with_gateway(
            "/pound",
            gw,
            EngineOptions {
                max_iterations: Some(250),
                ..options(3)
            },
        )
        .unwrap();

        let report = engine.run(&CancellationToken::new());
        assert_eq!(report.iterations, 250);
        assert_eq!(report.seed, 3);
        assert!(report.is_clean(), "{}", report);
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = |seed| {
            let gw = Box::new(MemoryGateway::new("/pound"));
            let mut engine = Engine::with_gateway("/pound", gw, options(seed)).unwrap();
            let ops: Vec<_> = (0..300).map(|_| engine.step()).collect();
            let files: Vec<_> = engine
                .state()
                .shadow
                .files()
                .map(|(p, c)| (p.to_path_buf(), c.to_string()))
                .collect();
            (ops, files, engine.state().collector.stats)
        };
        assert_eq!(run(42), run(42));
        assert_ne!(run(42).0, run(43).0);
    }

    /// Collects `(iteration, message)` from every event carrying an `iteration` field.
    #[derive(Clone, Default)]
    struct StatusLines(Arc<Mutex<Vec<(u64, String)>>>);

    #[derive(Default)]
    struct StatusVisitor {
        iteration: Option<u64>,
        message: String,
    }

    impl Visit for StatusVisitor {
        fn record_u64(&mut self, field: &Field, value: u64) {
            if field.name() == "iteration" {
                self.iteration = Some(value);
            }
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                self.message = format!("{:?}", value);
            }
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for StatusLines {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut visitor = StatusVisitor::default();
            event.record(&mut visitor);
            if let Some(iteration) = visitor.iteration {
                self.0.lock().unwrap().push((iteration, visitor.message));
            }
        }
    }

    fn status_lines(status_interval: u64, steps: u64) -> Vec<(u64, String)> {
        let lines = StatusLines::default();
        let subscriber = tracing_subscriber::registry().with(lines.clone());
        tracing::subscriber::with_default(subscriber, || {
            let gw = Box::new(MemoryGateway::new("/pound"));
            let options = EngineOptions {
                status_interval,
                ..options(21)
            };
            let mut engine = Engine::with_gateway("/pound", gw, options).unwrap();
            for _ in 0..steps {
                engine.step();
            }
        });
        let collected = lines.0.lock().unwrap().clone();
        collected
    }

    #[test]
    fn test_status_summary_every_interval() {
        let lines = status_lines(10, 30);
        let iterations: Vec<u64> = lines.iter().map(|(i, _)| *i).collect();
        assert_eq!(iterations, vec![10, 20, 30]);
        for (_, message) in &lines {
            assert!(message.starts_with("Written "), "{}", message);
            assert!(message.ends_with(" errors"), "{}", message);
        }
    }

    #[test]
    fn test_status_summary_disabled_at_zero() {
        assert!(status_lines(0, 50).is_empty());
    }
}
