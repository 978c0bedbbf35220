use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use pounder_config::{ContentConfig, GateConfig, RetryConfig};
use pounder_engine::ops::{self, OpKind};
use pounder_engine::{
    check_final_consistency, check_shadow_invariants, CancellationToken, Engine, EngineOptions,
    EngineState,
};
use pounder_gateway::{
    FaultConfig, FaultyGateway, GatewayError, MemoryGateway, RobustGateway, StandardGateway,
    StorageGateway,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

fn options(seed: u64) -> EngineOptions {
    EngineOptions {
        seed: Some(seed),
        ..Default::default()
    }
}

fn state(root: &Path, seed: u64, gates: GateConfig) -> EngineState {
    EngineState::new(
        root.to_path_buf(),
        ChaCha8Rng::seed_from_u64(seed),
        gates,
        ContentConfig::default(),
    )
}

fn run_clean_on_disk(gateway: Box<dyn StorageGateway>, tmp: &TempDir, seed: u64) {
    let mut engine = Engine::with_gateway(tmp.path(), gateway, options(seed)).unwrap();
    let report = engine.run_iterations(1000);

    assert_eq!(report.iterations, 1000);
    assert!(report.is_clean(), "{}", report);

    let violations = check_final_consistency(&engine.state().shadow, engine.gateway());
    assert!(violations.is_empty(), "{:#?}", violations);
    assert!(check_shadow_invariants(&engine.state().shadow).is_empty());
}

#[test]
fn scenario_a_standard_thousand_iterations() {
    let tmp = TempDir::new().unwrap();
    run_clean_on_disk(Box::new(StandardGateway::new()), &tmp, 0xD1_5C);
}

#[test]
fn scenario_a_robust_thousand_iterations() {
    let tmp = TempDir::new().unwrap();
    run_clean_on_disk(
        Box::new(RobustGateway::new(RetryConfig::default())),
        &tmp,
        0xD1_5C,
    );
}

#[test]
fn scenario_b_overwrite_three_times() {
    let tmp = TempDir::new().unwrap();
    let gw = StandardGateway::new();
    let mut st = state(tmp.path(), 21, GateConfig::default());
    let path = tmp.path().join("target.txt");

    ops::write_file_at(&mut st, &gw, path.clone(), OpKind::WriteRandomFile).unwrap();
    for _ in 0..3 {
        ops::write_file_at(&mut st, &gw, path.clone(), OpKind::OverwriteRandomFile).unwrap();
    }
    let last = st.shadow.content_of(&path).unwrap().to_string();

    ops::read_and_verify(&mut st, &gw, &path, OpKind::ReadRandomFile);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), last);
    assert_eq!(st.collector.stats.files_overwritten, 3);
    assert_eq!(st.collector.stats.files_written, 4);
    assert_eq!(st.collector.error_count(), 0);
}

#[test]
fn scenario_c_directory_delete_cascades() {
    let tmp = TempDir::new().unwrap();
    let gw = StandardGateway::new();
    let mut st = state(tmp.path(), 33, GateConfig::always());

    ops::make_directory(&mut st, &gw);
    let dir = st.shadow.current_path().to_path_buf();
    let files: Vec<PathBuf> = (0..5)
        .map(|_| ops::write_random_file(&mut st, &gw, OpKind::WriteRandomFile).unwrap())
        .collect();
    assert!(files.iter().all(|f| f.starts_with(&dir)));

    ops::delete_directory(&mut st, &gw);

    assert!(!dir.exists());
    assert!(st.shadow.is_at_root());
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    for _ in 0..100 {
        assert!(st.shadow.pick_random_file(&mut rng).is_none());
        assert_ne!(st.shadow.pick_random_directory(&mut rng), Some(dir.clone()));
    }
    assert_eq!(st.shadow.recent_len(), 0);
    assert_eq!(st.collector.stats.directories_deleted, 1);
}

#[test]
fn scenario_d_empty_model_picks_none() {
    let st = state(Path::new("/pound"), 1, GateConfig::default());
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    assert_eq!(st.shadow.pick_random_file(&mut rng), None);
    assert_eq!(st.shadow.pick_random_directory(&mut rng), None);
    assert_eq!(st.shadow.pick_random_recent_file(&mut rng), None);
}

/// Counts every call of each kind before forwarding.
#[derive(Default)]
struct Calls {
    creates: AtomicU64,
    dir_deletes: AtomicU64,
    writes: AtomicU64,
    reads: AtomicU64,
    file_deletes: AtomicU64,
}

struct Counting {
    inner: MemoryGateway,
    calls: Calls,
}

impl Counting {
    fn new(root: &str) -> Self {
        Counting {
            inner: MemoryGateway::new(root),
            calls: Calls::default(),
        }
    }
}

impl StorageGateway for Counting {
    fn name(&self) -> &'static str {
        "counting"
    }
    fn create_directory(&self, path: &Path) -> Result<(), GatewayError> {
        self.calls.creates.fetch_add(1, Ordering::Relaxed);
        self.inner.create_directory(path)
    }
    fn delete_directory_recursive(&self, path: &Path) -> Result<(), GatewayError> {
        self.calls.dir_deletes.fetch_add(1, Ordering::Relaxed);
        self.inner.delete_directory_recursive(path)
    }
    fn write_text(&self, path: &Path, content: &str) -> Result<(), GatewayError> {
        self.calls.writes.fetch_add(1, Ordering::Relaxed);
        self.inner.write_text(path, content)
    }
    fn read_text(&self, path: &Path) -> Result<String, GatewayError> {
        self.calls.reads.fetch_add(1, Ordering::Relaxed);
        self.inner.read_text(path)
    }
    fn delete_file(&self, path: &Path) -> Result<(), GatewayError> {
        self.calls.file_deletes.fetch_add(1, Ordering::Relaxed);
        self.inner.delete_file(path)
    }
    fn exists(&self, path: &Path) -> Result<bool, GatewayError> {
        self.inner.exists(path)
    }
    fn is_directory(&self, path: &Path) -> Result<bool, GatewayError> {
        self.inner.is_directory(path)
    }
}

#[test]
fn counters_match_gateway_calls() {
    let gw = Arc::new(Counting::new("/pound"));
    let mut engine = Engine::with_gateway("/pound", Box::new(gw.clone()), options(77)).unwrap();
    let report = engine.run_iterations(3000);
    let stats = report.stats;

    assert!(report.is_clean(), "{}", report);
    assert_eq!(stats.directories_made, gw.calls.creates.load(Ordering::Relaxed));
    assert_eq!(stats.directories_deleted, gw.calls.dir_deletes.load(Ordering::Relaxed));
    assert_eq!(stats.files_written, gw.calls.writes.load(Ordering::Relaxed));
    assert_eq!(stats.files_read, gw.calls.reads.load(Ordering::Relaxed));
    assert_eq!(stats.files_deleted, gw.calls.file_deletes.load(Ordering::Relaxed));
    assert!(stats.files_overwritten <= stats.files_written);
    assert!(stats.files_overwritten > 0);
    assert!(stats.directories_deleted > 0);
}

#[test]
fn faults_are_logged_and_run_continues() {
    let faulty = Arc::new(FaultyGateway::new(
        MemoryGateway::new("/pound"),
        ChaCha8Rng::seed_from_u64(5),
        FaultConfig {
            error_rate: 0.15,
            corruption_rate: 0.1,
        },
    ));
    let mut engine = Engine::with_gateway(
        "/pound",
        Box::new(faulty.clone()),
        EngineOptions {
            max_iterations: Some(1500),
            ..options(5)
        },
    )
    .unwrap();

    let report = engine.run(&CancellationToken::new());
    assert_eq!(report.iterations, 1500);
    assert!(!report.is_clean());

    let injected = report
        .errors
        .iter()
        .filter(|a| a.to_string().contains(pounder_gateway::FAULT_PREFIX))
        .count();
    assert!(injected > 0);
    assert!(faulty.stats().fault_count > 0);

    // Injected failures never touch storage, so the model still matches it.
    let violations = check_final_consistency(&engine.state().shadow, faulty.inner());
    assert!(violations.is_empty(), "{:#?}", violations);
}

#[test]
fn tampering_is_detected_on_read() {
    let mem = MemoryGateway::new("/pound");
    let mut st = state(Path::new("/pound"), 8, GateConfig::default());
    let path = ops::write_random_file(&mut st, &mem, OpKind::WriteRandomFile).unwrap();

    mem.tamper(&path, "surprise");
    ops::read_recent_file(&mut st, &mem);

    assert_eq!(st.collector.error_count(), 1);
    assert!(st.collector.errors()[0]
        .to_string()
        .contains("should have been"));
}

#[test]
fn cancellation_from_another_thread_stops_run() {
    const LIMIT: u64 = 5_000_000;
    let token = CancellationToken::new();
    let handle = token.clone();
    let worker = std::thread::spawn(move || {
        let gw = Box::new(MemoryGateway::new("/pound"));
        let limit = EngineOptions {
            max_iterations: Some(LIMIT),
            ..options(9)
        };
        let mut engine = Engine::with_gateway("/pound", gw, limit).unwrap();
        engine.run(&token)
    });

    std::thread::sleep(std::time::Duration::from_millis(20));
    handle.cancel();
    let report = worker.join().unwrap();
    assert!(report.iterations < LIMIT);
    assert!(report.is_clean(), "{}", report);
}
