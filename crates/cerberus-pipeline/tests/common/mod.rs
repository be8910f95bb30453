#![allow(dead_code)]

use cerberus_history::{HistoryStore, MemoryHistory};
use cerberus_pipeline::{EngineOptions, Pipeline, PipelineBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Report written by the stub engine in `ok` mode
pub const HAPPY_REPORT: &str = r#"{"metadata":{"size":10},"instruction_statistics":{"total_instructions_analyzed":0,"instruction_types":{}},"ml_operations":{"summary":{"total_operations":0},"operations":[]},"section_analysis":[],"summary":{},"framework_analysis":{"detected_frameworks":[],"framework_counts":{}}}"#;

/// Path to the stub engine, made executable
pub fn stub_engine() -> PathBuf {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/stub-engine.sh");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        if perms.mode() & 0o111 != 0o111 {
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).unwrap();
        }
    }

    path
}

/// A pipeline wired to the stub engine, a private scratch root and an
/// in-memory history
pub struct Harness {
    pub tmp: TempDir,
    pub history: Arc<MemoryHistory>,
    pub pipeline: Pipeline,
}

impl Harness {
    pub fn new(mode: &str) -> Self {
        Self::with(mode, |options| options, |builder| builder)
    }

    pub fn with(
        mode: &str,
        options: impl FnOnce(EngineOptions) -> EngineOptions,
        builder: impl FnOnce(PipelineBuilder) -> PipelineBuilder,
    ) -> Self {
        let tmp = TempDir::new().unwrap();
        let history = Arc::new(MemoryHistory::new());

        let pipeline = builder(
            Pipeline::builder(stub_engine())
                .scratch_dir(tmp.path().join("jobs"))
                .history(Arc::clone(&history) as Arc<dyn HistoryStore>)
                .options(options(EngineOptions::new().env("STUB_MODE", mode))),
        )
        .build();

        Self {
            tmp,
            history,
            pipeline,
        }
    }

    /// Entries left under the scratch root
    pub fn leftovers(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.pipeline.workspace().root()) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => panic!("cannot read scratch root: {e}"),
        }
    }
}

/// Whether `pid` is alive, zombies excluded
#[cfg(target_os = "linux")]
pub fn is_running(pid: u32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    // The state letter follows the parenthesised command name.
    let state = stat
        .rsplit_once(')')
        .and_then(|(_, rest)| rest.trim_start().chars().next());
    !matches!(state, Some('Z' | 'X') | None)
}

/// Wait up to two seconds for every pid listed in `pidfile` to exit
#[cfg(target_os = "linux")]
pub async fn assert_all_exited(pidfile: &Path) {
    let pids: Vec<u32> = std::fs::read_to_string(pidfile)
        .unwrap()
        .lines()
        .map(|line| line.trim().parse().unwrap())
        .collect();
    assert!(!pids.is_empty(), "engine never wrote its pids");

    for _ in 0..40 {
        if !pids.iter().any(|&pid| is_running(pid)) {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    let alive: Vec<u32> = pids.into_iter().filter(|&pid| is_running(pid)).collect();
    panic!("engine processes still running: {alive:?}");
}
