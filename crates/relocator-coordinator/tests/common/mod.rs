//! Scriptable collaborators for coordinator tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use relocator_core::{
    BoxFuture, CacheInvalidator, PreferenceError, PreferenceStore, TransferEngine, TransferError,
};
use relocator_coordinator::Coordinator;
use tokio::sync::Notify;

pub struct MockStore {
    root: Mutex<Option<PathBuf>>,
}

impl MockStore {
    pub fn new(root: &str) -> Self {
        Self {
            root: Mutex::new(Some(PathBuf::from(root))),
        }
    }

    /// A store whose reads fail.
    pub fn broken() -> Self {
        Self {
            root: Mutex::new(None),
        }
    }
}

impl PreferenceStore for MockStore {
    fn get(&self) -> Result<PathBuf, PreferenceError> {
        self.root
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PreferenceError::Missing {
                key: self.key().to_string(),
            })
    }

    fn set(&self, path: &Path) -> Result<(), PreferenceError> {
        *self.root.lock().unwrap() = Some(path.to_path_buf());
        Ok(())
    }

    fn key(&self) -> &str {
        "root_directory"
    }
}

#[derive(Default)]
pub struct MockInvalidator {
    pub keys: Mutex<Vec<String>>,
}

impl CacheInvalidator for MockInvalidator {
    fn invalidate(&self, key: &str) {
        self.keys.lock().unwrap().push(key.to_string());
    }
}

/// Scripted outcome of one engine call.
pub enum Step {
    Succeed,
    Fail(&'static str),
    /// Wait for the gate, then resolve with the inner outcome.
    Gated(Arc<Notify>, Result<(), &'static str>),
}

#[derive(Default)]
pub struct MockEngine {
    pub relocations: Mutex<Vec<(PathBuf, bool)>>,
    pub deletions: Mutex<Vec<PathBuf>>,
    relocate_script: Mutex<VecDeque<Step>>,
    delete_script: Mutex<VecDeque<Step>>,
}

impl MockEngine {
    pub fn script_relocate(&self, step: Step) {
        self.relocate_script.lock().unwrap().push_back(step);
    }

    pub fn script_delete(&self, step: Step) {
        self.delete_script.lock().unwrap().push_back(step);
    }

    pub fn relocation_count(&self) -> usize {
        self.relocations.lock().unwrap().len()
    }

    pub fn deletion_count(&self) -> usize {
        self.deletions.lock().unwrap().len()
    }
}

async fn run_step(step: Option<Step>) -> Result<(), TransferError> {
    let outcome = match step.unwrap_or(Step::Succeed) {
        Step::Succeed => Ok(()),
        Step::Fail(message) => Err(message),
        Step::Gated(gate, outcome) => {
            gate.notified().await;
            outcome
        }
    };
    outcome.map_err(TransferError::other)
}

impl TransferEngine for MockEngine {
    fn relocate<'a>(
        &'a self,
        destination: &'a Path,
        copy_existing: bool,
    ) -> BoxFuture<'a, Result<(), TransferError>> {
        self.relocations
            .lock()
            .unwrap()
            .push((destination.to_path_buf(), copy_existing));
        let step = self.relocate_script.lock().unwrap().pop_front();
        Box::pin(run_step(step))
    }

    fn delete<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<(), TransferError>> {
        self.deletions.lock().unwrap().push(path.to_path_buf());
        let step = self.delete_script.lock().unwrap().pop_front();
        Box::pin(run_step(step))
    }
}

pub struct Harness {
    pub coordinator: Coordinator,
    pub store: Arc<MockStore>,
    pub invalidator: Arc<MockInvalidator>,
    pub engine: Arc<MockEngine>,
}

impl Harness {
    /// Coordinator whose current root is `/d1`.
    pub fn new() -> Self {
        Self::with_store(MockStore::new("/d1"))
    }

    pub fn with_store(store: MockStore) -> Self {
        let store = Arc::new(store);
        let invalidator = Arc::new(MockInvalidator::default());
        let engine = Arc::new(MockEngine::default());
        let coordinator = Coordinator::new(store.clone(), invalidator.clone(), engine.clone());
        Self {
            coordinator,
            store,
            invalidator,
            engine,
        }
    }
}
