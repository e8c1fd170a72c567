//! Ingestion Watcher
//!
//! Drains the landing zone into group storage. Each arrival is attributed to
//! the active group at the moment it is observed: the register is read once,
//! synchronously, before any waiting or I/O, so a later change of the active
//! group never reattributes a file already in flight.
//!
//! Arrivals are handled independently and may overlap. A file name is claimed
//! while in flight so duplicate filesystem notifications for the same file
//! start only one relocation.
//!
//! Files that arrive with no active group stay in the landing zone. They are
//! reconsidered only on a new filesystem event for them or on the startup
//! scan; selecting a group later does not sweep them in.

use booth_common::{GroupId, HubEvent};
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::hub::Hub;
use crate::register::RegisterHandle;
use crate::relocate::{Relocated, Relocator};

/// Default stability window before a capture is considered fully written
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(100);

const IDLE_POLL: Duration = Duration::from_millis(20);

/// What happened to one arrival
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Processed into the group's storage and announced
    Relocated(Relocated),
    /// No active group; the file stays in the landing zone
    Backlogged,
    /// Hidden file or not a regular file
    Ignored,
    /// Another relocation of the same file is running
    AlreadyInFlight,
    /// The file disappeared before it could be processed
    Vanished,
    /// Processing or relocation failed; the file stays in the landing zone
    Failed,
}

/// A file observed in the landing zone and attributed to a group
#[derive(Debug)]
pub struct Arrival {
    path: PathBuf,
    file_name: String,
    group: GroupId,
    _claim: InFlightClaim,
}

impl Arrival {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Group snapshotted when the file was observed
    pub fn group(&self) -> &GroupId {
        &self.group
    }
}

type InFlightSet = Arc<Mutex<HashSet<String>>>;

/// Holds a file name in the in-flight set until dropped
#[derive(Debug)]
struct InFlightClaim {
    set: InFlightSet,
    file_name: String,
}

impl InFlightClaim {
    fn acquire(set: &InFlightSet, file_name: &str) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file_name.to_string());
        inserted.then(|| Self {
            set: Arc::clone(set),
            file_name: file_name.to_string(),
        })
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.file_name);
    }
}

struct WatcherInner {
    relocator: Relocator,
    register: RegisterHandle,
    hub: Hub,
    settle: Duration,
    in_flight: InFlightSet,
}

/// Landing zone watcher
#[derive(Clone)]
pub struct IngestWatcher {
    inner: Arc<WatcherInner>,
}

impl IngestWatcher {
    pub fn new(relocator: Relocator, register: RegisterHandle, hub: Hub, settle: Duration) -> Self {
        Self {
            inner: Arc::new(WatcherInner {
                relocator,
                register,
                hub,
                settle,
                in_flight: Arc::new(Mutex::new(HashSet::new())),
            }),
        }
    }

    pub fn landing_zone(&self) -> PathBuf {
        self.inner.relocator.layout().landing_zone()
    }

    /// Number of arrivals currently being relocated
    pub fn in_flight(&self) -> usize {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Resolve once no relocation is in flight
    pub async fn wait_idle(&self) {
        while self.in_flight() > 0 {
            tokio::time::sleep(IDLE_POLL).await;
        }
    }

    /// Observe a landing zone entry and attribute it to the active group
    ///
    /// Never waits and does no I/O: the register snapshot is taken right
    /// here. Whether the entry is still a regular file is checked in
    /// [`process`](Self::process).
    pub fn observe(&self, path: &Path) -> std::result::Result<Arrival, Outcome> {
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Err(Outcome::Ignored);
        };
        if file_name.starts_with('.') {
            return Err(Outcome::Ignored);
        }

        let Some(group) = self.inner.register.snapshot() else {
            info!("No active group set, {} will remain in landing zone", file_name);
            return Err(Outcome::Backlogged);
        };

        let Some(claim) = InFlightClaim::acquire(&self.inner.in_flight, &file_name) else {
            debug!("{} already in flight", file_name);
            return Err(Outcome::AlreadyInFlight);
        };

        debug!(group = %group, "Observed {}", file_name);
        Ok(Arrival {
            path: path.to_path_buf(),
            file_name,
            group,
            _claim: claim,
        })
    }

    /// Wait for the file to settle, relocate it, and announce it
    pub async fn process(&self, arrival: Arrival) -> Outcome {
        match tokio::fs::metadata(&arrival.path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Outcome::Ignored,
            Err(_) => {
                debug!("{} no longer in landing zone", arrival.file_name);
                return Outcome::Vanished;
            }
        }

        if let Err(e) = wait_until_stable(&arrival.path, self.inner.settle).await {
            debug!("{} vanished while settling: {}", arrival.file_name, e);
            return Outcome::Vanished;
        }

        match self.inner.relocator.relocate(&arrival.path, &arrival.group).await {
            Ok(relocated) => {
                self.inner.hub.broadcast(&HubEvent::FileMoved {
                    file_name: relocated.file_name.clone(),
                    group_id: relocated.group.clone(),
                });
                Outcome::Relocated(relocated)
            }
            Err(e) => {
                error!(
                    group = %arrival.group,
                    "Error moving {}, left in landing zone: {}", arrival.file_name, e
                );
                Outcome::Failed
            }
        }
    }

    /// Handle one arrival to completion
    pub async fn on_file_arrived(&self, path: &Path) -> Outcome {
        match self.observe(path) {
            Ok(arrival) => self.process(arrival).await,
            Err(outcome) => outcome,
        }
    }

    /// Observe now, process on a separate task
    pub fn dispatch(&self, path: &Path) -> Option<JoinHandle<Outcome>> {
        let arrival = self.observe(path).ok()?;
        let watcher = self.clone();
        Some(tokio::spawn(async move { watcher.process(arrival).await }))
    }

    /// Feed every file already in the landing zone through the arrival path
    ///
    /// Returns the number of files dispatched for relocation.
    pub async fn scan_existing(&self) -> Result<usize> {
        let mut entries = tokio::fs::read_dir(self.landing_zone()).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await.is_ok_and(|t| t.is_file()) {
                paths.push(entry.path());
            }
        }
        paths.sort();

        let dispatched = paths.iter().filter(|p| self.dispatch(p).is_some()).count();
        info!("Initial scan complete, {} of {} files dispatched", dispatched, paths.len());
        Ok(dispatched)
    }

    /// Run the startup scan once a group is active
    ///
    /// The register starts empty on every start, so scanning straight away
    /// would only backlog leftovers again. Returns `Ok(0)` if cancelled or the
    /// register stops before any group is selected.
    pub async fn scan_when_active(&self, cancel: CancellationToken) -> Result<usize> {
        let mut active = self.inner.register.subscribe();
        tokio::select! {
            _ = cancel.cancelled() => return Ok(0),
            selected = active.wait_for(Option::is_some) => {
                if selected.is_err() {
                    return Ok(0);
                }
            }
        }
        self.scan_existing().await
    }

    /// Start watching the landing zone until `cancel` fires
    ///
    /// Files already present are scanned after the watch is in place and a
    /// group has been selected, so nothing that lands during startup is missed.
    pub fn spawn(self, cancel: CancellationToken) -> Result<JoinHandle<()>> {
        let landing = self.landing_zone();
        std::fs::create_dir_all(&landing)?;
        let landing = landing.canonicalize()?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut fs_watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })?;
        fs_watcher.watch(&landing, RecursiveMode::NonRecursive)?;
        info!("Watching landing zone {}", landing.display());

        let scanner = self.clone();
        let scan_cancel = cancel.clone();
        let scan_dir = landing.clone();
        tokio::spawn(async move {
            if let Err(e) = scanner.scan_when_active(scan_cancel).await {
                warn!("Initial scan of {} failed: {}", scan_dir.display(), e);
            }
        });

        Ok(tokio::spawn(async move {
            // Dropping the notify watcher stops event delivery
            let _fs_watcher = fs_watcher;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = rx.recv() => match received {
                        Some(Ok(event)) => {
                            for path in arrival_paths(&event, &landing) {
                                self.dispatch(&path);
                            }
                        }
                        Some(Err(e)) => error!("Watcher error: {}", e),
                        None => break,
                    },
                }
            }
            info!("Landing zone watcher stopped");
        }))
    }
}

/// Paths in `landing` that an event reports as newly present
fn arrival_paths(event: &Event, landing: &Path) -> Vec<PathBuf> {
    let candidates: Vec<&PathBuf> = match event.kind {
        EventKind::Create(_)
        | EventKind::Access(AccessKind::Close(AccessMode::Write))
        | EventKind::Modify(ModifyKind::Name(RenameMode::To))
        | EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => event.paths.iter().collect(),
        // paths[0] is the old name, paths[1] the new one
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event.paths.get(1).into_iter().collect(),
        _ => Vec::new(),
    };

    candidates
        .into_iter()
        .filter(|p| p.parent() == Some(landing))
        .cloned()
        .collect()
}

/// Wait until the file size is unchanged across one settle interval
async fn wait_until_stable(path: &Path, settle: Duration) -> std::io::Result<u64> {
    let mut last = tokio::fs::metadata(path).await?.len();
    loop {
        tokio::time::sleep(settle).await;
        let current = tokio::fs::metadata(path).await?.len();
        if current == last {
            return Ok(current);
        }
        last = current;
    }
}
