//! Active-Group Register
//!
//! Single-owner holder of the currently active group. One actor task owns the
//! value; every write goes through its command queue, so writes are applied
//! strictly in arrival order and the most recent one wins. Readers take a
//! snapshot from a watch channel and never block writers.

use booth_common::GroupId;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use crate::error::{Error, Result};

const COMMAND_QUEUE_DEPTH: usize = 32;

enum RegisterCommand {
    Set {
        group: Option<GroupId>,
        applied: oneshot::Sender<()>,
    },
}

/// Handle to the register actor
///
/// Cheap to clone; the actor exits once every handle is dropped.
#[derive(Clone)]
pub struct RegisterHandle {
    commands: mpsc::Sender<RegisterCommand>,
    current: watch::Receiver<Option<GroupId>>,
}

impl RegisterHandle {
    /// Spawn the register actor with no active group
    pub fn spawn() -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (current_tx, current_rx) = watch::channel(None);

        tokio::spawn(run_register(commands_rx, current_tx));

        Self {
            commands: commands_tx,
            current: current_rx,
        }
    }

    /// Overwrite the active group (`None` clears it)
    ///
    /// Returns once the write has been applied, so a snapshot taken afterwards
    /// observes it (or a later write).
    pub async fn set(&self, group: Option<GroupId>) -> Result<()> {
        let (applied_tx, applied_rx) = oneshot::channel();
        self.commands
            .send(RegisterCommand::Set {
                group,
                applied: applied_tx,
            })
            .await
            .map_err(|_| Error::Internal("active group register stopped".to_string()))?;
        applied_rx
            .await
            .map_err(|_| Error::Internal("active group register stopped".to_string()))
    }

    /// Value of the most recently applied write
    pub fn snapshot(&self) -> Option<GroupId> {
        self.current.borrow().clone()
    }

    /// Watch for changes
    pub fn subscribe(&self) -> watch::Receiver<Option<GroupId>> {
        self.current.clone()
    }
}

async fn run_register(
    mut commands: mpsc::Receiver<RegisterCommand>,
    current: watch::Sender<Option<GroupId>>,
) {
    debug!("Active group register started");
    while let Some(command) = commands.recv().await {
        match command {
            RegisterCommand::Set { group, applied } => {
                match &group {
                    Some(id) => info!("Active group set to: {}", id),
                    None => info!("Active group cleared"),
                }
                current.send_replace(group);
                let _ = applied.send(());
            }
        }
    }
    debug!("Active group register stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gid(s: &str) -> GroupId {
        GroupId::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_starts_empty() {
        let register = RegisterHandle::spawn();
        assert_eq!(register.snapshot(), None);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let register = RegisterHandle::spawn();

        register.set(Some(gid("G1"))).await.unwrap();
        register.set(Some(gid("G2"))).await.unwrap();
        assert_eq!(register.snapshot(), Some(gid("G2")));

        register.set(None).await.unwrap();
        assert_eq!(register.snapshot(), None);
    }

    #[tokio::test]
    async fn test_concurrent_writers_serialize() {
        let register = RegisterHandle::spawn();

        let writers: Vec<_> = (0..20)
            .map(|i| {
                let register = register.clone();
                tokio::spawn(async move { register.set(Some(gid(&format!("G{i}")))).await })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        // Whatever the interleaving, exactly one of the written values is held
        let held = register.snapshot().unwrap();
        assert!((0..20).any(|i| held == gid(&format!("G{i}"))));

        register.set(Some(gid("final"))).await.unwrap();
        assert_eq!(register.snapshot(), Some(gid("final")));
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let register = RegisterHandle::spawn();
        let mut rx = register.subscribe();

        register.set(Some(gid("G1"))).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Some(gid("G1")));
    }
}
