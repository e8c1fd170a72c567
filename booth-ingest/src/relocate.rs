//! Relocation: post-process a capture into its group, then remove the source
//!
//! Sequence for one file:
//! 1. Create `draft/<group>/` (idempotent)
//! 2. Watermark into a hidden `.<name>.partial` file beside the destination
//! 3. Rename the partial onto `draft/<group>/<name>`
//! 4. Remove the source from the landing zone
//!
//! The source is removed only after step 3 succeeded, so there is always at
//! least one complete copy. Any failure before that leaves the source in the
//! landing zone and cleans up the partial.

use booth_common::GroupId;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::groups::StorageLayout;
use crate::watermark::{Placement, Watermarker};

/// Result of one successful relocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocated {
    pub file_name: String,
    pub group: GroupId,
    pub destination: PathBuf,
    pub placement: Option<Placement>,
}

/// Moves captures from the landing zone into group storage
#[derive(Clone)]
pub struct Relocator {
    layout: StorageLayout,
    watermarker: Arc<Watermarker>,
}

impl Relocator {
    pub fn new(layout: StorageLayout, watermarker: Watermarker) -> Self {
        Self {
            layout,
            watermarker: Arc::new(watermarker),
        }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Relocate `source` into `group`'s draft storage
    pub async fn relocate(&self, source: &Path, group: &GroupId) -> Result<Relocated> {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Internal(format!("No file name in {}", source.display())))?;

        let group_dir = self.layout.draft_dir(group);
        tokio::fs::create_dir_all(&group_dir)
            .await
            .map_err(|e| Error::relocation(&group_dir, e))?;

        let destination = group_dir.join(&file_name);
        ensure_vacant(&destination).await?;
        let partial = group_dir.join(format!(".{file_name}.partial"));

        let watermarker = Arc::clone(&self.watermarker);
        let (src, tmp) = (source.to_path_buf(), partial.clone());
        let processed = tokio::task::spawn_blocking(move || watermarker.apply(&src, &tmp))
            .await
            .map_err(|e| Error::Internal(format!("Watermark task failed: {e}")))?;

        let placement = match processed {
            Ok(placement) => placement,
            Err(e) => {
                discard_partial(&partial).await;
                return Err(e.into());
            }
        };

        // Processing can take a while; another arrival may have landed the name
        if let Err(e) = ensure_vacant(&destination).await {
            discard_partial(&partial).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&partial, &destination).await {
            discard_partial(&partial).await;
            return Err(Error::relocation(&destination, e));
        }
        debug!("Wrote {}", destination.display());

        if let Err(e) = tokio::fs::remove_file(source).await {
            error!(
                "Processed {} into {} but could not remove the source; both copies remain: {}",
                file_name, group, e
            );
            return Err(Error::relocation(source, e));
        }

        info!("Moved {} to {} draft folder", file_name, group);
        Ok(Relocated {
            file_name,
            group: group.clone(),
            destination,
            placement,
        })
    }
}

/// Processed files are never replaced
async fn ensure_vacant(destination: &Path) -> Result<()> {
    match tokio::fs::try_exists(destination).await {
        Ok(false) => Ok(()),
        Ok(true) => {
            warn!("{} already exists, keeping the capture in the landing zone", destination.display());
            Err(Error::relocation(
                destination,
                std::io::Error::new(std::io::ErrorKind::AlreadyExists, "processed file already exists"),
            ))
        }
        Err(e) => Err(Error::relocation(destination, e)),
    }
}

async fn discard_partial(partial: &Path) {
    match tokio::fs::remove_file(partial).await {
        Ok(()) => debug!("Removed partial {}", partial.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => debug!("Could not remove partial {}: {}", partial.display(), e),
    }
}
