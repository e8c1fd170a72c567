//! Group storage
//!
//! A group is a directory named by its [`GroupId`] under one of three
//! lifecycle folders (`draft/`, `sent/`, `trash/`) of the storage root, holding
//! a `meta.json` plus the group's processed captures. The landing zone
//! (`buffer/`) sits beside them.

use booth_common::api::{
    Folder, GroupDetail, GroupListing, GroupMeta, GroupSource, GroupSummary, MoveAction,
};
use booth_common::{Error, GroupId, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Name of the per-group metadata file
pub const META_FILE: &str = "meta.json";

/// Directory layout under the storage root
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Landing zone the capture device writes into
    pub fn landing_zone(&self) -> PathBuf {
        self.root.join("buffer")
    }

    pub fn folder_dir(&self, folder: Folder) -> PathBuf {
        self.root.join(folder.dir_name())
    }

    pub fn group_dir(&self, folder: Folder, id: &GroupId) -> PathBuf {
        self.folder_dir(folder).join(id.as_str())
    }

    /// Where the watcher relocates captures for `id`
    pub fn draft_dir(&self, id: &GroupId) -> PathBuf {
        self.group_dir(Folder::Draft, id)
    }

    /// Create the landing zone and all lifecycle folders
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.landing_zone())?;
        for folder in Folder::ALL {
            std::fs::create_dir_all(self.folder_dir(folder))?;
        }
        Ok(())
    }
}

/// Filesystem-backed group store
#[derive(Debug, Clone)]
pub struct GroupStore {
    layout: StorageLayout,
}

impl GroupStore {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Create a new draft group
    pub async fn create(&self, id: Option<GroupId>, ids: Vec<String>) -> Result<GroupSummary> {
        let id = id.unwrap_or_else(GroupId::generate);
        if self.locate(&id).await.is_some() {
            return Err(Error::InvalidInput(format!("Group already exists: {id}")));
        }

        let dir = self.layout.draft_dir(&id);
        tokio::fs::create_dir_all(&dir).await?;

        let meta = GroupMeta {
            ids,
            created_at: Utc::now(),
        };
        tokio::fs::write(dir.join(META_FILE), serde_json::to_vec_pretty(&meta)?).await?;
        info!(group = %id, "Created draft group");

        Ok(GroupSummary {
            uuid: id,
            created_at: meta.created_at,
            ids: meta.ids,
            image_count: 0,
        })
    }

    /// List every group, by lifecycle folder
    pub async fn list(&self) -> Result<GroupListing> {
        Ok(GroupListing {
            drafts: self.list_folder(Folder::Draft).await?,
            sent: self.list_folder(Folder::Sent).await?,
            trash: self.list_folder(Folder::Trash).await?,
        })
    }

    /// Full detail for one group
    pub async fn get(&self, id: &GroupId) -> Result<GroupDetail> {
        let (folder, dir) = self
            .locate(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("Group not found: {id}")))?;

        let (meta, images) = read_group_dir(&dir).await?;
        Ok(GroupDetail {
            uuid: id.clone(),
            folder,
            ids: meta.ids,
            created_at: meta.created_at,
            images,
        })
    }

    /// Move a group between lifecycle folders
    pub async fn move_group(&self, id: &GroupId, action: MoveAction) -> Result<Folder> {
        let (from, dir) = self
            .locate(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("Group not found: {id}")))?;
        let to = action.target(from)?;

        let target_dir = self.layout.group_dir(to, id);
        tokio::fs::create_dir_all(self.layout.folder_dir(to)).await?;
        tokio::fs::rename(&dir, &target_dir).await?;
        info!(group = %id, "Moved group from {} to {}", from, to);
        Ok(to)
    }

    /// Lifecycle folder and directory currently holding `id`
    pub async fn locate(&self, id: &GroupId) -> Option<(Folder, PathBuf)> {
        for folder in Folder::ALL {
            let dir = self.layout.group_dir(folder, id);
            if tokio::fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
                return Some((folder, dir));
            }
        }
        None
    }

    async fn list_folder(&self, folder: Folder) -> Result<Vec<GroupSummary>> {
        let folder_dir = self.layout.folder_dir(folder);
        let mut entries = match tokio::fs::read_dir(&folder_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut groups = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let Ok(id) = GroupId::new(name) else {
                continue;
            };
            match read_group_dir(&entry.path()).await {
                Ok((meta, images)) => groups.push(GroupSummary {
                    uuid: id,
                    created_at: meta.created_at,
                    ids: meta.ids,
                    image_count: images.len(),
                }),
                Err(e) => warn!(group = %id, "Skipping unreadable group: {}", e),
            }
        }

        groups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(groups)
    }
}

impl GroupSource for GroupStore {
    async fn fetch_group(&self, id: &GroupId) -> Result<GroupDetail> {
        self.get(id).await
    }
}

/// Read a group's meta and image names
///
/// A group without `meta.json` gets empty ids and its directory's modified
/// time as creation time.
async fn read_group_dir(dir: &Path) -> Result<(GroupMeta, Vec<String>)> {
    let meta_path = dir.join(META_FILE);
    let meta = match tokio::fs::read(&meta_path).await {
        Ok(bytes) => serde_json::from_slice::<GroupMeta>(&bytes)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let modified = tokio::fs::metadata(dir).await?.modified()?;
            GroupMeta {
                ids: Vec::new(),
                created_at: DateTime::<Utc>::from(modified),
            }
        }
        Err(e) => return Err(e.into()),
    };

    let mut images = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == META_FILE || name.starts_with('.') {
            continue;
        }
        images.push(name);
    }
    images.sort();

    Ok((meta, images))
}
