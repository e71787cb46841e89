/// Capabilities the core consumes but does not implement.
///
/// The core never writes attachment bytes and keeps no archive of its own;
/// the host application plugs these in.
use std::io;
use std::path::{Path, PathBuf};

use crate::types::{AttachmentType, DeletedSubtree};

/// Receives every subtree removed by a delete operation.
pub trait ArchiveSink: Send + Sync {
    fn archive(&self, removed: DeletedSubtree);
}

/// A file copied into the managed attachments directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedFile {
    pub name: String,
    pub path: PathBuf,
    pub kind: AttachmentType,
    pub size: u64,
}

/// Managed file storage for card attachments.
pub trait AttachmentStore: Send + Sync {
    fn import_file(&self, source: &Path) -> io::Result<ManagedFile>;
    fn remove_file(&self, path: &str) -> io::Result<()>;
}

pub struct NoopArchive;

impl ArchiveSink for NoopArchive {
    fn archive(&self, removed: DeletedSubtree) {
        let kind = match removed {
            DeletedSubtree::Board { .. } => "board",
            DeletedSubtree::Column { .. } => "column",
            DeletedSubtree::Card { .. } => "card",
        };
        log::debug!(target: "tafel.archive", "Discarding deleted {}", kind);
    }
}

/// Rejects imports and ignores removals.
pub struct NoopAttachments;

impl AttachmentStore for NoopAttachments {
    fn import_file(&self, source: &Path) -> io::Result<ManagedFile> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("no attachment store configured for {}", source.display()),
        ))
    }

    fn remove_file(&self, _path: &str) -> io::Result<()> {
        Ok(())
    }
}

const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "webp", "bmp", "svg"];

pub fn attachment_kind(path: &Path) -> AttachmentType {
    let is_image = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    if is_image {
        AttachmentType::Image
    } else {
        AttachmentType::File
    }
}

/// Copies attachments into one flat directory under a fresh id prefix.
pub struct DirectoryAttachments {
    root: PathBuf,
}

impl DirectoryAttachments {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AttachmentStore for DirectoryAttachments {
    fn import_file(&self, source: &Path) -> io::Result<ManagedFile> {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"))?
            .to_string();
        std::fs::create_dir_all(&self.root)?;
        let target = self.root.join(format!("{}-{}", crate::types::new_id(), name));
        let size = std::fs::copy(source, &target)?;
        log::info!(target: "tafel.attachments", "Imported {} -> {}", source.display(), target.display());
        Ok(ManagedFile {
            kind: attachment_kind(source),
            name,
            path: target,
            size,
        })
    }

    fn remove_file(&self, path: &str) -> io::Result<()> {
        let path = Path::new(path);
        if !path.starts_with(&self.root) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is outside the attachments directory", path.display()),
            ));
        }
        match std::fs::remove_file(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
