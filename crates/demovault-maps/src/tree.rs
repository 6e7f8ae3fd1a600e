//! Recursive size and deletion over a remote directory tree.
//!
//! Both walks keep an explicit stack instead of recursing, so tree depth is bounded by
//! heap rather than call stack.

use std::vec;

use demovault_remote::{RemoteEntry, RemoteFileSource, join};
use tracing::{debug, warn};

use crate::error::{MapsError, MapsResult};

/// Outcome of emptying a remote directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeDeletion {
    /// Every descendant was removed.
    Completed {
        /// Files deleted.
        files: usize,
        /// Directories removed.
        directories: usize,
    },
    /// Deletion stopped at the first failure; the path that failed.
    Failed(String),
}

/// Total bytes of every file below `root`.
///
/// # Errors
///
/// Returns an error if any directory in the tree cannot be listed.
pub fn tree_size(source: &mut dyn RemoteFileSource, root: &str) -> MapsResult<u64> {
    let mut total = 0_u64;
    let mut pending = vec![root.to_string()];
    while let Some(dir) = pending.pop() {
        let entries = source
            .list_entries(&dir)
            .map_err(|err| MapsError::remote("size.list", &dir, err))?;
        for entry in entries {
            if entry.is_dir() {
                pending.push(join(&dir, &entry.name));
            } else {
                total = total.saturating_add(entry.size_bytes);
            }
        }
    }
    Ok(total)
}

struct Frame {
    dir: String,
    pending: vec::IntoIter<RemoteEntry>,
}

/// Delete everything below `root`, keeping `root` itself.
///
/// Children go before their parent and a directory is removed only once all of its
/// descendants are gone. The first failing operation ends the traversal.
pub fn delete_tree_contents(source: &mut dyn RemoteFileSource, root: &str) -> TreeDeletion {
    let entries = match source.list_entries(root) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = root, error = ?err, "failed to list map content");
            return TreeDeletion::Failed(root.to_string());
        }
    };

    let mut files = 0;
    let mut directories = 0;
    let mut stack = vec![Frame {
        dir: root.to_string(),
        pending: entries.into_iter(),
    }];

    while let Some(frame) = stack.last_mut() {
        let Some(entry) = frame.pending.next() else {
            if let Some(finished) = stack.pop()
                && !stack.is_empty()
            {
                if let Err(err) = source.remove_dir(&finished.dir) {
                    warn!(path = %finished.dir, error = ?err, "failed to remove map directory");
                    return TreeDeletion::Failed(finished.dir);
                }
                debug!(path = %finished.dir, "removed map directory");
                directories += 1;
            }
            continue;
        };

        let path = join(&frame.dir, &entry.name);
        if entry.is_dir() {
            match source.list_entries(&path) {
                Ok(children) => stack.push(Frame {
                    dir: path,
                    pending: children.into_iter(),
                }),
                Err(err) => {
                    warn!(path = %path, error = ?err, "failed to list map directory");
                    return TreeDeletion::Failed(path);
                }
            }
        } else if let Err(err) = source.delete_file(&path) {
            warn!(path = %path, error = ?err, "failed to delete map file");
            return TreeDeletion::Failed(path);
        } else {
            files += 1;
        }
    }

    TreeDeletion::Completed { files, directories }
}
