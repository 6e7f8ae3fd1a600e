//! Remote file tree capability.
//!
//! # Design
//! - Sessions are stateful (`&mut self`) because transports keep a control connection.
//! - Directory traversal for sizing and deletion only uses [`RemoteFileSource::list_entries`].
//! - Remote paths are `/`-separated strings independent of the local platform.

use std::io::Write;

use demovault_config::ServerConfig;

use crate::error::RemoteResult;

/// Kind of a remote directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Bare entry name (no directory component).
    pub name: String,
    /// Whether the entry is a file or a directory.
    pub kind: EntryKind,
    /// Size in bytes; zero for directories.
    pub size_bytes: u64,
}

impl RemoteEntry {
    /// Build a file entry.
    #[must_use]
    pub fn file(name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size_bytes,
        }
    }

    /// Build a directory entry.
    #[must_use]
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            size_bytes: 0,
        }
    }

    /// Whether the entry is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// An open session against one server's remote file tree.
pub trait RemoteFileSource: Send {
    /// Bare names of the entries in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    fn list_names(&mut self, dir: &str) -> RemoteResult<Vec<String>>;

    /// Stream the file at `path` into `sink`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer fails at any point; `sink` may then hold a
    /// partial copy.
    fn retrieve(&mut self, path: &str, sink: &mut dyn Write) -> RemoteResult<u64>;

    /// Delete the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file could not be removed.
    fn delete_file(&mut self, path: &str) -> RemoteResult<()>;

    /// Entries of `dir` with kind and size.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    fn list_entries(&mut self, dir: &str) -> RemoteResult<Vec<RemoteEntry>>;

    /// Remove the empty directory at `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory could not be removed.
    fn remove_dir(&mut self, dir: &str) -> RemoteResult<()>;
}

/// Opens [`RemoteFileSource`] sessions for configured servers.
pub trait RemoteConnector: Send + Sync {
    /// Open an authenticated session for `server`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be established.
    fn connect(&self, server: &ServerConfig) -> RemoteResult<Box<dyn RemoteFileSource>>;
}

/// Join a remote directory and a child name with exactly one separator.
#[must_use]
pub fn join(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if dir.is_empty() {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Last `/`-separated component of a remote path.
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_normalises_separators() {
        assert_eq!(join("/maps", "content/730"), "/maps/content/730");
        assert_eq!(join("/maps/", "/content"), "/maps/content");
        assert_eq!(join("", "demos"), "/demos");
        assert_eq!(join("relative", "a.dem"), "relative/a.dem");
    }

    #[test]
    fn file_name_strips_directories() {
        assert_eq!(file_name("/demos/2024-01-01_10-00-00_x.dem"), "2024-01-01_10-00-00_x.dem");
        assert_eq!(file_name("a.dem"), "a.dem");
        assert_eq!(file_name("/maps/content/"), "content");
    }

    #[test]
    fn entry_constructors_set_kind() {
        assert!(RemoteEntry::directory("123").is_dir());
        let file = RemoteEntry::file("a.vpk", 42);
        assert!(!file.is_dir());
        assert_eq!(file.size_bytes, 42);
    }
}
