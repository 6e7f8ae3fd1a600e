//! In-memory remote file tree implementing the remote capabilities.
//!
//! Clones share state, so a test can hand one clone to the code under test and keep
//! another to inspect the tree and the call log afterwards.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use demovault_config::ServerConfig;
use demovault_remote::{RemoteConnector, RemoteEntry, RemoteError, RemoteFileSource, RemoteResult};

/// Operation recorded by [`MemoryRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    /// Session opened for a server id.
    Connect(String),
    /// Bare-name listing.
    ListNames(String),
    /// Download.
    Retrieve(String),
    /// File deletion.
    DeleteFile(String),
    /// Listing with metadata.
    ListEntries(String),
    /// Directory removal.
    RemoveDir(String),
}

#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, size: u64 },
    Directory,
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<String, Node>,
    calls: Vec<RemoteCall>,
    refuse_connect: bool,
    failing_lists: BTreeSet<String>,
    failing_deletes: BTreeSet<String>,
    retrieve_limits: HashMap<String, usize>,
}

/// Shared in-memory remote tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    state: Arc<Mutex<State>>,
}

impl MemoryRemote {
    /// Empty tree containing only the root directory.
    #[must_use]
    pub fn new() -> Self {
        let remote = Self::default();
        remote.lock().nodes.insert("/".into(), Node::Directory);
        remote
    }

    /// Add a file with `data`, creating parent directories.
    pub fn add_file(&self, path: &str, data: &[u8]) {
        self.insert_file(path, data.to_vec(), data.len() as u64);
    }

    /// Add a file that reports `size` bytes without holding them.
    pub fn add_sized_file(&self, path: &str, size: u64) {
        self.insert_file(path, Vec::new(), size);
    }

    /// Add a directory, creating parents.
    pub fn add_dir(&self, path: &str) {
        let path = normalize(path);
        let mut state = self.lock();
        for ancestor in ancestors(&path) {
            state.nodes.entry(ancestor).or_insert(Node::Directory);
        }
        state.nodes.insert(path, Node::Directory);
    }

    /// Whether any node exists at `path`.
    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        self.lock().nodes.contains_key(&normalize(path))
    }

    /// Bare names of the children of `dir`.
    #[must_use]
    pub fn children(&self, dir: &str) -> Vec<String> {
        let dir = normalize(dir);
        self.lock()
            .nodes
            .keys()
            .filter(|path| parent(path).as_deref() == Some(dir.as_str()))
            .map(|path| leaf(path).to_string())
            .collect()
    }

    /// Every recorded call in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Refuse new sessions.
    pub fn refuse_connections(&self) {
        self.lock().refuse_connect = true;
    }

    /// Make listings of `dir` fail.
    pub fn fail_list(&self, dir: &str) {
        self.lock().failing_lists.insert(normalize(dir));
    }

    /// Make deletion of the file or directory at `path` fail.
    pub fn fail_delete(&self, path: &str) {
        self.lock().failing_deletes.insert(normalize(path));
    }

    /// Make downloads of `path` fail after `bytes` bytes were written.
    pub fn fail_retrieve_after(&self, path: &str, bytes: usize) {
        self.lock().retrieve_limits.insert(normalize(path), bytes);
    }

    fn insert_file(&self, path: &str, data: Vec<u8>, size: u64) {
        let path = normalize(path);
        let mut state = self.lock();
        for ancestor in ancestors(&path) {
            state.nodes.entry(ancestor).or_insert(Node::Directory);
        }
        state.nodes.insert(path, Node::File { data, size });
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn rejected(operation: &'static str, path: &str, reason: &'static str) -> RemoteError {
    RemoteError::Rejected {
        operation,
        path: path.to_string(),
        reason,
    }
}

impl RemoteFileSource for MemoryRemote {
    fn list_names(&mut self, dir: &str) -> RemoteResult<Vec<String>> {
        Ok(self
            .list_entries_logged(dir, RemoteCall::ListNames(normalize(dir)))?
            .into_iter()
            .map(|entry| entry.name)
            .collect())
    }

    fn retrieve(&mut self, path: &str, sink: &mut dyn Write) -> RemoteResult<u64> {
        let path = normalize(path);
        let (data, limit) = {
            let mut state = self.lock();
            state.calls.push(RemoteCall::Retrieve(path.clone()));
            let Some(Node::File { data, .. }) = state.nodes.get(&path) else {
                return Err(rejected("retrieve", &path, "not a file"));
            };
            (data.clone(), state.retrieve_limits.get(&path).copied())
        };

        let write_err = |_: std::io::Error| rejected("retrieve", &path, "sink write failed");
        if let Some(limit) = limit {
            sink.write_all(&data[..limit.min(data.len())])
                .map_err(write_err)?;
            return Err(rejected("retrieve", &path, "connection reset"));
        }
        sink.write_all(&data).map_err(write_err)?;
        Ok(data.len() as u64)
    }

    fn delete_file(&mut self, path: &str) -> RemoteResult<()> {
        let path = normalize(path);
        let mut state = self.lock();
        state.calls.push(RemoteCall::DeleteFile(path.clone()));
        if state.failing_deletes.contains(&path) {
            return Err(rejected("delete_file", &path, "permission denied"));
        }
        match state.nodes.get(&path) {
            Some(Node::File { .. }) => {
                state.nodes.remove(&path);
                Ok(())
            }
            _ => Err(rejected("delete_file", &path, "not a file")),
        }
    }

    fn list_entries(&mut self, dir: &str) -> RemoteResult<Vec<RemoteEntry>> {
        self.list_entries_logged(dir, RemoteCall::ListEntries(normalize(dir)))
    }

    fn remove_dir(&mut self, dir: &str) -> RemoteResult<()> {
        let dir = normalize(dir);
        let mut state = self.lock();
        state.calls.push(RemoteCall::RemoveDir(dir.clone()));
        if state.failing_deletes.contains(&dir) {
            return Err(rejected("remove_dir", &dir, "permission denied"));
        }
        if !matches!(state.nodes.get(&dir), Some(Node::Directory)) {
            return Err(rejected("remove_dir", &dir, "not a directory"));
        }
        if state
            .nodes
            .keys()
            .any(|path| parent(path).as_deref() == Some(dir.as_str()))
        {
            return Err(rejected("remove_dir", &dir, "directory not empty"));
        }
        state.nodes.remove(&dir);
        Ok(())
    }
}

impl MemoryRemote {
    fn list_entries_logged(&self, dir: &str, call: RemoteCall) -> RemoteResult<Vec<RemoteEntry>> {
        let dir = normalize(dir);
        let mut state = self.lock();
        state.calls.push(call);
        if state.failing_lists.contains(&dir) {
            return Err(rejected("list", &dir, "listing refused"));
        }
        if !matches!(state.nodes.get(&dir), Some(Node::Directory)) {
            return Err(rejected("list", &dir, "no such directory"));
        }
        Ok(state
            .nodes
            .iter()
            .filter(|(path, _)| parent(path).as_deref() == Some(dir.as_str()))
            .map(|(path, node)| match node {
                Node::File { size, .. } => RemoteEntry::file(leaf(path), *size),
                Node::Directory => RemoteEntry::directory(leaf(path)),
            })
            .collect())
    }
}

impl RemoteConnector for MemoryRemote {
    fn connect(&self, server: &ServerConfig) -> RemoteResult<Box<dyn RemoteFileSource>> {
        let mut state = self.lock();
        state.calls.push(RemoteCall::Connect(server.server_id.clone()));
        if state.refuse_connect {
            return Err(RemoteError::Resolve {
                host: server.host.clone(),
                port: server.port,
            });
        }
        drop(state);
        Ok(Box::new(self.clone()))
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn parent(path: &str) -> Option<String> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(index) => Some(path[..index].to_string()),
        None => None,
    }
}

fn leaf(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn ancestors(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = parent(path);
    while let Some(dir) = current {
        current = parent(&dir);
        out.push(dir);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_create_parent_directories() -> RemoteResult<()> {
        let mut remote = MemoryRemote::new();
        remote.add_file("/maps/content/730/1/a.vpk", b"abc");
        assert!(remote.exists("/maps/content/730/1"));
        let entries = remote.list_entries("/maps/content/730/1")?;
        assert_eq!(entries, vec![RemoteEntry::file("a.vpk", 3)]);
        Ok(())
    }

    #[test]
    fn remove_dir_requires_empty_directory() -> RemoteResult<()> {
        let mut remote = MemoryRemote::new();
        remote.add_file("/a/b.txt", b"");
        assert!(remote.remove_dir("/a").is_err());
        remote.delete_file("/a/b.txt")?;
        remote.remove_dir("/a")?;
        assert!(!remote.exists("/a"));
        Ok(())
    }

    #[test]
    fn retrieve_failure_writes_prefix() {
        let mut remote = MemoryRemote::new();
        remote.add_file("/demos/a.dem", b"0123456789");
        remote.fail_retrieve_after("/demos/a.dem", 4);
        let mut sink = Vec::new();
        assert!(remote.retrieve("/demos/a.dem", &mut sink).is_err());
        assert_eq!(sink, b"0123");
    }

    #[test]
    fn clones_share_state_and_calls() -> RemoteResult<()> {
        let remote = MemoryRemote::new();
        remote.add_file("/demos/a.dem", b"x");
        let mut session = remote.connect(&crate::fixtures::server("s1"))?;
        session.delete_file("/demos/a.dem")?;
        assert!(!remote.exists("/demos/a.dem"));
        assert_eq!(
            remote.calls(),
            vec![
                RemoteCall::Connect("s1".into()),
                RemoteCall::DeleteFile("/demos/a.dem".into()),
            ]
        );
        Ok(())
    }
}
