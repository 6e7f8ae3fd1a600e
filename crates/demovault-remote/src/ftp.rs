//! FTP-backed [`RemoteFileSource`].
//!
//! # Design
//! - One control connection per session; the session quits when dropped.
//! - Binary transfer mode is set once at login.
//! - `LIST` output is parsed with `suppaftp::list::File`; unparsable lines are skipped
//!   with a warning so a single odd entry does not hide the rest of a directory.

use std::io::{self, Write};
use std::net::ToSocketAddrs;
use std::str::FromStr;
use std::time::Duration;

use demovault_config::ServerConfig;
use suppaftp::list::File as ListedFile;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};
use tracing::{debug, warn};

use crate::error::{RemoteError, RemoteResult};
use crate::source::{RemoteConnector, RemoteEntry, RemoteFileSource, file_name};

/// Default TCP connect timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens FTP sessions for configured servers.
#[derive(Debug, Clone)]
pub struct FtpConnector {
    connect_timeout: Duration,
}

impl Default for FtpConnector {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl FtpConnector {
    /// Connector using a custom connect timeout.
    #[must_use]
    pub const fn with_timeout(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl RemoteConnector for FtpConnector {
    fn connect(&self, server: &ServerConfig) -> RemoteResult<Box<dyn RemoteFileSource>> {
        let session = FtpSession::open(server, self.connect_timeout)?;
        Ok(Box::new(session))
    }
}

/// Authenticated FTP session for one server.
pub struct FtpSession {
    stream: FtpStream,
    host: String,
}

impl FtpSession {
    /// Connect, log in and switch to binary mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not resolve or any handshake step fails.
    pub fn open(server: &ServerConfig, connect_timeout: Duration) -> RemoteResult<Self> {
        let connect_err = |source| RemoteError::Connect {
            host: server.host.clone(),
            port: server.port,
            source,
        };
        let addr = (server.host.as_str(), server.port)
            .to_socket_addrs()
            .map_err(|err| connect_err(FtpError::ConnectionError(err)))?
            .next()
            .ok_or_else(|| RemoteError::Resolve {
                host: server.host.clone(),
                port: server.port,
            })?;

        let mut stream = FtpStream::connect_timeout(addr, connect_timeout).map_err(connect_err)?;
        debug!(host = %server.host, port = server.port, "connected to ftp server");
        stream
            .login(server.username.as_str(), server.password.expose())
            .map_err(connect_err)?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(connect_err)?;
        debug!(host = %server.host, user = %server.username, "logged in to ftp server");

        Ok(Self {
            stream,
            host: server.host.clone(),
        })
    }
}

impl RemoteFileSource for FtpSession {
    fn list_names(&mut self, dir: &str) -> RemoteResult<Vec<String>> {
        let names = self
            .stream
            .nlst(Some(dir))
            .map_err(|source| RemoteError::command("nlst", dir.to_string(), source))?;
        Ok(names
            .iter()
            .map(|name| file_name(name).to_string())
            .filter(|name| !name.is_empty() && name != "." && name != "..")
            .collect())
    }

    fn retrieve(&mut self, path: &str, sink: &mut dyn Write) -> RemoteResult<u64> {
        self.stream
            .retr(path, |reader| {
                io::copy(reader, &mut *sink).map_err(FtpError::ConnectionError)
            })
            .map_err(|source| RemoteError::command("retr", path.to_string(), source))
    }

    fn delete_file(&mut self, path: &str) -> RemoteResult<()> {
        self.stream
            .rm(path)
            .map_err(|source| RemoteError::command("dele", path.to_string(), source))
    }

    fn list_entries(&mut self, dir: &str) -> RemoteResult<Vec<RemoteEntry>> {
        let lines = self
            .stream
            .list(Some(dir))
            .map_err(|source| RemoteError::command("list", dir.to_string(), source))?;
        Ok(parse_listing(dir, &lines))
    }

    fn remove_dir(&mut self, dir: &str) -> RemoteResult<()> {
        self.stream
            .rmdir(dir)
            .map_err(|source| RemoteError::command("rmd", dir.to_string(), source))
    }
}

impl Drop for FtpSession {
    fn drop(&mut self) {
        if let Err(err) = self.stream.quit() {
            debug!(host = %self.host, error = %err, "ftp quit failed");
        }
    }
}

fn parse_listing(dir: &str, lines: &[String]) -> Vec<RemoteEntry> {
    let mut entries = Vec::with_capacity(lines.len());
    for line in lines {
        match ListedFile::from_str(line) {
            Ok(file) => {
                let name = file.name();
                if name == "." || name == ".." {
                    continue;
                }
                if file.is_directory() {
                    entries.push(RemoteEntry::directory(name));
                } else {
                    let size = u64::try_from(file.size()).unwrap_or(u64::MAX);
                    entries.push(RemoteEntry::file(name, size));
                }
            }
            Err(err) => {
                warn!(dir = dir, line = %line, error = ?err, "skipping unparsable listing line");
            }
        }
    }
    entries
}
