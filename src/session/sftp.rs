//! ssh2-backed transfer session.
//!
//! Owns one authenticated SSH session plus one SFTP channel. SFTP has no
//! server-side working directory, so the channel keeps a directory stack
//! and resolves every name against it; `enter`/`leave` stay the public
//! navigation surface. Paths are relative to the login directory, which on
//! the device is where the data root lives.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;

use ssh2::{CheckResult, KnownHostFileKind, Session, Sftp};
use tracing::{debug, trace, warn};

use crate::error::{Result, SyncError};
use crate::model::UPLOAD_CHUNK_SIZE;
use crate::session::{RawEntry, SessionConfig, TransferChannel, UploadStatus};

const SSH_PORT: u16 = 22;

pub struct SftpSession {
    session: Session,
    sftp: Sftp,
    host: String,
    // Stack of entered directory names, relative to the login directory.
    dirs: Vec<String>,
}

impl SftpSession {
    /// Connect, authenticate and open the SFTP channel. Everything is torn
    /// down again when the value drops, on success and failure alike.
    pub fn connect(config: &SessionConfig) -> Result<Self> {
        let session = Self::open_session(config)?;
        let sftp = session
            .sftp()
            .map_err(|e| SyncError::connection(&config.host, e))?;
        debug!(host = %config.host, "sftp channel open");
        Ok(SftpSession {
            session,
            sftp,
            host: config.host.clone(),
            dirs: Vec::new(),
        })
    }

    /// Handshake and authenticate only, then drop the connection. Used by
    /// discovery to confirm a candidate actually hosts the device service.
    pub fn probe(config: &SessionConfig) -> Result<()> {
        Self::open_session(config).map(|_| ())
    }

    fn open_session(config: &SessionConfig) -> Result<Session> {
        let addr = (config.host.as_str(), SSH_PORT)
            .to_socket_addrs()
            .map_err(|e| SyncError::connection(&config.host, e))?
            .next()
            .ok_or_else(|| SyncError::connection(&config.host, "address did not resolve"))?;

        let tcp = TcpStream::connect_timeout(&addr, config.timeout)
            .map_err(|e| SyncError::connection(&config.host, e))?;

        let mut session = Session::new().map_err(|e| SyncError::connection(&config.host, e))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(config.timeout.as_millis() as u32);
        session
            .handshake()
            .map_err(|e| SyncError::connection(&config.host, e))?;

        if config.verify_host_key {
            verify_host_key(&session, &config.host)?;
        }

        session
            .userauth_password(&config.username, &config.password)
            .map_err(|_| SyncError::Auth {
                host: config.host.clone(),
            })?;
        if !session.authenticated() {
            return Err(SyncError::Auth {
                host: config.host.clone(),
            });
        }

        debug!(host = %config.host, user = %config.username, "authenticated");
        Ok(session)
    }

    fn path_of(&self, name: &str) -> PathBuf {
        let mut path: PathBuf = self.dirs.iter().collect();
        path.push(name);
        path
    }

    fn current_dir(&self) -> PathBuf {
        if self.dirs.is_empty() {
            PathBuf::from(".")
        } else {
            self.dirs.iter().collect()
        }
    }
}

impl Drop for SftpSession {
    fn drop(&mut self) {
        // Best effort; the TCP stream goes away regardless.
        if let Err(e) = self.session.disconnect(None, "closing", None) {
            trace!(host = %self.host, error = %e, "disconnect failed");
        }
    }
}

impl TransferChannel for SftpSession {
    fn list(&mut self) -> Result<Vec<RawEntry>> {
        let dir = self.current_dir();
        let entries = self
            .sftp
            .readdir(&dir)
            .map_err(|e| SyncError::listing(dir.display().to_string(), e))?;

        Ok(entries
            .into_iter()
            .filter_map(|(path, stat)| {
                let name = path.file_name()?.to_str()?.to_string();
                Some(RawEntry {
                    name,
                    is_dir: stat.is_dir(),
                })
            })
            .collect())
    }

    fn enter(&mut self, name: &str) -> Result<()> {
        self.dirs.push(name.to_string());
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if self.dirs.pop().is_none() {
            return Err(SyncError::transfer("/", "left more directories than entered"));
        }
        Ok(())
    }

    fn make_dir(&mut self, name: &str) -> Result<()> {
        let path = self.path_of(name);
        debug!(path = %path.display(), "mkdir");
        self.sftp
            .mkdir(&path, 0o755)
            .map_err(|e| SyncError::transfer(path.display().to_string(), e))
    }

    fn upload(
        &mut self,
        staging_name: &str,
        reader: &mut dyn Read,
        len: u64,
        progress: &mut dyn FnMut(u64) -> bool,
    ) -> Result<UploadStatus> {
        let path = self.path_of(staging_name);
        debug!(path = %path.display(), len, "upload start");
        let mut remote = self
            .sftp
            .create(&path)
            .map_err(|e| SyncError::transfer(path.display().to_string(), e))?;

        let mut buf = vec![0u8; UPLOAD_CHUNK_SIZE];
        let mut sent: u64 = 0;
        loop {
            let n = reader
                .read(&mut buf)
                .map_err(|e| SyncError::transfer(path.display().to_string(), e))?;
            if n == 0 {
                break;
            }
            remote
                .write_all(&buf[..n])
                .map_err(|e| SyncError::transfer(path.display().to_string(), e))?;
            sent += n as u64;
            if !progress(sent) {
                debug!(path = %path.display(), sent, "upload cancelled");
                return Ok(UploadStatus::Cancelled);
            }
        }
        trace!(path = %path.display(), sent, "upload complete");
        Ok(UploadStatus::Completed)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let from_path = self.path_of(from);
        let to_path = self.path_of(to);
        debug!(from = %from_path.display(), to = %to_path.display(), "rename");
        self.sftp
            .rename(&from_path, &to_path, None)
            .map_err(|e| SyncError::transfer(to_path.display().to_string(), e))
    }
}

fn verify_host_key(session: &Session, host: &str) -> Result<()> {
    let mut known_hosts = session
        .known_hosts()
        .map_err(|e| SyncError::connection(host, e))?;

    let known_hosts_path = std::env::var_os("HOME")
        .map(PathBuf::from)
        .map(|home| home.join(".ssh").join("known_hosts"))
        .ok_or_else(|| SyncError::connection(host, "cannot locate known_hosts"))?;
    known_hosts
        .read_file(&known_hosts_path, KnownHostFileKind::OpenSSH)
        .map_err(|e| SyncError::connection(host, e))?;

    let (key, _) = session
        .host_key()
        .ok_or_else(|| SyncError::connection(host, "no host key presented"))?;

    match known_hosts.check_port(host, SSH_PORT, key) {
        CheckResult::Match => Ok(()),
        CheckResult::NotFound => Err(SyncError::connection(host, "host key not in known_hosts")),
        CheckResult::Mismatch => {
            warn!(host, "host key mismatch");
            Err(SyncError::connection(host, "host key mismatch"))
        }
        CheckResult::Failure => Err(SyncError::connection(host, "host key check failed")),
    }
}
