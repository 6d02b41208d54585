//! Device discovery on the local subnet.
//!
//! Walks the last octet of a /24, probing each candidate with a short TCP
//! reachability check followed by an SSH handshake using the same
//! credentials a real session would. First match wins; the scan never
//! probes the caller's own address.

use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::session::sftp::SftpSession;
use crate::session::SessionConfig;

/// Reachability test budget per host.
pub const SCAN_TIMEOUT: Duration = Duration::from_millis(50);

/// Handshake budget for hosts that answered the reachability test.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

const SSH_PORT: u16 = 22;

/// Scan the /24 around `base` for a host that is reachable and accepts the
/// session credentials in `config` (its `host` field is ignored). Returns
/// the first match, or `None` when the range is exhausted or cancellation
/// was requested. Cancellation is not an error here.
pub fn discover(
    base: Ipv4Addr,
    config: &SessionConfig,
    cancel: &CancellationToken,
    on_progress: &mut dyn FnMut(f32, &str),
) -> Option<Ipv4Addr> {
    info!(%base, "scanning subnet");
    scan(base, cancel, on_progress, |candidate| {
        if !reachable(candidate) {
            return false;
        }
        debug!(%candidate, "reachable, probing ssh");
        let probe = SessionConfig {
            host: candidate.to_string(),
            ..config.clone()
        }
        .with_timeout(PROBE_TIMEOUT);
        SftpSession::probe(&probe).is_ok()
    })
}

/// Candidate enumeration and progress, separated from the network probe.
fn scan(
    base: Ipv4Addr,
    cancel: &CancellationToken,
    on_progress: &mut dyn FnMut(f32, &str),
    mut probe: impl FnMut(Ipv4Addr) -> bool,
) -> Option<Ipv4Addr> {
    let octets = base.octets();
    for cur in 1..=254u8 {
        if cur == octets[3] {
            continue;
        }
        if cancel.is_cancelled() {
            return None;
        }

        let candidate = Ipv4Addr::new(octets[0], octets[1], octets[2], cur);
        let hit = probe(candidate);
        on_progress(cur as f32 / 254.0, &candidate.to_string());
        if hit {
            info!(%candidate, "device found");
            return Some(candidate);
        }
    }
    None
}

fn reachable(addr: Ipv4Addr) -> bool {
    let sock = SocketAddr::from((addr, SSH_PORT));
    TcpStream::connect_timeout(&sock, SCAN_TIMEOUT).is_ok()
}
