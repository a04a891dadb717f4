//! Admission policy: where a join request should be satisfied.
//!
//! Greedy load balancing: a CONN_REQ is handed to the least-loaded
//! neighbour unless this node is at least as lightly loaded, which pushes
//! newcomers toward sparse regions of the overlay instead of piling them
//! onto the bootstrap node.
//!
//! This module decides only. Dialing and forwarding live in the daemon.

use floodmesh_core::PeerMeta;

/// Outcome of routing one join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<K> {
    /// Dial the requester and accept it as a peer here.
    Local,
    /// Pass the request, unchanged, to this peer.
    Forward(K),
    /// A request of our own with no neighbour to carry it.
    Unroutable,
}

/// Pick a route for a CONN_REQ from `origin`.
///
/// `candidates` are the current peers with their last-known meta. Peers whose
/// GID equals `origin` are never chosen. Among the rest the lowest
/// connection count wins, ties broken by lowest GID.
///
/// A request that originates here is never resolved locally.
pub fn route<K>(
    local: &PeerMeta,
    origin: &str,
    candidates: impl IntoIterator<Item = (K, PeerMeta)>,
) -> Route<K> {
    let least_loaded = candidates
        .into_iter()
        .filter(|(_, meta)| meta.gid != origin)
        .min_by(|(_, a), (_, b)| {
            a.connection_count
                .cmp(&b.connection_count)
                .then_with(|| a.gid.cmp(&b.gid))
        });

    if origin == local.gid {
        return match least_loaded {
            Some((key, _)) => Route::Forward(key),
            None => Route::Unroutable,
        };
    }

    match least_loaded {
        Some((key, meta)) if local.connection_count > meta.connection_count => {
            Route::Forward(key)
        }
        _ => Route::Local,
    }
}
