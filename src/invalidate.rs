//! Invalidation Engine Module
//!
//! Bulk deletion of every key matching a namespace pattern.

use tracing::debug;

use crate::error::Result;
use crate::transport::Connection;

/// Deletes every key currently matching a glob pattern.
///
/// Resolves the pattern to the matching key set with a scan, then
/// issues one deletion per key. The sequence is not atomic: keys
/// created between the scan and the deletions survive. Callers that
/// need strict invalidation must serialize writers against bulk
/// clears externally.
///
/// Returns the number of keys removed.
pub async fn delete_matching(conn: &mut Connection, pattern: &str) -> Result<usize> {
    let keys = conn.keys(pattern).await?;
    debug!(pattern, matched = keys.len(), "bulk invalidation scan");

    let mut removed = 0;
    for key in &keys {
        if conn.del(key).await? {
            removed += 1;
        }
    }

    debug!(pattern, removed, "bulk invalidation complete");
    Ok(removed)
}
