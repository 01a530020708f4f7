//! Shared-secret request authorization.
//!
//! Every request must carry a `secretkey` field; it is checked before the
//! `action` field is ever inspected. The comparison is exact and runs in
//! constant time over the longer of the two inputs. An empty configured
//! secret disables authentication entirely.

use crate::error::RequestError;

/// Authorize a request against the configured secret.
///
/// An absent client secret is always rejected, even when authentication is
/// disabled, so clients cannot distinguish a disabled server from a
/// misconfigured one by omitting the field.
pub fn authorize(server_secret: &str, client_secret: Option<&str>) -> Result<(), RequestError> {
    let Some(client) = client_secret else {
        return Err(RequestError::SecretKeyMismatch);
    };

    if server_secret.is_empty() || constant_time_eq(server_secret, client) {
        Ok(())
    } else {
        Err(RequestError::SecretKeyMismatch)
    }
}

/// Compare two strings without short-circuiting on the first differing byte.
fn constant_time_eq(left: &str, right: &str) -> bool {
    let left_bytes = left.as_bytes();
    let right_bytes = right.as_bytes();
    let max_len = left_bytes.len().max(right_bytes.len());

    let mut diff = left_bytes.len() ^ right_bytes.len();
    for index in 0..max_len {
        let left_byte = *left_bytes.get(index).unwrap_or(&0);
        let right_byte = *right_bytes.get(index).unwrap_or(&0);
        diff |= usize::from(left_byte ^ right_byte);
    }

    diff == 0
}
