//! Command dispatch: one terminal state transition per request.
//!
//! Each branch validates its own required fields, performs its effect, and
//! builds the response. The agent trusts authenticated callers completely:
//! `filename` is joined to the base directory without traversal checks, and
//! `shell` runs an arbitrary command line with the daemon's privileges.
//! The shared secret is the only gate in front of both.
//!
//! Concurrent connections share no state, so `push` and `pull` on the same
//! filename from two connections race last-writer-wins. No locking is done.

use std::path::Path;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tokio::process::Command;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{RequestError, STATUS_OK};
use crate::transport::protocol::{Envelope, Response};

/// The fixed command set. Parsed from the `action` field by exact match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Push,
    Pull,
    Shell,
    State,
    Clear,
    Shutdown,
}

impl FromStr for Action {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "push" => Ok(Self::Push),
            "pull" => Ok(Self::Pull),
            "shell" => Ok(Self::Shell),
            "state" => Ok(Self::State),
            "clear" => Ok(Self::Clear),
            "shutdown" => Ok(Self::Shutdown),
            _ => Err(RequestError::UnknownAction),
        }
    }
}

/// Dispatch an authorized request.
///
/// Returns `Ok(None)` for `shutdown`, which ends request handling with no
/// response body; every other outcome produces a response.
pub async fn dispatch(
    request: &Envelope,
    base_dir: &Path,
) -> Result<Option<Response>, RequestError> {
    let action_name = request
        .action
        .as_deref()
        .ok_or(RequestError::MissingField("action"))?;
    let action = action_name.parse::<Action>()?;

    debug!(action = action_name, "dispatching");

    match action {
        Action::Push => push(request, base_dir).await.map(Some),
        Action::Pull => pull(request, base_dir).await.map(Some),
        Action::Shell => shell(request).await.map(Some),
        Action::State => state(request).map(Some),
        // Declared cleanup of temporary files; currently a no-op that must
        // not error.
        Action::Clear => Ok(Some(Response::ack())),
        // Ends this request's processing only; the listener keeps running
        // and the connection is closed with nothing written back.
        Action::Shutdown => Ok(None),
    }
}

/// `push`: decode base64 content and write it under the base directory.
///
/// A decode failure is fatal to the request; nothing is written. Empty
/// content is valid and produces an empty file.
async fn push(request: &Envelope, base_dir: &Path) -> Result<Response, RequestError> {
    let filename = request
        .filename
        .as_deref()
        .ok_or(RequestError::MissingField("filename"))?;
    let encoded = request
        .file_content_base64
        .as_deref()
        .ok_or(RequestError::MissingField("file_content_base64"))?;

    let content = if encoded.is_empty() {
        Vec::new()
    } else {
        BASE64.decode(encoded)?
    };

    let path = base_dir.join(filename);
    tokio::fs::write(&path, &content)
        .await
        .map_err(|source| RequestError::WriteFile {
            path: path.display().to_string(),
            source,
        })?;

    info!(path = %path.display(), bytes = content.len(), "stored pushed file");

    Ok(Response::Push {
        status: STATUS_OK,
        compile_uuid: Uuid::new_v4().to_string(),
    })
}

/// `pull`: read a file under the base directory and return it base64-encoded.
async fn pull(request: &Envelope, base_dir: &Path) -> Result<Response, RequestError> {
    let filename = request
        .filename
        .as_deref()
        .ok_or(RequestError::MissingField("filename"))?;

    let path = base_dir.join(filename);
    let content = match tokio::fs::read(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RequestError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        Err(source) => {
            return Err(RequestError::ReadFile {
                path: path.display().to_string(),
                source,
            });
        }
    };

    debug!(path = %path.display(), bytes = content.len(), "read pulled file");

    Ok(Response::Pull {
        status: STATUS_OK,
        filename: filename.to_string(),
        file_content_base64: BASE64.encode(&content),
    })
}

/// `shell`: run a command line through the system shell.
///
/// One invocation captures exit code, stdout, and stderr together. There is
/// no timeout; a hung command stalls only this connection. A failure to
/// launch the interpreter at all is surfaced as a request error rather than
/// taking the server down.
async fn shell(request: &Envelope) -> Result<Response, RequestError> {
    let cmd = request
        .cmd
        .as_deref()
        .ok_or(RequestError::MissingField("cmd"))?;
    if cmd.is_empty() {
        return Err(RequestError::EmptyCommand);
    }

    info!(cmd, "running shell command");

    let output = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .output()
        .await
        .map_err(RequestError::Process)?;

    let return_code = output.status.code().unwrap_or(-1);
    debug!(return_code, "shell command completed");

    Ok(Response::Shell {
        status: STATUS_OK,
        return_code,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// `state`: validate the run identifier and acknowledge.
///
/// There is no job registry behind this; the identifier is accepted but
/// never resolved, and the response is the bare acknowledgment.
fn state(request: &Envelope) -> Result<Response, RequestError> {
    let params = request
        .parameters
        .as_ref()
        .ok_or(RequestError::MissingField("parameters"))?;
    let run_uuid = params
        .run_uuid
        .as_deref()
        .ok_or(RequestError::MissingField("runUUID"))?;

    debug!(run_uuid, "state queried for unresolved run");

    Ok(Response::ack())
}
