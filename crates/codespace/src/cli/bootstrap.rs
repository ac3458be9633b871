//! Session bootstrap: status check, optional passcode verification,
//! authenticated fetch. Joining the room happens afterwards, with the same passcode.

use codespace_core::{ClientReplica, CodespaceError};
use log::debug;

use super::api::{CliError, CliResult, SpaceApi};

/// Number of passcode prompts before giving up
pub const MAX_PASSCODE_ATTEMPTS: usize = 3;

/// A fetched space, ready to join
#[derive(Debug)]
pub struct Bootstrapped {
    pub replica: ClientReplica,
    /// The passcode that passed the gate, re-sent when joining the room
    pub passcode: Option<String>,
}

/// Run the bootstrap protocol against `api`.
///
/// A passcode given up front is tried first; after that `prompt` is asked for a
/// new one (with the 1-based attempt number) until it passes verification,
/// `prompt` returns `None`, or [`MAX_PASSCODE_ATTEMPTS`] wrong passcodes were tried.
pub fn bootstrap<A, P>(
    api: &A,
    name: &str,
    passcode: Option<String>,
    mut prompt: P,
) -> CliResult<Bootstrapped>
where
    A: SpaceApi,
    P: FnMut(usize) -> Option<String>,
{
    let status = api.status(name)?;

    if status.is_public {
        debug!("{} is public, fetching without passcode", name);
        let snapshot = api.fetch(name, None)?;
        return Ok(Bootstrapped {
            replica: ClientReplica::from_snapshot(snapshot),
            passcode: None,
        });
    }

    let mut candidate = passcode;
    let mut attempts = 0;
    let passcode = loop {
        let supplied = match candidate.take() {
            Some(supplied) => supplied,
            None => prompt(attempts + 1).ok_or(CodespaceError::Unauthorized)?,
        };

        if api.verify(name, &supplied)? {
            break supplied;
        }

        attempts += 1;
        debug!("Wrong passcode for {} (attempt {})", name, attempts);
        if attempts >= MAX_PASSCODE_ATTEMPTS {
            return Err(CliError::TooManyAttempts);
        }
    };

    let snapshot = api.fetch(name, Some(&passcode))?;
    Ok(Bootstrapped {
        replica: ClientReplica::from_snapshot(snapshot),
        passcode: Some(passcode),
    })
}
