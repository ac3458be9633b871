//! HTTP client for the codespace REST surface.

use codespace_core::protocol::{
    CreateSpaceRequest, DeleteFileRequest, DeleteFileResponse, ErrorResponse, PasscodeRequest,
    PrivacyRequest, VerifyResponse,
};
use codespace_core::{CodespaceError, PrivacyState, SpaceData, SpaceStatus};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

/// Errors surfaced by CLI commands
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Codespace(#[from] CodespaceError),

    #[error("Failed to reach server: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Connection error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Too many incorrect passcodes")]
    TooManyAttempts,
}

pub type CliResult<T> = std::result::Result<T, CliError>;

/// Operations of the REST surface used by the bootstrap protocol and the commands
pub trait SpaceApi {
    /// Returns the space and whether it was created by this call
    fn get_or_create(&self, name: &str) -> CliResult<(SpaceData, bool)>;

    fn status(&self, name: &str) -> CliResult<SpaceStatus>;

    /// Pre-validate a passcode; `Ok(false)` on a wrong passcode
    fn verify(&self, name: &str, passcode: &str) -> CliResult<bool>;

    /// Fetch the full space through the access gate
    fn fetch(&self, name: &str, passcode: Option<&str>) -> CliResult<SpaceData>;

    /// `current` is the passcode a private space is protected by now
    fn set_privacy(
        &self,
        name: &str,
        is_public: bool,
        passcode: Option<&str>,
        current: Option<&str>,
    ) -> CliResult<PrivacyState>;

    fn delete_file(&self, name: &str, file: &str) -> CliResult<DeleteFileResponse>;
}

/// Blocking HTTP implementation of [`SpaceApi`]
pub struct HttpApi {
    base: Url,
    client: Client,
}

impl HttpApi {
    pub fn new(server: &str) -> CliResult<Self> {
        Ok(Self {
            base: Url::parse(server)?,
            client: Client::new(),
        })
    }

    /// WebSocket endpoint on the same host
    pub fn ws_url(&self) -> CliResult<Url> {
        let mut url = self.base.join("/ws")?;
        let scheme = if self.base.scheme() == "https" {
            "wss"
        } else {
            "ws"
        };
        url.set_scheme(scheme).map_err(|_| CodespaceError::Validation(format!(
            "Cannot derive a WebSocket URL from {}",
            self.base
        )))?;
        Ok(url)
    }

    fn space_url(&self, name: &str, action: Option<&str>) -> CliResult<Url> {
        let mut url = self.base.join("/api/codespaces")?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                CodespaceError::Validation(format!("Server URL cannot be a base: {}", self.base))
            })?;
            segments.push(name);
            if let Some(action) = action {
                segments.push(action);
            }
        }
        Ok(url)
    }
}

impl SpaceApi for HttpApi {
    fn get_or_create(&self, name: &str) -> CliResult<(SpaceData, bool)> {
        let url = self.base.join("/api/codespaces")?;
        let resp = self
            .client
            .post(url)
            .json(&CreateSpaceRequest {
                name: Some(name.to_string()),
            })
            .send()?;
        let created = resp.status() == StatusCode::CREATED;
        Ok((parse(resp, name)?, created))
    }

    fn status(&self, name: &str) -> CliResult<SpaceStatus> {
        let resp = self.client.get(self.space_url(name, Some("status"))?).send()?;
        parse(resp, name)
    }

    fn verify(&self, name: &str, passcode: &str) -> CliResult<bool> {
        let resp = self
            .client
            .post(self.space_url(name, Some("verify"))?)
            .json(&PasscodeRequest {
                passcode: Some(passcode.to_string()),
            })
            .send()?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Ok(false);
        }
        let verified: VerifyResponse = parse(resp, name)?;
        Ok(verified.success)
    }

    fn fetch(&self, name: &str, passcode: Option<&str>) -> CliResult<SpaceData> {
        let resp = self
            .client
            .post(self.space_url(name, Some("data"))?)
            .json(&PasscodeRequest {
                passcode: passcode.map(str::to_string),
            })
            .send()?;
        parse(resp, name)
    }

    fn set_privacy(
        &self,
        name: &str,
        is_public: bool,
        passcode: Option<&str>,
        current: Option<&str>,
    ) -> CliResult<PrivacyState> {
        let resp = self
            .client
            .patch(self.space_url(name, Some("privacy"))?)
            .json(&PrivacyRequest {
                is_public,
                passcode: passcode.map(str::to_string),
                current_passcode: current.map(str::to_string),
            })
            .send()?;
        parse(resp, name)
    }

    fn delete_file(&self, name: &str, file: &str) -> CliResult<DeleteFileResponse> {
        let resp = self
            .client
            .delete(self.space_url(name, Some("delete"))?)
            .json(&DeleteFileRequest {
                file: Some(file.to_string()),
            })
            .send()?;
        parse(resp, name)
    }
}

/// Decode a success body, or map an error status back to a codespace error
fn parse<T: DeserializeOwned>(resp: Response, name: &str) -> CliResult<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json()?);
    }

    let message = resp
        .json::<ErrorResponse>()
        .map(|body| body.msg)
        .unwrap_or_else(|_| status.to_string());
    Err(match status {
        StatusCode::NOT_FOUND => CodespaceError::SpaceNotFound(name.to_string()).into(),
        StatusCode::UNAUTHORIZED => CodespaceError::Unauthorized.into(),
        StatusCode::BAD_REQUEST => CodespaceError::Validation(message).into(),
        _ => CliError::Server {
            status: status.as_u16(),
            message,
        },
    })
}
