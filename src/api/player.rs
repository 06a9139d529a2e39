//! Remote transport: commands against the server's playback engine

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ApiClient, ApiError};

/// Authoritative engine state as reported by `GET /player/state`
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteState {
    pub paused: bool,
    pub position_sec: f64,
    pub duration_sec: f64,
    pub volume: u8,
}

/// Result of a successful resume
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ResumeOutcome {
    pub paused: bool,
    pub position_sec: Option<f64>,
}

/// Commands the now-playing controller issues to the playback engine.
///
/// `resume` fails with [`ApiError::Precondition`] when the engine has nothing
/// loaded; every other failure is a plain transport error.
#[async_trait]
pub trait PlayerTransport: Send + Sync {
    async fn start_track(&self, track_id: &str, position_sec: f64) -> Result<(), ApiError>;
    async fn pause(&self, paused: bool) -> Result<bool, ApiError>;
    async fn resume(&self) -> Result<ResumeOutcome, ApiError>;
    async fn seek(&self, position_sec: f64) -> Result<f64, ApiError>;
    async fn set_volume(&self, volume: u8) -> Result<u8, ApiError>;
    async fn get_state(&self) -> Result<RemoteState, ApiError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PositionBody {
    position_sec: f64,
}

#[derive(Serialize)]
struct PauseBody {
    paused: bool,
}

#[derive(Serialize)]
struct VolumeBody {
    volume: u8,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CommandResponse {
    paused: Option<bool>,
    position_sec: Option<f64>,
    volume: Option<u8>,
}

/// HTTP implementation of [`PlayerTransport`]
#[derive(Clone, Debug)]
pub struct PlayerClient {
    api: ApiClient,
}

impl PlayerClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PlayerTransport for PlayerClient {
    async fn start_track(&self, track_id: &str, position_sec: f64) -> Result<(), ApiError> {
        if track_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("track id is empty".to_string()));
        }
        crate::log_api_request!("start_track", track_id, position_sec);
        let path = format!("/tracks/{}/play", urlencoding::encode(track_id));
        let result: Result<CommandResponse, _> = self
            .api
            .post_json(&path, &PositionBody {
                position_sec: position_sec.max(0.0),
            })
            .await;
        crate::log_api_result!("start_track", result);
        result.map(|_| ())
    }

    async fn pause(&self, paused: bool) -> Result<bool, ApiError> {
        crate::log_api_request!("pause", paused);
        let result: Result<CommandResponse, _> =
            self.api.post_json("/player/pause", &PauseBody { paused }).await;
        crate::log_api_result!("pause", result);
        Ok(result?.paused.unwrap_or(paused))
    }

    async fn resume(&self) -> Result<ResumeOutcome, ApiError> {
        crate::log_api_request!("resume");
        let result: Result<CommandResponse, _> =
            self.api.post_json("/player/resume", &serde_json::json!({})).await;
        crate::log_api_result!("resume", result);
        let response = result?;
        Ok(ResumeOutcome {
            paused: response.paused.unwrap_or(false),
            position_sec: response.position_sec.filter(|p| p.is_finite()),
        })
    }

    async fn seek(&self, position_sec: f64) -> Result<f64, ApiError> {
        crate::log_api_request!("seek", position_sec);
        let position_sec = position_sec.max(0.0);
        let result: Result<CommandResponse, _> = self
            .api
            .post_json("/player/seek", &PositionBody { position_sec })
            .await;
        crate::log_api_result!("seek", result);
        Ok(result?.position_sec.unwrap_or(position_sec))
    }

    async fn set_volume(&self, volume: u8) -> Result<u8, ApiError> {
        let volume = volume.min(100);
        crate::log_api_request!("set_volume", volume);
        let result: Result<CommandResponse, _> = self
            .api
            .post_json("/player/set-volume", &VolumeBody { volume })
            .await;
        crate::log_api_result!("set_volume", result);
        Ok(result?.volume.unwrap_or(volume))
    }

    async fn get_state(&self) -> Result<RemoteState, ApiError> {
        tracing::trace!("Fetching remote player state");
        let result: Result<RemoteState, _> = self.api.get_json("/player/state", &[]).await;
        crate::log_api_result!("get_state", result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_bodies_use_server_field_names() {
        let body = serde_json::to_value(PositionBody { position_sec: 12.5 }).unwrap();
        assert_eq!(body, serde_json::json!({ "positionSec": 12.5 }));

        let body = serde_json::to_value(VolumeBody { volume: 80 }).unwrap();
        assert_eq!(body, serde_json::json!({ "volume": 80 }));
    }

    #[test]
    fn remote_state_tolerates_partial_payloads() {
        let state: RemoteState = serde_json::from_str(r#"{"paused":true,"positionSec":3.5}"#).unwrap();
        assert!(state.paused);
        assert_eq!(state.position_sec, 3.5);
        assert_eq!(state.duration_sec, 0.0);

        let ok: CommandResponse = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert!(ok.paused.is_none() && ok.position_sec.is_none());
    }

    #[tokio::test]
    async fn empty_track_id_is_rejected_locally() {
        let api = ApiClient::new("http://127.0.0.1:9", std::time::Duration::from_millis(10)).unwrap();
        let err = PlayerClient::new(api).start_track(" ", 0.0).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }
}
