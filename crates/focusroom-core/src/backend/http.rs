//! HTTP room backend.
//!
//! Talks to a hosted deployment over JSON. The server procedures are the
//! idempotent ones this design assumes (`join_room_safe`,
//! `leave_room_cleanup`); structured failure reasons travel in the error
//! body. The beacon path mirrors the page-teardown endpoint: a short
//! timeout, no interest in the response.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::RoomBackend;
use crate::error::{BackendError, ConfigError, CoreError, JoinError};
use crate::room::RoomTimerUpdate;
use crate::timer::SessionType;

const JOIN_PATH: &str = "rpc/join_room_safe";
const LEAVE_PATH: &str = "rpc/leave_room_cleanup";
const ACTIVITY_PATH: &str = "rpc/update_user_activity";
const BEACON_PATH: &str = "api/leave-room";
const TIMER_PATH: &str = "rpc/update_room_timer";
const ACHIEVEMENTS_PATH: &str = "rpc/evaluate_achievements";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const BEACON_TIMEOUT: Duration = Duration::from_secs(2);

pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, CoreError> {
        let mut base_url = Url::parse(base_url).map_err(|e| ConfigError::InvalidValue {
            key: "backend.base_url".into(),
            message: e.to_string(),
        })?;
        // Url::join treats a missing trailing slash as a file segment.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CoreError::Backend(BackendError::Network(e.to_string())))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn post_json<T: Serialize + Sync>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<reqwest::Response, BackendError> {
        let url = self.endpoint(path)?;
        Ok(self.client.post(url).json(payload).send().await?)
    }
}

#[derive(Serialize)]
struct RoomUserPayload<'a> {
    room_id: &'a str,
    user_id: &'a str,
}

#[derive(Serialize)]
struct ActivityPayload<'a> {
    room_id: &'a str,
    user_id: &'a str,
    at: DateTime<Utc>,
}

#[derive(Serialize)]
struct TimerPayload<'a> {
    room_id: &'a str,
    remaining_secs: u64,
    session_type: SessionType,
    is_studying: bool,
}

#[derive(Serialize)]
struct UserPayload<'a> {
    user_id: &'a str,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    capacity: Option<u32>,
}

#[derive(Deserialize)]
struct LeaveResponse {
    focus_secs: u64,
}

#[async_trait]
impl RoomBackend for HttpBackend {
    async fn join_room(&self, room_id: &str, user_id: &str) -> Result<(), JoinError> {
        let resp = self
            .post_json(JOIN_PATH, &RoomUserPayload { room_id, user_id })
            .await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body: ErrorBody = resp.json().await.unwrap_or_default();
        match body.error.as_str() {
            "room_full" => Err(JoinError::RoomFull {
                room_id: room_id.to_string(),
                capacity: body.capacity.unwrap_or(0),
            }),
            "room_not_found" => Err(JoinError::RoomNotFound(room_id.to_string())),
            "already_joined" => Err(JoinError::AlreadyJoined(room_id.to_string())),
            _ => Err(JoinError::Backend(BackendError::Status {
                status: status.as_u16(),
                message: body.error,
            })),
        }
    }

    async fn leave_room(&self, room_id: &str, user_id: &str) -> Result<u64, BackendError> {
        let resp = self
            .post_json(LEAVE_PATH, &RoomUserPayload { room_id, user_id })
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        let body: LeaveResponse = resp
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(body.focus_secs)
    }

    async fn heartbeat(
        &self,
        room_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), BackendError> {
        let resp = self
            .post_json(ACTIVITY_PATH, &ActivityPayload { room_id, user_id, at })
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    async fn send_beacon(&self, room_id: &str, user_id: &str) -> Result<(), BackendError> {
        let url = self.endpoint(BEACON_PATH)?;
        // Best effort: transport failures propagate for logging, but the
        // response itself is of no interest.
        self.client
            .post(url)
            .json(&RoomUserPayload { room_id, user_id })
            .timeout(BEACON_TIMEOUT)
            .send()
            .await?;
        Ok(())
    }

    async fn update_room_timer(
        &self,
        room_id: &str,
        update: RoomTimerUpdate,
    ) -> Result<(), BackendError> {
        let resp = self
            .post_json(
                TIMER_PATH,
                &TimerPayload {
                    room_id,
                    remaining_secs: update.remaining_secs,
                    session_type: update.session_type,
                    is_studying: update.is_studying,
                },
            )
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    async fn evaluate_achievements(&self, user_id: &str) -> Result<(), BackendError> {
        let resp = self.post_json(ACHIEVEMENTS_PATH, &UserPayload { user_id }).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}
