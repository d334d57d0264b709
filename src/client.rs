use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveTime};
use parking_lot::{Mutex, RwLock};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::logger::{MessageLogMode, MessageLogger};
use crate::normalize::normalize;
use crate::protocol::{self, DEFAULT_BASE_URL};
use crate::session::Session;
use crate::types::*;
use crate::{Error, Result};

/// Wait between a command's 200 response and the dashboard re-read.
/// The backend applies commands to the hardware asynchronously.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Filter schedules are expressed in 15-minute slots; a day has 96. Zero disables the cycle.
const MAX_FILTER_INTERVALS: u32 = 96;

pub struct SpaClientBuilder {
    email: String,
    password: String,
    base_url: String,
    spa_id: Option<String>,
    settle_delay: Duration,
    request_timeout: Duration,
    accept_invalid_certs: bool,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl SpaClientBuilder {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            spa_id: None,
            settle_delay: DEFAULT_SETTLE_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            accept_invalid_certs: false,
            log_mode: None,
            log_path: None,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn spa_id(mut self, id: impl Into<String>) -> Self {
        self.spa_id = Some(id.into());
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Skip TLS certificate verification. Only for endpoints with a broken chain.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<SpaClient> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(protocol::ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(protocol::ACCEPT_LANGUAGE));

        if self.accept_invalid_certs {
            warn!("TLS certificate verification disabled for vendor calls");
        }

        let http = reqwest::Client::builder()
            .user_agent(protocol::USER_AGENT)
            .default_headers(headers)
            .timeout(self.request_timeout)
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(Mutex::new(MessageLogger::new(mode, &path)?)),
            _ => None,
        };

        Ok(SpaClient {
            http,
            base_url: self.base_url,
            email: self.email,
            password: self.password,
            spa_id: RwLock::new(self.spa_id),
            session: tokio::sync::Mutex::new(None),
            profile: RwLock::new(None),
            settle_delay: self.settle_delay,
            command_gate: tokio::sync::Mutex::new(()),
            logger,
        })
    }
}

/// Owns the HTTP client and the bearer session for one vendor account.
///
/// All methods take `&self`; share the client behind an `Arc`. Commands are
/// serialized internally so a post, its settle wait and its re-read never
/// interleave with another command.
pub struct SpaClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
    password: String,
    spa_id: RwLock<Option<String>>,
    session: tokio::sync::Mutex<Option<Session>>,
    profile: RwLock<Option<Value>>,
    settle_delay: Duration,
    command_gate: tokio::sync::Mutex<()>,
    logger: Option<Mutex<MessageLogger>>,
}

impl SpaClient {
    pub fn builder(email: impl Into<String>, password: impl Into<String>) -> SpaClientBuilder {
        SpaClientBuilder::new(email, password)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn spa_id(&self) -> Option<String> {
        self.spa_id.read().clone()
    }

    pub fn select_spa(&self, id: impl Into<String>) {
        let id = id.into();
        info!(spa_id = %id, "spa selected");
        *self.spa_id.write() = Some(id);
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.session.lock().await.as_ref().is_some_and(Session::is_valid)
    }

    /// Last profile fetched by [`fetch_who_am_i`](Self::fetch_who_am_i).
    pub fn profile(&self) -> Option<Value> {
        self.profile.read().clone()
    }

    /// An account without a profile cannot drive any entity.
    pub fn is_usable(&self) -> bool {
        self.profile.read().is_some()
    }

    /// Install a previously issued session, e.g. one persisted by the host.
    /// It is used until it expires, then replaced by a fresh login.
    pub async fn restore_session(&self, session: Session) {
        debug!(expires_at_millis = session.expires_at_millis(), "session restored");
        *self.session.lock().await = Some(session);
    }

    /// Log in and store a fresh session.
    pub async fn login(&self) -> Result<()> {
        let mut slot = self.session.lock().await;
        self.login_locked(&mut slot).await
    }

    async fn login_locked(&self, slot: &mut Option<Session>) -> Result<()> {
        let result = self.request_token().await;
        match result {
            Ok(token) => {
                *slot = Some(Session::new(token));
                debug!("login succeeded");
                Ok(())
            }
            Err(e) => {
                error!("login failed: {e}");
                Err(e)
            }
        }
    }

    async fn request_token(&self) -> Result<String> {
        let url = format!("{}{}", self.base_url, protocol::LOGIN_PATH);
        let body = protocol::login_body(&self.email, &self.password);
        debug!(url = %url, "logging in");
        self.log_request("POST", protocol::LOGIN_PATH, Some(&body));

        let resp = self.http.post(&url).json(&body).send().await?;
        let status = resp.status().as_u16();
        self.log_response(protocol::LOGIN_PATH, status);
        let text = resp.text().await?;

        if status != 200 {
            return Err(Error::Auth(format!("HTTP status {status}: {text}")));
        }
        let json: Value = serde_json::from_str(&text)
            .map_err(|e| Error::Auth(format!("unreadable login response: {e}")))?;
        protocol::parse_access_token(&json)
            .ok_or_else(|| Error::Auth(format!("no access token in response: {json}")))
    }

    /// Return a valid bearer token, logging in first when the session has expired.
    pub async fn ensure_authenticated(&self) -> Result<String> {
        let mut slot = self.session.lock().await;
        if let Some(session) = slot.as_ref()
            && session.is_valid()
        {
            return Ok(session.access_token.clone());
        }
        debug!("session missing or expired, logging in");
        self.login_locked(&mut slot).await?;
        slot.as_ref()
            .map(|s| s.access_token.clone())
            .ok_or_else(|| Error::Auth("login stored no session".to_string()))
    }

    pub async fn fetch_who_am_i(&self) -> Result<Value> {
        let result = async {
            let body = self.authed_get(protocol::PROFILE_PATH).await?;
            protocol::parse_profile(&body)
                .ok_or_else(|| Error::Parse(format!("no user in profile response: {body}")))
        }
        .await;

        match result {
            Ok(user) => {
                info!("profile loaded");
                *self.profile.write() = Some(user.clone());
                Ok(user)
            }
            Err(e) => {
                error!("profile fetch failed: {e}");
                Err(e)
            }
        }
    }

    pub async fn list_owned_spas(&self) -> Result<Vec<SpaSummary>> {
        let result = self.authed_get(protocol::OWNED_SPAS_PATH).await;
        match result {
            Ok(body) => Ok(protocol::parse_owned_spas(&body)),
            Err(e) => {
                error!("listing owned spas failed: {e}");
                Err(e)
            }
        }
    }

    /// Read the dashboard of the selected spa and normalize it.
    pub async fn fetch_state(&self) -> Result<SpaState> {
        self.fetch_state_tagged(None).await
    }

    async fn fetch_state_tagged(&self, command_id: Option<&str>) -> Result<SpaState> {
        let result = async {
            let spa_id = self.spa_id().ok_or(Error::NoSpaSelected)?;
            let path = protocol::dashboard_path(&spa_id);
            let body = self.authed_get(&path).await?;
            if let Some(logger) = &self.logger {
                logger.lock().log_dashboard(200, &body, command_id);
            }
            let data = body
                .get("data")
                .ok_or_else(|| Error::Parse("dashboard response has no data".to_string()))?;
            normalize(data)
        }
        .await;

        if let Err(e) = &result {
            error!(command_id = ?command_id, "dashboard fetch failed: {e}");
        }
        result
    }

    async fn authed_get(&self, path: &str) -> Result<Value> {
        let token = self.ensure_authenticated().await?;
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET");
        self.log_request("GET", path, None);

        let resp = self.http.get(&url).bearer_auth(token).send().await?;
        let status = resp.status().as_u16();
        self.log_response(path, status);
        let text = resp.text().await?;
        if status != 200 {
            return Err(Error::Status { status, body: text });
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Post a command; on HTTP 200 wait the settle delay and return the re-read state.
    /// Any other status returns immediately without waiting or re-reading.
    async fn post_and_refresh(&self, action: &str, path: &str, data: Value) -> Result<SpaState> {
        let _gate = self.command_gate.lock().await;
        let command_id = Uuid::new_v4().to_string();

        let result = async {
            let token = self.ensure_authenticated().await?;
            if let Some(logger) = &self.logger {
                logger.lock().log_command(action, &command_id, &data);
            }
            let url = format!("{}{}", self.base_url, path);
            debug!(action, command_id = %command_id, url = %url, "sending command");

            let resp = self.http.post(&url).bearer_auth(token).json(&data).send().await?;
            let status = resp.status().as_u16();
            self.log_response(path, status);
            if status != 200 {
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::Status { status, body });
            }

            tokio::time::sleep(self.settle_delay).await;
            self.fetch_state_tagged(Some(&command_id)).await
        }
        .await;

        if let Err(e) = &result {
            error!(action, command_id = %command_id, "command failed: {e}");
        }
        result
    }

    fn selected_spa(&self) -> Result<String> {
        self.spa_id().ok_or(Error::NoSpaSelected)
    }

    fn log_request(&self, method: &str, path: &str, body: Option<&Value>) {
        if let Some(logger) = &self.logger {
            logger.lock().log_request(method, path, body);
        }
    }

    fn log_response(&self, path: &str, status: u16) {
        if let Some(logger) = &self.logger {
            logger.lock().log_response(path, status);
        }
    }

    // -- Command methods --

    /// Set the target water temperature.
    pub async fn set_temperature(&self, temp: Temperature) -> Result<SpaState> {
        let spa_id = self.selected_spa()?;
        let data = protocol::temperature_data(&spa_id, temp.to_vendor_fahrenheit());
        self.post_and_refresh("set_temperature", protocol::TEMPERATURE_VALUE_PATH, data)
            .await
    }

    pub async fn set_temperature_range(&self, high: bool) -> Result<SpaState> {
        let spa_id = self.selected_spa()?;
        let data = protocol::temperature_range_data(&spa_id, high);
        self.post_and_refresh("set_temperature_range", protocol::TEMPERATURE_RANGE_PATH, data)
            .await
    }

    pub async fn set_heater_mode(&self, mode: HeaterMode) -> Result<SpaState> {
        let spa_id = self.selected_spa()?;
        let data = protocol::heater_mode_data(&spa_id, mode.as_vendor_str());
        self.post_and_refresh("set_heater_mode", protocol::HEATER_MODE_PATH, data)
            .await
    }

    pub async fn set_panel_lock(&self, locked: bool) -> Result<SpaState> {
        let spa_id = self.selected_spa()?;
        let data = protocol::panel_lock_data(&spa_id, locked);
        self.post_and_refresh("set_panel_lock", protocol::PANEL_STATE_PATH, data)
            .await
    }

    /// Set a pump, blower or light on the given port to one of its `available_values`.
    pub async fn set_component_state(
        &self,
        device_number: u32,
        state: &str,
        component_type: &str,
    ) -> Result<SpaState> {
        let spa_id = self.selected_spa()?;
        let data = protocol::component_state_data(&spa_id, device_number, state, component_type);
        self.post_and_refresh("set_component_state", protocol::COMPONENT_STATE_PATH, data)
            .await
    }

    pub async fn set_light_state(&self, device_number: u32, state: &str) -> Result<SpaState> {
        self.set_component_state(device_number, state, "light").await
    }

    pub async fn set_jet_state(&self, device_number: u32, state: &str) -> Result<SpaState> {
        self.set_component_state(device_number, state, "jet").await
    }

    pub async fn set_blower_state(&self, device_number: u32, state: &str) -> Result<SpaState> {
        self.set_component_state(device_number, state, "blower").await
    }

    /// Schedule filter cycle `device_number` to start at `start` for `intervals` 15-minute slots.
    /// Zero intervals disables the cycle.
    pub async fn set_filter_schedule(
        &self,
        device_number: u32,
        intervals: u32,
        start: NaiveTime,
    ) -> Result<SpaState> {
        if intervals > MAX_FILTER_INTERVALS {
            return Err(Error::InvalidArgument(format!(
                "filter intervals {intervals} not in 0..={MAX_FILTER_INTERVALS}"
            )));
        }
        let spa_id = self.selected_spa()?;
        let data = protocol::filter_schedule_data(&spa_id, device_number, intervals, start);
        self.post_and_refresh("set_filter_schedule", protocol::FILTER_SCHEDULE_PATH, data)
            .await
    }

    pub async fn set_time(&self, date: NaiveDate, time: NaiveTime, military: bool) -> Result<SpaState> {
        let spa_id = self.selected_spa()?;
        let data = protocol::time_data(&spa_id, date, time, military);
        self.post_and_refresh("set_time", protocol::TIME_PATH, data).await
    }

    /// Set the spa clock to the host's local time in 24h format.
    pub async fn sync_time(&self) -> Result<SpaState> {
        let now = Local::now().naive_local();
        self.set_time(now.date(), now.time(), true).await
    }

    pub async fn set_tzl_zone_function(&self, zone_id: u32, function: &str) -> Result<SpaState> {
        let spa_id = self.selected_spa()?;
        let data = protocol::tzl_data(&spa_id, zone_id, "function", Value::from(function));
        self.post_and_refresh("set_tzl_zone_function", protocol::TZL_FUNCTION_PATH, data)
            .await
    }

    pub async fn set_tzl_zone_color(&self, zone_id: u32, color_id: u32) -> Result<SpaState> {
        let spa_id = self.selected_spa()?;
        let data = protocol::tzl_data(&spa_id, zone_id, "colorId", Value::from(color_id));
        self.post_and_refresh("set_tzl_zone_color", protocol::TZL_COLOR_PATH, data)
            .await
    }

    /// Brightness is reported back as the zone's `intensity`.
    pub async fn set_tzl_zone_brightness(&self, zone_id: u32, brightness: u32) -> Result<SpaState> {
        let spa_id = self.selected_spa()?;
        let data = protocol::tzl_data(&spa_id, zone_id, "intensity", Value::from(brightness));
        self.post_and_refresh("set_tzl_zone_brightness", protocol::TZL_BRIGHTNESS_PATH, data)
            .await
    }

    pub async fn set_tzl_zone_speed(&self, zone_id: u32, speed: u32) -> Result<SpaState> {
        let spa_id = self.selected_spa()?;
        let data = protocol::tzl_data(&spa_id, zone_id, "speed", Value::from(speed));
        self.post_and_refresh("set_tzl_zone_speed", protocol::TZL_SPEED_PATH, data)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let client = SpaClient::builder("a@b.c", "pw").build().unwrap();
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
        assert_eq!(client.settle_delay(), Duration::from_secs(5));
        assert!(client.spa_id().is_none());
        assert!(!client.is_usable());
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client = SpaClient::builder("a", "b")
            .base_url("http://127.0.0.1:9/")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9");
    }

    #[tokio::test]
    async fn commands_require_selected_spa() {
        let client = SpaClient::builder("a", "b").base_url("http://127.0.0.1:9").build().unwrap();
        let err = client.set_panel_lock(true).await.unwrap_err();
        assert!(matches!(err, Error::NoSpaSelected), "got {err:?}");
    }

    #[tokio::test]
    async fn filter_intervals_validated_before_sending() {
        let client = SpaClient::builder("a", "b")
            .base_url("http://127.0.0.1:9")
            .spa_id("spa")
            .build()
            .unwrap();
        let start = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        let err = client.set_filter_schedule(0, 97, start).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        // Zero disables the cycle and gets past validation; the unreachable server fails the send.
        let err = client.set_filter_schedule(0, 0, start).await.unwrap_err();
        assert!(!matches!(err, Error::InvalidArgument(_)), "got {err:?}");
    }
}
