//! Blocking client for the tado° v2 resource API.
//!
//! - One HTTP request per call, no retries; the first failure is returned.
//! - Paths are templates filled from the session's home id and, for zone resources, a
//!   caller-supplied zone id.
//! - Responses are decoded JSON handed back unmodelled. DELETE returns no payload.
//!
//! Token refresh is explicit ([`TadoClient::refresh`], [`TadoClient::refresh_if_expired`]);
//! a request made with an expired token fails with [`ApiErrorKind::TokenExpired`].

use core::fmt;
use http::{Method, StatusCode};
use log::{debug, info, warn};
use serde_json::Value;
use std::cell::RefCell;
use std::error::Error;
use std::time::Duration;

use crate::config::Config;
use crate::models::tado::{EarlyStart, HomeId, OverlayRequest, TemperatureUnit, Termination, ZoneId};
use crate::session::{AuthError, Credentials, Session, SessionManager, TokenState};
use crate::transport::{HttpRequest, RequestBody, Transport, TransportError, UreqTransport};
use crate::utils::{PathError, expand_path};

pub const DEFAULT_API_URL: &str = "https://my.tado.com/api/v2";

/// Resource path templates, relative to the API base URL.
pub mod paths {
    pub const ME: &str = "me";
    pub const HOME: &str = "homes/{home}";
    pub const ZONES: &str = "homes/{home}/zones";
    pub const DEVICES: &str = "homes/{home}/devices";
    pub const USERS: &str = "homes/{home}/users";
    pub const MOBILE_DEVICES: &str = "homes/{home}/mobileDevices";
    pub const WEATHER: &str = "homes/{home}/weather";
    pub const INSTALLATIONS: &str = "homes/{home}/installations";
    pub const INVITATIONS: &str = "homes/{home}/invitations";
    pub const ZONE_CAPABILITIES: &str = "homes/{home}/zones/{zone}/capabilities";
    pub const ZONE_STATE: &str = "homes/{home}/zones/{zone}/state";
    pub const ZONE_EARLY_START: &str = "homes/{home}/zones/{zone}/earlyStart";
    pub const ZONE_SCHEDULE: &str = "homes/{home}/zones/{zone}/schedule/activeTimetable";
    pub const ZONE_OVERLAY: &str = "homes/{home}/zones/{zone}/overlay";
}

/// Refresh this long before the token actually expires.
const REFRESH_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub enum ApiErrorKind {
    /// The session holds no access token
    MissingToken,
    /// The access token's lifetime has passed; refresh before retrying
    TokenExpired,
    Path(PathError),
    /// Method and body do not form a supported request
    InvalidRequest(&'static str),
    Transport(TransportError),
    Http { status: StatusCode, body: String },
    Json(serde_json::Error),
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::MissingToken => write!(f, "missing bearer token for authenticated endpoint"),
            ApiErrorKind::TokenExpired => write!(f, "access token expired"),
            ApiErrorKind::Path(e) => write!(f, "{}", e),
            ApiErrorKind::InvalidRequest(s) => write!(f, "invalid request: {}", s),
            ApiErrorKind::Transport(e) => write!(f, "{}", e),
            ApiErrorKind::Http { status, body } => write!(f, "http {}: {}", status.as_u16(), body),
            ApiErrorKind::Json(e) => write!(f, "json error: {}", e),
        }
    }
}

/// A failed resource request with the method and path it was attempting.
#[derive(Debug)]
pub struct ApiError {
    pub method: Method,
    pub path: String,
    pub kind: ApiErrorKind,
}

impl ApiError {
    fn new(method: &Method, path: &str, kind: ApiErrorKind) -> Self {
        ApiError {
            method: method.clone(),
            path: path.to_string(),
            kind,
        }
    }

    /// HTTP status for non-success responses.
    pub fn status(&self) -> Option<StatusCode> {
        match &self.kind {
            ApiErrorKind::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.method, self.path, self.kind)
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            ApiErrorKind::Path(e) => Some(e),
            ApiErrorKind::Transport(e) => Some(e),
            ApiErrorKind::Json(e) => Some(e),
            _ => None,
        }
    }
}

fn url(api_url: &str, path: &str) -> String {
    format!("{}/{}", api_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Send one resource request on behalf of `session`.
///
/// GET and PUT decode the response body; DELETE ignores it and yields `None`. A PUT
/// answered with an empty body yields `Value::Null`.
pub(crate) fn dispatch<T: Transport>(
    transport: &T,
    api_url: &str,
    session: &Session,
    method: Method,
    template: &str,
    zone: Option<ZoneId>,
    body: Option<&Value>,
) -> Result<Option<Value>, ApiError> {
    let path = expand_path(template, session.home_id(), zone)
        .map_err(|e| ApiError::new(&method, template, ApiErrorKind::Path(e)))?;
    let fail = |kind| ApiError::new(&method, &path, kind);

    match session.token_state() {
        TokenState::Missing => return Err(fail(ApiErrorKind::MissingToken)),
        TokenState::Expired => return Err(fail(ApiErrorKind::TokenExpired)),
        TokenState::Valid => {}
    }

    let body = match (&method, body) {
        (&Method::GET | &Method::DELETE, None) => RequestBody::Empty,
        (&Method::PUT, Some(json)) => RequestBody::Json(json.clone()),
        (&Method::PUT, None) => return Err(fail(ApiErrorKind::InvalidRequest("PUT requires a JSON body"))),
        (&Method::GET | &Method::DELETE, Some(_)) => {
            return Err(fail(ApiErrorKind::InvalidRequest("GET and DELETE carry no body")));
        }
        _ => return Err(fail(ApiErrorKind::InvalidRequest("only GET, PUT and DELETE are supported"))),
    };

    let request = HttpRequest {
        method: method.clone(),
        url: url(api_url, &path),
        headers: session.headers().clone(),
        body,
    };
    debug!("{} {}", method, path);
    let response = transport.send(&request).map_err(|e| fail(ApiErrorKind::Transport(e)))?;
    debug!("{} {} -> {}", method, path, response.status.as_u16());

    if !response.status.is_success() {
        warn!("{} {} failed with http {}", method, path, response.status.as_u16());
        return Err(fail(ApiErrorKind::Http {
            status: response.status,
            body: response.body_text(),
        }));
    }

    if method == Method::DELETE {
        return Ok(None);
    }
    if method == Method::PUT && response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Some(Value::Null));
    }
    serde_json::from_slice(&response.body)
        .map(Some)
        .map_err(|e| fail(ApiErrorKind::Json(e)))
}

/// An authenticated client bound to one session.
///
/// Token state lives in a `RefCell`, so a client is neither `Sync` nor meant to be shared;
/// concurrent callers each log in with their own client.
pub struct TadoClient<T: Transport = UreqTransport> {
    sessions: SessionManager<T>,
    session: RefCell<Session>,
    unit: TemperatureUnit,
}

impl<T: Transport> fmt::Debug for TadoClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TadoClient")
            .field("api_url", &self.sessions.api_url())
            .field("session", &self.session)
            .field("unit", &self.unit)
            .finish()
    }
}

impl TadoClient<UreqTransport> {
    /// Log in over HTTPS using `config`.
    pub fn connect(config: &Config, credentials: Credentials) -> Result<Self, AuthError> {
        Self::with_transport(UreqTransport::new(config.timeout), config, credentials)
    }
}

impl<T: Transport> TadoClient<T> {
    pub fn with_transport(transport: T, config: &Config, credentials: Credentials) -> Result<Self, AuthError> {
        let sessions = SessionManager::new(transport, config.auth_endpoint(), config.api_url.clone());
        Self::login(sessions, credentials, config.temperature_unit)
    }

    pub fn login(sessions: SessionManager<T>, credentials: Credentials, unit: TemperatureUnit) -> Result<Self, AuthError> {
        let session = sessions.login(credentials)?;
        Ok(TadoClient {
            sessions,
            session: RefCell::new(session),
            unit,
        })
    }

    pub fn home_id(&self) -> Option<HomeId> {
        self.session.borrow().home_id()
    }

    pub fn temperature_unit(&self) -> TemperatureUnit {
        self.unit
    }

    pub fn refresh(&self) -> Result<(), AuthError> {
        let mut session = self.session.borrow_mut();
        self.sessions.refresh(&mut session)
    }

    /// Refresh when the token is expired or about to be. Returns whether a refresh happened.
    pub fn refresh_if_expired(&self) -> Result<bool, AuthError> {
        if !self.session.borrow().expires_within(REFRESH_MARGIN) {
            return Ok(false);
        }
        info!("Access token expired or expiring; refreshing");
        self.refresh()?;
        Ok(true)
    }

    /// Drop the tokens held in memory. The client is unusable until it is rebuilt.
    pub fn logout(&self) {
        self.session.borrow_mut().clear_token();
    }

    /// Issue one request against `template`.
    pub fn request(
        &self,
        method: Method,
        template: &str,
        zone: Option<ZoneId>,
        body: Option<&Value>,
    ) -> Result<Option<Value>, ApiError> {
        let session = self.session.borrow();
        dispatch(
            self.sessions.transport(),
            self.sessions.api_url(),
            &session,
            method,
            template,
            zone,
            body,
        )
    }

    fn get(&self, template: &str, zone: Option<ZoneId>) -> Result<Value, ApiError> {
        self.request(Method::GET, template, zone, None).map(Option::unwrap_or_default)
    }

    fn put(&self, template: &str, zone: ZoneId, body: &Value) -> Result<Value, ApiError> {
        self.request(Method::PUT, template, Some(zone), Some(body))
            .map(Option::unwrap_or_default)
    }

    fn delete(&self, template: &str, zone: ZoneId) -> Result<(), ApiError> {
        self.request(Method::DELETE, template, Some(zone), None).map(|_| ())
    }

    pub fn get_me(&self) -> Result<Value, ApiError> {
        self.get(paths::ME, None)
    }

    pub fn get_home(&self) -> Result<Value, ApiError> {
        self.get(paths::HOME, None)
    }

    pub fn get_zones(&self) -> Result<Value, ApiError> {
        self.get(paths::ZONES, None)
    }

    pub fn get_devices(&self) -> Result<Value, ApiError> {
        self.get(paths::DEVICES, None)
    }

    pub fn get_users(&self) -> Result<Value, ApiError> {
        self.get(paths::USERS, None)
    }

    pub fn get_mobile_devices(&self) -> Result<Value, ApiError> {
        self.get(paths::MOBILE_DEVICES, None)
    }

    /// Outdoor temperature, solar intensity and weather state at the home's location.
    pub fn get_weather(&self) -> Result<Value, ApiError> {
        self.get(paths::WEATHER, None)
    }

    pub fn get_installations(&self) -> Result<Value, ApiError> {
        self.get(paths::INSTALLATIONS, None)
    }

    pub fn get_invitations(&self) -> Result<Value, ApiError> {
        self.get(paths::INVITATIONS, None)
    }

    pub fn get_capabilities(&self, zone: ZoneId) -> Result<Value, ApiError> {
        self.get(paths::ZONE_CAPABILITIES, Some(zone))
    }

    /// Temperature, humidity, heating power, mode and link state of a zone.
    pub fn get_state(&self, zone: ZoneId) -> Result<Value, ApiError> {
        self.get(paths::ZONE_STATE, Some(zone))
    }

    pub fn get_early_start(&self, zone: ZoneId) -> Result<Value, ApiError> {
        self.get(paths::ZONE_EARLY_START, Some(zone))
    }

    pub fn set_early_start(&self, zone: ZoneId, enabled: bool) -> Result<Value, ApiError> {
        let body = to_body(&Method::PUT, paths::ZONE_EARLY_START, &EarlyStart { enabled })?;
        self.put(paths::ZONE_EARLY_START, zone, &body)
    }

    /// The zone's active timetable descriptor.
    pub fn get_schedule(&self, zone: ZoneId) -> Result<Value, ApiError> {
        self.get(paths::ZONE_SCHEDULE, Some(zone))
    }

    /// Put the zone under manual control at `temperature` (in the configured unit).
    ///
    /// Below 5 degrees heating is switched off instead and no temperature is sent.
    /// NaN and infinite temperatures are rejected without a request.
    pub fn set_temperature(&self, zone: ZoneId, temperature: f64, termination: Termination) -> Result<Value, ApiError> {
        if !temperature.is_finite() {
            return Err(ApiError::new(
                &Method::PUT,
                paths::ZONE_OVERLAY,
                ApiErrorKind::InvalidRequest("temperature must be a finite number"),
            ));
        }
        let overlay = OverlayRequest::heating(temperature, self.unit, termination);
        let body = to_body(&Method::PUT, paths::ZONE_OVERLAY, &overlay)?;
        self.put(paths::ZONE_OVERLAY, zone, &body)
    }

    /// Remove the manual overlay so the zone follows its schedule again.
    pub fn end_manual_control(&self, zone: ZoneId) -> Result<(), ApiError> {
        self.delete(paths::ZONE_OVERLAY, zone)
    }
}

fn to_body<S: serde::Serialize>(method: &Method, template: &str, payload: &S) -> Result<Value, ApiError> {
    serde_json::to_value(payload).map_err(|e| ApiError::new(method, template, ApiErrorKind::Json(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AuthFlow;
    use crate::transport::testing::{FakeTransport, header};
    use serde_json::json;

    const API: &str = "https://api.test/v2";

    fn config() -> Config {
        Config {
            api_url: API.to_string(),
            ..Config::default()
        }
    }

    fn logged_in(fake: &FakeTransport, home: i64) -> TadoClient<FakeTransport> {
        fake.reply_json(200, json!({"access_token": "access-1", "refresh_token": "refresh-1", "expires_in": 600}))
            .reply_json(200, json!({"homes": [{"id": home, "name": "Home"}]}));
        TadoClient::with_transport(fake.clone(), &config(), Credentials::new("u", "p")).unwrap()
    }

    fn json_body(request: &HttpRequest) -> &Value {
        match &request.body {
            RequestBody::Json(v) => v,
            other => panic!("expected json body, got {other:?}"),
        }
    }

    #[test]
    fn zones_are_returned_unmodified() {
        let fake = FakeTransport::default();
        let client = logged_in(&fake, 42);
        assert_eq!(client.home_id(), Some(HomeId(42)));

        let zones = json!([{"id": 1, "name": "Living", "type": "HEATING", "extra": {"nested": [1, 2]}}]);
        fake.reply_json(200, zones.clone());
        assert_eq!(client.get_zones().unwrap(), zones);

        let req = fake.last_request();
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.url, format!("{API}/homes/42/zones"));
        assert_eq!(req.body, RequestBody::Empty);
        assert_eq!(header(&req, "authorization"), Some("Bearer access-1"));
        assert_eq!(header(&req, "referer"), Some("https://my.tado.com/"));
    }

    #[test]
    fn every_read_hits_its_path() {
        let fake = FakeTransport::default();
        let client = logged_in(&fake, 7);
        let zone = ZoneId(3);

        let cases: Vec<(&str, Box<dyn Fn() -> Result<Value, ApiError> + '_>)> = vec![
            ("me", Box::new(|| client.get_me())),
            ("homes/7", Box::new(|| client.get_home())),
            ("homes/7/devices", Box::new(|| client.get_devices())),
            ("homes/7/users", Box::new(|| client.get_users())),
            ("homes/7/mobileDevices", Box::new(|| client.get_mobile_devices())),
            ("homes/7/weather", Box::new(|| client.get_weather())),
            ("homes/7/installations", Box::new(|| client.get_installations())),
            ("homes/7/invitations", Box::new(|| client.get_invitations())),
            ("homes/7/zones/3/capabilities", Box::new(|| client.get_capabilities(zone))),
            ("homes/7/zones/3/state", Box::new(|| client.get_state(zone))),
            ("homes/7/zones/3/earlyStart", Box::new(|| client.get_early_start(zone))),
            ("homes/7/zones/3/schedule/activeTimetable", Box::new(|| client.get_schedule(zone))),
        ];

        for (path, call) in cases {
            fake.reply_json(200, json!({"path": path}));
            assert_eq!(call().unwrap(), json!({"path": path}));
            let req = fake.last_request();
            assert_eq!(req.method, Method::GET, "{path}");
            assert_eq!(req.url, format!("{API}/{path}"));
        }
    }

    #[test]
    fn heating_off_overlay_for_low_temperature() {
        let fake = FakeTransport::default();
        let client = logged_in(&fake, 42);
        fake.reply_json(200, json!({"type": "MANUAL"}));

        client.set_temperature(ZoneId(3), 4.0, Termination::Manual).unwrap();

        let req = fake.last_request();
        assert_eq!(req.method, Method::PUT);
        assert_eq!(req.url, format!("{API}/homes/42/zones/3/overlay"));
        assert_eq!(
            json_body(&req),
            &json!({"setting": {"type": "HEATING", "power": "OFF"}, "termination": {"type": "MANUAL"}})
        );
    }

    #[test]
    fn non_finite_temperature_is_rejected_locally() {
        let fake = FakeTransport::default();
        let client = logged_in(&fake, 42);

        for temperature in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = client
                .set_temperature(ZoneId(3), temperature, Termination::Manual)
                .unwrap_err();
            assert!(matches!(err.kind, ApiErrorKind::InvalidRequest(_)), "{err}");
            assert_eq!(err.method, Method::PUT);
        }
        assert_eq!(fake.requests().len(), 2, "only the login requests were sent");
    }

    #[test]
    fn heating_on_overlay_with_timer() {
        let fake = FakeTransport::default();
        let client = logged_in(&fake, 42);
        fake.reply_json(200, json!({}));

        client
            .set_temperature(
                ZoneId(1),
                21.5,
                Termination::Timer {
                    duration_in_seconds: 1800,
                },
            )
            .unwrap();

        assert_eq!(
            json_body(&fake.last_request()),
            &json!({
                "setting": {"type": "HEATING", "power": "ON", "temperature": {"celsius": 21.5}},
                "termination": {"type": "TIMER", "durationInSeconds": 1800}
            })
        );
    }

    #[test]
    fn fahrenheit_homes_send_fahrenheit() {
        let fake = FakeTransport::default();
        fake.reply_json(200, json!({"access_token": "a", "refresh_token": "r"}))
            .reply_json(200, json!({"homes": [{"id": 1}]}))
            .reply_json(200, json!({}));
        let cfg = Config {
            temperature_unit: TemperatureUnit::Fahrenheit,
            ..config()
        };
        let client = TadoClient::with_transport(fake.clone(), &cfg, Credentials::new("u", "p")).unwrap();

        client.set_temperature(ZoneId(2), 70.0, Termination::Auto).unwrap();
        assert_eq!(
            json_body(&fake.last_request()),
            &json!({
                "setting": {"type": "HEATING", "power": "ON", "temperature": {"fahrenheit": 70.0}},
                "termination": {"type": "TADO_MODE"}
            })
        );
    }

    #[test]
    fn early_start_toggle_sends_boolean() {
        let fake = FakeTransport::default();
        let client = logged_in(&fake, 42);
        fake.reply_json(200, json!({"enabled": false}));

        assert_eq!(client.set_early_start(ZoneId(5), false).unwrap(), json!({"enabled": false}));
        let req = fake.last_request();
        assert_eq!(req.method, Method::PUT);
        assert_eq!(req.url, format!("{API}/homes/42/zones/5/earlyStart"));
        assert_eq!(json_body(&req), &json!({"enabled": false}));
    }

    #[test]
    fn end_manual_control_issues_one_delete() {
        let fake = FakeTransport::default();
        let client = logged_in(&fake, 42);
        fake.reply_raw(204, b"");

        client.end_manual_control(ZoneId(3)).unwrap();

        let requests = fake.requests();
        assert_eq!(requests.len(), 3);
        let req = &requests[2];
        assert_eq!(req.method, Method::DELETE);
        assert_eq!(req.url, format!("{API}/homes/42/zones/3/overlay"));
        assert_eq!(req.body, RequestBody::Empty);
    }

    #[test]
    fn end_manual_control_failure_is_api_error() {
        let fake = FakeTransport::default();
        let client = logged_in(&fake, 42);
        fake.reply_json(404, json!({"errors": [{"code": "notFound"}]}));

        let err = client.end_manual_control(ZoneId(9)).unwrap_err();
        assert_eq!(err.method, Method::DELETE);
        assert_eq!(err.path, "homes/42/zones/9/overlay");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(fake.requests().len(), 3, "no retry");
    }

    #[test]
    fn failures_are_not_retried_and_keep_context() {
        let fake = FakeTransport::default();
        let client = logged_in(&fake, 42);

        fake.fail("connection reset");
        let err = client.get_state(ZoneId(1)).unwrap_err();
        assert!(matches!(err.kind, ApiErrorKind::Transport(_)));
        assert_eq!(err.to_string(), "GET homes/42/zones/1/state: transport error: connection reset");

        fake.reply_raw(200, b"not json");
        let err = client.get_weather().unwrap_err();
        assert!(matches!(err.kind, ApiErrorKind::Json(_)));

        fake.reply_json(500, json!({"errors": []}));
        let err = client.get_zones().unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));

        assert_eq!(fake.requests().len(), 5);
    }

    #[test]
    fn missing_and_expired_tokens_are_distinct() {
        let fake = FakeTransport::default();
        fake.reply_json(200, json!({"access_token": "a", "refresh_token": "r", "expires_in": 0}))
            .reply_json(200, json!({"homes": [{"id": 1}]}));
        let sessions = SessionManager::new(fake.clone(), AuthFlow::Legacy.endpoint(), API);

        // the profile lookup during login also sees the expired token
        let err = TadoClient::login(sessions, Credentials::new("u", "p"), TemperatureUnit::Celsius)
            .err()
            .expect("login must fail with an expired token");
        match err {
            AuthError::Profile(api) => assert!(matches!(api.kind, ApiErrorKind::TokenExpired)),
            other => panic!("unexpected error: {other:?}"),
        }

        let fake = FakeTransport::default();
        let client = logged_in(&fake, 42);
        client.logout();
        let err = client.get_zones().unwrap_err();
        assert!(matches!(err.kind, ApiErrorKind::MissingToken));
        assert_eq!(fake.requests().len(), 2, "nothing sent without a token");
    }

    #[test]
    fn debug_output_hides_tokens() {
        let fake = FakeTransport::default();
        let client = logged_in(&fake, 42);
        let shown = format!("{client:?}");
        assert!(shown.contains("home_id: Some(HomeId(42))"), "{shown}");
        assert!(!shown.contains("access-1"));
        assert!(!shown.contains("refresh-1"));
    }

    #[test]
    fn refresh_replaces_presented_token() {
        let fake = FakeTransport::default();
        let client = logged_in(&fake, 42);
        assert!(!client.refresh_if_expired().unwrap());

        fake.reply_json(200, json!({"access_token": "access-2", "refresh_token": "refresh-2", "expires_in": 600}))
            .reply_json(200, json!([]));
        client.refresh().unwrap();
        client.get_users().unwrap();

        let req = fake.last_request();
        assert_eq!(header(&req, "authorization"), Some("Bearer access-2"));
        assert_eq!(client.home_id(), Some(HomeId(42)));
    }

    #[test]
    fn refresh_if_expired_refreshes_near_expiry() {
        let fake = FakeTransport::default();
        fake.reply_json(200, json!({"access_token": "a", "refresh_token": "r", "expires_in": 10}))
            .reply_json(200, json!({"homes": [{"id": 1}]}))
            .reply_json(200, json!({"access_token": "b", "refresh_token": "r2", "expires_in": 600}));
        let client = TadoClient::with_transport(fake.clone(), &config(), Credentials::new("u", "p")).unwrap();

        assert!(client.refresh_if_expired().unwrap());
        assert!(!client.refresh_if_expired().unwrap());
        assert_eq!(fake.requests().len(), 3);
    }

    #[test]
    fn generic_request_validates_shape() {
        let fake = FakeTransport::default();
        let client = logged_in(&fake, 42);

        let err = client.request(Method::PUT, paths::ZONE_OVERLAY, Some(ZoneId(1)), None).unwrap_err();
        assert!(matches!(err.kind, ApiErrorKind::InvalidRequest(_)));

        let err = client
            .request(Method::GET, paths::ZONES, None, Some(&json!({})))
            .unwrap_err();
        assert!(matches!(err.kind, ApiErrorKind::InvalidRequest(_)));

        let err = client.request(Method::POST, paths::ZONES, None, None).unwrap_err();
        assert!(matches!(err.kind, ApiErrorKind::InvalidRequest(_)));

        let err = client.request(Method::GET, paths::ZONE_STATE, None, None).unwrap_err();
        assert!(matches!(err.kind, ApiErrorKind::Path(PathError::MissingZone)));
        assert_eq!(err.path, paths::ZONE_STATE);

        assert_eq!(fake.requests().len(), 2);
    }

    #[test]
    fn put_with_empty_response_is_null() {
        let fake = FakeTransport::default();
        let client = logged_in(&fake, 42);
        fake.reply_raw(200, b"");
        assert_eq!(client.set_early_start(ZoneId(1), true).unwrap(), Value::Null);
    }

    #[test]
    fn url_joining() {
        assert_eq!(url("https://h/api/v2/", "/me"), "https://h/api/v2/me");
        assert_eq!(url("https://h/api/v2", "homes/1"), "https://h/api/v2/homes/1");
    }
}
