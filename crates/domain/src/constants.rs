//! SDK-wide constants
//!
//! Centralized location for the defaults shared by the dispatch core and the
//! infrastructure adapters.

// REST API defaults
/// REST API version used when none is configured
pub const DEFAULT_API_VERSION: &str = "v42.0";
/// Prefix of every REST resource path
pub const DEFAULT_ENDPOINT_PREFIX: &str = "/services/data";
/// Token endpoint path on the authority
pub const OAUTH_TOKEN_PATH: &str = "/services/oauth2/token";
/// Authority used when the credentials carry none
pub const DEFAULT_LOGIN_HOST: &str = "https://login.salesforce.com";

// Dispatch policy
/// Automatic replays allowed after a rejected access token
pub const MAX_AUTH_RETRIES: u8 = 1;
/// Status signalling an expired or invalid access token
pub const HTTP_STATUS_UNAUTHORIZED: u16 = 401;
/// Status delivered as an absent resource
pub const HTTP_STATUS_NOT_FOUND: u16 = 404;

// Transport defaults
/// Default total timeout of one HTTP exchange
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Product token leading the User-Agent
pub const SDK_USER_AGENT_NAME: &str = "MobileRestSDK";
