//! User-Agent string sent with every request

use mobilerest_domain::constants::SDK_USER_AGENT_NAME;

/// `MobileRestSDK/<version> (<os>; <arch>) Native[<qualifier>]`
///
/// The qualifier lets layered SDKs identify themselves, e.g. `SmartSync`
/// yields `...NativeSmartSync`.
pub fn user_agent_string(qualifier: Option<&str>) -> String {
    format!(
        "{SDK_USER_AGENT_NAME}/{} ({}; {}) Native{}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH,
        qualifier.unwrap_or_default()
    )
}
