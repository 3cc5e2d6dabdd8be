use engine_logging::{engine_debug, engine_info};
use serde_json::{json, Value};

use crate::config::BootPolicy;
use crate::host::{HostConfig, HostEnvironment};
use crate::tree::dig_str;
use crate::types::{HarvestError, SessionContext};

/// Poll the host until it exposes both an api key and a client version.
pub async fn resolve(
    host: &dyn HostEnvironment,
    policy: &BootPolicy,
) -> Result<SessionContext, HarvestError> {
    let attempts = policy.attempts.max(1);
    let mut delay = policy.initial_delay;
    for attempt in 1..=attempts {
        if let Some(session) = session_from_config(&host.config().await) {
            engine_info!("Session ready after {attempt} attempt(s)");
            return Ok(session);
        }
        engine_debug!("Session not ready (attempt {attempt}/{attempts})");
        if attempt < attempts {
            tokio::time::sleep(delay).await;
            delay = policy.next_delay(delay);
        }
    }
    Err(HarvestError::BootNotReady { attempts })
}

/// `None` until both required fields are present; everything else is defaulted.
pub fn session_from_config(config: &HostConfig) -> Option<SessionContext> {
    let api_key = config.api_key()?.to_string();
    let provided_context = config
        .get("INNERTUBE_CONTEXT")
        .filter(|context| context.is_object());
    let client_version = config
        .get_str("INNERTUBE_CLIENT_VERSION")
        .or_else(|| provided_context.and_then(|c| dig_str(c, &["client", "clientVersion"])))?
        .to_string();
    let visitor_id = config
        .get_str("VISITOR_DATA")
        .or_else(|| provided_context.and_then(|c| dig_str(c, &["client", "visitorData"])))
        .map(str::to_string);
    let request_context = provided_context
        .cloned()
        .unwrap_or_else(|| default_context(&client_version));

    Some(SessionContext {
        api_key,
        client_version,
        visitor_id,
        request_context,
    })
}

fn default_context(client_version: &str) -> Value {
    json!({
        "client": {
            "clientName": "WEB",
            "clientVersion": client_version,
            "hl": "en",
            "gl": "US",
        }
    })
}
