use std::sync::Arc;

use engine_logging::{engine_debug, engine_trace};
use serde_json::{Map, Value};
use url::Url;

use crate::fetch::{ApiRequest, Transport};
use crate::{
    CascadeStep, ClientProfile, FailureKind, FetchError, RequestPayload, SessionContext,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub step: CascadeStep,
    pub error: FetchError,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CascadeError {
    #[error("all {} cascade attempts failed", .attempts.len())]
    Exhausted { attempts: Vec<AttemptFailure> },
}

/// Executes one logical request against an ordered list of (identity, endpoint) pairs,
/// moving to the next pair on any failure. There is no retry within a pair.
#[derive(Clone)]
pub struct FetchCascade {
    transport: Arc<dyn Transport>,
    base_url: String,
    steps: Vec<CascadeStep>,
}

impl FetchCascade {
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>, steps: Vec<CascadeStep>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            steps,
        }
    }

    pub fn steps(&self) -> &[CascadeStep] {
        &self.steps
    }

    pub async fn fetch(
        &self,
        session: &SessionContext,
        payload: &RequestPayload,
    ) -> Result<Value, CascadeError> {
        let mut attempts = Vec::new();
        for &step in &self.steps {
            let outcome = match self.build_request(session, step, payload) {
                Ok(request) => self.transport.post_json(&request).await,
                Err(err) => Err(err),
            };
            match outcome {
                Ok(response) => {
                    if !attempts.is_empty() {
                        engine_debug!("cascade succeeded on {} after {} failures", step, attempts.len());
                    }
                    return Ok(response);
                }
                Err(error) => {
                    engine_debug!("cascade attempt {} failed: {}", step, error);
                    attempts.push(AttemptFailure { step, error });
                }
            }
        }
        Err(CascadeError::Exhausted { attempts })
    }

    pub fn build_request(
        &self,
        session: &SessionContext,
        step: CascadeStep,
        payload: &RequestPayload,
    ) -> Result<ApiRequest, FetchError> {
        let mut url = Url::parse(&self.base_url)
            .and_then(|base| base.join(step.endpoint.path()))
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        url.query_pairs_mut().append_pair("key", &session.api_key);

        let mut headers = vec![
            ("X-YouTube-Client-Name", step.profile.header_id().to_string()),
            ("X-YouTube-Client-Version", step.profile.client_version(session)),
            ("x-goog-api-format-version", "2".to_string()),
        ];
        if let Some(visitor) = &session.visitor_id {
            headers.push(("X-Goog-Visitor-Id", visitor.clone()));
        }

        let mut body = Map::new();
        body.insert("context".into(), client_context(session, step.profile));
        let (field, value) = payload.field();
        body.insert(field.into(), Value::String(value.to_string()));
        engine_trace!("built {} request for {}", step, field);

        Ok(ApiRequest {
            url,
            headers,
            body: Value::Object(body),
        })
    }
}

/// Deep copy of the session's request context with the profile's identity substituted.
pub fn client_context(session: &SessionContext, profile: ClientProfile) -> Value {
    let mut context = match &session.request_context {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    let client = context
        .entry("client")
        .or_insert_with(|| Value::Object(Map::new()));
    if !client.is_object() {
        *client = Value::Object(Map::new());
    }
    if let Value::Object(client) = client {
        client.insert("clientName".into(), Value::String(profile.name().into()));
        client.insert(
            "clientVersion".into(),
            Value::String(profile.client_version(session)),
        );
        if profile == ClientProfile::Android {
            client
                .entry("hl")
                .or_insert_with(|| Value::String("en".into()));
            client
                .entry("gl")
                .or_insert_with(|| Value::String("US".into()));
            client.remove("clientScreen");
        }
    }
    Value::Object(context)
}
