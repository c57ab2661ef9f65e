#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use agent_orchestration_domain::{now_utc, ExecutionStatus, RunId};
use anyhow::Result;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Seam between the dispatcher and concrete agent back ends.
///
/// An invocation error returned through `Result` is an environment problem
/// (bad params, missing credentials). An agent that ran and failed is a
/// normal `InvocationOutcome` with `status = Failed`.
pub trait AgentInvoker {
    fn invoker_name(&self) -> &'static str;

    #[allow(clippy::missing_errors_doc)]
    fn invoke(&self, request: &InvocationRequest) -> Result<InvocationOutcome>;
}

/// One agent's slice of a dispatch, resolved from the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub run_id: RunId,
    pub business_id: String,
    pub agent_key: String,
    pub model_id: String,
    pub params: Value,
    pub input: Value,
    pub input_hash: String,
}

/// Terminal result of one agent attempt, ready for the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationOutcome {
    pub status: ExecutionStatus,
    pub duration_ms: u64,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl InvocationOutcome {
    #[must_use]
    pub fn success(duration_ms: u64, result: Value) -> Self {
        Self {
            status: ExecutionStatus::Success,
            duration_ms,
            result: Some(result),
            error: None,
        }
    }

    #[must_use]
    pub fn failed(duration_ms: u64, error: String) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            duration_ms,
            result: None,
            error: Some(error),
        }
    }
}

/// Deterministic offline agent for tests, demos, and dry runs.
///
/// `params.fail = true` forces a failed outcome with `params.error` (or a
/// default) as the error text.
#[derive(Debug, Clone)]
pub struct MockAgent {
    adapter_version: String,
}

impl Default for MockAgent {
    fn default() -> Self {
        Self {
            adapter_version: "mock.v1".to_string(),
        }
    }
}

impl MockAgent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn deterministic_token(&self, request: &InvocationRequest) -> String {
        let mut hasher = Sha256::new();
        hasher.update(request.input_hash.as_bytes());
        hasher.update(request.model_id.as_bytes());
        hasher.update(self.adapter_version.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl AgentInvoker for MockAgent {
    fn invoker_name(&self) -> &'static str {
        "mock"
    }

    fn invoke(&self, request: &InvocationRequest) -> Result<InvocationOutcome> {
        let base_len = request
            .agent_key
            .len()
            .saturating_add(request.model_id.len());
        let base_len_u64 = u64::try_from(base_len).unwrap_or(u64::MAX);
        let duration_ms = 5 + (base_len_u64 % 17);

        let forced_failure = request
            .params
            .get("fail")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if forced_failure {
            let error = request
                .params
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("MockFailure: forced by params.fail")
                .to_string();
            return Ok(InvocationOutcome::failed(duration_ms, error));
        }

        let token = self.deterministic_token(request);
        let result = json!({
            "deterministic_token": token,
            "agent_key": request.agent_key,
            "model_id": request.model_id,
            "echo": request.input,
        });
        Ok(InvocationOutcome::success(duration_ms, result))
    }
}

/// POSTs the task payload as JSON to a configured endpoint.
///
/// HTTP-level failures (non-2xx, transport) become failed outcomes with
/// categorized error text so the insight aggregator can histogram them.
#[derive(Debug, Clone)]
pub struct HttpJsonAgent {
    adapter_version: String,
}

impl Default for HttpJsonAgent {
    fn default() -> Self {
        Self {
            adapter_version: "http_json.v1".to_string(),
        }
    }
}

impl HttpJsonAgent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AgentInvoker for HttpJsonAgent {
    fn invoker_name(&self) -> &'static str {
        "http_json"
    }

    fn invoke(&self, request: &InvocationRequest) -> Result<InvocationOutcome> {
        let config = HttpAgentConfig::from_params(&request.params)?;
        let started_at = now_utc();

        let outbound_json = json!({
            "adapter_version": self.adapter_version,
            "run_id": request.run_id.to_string(),
            "business_id": request.business_id,
            "agent_key": request.agent_key,
            "model_id": request.model_id,
            "input": request.input,
            "input_hash": request.input_hash,
        });

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build();

        let mut req = agent
            .request("POST", &config.url)
            .set("content-type", "application/json");
        for (header, value) in &config.headers {
            req = req.set(header, value);
        }
        if let Some(token) = &config.auth_bearer_token {
            req = req.set("authorization", &format!("Bearer {token}"));
        }

        let elapsed_ms = |ended_at: agent_orchestration_domain::DateTimeUtc| {
            let millis = (ended_at - started_at).whole_milliseconds();
            if millis <= 0 {
                0
            } else {
                u64::try_from(millis).unwrap_or(u64::MAX)
            }
        };

        match req.send_json(&outbound_json) {
            Ok(response) => {
                let status_code = response.status();
                let body: Value = response.into_json()?;
                let duration_ms = elapsed_ms(now_utc());
                Ok(InvocationOutcome::success(
                    duration_ms,
                    json!({ "status_code": status_code, "body": body }),
                ))
            }
            Err(ureq::Error::Status(code, _)) => {
                let duration_ms = elapsed_ms(now_utc());
                Ok(InvocationOutcome::failed(
                    duration_ms,
                    format!("HttpStatus: {code}"),
                ))
            }
            Err(ureq::Error::Transport(err)) => {
                let duration_ms = elapsed_ms(now_utc());
                Ok(InvocationOutcome::failed(
                    duration_ms,
                    format!("Transport: {err}"),
                ))
            }
        }
    }
}

#[derive(Debug, Clone)]
struct HttpAgentConfig {
    url: String,
    timeout_ms: u64,
    headers: BTreeMap<String, String>,
    auth_bearer_token: Option<String>,
}

impl HttpAgentConfig {
    fn from_params(params: &Value) -> Result<Self> {
        let url = params
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("http_json invoker requires params.url"))?
            .to_string();

        let method = params
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("POST")
            .to_ascii_uppercase();
        if method != "POST" {
            return Err(anyhow::anyhow!(
                "http_json invoker only supports POST, got '{method}'"
            ));
        }

        let timeout_ms = params
            .get("timeout_ms")
            .and_then(Value::as_u64)
            .unwrap_or(30_000);

        let mut headers = BTreeMap::new();
        if let Some(raw_headers) = params.get("headers") {
            let obj = raw_headers
                .as_object()
                .ok_or_else(|| anyhow::anyhow!("params.headers must be an object"))?;
            for (key, value) in obj {
                let str_value = value.as_str().ok_or_else(|| {
                    anyhow::anyhow!("params.headers values must be strings, key='{key}'")
                })?;
                headers.insert(key.clone(), str_value.to_string());
            }
        }

        let auth_bearer_token = if let Some(env_name) =
            params.get("auth_bearer_env").and_then(Value::as_str)
        {
            Some(std::env::var(env_name).map_err(|_| {
                anyhow::anyhow!("missing env var '{env_name}' required by params.auth_bearer_env")
            })?)
        } else {
            None
        };

        Ok(Self {
            url,
            timeout_ms,
            headers,
            auth_bearer_token,
        })
    }
}

/// Maps the invoker names a plan may reference to adapter instances.
pub struct InvokerRegistry {
    mock: MockAgent,
    http_json: HttpJsonAgent,
}

impl Default for InvokerRegistry {
    fn default() -> Self {
        Self {
            mock: MockAgent::new(),
            http_json: HttpJsonAgent::new(),
        }
    }
}

impl InvokerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn resolve(&self, invoker_name: &str) -> Option<&dyn AgentInvoker> {
        match invoker_name {
            "mock" => Some(&self.mock),
            "http_json" => Some(&self.http_json),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AgentInvoker, HttpJsonAgent, InvokerRegistry, MockAgent};
    use agent_orchestration_domain::{ExecutionStatus, RunId};
    use serde_json::json;

    fn fixture_request(params: serde_json::Value) -> super::InvocationRequest {
        super::InvocationRequest {
            run_id: RunId::new(),
            business_id: "acme".to_string(),
            agent_key: "classifier".to_string(),
            model_id: "model-x".to_string(),
            params,
            input: json!({"text": "hello"}),
            input_hash: "fixture-input-hash".to_string(),
        }
    }

    #[test]
    fn mock_agent_output_is_stable_for_same_input() {
        let request = fixture_request(json!({}));
        let agent = MockAgent::new();

        let first = agent.invoke(&request);
        assert!(first.is_ok());
        let first = first.unwrap_or_else(|_| unreachable!());

        let second = agent.invoke(&request);
        assert!(second.is_ok());
        let second = second.unwrap_or_else(|_| unreachable!());

        assert_eq!(first, second);
        assert_eq!(first.status, ExecutionStatus::Success);
        assert!(first.error.is_none());
    }

    #[test]
    fn mock_agent_honors_forced_failure() {
        let request = fixture_request(json!({"fail": true, "error": "TimeoutError: injected"}));
        let agent = MockAgent::new();
        let outcome = agent.invoke(&request);
        assert!(outcome.is_ok());
        let outcome = outcome.unwrap_or_else(|_| unreachable!());
        assert_eq!(outcome.status, ExecutionStatus::Failed);
        assert_eq!(outcome.error.as_deref(), Some("TimeoutError: injected"));
        assert!(outcome.result.is_none());
    }

    #[test]
    fn mock_agent_forced_failure_has_default_error() {
        let request = fixture_request(json!({"fail": true}));
        let agent = MockAgent::new();
        let outcome = agent.invoke(&request);
        assert!(outcome.is_ok());
        let outcome = outcome.unwrap_or_else(|_| unreachable!());
        assert_eq!(
            outcome.error.as_deref(),
            Some("MockFailure: forced by params.fail")
        );
    }

    #[test]
    fn http_agent_requires_url() {
        let request = fixture_request(json!({}));
        let agent = HttpJsonAgent::new();
        assert!(agent.invoke(&request).is_err());
    }

    #[test]
    fn http_agent_rejects_non_post_method() {
        let request = fixture_request(json!({"url": "http://localhost:1/x", "method": "GET"}));
        let agent = HttpJsonAgent::new();
        assert!(agent.invoke(&request).is_err());
    }

    #[test]
    fn registry_resolves_known_invokers() {
        let registry = InvokerRegistry::new();
        assert!(registry.resolve("mock").is_some());
        assert!(registry.resolve("http_json").is_some());
        assert!(registry.resolve("carrier_pigeon").is_none());
    }
}
