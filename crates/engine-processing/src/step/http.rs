use crate::{
    error::StepError,
    retry::classify_step_error,
    step::{Step, StepContext, StepOutput},
};
use async_trait::async_trait;
use engine_config::settings::step::{HttpMethod, RetrySettings, StepSettings};
use engine_core::retry::{RetryError, RetryPolicy};
use model::core::status::Status;
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

const RECORD_ID_PLACEHOLDER: &str = "{record_id}";

/// A step backed by one HTTP call per record. The request body is the
/// record's fields overlaid with values produced by earlier steps.
pub struct HttpStep {
    name: String,
    label: Option<String>,
    url: String,
    method: Method,
    already_done: Vec<u16>,
    timeout: Duration,
    retry: RetryPolicy,
    client: Client,
}

impl HttpStep {
    pub fn new(client: Client, settings: &StepSettings) -> Self {
        Self {
            name: settings.name.clone(),
            label: settings.label.clone(),
            url: settings.url.clone(),
            method: to_method(settings.method),
            already_done: settings.already_done_statuses.clone(),
            timeout: Duration::from_millis(settings.timeout_ms),
            retry: retry_policy(&settings.retry),
            client,
        }
    }

    /// Renders the record id into the URL template as one path segment, so
    /// `/`, `?`, `#` and `%` in an id cannot address another resource.
    pub fn url_for(&self, record_id: &str) -> Result<String, StepError> {
        let segment = encode_segment(record_id).ok_or_else(|| {
            StepError::Failed(format!("record id '{record_id}' cannot be encoded into a URL"))
        })?;
        Ok(self.url.replace(RECORD_ID_PLACEHOLDER, &segment))
    }

    async fn send_once(&self, ctx: &StepContext) -> Result<StepOutput, StepError> {
        let url = self.url_for(ctx.record_id())?;
        let mut request = self
            .client
            .request(self.method.clone(), &url)
            .timeout(self.timeout);
        if self.method != Method::GET {
            request = request.json(&ctx.payload());
        }

        let response = request.send().await.map_err(|e| StepError::Transport {
            url: url.clone(),
            retryable: e.is_timeout() || e.is_connect() || e.is_request(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if self.already_done.contains(&status.as_u16()) {
            debug!(step = %self.name, record_id = %ctx.record_id(), %status, "Already done");
            return Ok(StepOutput::already_done());
        }

        let body = response.text().await.map_err(|e| StepError::Transport {
            url,
            retryable: e.is_timeout(),
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(StepError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(StepOutput::completed_with(parse_output(&self.name, status, &body)))
    }
}

#[async_trait]
impl Step for HttpStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self, status: Status) -> String {
        let subject = self.label.as_deref().unwrap_or(&self.name);
        match status {
            Status::Pending => format!("{subject} started"),
            Status::Success => format!("{subject} succeeded"),
            Status::Failed => format!("{subject} failed"),
        }
    }

    async fn execute(&self, ctx: &StepContext) -> Result<StepOutput, StepError> {
        self.retry
            .run(&self.name, || self.send_once(ctx), classify_step_error)
            .await
            .map_err(|err| match err {
                RetryError::Fatal(e) => e,
                RetryError::AttemptsExceeded { attempts, last } => StepError::RetriesExhausted {
                    attempts,
                    last: Box::new(last),
                },
            })
    }
}

fn encode_segment(value: &str) -> Option<String> {
    let mut scratch = Url::parse("http://segment.invalid/").ok()?;
    scratch.path_segments_mut().ok()?.clear().push(value);
    scratch.path().strip_prefix('/').map(str::to_string)
}

pub fn retry_policy(settings: &RetrySettings) -> RetryPolicy {
    RetryPolicy::new(
        settings.max_attempts,
        Duration::from_millis(settings.base_delay_ms),
        Duration::from_millis(settings.max_delay_ms),
    )
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Get => Method::GET,
    }
}

/// A JSON object body becomes the step's output values; any other JSON is
/// stored under the step name. Empty or non-JSON bodies produce nothing.
fn parse_output(step: &str, status: StatusCode, body: &str) -> Map<String, Value> {
    if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
        return Map::new();
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(values)) => values,
        Ok(other) => {
            let mut values = Map::new();
            values.insert(step.to_string(), other);
            values
        }
        Err(_) => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(url: &str) -> StepSettings {
        serde_json::from_value(json!({ "name": "grant-access", "url": url })).unwrap()
    }

    #[test]
    fn renders_record_id_into_url() {
        let step = HttpStep::new(Client::new(), &settings("https://idp.local/users/{record_id}/grants"));
        assert_eq!(
            step.url_for("a@x.io").unwrap(),
            "https://idp.local/users/a@x.io/grants"
        );
    }

    #[test]
    fn reserved_characters_stay_inside_one_segment() {
        let step = HttpStep::new(Client::new(), &settings("https://idp.local/users/{record_id}/confirm"));
        assert_eq!(
            step.url_for("a/b@x.io").unwrap(),
            "https://idp.local/users/a%2Fb@x.io/confirm"
        );
        assert_eq!(
            step.url_for("a?b#c%").unwrap(),
            "https://idp.local/users/a%3Fb%23c%25/confirm"
        );
    }

    #[test]
    fn object_body_becomes_values() {
        let values = parse_output("signup", StatusCode::CREATED, r#"{"user_id":"u-1"}"#);
        assert_eq!(values["user_id"], json!("u-1"));
    }

    #[test]
    fn scalar_body_is_stored_under_step_name() {
        let values = parse_output("signup", StatusCode::OK, "42");
        assert_eq!(values["signup"], json!(42));
    }

    #[test]
    fn empty_or_text_body_yields_nothing() {
        assert!(parse_output("signup", StatusCode::NO_CONTENT, "").is_empty());
        assert!(parse_output("signup", StatusCode::OK, "created").is_empty());
    }

    #[test]
    fn label_uses_configured_text() {
        let mut cfg = settings("https://idp.local/users");
        let step = HttpStep::new(Client::new(), &cfg);
        assert_eq!(step.label(Status::Failed), "grant-access failed");

        cfg.label = Some("Access grant".into());
        let step = HttpStep::new(Client::new(), &cfg);
        assert_eq!(step.label(Status::Success), "Access grant succeeded");
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let mut cfg = settings("http://127.0.0.1:9/users");
        cfg.retry = RetrySettings {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
        };
        cfg.timeout_ms = 500;
        let step = HttpStep::new(Client::new(), &cfg);
        let ctx = StepContext::new(
            "a@x.io",
            std::sync::Arc::new(model::records::record::Record::from_pairs([("email", "a@x.io")])),
        );

        let err = step.execute(&ctx).await.unwrap_err();
        assert!(matches!(
            err,
            StepError::Transport { .. } | StepError::RetriesExhausted { .. }
        ));
    }
}
