//! Client for the Icinga2 REST API.
//!
//! Only the passive `process-check-result` action is used. This is the call
//! being made:
//!
//! ```text
//! curl -u $USER:$PASSWORD -H 'Accept: application/json' -X POST \
//!     "$ENDPOINT/v1/actions/process-check-result?service=$REPORTING_HOST!$SERVICE" \
//!     -d '{"exit_status": 2, "plugin_output": "...", "performance_data": "..."}'
//! ```

use reqwest::header::ACCEPT;
use serde_json::Value;
use url::Url;

use crate::config::MonitorConfig;
use crate::verdict::CheckVerdict;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Unable to reach Icinga2: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Icinga2 did not answer with JSON: {0}")]
    InvalidResponse(#[source] serde_json::Error),
}

pub struct Icinga2Client {
    client: reqwest::Client,
    username: String,
    password: String,
    endpoint: Url,
}

impl Icinga2Client {
    pub fn new(
        username: &str,
        password: &str,
        endpoint: Url,
        verify_tls: bool,
    ) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(ReportError::Transport)?;
        Ok(Self {
            client,
            username: username.to_string(),
            password: password.to_string(),
            endpoint,
        })
    }

    fn check_result_url(&self, reporting_host: &str, service: &str) -> String {
        format!(
            "{}/v1/actions/process-check-result?service={reporting_host}!{service}",
            self.endpoint.as_str().trim_end_matches('/')
        )
    }

    /// Submits `verdict` as the check result of `reporting_host!service` and
    /// returns whatever JSON Icinga2 answers with. A single attempt is made.
    pub async fn process_check_result(
        &self,
        reporting_host: &str,
        service: &str,
        verdict: &CheckVerdict,
    ) -> Result<Value, ReportError> {
        let url = self.check_result_url(reporting_host, service);
        log::info!("Submitting {} check result to {url}", verdict.exit_status);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, "application/json")
            .json(verdict)
            .send()
            .await
            .map_err(ReportError::Transport)?;

        let status = response.status();
        if status.is_success() {
            log::info!("Icinga2 answered {status}");
        } else {
            log::warn!("Icinga2 answered {status}");
        }

        let body = response.bytes().await.map_err(ReportError::Transport)?;
        serde_json::from_slice(&body).map_err(ReportError::InvalidResponse)
    }
}

/// Delivers `verdict` to the Icinga2 instance described by `config`.
pub async fn report(config: &MonitorConfig, verdict: &CheckVerdict) -> Result<Value, ReportError> {
    let client = Icinga2Client::new(
        &config.api_user,
        &config.api_password,
        config.endpoint.clone(),
        config.verify_tls,
    )?;
    client
        .process_check_result(&config.reporting_host, &config.service, verdict)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::CollectionResult;
    use crate::verdict::aggregate;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{basic_auth, body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(endpoint: &str) -> MonitorConfig {
        MonitorConfig {
            endpoint: Url::parse(endpoint).unwrap(),
            api_user: "container-monitor".to_string(),
            api_password: "s3cret".to_string(),
            reporting_host: "docker01.example.com".to_string(),
            service: "check_dockmon".to_string(),
            verify_tls: true,
        }
    }

    fn critical_verdict() -> CheckVerdict {
        aggregate(&CollectionResult::Error(
            "Error connecting to docker api".to_string(),
        ))
    }

    #[test]
    fn test_check_result_url() {
        for endpoint in ["https://icinga2:5665", "https://icinga2:5665/"] {
            let client =
                Icinga2Client::new("user", "pass", Url::parse(endpoint).unwrap(), true).unwrap();
            assert_eq!(
                client.check_result_url("docker01", "check_dockmon"),
                "https://icinga2:5665/v1/actions/process-check-result?service=docker01!check_dockmon"
            );
        }
    }

    #[tokio::test]
    async fn test_report_posts_check_result() {
        let server = MockServer::start().await;
        let acknowledgement = json!({
            "results": [{
                "code": 200.0,
                "status": "Successfully processed check result for object 'docker01.example.com!check_dockmon'."
            }]
        });

        Mock::given(method("POST"))
            .and(path("/v1/actions/process-check-result"))
            .and(query_param("service", "docker01.example.com!check_dockmon"))
            .and(basic_auth("container-monitor", "s3cret"))
            .and(header("accept", "application/json"))
            .and(body_json(json!({
                "exit_status": 2,
                "plugin_output": "CRITICAL - Error connecting to docker api",
                "performance_data": "",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(acknowledgement.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let response = report(&config_for(&server.uri()), &critical_verdict())
            .await
            .expect("Failed to report");

        assert_eq!(response, acknowledgement);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url.query(),
            Some("service=docker01.example.com!check_dockmon")
        );
    }

    #[tokio::test]
    async fn test_report_returns_json_error_bodies() {
        let server = MockServer::start().await;
        let rejection = json!({
            "error": 404.0,
            "status": "No objects found."
        });

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_json(rejection.clone()))
            .mount(&server)
            .await;

        let response = report(&config_for(&server.uri()), &critical_verdict())
            .await
            .expect("A JSON error body is still a response");

        assert_eq!(response, rejection);
    }

    #[tokio::test]
    async fn test_report_rejects_non_json_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
            .mount(&server)
            .await;

        let res = report(&config_for(&server.uri()), &critical_verdict()).await;

        assert!(matches!(res, Err(ReportError::InvalidResponse(_))), "{:?}", res);
    }

    #[tokio::test]
    async fn test_report_unreachable_backend() {
        let res = report(&config_for("http://127.0.0.1:1"), &critical_verdict()).await;

        assert!(matches!(res, Err(ReportError::Transport(_))), "{:?}", res);
    }

    #[tokio::test]
    async fn test_report_body_cut_short_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        // Announces a longer body than it sends, then hangs up.
        let backend = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.ends_with(b"}") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"results\": [",
                )
                .await
                .unwrap();
            let _ = socket.shutdown().await;
        });

        let res = report(&config_for(&format!("http://{address}")), &critical_verdict()).await;
        backend.await.unwrap();

        assert!(matches!(res, Err(ReportError::Transport(_))), "{:?}", res);
    }
}
