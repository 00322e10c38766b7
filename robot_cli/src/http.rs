//! HTTP collaborators: the kinematics solver and the preset service.
//!
//! Both live behind one base URL. Plain solves go to `POST /pcc`, which
//! answers `{"points": [...]}`; tendon-driven configurations go to
//! `POST /tendons/calculate`, which (like every preset route) wraps its
//! payload in `{"success": true, "data": ...}`.

use std::collections::BTreeMap;

use robot_core::errors::{RobotError, RobotResult, SolverError};
use robot_core::preset::{Preset, PresetDraft, PresetPatch, PresetSource};
use robot_core::solver::{ActuationCommand, Point3, Solver, SolverRequest, SolverResponse, TendonAnalysis};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ServiceConfig;

/// Current application version (from Cargo.toml)
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Client for the solver and preset endpoints.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl ServiceClient {
    pub fn new(config: &ServiceConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("robot_cli/{}", CURRENT_VERSION))
            .timeout(config.timeout())
            .build()?;
        Ok(ServiceClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a preset request and unwrap the response envelope.
    async fn preset_call<T: DeserializeOwned>(
        &self,
        operation: &str,
        preset_id: Option<i64>,
        builder: reqwest::RequestBuilder,
    ) -> RobotResult<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| RobotError::preset_service(operation, e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(preset_id) = preset_id {
                return Err(RobotError::PresetNotFound { preset_id });
            }
        }
        let body = response
            .text()
            .await
            .map_err(|e| RobotError::preset_service(operation, e.to_string()))?;
        if !status.is_success() {
            return Err(RobotError::preset_service(
                operation,
                format!("HTTP {}: {}", status.as_u16(), error_message(&body)),
            ));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)
            .map_err(|e| RobotError::preset_service(operation, format!("unexpected response: {}", e)))?;
        envelope
            .into_data()
            .map_err(|message| RobotError::preset_service(operation, message))
    }
}

/// `{"success", "data", "message"}` wrapper used by the service.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err("response carried no data".to_string()),
            (false, _) => Err(self.message.unwrap_or_else(|| "request failed".to_string())),
        }
    }
}

/// Best human-readable message from an error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("detail"))
                .and_then(|m| m.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

// ============================================================================
// Solver
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SolverBody {
    Wrapped(Envelope<TendonBody>),
    Points { points: Vec<Vec<Point3>> },
}

#[derive(Debug, Deserialize)]
struct TendonBody {
    robot_positions: Vec<Vec<Point3>>,
    #[serde(default)]
    tendon_analysis: TendonAnalysisBody,
    #[serde(default)]
    actuation_commands: BTreeMap<String, ActuationCommand>,
}

#[derive(Debug, Default, Deserialize)]
struct TendonAnalysisBody {
    #[serde(default)]
    routing_points: Vec<Vec<Point3>>,
    /// Cumulative length per tendon, per coupling element
    #[serde(default)]
    total_lengths: Vec<Vec<f64>>,
}

/// Map a solver response body onto the core shape type.
fn parse_solver_body(body: &str) -> Result<SolverResponse, SolverError> {
    let parsed: SolverBody = serde_json::from_str(body).map_err(|e| SolverError::Malformed {
        reason: e.to_string(),
    })?;
    match parsed {
        SolverBody::Points { points } => Ok(SolverResponse {
            segments: points,
            tendons: None,
        }),
        SolverBody::Wrapped(envelope) => {
            let tendon = envelope
                .into_data()
                .map_err(|reason| SolverError::Malformed { reason })?;
            Ok(SolverResponse {
                segments: tendon.robot_positions,
                tendons: Some(TendonAnalysis {
                    actuation_commands: tendon.actuation_commands,
                    routing_points: tendon.tendon_analysis.routing_points,
                    total_lengths: tendon
                        .tendon_analysis
                        .total_lengths
                        .iter()
                        .map(|per_element| per_element.last().copied().unwrap_or(0.0))
                        .collect(),
                }),
            })
        }
    }
}

/// Classify a transport failure by its shape.
fn classify(error: reqwest::Error) -> SolverError {
    if error.is_timeout() {
        SolverError::Timeout
    } else if error.is_decode() {
        SolverError::Malformed {
            reason: error.to_string(),
        }
    } else {
        SolverError::Unreachable {
            reason: error.to_string(),
        }
    }
}

impl Solver for ServiceClient {
    async fn solve(&self, request: SolverRequest) -> Result<SolverResponse, SolverError> {
        let path = if request.has_tendons() { "/tendons/calculate" } else { "/pcc" };
        log::debug!("POST {}{}", self.base_url, path);

        let response = self
            .request(reqwest::Method::POST, path)
            .json(&request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let body = response.text().await.map_err(classify)?;
        if !status.is_success() {
            return Err(SolverError::Status {
                code: status.as_u16(),
                body: error_message(&body),
            });
        }
        parse_solver_body(&body)
    }
}

// ============================================================================
// Presets
// ============================================================================

impl PresetSource for ServiceClient {
    async fn list_public_presets(&self) -> RobotResult<Vec<Preset>> {
        self.preset_call("list public presets", None, self.request(reqwest::Method::GET, "/presets/public"))
            .await
    }

    async fn get_user_presets(&self) -> RobotResult<Vec<Preset>> {
        self.preset_call("list user presets", None, self.request(reqwest::Method::GET, "/presets/"))
            .await
    }

    async fn get_preset(&self, id: i64) -> RobotResult<Preset> {
        let path = format!("/presets/{}", id);
        self.preset_call("get preset", Some(id), self.request(reqwest::Method::GET, &path))
            .await
    }

    async fn create_preset(&self, draft: PresetDraft) -> RobotResult<Preset> {
        let builder = self.request(reqwest::Method::POST, "/presets/").json(&draft);
        self.preset_call("create preset", None, builder).await
    }

    async fn update_preset(&self, id: i64, patch: PresetPatch) -> RobotResult<Preset> {
        let path = format!("/presets/{}", id);
        let builder = self.request(reqwest::Method::PUT, &path).json(&patch);
        self.preset_call("update preset", Some(id), builder).await
    }

    async fn delete_preset(&self, id: i64) -> RobotResult<()> {
        let path = format!("/presets/{}", id);
        let _: serde_json::Value = self
            .preset_call("delete preset", Some(id), self.request(reqwest::Method::DELETE, &path))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use robot_core::errors::ErrorKind;
    use robot_core::solver::PullDirection;
    use robot_core::units::{Meters, Radians};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 16 * 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
        });
        format!("http://{}", addr)
    }

    fn client(base_url: String, timeout_secs: u64) -> ServiceClient {
        ServiceClient::new(&ServiceConfig {
            base_url,
            auth_token: Some("token".into()),
            timeout_secs,
        })
        .unwrap()
    }

    fn plain_request() -> SolverRequest {
        SolverRequest {
            bending_angles: vec![Radians(0.1)],
            rotation_angles: vec![Radians(0.0)],
            backbone_lengths: vec![Meters(0.07)],
            coupling_lengths: vec![Meters(0.03), Meters(0.03)],
            discretization_steps: 10,
            tendon_config: None,
        }
    }

    #[test]
    fn test_parse_points_body() {
        let shape = parse_solver_body(r#"{"points": [[[0,0,0],[0,0,0.03]], [[0,0,0.03],[0,0.01,0.1]]]}"#).unwrap();
        assert_eq!(shape.segment_count(), 2);
        assert!(shape.tendons.is_none());
    }

    #[test]
    fn test_parse_tendon_envelope() {
        let body = r#"{
            "success": true,
            "message": "Tendon calculation completed successfully",
            "data": {
                "robot_positions": [[[0,0,0],[0,0,0.03]]],
                "tendon_analysis": {
                    "routing_points": [[[0.03,0,0],[-0.015,0.026,0],[-0.015,-0.026,0]]],
                    "total_lengths": [[0, 0.07, 0.1], [0, 0.068, 0.097], [0, 0.072, 0.103]],
                    "segment_lengths": [[0.07, 0.03]]
                },
                "actuation_commands": {
                    "1": {"length_change_m": -0.003, "pull_direction": "pull", "magnitude": 0.003}
                },
                "model_type": "pcc"
            }
        }"#;
        let shape = parse_solver_body(body).unwrap();
        let tendons = shape.tendons.unwrap();
        assert_eq!(tendons.total_lengths, vec![0.1, 0.097, 0.103]);
        assert_eq!(tendons.routing_points[0].len(), 3);
        assert_eq!(tendons.actuation_commands["1"].pull_direction, PullDirection::Pull);
    }

    #[test]
    fn test_unexpected_body_is_malformed() {
        assert!(matches!(parse_solver_body("[1, 2]"), Err(SolverError::Malformed { .. })));
        assert!(matches!(
            parse_solver_body(r#"{"success": false, "message": "boom"}"#),
            Err(SolverError::Malformed { reason }) if reason == "boom"
        ));
    }

    #[test]
    fn test_error_message_prefers_json_message() {
        assert_eq!(error_message(r#"{"success": false, "error": "X", "message": "Preset not found"}"#), "Preset not found");
        assert_eq!(error_message(r#"{"detail": "Not authenticated"}"#), "Not authenticated");
        assert_eq!(error_message("Internal Server Error\n"), "Internal Server Error");
    }

    #[tokio::test]
    async fn test_solve_success() {
        let base = serve_once("200 OK", r#"{"points": [[[0,0,0],[0,0,0.1]]]}"#).await;
        let shape = client(base, 5).solve(plain_request()).await.unwrap();
        assert_eq!(shape.tip(), Some([0.0, 0.0, 0.1]));
    }

    #[tokio::test]
    async fn test_server_error_classified() {
        let base = serve_once("500 Internal Server Error", r#"{"message": "solver crashed"}"#).await;
        let err = client(base, 5).solve(plain_request()).await.unwrap_err();
        assert_eq!(err, SolverError::Status { code: 500, body: "solver crashed".into() });
        assert_eq!(err.kind(), ErrorKind::Server);
    }

    #[tokio::test]
    async fn test_unreachable_classified() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{}", addr), 5).solve(plain_request()).await.unwrap_err();
        assert!(matches!(err, SolverError::Unreachable { .. }));
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_timeout_classified() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let mut service = ServiceConfig::default();
        service.base_url = format!("http://{}", addr);
        let mut solver = ServiceClient::new(&service).unwrap();
        solver.client = reqwest::Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();

        assert_eq!(solver.solve(plain_request()).await.unwrap_err(), SolverError::Timeout);
    }

    #[tokio::test]
    async fn test_preset_not_found() {
        let base = serve_once("404 Not Found", r#"{"success": false, "error": "NOT_FOUND", "message": "Preset not found"}"#).await;
        let err = client(base, 5).get_preset(42).await.unwrap_err();
        assert_eq!(err, RobotError::PresetNotFound { preset_id: 42 });
    }

    #[tokio::test]
    async fn test_public_presets_unwrapped() {
        let base = serve_once(
            "200 OK",
            r#"{"success": true, "data": [{"id": 1, "name": "Default", "description": null, "is_public": true,
                "configuration": {"segments": 2}, "created_at": "2025-01-01T00:00:00", "updated_at": "2025-01-01T00:00:00",
                "user_id": 1}], "message": "ok"}"#,
        )
        .await;
        let presets = client(base, 5).list_public_presets().await.unwrap();
        assert_eq!(presets.len(), 1);
        assert_eq!(presets[0].name, "Default");
    }

    #[tokio::test]
    async fn test_preset_service_down() {
        let base = serve_once("503 Service Unavailable", "maintenance").await;
        let err = client(base, 5).get_user_presets().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.to_string().contains("HTTP 503: maintenance"));
    }
}
