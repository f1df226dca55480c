use reqwest::Url;
use tracing::{debug, info, warn};

use crate::config::GateConfig;
use crate::error::{Result, ScrapeError, SessionErrorCode};
use crate::transport::{FetchRequest, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    /// The gate page was served; `accepts` counts accept actions issued so far.
    GateDetected { accepts: u32 },
    /// Terminal; carries the target page body.
    Authenticated(String),
}

/// Gets past a portal's disclaimer gate and returns the target page.
pub struct SessionAcquirer<'a> {
    transport: &'a dyn Transport,
    gate: &'a GateConfig,
    base_url: &'a str,
}

impl<'a> SessionAcquirer<'a> {
    pub fn new(transport: &'a dyn Transport, gate: &'a GateConfig, base_url: &'a str) -> Self {
        Self {
            transport,
            gate,
            base_url,
        }
    }

    pub async fn acquire(&self, identifier: &str, target: &Url) -> Result<String> {
        let mut state = SessionState::Unauthenticated;
        loop {
            state = match state {
                SessionState::Unauthenticated => {
                    let body = self.fetch_target(identifier, target).await?;
                    self.classify(body, 0)
                }
                SessionState::GateDetected { accepts } => {
                    if accepts >= self.gate.max_accept_attempts {
                        return Err(ScrapeError::session(
                            SessionErrorCode::GateAcceptFailed,
                            identifier,
                            format!("gate still present after {} accept attempts", accepts),
                        ));
                    }
                    self.accept(identifier, target).await?;
                    let body = self.fetch_target(identifier, target).await?;
                    self.classify(body, accepts + 1)
                }
                SessionState::Authenticated(body) => {
                    info!("Session established for {}", identifier);
                    return Ok(body);
                }
            };
            debug!("Session state -> {}", state_name(&state));
        }
    }

    fn classify(&self, body: String, accepts: u32) -> SessionState {
        if self.gate.is_gate(&body) {
            warn!("Gate page served (accepts so far: {})", accepts);
            SessionState::GateDetected { accepts }
        } else {
            SessionState::Authenticated(body)
        }
    }

    async fn fetch_target(&self, identifier: &str, target: &Url) -> Result<String> {
        self.transport
            .fetch(target.as_str(), FetchRequest::get())
            .await
            .map(|r| r.body)
            .map_err(|e| ScrapeError::session(SessionErrorCode::FetchFailed, identifier, e))
    }

    async fn accept(&self, identifier: &str, target: &Url) -> Result<()> {
        let accept_url = Url::parse_with_params(
            &format!("{}{}", self.base_url, self.gate.accept_path),
            &[(self.gate.return_param.as_str(), target.as_str())],
        )
        .map_err(|e| ScrapeError::session(SessionErrorCode::GateAcceptFailed, identifier, e))?;

        info!("Accepting gate for {}", identifier);
        self.transport
            .fetch(accept_url.as_str(), FetchRequest::confirm())
            .await
            .map_err(|e| ScrapeError::session(SessionErrorCode::GateAcceptFailed, identifier, e))?;
        Ok(())
    }
}

fn state_name(state: &SessionState) -> &'static str {
    match state {
        SessionState::Unauthenticated => "UNAUTHENTICATED",
        SessionState::GateDetected { .. } => "GATE_DETECTED",
        SessionState::Authenticated(_) => "AUTHENTICATED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::fake::ScriptedTransport;
    use crate::transport::Method;

    const BASE: &str = "https://portal.test";
    const TARGET: &str = "https://portal.test/applicationDetails.do?reference=FP%2F2025%2F0159&activeTab=summary";
    const GATE_PAGE: &str = "<h1>Disclaimer</h1><form><button>I Agree</button></form>";
    const CONTENT: &str = "<table><tr><th>Reference</th><td>FP/2025/0159</td></tr></table>";

    fn gate() -> GateConfig {
        GateConfig {
            markers: vec!["disclaimer".to_string()],
            accept_path: "/disclaimer/accept".to_string(),
            return_param: "returnUrl".to_string(),
            max_accept_attempts: 2,
        }
    }

    fn target() -> Url {
        Url::parse(TARGET).unwrap()
    }

    fn accept_url() -> String {
        Url::parse_with_params("https://portal.test/disclaimer/accept", &[("returnUrl", TARGET)])
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn no_gate_goes_straight_through() {
        let transport = ScriptedTransport::new().reply(TARGET, CONTENT);
        let gate = gate();
        let body = SessionAcquirer::new(&transport, &gate, BASE)
            .acquire("FP/2025/0159", &target())
            .await
            .unwrap();
        assert_eq!(body, CONTENT);
        assert_eq!(transport.count(Method::Post, BASE), 0);
    }

    #[tokio::test]
    async fn gate_then_content_uses_one_accept() {
        let transport = ScriptedTransport::new()
            .reply(TARGET, GATE_PAGE)
            .reply(TARGET, CONTENT)
            .reply(&accept_url(), "");
        let gate = gate();
        let body = SessionAcquirer::new(&transport, &gate, BASE)
            .acquire("FP/2025/0159", &target())
            .await
            .unwrap();
        assert_eq!(body, CONTENT);
        assert_eq!(transport.count(Method::Post, BASE), 1);
        assert_eq!(
            transport.calls(),
            vec![
                (Method::Get, TARGET.to_string()),
                (Method::Post, accept_url()),
                (Method::Get, TARGET.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn persistent_gate_fails_after_two_accepts() {
        let transport = ScriptedTransport::new().reply(TARGET, GATE_PAGE).reply(&accept_url(), "");
        let gate = gate();
        let err = SessionAcquirer::new(&transport, &gate, BASE)
            .acquire("FP/2025/0159", &target())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "GATE_ACCEPT_FAILED");
        assert_eq!(transport.count(Method::Post, BASE), 2);
        assert_eq!(transport.count(Method::Get, BASE), 3);
    }

    #[tokio::test]
    async fn gate_cleared_on_second_accept() {
        let transport = ScriptedTransport::new()
            .reply(TARGET, GATE_PAGE)
            .reply(TARGET, GATE_PAGE)
            .reply(TARGET, CONTENT)
            .reply(&accept_url(), "");
        let gate = gate();
        let body = SessionAcquirer::new(&transport, &gate, BASE)
            .acquire("FP/2025/0159", &target())
            .await
            .unwrap();
        assert_eq!(body, CONTENT);
        assert_eq!(transport.count(Method::Post, BASE), 2);
    }

    #[tokio::test]
    async fn failed_accept_is_reported() {
        let transport = ScriptedTransport::new()
            .reply(TARGET, GATE_PAGE)
            .fail(&accept_url(), 500);
        let gate = gate();
        let err = SessionAcquirer::new(&transport, &gate, BASE)
            .acquire("FP/2025/0159", &target())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "GATE_ACCEPT_FAILED");
        assert!(err.to_string().contains("FP/2025/0159"));
    }

    #[tokio::test]
    async fn content_with_disclaimer_footer_is_not_gated() {
        let summary = std::fs::read_to_string("tests/fixtures/planning_summary.html").unwrap();
        let page = summary.replace(
            "</body>",
            "<footer><a href=\"/disclaimer\">Disclaimer</a> | <a href=\"/terms\">Terms and Conditions</a></footer></body>",
        );
        let transport = ScriptedTransport::new().reply(TARGET, &page);
        let mut gate = gate();
        gate.markers.push("terms and conditions".to_string());

        let body = SessionAcquirer::new(&transport, &gate, BASE)
            .acquire("FP/2025/0159", &target())
            .await
            .unwrap();
        assert_eq!(body, page);
        assert_eq!(transport.count(Method::Post, BASE), 0);
    }

    #[tokio::test]
    async fn failed_fetch_is_reported() {
        let transport = ScriptedTransport::new().fail(TARGET, 503);
        let gate = gate();
        let err = SessionAcquirer::new(&transport, &gate, BASE)
            .acquire("FP/2025/0159", &target())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "FETCH_FAILED");
        assert!(err.to_string().contains("503"));
    }
}
