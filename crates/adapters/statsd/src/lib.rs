//! # hvac-adapter-statsd
//!
//! Temperature gauges for a DogStatsD agent.
//!
//! [`StatsdSink`] writes one datagram per gauge in the DogStatsD line format
//! (`<namespace><name>:<value>|g|#<tags>`). Delivery is fire-and-forget: UDP
//! never waits for the agent.
//!
//! ## Dependency rule
//!
//! Depends on `hvac-app` (port traits) and `hvac-domain` only.

mod error;

use std::future::Future;

use tokio::net::UdpSocket;

use hvac_app::ports::MetricsSink;
use hvac_domain::error::HvacError;

pub use error::MetricsError;

/// Default agent address.
pub const DEFAULT_AGENT_ADDR: &str = "127.0.0.1:8125";

#[derive(Debug)]
pub struct StatsdSink {
    socket: UdpSocket,
    namespace: String,
    tags: Vec<String>,
}

impl StatsdSink {
    /// Bind a local socket and point it at the agent.
    ///
    /// `namespace` is prepended verbatim to every metric name, so it usually
    /// ends with a dot. `tags` are added to every gauge.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Io`] when the socket cannot be bound or the
    /// agent address does not resolve.
    pub async fn connect(
        agent_addr: &str,
        namespace: impl Into<String>,
        tags: Vec<String>,
    ) -> Result<Self, MetricsError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(agent_addr).await?;
        let namespace = namespace.into();
        tracing::info!(addr = agent_addr, %namespace, ?tags, "statsd metrics enabled");
        Ok(Self {
            socket,
            namespace,
            tags,
        })
    }

    fn line(&self, name: &str, value: f64, tags: &[String]) -> String {
        let mut line = format!("{}{name}:{value}|g", self.namespace);
        let mut all = self.tags.iter().chain(tags).peekable();
        if all.peek().is_some() {
            line.push_str("|#");
            line.push_str(&all.map(String::as_str).collect::<Vec<_>>().join(","));
        }
        line
    }
}

impl MetricsSink for StatsdSink {
    fn gauge(
        &self,
        name: &str,
        value: f64,
        tags: &[String],
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        let line = self.line(name, value, tags);
        async move {
            self.socket
                .send(line.as_bytes())
                .await
                .map_err(MetricsError::from)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn agent() -> (UdpSocket, String) {
        let agent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = agent.local_addr().unwrap().to_string();
        (agent, addr)
    }

    async fn receive(agent: &UdpSocket) -> String {
        let mut buf = [0u8; 512];
        let len = agent.recv(&mut buf).await.unwrap();
        String::from_utf8(buf[..len].to_vec()).unwrap()
    }

    #[tokio::test]
    async fn should_send_gauge_with_namespace_and_tags() {
        let (agent, addr) = agent().await;
        let sink = StatsdSink::connect(&addr, "hvac.", vec!["env:home".to_string()])
            .await
            .unwrap();

        sink.gauge(
            "zone.temperature",
            70.5,
            &["component:sensor".to_string(), "zone:basement".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(
            receive(&agent).await,
            "hvac.zone.temperature:70.5|g|#env:home,component:sensor,zone:basement"
        );
    }

    #[tokio::test]
    async fn should_omit_tag_section_without_tags() {
        let (agent, addr) = agent().await;
        let sink = StatsdSink::connect(&addr, "", Vec::new()).await.unwrap();

        sink.gauge("buffer_tank.temperature", 112.0, &[]).await.unwrap();

        assert_eq!(receive(&agent).await, "buffer_tank.temperature:112|g");
    }

    #[tokio::test]
    async fn should_fail_on_unresolvable_agent() {
        let result = StatsdSink::connect("not a socket address", "hvac.", Vec::new()).await;
        assert!(matches!(result, Err(MetricsError::Io(_))));
    }
}
