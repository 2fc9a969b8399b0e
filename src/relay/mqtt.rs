//! MQTT plumbing for the relay topics.
//!
//! Brokers are loopback-only unless `mqtt.allow_remote` is set. TLS uses the
//! configured CA (or the default roots) and mutual TLS when a client
//! certificate and key are both given.
//!
//! Publishing is fire-and-forget (`QoS::AtMostOnce`, `try_publish`), which
//! matches the last-value-wins contract: a dropped command is superseded by
//! the next frame's.

use anyhow::{anyhow, Context, Result};
use rumqttc::v5::{mqttbytes::QoS, Client, Connection, Event, Incoming, MqttOptions};
use rumqttc::Transport;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::MqttSettings;

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const REQUEST_CAPACITY: usize = 16;

/// Broker endpoint resolved from the relay settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl BrokerEndpoint {
    /// Parse `host:port` with an optional scheme. `mqtt://` and `tcp://` are
    /// plain, `mqtts://` and `ssl://` select TLS, as does `force_tls`. IPv6
    /// hosts must be bracketed (`[::1]:1883`).
    pub fn parse(addr: &str, force_tls: bool) -> Result<Self> {
        let addr = addr.trim();
        let (tls, rest) = match addr.split_once("://") {
            None => (force_tls, addr),
            Some(("mqtt" | "tcp", rest)) => (force_tls, rest),
            Some(("mqtts" | "ssl", rest)) => (true, rest),
            Some((scheme, _)) => return Err(anyhow!("unsupported MQTT scheme: {}", scheme)),
        };

        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("missing MQTT port in {}", addr))?;
        let host = match host.strip_prefix('[') {
            Some(inner) => inner
                .strip_suffix(']')
                .ok_or_else(|| anyhow!("unclosed IPv6 bracket in {}", addr))?,
            None if host.contains(':') => {
                return Err(anyhow!("IPv6 MQTT host must be bracketed in {}", addr))
            }
            None => host,
        };
        if host.is_empty() {
            return Err(anyhow!("missing MQTT host in {}", addr));
        }
        let port = port
            .parse::<u16>()
            .with_context(|| format!("invalid MQTT port in {}", addr))?;

        Ok(Self {
            host: host.to_string(),
            port,
            tls,
        })
    }

    pub fn is_loopback(&self) -> bool {
        self.host == "localhost"
            || self
                .host
                .parse::<std::net::IpAddr>()
                .map(|ip| ip.is_loopback())
                .unwrap_or(false)
    }

    /// Endpoint for `settings`. Non-loopback brokers are refused unless
    /// `allow_remote` is set.
    pub fn from_settings(settings: &MqttSettings) -> Result<Self> {
        let endpoint = Self::parse(&settings.broker_addr, settings.use_tls)?;
        if endpoint.is_loopback() {
            return Ok(endpoint);
        }
        if !settings.allow_remote {
            return Err(anyhow!(
                "MQTT broker must be loopback: {} (set mqtt.allow_remote or --allow-remote-mqtt to override)",
                settings.broker_addr
            ));
        }
        log::warn!(
            "Remote MQTT broker {} enabled - ensure it is in a trusted network",
            settings.broker_addr
        );
        Ok(endpoint)
    }

    /// Transport with the PEM files named in `settings`. A client certificate
    /// needs a key and a CA; any TLS file on a plain endpoint is an error.
    fn transport(&self, settings: &MqttSettings) -> Result<Transport> {
        let ca = settings
            .tls_ca_path
            .as_deref()
            .map(|path| read_pem(path, "CA"))
            .transpose()?;
        let client_auth = match (
            settings.tls_client_cert_path.as_deref(),
            settings.tls_client_key_path.as_deref(),
        ) {
            (Some(cert), Some(key)) => {
                Some((read_pem(cert, "client cert")?, read_pem(key, "client key")?))
            }
            (None, None) => None,
            (Some(_), None) => {
                return Err(anyhow!("MQTT TLS client certificate provided without key"))
            }
            (None, Some(_)) => {
                return Err(anyhow!("MQTT TLS client key provided without certificate"))
            }
        };

        if !self.tls {
            if ca.is_some() || client_auth.is_some() {
                return Err(anyhow!(
                    "MQTT TLS files configured but TLS is disabled (set mqtt.use_tls or use mqtts://)"
                ));
            }
            return Ok(Transport::tcp());
        }
        match (ca, client_auth) {
            (None, None) => Ok(Transport::tls_with_default_config()),
            (Some(ca), client_auth) => Ok(Transport::tls(ca, client_auth, None)),
            (None, Some(_)) => Err(anyhow!(
                "MQTT TLS CA certificate is required when providing client certificates"
            )),
        }
    }
}

fn read_pem(path: &Path, what: &str) -> Result<Vec<u8>> {
    std::fs::read(path)
        .with_context(|| format!("failed to read MQTT TLS {} '{}'", what, path.display()))
}

/// Build a client for one process role (`follow`, `publisher`, `joystick`).
///
/// Nothing is sent until the returned `Connection` is polled.
pub fn connect_mqtt(settings: &MqttSettings, role: &str) -> Result<(Client, Connection)> {
    let endpoint = BrokerEndpoint::from_settings(settings)?;

    let client_id = settings.client_id_for(role);
    let mut options = MqttOptions::new(client_id.as_str(), endpoint.host.as_str(), endpoint.port);
    options.set_keep_alive(KEEP_ALIVE);
    options.set_clean_start(true);
    if let Some(user) = settings.username.as_deref() {
        options.set_credentials(user, settings.password.clone().unwrap_or_default());
    }
    options.set_transport(endpoint.transport(settings)?);

    let (client, connection) = Client::new(options, REQUEST_CAPACITY);
    log::info!(
        "MQTT client {} -> {}:{} (TLS: {}, auth: {})",
        client_id,
        endpoint.host,
        endpoint.port,
        endpoint.tls,
        settings.username.is_some()
    );
    Ok((client, connection))
}

/// Background connection loop plus a publishing handle.
///
/// Subscriptions are (re)issued on every `ConnAck`, so they survive broker
/// reconnects. Inbound publishes are handed to `on_publish` on the
/// connection thread; it must not block.
pub struct MqttRuntime {
    client: Client,
    stopping: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MqttRuntime {
    pub fn start<F>(
        client: Client,
        mut connection: Connection,
        subscriptions: Vec<String>,
        mut on_publish: F,
    ) -> Self
    where
        F: FnMut(&str, &[u8]) + Send + 'static,
    {
        let stopping = Arc::new(AtomicBool::new(false));
        let thread_stopping = Arc::clone(&stopping);
        let subscriber = client.clone();

        let handle = std::thread::spawn(move || {
            for event in connection.iter() {
                match event {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        log::info!("MQTT connected");
                        for topic in &subscriptions {
                            match subscriber.try_subscribe(topic.as_str(), QoS::AtMostOnce) {
                                Ok(()) => log::info!("Subscribed to {}", topic),
                                Err(e) => log::warn!("Failed to subscribe to {}: {}", topic, e),
                            }
                        }
                    }
                    Ok(Event::Incoming(Incoming::Publish(publish))) => {
                        match std::str::from_utf8(&publish.topic) {
                            Ok(topic) => on_publish(topic, &publish.payload),
                            Err(e) => log::warn!("Skipping publish with invalid topic: {}", e),
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        if thread_stopping.load(Ordering::SeqCst) {
                            break;
                        }
                        log::warn!("MQTT connection error: {}. Reconnecting...", e);
                        std::thread::sleep(RECONNECT_DELAY);
                    }
                }
                if thread_stopping.load(Ordering::SeqCst) {
                    break;
                }
            }
            log::debug!("MQTT connection loop exited");
        });

        Self {
            client,
            stopping,
            handle: Some(handle),
        }
    }

    /// Publish without waiting. A full request queue drops the message.
    pub fn publish_latest(&self, topic: &str, payload: Vec<u8>, retain: bool) -> bool {
        match self
            .client
            .try_publish(topic, QoS::AtMostOnce, retain, payload)
        {
            Ok(()) => true,
            Err(e) => {
                log::debug!("dropped publish to {}: {}", topic, e);
                false
            }
        }
    }

    /// Disconnect and join the connection thread.
    pub fn shutdown(mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        if let Err(e) = self.client.try_disconnect() {
            log::debug!("MQTT disconnect: {}", e);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
