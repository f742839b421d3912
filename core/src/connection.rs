//! Connection management
//!
//! [`ConnectionManager`] owns the socket to the IRC server. It resolves the
//! server, connects to the first candidate address that accepts, registers
//! the bot's identity and tears the connection down again. The socket is
//! split into halves: the write half stays here, the read half can be handed
//! to the loop that watches for a dead connection.

use crate::message::{Command, DEFAULT_PASSWORD};
use crate::registry::ChannelRegistry;
use crate::resolve::resolve;
use crate::sender::{send_fmt, SendReport};
use crate::{Error, Result, Settings};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Inbound lines from the server
pub type LineReader = Lines<BufReader<OwnedReadHalf>>;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket open
    Disconnected,
    /// Socket open and registration lines sent
    Connected,
}

/// Connection statistics
#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    /// Time the current connection was established
    pub connected_at: Option<DateTime<Utc>>,
    /// Time the last connection was closed
    pub disconnected_at: Option<DateTime<Utc>>,
    /// Address of the current connection
    pub remote_addr: Option<SocketAddr>,
    /// Lines sent over the lifetime of the manager
    pub lines_sent: u64,
    /// Bytes sent over the lifetime of the manager
    pub bytes_sent: u64,
    /// Lines that had to be truncated to fit the line buffer
    pub lines_truncated: u64,
    /// Successful reconnects
    pub reconnects: u64,
}

/// Owner of the connection to one IRC server
#[derive(Debug)]
pub struct ConnectionManager {
    /// Server hostname
    server: String,
    /// Port or service name
    port: String,
    /// Nick, username and realname
    name: String,
    /// Password sent with PASS
    password: Option<String>,
    /// Outbound line buffer capacity
    line_capacity: usize,
    /// Write half of the socket, present while connected
    writer: Option<OwnedWriteHalf>,
    /// Read half of the socket, until taken by the caller
    reader: Option<OwnedReadHalf>,
    state: ConnectionState,
    stats: ConnectionStats,
}

impl ConnectionManager {
    /// Create a disconnected manager from settings
    pub fn new(settings: &Settings) -> Self {
        Self {
            server: settings.irc.server.clone(),
            port: settings.irc.port.clone(),
            name: settings.bot.name.clone(),
            password: settings.irc.password.clone(),
            line_capacity: settings.irc.line_capacity,
            writer: None,
            reader: None,
            state: ConnectionState::Disconnected,
            stats: ConnectionStats::default(),
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Take the inbound half of the current connection.
    ///
    /// Returns `None` when disconnected or when it was already taken for this
    /// connection. Reading EOF or an error from it means the caller should
    /// [`reconnect`](Self::reconnect).
    pub fn take_reader(&mut self) -> Option<LineReader> {
        self.reader.take().map(|r| BufReader::new(r).lines())
    }

    /// Resolve the server, connect and register.
    ///
    /// Candidate addresses are tried in resolver order. If registration
    /// fails the new socket is dropped and the manager stays disconnected.
    pub async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            debug!("Already connected to {}", self.server);
            return Ok(());
        }

        info!("Connecting to {}:{}", self.server, self.port);

        let addrs = resolve(&self.server, &self.port).await.map_err(|e| {
            warn!("Error getting address information for {}: {}", self.server, e);
            e
        })?;

        let (stream, remote_addr) = self.connect_any(&addrs).await?;
        let (reader, mut writer) = stream.into_split();

        let registered = self.register(&mut writer).await;
        if let Err(e) = registered {
            warn!("Registration with {} failed: {}", self.server, e);
            return Err(e);
        }

        self.writer = Some(writer);
        self.reader = Some(reader);
        self.state = ConnectionState::Connected;
        self.stats.connected_at = Some(Utc::now());
        self.stats.remote_addr = Some(remote_addr);

        info!("Connected to {} ({})", self.server, remote_addr);
        Ok(())
    }

    async fn connect_any(&self, addrs: &[SocketAddr]) -> Result<(TcpStream, SocketAddr)> {
        let mut last_error = None;

        for addr in addrs {
            match TcpStream::connect(*addr).await {
                Ok(stream) => return Ok((stream, *addr)),
                Err(e) => {
                    debug!("Connection to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no candidate addresses".to_string());
        warn!("Could not connect to {}:{}: {}", self.server, self.port, reason);

        Err(Error::ConnectFailed {
            server: self.server.clone(),
            port: self.port.clone(),
            reason,
        })
    }

    async fn register(&mut self, writer: &mut OwnedWriteHalf) -> Result<()> {
        let password = self.password.as_deref().unwrap_or(DEFAULT_PASSWORD);
        let lines = [
            Command::Pass(password),
            Command::Nick(&self.name),
            Command::User(&self.name),
        ];

        for command in lines {
            let report = write_command(Some(&mut *writer), self.line_capacity, command).await?;
            Self::record(&mut self.stats, report);
        }

        Ok(())
    }

    /// Send one protocol line on the current connection
    pub async fn send_command(&mut self, command: Command<'_>) -> Result<SendReport> {
        let report = write_command(self.writer.as_mut(), self.line_capacity, command).await?;
        Self::record(&mut self.stats, report);
        Ok(report)
    }

    fn record(stats: &mut ConnectionStats, report: SendReport) {
        stats.lines_sent += 1;
        stats.bytes_sent += report.bytes_sent() as u64;
        if report.is_truncated() {
            stats.lines_truncated += 1;
        }
    }

    /// Send QUIT, close the socket and clear `in_channel` on every entry.
    ///
    /// Entries stay registered so a later reconnect can rejoin them. Does
    /// nothing beyond clearing the flags when already disconnected.
    pub async fn disconnect(&mut self, registry: &mut ChannelRegistry) {
        if self.is_connected() {
            if let Err(e) = self.send_command(Command::Quit).await {
                debug!("Could not send QUIT to {}: {}", self.server, e);
            }

            if let Some(mut writer) = self.writer.take() {
                if let Err(e) = writer.shutdown().await {
                    debug!("Error shutting down connection to {}: {}", self.server, e);
                }
            }

            self.reader = None;
            self.state = ConnectionState::Disconnected;
            self.stats.connected_at = None;
            self.stats.remote_addr = None;
            self.stats.disconnected_at = Some(Utc::now());

            info!("Disconnected from server: {}", self.server);
        }

        registry.mark_all_parted();
    }

    /// Send JOIN for the existing entry at `index` and mark it joined
    pub async fn rejoin(&mut self, registry: &mut ChannelRegistry, index: usize) -> Result<()> {
        let name = match registry.get(index) {
            Some(entry) => entry.name.clone(),
            None => {
                return Err(Error::Channel(format!("No channel at index {}", index)));
            }
        };

        self.send_command(Command::Join(&name)).await?;
        registry.set_in_channel(index, true);
        debug!("Rejoined channel: {}", name);
        Ok(())
    }

    /// Rejoin every registered channel in order.
    ///
    /// A failed JOIN tears the connection down, so the caller sees the
    /// manager disconnected and every entry with `in_channel == false`.
    pub async fn rejoin_all(&mut self, registry: &mut ChannelRegistry) -> Result<()> {
        for index in 0..registry.len() {
            if let Err(e) = self.rejoin(registry, index).await {
                warn!("Rejoin failed on {}, dropping connection: {}", self.server, e);
                self.disconnect(registry).await;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Disconnect, connect again and rejoin every registered channel in order.
    ///
    /// On a connect or rejoin failure the manager is left disconnected and
    /// every entry keeps `in_channel == false`.
    pub async fn reconnect(&mut self, registry: &mut ChannelRegistry) -> Result<()> {
        self.disconnect(registry).await;
        self.connect().await?;
        self.rejoin_all(registry).await?;

        self.stats.reconnects += 1;
        info!(
            "Reconnected to {} and rejoined {} channel(s)",
            self.server,
            registry.len()
        );
        Ok(())
    }

    /// Drop the socket without sending QUIT
    pub(crate) fn abandon(&mut self) {
        if self.writer.take().is_some() {
            warn!("Connection to {} dropped without QUIT", self.server);
        }
        self.reader = None;
        self.state = ConnectionState::Disconnected;
    }
}

/// Read the next inbound line; `Ok(None)` once the server has closed the connection
pub async fn read_line(reader: &mut LineReader) -> Result<Option<String>> {
    Ok(reader.next_line().await?)
}

/// Write `command` as a newline terminated line
async fn write_command(
    writer: Option<&mut OwnedWriteHalf>,
    capacity: usize,
    command: Command<'_>,
) -> Result<SendReport> {
    let send = send_fmt(writer, capacity, format_args!("{}\n", command));
    send.await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    fn settings(server: &str, port: &str) -> Settings {
        let mut settings = Settings::default();
        settings.irc.server = server.to_string();
        settings.irc.port = port.to_string();
        settings
    }

    #[tokio::test]
    async fn test_new_manager_is_disconnected() {
        let mut manager = ConnectionManager::new(&settings("127.0.0.1", "6667"));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.take_reader().is_none());
        assert!(matches!(
            manager.send_command(Command::Quit).await,
            Err(Error::SendFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_refused_reports_connect_failed() {
        // Bind then drop a listener so the port is known to be closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut manager = ConnectionManager::new(&settings("127.0.0.1", &port.to_string()));
        let result = manager.connect().await;

        assert!(matches!(result, Err(Error::ConnectFailed { .. })));
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_when_disconnected_clears_flags() {
        let mut manager = ConnectionManager::new(&settings("127.0.0.1", "6667"));
        let mut registry = ChannelRegistry::new();
        registry.insert("#toxirc", 0).unwrap();
        registry.set_in_channel(0, true);

        manager.disconnect(&mut registry).await;

        assert!(!registry.is_joined("#toxirc"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_rejoin_drops_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port().to_string();
        let mut manager = ConnectionManager::new(&settings("127.0.0.1", &port));
        manager.connect().await.unwrap();
        let mut reader = manager.take_reader().unwrap();

        // Reset the connection and wait until the client has seen it
        let (stream, _) = listener.accept().await.unwrap();
        #[allow(deprecated)]
        stream.set_linger(Some(Duration::ZERO)).unwrap();
        drop(stream);
        let closed = timeout(Duration::from_secs(5), read_line(&mut reader))
            .await
            .unwrap();
        assert!(matches!(closed, Ok(None) | Err(Error::Io(_))));

        let mut registry = ChannelRegistry::new();
        registry.insert("#a", 0).unwrap();
        registry.insert("#b", 1).unwrap();
        registry.set_in_channel(1, true);

        let result = manager.rejoin_all(&mut registry).await;

        assert!(matches!(result, Err(Error::SendFailed(_))));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.stats().disconnected_at.is_some());
        assert!(!registry.is_joined("#a"));
        assert!(!registry.is_joined("#b"));
        assert_eq!(registry.names(), vec!["#a", "#b"]);
    }
}
