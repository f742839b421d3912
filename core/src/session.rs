//! Session facade
//!
//! A [`Session`] is the only thing the rest of the bridge talks to. It owns
//! the [`ConnectionManager`] and the [`ChannelRegistry`] and keeps them in
//! step: joining records the membership before the JOIN goes out, leaving
//! removes it, and a reconnect replays every recorded membership.
//!
//! All operations take `&mut self`, so a reconnect can never interleave with
//! a send or a registry change. Callers wanting to share a session between
//! tasks wrap it in a mutex.

use crate::connection::{ConnectionManager, ConnectionState, ConnectionStats, LineReader};
use crate::message::Command;
use crate::registry::{ChannelMembership, ChannelRegistry};
use crate::sender::SendReport;
use crate::{Error, Result, Settings};
use tracing::{debug, info, warn};

/// A connection to one IRC server together with its channel memberships
#[derive(Debug)]
pub struct Session {
    connection: ConnectionManager,
    channels: ChannelRegistry,
}

impl Session {
    /// Create a disconnected session from settings
    pub fn new(settings: &Settings) -> Self {
        let channels = match settings.irc.max_channels {
            Some(max) => ChannelRegistry::with_limit(max),
            None => ChannelRegistry::new(),
        };

        Self {
            connection: ConnectionManager::new(settings),
            channels,
        }
    }

    /// Create a session and connect it
    pub async fn open(settings: &Settings) -> Result<Self> {
        let mut session = Self::new(settings);
        session.connection.connect().await?;
        Ok(session)
    }

    /// Connect if not already connected
    pub async fn connect(&mut self) -> Result<()> {
        self.connection.connect().await
    }

    /// Register `name` under `group_num` and send JOIN.
    ///
    /// The membership is recorded before the JOIN is sent. If the send fails
    /// the entry stays registered with `in_channel == false` and is joined by
    /// the next [`reconnect`](Self::reconnect).
    pub async fn join_channel(&mut self, name: &str, group_num: u32) -> Result<()> {
        let index = self.channels.insert(name, group_num)?;

        if !self.connection.is_connected() {
            warn!("Not connected, deferring join of {}", name);
            return Err(Error::SendFailed("not connected".to_string()));
        }

        self.connection.send_command(Command::Join(name)).await?;
        self.channels.set_in_channel(index, true);
        info!("Joining channel: {}", name);
        Ok(())
    }

    /// Leave the channel at `index`.
    ///
    /// PART is sent only if the channel is currently joined. The entry is
    /// removed even when PART cannot be sent, so it is not rejoined on the
    /// next reconnect; the send error is still returned.
    pub async fn leave_channel(&mut self, index: usize) -> Result<()> {
        let entry = self
            .channels
            .remove(index)
            .ok_or_else(|| Error::Channel(format!("No channel at index {}", index)))?;

        info!("Leaving channel: {}", entry.name);

        if entry.in_channel {
            self.connection.send_command(Command::Part(&entry.name)).await?;
        }

        Ok(())
    }

    /// Leave the channel named `name`
    pub async fn leave_channel_by_name(&mut self, name: &str) -> Result<()> {
        let index = self
            .channels
            .index_of(name)
            .ok_or_else(|| Error::Channel(format!("Not in channel {}", name)))?;
        self.leave_channel(index).await
    }

    /// Leave every currently joined channel
    pub async fn leave_all_channels(&mut self) -> Result<()> {
        while let Some(index) = self.channels.first_joined() {
            self.leave_channel(index).await?;
        }
        Ok(())
    }

    /// Relay a message from `author` into `channel`
    pub async fn send_message(&mut self, channel: &str, author: &str, text: &str) -> Result<SendReport> {
        let report = self
            .connection
            .send_command(Command::PrivMsg {
                target: channel,
                author,
                text,
            })
            .await?;

        if report.is_truncated() {
            debug!("Message from {} to {} was truncated", author, channel);
        }

        Ok(report)
    }

    /// Disconnect and reconnect, rejoining every registered channel
    pub async fn reconnect(&mut self) -> Result<()> {
        self.connection.reconnect(&mut self.channels).await
    }

    /// Send QUIT and close the connection, keeping channel memberships
    pub async fn disconnect(&mut self) {
        self.connection.disconnect(&mut self.channels).await;
    }

    /// Disconnect if connected and release the registry
    pub async fn close(mut self) {
        self.connection.disconnect(&mut self.channels).await;
        self.channels.clear();
        debug!("Session with {} closed", self.connection.server());
    }

    /// Inbound half of the current connection, see [`ConnectionManager::take_reader`]
    pub fn take_reader(&mut self) -> Option<LineReader> {
        self.connection.take_reader()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn stats(&self) -> &ConnectionStats {
        self.connection.stats()
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&ChannelMembership> {
        self.channels.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.channels.index_of(name)
    }

    pub fn group_of(&self, name: &str) -> Option<u32> {
        self.channels.group_of(name)
    }

    pub fn name_of(&self, group_num: u32) -> Option<&str> {
        self.channels.name_of(group_num)
    }

    pub fn is_joined(&self, name: &str) -> bool {
        self.channels.is_joined(name)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // QUIT needs an async write; `close` is the orderly path
        self.connection.abandon();
    }
}
