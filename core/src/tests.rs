//! Tests for the core line formatting and error classification

#[cfg(test)]
mod tests {
    use crate::{send_fmt, Command, Error, SendReport, LINE_CAPACITY};

    async fn wire(command: Command<'_>) -> Vec<u8> {
        let mut out = Vec::new();
        let send = send_fmt(Some(&mut out), LINE_CAPACITY, format_args!("{}\n", command));
        send.await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_wire_lines() {
        assert_eq!(wire(Command::Pass("none")).await, b"PASS none\n");
        assert_eq!(wire(Command::Nick("toxirc")).await, b"NICK toxirc\n");
        assert_eq!(
            wire(Command::User("toxirc")).await,
            b"USER toxirc toxirc toxirc :toxirc\n"
        );
        assert_eq!(wire(Command::Join("#toxirc")).await, b"JOIN #toxirc\n");
        assert_eq!(wire(Command::Part("#toxirc")).await, b"PART #toxirc\n");
        assert_eq!(wire(Command::Quit).await, b"QUIT\n");
        assert_eq!(
            wire(Command::PrivMsg {
                target: "#toxirc",
                author: "alice",
                text: "hi",
            })
            .await,
            b"PRIVMSG #toxirc :<alice> hi\n"
        );
    }

    #[tokio::test]
    async fn test_small_capacity_keeps_framing() {
        let mut out = Vec::new();
        let send = send_fmt(Some(&mut out), 10, format_args!("{}\n", Command::Join("#a-long-channel")));
        let report = send.await.unwrap();

        assert_eq!(report, SendReport::Truncated { sent: 10, rendered: 21 });
        assert_eq!(out, b"JOIN #a-l\n");
    }

    #[test]
    fn test_connection_loss_classification() {
        assert!(Error::SendFailed("closed".to_string()).is_connection_loss());
        assert!(Error::ConnectFailed {
            server: "irc.example.org".to_string(),
            port: "6667".to_string(),
            reason: "refused".to_string(),
        }
        .is_connection_loss());
        assert!(Error::from(std::io::Error::from(std::io::ErrorKind::ConnectionReset)).is_connection_loss());
        assert!(!Error::Channel("bad".to_string()).is_connection_loss());
        assert!(!Error::Config("port is empty".to_string()).is_connection_loss());
        assert!(!Error::Truncated { rendered: 600, capacity: 512 }.is_connection_loss());
    }
}
