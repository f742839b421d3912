//! Outbound IRC protocol lines
//!
//! Only the commands the bridge itself sends are modelled here. Rendering a
//! [`Command`] produces the line body without its terminator; the caller
//! appends the trailing newline when it hands the line to the sender.
//! Line breaks and NUL inside arguments are rendered as spaces, so one
//! command always renders as one line.

use std::fmt;

/// Password sent in the registration `PASS` line when none is configured
pub const DEFAULT_PASSWORD: &str = "none";

/// IRC commands issued by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// `PASS <password>`
    Pass(&'a str),
    /// `NICK <nick>`
    Nick(&'a str),
    /// `USER <name> <name> <name> :<name>`
    ///
    /// Username, hostname, servername and realname are all set to the bot's name.
    User(&'a str),
    /// `JOIN <channel>`
    Join(&'a str),
    /// `PART <channel>`
    Part(&'a str),
    /// `QUIT`
    Quit,
    /// `PRIVMSG <channel> :<<author>> <text>`
    PrivMsg {
        target: &'a str,
        author: &'a str,
        text: &'a str,
    },
}

impl Command<'_> {
    /// The command verb as it appears on the wire
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Pass(_) => "PASS",
            Command::Nick(_) => "NICK",
            Command::User(_) => "USER",
            Command::Join(_) => "JOIN",
            Command::Part(_) => "PART",
            Command::Quit => "QUIT",
            Command::PrivMsg { .. } => "PRIVMSG",
        }
    }
}

/// Characters that would end or corrupt a protocol line
const LINE_BREAKS: [char; 3] = ['\r', '\n', '\0'];

/// An argument rendered with every line break replaced by a space
struct Arg<'a>(&'a str);

impl fmt::Display for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pieces = self.0.split(LINE_BREAKS);
        if let Some(first) = pieces.next() {
            f.write_str(first)?;
        }
        for piece in pieces {
            f.write_str(" ")?;
            f.write_str(piece)?;
        }
        Ok(())
    }
}

impl fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Command::Pass(password) => write!(f, "PASS {}", Arg(password)),
            Command::Nick(nick) => write!(f, "NICK {}", Arg(nick)),
            Command::User(name) => write!(f, "USER {0} {0} {0} :{0}", Arg(name)),
            Command::Join(channel) => write!(f, "JOIN {}", Arg(channel)),
            Command::Part(channel) => write!(f, "PART {}", Arg(channel)),
            Command::Quit => f.write_str("QUIT"),
            Command::PrivMsg { target, author, text } => write!(
                f,
                "PRIVMSG {} :<{}> {}",
                Arg(target),
                Arg(author),
                Arg(text)
            ),
        }
    }
}
