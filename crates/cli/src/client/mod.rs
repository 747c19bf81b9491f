//! MCP client connection handling for stdio and HTTP targets.

use crate::error::Error;
use omcp::transport::{ChildConnection, ChildProcess};

mod inspect;
mod remote;

pub use remote::HttpClient;
pub use inspect::Inspect;

/// Parsed target for connecting to an MCP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Remote server at the given URL.
    Remote { url: String, auth: Option<String> },
    /// Stdio server launched by a command.
    Stdio { program: String, args: Vec<String> },
}

impl Target {
    /// Parse CLI target arguments into a [`Target`].
    ///
    /// If the first element starts with `http://` or `https://`, treat it as
    /// a remote URL. Otherwise treat the entire vec as a stdio command.
    pub fn parse(target: Vec<String>, auth: Option<String>) -> Result<Self, Error> {
        let mut parts = target.into_iter();
        let first = parts.next().ok_or(Error::MissingTarget)?;
        if first.starts_with("http://") || first.starts_with("https://") {
            Ok(Target::Remote { url: first, auth })
        } else {
            Ok(Target::Stdio {
                program: first,
                args: parts.collect(),
            })
        }
    }
}

/// An initialized session with an MCP server.
pub enum Connection {
    Http(HttpClient),
    Stdio(ChildConnection),
}

/// Connect to an MCP server and complete the `initialize` handshake.
///
/// Returns the connection together with the server's initialize result.
pub async fn connect(target: Target) -> Result<(Connection, serde_json::Value), Error> {
    let mut connection = match target {
        Target::Remote { url, auth } => Connection::Http(HttpClient::new(url, auth)),
        Target::Stdio { program, args } => {
            Connection::Stdio(ChildProcess::new(program).args(args).spawn()?)
        }
    };
    let info = connection.initialize().await?;
    Ok((connection, info))
}
