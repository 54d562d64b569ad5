pub mod executable;
pub mod list;
pub mod quit;
pub mod search;

use std::collections::HashMap;
use thiserror::Error as ThisError;

use crate::commands::executable::Executable;
use crate::gateway::Session;
use crate::protocol::{parse_params, Response};
use crate::ranking::rank;
use crate::reply::Reply;
use crate::upstream::UpstreamError;

use list::List;
use quit::Quit;
use search::Search;

#[derive(Debug, PartialEq)]
pub enum Command {
    List(List),
    Search(Search),
    Quit(Quit),
}

impl Executable for Command {
    async fn exec(self, session: &Session) -> Result<Reply, UpstreamError> {
        match self {
            Command::List(cmd) => cmd.exec(session).await,
            Command::Search(cmd) => cmd.exec(session).await,
            Command::Quit(cmd) => cmd.exec(session).await,
        }
    }
}

impl TryFrom<&str> for Command {
    type Error = CommandParserError;

    fn try_from(line: &str) -> Result<Self, Self::Error> {
        let parser = &mut CommandParser::new(line);

        let command_name = parser.parse_command_name()?;

        match &command_name[..] {
            "list" => List::try_from(parser).map(Command::List),
            "search" => Search::try_from(parser).map(Command::Search),
            "quit" => Quit::try_from(parser).map(Command::Quit),
            _ => Err(CommandParserError::UnknownCommand {
                command: command_name,
            }),
        }
    }
}

/// Turns a store payload, fresh or cached, into the client reply. Listings are ranked on every
/// read.
fn reply_from(payload: Response) -> Reply {
    match payload {
        Response::Listings(listings) => Reply::Results(rank(listings)),
        Response::Error { error } => Reply::Error(error),
    }
}

struct CommandParser<'a> {
    name: Option<&'a str>,
    params: HashMap<&'a str, &'a str>,
}

impl<'a> CommandParser<'a> {
    fn new(line: &'a str) -> CommandParser<'a> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next();

        CommandParser {
            name,
            params: parse_params(tokens),
        }
    }

    fn parse_command_name(&mut self) -> Result<String, CommandParserError> {
        self.name
            .map(|name| name.to_lowercase())
            .ok_or_else(|| CommandParserError::UnknownCommand {
                command: String::new(),
            })
    }

    fn param(&self, key: &str) -> Option<&'a str> {
        self.params.get(key).copied()
    }

    fn integer_param(&self, key: &'static str) -> Result<i64, CommandParserError> {
        self.param(key)
            .and_then(|value| value.parse::<i64>().ok())
            .ok_or(CommandParserError::InvalidInteger { param: key })
    }
}

/// Problems with a client command line. The display text is sent back to the client.
#[derive(Debug, ThisError, PartialEq)]
pub enum CommandParserError {
    #[error("unknown command")]
    UnknownCommand { command: String },
    #[error("{param} must be an int")]
    InvalidInteger { param: &'static str },
}
