use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::gateway::Session;
use crate::reply::Reply;
use crate::upstream::UpstreamError;

/// Say goodbye. The session closes the connection once the reply is written.
#[derive(Debug, PartialEq)]
pub struct Quit;

impl Executable for Quit {
    async fn exec(self, _session: &Session) -> Result<Reply, UpstreamError> {
        Ok(Reply::Bye)
    }
}

impl TryFrom<&mut CommandParser<'_>> for Quit {
    type Error = CommandParserError;

    fn try_from(_parser: &mut CommandParser<'_>) -> Result<Self, Self::Error> {
        Ok(Self)
    }
}
