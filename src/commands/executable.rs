use std::future::Future;

use crate::gateway::Session;
use crate::reply::Reply;
use crate::upstream::UpstreamError;

pub trait Executable {
    fn exec(self, session: &Session) -> impl Future<Output = Result<Reply, UpstreamError>> + Send;
}
