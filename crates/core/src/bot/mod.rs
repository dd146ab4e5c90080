//! Telegram front end: update dispatch and the long-poll loop.

mod dispatcher;
mod poller;

pub use dispatcher::BotDispatcher;
pub use poller::{BotPoller, PollerConfig};
