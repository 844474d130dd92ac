mod config;

mod errors;

mod init;

mod logging;

mod judge {
    pub(crate) mod client;
    pub(crate) mod http;
}

mod message {
    pub(crate) mod request;
    pub(crate) mod response;
}

mod expectation {
    pub(crate) mod failure;
    pub(crate) mod matcher;
    pub(crate) mod rule;
}

mod orchestrator;

mod plan;

mod poller;

mod rejudge;

mod report;

#[cfg(test)]
mod testing;

mod verdict;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    init::main().await
}
