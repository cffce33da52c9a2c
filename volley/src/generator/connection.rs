use super::outcome_atomics::OutcomeAtomics;
use super::payload::Payload;
use futures_util::future::join_all;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::error::Error as _;
use std::io::ErrorKind;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, trace};
use volley_core::Outcome;

/// One connection slot of a generator.
///
/// The slot owns its own HTTP client so its keep-alive connections are never shared with
/// other slots. With a pipelining factor above 1 the slot queues a whole batch before
/// awaiting any response.
pub(crate) struct Connection {
    id: usize,
    client: Client,
    url: Url,
    pipelining: usize,
    payload: Payload,
    atomics: OutcomeAtomics,
}

impl Connection {
    pub fn new(
        id: usize,
        client: Client,
        url: Url,
        pipelining: usize,
        atomics: OutcomeAtomics,
    ) -> Self {
        Self {
            id,
            client,
            url,
            pipelining,
            payload: Payload::for_pipelining(pipelining),
            atomics,
        }
    }

    /// Issue requests until the task is aborted.
    pub async fn run(self) {
        trace!("Connection {} started", self.id);
        loop {
            if self.pipelining == 1 {
                self.request().await;
            } else {
                join_all((0..self.pipelining).map(|_| self.request())).await;
            }
        }
    }

    async fn request(&self) {
        let body = self.payload.next_body();

        self.atomics.record_sent();
        let start = Instant::now();
        let res = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await;

        let response = match res {
            Ok(response) => response,
            Err(err) => {
                trace!("Connection {} request failed: {err}", self.id);
                self.atomics.record_failure(classify(&err));
                return;
            }
        };

        let outcome = Outcome::from_status(response.status().as_u16());
        match response.bytes().await {
            Ok(bytes) => {
                self.atomics
                    .record_response(outcome, start.elapsed(), bytes.len() as u64);
            }
            Err(err) => {
                trace!("Connection {} failed reading body: {err}", self.id);
                self.atomics.record_failure(classify(&err));
            }
        }
    }
}

/// Bucket a transport-level failure.
pub(crate) fn classify(err: &reqwest::Error) -> Outcome {
    if err.is_timeout() {
        Outcome::Timeout
    } else if is_reset(err) {
        Outcome::Reset
    } else {
        Outcome::Error
    }
}

fn is_reset(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
            ) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}
