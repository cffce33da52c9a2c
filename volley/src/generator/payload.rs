/// Source of request bodies for one connection.
///
/// With a pipelining factor of 1 every request gets its own username. Pipelined batches are
/// queued ahead of any per-request hook, so a pipelining connection generates one suffix when
/// it starts and reuses that body for every request it sends. Runs with pipelining above 1
/// therefore exercise far fewer distinct usernames than requests.
#[derive(Clone, Debug)]
pub(crate) enum Payload {
    Unique,
    Batch(String),
}

impl Payload {
    pub fn for_pipelining(pipelining: usize) -> Self {
        if pipelining > 1 {
            Payload::Batch(body(&format!("batch_user_{}", random_suffix())))
        } else {
            Payload::Unique
        }
    }

    pub fn next_body(&self) -> String {
        match self {
            Payload::Unique => body(&format!("user_{}", random_suffix())),
            Payload::Batch(body) => body.clone(),
        }
    }
}

fn random_suffix() -> String {
    format!("{:016x}", rand::random::<u64>())
}

fn body(username: &str) -> String {
    serde_json::json!({ "username": username }).to_string()
}
