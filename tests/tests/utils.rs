use std::net::TcpListener;
use std::time::Duration;
use volley::RunConfig;

/// A local URL nothing is listening on.
#[allow(unused)]
pub fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/api/accounts")
}

#[allow(unused)]
pub fn short_config(url: &str, label: &str) -> RunConfig {
    RunConfig::builder(url)
        .duration(Duration::from_secs(1))
        .connections(4)
        .label(label)
        .build()
        .unwrap()
}
