use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

// Default timeout for control traffic; image fetches override it
// per-request with the session's own timeout.
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to build HTTP client")
});

pub fn get_http_client() -> &'static Client {
    &HTTP_CLIENT
}
