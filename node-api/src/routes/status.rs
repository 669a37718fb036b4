/// `GET /`
///
/// Plain-text liveness probe.
pub async fn server_status() -> &'static str {
    "Server Running Correctly!"
}
