pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        private_key: String,
        key_id: String,
        issuer: String,
        access_token_ttl: i64,
        refresh_token_days: i64,
        max_sessions: i64,
        purge_interval: u64,
        frontend_url: String,
    },
}
