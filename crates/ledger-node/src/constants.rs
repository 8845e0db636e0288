/// Default ceiling on a single `/mine` proof search, in seconds. 0 disables it.
pub(crate) const DEFAULT_MINE_TIMEOUT_SECS: u64 = 300;
pub(crate) const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
