pub mod http;
pub mod local;
pub mod source;

pub use http::HttpSource;
pub use source::LeaderboardSource;
