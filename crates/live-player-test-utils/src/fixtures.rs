//! Pre-configured stream inputs.

use uuid::Uuid;

/// A stream input as the embedding page would supply it.
#[derive(Debug, Clone)]
pub struct TestStream {
    pub url: String,
    pub is_live: bool,
}

impl TestStream {
    /// Live stream with a playlist URL unique to this test.
    #[must_use]
    pub fn live() -> Self {
        Self {
            url: format!("https://cdn.example.com/live/{}/index.m3u8", Uuid::new_v4()),
            is_live: true,
        }
    }

    /// Live stream whose URL carries a signed query string.
    #[must_use]
    pub fn signed() -> Self {
        let mut stream = Self::live();
        stream.url.push_str("?token=abc123&expires=1700000000");
        stream
    }

    /// A URL that is not a playlist.
    #[must_use]
    pub fn malformed() -> Self {
        Self {
            url: "rtmp://ingest.example.com/app/stream-key".to_string(),
            is_live: true,
        }
    }

    /// Same URL, broadcast ended.
    #[must_use]
    pub fn ended(mut self) -> Self {
        self.is_live = false;
        self
    }

    /// Input tuple for `PlayerControllerHandle::set_source`.
    #[must_use]
    pub fn input(&self) -> (Option<String>, bool) {
        (Some(self.url.clone()), self.is_live)
    }
}
