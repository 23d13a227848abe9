//! libcurl-backed [`HttpClient`].

use super::HttpClient;
use crate::config::HttpConfig;
use crate::error::FetchError;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Duration;

/// Reusable blocking HTTP client.
///
/// Holds one curl easy handle so keep-alive connections and the DNS cache
/// survive between downloads. Safe to share across threads; transfers are
/// serialized on the handle.
pub struct CurlClient {
    easy: Mutex<curl::easy::Easy>,
}

impl CurlClient {
    /// Build a client from `cfg`. TLS peer and host verification are always on.
    pub fn new(cfg: &HttpConfig) -> Result<Self, curl::Error> {
        let mut easy = curl::easy::Easy::new();
        easy.ssl_verify_peer(true)?;
        easy.ssl_verify_host(true)?;
        easy.follow_location(cfg.follow_redirects)?;
        easy.max_redirections(cfg.max_redirections)?;
        if let Some(secs) = cfg.connect_timeout_secs {
            easy.connect_timeout(Duration::from_secs(secs))?;
        }
        if let Some(secs) = cfg.timeout_secs {
            easy.timeout(Duration::from_secs(secs))?;
        }
        if let Some(ua) = cfg.user_agent.as_deref() {
            easy.useragent(ua)?;
        }
        Ok(Self {
            easy: Mutex::new(easy),
        })
    }
}

impl HttpClient for CurlClient {
    fn get(&self, url: &str, body: &mut dyn Write) -> Result<u32, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let mut easy = self.easy.lock().unwrap_or_else(|e| e.into_inner());
        easy.get(true).map_err(transport)?;
        easy.url(url).map_err(transport)?;

        let mut write_err: Option<io::Error> = None;
        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| match body.write_all(data) {
                    Ok(()) => Ok(data.len()),
                    Err(e) => {
                        tracing::warn!("download write failed: {}", e);
                        write_err = Some(e);
                        Ok(0) // abort transfer
                    }
                })
                .map_err(transport)?;
            transfer.perform()
        };

        // A failed sink write surfaces from curl as a write error; report the disk
        // error instead. `download` replaces the path with the part file.
        if let Some(e) = write_err {
            return Err(FetchError::Io {
                path: url.into(),
                source: e,
            });
        }
        performed.map_err(transport)?;

        easy.response_code().map_err(transport)
    }
}
