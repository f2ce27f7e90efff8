//! Media reference rewriting for hotlink-protected hosts.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

/// Attribute that suppresses the Referer header on an element.
pub const REFERRER_POLICY_ATTR: &str = "referrerpolicy";

/// Value of [`REFERRER_POLICY_ATTR`] applied to every media element.
pub const NO_REFERRER: &str = "no-referrer";

/// Pass-through media proxy settings.
///
/// Images hosted on a protected host are rewritten to `prefix + encoded URL`
/// when a prefix is configured. Independently of that, every image the
/// pipeline emits carries `referrerpolicy="no-referrer"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaProxy {
    /// Proxy prefix, e.g. `https://images.example.net/?url=`.
    pub prefix: Option<String>,
    /// Hosts that enforce referer checks. A host also matches its subdomains.
    pub protected_hosts: Vec<String>,
}

impl MediaProxy {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: Some(prefix.into()), protected_hosts: Vec::new() }
    }

    /// Adds protected hosts, builder style.
    pub fn protect<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected_hosts.extend(hosts.into_iter().map(Into::into));
        self
    }

    /// Returns true when `url` points at a protected host.
    pub fn is_protected(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.protected_hosts.iter().any(|protected| {
            let protected = protected.trim().trim_start_matches('.').to_ascii_lowercase();
            !protected.is_empty() && (host == protected || host.ends_with(&format!(".{protected}")))
        })
    }

    /// Trims, resolves and, when applicable, proxies a media URL.
    ///
    /// Trimming happens first: stray whitespace makes the URL unparsable for
    /// the proxy. Values that cannot be resolved are returned trimmed.
    pub fn rewrite(&self, src: &str, base: Option<&Url>) -> String {
        let trimmed = src.trim();
        if trimmed.is_empty() {
            return String::new();
        }

        let resolved = match base {
            Some(base) => base.join(trimmed),
            None => Url::parse(trimmed),
        };
        let url = match resolved {
            Ok(url) => url,
            Err(_) => return trimmed.to_string(),
        };

        if !matches!(url.scheme(), "http" | "https") {
            return url.to_string();
        }

        match &self.prefix {
            Some(prefix) if self.is_protected(&url) && !url.as_str().starts_with(prefix.as_str()) => {
                format!("{}{}", prefix, utf8_percent_encode(url.as_str(), NON_ALPHANUMERIC))
            }
            _ => url.to_string(),
        }
    }
}
