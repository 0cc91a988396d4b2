use crate::url::normalize::{normalize_parsed, normalize_site_root};
use crate::{UrlError, UrlResult};
use url::Url;

/// An in-scope URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedUrl {
    /// Canonical form, used for deduplication and as the stored path
    pub key: Url,
    /// Address to request
    pub target: Url,
}

/// The URL space that belongs to one configured site
///
/// A URL is in scope when it has the root's host (ignoring a `www.` prefix and
/// case), the same explicit port, and a path at or below the root path.
/// In-scope URLs are canonicalized onto the root's scheme and host, so
/// `http://www.example.com/a` and `https://example.com/a` share one key.
#[derive(Debug, Clone)]
pub struct SiteScope {
    root: Url,
    bare_host: String,
    port: Option<u16>,
}

impl SiteScope {
    /// Builds the scope of a configured site root
    pub fn new(root_url: &str) -> UrlResult<Self> {
        let root = normalize_site_root(root_url)?;
        let bare_host = root
            .host_str()
            .map(strip_www)
            .ok_or(UrlError::MissingDomain)?;
        let port = root.port();

        Ok(Self {
            root,
            bare_host,
            port,
        })
    }

    /// The normalized root, always ending with `/`
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Resolves `href` against `base` and admits it if it stays on the site
    pub fn resolve(&self, base: &Url, href: &str) -> Option<ScopedUrl> {
        let joined = base.join(href).ok()?;
        self.admit(joined)
    }

    /// Pairs an in-scope URL with its canonical key
    ///
    /// The target keeps the path as linked (trailing slash included), so the
    /// request and the base for its relative links stay what the page author
    /// meant. Only the fragment is removed.
    pub fn admit(&self, url: Url) -> Option<ScopedUrl> {
        let mut target = url.clone();
        target.set_fragment(None);
        let key = self.canonicalize(url)?;
        Some(ScopedUrl { key, target })
    }

    /// Normalizes `url` and folds it onto the root's scheme and host
    ///
    /// Returns `None` for URLs outside the site.
    pub fn canonicalize(&self, url: Url) -> Option<Url> {
        let mut url = normalize_parsed(url).ok()?;

        let host = url.host_str().map(strip_www)?;
        if host != self.bare_host || url.port() != self.port {
            return None;
        }
        if !self.contains_path(url.path()) {
            return None;
        }

        if url.scheme() != self.root.scheme() {
            url.set_scheme(self.root.scheme()).ok()?;
        }
        url.set_host(self.root.host_str()).ok()?;
        url.set_port(self.root.port()).ok()?;
        Some(url)
    }

    /// Path of `url` relative to the site origin, query included
    ///
    /// ```
    /// use site_indexer::url::SiteScope;
    /// use url::Url;
    ///
    /// let scope = SiteScope::new("https://example.com").unwrap();
    /// let url = Url::parse("https://example.com/news?page=2").unwrap();
    /// assert_eq!(scope.relative_path(&url), "/news?page=2");
    /// ```
    pub fn relative_path(&self, url: &Url) -> String {
        match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        }
    }

    fn contains_path(&self, path: &str) -> bool {
        let root_path = self.root.path();
        if root_path == "/" {
            return true;
        }
        // root_path always ends with '/', normalized paths never do
        path.starts_with(root_path) || path == &root_path[..root_path.len() - 1]
    }
}

fn strip_www(host: &str) -> String {
    let host = host.to_lowercase();
    match host.strip_prefix("www.") {
        Some(bare) => bare.to_string(),
        None => host,
    }
}
