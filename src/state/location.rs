//! The address-bar capability: where the shareable `data` parameter lives.

/// Query parameter carrying the encoded document.
pub const DATA_PARAM: &str = "data";

/// Read and replace the current link without adding history entries.
pub trait Location {
    /// The current `data` query parameter, if any.
    fn data_param(&self) -> Option<String>;

    /// Replace the current link's query with `?data=<encoded>`.
    fn replace_data(&mut self, encoded: &str);

    /// Scheme and host, e.g. `http://localhost:3000`.
    fn origin(&self) -> &str;

    /// Path component, always starting with `/`.
    fn path(&self) -> &str;
}

/// An in-process address bar parsed from an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressBar {
    origin: String,
    path: String,
    data: Option<String>,
    replacements: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not an absolute URL: {0:?}")]
pub struct InvalidUrl(pub String);

impl AddressBar {
    /// Parse an absolute `scheme://host[/path][?query][#fragment]` URL.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidUrl`] if `url` has no scheme or host.
    pub fn parse(url: &str) -> Result<Self, InvalidUrl> {
        let url = url.trim();
        let (scheme, rest) = url
            .split_once("://")
            .filter(|(scheme, _)| !scheme.is_empty())
            .ok_or_else(|| InvalidUrl(url.to_string()))?;
        let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
        let (authority_and_path, query) = rest.split_once('?').unwrap_or((rest, ""));
        let (host, path) = authority_and_path
            .find('/')
            .map_or((authority_and_path, "/"), |i| {
                authority_and_path.split_at(i)
            });
        if host.is_empty() {
            return Err(InvalidUrl(url.to_string()));
        }

        Ok(Self {
            origin: format!("{scheme}://{host}"),
            path: path.to_string(),
            data: query_data(query),
            replacements: 0,
        })
    }

    /// The full current link.
    pub fn href(&self) -> String {
        match &self.data {
            Some(data) => format!("{}{}?{DATA_PARAM}={data}", self.origin, self.path),
            None => format!("{}{}", self.origin, self.path),
        }
    }

    /// Number of `replace_data` writes so far.
    pub const fn replacements(&self) -> usize {
        self.replacements
    }
}

impl Default for AddressBar {
    fn default() -> Self {
        Self {
            origin: "http://localhost:3000".to_string(),
            path: "/".to_string(),
            data: None,
            replacements: 0,
        }
    }
}

impl Location for AddressBar {
    fn data_param(&self) -> Option<String> {
        self.data.clone()
    }

    fn replace_data(&mut self, encoded: &str) {
        self.data = Some(encoded.to_string());
        self.replacements += 1;
    }

    fn origin(&self) -> &str {
        &self.origin
    }

    fn path(&self) -> &str {
        &self.path
    }
}

fn query_data(query: &str) -> Option<String> {
    if query.is_empty() {
        return None;
    }
    let pairs: Vec<(String, String)> = match serde_urlencoded::from_str(query) {
        Ok(pairs) => pairs,
        Err(err) => {
            tracing::warn!(%err, "ignoring unparsable query string");
            return None;
        }
    };
    pairs
        .into_iter()
        .find(|(key, _)| key == DATA_PARAM)
        .map(|(_, value)| value.replace(' ', "+"))
        .filter(|value| !value.is_empty())
}
