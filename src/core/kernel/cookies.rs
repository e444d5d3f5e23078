use tracing::trace;

/// Session cookie jar
///
/// Holds `name -> value` pairs harvested from `set-cookie` response headers.
/// A later value for an existing name overwrites it in place, so iteration
/// order is first-seen order and stays stable for the lifetime of the jar.
/// Attributes (`Path`, `Expires`, ...) are dropped; there is no eviction.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    entries: Vec<(String, String)>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb every `set-cookie` header from a response header list
    ///
    /// Header names are matched case-insensitively. Returns how many
    /// cookies were stored or overwritten.
    pub fn absorb(&mut self, headers: &[(String, String)]) -> usize {
        let mut stored = 0;
        for (name, value) in headers {
            if name.eq_ignore_ascii_case("set-cookie") && self.absorb_entry(value) {
                stored += 1;
            }
        }
        stored
    }

    /// Absorb a single `set-cookie` value
    ///
    /// Returns `false` when the entry has no usable `name=value` prefix.
    pub fn absorb_entry(&mut self, entry: &str) -> bool {
        let pair = entry.split_once(';').map_or(entry, |(head, _)| head);
        let Some((name, value)) = pair.split_once('=') else {
            return false;
        };

        let name = name.trim();
        let value = value.trim();
        if name.is_empty() || value.is_empty() {
            return false;
        }

        trace!(cookie = %name, "absorbing cookie");
        self.insert(name, value);
        true
    }

    /// Store or overwrite a cookie
    pub fn insert(&mut self, name: &str, value: &str) {
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| n == name) {
            value.clone_into(&mut slot.1);
        } else {
            self.entries.push((name.to_string(), value.to_string()));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Render the jar as a `Cookie` request header value
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Cookie names, for logging without leaking values
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
