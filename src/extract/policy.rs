use crate::url::HostRule;
use url::Url;

/// Allow-list and deny-list separating in-scope asset hosts from other CDNs
///
/// Deny rules win over allow rules. An empty allow-list admits any http(s)
/// host that is not denied.
#[derive(Debug, Clone, Default)]
pub struct AssetPolicy {
    allow: Vec<HostRule>,
    deny: Vec<HostRule>,
}

impl AssetPolicy {
    pub fn new(allow: Vec<HostRule>, deny: Vec<HostRule>) -> Self {
        Self { allow, deny }
    }

    pub fn allow_rules(&self) -> &[HostRule] {
        &self.allow
    }

    pub fn deny_rules(&self) -> &[HostRule] {
        &self.deny
    }

    /// Returns true if the URL belongs to an in-scope asset host
    pub fn permits(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }
        if self.deny.iter().any(|rule| rule.matches(url)) {
            return false;
        }
        self.allow.is_empty() || self.allow.iter().any(|rule| rule.matches(url))
    }
}
