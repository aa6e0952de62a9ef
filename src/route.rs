//! Recipient → webhook URL resolution.

use std::collections::BTreeMap;

use crate::config::RoutingConfig;
use crate::model::address::EmailAddress;

/// Finds the webhook a recipient's mail should be forwarded to.
pub trait DestinationResolver {
    /// `None` means the recipient is not served here.
    fn resolve(&self, recipient: &str) -> Option<String>;
}

/// Config-backed resolver.
///
/// Lookup order: fixed override, exact address, recipient domain, default
/// webhook. Address and domain keys are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct Router {
    fixed: Option<String>,
    addresses: BTreeMap<String, String>,
    domains: BTreeMap<String, String>,
    default_webhook: Option<String>,
}

impl Router {
    pub fn new(routing: &RoutingConfig) -> Self {
        let lower = |map: &BTreeMap<String, String>| {
            map.iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v.clone()))
                .collect()
        };

        Self {
            fixed: None,
            addresses: lower(&routing.addresses),
            domains: lower(&routing.domains),
            default_webhook: non_empty(routing.default_webhook.as_deref()),
        }
    }

    /// Send everything to `url`, ignoring the routing tables.
    pub fn with_fixed(mut self, url: Option<&str>) -> Self {
        self.fixed = non_empty(url);
        self
    }
}

impl DestinationResolver for Router {
    fn resolve(&self, recipient: &str) -> Option<String> {
        if let Some(url) = &self.fixed {
            return Some(url.clone());
        }

        let recipient = EmailAddress::parse(recipient);
        let address = recipient.address.to_lowercase();

        let found = self
            .addresses
            .get(&address)
            .or_else(|| recipient.domain().and_then(|d| self.domains.get(&d)))
            .or(self.default_webhook.as_ref())
            .cloned();

        match &found {
            Some(_) => tracing::debug!(recipient = %address, "Destination resolved"),
            None => tracing::debug!(recipient = %address, "No destination configured"),
        }
        found
    }
}

fn non_empty(url: Option<&str>) -> Option<String> {
    url.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(String::from)
}
