//! Email addresses as shown in notifications and used for routing.

/// A mailbox: optional display name plus the bare address.
///
/// # Examples
/// - `"Ana Pérez <ana@example.com>"` → `name = "Ana Pérez"`, `address = "ana@example.com"`
/// - `"ops@example.com"` → `name = ""`, `address = "ops@example.com"`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub name: String,
    /// The bare email address (`user@domain`).
    pub address: String,
}

impl EmailAddress {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    /// Parse a single mailbox such as an SMTP envelope address.
    ///
    /// Accepts `user@domain`, `<user@domain>` and `Name <user@domain>`.
    /// Anything else is kept verbatim as the address.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let (Some(open), Some(close)) = (trimmed.rfind('<'), trimmed.rfind('>')) {
            if close > open {
                let name = trimmed[..open].trim().trim_matches('"').trim();
                return Self::new(name, trimmed[open + 1..close].trim());
            }
        }

        Self::new("", trimmed)
    }

    /// The part after the last `@`, lowercased. `None` for bare local parts.
    pub fn domain(&self) -> Option<String> {
        let (_, domain) = self.address.rsplit_once('@')?;
        let domain = domain.trim();
        if domain.is_empty() {
            None
        } else {
            Some(domain.to_ascii_lowercase())
        }
    }

    /// `true` if both refer to the same mailbox (case-insensitive address).
    pub fn same_mailbox(&self, other: &EmailAddress) -> bool {
        self.address.eq_ignore_ascii_case(&other.address)
    }

    /// `"Name <address>"` when the display name adds information, else `"address"`.
    pub fn display(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case(&self.address) {
            self.address.clone()
        } else {
            format!("{name} <{}>", self.address)
        }
    }
}

/// Join a list of mailboxes for display, comma-separated.
pub fn display_list(list: &[EmailAddress]) -> String {
    list.iter()
        .map(EmailAddress::display)
        .collect::<Vec<_>>()
        .join(", ")
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
