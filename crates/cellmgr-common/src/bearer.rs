//! Bearer configuration types.
//!
//! `BearerProperties` is both the input of the set-initial-bearer operation
//! and the result of the load operations. `PdpContext` is the transient
//! record produced by parsing a `+CGDCONT?` response.

use serde::{Deserialize, Serialize};

// ── IP family ───────────────────────────────────────────────────────

/// IP family requested for (or reported by) a bearer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpFamily {
    /// Not specified / unknown.
    #[default]
    None,
    Ipv4,
    Ipv6,
    Ipv4v6,
    /// Caller accepts any family.
    Any,
}

impl IpFamily {
    /// PDP type string used in `+CGDCONT` commands.
    ///
    /// `None` and `Any` have no PDP type of their own.
    pub fn pdp_type(self) -> Option<&'static str> {
        match self {
            IpFamily::Ipv4 => Some("IP"),
            IpFamily::Ipv6 => Some("IPV6"),
            IpFamily::Ipv4v6 => Some("IPV4V6"),
            IpFamily::None | IpFamily::Any => None,
        }
    }

    /// Map a PDP type reported by the device. Non-IP types map to `None`.
    pub fn from_pdp_type(pdp_type: &str) -> IpFamily {
        match pdp_type.trim().to_ascii_uppercase().as_str() {
            "IP" => IpFamily::Ipv4,
            "IPV6" => IpFamily::Ipv6,
            "IPV4V6" => IpFamily::Ipv4v6,
            _ => IpFamily::None,
        }
    }

    /// Concrete family to provision with: `None`/`Any` become IPv4.
    pub fn or_ipv4(self) -> IpFamily {
        match self {
            IpFamily::None | IpFamily::Any => IpFamily::Ipv4,
            other => other,
        }
    }
}

impl std::fmt::Display for IpFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpFamily::None => write!(f, "none"),
            IpFamily::Ipv4 => write!(f, "ipv4"),
            IpFamily::Ipv6 => write!(f, "ipv6"),
            IpFamily::Ipv4v6 => write!(f, "ipv4v6"),
            IpFamily::Any => write!(f, "any"),
        }
    }
}

impl std::str::FromStr for IpFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(IpFamily::None),
            "ipv4" => Ok(IpFamily::Ipv4),
            "ipv6" => Ok(IpFamily::Ipv6),
            "ipv4v6" => Ok(IpFamily::Ipv4v6),
            "any" => Ok(IpFamily::Any),
            other => Err(format!("unknown ip family: {other}")),
        }
    }
}

// ── Bearer properties ───────────────────────────────────────────────

/// APN and IP family of a bearer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apn: Option<String>,
    #[serde(default)]
    pub ip_type: IpFamily,
}

impl BearerProperties {
    pub fn new(apn: impl Into<String>, ip_type: IpFamily) -> Self {
        Self {
            apn: Some(apn.into()),
            ip_type,
        }
    }

    /// APN as sent to the device; absent means empty.
    pub fn apn_or_empty(&self) -> &str {
        self.apn.as_deref().unwrap_or("")
    }
}

// ── PDP context record ──────────────────────────────────────────────

/// One entry of a `+CGDCONT?` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdpContext {
    pub cid: u32,
    pub ip_family: IpFamily,
    pub apn: Option<String>,
}
