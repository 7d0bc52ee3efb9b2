//! 3GPP network types: scan results and registration state.

use serde::{Deserialize, Serialize};

// ── Access technology ───────────────────────────────────────────────

/// Radio access technology of a scanned network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTechnology {
    #[default]
    Unknown,
    Gsm,
    Umts,
    Edge,
    Hsdpa,
    Hsupa,
    Hspa,
    Lte,
    LteNbIot,
    Nr5g,
}

impl AccessTechnology {
    /// Map the `<AcT>` field of 3GPP TS 27.007 `+COPS`.
    pub fn from_act(act: u32) -> AccessTechnology {
        match act {
            0 | 1 | 8 => AccessTechnology::Gsm,
            2 => AccessTechnology::Umts,
            3 => AccessTechnology::Edge,
            4 => AccessTechnology::Hsdpa,
            5 => AccessTechnology::Hsupa,
            6 => AccessTechnology::Hspa,
            7 | 10 => AccessTechnology::Lte,
            9 => AccessTechnology::LteNbIot,
            11..=13 => AccessTechnology::Nr5g,
            _ => AccessTechnology::Unknown,
        }
    }
}

impl std::fmt::Display for AccessTechnology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AccessTechnology::Unknown => "unknown",
            AccessTechnology::Gsm => "gsm",
            AccessTechnology::Umts => "umts",
            AccessTechnology::Edge => "edge",
            AccessTechnology::Hsdpa => "hsdpa",
            AccessTechnology::Hsupa => "hsupa",
            AccessTechnology::Hspa => "hspa",
            AccessTechnology::Lte => "lte",
            AccessTechnology::LteNbIot => "lte-nb-iot",
            AccessTechnology::Nr5g => "5gnr",
        };
        f.write_str(s)
    }
}

// ── Availability ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkAvailability {
    #[default]
    Unknown,
    Available,
    Current,
    Forbidden,
}

impl NetworkAvailability {
    /// Map the `<stat>` field of `+COPS=?`.
    pub fn from_stat(stat: u32) -> NetworkAvailability {
        match stat {
            1 => NetworkAvailability::Available,
            2 => NetworkAvailability::Current,
            3 => NetworkAvailability::Forbidden,
            _ => NetworkAvailability::Unknown,
        }
    }
}

impl std::fmt::Display for NetworkAvailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkAvailability::Unknown => write!(f, "unknown"),
            NetworkAvailability::Available => write!(f, "available"),
            NetworkAvailability::Current => write!(f, "current"),
            NetworkAvailability::Forbidden => write!(f, "forbidden"),
        }
    }
}

// ── Scan result ─────────────────────────────────────────────────────

/// One network found by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// MCC+MNC, e.g. `21401`.
    pub operator_code: String,
    pub operator_long: Option<String>,
    pub operator_short: Option<String>,
    pub access_technology: AccessTechnology,
    pub availability: NetworkAvailability,
}

impl NetworkInfo {
    /// Long name if known, else short name.
    pub fn display_name(&self) -> Option<&str> {
        self.operator_long
            .as_deref()
            .or(self.operator_short.as_deref())
    }
}

impl std::fmt::Display for NetworkInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {} ({}, {})",
            self.operator_code,
            self.display_name().unwrap_or("unknown"),
            self.access_technology,
            self.availability
        )
    }
}

// ── Registration ────────────────────────────────────────────────────

/// `<stat>` of `+CREG?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    Idle,
    Home,
    Searching,
    Denied,
    Unknown,
    Roaming,
}

impl RegistrationState {
    pub fn from_stat(stat: u32) -> RegistrationState {
        match stat {
            0 => RegistrationState::Idle,
            1 => RegistrationState::Home,
            2 => RegistrationState::Searching,
            3 => RegistrationState::Denied,
            5 => RegistrationState::Roaming,
            _ => RegistrationState::Unknown,
        }
    }

    pub fn is_registered(self) -> bool {
        matches!(self, RegistrationState::Home | RegistrationState::Roaming)
    }
}
