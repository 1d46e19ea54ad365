//! Survey missions and their raw-schema signatures
//!
//! Every uploaded table is routed to one of three survey missions. Each
//! mission has an independent raw column layout, identified by a static
//! [`MissionSignature`].

mod signature;

pub use signature::{signature, MissionSignature, SIGNATURES};

use crate::error::{ExoError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Astronomical survey mission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mission {
    /// Kepler Objects of Interest (KOI table)
    Kepler,
    /// K2 planets and candidates
    K2,
    /// TESS Objects of Interest (TOI table)
    Tess,
}

impl Mission {
    /// Priority order used whenever missions must be visited deterministically.
    ///
    /// Detection ties at the maximum score resolve to the earliest entry.
    pub const PRIORITY: [Mission; 3] = [Mission::Kepler, Mission::Tess, Mission::K2];

    /// Lowercase identifier (`kepler`, `k2`, `tess`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Mission::Kepler => "kepler",
            Mission::K2 => "k2",
            Mission::Tess => "tess",
        }
    }

    /// Human-readable survey name
    pub fn display_name(&self) -> &'static str {
        match self {
            Mission::Kepler => "Kepler",
            Mission::K2 => "K2",
            Mission::Tess => "TESS",
        }
    }

    /// Environment variable that overrides this mission's artifact path
    pub fn artifact_env_var(&self) -> &'static str {
        match self {
            Mission::Kepler => "EXO_KEPLER_MODEL",
            Mission::K2 => "EXO_K2_MODEL",
            Mission::Tess => "EXO_TESS_MODEL",
        }
    }

    /// Key features quoted when summarising a prediction for a reader
    pub fn key_features(&self) -> &'static [&'static str] {
        match self {
            Mission::Kepler => &["koi_period", "koi_prad", "koi_teq", "koi_depth", "koi_model_snr"],
            Mission::Tess => &["pl_orbper", "pl_rade", "pl_eqt", "pl_trandep", "st_tmag"],
            Mission::K2 => &["pl_rade", "sy_dist", "sy_vmag", "st_rad"],
        }
    }
}

impl fmt::Display for Mission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mission {
    type Err = ExoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kepler" | "koi" => Ok(Mission::Kepler),
            "k2" => Ok(Mission::K2),
            "tess" | "toi" => Ok(Mission::Tess),
            other => Err(ExoError::ModelUnavailable(format!(
                "unrecognized mission '{}', expected one of kepler, k2, tess",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mission_parse() {
        assert_eq!("kepler".parse::<Mission>().unwrap(), Mission::Kepler);
        assert_eq!(" K2 ".parse::<Mission>().unwrap(), Mission::K2);
        assert_eq!("TESS".parse::<Mission>().unwrap(), Mission::Tess);
        assert_eq!("toi".parse::<Mission>().unwrap(), Mission::Tess);
    }

    #[test]
    fn test_unknown_mission_is_model_unavailable() {
        let err = "hubble".parse::<Mission>().unwrap_err();
        assert!(matches!(err, ExoError::ModelUnavailable(_)));
    }

    #[test]
    fn test_mission_serialize() {
        let json = serde_json::to_string(&Mission::Tess).unwrap();
        assert_eq!(json, "\"tess\"");
        let back: Mission = serde_json::from_str("\"k2\"").unwrap();
        assert_eq!(back, Mission::K2);
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(Mission::PRIORITY, [Mission::Kepler, Mission::Tess, Mission::K2]);
    }
}
