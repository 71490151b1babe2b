//! Generation carriers and their dispatch tiers.

use crate::error::QgridError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fuel/technology tag of a generator.
///
/// Variants are declared in dispatch priority order; [`Carrier::priority`]
/// is the declaration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Carrier {
    #[serde(alias = "eolien")]
    Wind,
    #[serde(alias = "solaire")]
    Solar,
    #[serde(alias = "hydro_fil")]
    HydroRunOfRiver,
    #[serde(alias = "nucléaire", alias = "nucleaire")]
    Nuclear,
    #[serde(alias = "reservoir")]
    HydroReservoir,
    #[serde(alias = "thermique")]
    Thermal,
    Import,
    Emergency,
}

impl Carrier {
    pub const ALL: [Carrier; 8] = [
        Carrier::Wind,
        Carrier::Solar,
        Carrier::HydroRunOfRiver,
        Carrier::Nuclear,
        Carrier::HydroReservoir,
        Carrier::Thermal,
        Carrier::Import,
        Carrier::Emergency,
    ];

    /// Non-pilotable "fatale" carriers, in allocation order.
    pub const FATALE: [Carrier; 4] = [
        Carrier::Wind,
        Carrier::Solar,
        Carrier::HydroRunOfRiver,
        Carrier::Nuclear,
    ];

    /// Carriers dispatched after the reservoir fleet, in allocation order.
    pub const BACKUP: [Carrier; 3] = [Carrier::Thermal, Carrier::Import, Carrier::Emergency];

    pub fn priority(self) -> usize {
        self as usize
    }

    /// Default marginal cost ($/MWh) used when a cost value is absent or not finite.
    pub fn default_marginal_cost(self) -> f64 {
        match self {
            Carrier::Wind | Carrier::Solar | Carrier::HydroRunOfRiver => 0.1,
            Carrier::Nuclear => 0.2,
            Carrier::HydroReservoir => 7.0,
            Carrier::Thermal => 30.0,
            Carrier::Import => 0.5,
            Carrier::Emergency => 800.0,
        }
    }

    /// Deterministic availability used when no value can be recovered for a snapshot.
    pub fn fallback_availability(self) -> f64 {
        match self {
            Carrier::Wind => 0.25,
            Carrier::Solar => 0.1,
            Carrier::HydroRunOfRiver => 0.7,
            Carrier::Nuclear => 0.85,
            Carrier::HydroReservoir => 0.95,
            Carrier::Thermal => 0.9,
            Carrier::Import | Carrier::Emergency => 1.0,
        }
    }

    pub fn is_pilotable(self) -> bool {
        matches!(self, Carrier::HydroReservoir | Carrier::Thermal)
    }

    pub fn is_fatale(self) -> bool {
        Carrier::FATALE.contains(&self)
    }

    pub fn is_synthetic(self) -> bool {
        matches!(self, Carrier::Import | Carrier::Emergency)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Carrier::Wind => "wind",
            Carrier::Solar => "solar",
            Carrier::HydroRunOfRiver => "hydro_run_of_river",
            Carrier::Nuclear => "nuclear",
            Carrier::HydroReservoir => "hydro_reservoir",
            Carrier::Thermal => "thermal",
            Carrier::Import => "import",
            Carrier::Emergency => "emergency",
        }
    }
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Carrier {
    type Err = QgridError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "wind" | "eolien" => Ok(Carrier::Wind),
            "solar" | "solaire" => Ok(Carrier::Solar),
            "hydro_run_of_river" | "run_of_river" | "hydro_fil" => Ok(Carrier::HydroRunOfRiver),
            "nuclear" | "nucléaire" | "nucleaire" => Ok(Carrier::Nuclear),
            "hydro_reservoir" | "reservoir" => Ok(Carrier::HydroReservoir),
            "thermal" | "thermique" => Ok(Carrier::Thermal),
            "import" => Ok(Carrier::Import),
            "emergency" => Ok(Carrier::Emergency),
            other => Err(QgridError::Config(format!("unknown carrier '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_follows_declaration_order() {
        for (idx, carrier) in Carrier::ALL.iter().enumerate() {
            assert_eq!(carrier.priority(), idx);
        }
        assert!(Carrier::Nuclear < Carrier::HydroReservoir);
    }

    #[test]
    fn parses_english_and_french_labels() {
        assert_eq!("eolien".parse::<Carrier>().unwrap(), Carrier::Wind);
        assert_eq!("Nucléaire".parse::<Carrier>().unwrap(), Carrier::Nuclear);
        assert_eq!("hydro_fil".parse::<Carrier>().unwrap(), Carrier::HydroRunOfRiver);
        assert_eq!("thermal".parse::<Carrier>().unwrap(), Carrier::Thermal);
    }

    #[test]
    fn unknown_carrier_is_config_error() {
        let err = "coal".parse::<Carrier>().unwrap_err();
        assert!(matches!(err, QgridError::Config(_)));
    }

    #[test]
    fn emergency_is_most_expensive() {
        let max = Carrier::ALL
            .iter()
            .filter(|c| **c != Carrier::Emergency)
            .map(|c| c.default_marginal_cost())
            .fold(f64::MIN, f64::max);
        assert!(Carrier::Emergency.default_marginal_cost() > max);
    }

    #[test]
    fn serde_accepts_aliases() {
        let c: Carrier = serde_json::from_str("\"thermique\"").unwrap();
        assert_eq!(c, Carrier::Thermal);
        assert_eq!(
            serde_json::to_string(&Carrier::HydroRunOfRiver).unwrap(),
            "\"hydro_run_of_river\""
        );
    }
}
