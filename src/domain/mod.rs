//! Domain types for the converter
//! Threat-model structures, the threat catalog and the conversion error type.

pub mod catalog;
pub mod error;
pub mod model;
pub mod threat;

pub use catalog::*;
pub use error::*;
pub use model::*;
pub use threat::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_risk_level_display_parse() {
        assert_eq!(RiskLevel::Low.to_string(), "low");
        assert_eq!(RiskLevel::from_str("HIGH").unwrap(), RiskLevel::High);
        assert_eq!(RiskLevel::from_str("Critical").unwrap(), RiskLevel::Critical);
        assert!(RiskLevel::from_str("invalid").is_err());
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Critical > RiskLevel::High);
        assert!(RiskLevel::Medium > RiskLevel::Low);
        assert_eq!(RiskLevel::High.rank(), 2);
    }

    #[test]
    fn test_threat_applicability() {
        let catalog = ThreatCatalog::builtin();
        let sqli = catalog.get("sql-injection").unwrap();
        assert!(sqli.applies_to("database"));
        assert!(!sqli.applies_to("client"));
    }
}
