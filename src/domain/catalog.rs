//! Threat catalog - predefined threat patterns keyed by asset type.
//!
//! The catalog is an immutable table built once per process and passed by
//! reference to the risk evaluator. A replacement table can be loaded from
//! TOML so deployments (and tests) can score against their own threats.

use super::error::{ConversionError, ErrorKind, Result};
use super::threat::Threat;
use serde::{Deserialize, Serialize};

pub const CATEGORY_INJECTION: &str = "Injection";
pub const CATEGORY_DATA_PROTECTION: &str = "Protection des données";
pub const CATEGORY_AUTHENTICATION: &str = "Authentification";
pub const CATEGORY_AVAILABILITY: &str = "Disponibilité";
pub const CATEGORY_ACCESS_CONTROL: &str = "Contrôle d'accès";
pub const CATEGORY_ENCRYPTION: &str = "Chiffrement";
pub const CATEGORY_SUPPLY_CHAIN: &str = "Chaîne d'approvisionnement";

/// Read-only table of threat definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatCatalog {
    threats: Vec<Threat>,
}

impl Default for ThreatCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ThreatCatalog {
    pub fn new(threats: Vec<Threat>) -> Self {
        Self { threats }
    }

    /// The threats shipped with the converter.
    pub fn builtin() -> Self {
        let mut threats = Vec::new();
        threats.extend(injection_threats());
        threats.extend(data_protection_threats());
        threats.extend(access_threats());
        threats.extend(availability_threats());
        threats.extend(transport_threats());
        Self { threats }
    }

    /// Parse a catalog from TOML (`[[threats]]` tables).
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let catalog: ThreatCatalog = toml::from_str(input).map_err(|err| {
            ConversionError::new(
                ErrorKind::SchemaViolation,
                format!("invalid threat catalog: {}", err.message()),
            )
            .with_cause(err)
        })?;
        if catalog.threats.is_empty() {
            return Err(ConversionError::new(
                ErrorKind::MissingRequiredField,
                "threat catalog defines no threats",
            ));
        }
        Ok(catalog)
    }

    pub fn threats(&self) -> &[Threat] {
        &self.threats
    }

    pub fn get(&self, id: &str) -> Option<&Threat> {
        self.threats.iter().find(|t| t.id == id)
    }

    /// Every threat applicable to `asset_type`, in catalog order.
    pub fn threats_for_asset_type(&self, asset_type: &str) -> Vec<&Threat> {
        self.threats
            .iter()
            .filter(|t| t.applies_to(asset_type))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.threats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threats.is_empty()
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn injection_threats() -> Vec<Threat> {
    vec![
        Threat {
            id: "sql-injection".to_string(),
            name: "Injection SQL".to_string(),
            description: "Des entrées non validées sont concaténées dans des requêtes SQL, permettant la lecture ou la modification arbitraire des données.".to_string(),
            category: CATEGORY_INJECTION.to_string(),
            impact: "high".to_string(),
            likelihood: "medium".to_string(),
            risk: "high".to_string(),
            mitigations: strings(&[
                "Utiliser des requêtes paramétrées",
                "Valider et normaliser les entrées",
                "Restreindre les privilèges du compte de base de données",
            ]),
            applicable_asset_types: strings(&["database", "web-application", "web-service", "service"]),
        },
        Threat {
            id: "cross-site-scripting".to_string(),
            name: "Cross-Site Scripting (XSS)".to_string(),
            description: "Du contenu contrôlé par un attaquant est renvoyé au navigateur sans échappement et exécuté dans le contexte de la victime.".to_string(),
            category: CATEGORY_INJECTION.to_string(),
            impact: "medium".to_string(),
            likelihood: "high".to_string(),
            risk: "medium".to_string(),
            mitigations: strings(&[
                "Échapper les sorties selon le contexte",
                "Déployer une Content-Security-Policy",
            ]),
            applicable_asset_types: strings(&["web-application", "client"]),
        },
    ]
}

fn data_protection_threats() -> Vec<Threat> {
    vec![
        Threat {
            id: "sensitive-data-leak".to_string(),
            name: "Fuite de données sensibles".to_string(),
            description: "Des données confidentielles sont exposées à des acteurs non autorisés via des réponses, des journaux ou des sauvegardes.".to_string(),
            category: CATEGORY_DATA_PROTECTION.to_string(),
            impact: "high".to_string(),
            likelihood: "medium".to_string(),
            risk: "high".to_string(),
            mitigations: strings(&[
                "Classifier les données et minimiser leur collecte",
                "Chiffrer les données au repos",
                "Masquer les données sensibles dans les journaux",
            ]),
            applicable_asset_types: strings(&[
                "database",
                "web-application",
                "web-service",
                "service",
                "external-service",
            ]),
        },
        Threat {
            id: "unencrypted-storage".to_string(),
            name: "Stockage de données non chiffré".to_string(),
            description: "Les données persistées ne sont pas chiffrées, un accès au support physique ou aux sauvegardes suffit à les lire.".to_string(),
            category: CATEGORY_DATA_PROTECTION.to_string(),
            impact: "high".to_string(),
            likelihood: "low".to_string(),
            risk: "medium".to_string(),
            mitigations: strings(&[
                "Activer le chiffrement transparent du stockage",
                "Gérer les clés dans un coffre dédié",
            ]),
            applicable_asset_types: strings(&["database"]),
        },
    ]
}

fn access_threats() -> Vec<Threat> {
    vec![
        Threat {
            id: "broken-authentication".to_string(),
            name: "Authentification défaillante".to_string(),
            description: "Des mécanismes d'authentification faibles permettent l'usurpation d'identité ou le vol de session.".to_string(),
            category: CATEGORY_AUTHENTICATION.to_string(),
            impact: "high".to_string(),
            likelihood: "medium".to_string(),
            risk: "high".to_string(),
            mitigations: strings(&[
                "Imposer l'authentification multifacteur",
                "Limiter les tentatives de connexion",
                "Renouveler les identifiants de session après connexion",
            ]),
            applicable_asset_types: strings(&[
                "web-application",
                "web-service",
                "service",
                "gateway",
                "client",
            ]),
        },
        Threat {
            id: "privilege-escalation".to_string(),
            name: "Élévation de privilèges".to_string(),
            description: "Un utilisateur authentifié obtient des droits supérieurs à ceux prévus par contournement des contrôles d'accès.".to_string(),
            category: CATEGORY_ACCESS_CONTROL.to_string(),
            impact: "critical".to_string(),
            likelihood: "low".to_string(),
            risk: "high".to_string(),
            mitigations: strings(&[
                "Appliquer le principe du moindre privilège",
                "Vérifier les autorisations côté serveur pour chaque requête",
            ]),
            applicable_asset_types: strings(&[
                "service",
                "web-service",
                "web-application",
                "database",
            ]),
        },
    ]
}

fn availability_threats() -> Vec<Threat> {
    vec![Threat {
        id: "denial-of-service".to_string(),
        name: "Déni de service".to_string(),
        description: "Un volume de requêtes excessif ou malveillant épuise les ressources et rend le composant indisponible.".to_string(),
        category: CATEGORY_AVAILABILITY.to_string(),
        impact: "medium".to_string(),
        likelihood: "high".to_string(),
        risk: "medium".to_string(),
        mitigations: strings(&[
            "Mettre en place une limitation de débit",
            "Dimensionner et répartir la charge",
            "Utiliser une protection anti-DDoS en amont",
        ]),
        applicable_asset_types: strings(&["gateway", "web-application", "web-service", "service"]),
    }]
}

fn transport_threats() -> Vec<Threat> {
    vec![
        Threat {
            id: "man-in-the-middle".to_string(),
            name: "Interception des communications".to_string(),
            description: "Un attaquant positionné sur le réseau lit ou altère les échanges non chiffrés ou mal authentifiés.".to_string(),
            category: CATEGORY_ENCRYPTION.to_string(),
            impact: "high".to_string(),
            likelihood: "medium".to_string(),
            risk: "high".to_string(),
            mitigations: strings(&[
                "Chiffrer tous les flux avec TLS",
                "Valider les certificats et épingler les clés critiques",
            ]),
            applicable_asset_types: strings(&[
                "gateway",
                "client",
                "external-service",
                "web-service",
            ]),
        },
        Threat {
            id: "third-party-compromise".to_string(),
            name: "Compromission d'un service tiers".to_string(),
            description: "Un fournisseur externe compromis devient un point d'entrée vers le système ou une source de données falsifiées.".to_string(),
            category: CATEGORY_SUPPLY_CHAIN.to_string(),
            impact: "high".to_string(),
            likelihood: "low".to_string(),
            risk: "medium".to_string(),
            mitigations: strings(&[
                "Évaluer la sécurité des fournisseurs",
                "Isoler et valider les données reçues des tiers",
            ]),
            applicable_asset_types: strings(&["external-service"]),
        },
    ]
}
