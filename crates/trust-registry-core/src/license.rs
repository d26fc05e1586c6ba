//! License classification and compatibility policy
//!
//! Identifiers are normalized to lowercase SPDX-like ids, classified into a
//! small set of families, and compared with a fixed rule table oriented at
//! commercial reuse: the artifact is combined with the external repository
//! and the result must remain usable in a proprietary product.

use serde::{Deserialize, Serialize};
use std::fmt;

const PERMISSIVE: &[&str] = &[
    "mit", "apache-2.0", "bsd-2-clause", "bsd-3-clause", "bsd-3-clause-clear", "bsd", "isc",
    "unlicense", "cc0-1.0", "cc-by-2.0", "cc-by-3.0", "cc-by-4.0", "zlib", "afl-3.0", "bsl-1.0",
    "wtfpl", "pddl", "odc-by", "ecl-2.0", "postgresql", "ncsa", "0bsd", "python-2.0", "mpl-2.0",
];

const WEAK_COPYLEFT: &[&str] = &[
    "lgpl-2.1", "lgpl-lr", "epl-1.0", "epl-2.0", "cddl-1.0", "osl-3.0", "eupl-1.1", "eupl-1.2",
];

const STRONG_COPYLEFT: &[&str] = &[
    "gpl-2.0", "gpl-3.0", "lgpl-3.0", "agpl-3.0", "cc-by-sa-3.0", "cc-by-sa-4.0", "odbl", "gfdl",
];

const NON_COMMERCIAL: &[&str] = &[
    "cc-by-nc-2.0", "cc-by-nc-3.0", "cc-by-nc-4.0", "cc-by-nc-sa-2.0", "cc-by-nc-sa-3.0",
    "cc-by-nc-sa-4.0", "cc-by-nc-nd-3.0", "cc-by-nc-nd-4.0",
];

const CUSTOM: &[&str] = &[
    "openrail", "openrail++", "creativeml-openrail-m", "bigscience-openrail-m",
    "bigscience-bloom-rail-1.0", "bigcode-openrail-m", "llama2", "llama3", "llama3.1",
    "llama3.2", "llama3.3", "gemma", "deepfloyd-if-license", "apple-ascl", "c-uda",
];

/// Markers that carry no license information
const UNKNOWN: &[&str] = &["", "other", "unknown", "noassertion", "none", "null"];

/// License family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseClass {
    Permissive,
    WeakCopyleft,
    StrongCopyleft,
    NonCommercial,
    /// Bespoke model licenses (RAIL, vendor community licenses)
    Custom,
    /// A non-empty identifier not found in any table
    Unrecognized,
    /// No usable license information
    Unknown,
}

impl LicenseClass {
    /// Classify a raw license identifier
    pub fn classify(raw: &str) -> Self {
        let id = normalize(raw);
        let id = id.as_str();

        if UNKNOWN.contains(&id) {
            Self::Unknown
        } else if NON_COMMERCIAL.contains(&id) || id.starts_with("cc-by-nc") {
            Self::NonCommercial
        } else if PERMISSIVE.contains(&id) {
            Self::Permissive
        } else if WEAK_COPYLEFT.contains(&id) {
            Self::WeakCopyleft
        } else if STRONG_COPYLEFT.contains(&id) || id.starts_with("cc-by-sa") {
            Self::StrongCopyleft
        } else if CUSTOM.contains(&id) || id.contains("openrail") || id.starts_with("llama") {
            Self::Custom
        } else {
            Self::Unrecognized
        }
    }

    /// Whether a compatibility verdict can be given for this class
    pub fn is_determined(&self) -> bool {
        !matches!(self, Self::Unrecognized | Self::Unknown)
    }
}

impl fmt::Display for LicenseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Permissive => "permissive",
            Self::WeakCopyleft => "weak_copyleft",
            Self::StrongCopyleft => "strong_copyleft",
            Self::NonCommercial => "non_commercial",
            Self::Custom => "custom",
            Self::Unrecognized => "unrecognized",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Normalize a license identifier to its lowercase SPDX-like form
///
/// Handles the spellings seen in model cards and the GitHub API:
/// `Apache License 2.0`, `apache2`, `GPL-3.0-or-later`, `MIT License`.
pub fn normalize(raw: &str) -> String {
    let mut id = raw
        .trim()
        .to_ascii_lowercase()
        .replace(['_', ' '], "-");

    for suffix in ["-only", "-or-later", "+"] {
        if let Some(stripped) = id.strip_suffix(suffix) {
            id = stripped.to_string();
        }
    }

    if let Some(stripped) = id.strip_suffix("-license") {
        id = stripped.to_string();
    }
    if let Some(stripped) = id.strip_prefix("the-") {
        id = stripped.to_string();
    }

    match id.as_str() {
        "apache" | "apache2" | "apache-2" | "apache2.0" | "apache-license-2.0" | "apache-2.0-license" => {
            "apache-2.0".to_string()
        }
        "gpl" | "gplv3" | "gpl3" | "gpl-3" => "gpl-3.0".to_string(),
        "gplv2" | "gpl2" | "gpl-2" => "gpl-2.0".to_string(),
        "lgpl" | "lgplv3" | "lgpl3" => "lgpl-3.0".to_string(),
        "lgplv2.1" | "lgpl2.1" => "lgpl-2.1".to_string(),
        "agpl" | "agplv3" | "agpl3" => "agpl-3.0".to_string(),
        "mpl" | "mpl2" => "mpl-2.0".to_string(),
        "bsd-3" | "bsd3" | "new-bsd" => "bsd-3-clause".to_string(),
        "bsd-2" | "bsd2" | "simplified-bsd" => "bsd-2-clause".to_string(),
        "cc0" | "cc0-1" => "cc0-1.0".to_string(),
        _ => id,
    }
}

/// Score a declared license for the license metric
///
/// Missing or uninformative licenses score 0.
pub fn license_score(license: Option<&str>) -> f64 {
    match license.map(LicenseClass::classify).unwrap_or(LicenseClass::Unknown) {
        LicenseClass::Permissive => 1.0,
        LicenseClass::WeakCopyleft => 0.8,
        LicenseClass::StrongCopyleft => 0.7,
        LicenseClass::Custom => 0.6,
        LicenseClass::Unrecognized => 0.5,
        LicenseClass::NonCommercial => 0.4,
        LicenseClass::Unknown => 0.0,
    }
}

/// Decide compatibility of an artifact license with an external repository license
///
/// Returns `None` when either side cannot be classified; callers must report
/// that as an undetermined verdict rather than as incompatibility.
pub fn is_compatible(artifact_license: &str, external_license: &str) -> Option<bool> {
    use LicenseClass::*;

    let artifact = LicenseClass::classify(artifact_license);
    let external = LicenseClass::classify(external_license);

    if !artifact.is_determined() || !external.is_determined() {
        return None;
    }

    let compatible = match (artifact, external) {
        (Permissive | WeakCopyleft, Permissive | WeakCopyleft) => true,
        (StrongCopyleft, StrongCopyleft) => normalize(artifact_license) == normalize(external_license),
        _ => false,
    };
    Some(compatible)
}

/// License compatibility verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseCheckResult {
    pub compatible: bool,
}
