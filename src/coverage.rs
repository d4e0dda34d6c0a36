//! Heuristic coverage-gap report.
//!
//! Scans the source context for keyword "risk zones" and cross-checks them
//! against the names and code of the generated suite. Purely lexical: it
//! never interprets the generated code.

use crate::record::TestCaseRecord;
use serde::{Deserialize, Serialize};

/// Score lost per detected gap
const GAP_PENALTY: u32 = 15;
/// Branch count above which a small suite is flagged
const BRANCH_DENSITY_LIMIT: usize = 10;
const MIN_SUITE_FOR_DENSE_CODE: usize = 5;

const ALL_ZONES_COVERED: &str = "Test suite successfully mapped to all detected code risk zones.";

/// A category of risky code, detected by keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskZone {
    Authentication,
    DataIntegrity,
    ExternalDeps,
    ComplexLogic,
}

impl RiskZone {
    pub const ALL: [RiskZone; 4] = [
        RiskZone::Authentication,
        RiskZone::DataIntegrity,
        RiskZone::ExternalDeps,
        RiskZone::ComplexLogic,
    ];

    fn keywords(self) -> &'static [&'static str] {
        match self {
            RiskZone::Authentication => &["login", "token", "jwt", "password", "authorize", "permission"],
            RiskZone::DataIntegrity => &["delete", "update", "transaction", "commit", "drop", "write"],
            RiskZone::ExternalDeps => &["request", "httpx", "aiohttp", "stripe", "s3", "boto3"],
            RiskZone::ComplexLogic => &["if", "elif", "match", "try", "except", "while"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskIndex {
    Low,
    Medium,
    High,
}

impl RiskIndex {
    fn from_gap_count(gaps: usize) -> Self {
        match gaps {
            0 => RiskIndex::Low,
            1..=3 => RiskIndex::Medium,
            _ => RiskIndex::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub suggestions: Vec<String>,
    pub coverage_score: f64,
    pub detected_risks: Vec<RiskZone>,
    pub risk_index: RiskIndex,
}

/// Maps source risk zones onto the generated suite.
#[derive(Debug, Default, Clone, Copy)]
pub struct GapAnalyzer;

impl GapAnalyzer {
    pub fn analyze(&self, records: &[TestCaseRecord], context: &str) -> CoverageReport {
        let source = context.to_lowercase();
        let names: Vec<String> = records.iter().map(|r| r.name.to_lowercase()).collect();
        let code = records
            .iter()
            .filter_map(|r| r.code.as_deref())
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("");

        let detected_risks: Vec<RiskZone> = RiskZone::ALL
            .into_iter()
            .filter(|zone| zone.keywords().iter().any(|k| source.contains(k)))
            .collect();
        let detected = |zone| detected_risks.contains(&zone);
        let any_name = |needles: &[&str]| names.iter().any(|n| needles.iter().any(|k| n.contains(k)));

        let mut suggestions = Vec::new();
        if detected(RiskZone::DataIntegrity) && !any_name(&["delete", "cleanup", "remove"]) {
            suggestions.push(
                "HIGH RISK: Destructive operations (DELETE/UPDATE) found in code but lack specific validation tests."
                    .to_string(),
            );
        }
        if detected(RiskZone::Authentication) && !any_name(&["security", "auth", "login"]) {
            suggestions.push(
                "SECURITY GAP: Authentication logic detected. No high-confidence security scenarios were generated."
                    .to_string(),
            );
        }
        if detected(RiskZone::ExternalDeps) && !code.contains("mock") {
            suggestions.push(
                "INTEGRATION GAP: Code uses external APIs/Services, but tests lack proper mocking/stubbing logic."
                    .to_string(),
            );
        }

        let branches = source.matches("if ").count() + source.matches("elif ").count();
        if branches > BRANCH_DENSITY_LIMIT && records.len() < MIN_SUITE_FOR_DENSE_CODE {
            suggestions.push(format!(
                "COVERAGE GAP: Code has high branching complexity ({} branches), but the test suite is too lean.",
                branches
            ));
        }

        if source.contains("try:") && !names.iter().any(|n| n.contains("error")) {
            suggestions.push(
                "STABILITY GAP: Exception handling blocks found in code, but no 'Negative Tests' or Error scenarios detected."
                    .to_string(),
            );
        }

        let gaps = suggestions.len();
        let coverage_score = 100u32.saturating_sub(GAP_PENALTY * gaps as u32) as f64;
        if suggestions.is_empty() {
            suggestions.push(ALL_ZONES_COVERED.to_string());
        }

        CoverageReport {
            suggestions,
            coverage_score,
            detected_risks,
            risk_index: RiskIndex::from_gap_count(gaps),
        }
    }
}
