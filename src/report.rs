//! Risk report: per-check results, the running score, and tier derivation.
//!
//! The score is an accumulator: every recorded result adds its risk once.
//! It is never clamped to `max_risk`, which is only the denominator for
//! the tier percentage.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::checks::{CheckId, CheckResult};

/// Discrete risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Tier for `score` out of `max`: >= 70% HIGH, >= 40% MEDIUM, else LOW.
    ///
    /// Integer comparison, so exact 40% / 70% boundaries are never lost to
    /// rounding. A zero `max` only yields LOW for a zero score.
    pub fn from_score(score: u32, max: u32) -> Self {
        let scaled = u64::from(score) * 100;
        let max = u64::from(max);
        if scaled >= 70 * max && (score > 0 || max > 0) {
            RiskLevel::High
        } else if scaled >= 40 * max && (score > 0 || max > 0) {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tier plus the percentage it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// Rounded `score / max * 100`; may exceed 100.
    pub percentage: u32,
}

/// State of one catalogue slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CheckSlot {
    /// Async probe still in flight.
    Pending,
    Resolved(CheckResult),
}

impl CheckSlot {
    pub fn result(&self) -> Option<&CheckResult> {
        match self {
            CheckSlot::Resolved(result) => Some(result),
            CheckSlot::Pending => None,
        }
    }
}

/// Aggregate of one registry pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskReport {
    results: Vec<(CheckId, CheckSlot)>,
    risk_score: u32,
    max_risk: u32,
}

impl RiskReport {
    pub fn new(max_risk: u32) -> Self {
        Self {
            results: Vec::new(),
            risk_score: 0,
            max_risk,
        }
    }

    /// Store a result and add its risk to the running score.
    pub fn record(&mut self, id: CheckId, result: CheckResult) {
        self.risk_score += result.risk;
        self.results.push((id, CheckSlot::Resolved(result)));
    }

    /// Reserve a slot for an async check.
    pub fn mark_pending(&mut self, id: CheckId) {
        self.results.push((id, CheckSlot::Pending));
    }

    /// Fill a pending slot. Returns `false` (and changes nothing) if the
    /// slot is unknown or already resolved.
    pub fn resolve(&mut self, id: CheckId, result: CheckResult) -> bool {
        let slot = self
            .results
            .iter_mut()
            .find(|(slot_id, _)| *slot_id == id)
            .map(|(_, slot)| slot);
        match slot {
            Some(slot @ CheckSlot::Pending) => {
                self.risk_score += result.risk;
                *slot = CheckSlot::Resolved(result);
                true
            }
            Some(CheckSlot::Resolved(_)) => {
                log::warn!("⚠️ Check {} already resolved; ignoring late result", id.key());
                false
            }
            None => {
                log::warn!("⚠️ No pending slot for check {}", id.key());
                false
            }
        }
    }

    pub fn risk_score(&self) -> u32 {
        self.risk_score
    }

    pub fn max_risk(&self) -> u32 {
        self.max_risk
    }

    /// Rounded percentage of the nominal maximum.
    pub fn percentage(&self) -> u32 {
        if self.max_risk == 0 {
            return 0;
        }
        ((f64::from(self.risk_score) / f64::from(self.max_risk)) * 100.0).round() as u32
    }

    /// Recomputed on every call; an async slot may have landed since.
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.risk_score, self.max_risk)
    }

    pub fn assessment(&self) -> RiskAssessment {
        RiskAssessment {
            level: self.risk_level(),
            percentage: self.percentage(),
        }
    }

    /// Slots in catalogue order.
    pub fn results(&self) -> &[(CheckId, CheckSlot)] {
        &self.results
    }

    pub fn get(&self, id: CheckId) -> Option<&CheckSlot> {
        self.results
            .iter()
            .find(|(slot_id, _)| *slot_id == id)
            .map(|(_, slot)| slot)
    }

    pub fn pending_checks(&self) -> Vec<CheckId> {
        self.results
            .iter()
            .filter(|(_, slot)| matches!(slot, CheckSlot::Pending))
            .map(|(id, _)| *id)
            .collect()
    }

    /// True once every async slot has resolved.
    pub fn is_complete(&self) -> bool {
        self.results
            .iter()
            .all(|(_, slot)| !matches!(slot, CheckSlot::Pending))
    }

    /// Suspicious resolved checks, in catalogue order.
    pub fn anomalies(&self) -> Vec<(CheckId, &CheckResult)> {
        self.results
            .iter()
            .filter_map(|(id, slot)| slot.result().map(|r| (*id, r)))
            .filter(|(_, result)| result.suspicious)
            .collect()
    }
}

impl Serialize for RiskReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry("results", &ResultsMap(&self.results))?;
        map.serialize_entry("riskScore", &self.risk_score)?;
        map.serialize_entry("maxRisk", &self.max_risk)?;
        map.serialize_entry("riskLevel", &self.assessment())?;
        map.serialize_entry("complete", &self.is_complete())?;
        map.end()
    }
}

/// Results as an ordered `{ checkKey: slot }` object.
struct ResultsMap<'a>(&'a [(CheckId, CheckSlot)]);

impl Serialize for ResultsMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, slot) in self.0 {
            map.serialize_entry(id.key(), slot)?;
        }
        map.end()
    }
}

/// Downloadable snapshot of a report plus page identity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskReportExport {
    pub timestamp: String,
    pub risk_score: u32,
    pub max_risk: u32,
    pub risk_level: RiskAssessment,
    pub complete: bool,
    pub results: serde_json::Value,
    pub user_agent: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckDetail;

    fn plugins(risk: u32) -> CheckResult {
        CheckResult::scored(risk, CheckDetail::Plugins { count: 0 })
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(RiskLevel::from_score(0, 10), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(3, 10), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(4, 10), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(6, 10), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(7, 10), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(25, 10), RiskLevel::High);
    }

    #[test]
    fn test_tier_exact_boundaries_other_max() {
        // 40% and 70% of 20.
        assert_eq!(RiskLevel::from_score(8, 20), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(14, 20), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(13, 20), RiskLevel::Medium);
        // 40% of 28 is 11.2.
        assert_eq!(RiskLevel::from_score(11, 28), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(12, 28), RiskLevel::Medium);
    }

    #[test]
    fn test_tier_monotonic() {
        for max in 1..30 {
            let mut previous = RiskLevel::Low;
            for score in 0..60 {
                let level = RiskLevel::from_score(score, max);
                assert!(level >= previous, "score {} max {}", score, max);
                previous = level;
            }
        }
    }

    #[test]
    fn test_zero_max() {
        assert_eq!(RiskLevel::from_score(0, 0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(1, 0), RiskLevel::High);
    }

    #[test]
    fn test_score_is_sum_and_unclamped() {
        let mut report = RiskReport::new(10);
        report.record(CheckId::UserAgent, plugins(3));
        report.record(CheckId::WebDriver, plugins(4));
        report.record(CheckId::Languages, plugins(2));
        report.record(CheckId::Canvas, plugins(3));
        assert_eq!(report.risk_score(), 12);
        assert_eq!(report.percentage(), 120);
        assert_eq!(report.risk_level(), RiskLevel::High);
    }

    #[test]
    fn test_resolve_once() {
        let mut report = RiskReport::new(10);
        report.record(CheckId::Plugins, plugins(1));
        report.mark_pending(CheckId::PermissionStates);
        assert!(!report.is_complete());
        assert_eq!(report.pending_checks(), vec![CheckId::PermissionStates]);

        assert!(report.resolve(CheckId::PermissionStates, plugins(2)));
        assert_eq!(report.risk_score(), 3);
        assert!(report.is_complete());

        // A second resolution is ignored.
        assert!(!report.resolve(CheckId::PermissionStates, plugins(2)));
        assert_eq!(report.risk_score(), 3);

        // Unknown slot.
        assert!(!report.resolve(CheckId::Audio, plugins(2)));
        assert_eq!(report.risk_score(), 3);
    }

    #[test]
    fn test_anomalies_in_order() {
        let mut report = RiskReport::new(10);
        report.record(CheckId::UserAgent, plugins(0));
        report.record(CheckId::Plugins, plugins(1));
        report.mark_pending(CheckId::PermissionStates);
        report.record(CheckId::NavigatorAnomalies, plugins(2));

        let ids: Vec<CheckId> = report.anomalies().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![CheckId::Plugins, CheckId::NavigatorAnomalies]);
    }

    #[test]
    fn test_serialized_shape() {
        let mut report = RiskReport::new(10);
        report.record(CheckId::Plugins, plugins(1));
        report.mark_pending(CheckId::PermissionStates);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["riskScore"], 1);
        assert_eq!(json["maxRisk"], 10);
        assert_eq!(json["complete"], false);
        assert_eq!(json["riskLevel"]["level"], "LOW");
        assert_eq!(json["results"]["plugins"]["status"], "resolved");
        assert_eq!(json["results"]["plugins"]["risk"], 1);
        assert_eq!(json["results"]["plugins"]["detail"]["kind"], "plugins");
        assert_eq!(json["results"]["permissionStates"]["status"], "pending");
    }
}
