//! Rule-based remediation suggestions.
//!
//! Alerts are classified by case-insensitive substring patterns on the alert
//! name. Categories are not exclusive: an alert named `LatencyAndOOM` gets
//! both latency and memory suggestions, always in table order.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::AlertInfo;

/// Placeholder used when the alert has no `service_name` label.
const SERVICE_PLACEHOLDER: &str = "<service>";

/// Remediation category an alert can fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Slow responses
    Latency,
    /// Elevated failure ratio
    ErrorRate,
    /// CPU saturation or throttling
    Cpu,
    /// Memory pressure or OOM kills
    Memory,
}

impl Category {
    /// Lowercase identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Latency => "latency",
            Self::ErrorRate => "error_rate",
            Self::Cpu => "cpu",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A titled, actionable remediation suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Short title
    pub title: String,
    /// Why this might help
    pub description: String,
    /// Command or step to take
    pub action: String,
}

/// Suggestion template. `{service}` in the action is filled from the alert.
struct Template {
    title: &'static str,
    description: &'static str,
    action: &'static str,
}

struct Rule {
    category: Category,
    patterns: &'static [&'static str],
    templates: &'static [Template],
}

/// Classification table, evaluated in order.
static RULES: &[Rule] = &[
    Rule {
        category: Category::Latency,
        patterns: &["latency"],
        templates: &[
            Template {
                title: "Check Database Query Performance",
                description: "High latency is often caused by unoptimized queries or missing indexes.",
                action: "Review slow query logs in your database provider or check APM traces for bottleneck spans.",
            },
            Template {
                title: "Scale Up Service Replicas",
                description: "If CPU/Memory is also high, the service might be underprovisioned for current traffic.",
                action: "kubectl scale deployment {service} --replicas=3",
            },
        ],
    },
    Rule {
        category: Category::ErrorRate,
        patterns: &["errorrate", "error_rate"],
        templates: &[
            Template {
                title: "Investigate Recent Deployments",
                description: "Spikes in error rates strongly correlate with recent code deployments.",
                action: "Check GitHub Actions or ArgoCD for recent rollouts to this service.",
            },
            Template {
                title: "Check Downstream Dependencies",
                description: "Ensure that upstream endpoints or databases are not rejecting connections or timing out.",
                action: "Review error logs in Loki for 'connection refused' or 'timeout' errors.",
            },
        ],
    },
    Rule {
        category: Category::Cpu,
        patterns: &["cpu", "throttling"],
        templates: &[Template {
            title: "Review CPU Limits",
            description: "The container might be getting heavily throttled by Kubernetes CPU limits.",
            action: "Consider increasing the CPU limit in the pod's resources configuration.",
        }],
    },
    Rule {
        category: Category::Memory,
        patterns: &["memory", "oom"],
        templates: &[Template {
            title: "Investigate Memory Leaks",
            description: "If memory climbs steadily until OOMKilled, there may be a memory leak.",
            action: "Capture a heap profile (pprof) and analyze memory allocations.",
        }],
    },
];

impl Rule {
    fn matches(&self, alert_name: &str) -> bool {
        self.patterns.iter().any(|p| alert_name.contains(p))
    }
}

/// Deterministic alert-name classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEngine;

impl RuleEngine {
    /// Create a rule engine over the built-in table.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Categories matched by the alert name, in table order.
    #[must_use]
    pub fn categories(&self, alert: &AlertInfo) -> Vec<Category> {
        self.matching(alert).map(|rule| rule.category).collect()
    }

    /// Suggestions for every matched category, in table order.
    ///
    /// Returns an empty list when nothing matches.
    #[must_use]
    pub fn suggestions(&self, alert: &AlertInfo) -> Vec<Suggestion> {
        let service = match alert.label("service_name") {
            "" => SERVICE_PLACEHOLDER,
            name => name,
        };

        self.matching(alert)
            .flat_map(|rule| rule.templates)
            .map(|t| Suggestion {
                title: t.title.to_string(),
                description: t.description.to_string(),
                action: t.action.replace("{service}", service),
            })
            .collect()
    }

    fn matching(&self, alert: &AlertInfo) -> impl Iterator<Item = &'static Rule> {
        let name = alert.name.to_lowercase();
        RULES.iter().filter(move |rule| rule.matches(&name))
    }
}
