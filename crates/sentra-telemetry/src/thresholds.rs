//! Static threshold rules for ingested metrics.
//!
//! Each numeric field is evaluated independently; a missing or
//! non-numeric field never alerts. There is no suppression window:
//! every breaching submission produces a new alert.

use sentra_core::models::alert::AlertSeverity;
use serde_json::{Value, json};

/// An alert the engine wants to create for a metric submission.
#[derive(Debug, Clone)]
pub struct AlertDraft {
    pub alert_type: &'static str,
    pub severity: AlertSeverity,
    pub message: String,
    pub details: Value,
}

/// Evaluate one metric payload against the rule table.
///
/// Only `system` and `security` metric types carry rules; everything
/// else is stored but never alerts.
pub fn evaluate(metric_type: &str, data: &Value) -> Vec<AlertDraft> {
    let mut drafts = Vec::new();

    match metric_type {
        "system" => {
            usage_gauge(&mut drafts, data, "cpu_percent", "cpu", "CPU usage", 90.0, 80.0);
            usage_gauge(
                &mut drafts,
                data,
                "memory_percent",
                "memory",
                "Memory usage",
                90.0,
                80.0,
            );
            usage_gauge(
                &mut drafts,
                data,
                "disk_percent",
                "disk",
                "Disk usage",
                90.0,
                75.0,
            );
        }
        "security" => {
            if data.get("firewall_enabled").and_then(Value::as_bool) == Some(false) {
                drafts.push(AlertDraft {
                    alert_type: "security",
                    severity: AlertSeverity::Error,
                    message: "Firewall is disabled".into(),
                    details: json!({ "firewall_enabled": false }),
                });
            }
            if data.get("antivirus_enabled").and_then(Value::as_bool) == Some(false) {
                drafts.push(AlertDraft {
                    alert_type: "security",
                    severity: AlertSeverity::Error,
                    message: "Antivirus is disabled".into(),
                    details: json!({ "antivirus_enabled": false }),
                });
            }
            if let Some(updates) = data.get("updates_available").and_then(Value::as_u64) {
                if updates > 10 {
                    drafts.push(AlertDraft {
                        alert_type: "updates",
                        severity: AlertSeverity::Warning,
                        message: format!("{updates} updates available"),
                        details: json!({ "updates_available": updates }),
                    });
                }
            }
        }
        _ => {}
    }

    drafts
}

/// Percentage gauge: `critical` and below that `warn`, else nothing.
fn usage_gauge(
    drafts: &mut Vec<AlertDraft>,
    data: &Value,
    field: &str,
    alert_type: &'static str,
    label: &str,
    critical: f64,
    warn: f64,
) {
    let Some(value) = data.get(field).and_then(Value::as_f64) else {
        return;
    };

    if value >= critical {
        drafts.push(AlertDraft {
            alert_type,
            severity: AlertSeverity::Critical,
            message: format!("{label} critical: {value}%"),
            details: json!({ field: value }),
        });
    } else if value >= warn {
        drafts.push(AlertDraft {
            alert_type,
            severity: AlertSeverity::Warning,
            message: format!("{label} high: {value}%"),
            details: json!({ field: value }),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_critical_at_ninety() {
        let drafts = evaluate("system", &json!({ "cpu_percent": 95.0 }));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].alert_type, "cpu");
        assert_eq!(drafts[0].severity, AlertSeverity::Critical);
        assert_eq!(drafts[0].message, "CPU usage critical: 95%");

        // Boundary is inclusive.
        let at_edge = evaluate("system", &json!({ "cpu_percent": 90.0 }));
        assert_eq!(at_edge[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn cpu_warning_band() {
        let drafts = evaluate("system", &json!({ "cpu_percent": 85 }));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].severity, AlertSeverity::Warning);
        assert_eq!(drafts[0].message, "CPU usage high: 85%");
    }

    #[test]
    fn healthy_system_is_quiet() {
        let drafts = evaluate(
            "system",
            &json!({ "cpu_percent": 12.5, "memory_percent": 40, "disk_percent": 60 }),
        );
        assert!(drafts.is_empty());
    }

    #[test]
    fn disk_warns_earlier_than_cpu() {
        let drafts = evaluate("system", &json!({ "disk_percent": 78 }));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].alert_type, "disk");
        assert_eq!(drafts[0].severity, AlertSeverity::Warning);

        // 78% CPU is still fine.
        assert!(evaluate("system", &json!({ "cpu_percent": 78 })).is_empty());
    }

    #[test]
    fn every_field_evaluates_independently() {
        let drafts = evaluate(
            "system",
            &json!({ "cpu_percent": 95, "memory_percent": 85, "disk_percent": 91 }),
        );
        assert_eq!(drafts.len(), 3);
        let severities: Vec<_> = drafts.iter().map(|d| d.severity).collect();
        assert_eq!(
            severities,
            vec![
                AlertSeverity::Critical,
                AlertSeverity::Warning,
                AlertSeverity::Critical
            ]
        );
    }

    #[test]
    fn missing_fields_never_alert() {
        assert!(evaluate("system", &json!({})).is_empty());
        assert!(evaluate("system", &json!({ "cpu_percent": "busy" })).is_empty());
    }

    #[test]
    fn security_rules() {
        let drafts = evaluate(
            "security",
            &json!({ "firewall_enabled": false, "antivirus_enabled": false, "updates_available": 23 }),
        );
        assert_eq!(drafts.len(), 3);
        assert_eq!(drafts[0].severity, AlertSeverity::Error);
        assert_eq!(drafts[0].message, "Firewall is disabled");
        assert_eq!(drafts[1].message, "Antivirus is disabled");
        assert_eq!(drafts[2].severity, AlertSeverity::Warning);
        assert_eq!(drafts[2].message, "23 updates available");
    }

    #[test]
    fn security_absent_flags_do_not_alert() {
        // A payload that omits the flags entirely is not a breach.
        assert!(evaluate("security", &json!({})).is_empty());
        assert!(
            evaluate(
                "security",
                &json!({ "firewall_enabled": true, "antivirus_enabled": true, "updates_available": 3 })
            )
            .is_empty()
        );
    }

    #[test]
    fn unknown_metric_types_are_silent() {
        assert!(evaluate("network", &json!({ "cpu_percent": 99 })).is_empty());
    }
}
