use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

// ── DataConverter ─────────────────────────────────────────────────────────────

/// Lenient conversions for the loosely-typed fields the analysis service
/// returns. The backend is not consistent about numbers vs numeric strings,
/// and frequently sends `null` for absent text.
pub struct DataConverter;

impl DataConverter {
    /// Coerce a JSON value into a monetary amount.
    ///
    /// * number → its value (non-finite → `0.0`)
    /// * string → parsed after trimming and removing `,` grouping; `0.0` if
    ///   it does not parse
    /// * anything else (including `null`) → `0.0`
    pub fn amount(value: &Value) -> f64 {
        let parsed = match value {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => {
                let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
                match cleaned.parse::<f64>() {
                    Ok(v) => v,
                    Err(_) => {
                        if !cleaned.is_empty() {
                            debug!(value = %s, "non-numeric amount treated as zero");
                        }
                        0.0
                    }
                }
            }
            _ => 0.0,
        };

        if parsed.is_finite() {
            parsed
        } else {
            0.0
        }
    }

    /// Coerce a JSON value into display text.
    ///
    /// Strings pass through, `null` becomes `""`, numbers and booleans are
    /// rendered with their JSON spelling.
    pub fn text(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        }
    }

    /// Coerce a JSON value into a flag.
    ///
    /// Booleans pass through, numbers are `true` when non-zero, and the
    /// strings `"true"`, `"yes"` and `"1"` (any case) are `true`. Everything
    /// else, `null` included, is `false`.
    pub fn flag(value: &Value) -> bool {
        match value {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
            _ => false,
        }
    }

    /// Read an optional non-negative integer counter, accepting numeric strings.
    pub fn counter(value: &Value) -> Option<u64> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }
    }
}

// ── serde adapters ────────────────────────────────────────────────────────────

/// `deserialize_with` adapter for amount fields; see [`DataConverter::amount`].
pub fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(DataConverter::amount(&value))
}

/// `deserialize_with` adapter for text fields; see [`DataConverter::text`].
pub fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(DataConverter::text(&value))
}

/// `deserialize_with` adapter for optional counters; see
/// [`DataConverter::counter`].
pub fn lenient_counter<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(DataConverter::counter(&value))
}

/// `deserialize_with` adapter for flags; see [`DataConverter::flag`].
pub fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(DataConverter::flag(&value))
}

/// `deserialize_with` adapter for optional amounts; `null` stays `None`.
pub fn lenient_optional_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => Some(DataConverter::amount(&other)),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
