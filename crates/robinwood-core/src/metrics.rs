use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// What a pipeline's sizes are counted in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeUnit {
    Bytes,
    Chars,
}

/// Savings summary attached to every pipeline result.
///
/// `saved` is signed: an operation that expands the payload (a pretty-printed
/// JSON block, say) reports a negative saving rather than zero. On the wire
/// it is `savedBytes` or `savedChars` depending on `unit`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metrics {
    pub saved: i64,
    pub compression_ratio: String,
    pub unit: SizeUnit,
}

impl Serialize for Metrics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("Metrics", 2)?;
        match self.unit {
            SizeUnit::Bytes => st.serialize_field("savedBytes", &self.saved)?,
            SizeUnit::Chars => st.serialize_field("savedChars", &self.saved)?,
        }
        st.serialize_field("compressionRatio", &self.compression_ratio)?;
        st.end()
    }
}

/// Derive saved size and percentage ratio from before/after sizes.
pub fn calculate_metrics(original_size: usize, final_size: usize, unit: SizeUnit) -> Metrics {
    let saved = original_size as i64 - final_size as i64;
    let ratio = if original_size > 0 {
        format!("{:.2}", saved as f64 / original_size as f64 * 100.0)
    } else {
        "0.00".to_string()
    };
    Metrics {
        saved,
        compression_ratio: format!("{ratio}%"),
        unit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_percent_saving() {
        let m = calculate_metrics(1000, 800, SizeUnit::Bytes);
        assert_eq!(m.saved, 200);
        assert_eq!(m.compression_ratio, "20.00%");
    }

    #[test]
    fn empty_original_is_zero_ratio() {
        let m = calculate_metrics(0, 0, SizeUnit::Chars);
        assert_eq!(m.saved, 0);
        assert_eq!(m.compression_ratio, "0.00%");
    }

    #[test]
    fn expansion_reported_as_negative() {
        let m = calculate_metrics(100, 150, SizeUnit::Chars);
        assert_eq!(m.saved, -50);
        assert_eq!(m.compression_ratio, "-50.00%");
    }

    #[test]
    fn ratio_rounds_to_two_decimals() {
        let m = calculate_metrics(3, 2, SizeUnit::Bytes);
        assert_eq!(m.compression_ratio, "33.33%");
    }

    #[test]
    fn serializes_unit_specific_key() {
        let json = serde_json::to_value(calculate_metrics(10, 5, SizeUnit::Bytes)).unwrap();
        assert_eq!(json, serde_json::json!({"savedBytes": 5, "compressionRatio": "50.00%"}));

        let json = serde_json::to_value(calculate_metrics(10, 12, SizeUnit::Chars)).unwrap();
        assert_eq!(json, serde_json::json!({"savedChars": -2, "compressionRatio": "-20.00%"}));
    }
}
