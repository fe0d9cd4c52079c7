// Serde helper modules for custom serialization/deserialization
//
// Durations in the configuration file are plain integers: milliseconds for
// simulation timing, seconds for network timeouts.

/// Module for serializing Duration as whole milliseconds
/// Use with #[serde(with = "crate::utils::duration_millis")]
pub mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Module for serializing Duration as whole seconds
/// Use with #[serde(with = "crate::utils::duration_secs")]
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(seconds))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Timing {
        #[serde(with = "super::duration_millis")]
        step: Duration,
        #[serde(with = "super::duration_secs")]
        timeout: Duration,
    }

    #[test]
    fn test_duration_formats() {
        let timing = Timing {
            step: Duration::from_millis(600),
            timeout: Duration::from_secs(90),
        };
        let json = serde_json::to_value(&timing).unwrap();
        assert_eq!(json["step"], 600);
        assert_eq!(json["timeout"], 90);

        let parsed: Timing = serde_json::from_str(r#"{"step": 250, "timeout": 5}"#).unwrap();
        assert_eq!(parsed.step, Duration::from_millis(250));
        assert_eq!(parsed.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_negative_duration_is_rejected() {
        assert!(serde_json::from_str::<Timing>(r#"{"step": -1, "timeout": 5}"#).is_err());
    }
}
