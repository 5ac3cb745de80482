use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid value for {field}: {value}")]
pub struct ParseEnumError {
    pub field: &'static str,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Parsing is case-insensitive and ignores surrounding whitespace.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                $(
                    if wanted.eq_ignore_ascii_case($s) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(ParseEnumError {
                    field: stringify!($name),
                    value: s.into(),
                })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(EventType {
    Report => "REPORT",
    Prescription => "PRESCRIPTION",
    Surgery => "SURGERY",
});

str_enum!(Severity {
    High => "HIGH",
    Medium => "MEDIUM",
    Low => "LOW",
});

/// Triage urgency shares the three-level scale of report severity.
pub type TriageUrgency = Severity;

str_enum!(RequestUrgency {
    Normal => "NORMAL",
    Critical => "CRITICAL",
});

str_enum!(BloodGroup {
    APos => "A+",
    ANeg => "A-",
    BPos => "B+",
    BNeg => "B-",
    AbPos => "AB+",
    AbNeg => "AB-",
    OPos => "O+",
    ONeg => "O-",
});

impl Default for EventType {
    fn default() -> Self {
        Self::Report
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::Low
    }
}
