use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string form is also the serde wire form. Extra `| "alias"` literals
/// are accepted on input only.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal $(| $alias:literal)*),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s $(, alias = $alias)*)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s $(| $alias)* => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Gender {
    Male => "male",
    Female => "female",
    Other => "other",
});

str_enum!(Perspective {
    FirstPerson => "first-person",
    ThirdPerson => "third-person",
});

// The intake form's select submits the capitalized labels.
str_enum!(ConsciousnessLevel {
    Alert => "alert" | "Alert",
    Drowsy => "drowsy" | "Drowsy",
    Unresponsive => "unresponsive" | "Unresponsive",
});

// Target language tag for translation.
str_enum!(Language {
    English => "en",
    Persian => "fa",
});

// Preferred language of the patient for the treatment plan.
str_enum!(LanguagePreference {
    English => "english",
    Persian => "persian",
});

// Speaker of a turn as presented to the model.
str_enum!(TurnRole {
    Model => "model",
    User => "user",
});

impl Language {
    /// Human-readable name used inside prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Persian => "Persian (Farsi)",
        }
    }
}

impl Default for LanguagePreference {
    fn default() -> Self {
        Self::English
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn gender_round_trip() {
        for (variant, s) in [
            (Gender::Male, "male"),
            (Gender::Female, "female"),
            (Gender::Other, "other"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(Gender::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn perspective_uses_hyphenated_form() {
        assert_eq!(Perspective::FirstPerson.as_str(), "first-person");
        assert_eq!(
            serde_json::to_string(&Perspective::ThirdPerson).unwrap(),
            "\"third-person\""
        );
        let parsed: Perspective = serde_json::from_str("\"first-person\"").unwrap();
        assert_eq!(parsed, Perspective::FirstPerson);
    }

    #[test]
    fn language_tags() {
        assert_eq!(Language::from_str("fa").unwrap(), Language::Persian);
        assert_eq!(Language::English.to_string(), "en");
        assert_eq!(Language::Persian.display_name(), "Persian (Farsi)");
    }

    #[test]
    fn invalid_value_rejected() {
        let err = ConsciousnessLevel::from_str("asleep").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
        assert!(serde_json::from_str::<Gender>("\"unknown\"").is_err());
    }

    #[test]
    fn consciousness_accepts_form_labels() {
        let parsed: ConsciousnessLevel = serde_json::from_str("\"Drowsy\"").unwrap();
        assert_eq!(parsed, ConsciousnessLevel::Drowsy);
        assert_eq!(
            ConsciousnessLevel::from_str("Unresponsive").unwrap(),
            ConsciousnessLevel::Unresponsive
        );
        assert_eq!(
            ConsciousnessLevel::from_str("alert").unwrap(),
            ConsciousnessLevel::Alert
        );
        // Output keeps the lowercase form.
        assert_eq!(
            serde_json::to_string(&ConsciousnessLevel::Alert).unwrap(),
            "\"alert\""
        );
        assert!(ConsciousnessLevel::from_str("ALERT").is_err());
    }

    #[test]
    fn language_preference_defaults_to_english() {
        assert_eq!(LanguagePreference::default(), LanguagePreference::English);
    }
}
