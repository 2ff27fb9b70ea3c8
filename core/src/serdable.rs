pub use self::glob::GlobPattern;

pub mod glob {
    use std::ops::Deref;

    use ::glob::PatternError;
    use ::serde::{
        de::{self, Visitor},
        Deserialize, Serialize,
    };

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct GlobPattern(::glob::Pattern);

    impl GlobPattern {
        pub fn parse(pattern: &str) -> Result<Self, PatternError> {
            ::glob::Pattern::new(pattern).map(Self)
        }
    }

    impl Deref for GlobPattern {
        type Target = ::glob::Pattern;

        fn deref(&self) -> &Self::Target {
            &self.0
        }
    }

    impl Serialize for GlobPattern {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            serializer.serialize_str(self.0.as_str())
        }
    }

    impl<'de> Deserialize<'de> for GlobPattern {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            struct GlobPatternVisitor;

            impl<'de> Visitor<'de> for GlobPatternVisitor {
                type Value = GlobPattern;

                fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                    write!(f, "a glob pattern string")
                }

                fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Self::Value::parse(v).map_err(de::Error::custom)
                }
            }

            deserializer.deserialize_str(GlobPatternVisitor)
        }
    }

    #[cfg(test)]
    mod test {
        use super::*;

        #[derive(Debug, Deserialize)]
        struct Rule {
            pattern: GlobPattern,
        }

        #[test]
        fn deserialize_glob_pattern_from_toml() {
            let rule: Rule = toml::from_str(r#"pattern = "*.[jt]s""#).unwrap();
            assert!(rule.pattern.matches("solve.js"));
            assert!(rule.pattern.matches("solve.ts"));
            assert!(!rule.pattern.matches("solve.py"));
        }

        #[test]
        fn serialize_glob_pattern_as_plain_string() {
            let pat = GlobPattern::parse("*.py").unwrap();
            assert_eq!(serde_json::to_string(&pat).unwrap(), r#""*.py""#);
        }

        #[test]
        fn deserialize_glob_pattern_ng() {
            let res: Result<Rule, _> = toml::from_str(r#"pattern = "[a""#);
            assert!(res.is_err());
        }
    }
}

/// Serializes a [`Duration`](std::time::Duration) as fractional seconds.
pub mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(d.as_secs_f64())
    }
}
