use crate::{errors::Error, Result};

/// The model's trigger token and the shorthand users type instead of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggerWords {
    pub token: String,
    pub alias: String,
}

impl TriggerWords {
    pub fn new(token: impl Into<String>, alias: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let alias = alias.into();
        if token.is_empty() || alias.is_empty() {
            return Err(Error::Config(
                "trigger word and trigger word alias must not be empty".to_string(),
            ));
        }
        Ok(Self { token, alias })
    }

    /// Replace every literal occurrence of the alias with the trigger token.
    pub fn substitute(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(Error::EmptyPrompt);
        }
        if !text.contains(&self.alias) {
            return Err(Error::MissingAlias {
                alias: self.alias.clone(),
            });
        }
        Ok(text.replace(&self.alias, &self.token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words() -> TriggerWords {
        TriggerWords::new("subject", "xyz").unwrap()
    }

    #[test]
    fn replaces_alias() {
        assert_eq!(
            words().substitute("a xyz portrait").unwrap(),
            "a subject portrait"
        );
    }

    #[test]
    fn replaces_every_occurrence() {
        assert_eq!(
            words().substitute("xyz and xyz, xyzxyz").unwrap(),
            "subject and subject, subjectsubject"
        );
    }

    #[test]
    fn missing_alias_is_rejected() {
        let err = words().substitute("a plain portrait").unwrap_err();
        assert!(matches!(err, Error::MissingAlias { alias } if alias == "xyz"));
    }

    #[test]
    fn empty_text_is_rejected() {
        assert!(matches!(
            words().substitute("   ").unwrap_err(),
            Error::EmptyPrompt
        ));
    }

    #[test]
    fn alias_is_matched_literally() {
        let w = TriggerWords::new("TOK", "a.b").unwrap();
        assert!(w.substitute("axb").is_err());
        assert_eq!(w.substitute("photo of a.b").unwrap(), "photo of TOK");
    }

    #[test]
    fn empty_words_are_a_config_error() {
        assert!(matches!(
            TriggerWords::new("", "x").unwrap_err(),
            Error::Config(_)
        ));
    }
}
