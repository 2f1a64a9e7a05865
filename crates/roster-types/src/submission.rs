use serde::{Deserialize, Serialize};

use crate::error::{TypeError, ValidationError};
use crate::temporal::Timestamp;

/// An ordered, append-only sequence of submissions.
pub type Ledger = Vec<Submission>;

/// One committed ledger record.
///
/// Fields are already normalized: `name` and `phone` are trimmed and
/// non-empty, `linkedin` is trimmed and absent rather than empty. The
/// serialized field order is `name`, `phone`, `linkedin`, `timestamp`, and
/// `linkedin` is omitted when absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSubmission")]
pub struct Submission {
    name: String,
    phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    linkedin: Option<String>,
    timestamp: Timestamp,
}

impl Submission {
    /// Build a record from already-normalized fields.
    ///
    /// Unlike [`SubmissionDraft::validate`] this does not trim; untrimmed or
    /// empty values are rejected so that a record never changes shape when it
    /// is re-encoded.
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        linkedin: Option<String>,
        timestamp: Timestamp,
    ) -> Result<Self, TypeError> {
        let name = name.into();
        let phone = phone.into();
        require_normalized("name", &name)?;
        require_normalized("phone", &phone)?;
        if let Some(link) = &linkedin {
            require_normalized("linkedin", link)?;
        }
        Ok(Self { name, phone, linkedin, timestamp })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn linkedin(&self) -> Option<&str> {
        self.linkedin.as_deref()
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

fn require_normalized(field: &str, value: &str) -> Result<(), TypeError> {
    if value.is_empty() {
        return Err(TypeError::InvalidRecord(format!("{field} is empty")));
    }
    if value.trim() != value {
        return Err(TypeError::InvalidRecord(format!(
            "{field} has surrounding whitespace"
        )));
    }
    Ok(())
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSubmission {
    name: String,
    phone: String,
    #[serde(default)]
    linkedin: Option<String>,
    timestamp: Timestamp,
}

impl TryFrom<RawSubmission> for Submission {
    type Error = TypeError;

    fn try_from(raw: RawSubmission) -> Result<Self, Self::Error> {
        Submission::new(raw.name, raw.phone, raw.linkedin, raw.timestamp)
    }
}

/// Unvalidated submission input as it arrives from the public form.
///
/// Missing `name`/`phone` deserialize as empty strings so that they surface
/// as a [`ValidationError`] rather than a parse error. Unknown fields are
/// rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmissionDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub linkedin: Option<String>,
}

impl SubmissionDraft {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            linkedin: None,
        }
    }

    pub fn with_linkedin(mut self, linkedin: impl Into<String>) -> Self {
        self.linkedin = Some(linkedin.into());
        self
    }

    /// Trim every field, check the required ones, and stamp the record.
    pub fn validate(self, at: Timestamp) -> Result<Submission, ValidationError> {
        let name = self.name.trim();
        let phone = self.phone.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        if phone.is_empty() {
            return Err(ValidationError::MissingPhone);
        }
        let linkedin = self
            .linkedin
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);

        Ok(Submission {
            name: name.to_string(),
            phone: phone.to_string(),
            linkedin,
            timestamp: at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> Timestamp {
        Timestamp::from_unix_secs(1_714_564_800).unwrap()
    }

    #[test]
    fn validate_trims_fields() {
        let draft = SubmissionDraft::new("  Ada Lovelace ", "\t555-0100\n")
            .with_linkedin(" https://linkedin.com/in/ada ");
        let record = draft.validate(ts()).unwrap();
        assert_eq!(record.name(), "Ada Lovelace");
        assert_eq!(record.phone(), "555-0100");
        assert_eq!(record.linkedin(), Some("https://linkedin.com/in/ada"));
        assert_eq!(record.timestamp(), ts());
    }

    #[test]
    fn validate_drops_blank_linkedin() {
        let record = SubmissionDraft::new("Ada", "1").with_linkedin("   ").validate(ts()).unwrap();
        assert_eq!(record.linkedin(), None);
    }

    #[test]
    fn linkedin_is_not_format_checked() {
        let record = SubmissionDraft::new("Ada", "1").with_linkedin("not a url").validate(ts()).unwrap();
        assert_eq!(record.linkedin(), Some("not a url"));
    }

    #[test]
    fn validate_rejects_blank_required_fields() {
        assert_eq!(
            SubmissionDraft::new("   ", "555").validate(ts()).unwrap_err(),
            ValidationError::MissingName
        );
        assert_eq!(
            SubmissionDraft::new("Ada", "").validate(ts()).unwrap_err(),
            ValidationError::MissingPhone
        );
    }

    #[test]
    fn draft_rejects_unknown_fields() {
        let err = serde_json::from_str::<SubmissionDraft>(r#"{"name":"a","phone":"b","email":"c"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn draft_missing_phone_is_validation_error() {
        let draft: SubmissionDraft = serde_json::from_str(r#"{"name":"Ada"}"#).unwrap();
        assert_eq!(draft.validate(ts()).unwrap_err(), ValidationError::MissingPhone);
    }

    #[test]
    fn serialized_field_order_and_omission() {
        let record = SubmissionDraft::new("Ada", "555").validate(ts()).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"name":"Ada","phone":"555","timestamp":"2024-05-01T12:00:00Z"}"#);

        let linked = SubmissionDraft::new("Ada", "555").with_linkedin("x").validate(ts()).unwrap();
        let json = serde_json::to_string(&linked).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Ada","phone":"555","linkedin":"x","timestamp":"2024-05-01T12:00:00Z"}"#
        );
    }

    #[test]
    fn stored_record_must_be_normalized() {
        let padded = r#"{"name":" Ada","phone":"555","timestamp":"2024-05-01T12:00:00Z"}"#;
        assert!(serde_json::from_str::<Submission>(padded).is_err());

        let empty_link = r#"{"name":"Ada","phone":"555","linkedin":"","timestamp":"2024-05-01T12:00:00Z"}"#;
        assert!(serde_json::from_str::<Submission>(empty_link).is_err());

        let extra = r#"{"name":"Ada","phone":"555","timestamp":"2024-05-01T12:00:00Z","x":1}"#;
        assert!(serde_json::from_str::<Submission>(extra).is_err());
    }

    #[test]
    fn new_rejects_untrimmed() {
        let err = Submission::new("Ada ", "555", None, ts()).unwrap_err();
        assert!(matches!(err, TypeError::InvalidRecord(_)));
    }
}
