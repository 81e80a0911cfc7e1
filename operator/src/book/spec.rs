use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Shortest accepted title, in characters.
pub const MIN_TITLE_LEN: usize = 1;
/// Longest accepted title, in characters.
pub const MAX_TITLE_LEN: usize = 200;
/// Earliest accepted publication year.
pub const MIN_YEAR: i32 = 1900;
/// Latest accepted publication year.
pub const MAX_YEAR: i32 = 2100;

/// Primary CRD describing a book.
///
/// For every Book the operator keeps a single pod running that prints the title and year.
#[derive(CustomResource, Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "packt.com",
    version = "v1",
    kind = "Book",
    plural = "books",
    status = "BookStatus",
    derive = "PartialEq",
    namespaced
)]
pub struct BookSpec {
    /// Book title
    #[schemars(length(min = 1, max = 200))]
    pub book: String,
    /// Publication year
    #[schemars(range(min = 1900, max = 2100))]
    pub year: i32,
}

/// Observed state of a Book.
///
/// Reserved for future use, the operator does not report status.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone, JsonSchema)]
pub struct BookStatus {}

/// Reasons a BookSpec is rejected.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum SpecError {
    /// Title is empty or longer than allowed.
    #[error("book title must be between 1 and 200 characters, got {0}")]
    TitleLength(usize),
    /// Year outside the accepted range.
    #[error("year must be between 1900 and 2100, got {0}")]
    YearOutOfRange(i32),
}

impl BookSpec {
    /// Check the same constraints the CRD schema enforces.
    ///
    /// Guards against objects admitted by a CRD that was installed without its schema.
    pub fn validate(&self) -> Result<(), SpecError> {
        let len = self.book.chars().count();
        if !(MIN_TITLE_LEN..=MAX_TITLE_LEN).contains(&len) {
            return Err(SpecError::TitleLength(len));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&self.year) {
            return Err(SpecError::YearOutOfRange(self.year));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use kube::CustomResourceExt;

    use super::*;

    fn spec(book: &str, year: i32) -> BookSpec {
        BookSpec {
            book: book.to_owned(),
            year,
        }
    }

    #[test]
    fn valid_spec() {
        assert_eq!(spec("Kubernetes Interview Guide", 2024).validate(), Ok(()));
        assert_eq!(spec("x", MIN_YEAR).validate(), Ok(()));
        assert_eq!(spec(&"x".repeat(200), MAX_YEAR).validate(), Ok(()));
    }

    #[test]
    fn title_bounds() {
        assert_eq!(spec("", 2000).validate(), Err(SpecError::TitleLength(0)));
        assert_eq!(
            spec(&"x".repeat(201), 2000).validate(),
            Err(SpecError::TitleLength(201))
        );
        // Length is measured in characters, not bytes.
        assert_eq!(spec(&"é".repeat(200), 2000).validate(), Ok(()));
    }

    #[test]
    fn year_bounds() {
        assert_eq!(
            spec("Dune", 1899).validate(),
            Err(SpecError::YearOutOfRange(1899))
        );
        assert_eq!(
            spec("Dune", 2101).validate(),
            Err(SpecError::YearOutOfRange(2101))
        );
    }

    #[test]
    fn spec_deserializes_from_manifest_fields() {
        let parsed: BookSpec =
            serde_json::from_value(serde_json::json!({ "book": "Dune", "year": 1965 })).unwrap();
        assert_eq!(parsed, spec("Dune", 1965));
    }

    #[test]
    fn crd_identity() {
        let crd = Book::crd();
        assert_eq!(crd.spec.group, "packt.com");
        assert_eq!(crd.spec.names.kind, "Book");
        assert_eq!(crd.spec.names.plural, "books");
        assert_eq!(crd.spec.scope, "Namespaced");
        let version = &crd.spec.versions[0];
        assert_eq!(version.name, "v1");
        assert!(version
            .subresources
            .as_ref()
            .and_then(|s| s.status.as_ref())
            .is_some());
    }

    #[test]
    fn crd_schema_carries_constraints() {
        let crd = serde_json::to_value(Book::crd()).unwrap();
        let spec = &crd["spec"]["versions"][0]["schema"]["openAPIV3Schema"]["properties"]["spec"];
        assert_eq!(spec["properties"]["book"]["minLength"], 1);
        assert_eq!(spec["properties"]["book"]["maxLength"], 200);
        assert_eq!(spec["properties"]["year"]["minimum"], 1900.0);
        assert_eq!(spec["properties"]["year"]["maximum"], 2100.0);
        let mut required: Vec<_> = spec["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        required.sort();
        assert_eq!(required, vec!["book", "year"]);
    }
}
