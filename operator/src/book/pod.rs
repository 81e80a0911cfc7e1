use std::collections::BTreeMap;

use k8s_openapi::{
    api::core::v1::{Container, PodSpec, ResourceRequirements},
    apimachinery::pkg::api::resource::Quantity,
};

use crate::book::BookSpec;

/// Name of the single container in a book pod.
pub const CONTAINER_NAME: &str = "busybox";
/// Image used when none is configured, pinned for reproducibility.
pub const DEFAULT_IMAGE: &str = "busybox:1.36";

/// Operator wide settings for the pods created for books.
#[derive(Clone, Debug, PartialEq)]
pub struct PodConfig {
    /// Container image, must provide `sh` and `sleep`.
    pub image: String,
    /// Cpu resource request
    pub cpu_request: Quantity,
    /// Memory resource request
    pub memory_request: Quantity,
    /// Cpu resource limit
    pub cpu_limit: Quantity,
    /// Memory resource limit
    pub memory_limit: Quantity,
}

impl Default for PodConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_owned(),
            cpu_request: Quantity("100m".to_owned()),
            memory_request: Quantity("128Mi".to_owned()),
            cpu_limit: Quantity("200m".to_owned()),
            memory_limit: Quantity("256Mi".to_owned()),
        }
    }
}

impl PodConfig {
    fn resources(&self) -> ResourceRequirements {
        ResourceRequirements {
            requests: Some(BTreeMap::from_iter([
                ("cpu".to_owned(), self.cpu_request.clone()),
                ("memory".to_owned(), self.memory_request.clone()),
            ])),
            limits: Some(BTreeMap::from_iter([
                ("cpu".to_owned(), self.cpu_limit.clone()),
                ("memory".to_owned(), self.memory_limit.clone()),
            ])),
            ..Default::default()
        }
    }
}

const QUANTITY_SUFFIXES: &[&str] = &[
    "", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "n", "u", "m", "k", "M", "G", "T", "P", "E",
];

/// A resource quantity that Kubernetes would reject.
#[derive(Debug, thiserror::Error)]
#[error("invalid quantity {0:?}, expected a non negative number with an optional suffix such as 100m or 128Mi")]
pub struct QuantityError(String);

/// Parse a non negative resource quantity, e.g. `100m`, `1.5`, `128Mi` or `1e3`.
pub fn parse_quantity(value: &str) -> Result<Quantity, QuantityError> {
    let unsigned = value.strip_prefix('+').unwrap_or(value);
    let split = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(split);

    let digits = number.chars().filter(char::is_ascii_digit).count();
    let valid_number = digits > 0 && number.matches('.').count() <= 1;
    let valid_suffix = QUANTITY_SUFFIXES.contains(&suffix)
        || suffix
            .strip_prefix(&['e', 'E'][..])
            .map(|exponent| {
                let exponent = exponent.strip_prefix(&['+', '-'][..]).unwrap_or(exponent);
                !exponent.is_empty() && exponent.chars().all(|c| c.is_ascii_digit())
            })
            .unwrap_or(false);

    if valid_number && valid_suffix {
        Ok(Quantity(value.to_owned()))
    } else {
        Err(QuantityError(value.to_owned()))
    }
}

/// Name of the pod owned by the book with the given name.
pub fn pod_name(book_name: &str) -> String {
    format!("{book_name}-pod")
}

/// Shell loop printing the book title and year once per second.
pub fn pod_command(spec: &BookSpec) -> Vec<String> {
    vec![
        "sh".to_owned(),
        "-c".to_owned(),
        format!(
            "while true; do echo Book: {}, Year: {}; sleep 1; done",
            spec.book, spec.year
        ),
    ]
}

/// Desired pod spec for a book.
pub fn pod_spec(spec: &BookSpec, config: &PodConfig) -> PodSpec {
    PodSpec {
        containers: vec![Container {
            name: CONTAINER_NAME.to_owned(),
            image: Some(config.image.to_owned()),
            command: Some(pod_command(spec)),
            resources: Some(config.resources()),
            ..Default::default()
        }],
        ..Default::default()
    }
}
