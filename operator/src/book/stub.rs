//! Helper methods only available for tests

use expect_test::{expect_file, ExpectFile};
use http::StatusCode;
use k8s_openapi::api::core::v1::Pod;
use kube::Resource;

use crate::{
    book::{Book, BookSpec},
    utils::test::ApiServerVerifier,
};

pub const TEST_UID: &str = "1f0c2a9e-4b7d-4c1e-8a3f-5e6d7c8b9a01";

// Add tests specific implementation to the Book
impl Book {
    /// A normal test book, namespaced and with a uid as if read from the apiserver.
    pub fn test() -> Self {
        let mut book = Book::new(
            "test",
            BookSpec {
                book: "Kubernetes Interview Guide".to_owned(),
                year: 2024,
            },
        );
        book.meta_mut().namespace = Some("test".to_owned());
        book.meta_mut().uid = Some(TEST_UID.to_owned());
        book
    }
    /// Modify a book to have an expected spec
    pub fn with_spec(self, spec: BookSpec) -> Self {
        Self { spec, ..self }
    }
}

/// How the stub apiserver answers the pod create request.
#[derive(Debug)]
pub enum CreateResponse {
    /// Echo the created pod back.
    Created,
    /// Fail with the given status and reason.
    Failed(StatusCode, &'static str),
}

/// Stub of expected requests during reconciliation.
///
/// Default expectations are found in `./testdata/default_stubs`.
/// Use `UPDATE_EXPECT=1 cargo test` to update them.
#[derive(Debug)]
pub struct Stub {
    /// Expected GET of the book pod, answered with the pod or NotFound.
    pub get_pod: (ExpectFile, Option<Pod>),
    /// Expected create of the book pod, if the reconciler should create it.
    pub create_pod: Option<(ExpectFile, CreateResponse)>,
}

impl Default for Stub {
    fn default() -> Self {
        Self {
            get_pod: (expect_file!["./testdata/default_stubs/get_pod"], None),
            create_pod: Some((
                expect_file!["./testdata/default_stubs/create_pod"],
                CreateResponse::Created,
            )),
        }
    }
}

impl Stub {
    /// Expect the pod to already exist, no create should follow.
    pub fn with_existing_pod(self, pod: Pod) -> Self {
        Self {
            get_pod: (self.get_pod.0, Some(pod)),
            create_pod: None,
        }
    }
}

impl ApiServerVerifier {
    /// Run a test with the given stub.
    ///
    /// NB: If the controller is making more calls than we are handling in the stub,
    /// you then typically see a `KubeError(Service(Closed(())))` from the reconciler.
    ///
    /// You should await the `JoinHandle` (with a timeout) from this function to ensure that the
    /// stub runs to completion (i.e. all expected calls were responded to),
    /// using the timeout to catch missing api calls to Kubernetes.
    pub fn run(mut self, stub: Stub) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            // We need to handle each expected call in sequence
            self.handle_request_response(&stub.get_pod.0, stub.get_pod.1.as_ref())
                .await
                .expect("pod get should pass");
            match stub.create_pod {
                Some((expected, CreateResponse::Created)) => {
                    self.handle_create(&expected)
                        .await
                        .expect("pod should be created");
                }
                Some((expected, CreateResponse::Failed(status, reason))) => {
                    self.handle_error(&expected, status, reason)
                        .await
                        .expect("pod create should fail");
                }
                None => {}
            }
        })
    }
}
