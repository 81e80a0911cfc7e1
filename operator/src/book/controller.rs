use std::{sync::Arc, time::Duration};

use futures::stream::StreamExt;
use k8s_openapi::{api::core::v1::Pod, apimachinery::pkg::apis::meta::v1::OwnerReference};
use kube::{
    runtime::{
        controller::Action,
        watcher::{self, Config},
        Controller,
    },
    Api, Resource, ResourceExt,
};
use opentelemetry::KeyValue;
use tracing::{debug, error, info};

use crate::{
    book::{
        pod::{pod_name, pod_spec},
        Book, SpecError,
    },
    labels::MANAGED_BY_LABEL_SELECTOR,
    utils::{create_pod, get_pod, Context},
};

/// Handle errors during reconciliation.
fn on_error(book: Arc<Book>, error: &Error, _context: Arc<Context>) -> Action {
    error!(book = book.name_any(), %error, "reconcile failed");
    Action::requeue(Duration::from_secs(5))
}

/// Errors produced by the reconcile function.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Kube error: {source}")]
    Kube {
        #[from]
        source: kube::Error,
    },
    #[error("Invalid spec: {source}")]
    InvalidSpec {
        #[from]
        source: SpecError,
    },
    #[error("Book is missing metadata.{0}")]
    MissingMetadata(&'static str),
}

/// Start a controller for the Book CRD.
pub async fn run(cx: Arc<Context>) -> anyhow::Result<()> {
    let books: Api<Book> = Api::all(cx.k_client.clone());
    let pods = Api::<Pod>::all(cx.k_client.clone());

    Controller::new(books, Config::default())
        .owns(
            pods,
            watcher::Config::default().labels(MANAGED_BY_LABEL_SELECTOR),
        )
        .shutdown_on_signal()
        .run(reconcile, on_error, cx)
        .for_each(|rec_res| async move {
            match rec_res {
                Ok((book, _)) => {
                    debug!(book.name, book.namespace, "reconcile success");
                }
                Err(err) => {
                    error!(?err, "reconcile error")
                }
            }
        })
        .await;
    info!("book controller terminated");
    Ok(())
}

/// Perform a reconcile pass for the Book CRD
async fn reconcile(book: Arc<Book>, cx: Arc<Context>) -> Result<Action, Error> {
    let runs = cx.metrics.reconciles.clone();
    match reconcile_(book, cx).await {
        Ok(action) => {
            runs.add(1, &[KeyValue::new("result", "ok")]);
            Ok(action)
        }
        Err(err) => {
            runs.add(1, &[KeyValue::new("result", "err")]);
            Err(err)
        }
    }
}

/// Ensure the companion pod of a book exists.
///
/// An existing pod is left untouched even when it no longer matches the book.
async fn reconcile_(book: Arc<Book>, cx: Arc<Context>) -> Result<Action, Error> {
    book.spec.validate()?;

    let name = book.name_any();
    let ns = book.namespace().ok_or(Error::MissingMetadata("namespace"))?;
    info!(
        name,
        namespace = ns,
        book = book.spec.book,
        year = book.spec.year,
        "reconciling book"
    );

    let pod = pod_name(&name);
    match get_pod(cx.clone(), &ns, &pod).await {
        Ok(Some(_)) => {
            info!(pod, namespace = ns, "pod already exists");
            return Ok(Action::await_change());
        }
        Ok(None) => {}
        Err(err) => {
            error!(%err, pod, namespace = ns, "failed to get pod");
            return Err(err.into());
        }
    }

    // Block deletion of the book until garbage collection removed its pod.
    let oref = book
        .controller_owner_ref(&())
        .map(|oref| OwnerReference {
            block_owner_deletion: Some(true),
            ..oref
        })
        .ok_or(Error::MissingMetadata("uid"))?;

    info!(pod, namespace = ns, "creating pod");
    if let Err(err) = create_pod(
        cx.clone(),
        &ns,
        vec![oref],
        &pod,
        pod_spec(&book.spec, &cx.pod_config),
    )
    .await
    {
        error!(%err, pod, namespace = ns, "failed to create pod");
        return Err(err.into());
    }

    cx.metrics.pods_created.add(1, &[]);
    info!(pod, namespace = ns, "pod created");
    Ok(Action::await_change())
}
