//! External tool invocations
//!
//! Every interaction with a cluster goes through an immutable [`Command`]
//! built by a small per-tool builder ([`Kubectl`], [`Helm`], [`Gcloud`],
//! [`Minikube`], [`Eksctl`], [`Kind`]) and executed by a [`Runner`].
//!
//! The runner is injected through `InputParams`, so the whole engine can be
//! exercised against [`MockRunner`] without invoking real binaries.

mod command;
mod eksctl;
mod gcloud;
mod helm;
mod kind;
mod kubectl;
mod minikube;
mod mock;
mod runner;

pub use command::{Command, CommandBuilder, REDACTED};
pub use eksctl::Eksctl;
pub use gcloud::Gcloud;
pub use helm::Helm;
pub use kind::Kind;
pub use kubectl::Kubectl;
pub use minikube::Minikube;
pub use mock::MockRunner;
pub use runner::{HttpRequest, HttpResponse, ProcessRunner, Runner};
