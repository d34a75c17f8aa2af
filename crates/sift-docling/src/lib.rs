//! sift-docling - Client for the docling document-understanding service.
//!
//! Submits document buffers to an optional HTTP microservice with superior
//! layout understanding and maps its responses into the pipeline's result
//! shape. Exposes a cached health probe so the orchestrator never blocks
//! long when the service is down.
//!
//! # Example
//!
//! ```ignore
//! use sift_core::{DoclingConfig, ExtractionOptions};
//! use sift_docling::DoclingClient;
//!
//! let client = DoclingClient::new(DoclingConfig::new("http://localhost:8001"));
//! if client.is_available().await && client.supports("application/pdf") {
//!     let result = client
//!         .process(&bytes, "application/pdf", Some("report.pdf"), &ExtractionOptions::default())
//!         .await;
//! }
//! ```

mod client;

pub use client::DoclingClient;
