//! # Serving-Cert Annotations
//!
//! Reads the two Service annotations that drive keystore management.

use crate::constants::{SERVING_CERT_CREATE_PKCS12_ANNOTATION, SERVING_CERT_SECRET_ANNOTATION};
use k8s_openapi::api::core::v1::Service;

/// Desired keystore state declared on a Service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServingCertAnnotations {
    /// Secret holding `tls.crt` / `tls.key`; `None` when the Service is not opted in
    pub secret_name: Option<String>,
    /// Whether a PKCS#12 keystore should exist in that secret
    pub create_pkcs12: bool,
}

impl ServingCertAnnotations {
    pub fn from_service(service: &Service) -> Self {
        let annotations = service.metadata.annotations.as_ref();

        let secret_name = annotations
            .and_then(|a| a.get(SERVING_CERT_SECRET_ANNOTATION))
            .filter(|name| !name.is_empty())
            .cloned();

        let create_pkcs12 = annotations
            .and_then(|a| a.get(SERVING_CERT_CREATE_PKCS12_ANNOTATION))
            .is_some_and(|value| parse_bool_lenient(value));

        Self {
            secret_name,
            create_pkcs12,
        }
    }
}

/// Parse a boolean the way Go's `strconv.ParseBool` does, treating anything
/// it would reject as `false`.
///
/// Accepted as true: `1`, `t`, `T`, `TRUE`, `true`, `True`.
/// `"yes"`, `"on"` or `" true"` are not booleans here and yield `false`.
#[must_use]
pub fn parse_bool_lenient(value: &str) -> bool {
    matches!(value, "1" | "t" | "T" | "TRUE" | "true" | "True")
}
