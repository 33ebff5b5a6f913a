//! # Status Command
//!
//! Shows what the controller sees for one Service.

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::{Secret, Service};
use kube::{api::Api, Client};
use serving_cert_keystore_controller::constants::{
    TLS_CERT_KEY, TLS_PKCS12_KEY, TLS_PKCS12_PASSWORD_KEY, TLS_PRIVATE_KEY_KEY,
};
use serving_cert_keystore_controller::controller::reconciler::annotations::ServingCertAnnotations;
use serving_cert_keystore_controller::controller::reconciler::decision::{
    decide, keystore_state, KeystoreAction, KeystoreState,
};
use serving_cert_keystore_controller::keystore::inspect_pkcs12;

/// Show annotations, target secret and keystore state of a Service
pub async fn status_command(client: Client, service: &str, ns: &str) -> Result<()> {
    println!("📊 Status for Service '{ns}/{service}'");
    println!();

    let services: Api<Service> = Api::namespaced(client.clone(), ns);
    let svc = services
        .get(service)
        .await
        .with_context(|| format!("Failed to get Service '{ns}/{service}'"))?;

    let annotations = ServingCertAnnotations::from_service(&svc);
    println!("Annotations:");
    println!(
        "  Secret: {}",
        annotations.secret_name.as_deref().unwrap_or("<not set>")
    );
    println!("  Create PKCS#12: {}", annotations.create_pkcs12);

    let Some(secret_name) = annotations.secret_name else {
        println!();
        println!("Service is not opted in, the controller ignores it.");
        return Ok(());
    };

    let secrets: Api<Secret> = Api::namespaced(client, ns);
    let Some(secret) = secrets
        .get_opt(&secret_name)
        .await
        .with_context(|| format!("Failed to get Secret '{ns}/{secret_name}'"))?
    else {
        println!();
        println!("⚠️  Secret '{ns}/{secret_name}' does not exist yet (waiting for the service CA)");
        return Ok(());
    };

    println!();
    println!("Secret '{secret_name}':");
    for key in [TLS_CERT_KEY, TLS_PRIVATE_KEY_KEY, TLS_PKCS12_KEY, TLS_PKCS12_PASSWORD_KEY] {
        let size = field(&secret, key).map_or(0, <[u8]>::len);
        if size > 0 {
            println!("  {key}: {size} bytes");
        } else {
            println!("  {key}: <absent>");
        }
    }

    let state = keystore_state(&secret);
    println!();
    println!("Keystore: {}", describe_state(state));
    if state == KeystoreState::Present {
        print_keystore_contents(&secret);
    }

    println!(
        "Next reconciliation: {}",
        match decide(annotations.create_pkcs12, &secret) {
            KeystoreAction::Create => "create keystore",
            KeystoreAction::Remove => "remove keystore",
            KeystoreAction::NoOp => "nothing to do",
        }
    );

    Ok(())
}

fn field<'a>(secret: &'a Secret, key: &str) -> Option<&'a [u8]> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(|value| value.0.as_slice())
}

fn describe_state(state: KeystoreState) -> &'static str {
    match state {
        KeystoreState::Present => "present",
        KeystoreState::Absent => "absent",
        KeystoreState::Partial => "partial (will be repaired)",
    }
}

fn print_keystore_contents(secret: &Secret) {
    let keystore = field(secret, TLS_PKCS12_KEY).unwrap_or_default();
    let password = String::from_utf8_lossy(field(secret, TLS_PKCS12_PASSWORD_KEY).unwrap_or_default());

    match inspect_pkcs12(keystore, &password) {
        Ok(contents) => {
            println!(
                "  Subject CN: {}",
                contents.subject_common_name.as_deref().unwrap_or("<none>")
            );
            println!("  Serial: {}", contents.serial_number);
            println!("  Private key: {}", contents.has_private_key);
            println!("  CA certificates: {}", contents.ca_certificates);
        }
        Err(e) => println!("  ⚠️  Keystore does not decode with the stored password: {e}"),
    }
}
