//! # Encode / Inspect Commands
//!
//! Offline keystore handling, no cluster access needed.

use anyhow::{Context, Result};
use serving_cert_keystore_controller::keystore::{encode_pkcs12, generate_password, inspect_pkcs12};
use std::path::Path;
use zeroize::Zeroizing;

/// Build a keystore from PEM files with a freshly generated password
pub fn encode_command(
    cert: &Path,
    key: &Path,
    out: &Path,
    password_out: Option<&Path>,
) -> Result<()> {
    let password = encode_to_files(cert, key, out, password_out)?;

    println!("✅ Keystore written to {}", out.display());
    match password_out {
        Some(path) => println!("   Password written to {}", path.display()),
        None => println!("{}", password.as_str()),
    }
    Ok(())
}

fn encode_to_files(
    cert: &Path,
    key: &Path,
    out: &Path,
    password_out: Option<&Path>,
) -> Result<Zeroizing<String>> {
    let cert_pem = std::fs::read(cert)
        .with_context(|| format!("Failed to read certificate {}", cert.display()))?;
    let key_pem = Zeroizing::new(
        std::fs::read(key).with_context(|| format!("Failed to read private key {}", key.display()))?,
    );

    let password = Zeroizing::new(generate_password()?);
    let keystore = encode_pkcs12(&cert_pem, &key_pem, &password)
        .context("Failed to build PKCS#12 keystore")?;

    std::fs::write(out, &keystore)
        .with_context(|| format!("Failed to write keystore {}", out.display()))?;
    if let Some(path) = password_out {
        std::fs::write(path, password.as_bytes())
            .with_context(|| format!("Failed to write password {}", path.display()))?;
    }

    Ok(password)
}

/// Read a password file, dropping one trailing newline
pub fn read_password_file(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read password file {}", path.display()))?;
    Ok(raw
        .strip_suffix('\n')
        .map(|s| s.strip_suffix('\r').unwrap_or(s))
        .unwrap_or(&raw)
        .to_string())
}

/// Decode a keystore and print its contents as JSON
pub fn inspect_command(keystore: &Path, password: &str) -> Result<()> {
    let bytes = std::fs::read(keystore)
        .with_context(|| format!("Failed to read keystore {}", keystore.display()))?;
    let contents = inspect_pkcs12(&bytes, password)
        .with_context(|| format!("Failed to decode keystore {}", keystore.display()))?;

    println!("{}", serde_json::to_string_pretty(&contents)?);
    Ok(())
}
