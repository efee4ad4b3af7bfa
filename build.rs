//! Build script for the keycloak-pkce crate.
//!
//! Exposes the OIDC client configuration to `AuthConfig::from_env()` through
//! `option_env!()`. Variables already set in the environment win over
//! `.env`, which wins over the `.env.example` defaults.

use std::env;
use std::fs;
use std::path::Path;

const OIDC_VARS: [&str; 7] = [
    "OIDC_CLIENT_ID",
    "OIDC_AUTHORIZATION_ENDPOINT",
    "OIDC_TOKEN_ENDPOINT",
    "OIDC_REDIRECT_URI",
    "OIDC_SCOPE",
    "OIDC_LOGOUT_ENDPOINT",
    "OIDC_LOGOUT_REDIRECT",
];

fn main() {
    println!("cargo:rerun-if-changed=.env");
    println!("cargo:rerun-if-changed=.env.example");
    for var in OIDC_VARS {
        println!("cargo:rerun-if-env-changed={var}");
    }

    let root = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo");
    let root = Path::new(&root);

    let Some(contents) = [".env", ".env.example"]
        .iter()
        .find_map(|name| fs::read_to_string(root.join(name)).ok())
    else {
        return;
    };

    for (key, value) in contents.lines().filter_map(parse_line) {
        if OIDC_VARS.contains(&key) && env::var(key).is_err() {
            println!("cargo:rustc-env={key}={value}");
        }
    }
}

/// Parses a `KEY=value` line, skipping blanks and `#` comments.
fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    Some((key.trim(), value.trim().trim_matches('"')))
}
