//! CLI auth command handlers for setup, status, and logout.

use crate::auth::{CredentialStore, DeviceAuthorization};
use crate::config::DecanterConfig;

/// Handle `decanter setup`.
pub async fn handle_setup(
    config: &DecanterConfig,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = config.credential_store();
    if !force && store.load()?.is_some() {
        println!("✅ Already set up for {}", config.host);
        println!("   Run `decanter setup --force` to authorize again.");
        return Ok(());
    }

    let client = config.device_flow_client()?;
    let credential = client.authorize(print_prompt).await?;
    store.save(&credential)?;

    println!("✅ Device authorized!");
    println!("   Credential saved to {}", store.path().display());
    Ok(())
}

fn print_prompt(authorization: &DeviceAuthorization) {
    println!("🔗 Visit: {}", authorization.verification_uri);
    println!("📋 Enter code: {}", authorization.user_code);
    println!("⏳ Waiting for authorization...");
}

/// Handle `decanter status`.
pub async fn handle_status(config: &DecanterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = config.credential_store();

    println!("🔐 Authentication Status\n");
    println!("  Host: {}", config.host);
    println!("  Profile: {}", config.profile);

    let status = match store.load() {
        Ok(Some(credential)) => match credential.expiry {
            Some(expiry) if expiry > chrono::Utc::now() => format!(
                "✅ Authorized (token expires {})",
                expiry.format("%Y-%m-%d %H:%M")
            ),
            Some(_) => "✅ Authorized (token refreshes on next call)".to_string(),
            None => "✅ Authorized".to_string(),
        },
        Ok(None) => "❌ Not set up, run `decanter setup`".to_string(),
        Err(e) => format!("⚠️  Error: {e}"),
    };
    println!("  Credential: {status}");

    let client = match (&config.client_id, &config.client_secret) {
        (Some(_), Some(_)) => "✅ Configured",
        _ => "❌ Missing (DECANTER_CLIENT_ID / DECANTER_CLIENT_SECRET)",
    };
    println!("  OAuth client: {client}");
    Ok(())
}

/// Handle `decanter logout`.
pub async fn handle_logout(config: &DecanterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = config.credential_store();
    store.clear()?;
    println!("✅ Logged out from {}", config.host);
    Ok(())
}
