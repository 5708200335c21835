//! Out-of-band signer provisioning

use anyhow::{Context, Result, bail};
use relledger_core::signing::signing_key_from_hex;
use relledger_core::{DbHandle, User};

pub async fn add(db: DbHandle, username: String, key: String, scopes: Vec<String>) -> Result<()> {
    if username.is_empty() {
        bail!("Username must not be empty");
    }
    signing_key_from_hex(&key).context("Invalid signer key")?;

    db.put_user(User {
        username: username.clone(),
        key_material: key.trim().to_lowercase(),
        scopes: scopes.clone(),
    })
    .await
    .context("Failed to store user")?;

    println!("registered {username} for {}", scopes.join(", "));
    Ok(())
}

pub async fn show(db: DbHandle, username: String) -> Result<()> {
    let Some(user) = db.get_user(username.clone()).await? else {
        bail!("User not found: {username}");
    };
    println!("{}: {}", user.username, user.scopes.join(", "));
    Ok(())
}
