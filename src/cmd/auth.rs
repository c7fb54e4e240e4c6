//! Session commands: `quadrant login|logout|whoami`.

use anyhow::Result;
use console::style;

use quadrant::auth::session_from_config;
use quadrant::config::QuadrantConfig;
use quadrant::ui::icons::{CHECK, USER};

pub async fn cmd_login(config: &QuadrantConfig) -> Result<()> {
    let auth = session_from_config(config);
    if let Some(identity) = auth.restore()? {
        println!(
            "{}Already signed in as {} ({})",
            USER,
            identity.display_label(),
            identity.uid
        );
        return Ok(());
    }
    let identity = auth.sign_in().await?;
    println!(
        "{}Signed in as {} via {}",
        CHECK,
        identity.display_label(),
        identity.provider
    );
    Ok(())
}

pub async fn cmd_logout(config: &QuadrantConfig) -> Result<()> {
    let auth = session_from_config(config);
    auth.sign_out().await?;
    println!("{}Signed out", CHECK);
    Ok(())
}

pub fn cmd_whoami(config: &QuadrantConfig) -> Result<()> {
    let auth = session_from_config(config);
    match auth.restore()? {
        Some(identity) => {
            println!("{}{}", USER, style(identity.display_label()).bold());
            println!("  uid:      {}", identity.uid);
            println!("  provider: {}", identity.provider);
        }
        None => println!("Not signed in ({} provider)", auth.provider_name()),
    }
    Ok(())
}
