use anyhow::Result;
use daycal_core::OwnerId;
use daycal_core::identity::IdentityService;
use owo_colors::OwoColorize;

use crate::commands::App;

pub async fn login(app: &App, owner: String) -> Result<()> {
    let owner = owner.trim();
    if owner.is_empty() {
        anyhow::bail!("Owner must not be empty");
    }

    let owner = OwnerId::new(owner);
    app.session_file.save(Some(&owner)).await?;
    app.session.sign_in(owner.clone());

    // Pull the new owner's events so the offline mirror is theirs
    let events = app.events().await?;
    println!(
        "{} Signed in as {} ({} events)",
        "✓".green(),
        owner.bold(),
        events.len()
    );
    Ok(())
}

pub async fn logout(app: &App) -> Result<()> {
    let Some(owner) = app.session.current() else {
        println!("{}", "Not signed in".dimmed());
        return Ok(());
    };

    app.session_file.save(None).await?;
    app.session.sign_out();
    println!("{} Signed out {}", "✓".green(), owner);
    Ok(())
}

pub fn whoami(app: &App) -> Result<()> {
    match app.session.current() {
        Some(owner) => println!("{}", owner),
        None => println!("{}", "Not signed in".dimmed()),
    }
    Ok(())
}
