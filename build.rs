use anyhow::Result;
use vergen::{vergen, Config};

fn main() -> Result<()> {
    // trigger recompilation when a new migration is added
    println!("cargo:rerun-if-changed=migrations-sqlx");

    // Source archives carry no git metadata, which only costs us the release
    // name reported to Sentry.
    if let Err(error) = vergen(Config::default()) {
        println!("cargo:warning=Skipping build metadata: {}", error);
    }

    Ok(())
}
