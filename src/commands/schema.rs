use anyhow::Result;

use crate::schema;

pub fn run(version: &str) -> Result<()> {
    let spec = schema::package_spec(version);
    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}
