use anyhow::{Context as _, Result};

use crate::Context;
use crate::cli::DigestArgs;

pub fn run(ctx: &Context, args: &DigestArgs) -> Result<()> {
    let digest = buildcontext::hash_context(&args.context, &args.dockerfile).with_context(|| {
        format!("Failed to hash build context {}", args.context.display())
    })?;

    if ctx.verbose > 0 && !ctx.quiet {
        eprintln!(
            "{} ({})",
            args.context.display(),
            args.dockerfile.display()
        );
    }
    println!("{digest}");
    Ok(())
}
