use anyhow::{Context as _, Result};
use declarative::HostLogger;
use std::io;
use std::sync::Arc;

use crate::Context;
use crate::build::DockerCli;
use crate::cli::ServeArgs;
use crate::config::ProviderConfig;
use crate::provider::DockerBuildkitProvider;
use crate::serve::{self, Outbox};

pub fn run(ctx: &Context, args: ServeArgs) -> Result<()> {
    let config = ProviderConfig::load(ctx.config.as_deref())
        .context("Failed to load provider config")?
        .with_overrides(args.docker, args.builder, args.jobs);
    log::debug!("{config:?}");

    let outbox = Arc::new(Outbox::new(io::stdout()));
    let host: Arc<dyn HostLogger> = outbox.clone();
    let tool = DockerCli::new(config.docker_program(), config.builder.clone());
    let provider = DockerBuildkitProvider::new(host, Box::new(tool));

    serve::serve(&provider, io::stdin().lock(), &*outbox, config.jobs)
}
