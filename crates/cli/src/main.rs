// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

use clap::Parser;
use std::process::ExitCode as StdExitCode;
use tbc_cli::Args;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> StdExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    tbc_cli::run(args).await.into()
}
