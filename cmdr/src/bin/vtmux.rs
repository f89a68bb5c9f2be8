// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use clap::Parser;
use r3bl_vtmux_cmdr::{CLIArg, run_app};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> miette::Result<()> {
    let cli_arg = CLIArg::parse();
    run_app(&cli_arg)
}
