// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command-line interface.

use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone)]
#[command(name = "anatomy_host")]
#[command(about = "Drives an anatomy widget camera session over stdin/stdout", long_about = None)]
pub struct Cli {
    /// Scene file (RON, or JSON with a .json extension)
    #[arg(long)]
    pub scene: PathBuf,

    /// Start hidden, regardless of the scene file
    #[arg(long, default_value = "false")]
    pub hidden: bool,

    /// Override the scene's reveal delay, in milliseconds
    #[arg(long = "delay-ms")]
    pub delay_ms: Option<u64>,
}

impl Cli {
    /// Directory that relative asset paths resolve against
    pub fn assets_dir(&self) -> Option<PathBuf> {
        self.scene.parent().map(Path::to_path_buf)
    }
}
