/*
 * This file is part of fancontrol-gui.
 *
 * Copyright (C) 2025 fancontrol-gui contributors
 *
 * fancontrol-gui is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 2 of the License, or
 * (at your option) any later version.
 *
 * fancontrol-gui is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with fancontrol-gui. If not, see <https://www.gnu.org/licenses/>.
 */

use anyhow::Result;
use clap::Parser;
use tracing::{debug, warn};

use fancontrol_gui::{app, cli};
use fc_core::AppContext;

fn init_logging(filter: &str) {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let env_filter = std::env::var(cli::LOG_ENV).ok();
    init_logging(&args.log_filter(env_filter.as_deref()));

    let mut settings = match fc_core::load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            warn!(error = %e, "Could not load settings, using defaults");
            fc_core::AppSettings::default()
        }
    };
    args.apply(&mut settings);
    debug!(?settings, "Effective settings");

    let ctx = AppContext::new(settings);
    app::run(&args, &ctx).await
}
