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

//! Command implementations

use anyhow::{Context, Result};
use std::io::{self, Write};
use tracing::{debug, info, warn};

use fc_core::{find_sensor, AppContext, Event, FanControl, Loader, Sensor, SensorKind};

use crate::cli::{set_setting, Cli, Commands, ServiceCommands, SettingsCommands};

/// Dispatch the parsed command line
pub async fn run(cli: &Cli, ctx: &AppContext) -> Result<()> {
    match cli.command() {
        Commands::Run => {
            if cli.once {
                run_once(ctx, cli.interval, cli.save, &mut io::stdout().lock())
            } else {
                run_polling(ctx, cli).await
            }
        }
        Commands::Status => {
            ctx.bootstrap()?;
            write_status(&ctx.loader().read(), &mut io::stdout().lock())?;
            Ok(())
        }
        Commands::Show => {
            ctx.bootstrap()?;
            let mut loader = ctx.loader().write();
            print!("{}", loader.create_config_file());
            Ok(())
        }
        Commands::Service(cmd) => cmd_service(ctx, &cmd),
        Commands::Settings(cmd) => cmd_settings(ctx, &cmd),
    }
}

/// Read every sensor once, optionally change the interval and save, then
/// print the result
pub fn run_once(
    ctx: &AppContext,
    interval: Option<i64>,
    save: bool,
    out: &mut dyn Write,
) -> Result<()> {
    ctx.bootstrap()?;
    let mut loader = ctx.loader().write();
    if let Some(secs) = interval {
        loader.set_interval(secs)?;
    }
    loader.update_sensors();
    if save {
        let path = loader.save(None)?;
        writeln!(out, "Saved {}", path.display())?;
    }
    write_status(&loader, out)?;
    Ok(())
}

async fn run_polling(ctx: &AppContext, cli: &Cli) -> Result<()> {
    ctx.bootstrap()?;
    let mut events = ctx.subscribe();
    let handle = ctx.start().await?;

    if let Some(secs) = cli.interval {
        handle.set_interval(secs).await?;
    }
    if cli.save {
        let path = handle.save(None).await?;
        info!(path = ?path, "Configuration written");
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Interrupted, stopping");
                break;
            }
            event = events.recv() => match event {
                Some(Event::SensorsUpdated { tick, changed }) => {
                    debug!(tick, changed, "Sensors refreshed");
                }
                Some(Event::ErrorChanged(error)) if !error.is_empty() => {
                    warn!(%error, "Loader reported an error");
                }
                Some(Event::ServiceFinished { method, outcome }) => match outcome {
                    Ok(message) => info!(%method, %message, "Service request finished"),
                    Err(error) => warn!(%method, %error, "Service request failed"),
                },
                Some(Event::LoopStopped) | None => break,
                Some(_) => {}
            }
        }
    }

    handle.stop().await;
    Ok(())
}

fn describe(sensor: &Sensor) -> String {
    let value = match &sensor.kind {
        SensorKind::Temperature(_) => format!("{:.1}°C", sensor.celsius().unwrap_or_default()),
        SensorKind::Fan(_) => format!("{} RPM", sensor.value),
        SensorKind::Pwm(_) => format!("{}", sensor.value),
    };
    let stale = if sensor.is_stale() { " [stale]" } else { "" };
    format!("  {:<16} {:>10}{}", sensor.display_name(), value, stale)
}

/// Source sensor, curve points and the duty the curve asks for right now
fn describe_control(loader: &Loader, control: &FanControl) -> String {
    let mut text = String::new();
    if let Some(source) = control.temp {
        text.push_str(&format!("  <- {}", source.token()));
    }
    let points: Vec<String> = control
        .points()
        .iter()
        .map(|(temp, duty)| format!("{}°C:{}", temp, duty))
        .collect();
    if !points.is_empty() {
        text.push_str(&format!("  curve {}", points.join(" ")));
    }
    let target = control
        .temp
        .and_then(|source| loader.sensor(source))
        .and_then(Sensor::celsius)
        .and_then(|celsius| control.pwm_for(celsius.round() as i64));
    if let Some(duty) = target {
        text.push_str(&format!("  target {}", duty));
    }
    text
}

/// Human readable listing of devices, sensors and configured outputs
pub fn write_status(loader: &Loader, out: &mut dyn Write) -> io::Result<()> {
    match loader.config_path() {
        Some(path) => writeln!(out, "Configuration: {}", path.display())?,
        None => writeln!(out, "Configuration: (none)")?,
    }
    writeln!(out, "Interval:      {}s", loader.interval())?;

    for hwmon in loader.hwmons() {
        writeln!(out)?;
        writeln!(out, "{} ({})", hwmon.token(), hwmon.name)?;
        for sensor in hwmon.sensors() {
            write!(out, "{}", describe(sensor))?;
            if let Some(control) = sensor.control() {
                write!(out, "{}", describe_control(loader, control))?;
            }
            writeln!(out)?;
        }
    }

    let orphans: Vec<String> = loader
        .model()
        .controls
        .keys()
        .filter(|pwm| find_sensor(loader.hwmons(), **pwm).is_none())
        .map(|pwm| pwm.token())
        .collect();
    if !orphans.is_empty() {
        writeln!(out)?;
        writeln!(out, "Not present: {}", orphans.join(" "))?;
    }

    if !loader.error().is_empty() {
        writeln!(out)?;
        writeln!(out, "Errors:")?;
        for line in loader.error().lines() {
            writeln!(out, "  {}", line)?;
        }
    }
    Ok(())
}

fn cmd_service(ctx: &AppContext, cmd: &ServiceCommands) -> Result<()> {
    let service = ctx.service();
    match cmd {
        ServiceCommands::Status => {
            println!("Unit:    {}", service.unit());
            println!("Status:  {}", service.check()?);
            println!("Active:  {}", service.is_active()?);
            println!("Enabled: {}", service.is_enabled()?);
        }
        ServiceCommands::Start => println!("{}", service.set_active(true)?),
        ServiceCommands::Stop => println!("{}", service.set_active(false)?),
        ServiceCommands::Restart => println!("{}", service.restart()?),
        ServiceCommands::Enable => println!("{}", service.set_enabled(true)?),
        ServiceCommands::Disable => println!("{}", service.set_enabled(false)?),
    }
    Ok(())
}

fn cmd_settings(ctx: &AppContext, cmd: &SettingsCommands) -> Result<()> {
    match cmd {
        SettingsCommands::Show => {
            println!("{}", serde_json::to_string_pretty(ctx.settings())?);
        }
        SettingsCommands::Path => {
            println!("{}", fc_core::get_settings_path()?.display());
        }
        SettingsCommands::Set(args) => {
            // Start from the stored file so command-line overrides are not persisted
            let mut settings = fc_core::load_settings().unwrap_or_default();
            set_setting(&mut settings, &args.key, &args.value).map_err(anyhow::Error::msg)?;
            fc_core::save_settings(&settings)
                .with_context(|| format!("Failed to save setting {}", args.key))?;
            println!("{} = {}", args.key, args.value);
        }
    }
    Ok(())
}
