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

//! fancontrol-gui - Sensor browser and fancontrol configuration editor
//!
//! The binary wires [`fc_core`] to a command line: it loads settings,
//! applies overrides, initializes logging and runs the requested command.

pub mod app;
pub mod cli;

pub use fc_core;
