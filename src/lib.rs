/*
 *  lib.rs
 *
 *  ilipanel - ILI8960 panel control
 *  (c) 2020-26 Stuart Hunter
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

//! # ilipanel
//!
//! Userspace driver for the Ilitek ILI8960 LCD controller on a Linux
//! `spidev` node, plus the small bus/lcd-class framework it plugs into.
//!
//! ```ignore
//! let mut bus = SpiBus::new(Box::new(LcdClass::new()));
//! bus.register_driver(Ili8960::driver(true))?;
//! let id = bus.attach("spi:ili8960", SpiPeripheral::new(spi, Delay))?;
//! bus.store_attribute(id, "brightness", "200\n")?;
//! ```

pub mod config;
pub mod display;
