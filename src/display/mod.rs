/*
 *  display/mod.rs
 *
 *  ilipanel - ILI8960 panel control
 *  (c) 2020-26 Stuart Hunter
 *
 *  Panel subsystem - bus framework, lcd class and drivers
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod attribute;

// lcd class and SPI bus framework
pub mod lcd;
pub mod bus;

// Panel drivers (conditionally compiled based on features)
pub mod drivers;

// Re-exports for convenience
pub use traits::{BlankMode, LcdOps, LcdProperties, VideoMode};
pub use error::DisplayError;
pub use attribute::{parse_ulong, DeviceAttribute};
pub use lcd::{LcdClass, LcdHost, LcdId};
pub use bus::{ConfigurableSpi, DeviceId, PmOps, SpiBus, SpiDriver, SpiPeripheral, SpiSetup};

#[cfg(feature = "driver-ili8960")]
pub use drivers::ili8960::Ili8960;
