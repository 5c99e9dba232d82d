/*
 *  display/traits.rs
 *
 *  ilipanel - ILI8960 panel control
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for the lcd class abstraction
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

use crate::display::error::DisplayError;

/// Framebuffer blanking levels, as carried by the `lcd_power` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankMode {
    /// Screen on, panel driven
    Unblank = 0,
    /// Screen blanked, panel still powered
    Normal = 1,
    VsyncSuspend = 2,
    HsyncSuspend = 3,
    /// Panel powered down
    Powerdown = 4,
}

impl BlankMode {
    /// Numeric level as written to / read from `lcd_power`
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Map a raw blank level, rejecting anything outside 0..=4
    pub fn from_level(level: u64) -> Result<Self, DisplayError> {
        match level {
            0 => Ok(BlankMode::Unblank),
            1 => Ok(BlankMode::Normal),
            2 => Ok(BlankMode::VsyncSuspend),
            3 => Ok(BlankMode::HsyncSuspend),
            4 => Ok(BlankMode::Powerdown),
            other => Err(DisplayError::InvalidArgument(
                format!("blank level {} outside 0..=4", other)
            )),
        }
    }
}

/// Video timing request handed down from the display manager
///
/// Only the resolution matters to the panels handled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoMode {
    pub xres: u32,
    pub yres: u32,
}

impl VideoMode {
    pub fn new(xres: u32, yres: u32) -> Self {
        Self { xres, yres }
    }
}

/// Properties published alongside a registered lcd device object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LcdProperties {
    /// Upper bound accepted by the `contrast` attribute
    pub max_contrast: u8,
}

/// Operations the lcd class invokes on a panel driver
///
/// This is the table a driver hands over when it registers its lcd device
/// object. The class layer (attribute writes, display-manager notifications)
/// is the only caller; drivers never call into each other through it.
pub trait LcdOps {
    /// Apply a blank level; only `Unblank` drives the panel
    fn set_power(&mut self, power: BlankMode) -> Result<(), DisplayError>;

    /// Current blank level from cached state
    fn get_power(&self) -> BlankMode;

    /// Write the contrast register
    fn set_contrast(&mut self, contrast: u8) -> Result<(), DisplayError>;

    /// Last contrast written, when the driver caches it
    ///
    /// Drivers that only ever write contrast return `None`, which the class
    /// reports as an unsupported read.
    fn get_contrast(&self) -> Option<u8> {
        None
    }

    /// Check a requested video mode against the panel
    fn set_mode(&mut self, mode: &VideoMode) -> Result<(), DisplayError>;

    /// Largest contrast value the panel accepts
    fn max_contrast(&self) -> u8;
}
