/*
 *  display/error.rs
 *
 *  ilipanel - ILI8960 panel control
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error types for the panel subsystem
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

use std::fmt;
use std::error::Error;

/// Unified error type for all panel operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayError {
    /// SPI channel setup or register write failed
    SpiError(String),

    /// LCD device object or attribute registration failed
    RegistrationFailed(String),

    /// Per-device state could not be allocated
    AllocationFailed(String),

    /// Out-of-range or unparsable input at the attribute boundary
    InvalidArgument(String),

    /// Operation not supported by this panel
    UnsupportedOperation,

    /// Attribute is not writable (or not readable)
    PermissionDenied(String),

    /// No attribute of that name on the device
    NoSuchAttribute(String),

    /// No bound device with that id
    NoDevice(u32),

    /// No registered driver matches the device
    NoDriver(String),

    /// Resource already in use
    Busy(String),
}

impl DisplayError {
    /// Wrap a transport-level error, keeping its debug rendering intact
    pub fn spi<E: fmt::Debug>(err: E) -> Self {
        DisplayError::SpiError(format!("{:?}", err))
    }

    /// Closest errno for the error, as a sysfs write would report it
    pub fn errno(&self) -> i32 {
        match self {
            DisplayError::SpiError(_) => -5,              // EIO
            DisplayError::RegistrationFailed(_) => -17,   // EEXIST
            DisplayError::AllocationFailed(_) => -12,     // ENOMEM
            DisplayError::InvalidArgument(_) => -22,      // EINVAL
            DisplayError::UnsupportedOperation => -6,     // ENXIO
            DisplayError::PermissionDenied(_) => -13,     // EACCES
            DisplayError::NoSuchAttribute(_) => -2,       // ENOENT
            DisplayError::NoDevice(_) => -19,             // ENODEV
            DisplayError::NoDriver(_) => -19,
            DisplayError::Busy(_) => -16,                 // EBUSY
        }
    }
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::SpiError(msg) =>
                write!(f, "SPI communication error: {}", msg),
            DisplayError::RegistrationFailed(msg) =>
                write!(f, "Registration failed: {}", msg),
            DisplayError::AllocationFailed(msg) =>
                write!(f, "Allocation failed: {}", msg),
            DisplayError::InvalidArgument(msg) =>
                write!(f, "Invalid argument: {}", msg),
            DisplayError::UnsupportedOperation =>
                write!(f, "Operation not supported by this panel"),
            DisplayError::PermissionDenied(attr) =>
                write!(f, "Permission denied on attribute '{}'", attr),
            DisplayError::NoSuchAttribute(attr) =>
                write!(f, "No such attribute: {}", attr),
            DisplayError::NoDevice(id) =>
                write!(f, "No bound device with id {}", id),
            DisplayError::NoDriver(alias) =>
                write!(f, "No driver registered for '{}'", alias),
            DisplayError::Busy(msg) =>
                write!(f, "Resource busy: {}", msg),
        }
    }
}

impl Error for DisplayError {}
