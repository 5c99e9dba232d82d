/*
 *  display/attribute.rs
 *
 *  ilipanel - ILI8960 panel control
 *  (c) 2020-26 Stuart Hunter
 *
 *  sysfs-style device attributes
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

/// Renders the attribute's current value
pub type ShowFn<T> = fn(&T) -> Result<String, DisplayError>;

/// Parses a written buffer and applies it, returning the bytes consumed
pub type StoreFn<T> = fn(&mut T, &str) -> Result<usize, DisplayError>;

/// A named, permissioned read/write property exposed for one device type
///
/// `T` is the driver's per-device state; the bus hands it to the callbacks
/// directly, so no downcast is needed to get from attribute to device.
pub struct DeviceAttribute<T> {
    pub name: &'static str,
    /// Unix permission bits, e.g. `0o644`
    pub mode: u16,
    pub show: Option<ShowFn<T>>,
    pub store: Option<StoreFn<T>>,
}

// manual impls: a derive would wrongly demand `T: Clone`
impl<T> Clone for DeviceAttribute<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DeviceAttribute<T> {}

impl<T> DeviceAttribute<T> {
    pub const fn new(
        name: &'static str,
        mode: u16,
        show: Option<ShowFn<T>>,
        store: Option<StoreFn<T>>,
    ) -> Self {
        Self { name, mode, show, store }
    }

    pub fn is_readable(&self) -> bool {
        self.mode & 0o444 != 0 && self.show.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.mode & 0o222 != 0 && self.store.is_some()
    }

    /// Read the attribute from `dev`
    pub fn read(&self, dev: &T) -> Result<String, DisplayError> {
        match self.show {
            Some(show) if self.is_readable() => show(dev),
            _ => Err(DisplayError::PermissionDenied(self.name.to_string())),
        }
    }

    /// Write `buf` to the attribute on `dev`
    pub fn write(&self, dev: &mut T, buf: &str) -> Result<usize, DisplayError> {
        match self.store {
            Some(store) if self.is_writable() => store(dev, buf),
            _ => Err(DisplayError::PermissionDenied(self.name.to_string())),
        }
    }
}

/// Parse an unsigned integer the way `strict_strtoul(buf, 0, ..)` does
///
/// Base is picked from the prefix: `0x`/`0X` hex, a leading `0` octal,
/// anything else decimal. A single trailing newline (what `echo` appends)
/// is tolerated; any other stray character is rejected.
pub fn parse_ulong(buf: &str) -> Result<u64, DisplayError> {
    let text = buf.strip_suffix('\n').unwrap_or(buf);

    let (digits, radix) = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        (hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(DisplayError::InvalidArgument(
            format!("'{}' is not an unsigned integer", text)
        ));
    }

    u64::from_str_radix(digits, radix).map_err(|_| {
        DisplayError::InvalidArgument(format!("'{}' out of range", text))
    })
}
