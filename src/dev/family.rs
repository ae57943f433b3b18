//! Register maps of the supported port-expander families.
//!
//! All of these chips share the same layout: one input, output, polarity
//! and configuration register per 8-pin bank, with a configuration bit of 1
//! meaning "input".  Their polarity registers only affect the input port,
//! so output inversion always happens in software.

/// Register layout of a port-expander family.
#[derive(Debug, PartialEq, Eq)]
pub struct Family {
    pub name: &'static str,
    /// Address of the chip with `device_id` 0.
    pub base_address: u8,
    /// 8 or 16.
    pub pins_per_device: u8,
    pub input_reg: u8,
    pub output_reg: u8,
    /// Hardware input inversion.  `None` means inputs are inverted in
    /// software.
    pub polarity_reg: Option<u8>,
    /// Direction register, 1 = input.
    pub config_reg: u8,
}

impl Family {
    pub fn registers_per_device(&self) -> u8 {
        self.pins_per_device / 8
    }

    /// Bus address and register for register group `group` of a chain of
    /// chips starting at `address`.
    pub fn locate(&self, address: u8, group: usize, reg: u8) -> (u8, u8) {
        let per_device = usize::from(self.registers_per_device());
        let chip = (group / per_device) as u8;
        let bank = (group % per_device) as u8;
        (address + chip, reg + bank)
    }
}

/// `PCA9539` "16-bit I2C-bus and SMBus low power I/O port with interrupt and reset"
pub const PCA9539: Family = Family {
    name: "pca9539",
    base_address: 0x74,
    pins_per_device: 16,
    input_reg: 0x00,
    output_reg: 0x02,
    polarity_reg: Some(0x04),
    config_reg: 0x06,
};

/// `PCA9555` "16-bit I2C-bus and SMBus I/O port with interrupt"
pub const PCA9555: Family = Family {
    name: "pca9555",
    base_address: 0x20,
    pins_per_device: 16,
    input_reg: 0x00,
    output_reg: 0x02,
    polarity_reg: Some(0x04),
    config_reg: 0x06,
};

/// `TCA6408A` "Low-voltage 8-bit I2C and SMBus I/O expander"
pub const TCA6408: Family = Family {
    name: "tca6408",
    base_address: 0x20,
    pins_per_device: 8,
    input_reg: 0x00,
    output_reg: 0x01,
    polarity_reg: Some(0x02),
    config_reg: 0x03,
};

/// `PCA9554` "8-bit I2C-bus and SMBus I/O port with interrupt"
pub const PCA9554: Family = Family {
    name: "pca9554",
    base_address: 0x20,
    pins_per_device: 8,
    input_reg: 0x00,
    output_reg: 0x01,
    polarity_reg: Some(0x02),
    config_reg: 0x03,
};

/// `PCA9538` "8-bit I2C-bus and SMBus low power I/O port with interrupt and reset"
pub const PCA9538: Family = Family {
    name: "pca9538",
    base_address: 0x70,
    pins_per_device: 8,
    input_reg: 0x00,
    output_reg: 0x01,
    polarity_reg: Some(0x02),
    config_reg: 0x03,
};

/// Device families selectable through the `device` configuration item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Pca9539,
    Pca9555,
    Tca6408,
    Pca9554,
    Pca9538,
}

impl Device {
    pub const ALL: [Device; 5] = [
        Device::Pca9539,
        Device::Pca9555,
        Device::Tca6408,
        Device::Pca9554,
        Device::Pca9538,
    ];

    pub fn family(self) -> &'static Family {
        match self {
            Device::Pca9539 => &PCA9539,
            Device::Pca9555 => &PCA9555,
            Device::Tca6408 => &TCA6408,
            Device::Pca9554 => &PCA9554,
            Device::Pca9538 => &PCA9538,
        }
    }

    pub fn name(self) -> &'static str {
        self.family().name
    }
}

impl core::str::FromStr for Device {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Device::ALL
            .iter()
            .copied()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or(crate::Error::UnknownDevice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_16bit() {
        // second bank of the first chip, then the first bank of the next one
        assert_eq!(PCA9555.locate(0x21, 1, PCA9555.output_reg), (0x21, 0x03));
        assert_eq!(PCA9555.locate(0x21, 2, PCA9555.output_reg), (0x22, 0x02));
        assert_eq!(PCA9539.locate(0x74, 3, PCA9539.config_reg), (0x75, 0x07));
    }

    #[test]
    fn locate_8bit() {
        assert_eq!(TCA6408.locate(0x20, 0, TCA6408.input_reg), (0x20, 0x00));
        assert_eq!(TCA6408.locate(0x20, 3, TCA6408.config_reg), (0x23, 0x03));
    }

    #[test]
    fn device_names() {
        assert_eq!("pca9539".parse::<Device>(), Ok(Device::Pca9539));
        assert_eq!("TCA6408".parse::<Device>(), Ok(Device::Tca6408));
        assert_eq!("mcp23017".parse::<Device>(), Err(crate::Error::UnknownDevice));
        for d in Device::ALL {
            assert_eq!(d.name().parse::<Device>(), Ok(d));
        }
    }
}
