//! Driver registry: construct extenders by their configuration name.
use embedded_hal::digital::InputPin;
use embedded_hal::i2c::I2c;

use crate::bus::Port;
use crate::common::{InterruptCallback, InterruptMode, Pass, Platform};
use crate::dev::family::Device;
use crate::dev::tca6408::{Tca6408, CHIPS};
use crate::extender::I2cExtender;
use crate::{Error, PinAttributes, PinExtenderDriver, PortMutex, Worker};

/// Maximum number of drivers a [`Registry`] can hold.
pub const MAX_DRIVERS: usize = 8;

/// Per-extender configuration items.
pub struct ExtenderConfig<INT> {
    /// Chip family; `None` if the configured name was not recognized.
    pub device: Option<Device>,
    /// Offset of the first chip from the family's base address.
    pub device_id: u8,
    /// Dedicated interrupt line of the generic engine.
    pub interrupt: Option<INT>,
    /// One line per chip for the `tca6408` engine (`interrupt0..3`).
    pub chip_interrupts: [Option<INT>; CHIPS],
}

impl<INT> Default for ExtenderConfig<INT> {
    fn default() -> Self {
        Self {
            device: None,
            device_id: 0,
            interrupt: None,
            chip_interrupts: [None, None, None, None],
        }
    }
}

/// Any extender the registry can build.
pub enum AnyExtender<M, P> {
    Generic(I2cExtender<M, P>),
    Tca6408(Tca6408<M, P>),
}

pub type Constructor<I2C, INT, M, P> =
    fn(I2C, ExtenderConfig<INT>, P) -> Result<AnyExtender<M, P>, Error>;

pub struct Registry<I2C, INT, M, P> {
    drivers: heapless::Vec<(&'static str, Constructor<I2C, INT, M, P>), MAX_DRIVERS>,
}

impl<I2C, INT, M, P> Registry<I2C, INT, M, P>
where
    I2C: I2c,
    INT: InputPin,
    M: PortMutex<Port = Port<I2C, INT>>,
    P: Platform,
{
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            drivers: heapless::Vec::new(),
        }
    }

    /// A registry knowing `i2c_extender` and `tca6408`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.drivers.extend([
            ("i2c_extender", build_generic as Constructor<I2C, INT, M, P>),
            ("tca6408", build_tca6408 as Constructor<I2C, INT, M, P>),
        ]);
        registry
    }

    /// Add a driver, replacing any existing one with the same name.
    pub fn register(
        &mut self,
        name: &'static str,
        constructor: Constructor<I2C, INT, M, P>,
    ) -> Result<(), Error> {
        if let Some(entry) = self
            .drivers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            entry.1 = constructor;
            return Ok(());
        }
        self.drivers
            .push((name, constructor))
            .map_err(|_| Error::RegistryFull)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.drivers.iter().map(|(n, _)| *n)
    }

    pub fn create(
        &self,
        name: &str,
        i2c: Option<I2C>,
        config: ExtenderConfig<INT>,
        platform: P,
    ) -> Result<AnyExtender<M, P>, Error> {
        let (_, constructor) = self
            .drivers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .ok_or(Error::UnknownDriver)?;
        let i2c = i2c.ok_or(Error::MissingBus)?;

        let extender = constructor(i2c, config, platform)?;
        log::debug!("created extender driver {}", extender.name());
        Ok(extender)
    }
}

impl<I2C, INT, M, P> Default for Registry<I2C, INT, M, P>
where
    I2C: I2c,
    INT: InputPin,
    M: PortMutex<Port = Port<I2C, INT>>,
    P: Platform,
{
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn build_generic<I2C, INT, M, P>(
    i2c: I2C,
    config: ExtenderConfig<INT>,
    platform: P,
) -> Result<AnyExtender<M, P>, Error>
where
    I2C: I2c,
    INT: InputPin,
    M: PortMutex<Port = Port<I2C, INT>>,
    P: Platform,
{
    let device = config.device.ok_or(Error::UnknownDevice)?;
    Ok(AnyExtender::Generic(I2cExtender::with_mutex(
        i2c,
        device.family(),
        config.device_id,
        config.interrupt,
        platform,
    )))
}

fn build_tca6408<I2C, INT, M, P>(
    i2c: I2C,
    config: ExtenderConfig<INT>,
    platform: P,
) -> Result<AnyExtender<M, P>, Error>
where
    I2C: I2c,
    INT: InputPin,
    M: PortMutex<Port = Port<I2C, INT>>,
    P: Platform,
{
    Ok(AnyExtender::Tca6408(Tca6408::with_mutex(
        i2c,
        config.chip_interrupts,
        platform,
    )))
}

impl<I2C, INT, M, P> AnyExtender<M, P>
where
    I2C: I2c,
    INT: InputPin,
    M: PortMutex<Port = Port<I2C, INT>>,
    P: Platform,
{
    /// Interrupt entry point for line `line`.  The generic engine only has
    /// one line and ignores the number.
    pub fn on_interrupt(&self, line: u8) {
        match self {
            AnyExtender::Generic(e) => e.on_interrupt(),
            AnyExtender::Tca6408(e) => e.on_interrupt(line),
        }
    }

    pub fn shutdown(&self) -> bool {
        match self {
            AnyExtender::Generic(e) => e.shutdown(),
            AnyExtender::Tca6408(e) => e.shutdown(),
        }
    }

    pub fn error_count(&self) -> u8 {
        match self {
            AnyExtender::Generic(e) => e.error_count(),
            AnyExtender::Tca6408(e) => e.error_count(),
        }
    }
}

macro_rules! delegate {
    ($self:ident, $e:ident => $body:expr) => {
        match $self {
            AnyExtender::Generic($e) => $body,
            AnyExtender::Tca6408($e) => $body,
        }
    };
}

impl<I2C, INT, M, P> PinExtenderDriver for AnyExtender<M, P>
where
    I2C: I2c,
    INT: InputPin,
    M: PortMutex<Port = Port<I2C, INT>>,
    P: Platform,
{
    fn claim(&mut self, index: u8) -> Result<(), Error> {
        delegate!(self, e => e.claim(index))
    }

    fn free(&mut self, index: u8) {
        delegate!(self, e => e.free(index))
    }

    fn setup_pin(&self, index: u8, attrs: PinAttributes) -> Result<(), Error> {
        delegate!(self, e => e.setup_pin(index, attrs))
    }

    fn write_pin(&self, index: u8, high: bool) -> Result<(), Error> {
        delegate!(self, e => e.write_pin(index, high))
    }

    fn read_pin(&self, index: u8) -> Result<bool, Error> {
        delegate!(self, e => e.read_pin(index))
    }

    fn flush_writes(&self) -> Result<(), Error> {
        delegate!(self, e => e.flush_writes())
    }

    fn attach_interrupt(
        &self,
        index: u8,
        callback: InterruptCallback,
        argument: usize,
        mode: InterruptMode,
    ) -> Result<(), Error> {
        delegate!(self, e => e.attach_interrupt(index, callback, argument, mode))
    }

    fn detach_interrupt(&self, index: u8) -> Result<(), Error> {
        delegate!(self, e => e.detach_interrupt(index))
    }

    fn name(&self) -> &'static str {
        delegate!(self, e => e.name())
    }
}

impl<I2C, INT, M, P> Worker for AnyExtender<M, P>
where
    I2C: I2c,
    INT: InputPin,
    M: PortMutex<Port = Port<I2C, INT>>,
    P: Platform,
{
    fn update(&self) -> Pass {
        delegate!(self, e => e.update())
    }

    fn run(&self) {
        delegate!(self, e => e.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::NoLine;
    use crate::testing::TestPlatform;
    use core::cell::RefCell;
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    type MockRegistry<'a> =
        Registry<mock_i2c::Mock, NoLine, RefCell<Port<mock_i2c::Mock, NoLine>>, &'a TestPlatform>;

    #[test]
    fn default_drivers() {
        let mut bus = mock_i2c::Mock::new(&[]);
        let platform = TestPlatform::default();
        let registry = MockRegistry::with_defaults();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            ["i2c_extender", "tca6408"]
        );

        let config = ExtenderConfig {
            device: "pca9539".parse().ok(),
            device_id: 1,
            ..Default::default()
        };
        let ext = registry
            .create("I2C_Extender", Some(bus.clone()), config, &platform)
            .unwrap();
        assert_eq!(ext.name(), "i2c_extender");
        match &ext {
            AnyExtender::Generic(e) => assert_eq!(e.address(), 0x75),
            AnyExtender::Tca6408(_) => panic!("wrong engine"),
        }

        let ext = registry
            .create("tca6408", Some(bus.clone()), Default::default(), &platform)
            .unwrap();
        assert_eq!(ext.name(), "tca6408");

        bus.done();
    }

    #[test]
    fn configuration_errors() {
        let mut bus = mock_i2c::Mock::new(&[]);
        let platform = TestPlatform::default();
        let registry = MockRegistry::with_defaults();

        let unknown = ExtenderConfig {
            device: "pcf8574".parse().ok(),
            ..Default::default()
        };
        assert!(matches!(
            registry.create("i2c_extender", Some(bus.clone()), unknown, &platform),
            Err(Error::UnknownDevice)
        ));
        assert!(matches!(
            registry.create("i2c_extender", None, Default::default(), &platform),
            Err(Error::MissingBus)
        ));
        assert!(matches!(
            registry.create("mcp23017", Some(bus.clone()), Default::default(), &platform),
            Err(Error::UnknownDriver)
        ));

        bus.done();
    }

    fn custom<'a>(
        i2c: mock_i2c::Mock,
        _: ExtenderConfig<NoLine>,
        platform: &'a TestPlatform,
    ) -> Result<AnyExtender<RefCell<Port<mock_i2c::Mock, NoLine>>, &'a TestPlatform>, Error> {
        Ok(AnyExtender::Generic(I2cExtender::new(
            i2c,
            &crate::dev::family::PCA9554,
            7,
            None,
            platform,
        )))
    }

    #[test]
    fn registry_capacity() {
        let mut registry = MockRegistry::with_defaults();
        let names = ["a", "b", "c", "d", "e", "f"];
        for name in names {
            registry.register(name, custom).unwrap();
        }
        assert_eq!(registry.register("g", custom), Err(Error::RegistryFull));
        // replacing an existing driver still works
        registry.register("TCA6408", custom).unwrap();
        assert_eq!(registry.names().count(), MAX_DRIVERS);
    }

    #[test]
    fn created_engine_drives_the_bus() {
        let mut bus = mock_i2c::Mock::new(&[
            mock_i2c::Transaction::write(0x21, vec![0x02, 0x00]),
            mock_i2c::Transaction::write(0x21, vec![0x03, 0x00]),
            mock_i2c::Transaction::write(0x21, vec![0x01, 0x04]),
            mock_i2c::Transaction::write_read(0x21, vec![0x00], vec![0x04]),
        ]);
        let platform = TestPlatform::default();
        let registry = MockRegistry::with_defaults();

        let mut ext = registry
            .create("tca6408", Some(bus.clone()), Default::default(), &platform)
            .unwrap();
        ext.claim(10).unwrap();
        ext.setup_pin(10, PinAttributes::OUTPUT | PinAttributes::INITIAL_ON)
            .unwrap();

        assert_eq!(ext.update(), Pass::Ran);
        assert_eq!(ext.update(), Pass::Idle);
        assert_eq!(ext.error_count(), 0);
        assert!(ext.shutdown());

        bus.done();
    }
}
