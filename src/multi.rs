/// Set multiple pins at the same time.
///
/// Setting pins one after the other through [`Pin::set_high`](crate::Pin::set_high)
/// flushes after each of them, so they change state in separate bus writes.
/// `write_multiple()` stages all states first and flushes once, which puts
/// pins sharing an output register into a single transaction.
///
/// All pins must belong to the same extender.
pub fn write_multiple<D: crate::PinExtenderDriver, const N: usize>(
    pins: [&mut crate::Pin<'_, D>; N],
    states: [bool; N],
) -> Result<(), crate::Error> {
    let Some(first) = pins.first() else {
        return Ok(());
    };
    let driver = first.driver();

    for (pin, state) in pins.iter().zip(states) {
        assert!(core::ptr::eq(pin.driver(), driver));
        driver.write_pin(pin.index(), state)?;
    }
    driver.flush_writes()
}

#[cfg(test)]
mod tests {
    use crate::bus::NoLine;
    use crate::dev::family::PCA9555;
    use crate::testing::TestPlatform;
    use crate::{I2cExtender, Pin, PinAttributes, PinExtenderDriver, Worker};
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    #[test]
    fn one_write_per_register() {
        let expectations = [
            mock_i2c::Transaction::write(0x20, vec![0x04, 0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x05, 0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x06, 0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x07, 0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x02, 0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x03, 0x00]),
            mock_i2c::Transaction::write_read(0x20, vec![0x00], vec![0x00]),
            mock_i2c::Transaction::write_read(0x20, vec![0x01], vec![0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x02, 0x05]),
            mock_i2c::Transaction::write(0x20, vec![0x03, 0x80]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);
        let platform = TestPlatform::default();

        let mut ext = I2cExtender::new(bus.clone(), &PCA9555, 0, None::<NoLine>, &platform);
        for i in [0, 1, 2, 15] {
            ext.claim(i).unwrap();
            ext.setup_pin(i, PinAttributes::OUTPUT).unwrap();
        }
        ext.update();

        let mut p0 = Pin::new(&ext, 0);
        let mut p1 = Pin::new(&ext, 1);
        let mut p2 = Pin::new(&ext, 2);
        let mut p15 = Pin::new(&ext, 15);
        super::write_multiple(
            [&mut p0, &mut p1, &mut p2, &mut p15],
            [true, false, true, true],
        )
        .unwrap();

        bus.done();
    }

    #[test]
    #[should_panic]
    fn pins_of_different_extenders() {
        let bus = mock_i2c::Mock::new(&[]);
        let platform = TestPlatform::default();
        let a = I2cExtender::new(bus.clone(), &PCA9555, 0, None::<NoLine>, &platform);
        let b = I2cExtender::new(bus.clone(), &PCA9555, 1, None::<NoLine>, &platform);

        let mut pa = Pin::new(&a, 0);
        let mut pb = Pin::new(&b, 0);
        let _ = super::write_multiple([&mut pa, &mut pb], [true, true]);
    }
}
