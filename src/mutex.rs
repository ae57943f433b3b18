/// Common interface for mutex implementations.
///
/// An extender keeps its [`Port`](crate::Port) (the I2C bus and the
/// interrupt lines) behind a mutex.  Only the context holding the update
/// guard ever locks it, so the lock is never contended; it exists so the
/// extender can be shared between the worker and client tasks.
/// `pin-extender` implements this trait for these mutex types:
///
/// | Mutex | Feature Name | Notes |
/// | --- | --- | --- |
/// | [`core::cell::RefCell`] | _always available_ | For sharing within a single execution context. |
/// | [`critical_section::Mutex`] | _always available_ | Wrapping a `RefCell`; for sharing with other tasks or interrupt handlers on bare metal. |
/// | [`std::sync::Mutex`][mutex-std] | `std` | For platforms where `std` is available. |
///
/// [mutex-std]: https://doc.rust-lang.org/std/sync/struct.Mutex.html
///
/// For other mutex types, a custom implementation is needed.  Due to the orphan rule, it might be
/// necessary to wrap it in a newtype:
///
/// ```
/// struct MyMutex<T>(std::sync::Mutex<T>);
///
/// impl<T> pin_extender::PortMutex for MyMutex<T> {
///     type Port = T;
///
///     fn create(v: T) -> Self {
///         Self(std::sync::Mutex::new(v))
///     }
///
///     fn lock<R, F: FnOnce(&mut Self::Port) -> R>(&self, f: F) -> R {
///         let mut v = self.0.lock().unwrap();
///         f(&mut v)
///     }
/// }
/// ```
pub trait PortMutex {
    /// The port wrapped inside this mutex.
    type Port;

    /// Create a new mutex of this type.
    fn create(v: Self::Port) -> Self;

    /// Lock the mutex and give a closure access to the port inside.
    fn lock<R, F: FnOnce(&mut Self::Port) -> R>(&self, f: F) -> R;
}

impl<T> PortMutex for core::cell::RefCell<T> {
    type Port = T;

    fn create(v: Self::Port) -> Self {
        core::cell::RefCell::new(v)
    }

    fn lock<R, F: FnOnce(&mut Self::Port) -> R>(&self, f: F) -> R {
        let mut v = self.borrow_mut();
        f(&mut v)
    }
}

impl<T> PortMutex for critical_section::Mutex<core::cell::RefCell<T>> {
    type Port = T;

    fn create(v: Self::Port) -> Self {
        critical_section::Mutex::new(core::cell::RefCell::new(v))
    }

    fn lock<R, F: FnOnce(&mut Self::Port) -> R>(&self, f: F) -> R {
        critical_section::with(|cs| {
            let mut v = self.borrow_ref_mut(cs);
            f(&mut v)
        })
    }
}

#[cfg(any(test, feature = "std"))]
impl<T> PortMutex for std::sync::Mutex<T> {
    type Port = T;

    fn create(v: Self::Port) -> Self {
        std::sync::Mutex::new(v)
    }

    fn lock<R, F: FnOnce(&mut Self::Port) -> R>(&self, f: F) -> R {
        // a panicking handler must not take the bus down with it
        let mut v = self.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut v)
    }
}

#[cfg(test)]
mod tests {
    use super::PortMutex;
    use crate::bus::NoLine;
    use crate::dev::family::TCA6408;
    use crate::testing::TestPlatform;
    use crate::{I2cExtender, Pass, PinAttributes, PinExtenderDriver, Port, Worker};
    use core::cell::RefCell;
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    #[test]
    fn critical_section_port() {
        let m: critical_section::Mutex<RefCell<u8>> = PortMutex::create(1);
        m.lock(|v| *v += 1);
        assert_eq!(m.lock(|v| *v), 2);
    }

    #[test]
    fn extender_with_critical_section_port() {
        let mut bus = mock_i2c::Mock::new(&[
            mock_i2c::Transaction::write(0x27, vec![0x02, 0x00]),
            mock_i2c::Transaction::write(0x27, vec![0x03, 0x00]),
            mock_i2c::Transaction::write(0x27, vec![0x01, 0x00]),
            mock_i2c::Transaction::write_read(0x27, vec![0x00], vec![0x00]),
        ]);
        let platform = TestPlatform::default();

        let mut ext: I2cExtender<critical_section::Mutex<RefCell<Port<_, NoLine>>>, _> =
            I2cExtender::with_mutex(bus.clone(), &TCA6408, 7, None, &platform);
        ext.claim(5).unwrap();
        ext.setup_pin(5, PinAttributes::OUTPUT).unwrap();
        assert_eq!(ext.update(), Pass::Ran);

        bus.done();
    }
}
