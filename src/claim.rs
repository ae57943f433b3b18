use crate::bits::Bits64;
use crate::Error;

/// Tracks which virtual pin indices are in use.
///
/// Claims only change while the extender is being configured, which is why
/// mutation requires `&mut`.
#[derive(Debug, Clone)]
pub struct ClaimTable {
    claimed: Bits64,
    capacity: u8,
}

impl ClaimTable {
    pub fn new(capacity: u8) -> Self {
        assert!(capacity <= 64);
        Self {
            claimed: Bits64::default(),
            capacity,
        }
    }

    pub fn check_range(&self, index: u8) -> Result<(), Error> {
        if index < self.capacity {
            Ok(())
        } else {
            Err(Error::Range {
                index,
                capacity: self.capacity,
            })
        }
    }

    pub fn claim(&mut self, index: u8) -> Result<(), Error> {
        self.check_range(index)?;
        if self.claimed.get(index) {
            return Err(Error::AlreadyClaimed(index));
        }
        self.claimed.set(index);
        Ok(())
    }

    pub fn free(&mut self, index: u8) {
        if index < self.capacity {
            self.claimed.clear(index);
        }
    }

    pub fn is_claimed(&self, index: u8) -> bool {
        index < self.capacity && self.claimed.get(index)
    }

    /// Bitmask of register groups with at least one claimed pin.
    pub fn groups(&self) -> u8 {
        self.claimed.groups()
    }

    pub fn count(&self) -> u32 {
        self.claimed.count_ones()
    }
}

#[cfg(test)]
mod tests {
    use super::ClaimTable;
    use crate::Error;

    #[test]
    fn claim_is_exclusive() {
        let mut claims = ClaimTable::new(64);
        for i in 0..64 {
            claims.claim(i).unwrap();
            assert_eq!(claims.claim(i), Err(Error::AlreadyClaimed(i)));
        }
        assert_eq!(claims.count(), 64);

        claims.free(17);
        claims.free(17);
        assert!(!claims.is_claimed(17));
        claims.claim(17).unwrap();
    }

    #[test]
    fn claim_out_of_range() {
        let mut claims = ClaimTable::new(8);
        assert_eq!(
            claims.claim(8),
            Err(Error::Range {
                index: 8,
                capacity: 8
            })
        );
        // freeing an index outside the table is a no-op
        claims.free(200);
    }

    #[test]
    fn claimed_groups() {
        let mut claims = ClaimTable::new(64);
        claims.claim(3).unwrap();
        claims.claim(20).unwrap();
        assert_eq!(claims.groups(), 0b0000_0101);
    }
}
